//! Command-line interface.
//!
//! Each subcommand maps onto one client operation and yields its typed
//! result as JSON. Argument parsing lives here; `main` only prints.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::api::client::{host_from_url, issue_url, trace_url};
use crate::api::params::{
    CreateClientKey, CreateProject, ErrorSort, IssueSort, ListIssues, ListReleases, ListTags,
    SearchErrors, SearchSpans, SpanSort, StartAutofix, TagDataset,
};
use crate::api::{auth, RequestOptions, SentryClient, Transport, DEFAULT_HOST};
use crate::config::{Config, Connection, Profile};
use crate::error::{AppError, Result};
use crate::resolver::{self, IssueParams, IssueRef, ResolveError};

/// Profile used by `login` when none is named.
const DEFAULT_PROFILE: &str = "default";

/// sentry-access - typed access to the Sentry API
#[derive(Debug, Parser)]
#[command(name = "sentry-access")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:
    sentry-access login --token sntrys_...      # Store a token
    sentry-access organizations                 # Organizations in every region
    sentry-access issues --org acme -q is:unresolved
    sentry-access issue --url https://acme.sentry.io/issues/WEB-3A
    sentry-access errors --org acme --filename index.ts")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Access token (overrides environment and keyring)
    #[arg(long, global = true)]
    pub access_token: Option<String>,

    /// Sentry host as host[:port] (overrides environment and profile)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Profile to use
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Region URL to send the request to, e.g. https://us.sentry.io
    #[arg(long, global = true)]
    pub region_url: Option<String>,
}

/// Organization selection; falls back to the profile's default.
#[derive(Debug, Clone, Default, Args)]
pub struct OrgArgs {
    /// Organization slug
    #[arg(long)]
    pub org: Option<String>,
}

/// Ways to name an issue.
#[derive(Debug, Clone, Default, Args)]
pub struct IssueArgs {
    /// Issue URL; wins over --org/--id
    #[arg(long)]
    pub url: Option<String>,

    /// Organization slug
    #[arg(long)]
    pub org: Option<String>,

    /// Issue ID or short ID (e.g. PROJECT-123)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the authenticated user
    Whoami,

    /// List organizations in every region
    Organizations,

    /// List teams
    Teams(OrgArgs),

    /// List projects
    Projects(OrgArgs),

    /// List issues
    Issues {
        #[command(flatten)]
        org: OrgArgs,

        /// Limit to a project
        #[arg(long)]
        project: Option<String>,

        /// Search query fragment (repeatable)
        #[arg(short, long = "query")]
        query: Vec<String>,

        /// Sort order
        #[arg(long, value_enum)]
        sort: Option<IssueSort>,
    },

    /// Show issue details
    Issue(IssueArgs),

    /// Show an event of an issue (latest by default)
    Event {
        #[command(flatten)]
        issue: IssueArgs,

        /// Event ID
        #[arg(long)]
        event: Option<String>,
    },

    /// Search error events
    Errors {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long)]
        project: Option<String>,

        /// File name to match in stack traces
        #[arg(long)]
        filename: Option<String>,

        /// Exact transaction name
        #[arg(long)]
        transaction: Option<String>,

        /// Search query
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long, value_enum, default_value_t = ErrorSort::LastSeen)]
        sort: ErrorSort,
    },

    /// Search transactions
    Transactions {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long)]
        project: Option<String>,

        /// Exact transaction name
        #[arg(long)]
        transaction: Option<String>,

        /// Search query
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long, value_enum, default_value_t = SpanSort::Timestamp)]
        sort: SpanSort,
    },

    /// List releases
    Releases {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long)]
        project: Option<String>,

        /// Version search
        #[arg(short, long)]
        query: Option<String>,
    },

    /// List tag keys
    Tags {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long, value_enum)]
        dataset: Option<TagDataset>,
    },

    /// List client keys (DSNs) of a project
    Dsns {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long)]
        project: String,
    },

    /// Create a team
    CreateTeam {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long)]
        name: String,
    },

    /// Create a project and its default DSN
    CreateProject {
        #[command(flatten)]
        org: OrgArgs,

        /// Owning team slug
        #[arg(long)]
        team: String,

        #[arg(long)]
        name: String,

        /// Platform, e.g. javascript
        #[arg(long)]
        platform: Option<String>,
    },

    /// Create a client key (DSN)
    CreateDsn {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long)]
        project: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Start an autofix run
    AutofixStart {
        #[command(flatten)]
        issue: IssueArgs,

        #[arg(long)]
        event: Option<String>,

        /// Extra guidance for the run
        #[arg(long, default_value = "")]
        instruction: String,
    },

    /// Show the autofix run of an issue
    AutofixStatus(IssueArgs),

    /// Print the web URL of an issue
    IssueUrl {
        #[command(flatten)]
        issue: IssueArgs,

        /// Open in the browser
        #[arg(long)]
        open: bool,
    },

    /// Print the web URL of a trace
    TraceUrl {
        #[command(flatten)]
        org: OrgArgs,

        /// Trace ID
        #[arg(long)]
        trace: String,

        /// Open in the browser
        #[arg(long)]
        open: bool,
    },

    /// Verify a token and store it for a profile
    Login {
        /// Access token
        #[arg(long, env = "SENTRY_ACCESS_TOKEN", hide_env_values = true)]
        token: String,

        /// Default organization for the profile
        #[arg(long)]
        org: Option<String>,
    },

    /// Remove the stored token of a profile
    Logout,
}

/// Run a parsed command line and return its JSON result.
pub async fn run(cli: Cli) -> Result<Value> {
    let mut config = Config::load()?;

    match cli.command {
        Command::Login { token, org } => login(&mut config, &cli.global, &token, org).await,
        Command::Logout => logout(&config, &cli.global),
        command => {
            let connection = connection_for(&config, &cli.global)?;
            let client =
                SentryClient::new(connection.access_token.as_deref(), Some(&connection.host))?;
            let opts = request_options(&cli.global)?;
            execute(
                &client,
                command,
                connection.default_organization.as_deref(),
                &opts,
            )
            .await
        }
    }
}

/// Resolve the connection, letting command-line flags win.
fn connection_for(config: &Config, global: &GlobalArgs) -> Result<Connection> {
    let mut connection = config.resolve_connection(global.profile.as_deref())?;
    if let Some(ref host) = global.host {
        connection.host = host.clone();
    }
    if let Some(ref token) = global.access_token {
        connection.access_token = Some(token.clone());
    }
    Ok(connection)
}

/// Per-call options from `--region-url`.
fn request_options(global: &GlobalArgs) -> Result<RequestOptions> {
    match global.region_url {
        Some(ref url) => Ok(RequestOptions::with_host(host_from_url(url)?)),
        None => Ok(RequestOptions::default()),
    }
}

fn organization(args: &OrgArgs, default: Option<&str>) -> Result<String> {
    args.org
        .clone()
        .or_else(|| default.map(str::to_string))
        .ok_or(AppError::Resolve(ResolveError::MissingOrganization))
}

fn issue_ref(args: &IssueArgs, default_org: Option<&str>) -> Result<IssueRef> {
    let params = IssueParams {
        issue_url: args.url.clone(),
        issue_id: args.id.clone(),
        organization_slug: args.org.clone().or_else(|| default_org.map(str::to_string)),
    };
    Ok(resolver::resolve(&params)?)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| AppError::other(format!("failed to encode output: {}", e)))
}

/// Execute one API command against a client.
#[instrument(skip_all)]
pub async fn execute<T: Transport>(
    client: &SentryClient<T>,
    command: Command,
    default_org: Option<&str>,
    opts: &RequestOptions,
) -> Result<Value> {
    match command {
        Command::Whoami => to_json(&client.get_authenticated_user(opts).await?),
        Command::Organizations => to_json(&client.list_organizations().await?),
        Command::Teams(org) => {
            let org = organization(&org, default_org)?;
            to_json(&client.list_teams(&org, opts).await?)
        }
        Command::Projects(org) => {
            let org = organization(&org, default_org)?;
            to_json(&client.list_projects(&org, opts).await?)
        }
        Command::Issues {
            org,
            project,
            query,
            sort,
        } => {
            let params = ListIssues {
                organization_slug: organization(&org, default_org)?,
                project_slug: project,
                query,
                sort,
            };
            to_json(&client.list_issues(&params, opts).await?)
        }
        Command::Issue(args) => {
            let issue = issue_ref(&args, default_org)?;
            to_json(
                &client
                    .get_issue(&issue.organization_slug, &issue.issue_id, opts)
                    .await?,
            )
        }
        Command::Event { issue, event } => {
            let issue = issue_ref(&issue, default_org)?;
            let event = match event {
                Some(ref event_id) => {
                    client
                        .get_event_for_issue(
                            &issue.organization_slug,
                            &issue.issue_id,
                            event_id,
                            opts,
                        )
                        .await?
                }
                None => {
                    client
                        .get_latest_event_for_issue(
                            &issue.organization_slug,
                            &issue.issue_id,
                            opts,
                        )
                        .await?
                }
            };
            to_json(&event)
        }
        Command::Errors {
            org,
            project,
            filename,
            transaction,
            query,
            sort,
        } => {
            let params = SearchErrors {
                organization_slug: organization(&org, default_org)?,
                project_slug: project,
                filename,
                transaction,
                query,
                sort,
            };
            to_json(&client.search_errors(&params, opts).await?)
        }
        Command::Transactions {
            org,
            project,
            transaction,
            query,
            sort,
        } => {
            let params = SearchSpans {
                organization_slug: organization(&org, default_org)?,
                project_slug: project,
                transaction,
                query,
                sort,
            };
            to_json(&client.search_spans(&params, opts).await?)
        }
        Command::Releases {
            org,
            project,
            query,
        } => {
            let params = ListReleases {
                organization_slug: organization(&org, default_org)?,
                project_slug: project,
                query,
            };
            to_json(&client.list_releases(&params, opts).await?)
        }
        Command::Tags { org, dataset } => {
            let params = ListTags {
                organization_slug: organization(&org, default_org)?,
                dataset,
            };
            to_json(&client.list_tags(&params, opts).await?)
        }
        Command::Dsns { org, project } => {
            let org = organization(&org, default_org)?;
            to_json(&client.list_client_keys(&org, &project, opts).await?)
        }
        Command::CreateTeam { org, name } => {
            let org = organization(&org, default_org)?;
            to_json(&client.create_team(&org, &name, opts).await?)
        }
        Command::CreateProject {
            org,
            team,
            name,
            platform,
        } => {
            let params = CreateProject {
                organization_slug: organization(&org, default_org)?,
                team_slug: team,
                name,
                platform,
            };
            let created = client.create_project_with_key(&params, opts).await?;
            let (key, key_error) = match created.key {
                Ok(ref key) => (to_json(key)?, Value::Null),
                Err(ref e) => (Value::Null, Value::String(e.to_string())),
            };
            Ok(json!({
                "project": to_json(&created.project)?,
                "key": key,
                "key_error": key_error,
            }))
        }
        Command::CreateDsn { org, project, name } => {
            let params = CreateClientKey {
                organization_slug: organization(&org, default_org)?,
                project_slug: project,
                name,
            };
            to_json(&client.create_client_key(&params, opts).await?)
        }
        Command::AutofixStart {
            issue,
            event,
            instruction,
        } => {
            let issue = issue_ref(&issue, default_org)?;
            let params = StartAutofix {
                organization_slug: issue.organization_slug,
                issue_id: issue.issue_id,
                event_id: event,
                instruction,
            };
            to_json(&client.start_autofix(&params, opts).await?)
        }
        Command::AutofixStatus(args) => {
            let issue = issue_ref(&args, default_org)?;
            to_json(
                &client
                    .get_autofix_state(&issue.organization_slug, &issue.issue_id, opts)
                    .await?,
            )
        }
        Command::IssueUrl { issue, open } => {
            let issue = issue_ref(&issue, default_org)?;
            let url = issue_url(client.host(), &issue.organization_slug, &issue.issue_id);
            open_url(&url, open)
        }
        Command::TraceUrl { org, trace, open } => {
            let org = organization(&org, default_org)?;
            let url = trace_url(client.host(), &org, &trace);
            open_url(&url, open)
        }
        Command::Login { .. } | Command::Logout => Err(AppError::other(
            "login and logout do not run against an existing client",
        )),
    }
}

fn open_url(url: &str, open: bool) -> Result<Value> {
    if open {
        open::that(url)?;
    }
    Ok(json!({ "url": url }))
}

/// Verify the token, then save the profile and store the token.
async fn login(
    config: &mut Config,
    global: &GlobalArgs,
    token: &str,
    org: Option<String>,
) -> Result<Value> {
    let name = global
        .profile
        .clone()
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let host = global
        .host
        .clone()
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let profile = Profile::new(name.clone(), host.clone(), org);
    profile.validate()?;

    let client = SentryClient::new(Some(token), Some(&host))?;
    let user = client
        .get_authenticated_user(&request_options(global)?)
        .await?;

    config.upsert_profile(profile)?;
    if config.settings.default_profile.is_none() {
        config.settings.default_profile = Some(name.clone());
    }
    config.save()?;
    auth::store_token(&name, token)?;
    info!(profile = %name, "Logged in");

    Ok(json!({ "profile": name, "host": host, "user": to_json(&user)? }))
}

/// Remove the stored token of the selected profile.
fn logout(config: &Config, global: &GlobalArgs) -> Result<Value> {
    let name = match global.profile {
        Some(ref name) => name.clone(),
        None => config
            .get_default_profile()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
    };
    auth::delete_token(&name)?;
    info!(profile = %name, "Logged out");
    Ok(json!({ "profile": name, "logged_out": true }))
}
