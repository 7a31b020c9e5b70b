//! Sentry API client implementation.
//!
//! This module provides the region-aware client for the Sentry REST API
//! (`/api/0`). It builds request URLs against the default host or a per-call
//! region host, attaches the bearer token, normalizes failed responses into
//! [`ApiError`] and validates successful bodies against their contracts.

use futures::future::try_join_all;
use reqwest::{Method, Url};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::auth::AccessToken;
use super::error::{ApiError, Result};
use super::params::{
    segment, CreateClientKey, CreateProject, ListIssues, ListReleases, ListTags, SearchErrors,
    SearchSpans, StartAutofix,
};
use super::schema;
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use super::types::{
    ApiErrorBody, AutofixRun, AutofixRunState, ClientKey, CreateClientKeyRequest,
    CreateProjectRequest, CreateTeamRequest, ErrorSearchRow, Event, Issue, Organization, Project,
    Release, SearchResponse, SpanSearchRow, StartAutofixRequest, Tag, Team, User, UserRegions,
};
use crate::logging;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "sentry.io";

/// Name given to the key created alongside a new project.
pub const DEFAULT_KEY_NAME: &str = "Default";

/// Failure details returned when a query spans projects without permission.
///
/// Matched as substrings; the remote wording is not a stable contract.
const CROSS_PROJECT_DETAILS: [&str; 2] = [
    "You do not have the multi project stream feature enabled",
    "You cannot view events from multiple projects",
];

/// Replacement message for [`CROSS_PROJECT_DETAILS`].
const CROSS_PROJECT_MESSAGE: &str =
    "You do not have access to query across multiple projects. Please select a project for your query.";

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Host (`host[:port]`) to send this request to instead of the
    /// client's default, e.g. a region host.
    pub host: Option<String>,
}

impl RequestOptions {
    /// Target a specific host.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
        }
    }
}

/// Result of creating a project together with its default client key.
///
/// The key is created in a second step; its failure does not undo or fail
/// the project creation.
#[derive(Debug)]
pub struct ProjectWithKey {
    pub project: Project,
    pub key: Result<ClientKey>,
}

/// The Sentry API client.
///
/// Holds only immutable connection settings, so one instance can serve any
/// number of concurrent operations. [`SentryClient::set_host`] is the one
/// mutation and must not race in-flight requests.
#[derive(Debug)]
pub struct SentryClient<T: Transport = ReqwestTransport> {
    /// Executes requests.
    transport: T,
    /// Bearer token; requests are unauthenticated without one.
    access_token: Option<AccessToken>,
    /// Default `host[:port]`.
    host: String,
    /// `https://{host}/api/0`.
    api_prefix: String,
}

impl SentryClient<ReqwestTransport> {
    /// Create a client backed by `reqwest`.
    ///
    /// # Arguments
    ///
    /// * `access_token` - Bearer token, if any
    /// * `host` - Default host, `sentry.io` when `None`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(access_token: Option<&str>, host: Option<&str>) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(transport, access_token, host))
    }
}

impl<T: Transport> SentryClient<T> {
    /// Create a client over an explicit transport.
    pub fn with_transport(transport: T, access_token: Option<&str>, host: Option<&str>) -> Self {
        let host = normalize_host(host.unwrap_or(DEFAULT_HOST));
        info!(host = %host, authenticated = access_token.is_some(), "Creating Sentry client");
        Self {
            transport,
            access_token: access_token.map(AccessToken::new),
            api_prefix: api_prefix(&host),
            host,
        }
    }

    /// Point the client at a different default host.
    pub fn set_host(&mut self, host: &str) {
        self.host = normalize_host(host);
        self.api_prefix = api_prefix(&self.host);
        debug!(host = %self.host, "Default host changed");
    }

    /// The default host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The API base URL for the default host.
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Web URL of an issue on the default host.
    pub fn get_issue_url(&self, organization_slug: &str, issue_id: &str) -> String {
        issue_url(&self.host, organization_slug, issue_id)
    }

    /// Web URL of a trace on the default host.
    pub fn get_trace_url(&self, organization_slug: &str, trace_id: &str) -> String {
        trace_url(&self.host, organization_slug, trace_id)
    }

    /// Get the authenticated user.
    ///
    /// Calls `GET /auth/`.
    #[instrument(skip(self))]
    pub async fn get_authenticated_user(&self, opts: &RequestOptions) -> Result<User> {
        let user: User = self.get("/auth/", &[], opts).await?;
        debug!("Authenticated as {}", user);
        Ok(user)
    }

    /// List organizations across every region the user belongs to.
    ///
    /// Region discovery always goes to the default host; each region is then
    /// queried concurrently on its own host. Results keep region order and
    /// the per-region order. Any failing region fails the whole call.
    #[instrument(skip(self))]
    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let discovery: UserRegions = self
            .get("/users/me/regions/", &[], &RequestOptions::default())
            .await?;
        debug!("Found {} regions", discovery.regions.len());

        let region_opts = discovery
            .regions
            .iter()
            .map(|region| host_from_url(&region.url).map(RequestOptions::with_host))
            .collect::<Result<Vec<_>>>()?;

        let per_region = try_join_all(
            region_opts
                .iter()
                .map(|opts| self.get::<Vec<Organization>>("/organizations/", &[], opts)),
        )
        .await?;

        Ok(per_region.into_iter().flatten().collect())
    }

    /// List teams in an organization.
    #[instrument(skip(self, opts))]
    pub async fn list_teams(
        &self,
        organization_slug: &str,
        opts: &RequestOptions,
    ) -> Result<Vec<Team>> {
        let path = format!("/organizations/{}/teams/", segment(organization_slug));
        self.get(&path, &[], opts).await
    }

    /// Create a team in an organization.
    #[instrument(skip(self, opts))]
    pub async fn create_team(
        &self,
        organization_slug: &str,
        name: &str,
        opts: &RequestOptions,
    ) -> Result<Team> {
        let path = format!("/organizations/{}/teams/", segment(organization_slug));
        let team: Team = self.post(&path, &CreateTeamRequest { name }, opts).await?;
        info!(team = %team.slug, "Team created");
        Ok(team)
    }

    /// List projects in an organization.
    #[instrument(skip(self, opts))]
    pub async fn list_projects(
        &self,
        organization_slug: &str,
        opts: &RequestOptions,
    ) -> Result<Vec<Project>> {
        let path = format!("/organizations/{}/projects/", segment(organization_slug));
        self.get(&path, &[], opts).await
    }

    /// Create a project owned by a team.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug, team = %params.team_slug))]
    pub async fn create_project(
        &self,
        params: &CreateProject,
        opts: &RequestOptions,
    ) -> Result<Project> {
        let path = format!(
            "/teams/{}/{}/projects/",
            segment(&params.organization_slug),
            segment(&params.team_slug)
        );
        let body = CreateProjectRequest {
            name: &params.name,
            platform: params.platform.as_deref(),
        };
        let project: Project = self.post(&path, &body, opts).await?;
        info!(project = %project.slug, "Project created");
        Ok(project)
    }

    /// Create a project, then a client key named `Default` for it.
    ///
    /// A failure to create the key is logged and returned in
    /// [`ProjectWithKey::key`]; only a failure to create the project fails
    /// the call.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug))]
    pub async fn create_project_with_key(
        &self,
        params: &CreateProject,
        opts: &RequestOptions,
    ) -> Result<ProjectWithKey> {
        let project = self.create_project(params, opts).await?;

        let key_params = CreateClientKey {
            organization_slug: params.organization_slug.clone(),
            project_slug: project.slug.clone(),
            name: Some(DEFAULT_KEY_NAME.to_string()),
        };
        let key = self.create_client_key(&key_params, opts).await;
        if let Err(ref e) = key {
            let event_id = logging::log_error(
                e,
                &[
                    ("organization.slug", params.organization_slug.as_str()),
                    ("project.slug", project.slug.as_str()),
                ],
            );
            warn!(event_id = %event_id, "Project created without a client key");
        }

        Ok(ProjectWithKey { project, key })
    }

    /// Create a client key (DSN) for a project.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug, project = %params.project_slug))]
    pub async fn create_client_key(
        &self,
        params: &CreateClientKey,
        opts: &RequestOptions,
    ) -> Result<ClientKey> {
        let path = format!(
            "/projects/{}/{}/keys/",
            segment(&params.organization_slug),
            segment(&params.project_slug)
        );
        let body = CreateClientKeyRequest {
            name: params.name.as_deref(),
        };
        self.post(&path, &body, opts).await
    }

    /// List client keys of a project.
    #[instrument(skip(self, opts))]
    pub async fn list_client_keys(
        &self,
        organization_slug: &str,
        project_slug: &str,
        opts: &RequestOptions,
    ) -> Result<Vec<ClientKey>> {
        let path = format!(
            "/projects/{}/{}/keys/",
            segment(organization_slug),
            segment(project_slug)
        );
        self.get(&path, &[], opts).await
    }

    /// List releases of an organization or a single project.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug))]
    pub async fn list_releases(
        &self,
        params: &ListReleases,
        opts: &RequestOptions,
    ) -> Result<Vec<Release>> {
        self.get(&params.path(), &params.query_params(), opts).await
    }

    /// List tag keys of an organization.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug))]
    pub async fn list_tags(&self, params: &ListTags, opts: &RequestOptions) -> Result<Vec<Tag>> {
        self.get(&params.path(), &params.query_params(), opts).await
    }

    /// List issues of an organization or a single project.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug))]
    pub async fn list_issues(
        &self,
        params: &ListIssues,
        opts: &RequestOptions,
    ) -> Result<Vec<Issue>> {
        let issues: Vec<Issue> = self.get(&params.path(), &params.query_params(), opts).await?;
        debug!("Found {} issues", issues.len());
        Ok(issues)
    }

    /// Get a single issue by numeric or short ID.
    #[instrument(skip(self, opts))]
    pub async fn get_issue(
        &self,
        organization_slug: &str,
        issue_id: &str,
        opts: &RequestOptions,
    ) -> Result<Issue> {
        let path = format!(
            "/organizations/{}/issues/{}/",
            segment(organization_slug),
            segment(issue_id)
        );
        self.get(&path, &[], opts).await
    }

    /// Get one event of an issue.
    #[instrument(skip(self, opts))]
    pub async fn get_event_for_issue(
        &self,
        organization_slug: &str,
        issue_id: &str,
        event_id: &str,
        opts: &RequestOptions,
    ) -> Result<Event> {
        let path = format!(
            "/organizations/{}/issues/{}/events/{}/",
            segment(organization_slug),
            segment(issue_id),
            segment(event_id)
        );
        let event: Event = self.get(&path, &[], opts).await?;
        debug!(kind = event.kind(), "Fetched event {}", event.id());
        Ok(event)
    }

    /// Get the most recent event of an issue.
    pub async fn get_latest_event_for_issue(
        &self,
        organization_slug: &str,
        issue_id: &str,
        opts: &RequestOptions,
    ) -> Result<Event> {
        self.get_event_for_issue(organization_slug, issue_id, "latest", opts)
            .await
    }

    /// Search error events.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug))]
    pub async fn search_errors(
        &self,
        params: &SearchErrors,
        opts: &RequestOptions,
    ) -> Result<Vec<ErrorSearchRow>> {
        let response: SearchResponse<ErrorSearchRow> =
            self.get(&params.path(), &params.query_params(), opts).await?;
        Ok(response.data)
    }

    /// Search transaction spans.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug))]
    pub async fn search_spans(
        &self,
        params: &SearchSpans,
        opts: &RequestOptions,
    ) -> Result<Vec<SpanSearchRow>> {
        let response: SearchResponse<SpanSearchRow> =
            self.get(&params.path(), &params.query_params(), opts).await?;
        Ok(response.data)
    }

    /// Start an autofix run for an issue.
    #[instrument(skip(self, opts), fields(org = %params.organization_slug, issue = %params.issue_id))]
    pub async fn start_autofix(
        &self,
        params: &StartAutofix,
        opts: &RequestOptions,
    ) -> Result<AutofixRun> {
        let path = autofix_path(&params.organization_slug, &params.issue_id);
        let body = StartAutofixRequest {
            event_id: params.event_id.as_deref(),
            instruction: &params.instruction,
        };
        let run: AutofixRun = self.post(&path, &body, opts).await?;
        info!(run_id = %run.run_id, "Autofix started");
        Ok(run)
    }

    /// Get the state of the autofix run of an issue.
    #[instrument(skip(self, opts))]
    pub async fn get_autofix_state(
        &self,
        organization_slug: &str,
        issue_id: &str,
        opts: &RequestOptions,
    ) -> Result<AutofixRunState> {
        self.get(&autofix_path(organization_slug, issue_id), &[], opts)
            .await
    }

    /// Perform a GET and validate the body against `R`.
    async fn get<R>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        opts: &RequestOptions,
    ) -> Result<R>
    where
        R: JsonSchema + DeserializeOwned,
    {
        let response = self.send(Method::GET, path, query, None, opts).await?;
        Ok(schema::parse(&response.body)?)
    }

    /// Perform a POST with a JSON body and validate the reply against `R`.
    async fn post<B, R>(&self, path: &str, body: &B, opts: &RequestOptions) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: JsonSchema + DeserializeOwned,
    {
        let body = serde_json::to_string(body)
            .map_err(|e| ApiError::Transport(format!("failed to encode request body: {}", e)))?;
        let response = self
            .send(Method::POST, path, &[], Some(body), opts)
            .await?;
        Ok(schema::parse(&response.body)?)
    }

    /// Build and execute a request, turning non-2xx responses into errors.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<String>,
        opts: &RequestOptions,
    ) -> Result<HttpResponse> {
        let url = self.url_for(path, query, opts)?;
        debug!(url = %url, "Sending request");

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(ref token) = self.access_token {
            headers.push((
                "Authorization".to_string(),
                token.header_value().to_string(),
            ));
        }

        let response = self
            .transport
            .execute(HttpRequest {
                method,
                url: url.into(),
                headers,
                body,
            })
            .await?;

        if response.is_success() {
            Ok(response)
        } else {
            debug!("Error response body: {}", response.body);
            let error = normalize_error(&response);
            warn!(status = response.status, "Request failed: {}", error);
            Err(error)
        }
    }

    /// Resolve `path` against the default host or the per-call host.
    fn url_for(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        opts: &RequestOptions,
    ) -> Result<Url> {
        let prefix = match opts.host {
            Some(ref host) => api_prefix(&normalize_host(host)),
            None => self.api_prefix.clone(),
        };
        let raw = format!("{}{}", prefix, path);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

/// Turn a failed response into an [`ApiError`].
///
/// A JSON body with a string `detail` is a remote failure; anything else is
/// a transport failure carrying the raw body.
fn normalize_error(response: &HttpResponse) -> ApiError {
    match schema::parse::<ApiErrorBody>(&response.body) {
        Ok(body) => ApiError::Api {
            status: response.status,
            message: rewrite_cross_project(&body.detail),
        },
        Err(_) => ApiError::transport(response.status, &response.status_text, &response.body),
    }
}

/// Replace the remote's cross-project permission failures with an
/// actionable message. Other details pass through unchanged.
pub fn rewrite_cross_project(detail: &str) -> String {
    if CROSS_PROJECT_DETAILS.iter().any(|d| detail.contains(d)) {
        CROSS_PROJECT_MESSAGE.to_string()
    } else {
        detail.to_string()
    }
}

/// Extract `host[:port]` from an absolute URL such as a region URL.
pub fn host_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", url, e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ApiError::InvalidUrl(format!("{}: missing host", url)))?;
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Web URL of an issue.
///
/// On `sentry.io` the organization is a subdomain; self-hosted instances
/// use the `/organizations/{org}/` path.
pub fn issue_url(host: &str, organization_slug: &str, issue_id: &str) -> String {
    if host == DEFAULT_HOST {
        format!("https://{}.{}/issues/{}", organization_slug, host, issue_id)
    } else {
        format!(
            "https://{}/organizations/{}/issues/{}",
            host, organization_slug, issue_id
        )
    }
}

/// Web URL of a trace. Same host rules as [`issue_url`].
pub fn trace_url(host: &str, organization_slug: &str, trace_id: &str) -> String {
    if host == DEFAULT_HOST {
        format!(
            "https://{}.{}/explore/traces/trace/{}",
            organization_slug, host, trace_id
        )
    } else {
        format!(
            "https://{}/organizations/{}/explore/traces/trace/{}",
            host, organization_slug, trace_id
        )
    }
}

fn autofix_path(organization_slug: &str, issue_id: &str) -> String {
    format!(
        "/organizations/{}/issues/{}/autofix/",
        segment(organization_slug),
        segment(issue_id)
    )
}

fn api_prefix(host: &str) -> String {
    format!("https://{}/api/0", host)
}

/// Trim whitespace and trailing slashes from a configured host.
fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('/').to_string()
}
