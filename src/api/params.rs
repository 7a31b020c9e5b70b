//! Parameter objects for resource operations, and the query strings they
//! produce.
//!
//! Query construction is kept pure so the exact parameters sent to the API
//! can be checked without a network.

use serde::{Deserialize, Serialize};

/// Ordered query-string pairs. Keys may repeat (`field`).
pub type QueryParams = Vec<(&'static str, String)>;

/// Page size for every search.
pub const PER_PAGE: &str = "10";

/// Referrer tag sent with every search.
pub const REFERRER: &str = "sentry-mcp";

/// Stats window for every search.
pub const STATS_PERIOD: &str = "24h";

/// Columns requested by an error search.
pub const ERROR_FIELDS: [&str; 5] = ["issue", "title", "project", "last_seen()", "count()"];

/// Columns requested by a span search.
pub const SPAN_FIELDS: [&str; 8] = [
    "id",
    "trace",
    "span.op",
    "span.description",
    "span.duration",
    "transaction",
    "project",
    "timestamp",
];

/// Percent-encode a single path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Quote a value for an exact search-term match, escaping embedded quotes.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Sort order for issue lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IssueSort {
    /// Most recently seen first.
    LastSeen,
    /// Newest first.
    FirstSeen,
    /// Most events first.
    Count,
    /// Most affected users first.
    UserCount,
}

impl IssueSort {
    /// The value the API expects for `sort`.
    pub fn as_param(&self) -> &'static str {
        match self {
            IssueSort::LastSeen => "date",
            IssueSort::FirstSeen => "new",
            IssueSort::Count => "freq",
            IssueSort::UserCount => "user",
        }
    }
}

/// Sort order for error searches.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSort {
    #[default]
    LastSeen,
    Count,
}

impl ErrorSort {
    /// The value the API expects for `sort` (always descending).
    pub fn as_param(&self) -> &'static str {
        match self {
            ErrorSort::LastSeen => "-last_seen",
            ErrorSort::Count => "-count",
        }
    }
}

/// Sort order for span searches.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SpanSort {
    #[default]
    Timestamp,
    Duration,
}

impl SpanSort {
    /// The value the API expects for `sort` (always descending).
    pub fn as_param(&self) -> &'static str {
        match self {
            SpanSort::Timestamp => "-timestamp",
            SpanSort::Duration => "-span.duration",
        }
    }
}

/// Dataset a tag listing is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TagDataset {
    Errors,
    SearchIssues,
}

impl TagDataset {
    pub fn as_param(&self) -> &'static str {
        match self {
            TagDataset::Errors => "errors",
            TagDataset::SearchIssues => "search_issues",
        }
    }
}

/// Parameters for listing issues.
#[derive(Debug, Clone, Default)]
pub struct ListIssues {
    pub organization_slug: String,
    pub project_slug: Option<String>,
    /// Free-text query fragments; joined with spaces.
    pub query: Vec<String>,
    pub sort: Option<IssueSort>,
}

impl ListIssues {
    /// Project-scoped when a project is given, organization-scoped otherwise.
    pub fn path(&self) -> String {
        match self.project_slug {
            Some(ref project) => format!(
                "/projects/{}/{}/issues/",
                segment(&self.organization_slug),
                segment(project)
            ),
            None => format!("/organizations/{}/issues/", segment(&self.organization_slug)),
        }
    }

    pub fn query_params(&self) -> QueryParams {
        let mut params: QueryParams = vec![
            ("per_page", PER_PAGE.to_string()),
            ("referrer", REFERRER.to_string()),
        ];
        if let Some(sort) = self.sort {
            params.push(("sort", sort.as_param().to_string()));
        }
        params.push(("statsPeriod", STATS_PERIOD.to_string()));
        params.push(("query", self.query.join(" ")));
        params.push(("collapse", "unhandled".to_string()));
        params
    }
}

/// Parameters for searching error events.
#[derive(Debug, Clone, Default)]
pub struct SearchErrors {
    pub organization_slug: String,
    pub project_slug: Option<String>,
    /// File name suffix to match against stack frames.
    pub filename: Option<String>,
    /// Exact transaction name.
    pub transaction: Option<String>,
    /// Free-text search query.
    pub query: Option<String>,
    pub sort: ErrorSort,
}

impl SearchErrors {
    pub fn path(&self) -> String {
        format!("/organizations/{}/events/", segment(&self.organization_slug))
    }

    /// The search expression: filename, transaction, query, project.
    pub fn search_query(&self) -> String {
        let mut terms: Vec<String> = Vec::new();
        if let Some(ref filename) = self.filename {
            terms.push(format!("stack.filename:{}", quoted(&format!("*{}", filename))));
        }
        if let Some(ref transaction) = self.transaction {
            terms.push(format!("transaction:{}", quoted(transaction)));
        }
        if let Some(ref query) = self.query {
            terms.push(query.clone());
        }
        if let Some(ref project) = self.project_slug {
            terms.push(format!("project:{}", project));
        }
        terms.join(" ")
    }

    pub fn query_params(&self) -> QueryParams {
        let mut params: QueryParams = vec![
            ("dataset", "errors".to_string()),
            ("per_page", PER_PAGE.to_string()),
            ("referrer", REFERRER.to_string()),
            ("sort", self.sort.as_param().to_string()),
            ("statsPeriod", STATS_PERIOD.to_string()),
        ];
        params.extend(ERROR_FIELDS.iter().map(|f| ("field", f.to_string())));
        params.push(("query", self.search_query()));
        params
    }
}

/// Parameters for searching transaction spans.
#[derive(Debug, Clone, Default)]
pub struct SearchSpans {
    pub organization_slug: String,
    pub project_slug: Option<String>,
    /// Exact transaction name.
    pub transaction: Option<String>,
    /// Free-text search query.
    pub query: Option<String>,
    pub sort: SpanSort,
}

impl SearchSpans {
    pub fn path(&self) -> String {
        format!("/organizations/{}/events/", segment(&self.organization_slug))
    }

    /// The search expression; always limited to transactions.
    pub fn search_query(&self) -> String {
        let mut terms: Vec<String> = vec!["is_transaction:true".to_string()];
        if let Some(ref transaction) = self.transaction {
            terms.push(format!("transaction:{}", quoted(transaction)));
        }
        if let Some(ref query) = self.query {
            terms.push(query.clone());
        }
        if let Some(ref project) = self.project_slug {
            terms.push(format!("project:{}", project));
        }
        terms.join(" ")
    }

    pub fn query_params(&self) -> QueryParams {
        let mut params: QueryParams = vec![
            ("dataset", "spans".to_string()),
            ("per_page", PER_PAGE.to_string()),
            ("referrer", REFERRER.to_string()),
            ("sort", self.sort.as_param().to_string()),
            ("allowAggregateConditions", "0".to_string()),
            ("useRpc", "1".to_string()),
        ];
        params.extend(SPAN_FIELDS.iter().map(|f| ("field", f.to_string())));
        params.push(("query", self.search_query()));
        params
    }
}

/// Parameters for listing releases.
#[derive(Debug, Clone, Default)]
pub struct ListReleases {
    pub organization_slug: String,
    pub project_slug: Option<String>,
    pub query: Option<String>,
}

impl ListReleases {
    pub fn path(&self) -> String {
        match self.project_slug {
            Some(ref project) => format!(
                "/projects/{}/{}/releases/",
                segment(&self.organization_slug),
                segment(project)
            ),
            None => format!("/organizations/{}/releases/", segment(&self.organization_slug)),
        }
    }

    pub fn query_params(&self) -> QueryParams {
        self.query
            .iter()
            .filter(|q| !q.is_empty())
            .map(|q| ("query", q.clone()))
            .collect()
    }
}

/// Parameters for listing tags.
#[derive(Debug, Clone, Default)]
pub struct ListTags {
    pub organization_slug: String,
    pub dataset: Option<TagDataset>,
}

impl ListTags {
    pub fn path(&self) -> String {
        format!("/organizations/{}/tags/", segment(&self.organization_slug))
    }

    pub fn query_params(&self) -> QueryParams {
        self.dataset
            .iter()
            .map(|d| ("dataset", d.as_param().to_string()))
            .collect()
    }
}

/// Parameters for creating a project.
#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub organization_slug: String,
    pub team_slug: String,
    pub name: String,
    pub platform: Option<String>,
}

/// Parameters for creating a client key.
#[derive(Debug, Clone, Default)]
pub struct CreateClientKey {
    pub organization_slug: String,
    pub project_slug: String,
    pub name: Option<String>,
}

/// Parameters for starting an autofix run.
#[derive(Debug, Clone, Default)]
pub struct StartAutofix {
    pub organization_slug: String,
    pub issue_id: String,
    pub event_id: Option<String>,
    /// Extra guidance for the run; empty when not given.
    pub instruction: String,
}
