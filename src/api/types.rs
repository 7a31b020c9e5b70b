//! Sentry API request and response types.
//!
//! These types are the response contracts for the Sentry REST API. Each one
//! derives [`JsonSchema`] so [`crate::api::schema`] can check a body against
//! it before deserializing.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An identifier the API sends as either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StringOrNumber {
    /// String form, e.g. `"4509062593708032"`.
    String(String),
    /// Numeric form.
    Number(i64),
}

impl fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringOrNumber::String(s) => write!(f, "{}", s),
            StringOrNumber::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Body of a failed response.
///
/// Only `detail` is required; everything else is ignored.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ApiErrorBody {
    /// The human-readable failure reason.
    pub detail: String,
}

/// The authenticated user.
///
/// Returned by `GET /api/0/auth/`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct User {
    /// The user ID.
    pub id: StringOrNumber,
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.email)
    }
}

/// A data-residency region.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Region {
    /// Region name, e.g. `us`.
    pub name: String,
    /// Absolute base URL of the region.
    pub url: String,
}

/// Regions the current user has organizations in.
///
/// Returned by `GET /api/0/users/me/regions/`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserRegions {
    /// The regions, in the order the API lists them.
    pub regions: Vec<Region>,
}

/// Links attached to an organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationLinks {
    /// Web URL of the organization.
    pub organization_url: String,
    /// Base URL of the region that owns the organization.
    pub region_url: String,
}

/// A Sentry organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Organization {
    /// The organization ID.
    pub id: StringOrNumber,
    /// The organization slug.
    pub slug: String,
    /// The organization name.
    pub name: String,
    /// Web and region links.
    pub links: OrganizationLinks,
}

/// A team within an organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Team {
    /// The team ID.
    pub id: StringOrNumber,
    /// The team slug.
    pub slug: String,
    /// The team name.
    pub name: String,
}

/// A project within an organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    /// The project ID.
    pub id: StringOrNumber,
    /// The project slug.
    pub slug: String,
    /// The project name.
    pub name: String,
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug)
    }
}

/// The DSN values of a client key.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Dsn {
    /// The public DSN used by SDKs.
    pub public: String,
}

/// A project client key (DSN).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientKey {
    /// The key ID.
    pub id: StringOrNumber,
    /// The key name.
    pub name: String,
    /// The DSN values.
    pub dsn: Dsn,
    /// Whether the key accepts events.
    pub is_active: bool,
    /// When the key was created.
    pub date_created: String,
}

/// Author of a commit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// The most recent commit of a release.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: StringOrNumber,
    pub message: String,
    pub date_created: String,
    pub author: CommitAuthor,
}

/// The most recent deploy of a release.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    pub id: StringOrNumber,
    pub environment: String,
    #[serde(default)]
    pub date_started: Option<String>,
    #[serde(default)]
    pub date_finished: Option<String>,
}

/// A release.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// The release ID.
    pub id: StringOrNumber,
    /// The full version string.
    pub version: String,
    /// The abbreviated version string.
    pub short_version: String,
    /// When the release was created.
    pub date_created: String,
    /// When the release was finalized, if it was.
    #[serde(default)]
    pub date_released: Option<String>,
    /// First event seen in this release.
    #[serde(default)]
    pub first_event: Option<String>,
    /// Last event seen in this release.
    #[serde(default)]
    pub last_event: Option<String>,
    /// Number of new issues introduced.
    pub new_groups: i64,
    /// The most recent commit.
    #[serde(default)]
    pub last_commit: Option<Commit>,
    /// The most recent deploy.
    #[serde(default)]
    pub last_deploy: Option<Deploy>,
    /// Projects the release belongs to.
    pub projects: Vec<Project>,
}

/// A tag key known to an organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// The tag key, e.g. `browser`.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Number of distinct values.
    pub total_values: i64,
}

/// The kind of an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Error,
    Transaction,
    #[default]
    Other,
}

impl<'de> Deserialize<'de> for IssueType {
    /// Any value other than the strings `error` and `transaction` is
    /// [`IssueType::Other`], including `null` and non-string values.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if s == "error" => IssueType::Error,
            Value::String(s) if s == "transaction" => IssueType::Transaction,
            _ => IssueType::Other,
        })
    }
}

/// A Sentry issue (group of similar events).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// The internal issue ID.
    pub id: StringOrNumber,
    /// Short ID (e.g., "PROJECT-123").
    pub short_id: String,
    /// Issue title.
    pub title: String,
    /// First seen timestamp.
    pub first_seen: String,
    /// Last seen timestamp.
    pub last_seen: String,
    /// Number of events.
    pub count: StringOrNumber,
    /// Number of affected users.
    pub user_count: StringOrNumber,
    /// Permalink to the Sentry UI.
    pub permalink: String,
    /// The owning project.
    pub project: Project,
    /// Platform (python, javascript, etc.).
    pub platform: String,
    /// Status (unresolved, resolved, ignored).
    pub status: String,
    /// Culprit (location in code).
    pub culprit: String,
    /// Issue kind; anything unrecognised (or absent) is [`IssueType::Other`].
    #[serde(rename = "type", default)]
    #[schemars(with = "Value")]
    pub kind: IssueType,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.short_id, self.title)
    }
}

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

/// A stack frame. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub line_no: Option<i64>,
    #[serde(default)]
    pub col_no: Option<i64>,
    #[serde(default)]
    pub abs_path: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    /// Source context as `(line number, source line)` pairs.
    #[serde(default)]
    pub context: Option<Vec<(i64, String)>>,
}

/// A stack trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Stacktrace {
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// How an exception was captured.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Mechanism {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub handled: Option<bool>,
}

/// A single exception. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Exception {
    #[serde(default)]
    pub mechanism: Option<Mechanism>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub stacktrace: Option<Stacktrace>,
}

/// Payload of an `exception` entry.
///
/// The API sends either `values` or a single `value`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExceptionData {
    pub values: Vec<Option<Exception>>,
    #[serde(default)]
    pub value: Option<Exception>,
}

impl ExceptionData {
    /// All exceptions in the entry, whichever form the API used.
    pub fn exceptions(&self) -> Vec<&Exception> {
        let mut all: Vec<&Exception> = self.values.iter().flatten().collect();
        if let Some(ref single) = self.value {
            all.push(single);
        }
        all
    }
}

/// Payload of a `request` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RequestData {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ExceptionTag {
    #[serde(rename = "exception")]
    Exception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RequestTag {
    #[serde(rename = "request")]
    Request,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SpansTag {
    #[serde(rename = "spans")]
    Spans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BreadcrumbsTag {
    #[serde(rename = "breadcrumbs")]
    Breadcrumbs,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExceptionEntry {
    #[serde(rename = "type")]
    pub kind: ExceptionTag,
    pub data: ExceptionData,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RequestEntry {
    #[serde(rename = "type")]
    pub kind: RequestTag,
    pub data: RequestData,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpansEntry {
    #[serde(rename = "type")]
    pub kind: SpansTag,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BreadcrumbsEntry {
    #[serde(rename = "type")]
    pub kind: BreadcrumbsTag,
    #[serde(default)]
    pub data: Value,
}

/// Any entry this client has no dedicated shape for.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OtherEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// One entry of an event, tagged on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Entry {
    Exception(ExceptionEntry),
    Request(RequestEntry),
    Spans(SpansEntry),
    Breadcrumbs(BreadcrumbsEntry),
    Other(OtherEntry),
}

impl Entry {
    /// The entry's `type` tag.
    pub fn kind(&self) -> &str {
        match self {
            Entry::Exception(_) => "exception",
            Entry::Request(_) => "request",
            Entry::Spans(_) => "spans",
            Entry::Breadcrumbs(_) => "breadcrumbs",
            Entry::Other(other) => &other.kind,
        }
    }
}

/// A named event context (`os`, `runtime`, `trace`, ...).
///
/// The shape varies per context kind, so everything but `type` is kept as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Context {
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Context {
    /// The context kind when it is a string.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_str()
    }
}

/// Fields shared by every event variant.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventBase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub contexts: Option<BTreeMap<String, Context>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ErrorEventTag {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TransactionEventTag {
    #[serde(rename = "transaction")]
    Transaction,
}

/// An error event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    #[serde(rename = "type")]
    pub kind: ErrorEventTag,
    #[serde(default)]
    pub culprit: Option<String>,
    pub date_created: String,
    #[serde(flatten)]
    pub base: EventBase,
}

/// The issue occurrence a transaction event belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub issue_title: String,
    #[serde(default)]
    pub culprit: Option<String>,
}

/// A transaction (performance) event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionEvent {
    #[serde(rename = "type")]
    pub kind: TransactionEventTag,
    pub occurrence: Occurrence,
    #[serde(flatten)]
    pub base: EventBase,
}

/// An event of any other kind.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnknownEvent {
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(flatten)]
    pub base: EventBase,
}

/// A Sentry event, tagged on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Event {
    Error(ErrorEvent),
    Transaction(TransactionEvent),
    Unknown(UnknownEvent),
}

impl Event {
    /// Fields shared by all variants.
    pub fn base(&self) -> &EventBase {
        match self {
            Event::Error(e) => &e.base,
            Event::Transaction(e) => &e.base,
            Event::Unknown(e) => &e.base,
        }
    }

    /// The event ID.
    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// The event title.
    pub fn title(&self) -> &str {
        &self.base().title
    }

    /// The event kind as the API named it.
    pub fn kind(&self) -> &str {
        match self {
            Event::Error(_) => "error",
            Event::Transaction(_) => "transaction",
            Event::Unknown(e) => e.kind.as_str().unwrap_or("unknown"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id(), self.title())
    }
}

// ----------------------------------------------------------------------------
// Discover search
// ----------------------------------------------------------------------------

/// Metadata returned next to search rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchMeta {
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Envelope of an `/events/` search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse<T> {
    /// Rows in the order the API returned them.
    pub data: Vec<T>,
    pub meta: SearchMeta,
}

/// One row of an error search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorSearchRow {
    /// The issue short ID.
    pub issue: String,
    #[serde(rename = "issue.id")]
    pub issue_id: StringOrNumber,
    pub project: String,
    pub title: String,
    #[serde(rename = "count()")]
    pub count: i64,
    #[serde(rename = "last_seen()")]
    pub last_seen: String,
}

/// One row of a span (transaction) search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpanSearchRow {
    pub id: String,
    pub trace: String,
    #[serde(rename = "span.op")]
    pub span_op: String,
    #[serde(rename = "span.description")]
    pub span_description: String,
    /// Duration in milliseconds.
    #[serde(rename = "span.duration")]
    pub span_duration: f64,
    pub transaction: String,
    pub project: String,
    pub timestamp: String,
}

// ----------------------------------------------------------------------------
// Autofix
// ----------------------------------------------------------------------------

/// Handle of a started autofix run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AutofixRun {
    pub run_id: StringOrNumber,
    /// Everything else the API sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Status of an autofix run or one of its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutofixStatus {
    Pending,
    Processing,
    InProgress,
    NeedMoreInformation,
    Completed,
    Failed,
    Error,
    Cancelled,
    WaitingForUserResponse,
}

impl AutofixStatus {
    /// Whether the run (or step) will not change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AutofixStatus::Completed
                | AutofixStatus::Failed
                | AutofixStatus::Error
                | AutofixStatus::Cancelled
        )
    }
}

impl fmt::Display for AutofixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutofixStatus::Pending => "PENDING",
            AutofixStatus::Processing => "PROCESSING",
            AutofixStatus::InProgress => "IN_PROGRESS",
            AutofixStatus::NeedMoreInformation => "NEED_MORE_INFORMATION",
            AutofixStatus::Completed => "COMPLETED",
            AutofixStatus::Failed => "FAILED",
            AutofixStatus::Error => "ERROR",
            AutofixStatus::Cancelled => "CANCELLED",
            AutofixStatus::WaitingForUserResponse => "WAITING_FOR_USER_RESPONSE",
        };
        write!(f, "{}", s)
    }
}

/// Severity of a progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProgressLevel {
    Info,
    Warning,
    Error,
}

/// A progress message of a step.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AutofixProgress {
    #[serde(default)]
    pub data: Value,
    pub message: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub level: ProgressLevel,
}

/// Fields shared by every autofix step, apart from the `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AutofixStepFields {
    pub key: String,
    pub index: i64,
    pub status: AutofixStatus,
    pub title: String,
    #[serde(default)]
    pub output_stream: Option<String>,
    pub progress: Vec<AutofixProgress>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An insight produced by a default step.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AutofixInsight {
    #[serde(default)]
    pub change_diff: Value,
    pub generated_at_memory_index: i64,
    pub insight: String,
    pub justification: String,
}

/// A file referenced by a root cause.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelevantCodeFile {
    pub file_path: String,
    pub repo_name: String,
}

/// One timeline item of a root cause reproduction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RootCauseReproduction {
    pub code_snippet_and_analysis: String,
    pub is_most_important_event: bool,
    #[serde(default)]
    pub relevant_code_file: Option<RelevantCodeFile>,
    pub timeline_item_type: String,
    pub title: String,
}

/// A candidate root cause.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RootCause {
    pub description: String,
    pub id: i64,
    pub root_cause_reproduction: Vec<RootCauseReproduction>,
}

/// One item of a proposed solution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SolutionItem {
    #[serde(default)]
    pub code_snippet_and_analysis: Option<String>,
    pub is_active: bool,
    pub is_most_important_event: bool,
    pub timeline_item_type: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DefaultStepTag {
    #[serde(rename = "default")]
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RootCauseStepTag {
    #[serde(rename = "root_cause_analysis")]
    RootCauseAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SolutionStepTag {
    #[serde(rename = "solution")]
    Solution,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DefaultStep {
    #[serde(rename = "type")]
    pub tag: DefaultStepTag,
    #[serde(default)]
    pub insights: Option<Vec<AutofixInsight>>,
    #[serde(flatten)]
    pub fields: AutofixStepFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RootCauseStep {
    #[serde(rename = "type")]
    pub tag: RootCauseStepTag,
    pub causes: Vec<RootCause>,
    #[serde(flatten)]
    pub fields: AutofixStepFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SolutionStep {
    #[serde(rename = "type")]
    pub tag: SolutionStepTag,
    pub solution: Vec<SolutionItem>,
    #[serde(flatten)]
    pub fields: AutofixStepFields,
}

/// A step of a kind this client has no dedicated shape for.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OtherStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: AutofixStepFields,
}

/// One step of an autofix run, tagged on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AutofixStep {
    Default(DefaultStep),
    RootCauseAnalysis(RootCauseStep),
    Solution(SolutionStep),
    Other(OtherStep),
}

impl AutofixStep {
    /// Fields shared by all variants.
    pub fn fields(&self) -> &AutofixStepFields {
        match self {
            AutofixStep::Default(s) => &s.fields,
            AutofixStep::RootCauseAnalysis(s) => &s.fields,
            AutofixStep::Solution(s) => &s.fields,
            AutofixStep::Other(s) => &s.fields,
        }
    }

    /// The step's `type` tag.
    pub fn kind(&self) -> &str {
        match self {
            AutofixStep::Default(_) => "default",
            AutofixStep::RootCauseAnalysis(_) => "root_cause_analysis",
            AutofixStep::Solution(_) => "solution",
            AutofixStep::Other(s) => &s.kind,
        }
    }
}

/// Details of an existing autofix run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AutofixDetails {
    pub run_id: i64,
    #[serde(default)]
    pub request: Value,
    pub updated_at: String,
    pub status: AutofixStatus,
    pub steps: Vec<AutofixStep>,
}

/// Autofix state of an issue.
///
/// `autofix` is `None` when no run exists yet, which is distinct from a run
/// in [`AutofixStatus::Pending`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AutofixRunState {
    #[serde(default)]
    pub autofix: Option<AutofixDetails>,
}

// ----------------------------------------------------------------------------
// Request bodies
// ----------------------------------------------------------------------------

/// Body of `POST /organizations/{org}/teams/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTeamRequest<'a> {
    pub name: &'a str,
}

/// Body of `POST /teams/{org}/{team}/projects/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<&'a str>,
}

/// Body of `POST /projects/{org}/{project}/keys/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateClientKeyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Body of `POST /organizations/{org}/issues/{issue}/autofix/`.
#[derive(Debug, Clone, Serialize)]
pub struct StartAutofixRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<&'a str>,
    pub instruction: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::schema::validate;
    use serde_json::json;

    fn issue_json() -> Value {
        json!({
            "id": "6507376925",
            "shortId": "CLOUDFLARE-MCP-41",
            "title": "Error: Tool list_organizations is already registered",
            "firstSeen": "2025-04-03T22:51:19.403000Z",
            "lastSeen": "2025-04-12T11:34:11Z",
            "count": "25",
            "userCount": 1,
            "permalink": "https://sentry-mcp.sentry.io/issues/6507376925/",
            "project": {"id": "4509062593708032", "name": "CLOUDFLARE-MCP", "slug": "cloudflare-mcp"},
            "platform": "javascript",
            "status": "unresolved",
            "culprit": "Object.fetch(index)",
            "type": "error",
            "isBookmarked": false
        })
    }

    #[test]
    fn test_parse_issue() {
        let issue: Issue = validate(&issue_json()).unwrap();
        assert_eq!(issue.short_id, "CLOUDFLARE-MCP-41");
        assert_eq!(issue.count.to_string(), "25");
        assert_eq!(issue.user_count, StringOrNumber::Number(1));
        assert_eq!(issue.kind, IssueType::Error);
        assert_eq!(issue.project.slug, "cloudflare-mcp");
    }

    #[test]
    fn test_issue_unknown_type_is_other() {
        let mut value = issue_json();
        value["type"] = json!("feedback");
        let issue: Issue = validate(&value).unwrap();
        assert_eq!(issue.kind, IssueType::Other);

        value.as_object_mut().unwrap().remove("type");
        let issue: Issue = validate(&value).unwrap();
        assert_eq!(issue.kind, IssueType::Other);
    }

    #[test]
    fn test_issue_non_string_type_is_other() {
        let mut with_null = issue_json();
        with_null["type"] = Value::Null;
        let issues: Vec<Issue> = validate(&json!([issue_json(), with_null])).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueType::Error);
        assert_eq!(issues[1].kind, IssueType::Other);

        let mut with_number = issue_json();
        with_number["type"] = json!(3);
        let issue: Issue = validate(&with_number).unwrap();
        assert_eq!(issue.kind, IssueType::Other);

        with_number["type"] = json!({"name": "error"});
        let issue: Issue = validate(&with_number).unwrap();
        assert_eq!(issue.kind, IssueType::Other);
    }

    #[test]
    fn test_issue_missing_required_field_fails() {
        let mut value = issue_json();
        value.as_object_mut().unwrap().remove("shortId");
        value.as_object_mut().unwrap().remove("permalink");
        let err = validate::<Issue>(&value).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("shortId"), "{}", text);
        assert!(text.contains("permalink"), "{}", text);
    }

    #[test]
    fn test_issue_display() {
        let issue: Issue = validate(&issue_json()).unwrap();
        assert_eq!(
            issue.to_string(),
            "CLOUDFLARE-MCP-41: Error: Tool list_organizations is already registered"
        );
    }

    fn error_event_json() -> Value {
        json!({
            "id": "7ca573c0f4814912aaa9bdc77d1a7d51",
            "title": "Error: Tool list_organizations is already registered",
            "message": "",
            "platform": "javascript",
            "type": "error",
            "culprit": "Object.fetch(index)",
            "dateCreated": "2025-04-08T21:15:04.000Z",
            "entries": [
                {
                    "type": "exception",
                    "data": {
                        "values": [{
                            "type": "Error",
                            "value": "Tool list_organizations is already registered",
                            "mechanism": {"type": "cloudflare", "handled": false},
                            "stacktrace": {
                                "frames": [{
                                    "filename": "index.js",
                                    "function": "OAuthProviderImpl.fetch",
                                    "lineNo": 7940,
                                    "colNo": 24,
                                    "context": [[7939, "    try {"], [7940, "      return await x();"]]
                                }]
                            }
                        }]
                    }
                },
                {"type": "request", "data": {"method": "GET", "url": "https://example.com/"}},
                {"type": "breadcrumbs", "data": {"values": []}},
                {"type": "threads", "data": {"values": [1, 2, 3]}}
            ],
            "contexts": {
                "runtime": {"type": "runtime", "name": "cloudflare", "version": "1"},
                "custom": {"type": 42, "anything": ["goes"]}
            }
        })
    }

    #[test]
    fn test_parse_error_event() {
        let event: Event = validate(&error_event_json()).unwrap();
        let Event::Error(ref error) = event else {
            panic!("Expected error event, got {:?}", event);
        };
        assert_eq!(error.culprit.as_deref(), Some("Object.fetch(index)"));
        assert_eq!(event.kind(), "error");

        let entries = &event.base().entries;
        let kinds: Vec<&str> = entries.iter().map(Entry::kind).collect();
        assert_eq!(kinds, vec!["exception", "request", "breadcrumbs", "threads"]);

        let Entry::Exception(ref exception) = entries[0] else {
            panic!("Expected exception entry");
        };
        let exceptions = exception.data.exceptions();
        assert_eq!(exceptions.len(), 1);
        let frames = &exceptions[0].stacktrace.as_ref().unwrap().frames;
        assert_eq!(frames[0].line_no, Some(7940));
        assert_eq!(frames[0].context.as_ref().unwrap()[1].0, 7940);

        let contexts = event.base().contexts.as_ref().unwrap();
        assert_eq!(contexts["runtime"].kind(), Some("runtime"));
        assert_eq!(contexts["custom"].kind(), None);
        assert_eq!(contexts["runtime"].fields["name"], json!("cloudflare"));
    }

    #[test]
    fn test_parse_transaction_event() {
        let value = json!({
            "id": "abc",
            "title": "GET /api",
            "message": null,
            "platform": null,
            "type": "transaction",
            "occurrence": {"issueTitle": "N+1 Query", "culprit": "SELECT *"},
            "entries": [{"type": "spans", "data": [{"op": "db"}]}]
        });
        let event: Event = validate(&value).unwrap();
        match event {
            Event::Transaction(ref t) => assert_eq!(t.occurrence.issue_title, "N+1 Query"),
            other => panic!("Expected transaction event, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_type_degrades_to_base() {
        let value = json!({
            "id": "abc",
            "title": "Something new",
            "type": "generic",
            "entries": []
        });
        let event: Event = validate(&value).unwrap();
        assert!(matches!(event, Event::Unknown(_)));
        assert_eq!(event.kind(), "generic");
        assert!(event.base().contexts.is_none());
    }

    #[test]
    fn test_event_missing_entries_fails() {
        let value = json!({"id": "abc", "title": "x", "type": "error"});
        assert!(validate::<Event>(&value).is_err());
    }

    #[test]
    fn test_parse_release_with_absent_optionals() {
        let value = json!([{
            "id": 1,
            "version": "8ce89484-0fec-4913-a2cd-e8e2d41dee36",
            "shortVersion": "8ce89484",
            "dateCreated": "2025-04-13T19:54:21.764000Z",
            "dateReleased": null,
            "firstEvent": null,
            "lastEvent": null,
            "newGroups": 0,
            "lastCommit": null,
            "lastDeploy": null,
            "projects": [{"id": 4509062593708032_i64, "name": "CLOUDFLARE-MCP", "slug": "cloudflare-mcp"}]
        }]);
        let releases: Vec<Release> = validate(&value).unwrap();
        assert_eq!(releases.len(), 1);
        assert!(releases[0].last_commit.is_none());
        assert_eq!(releases[0].projects[0].slug, "cloudflare-mcp");
    }

    #[test]
    fn test_parse_error_search_rows() {
        let value = json!({
            "data": [{
                "issue": "CLOUDFLARE-MCP-41",
                "issue.id": 6507376925_i64,
                "project": "cloudflare-mcp",
                "title": "Error: Tool list_organizations is already registered",
                "count()": 2,
                "last_seen()": "2025-04-07T12:23:39+00:00"
            }],
            "meta": {"fields": {"issue": "string", "count()": "integer"}, "units": {}}
        });
        let response: SearchResponse<ErrorSearchRow> = validate(&value).unwrap();
        assert_eq!(response.data[0].issue, "CLOUDFLARE-MCP-41");
        assert_eq!(response.data[0].count, 2);
        assert_eq!(response.meta.fields["count()"], "integer");
    }

    fn step(kind: &str, status: &str) -> Value {
        json!({
            "type": kind,
            "key": format!("{}_step", kind),
            "index": 0,
            "status": status,
            "title": "Analyzing the Issue",
            "output_stream": null,
            "progress": [{
                "data": null,
                "message": "Figuring out the root cause...",
                "timestamp": "2025-04-09T22:35:41.558180",
                "type": "INFO"
            }]
        })
    }

    #[test]
    fn test_parse_autofix_state_steps() {
        let mut root_cause = step("root_cause_analysis", "COMPLETED");
        root_cause["causes"] = json!([{
            "description": "The tool is registered twice",
            "id": 0,
            "root_cause_reproduction": [{
                "code_snippet_and_analysis": "server.tool(...) is called twice",
                "is_most_important_event": true,
                "relevant_code_file": null,
                "timeline_item_type": "internal_code",
                "title": "Duplicate registration"
            }]
        }]);
        let mut default = step("default", "COMPLETED");
        default["insights"] = json!(null);
        let value = json!({
            "autofix": {
                "run_id": 21831,
                "request": {"project_id": 4505138086019073_i64},
                "updated_at": "2025-04-09T22:39:50.778146",
                "status": "PROCESSING",
                "steps": [default, root_cause, step("coding", "IN_PROGRESS")]
            }
        });

        let state: AutofixRunState = validate(&value).unwrap();
        let autofix = state.autofix.unwrap();
        assert_eq!(autofix.status, AutofixStatus::Processing);
        assert!(!autofix.status.is_terminal());
        assert!(matches!(autofix.steps[0], AutofixStep::Default(_)));
        assert_eq!(autofix.steps[1].kind(), "root_cause_analysis");
        assert_eq!(autofix.steps[2].fields().title, "Analyzing the Issue");
        match &autofix.steps[1] {
            AutofixStep::RootCauseAnalysis(s) => {
                assert_eq!(s.causes[0].root_cause_reproduction[0].title, "Duplicate registration")
            }
            other => panic!("Expected root cause step, got {:?}", other),
        }
        match &autofix.steps[2] {
            AutofixStep::Other(step) => {
                assert_eq!(step.kind, "coding");
                assert_eq!(step.fields.status, AutofixStatus::InProgress);
            }
            other => panic!("Expected fallback step, got {:?}", other),
        }
    }

    #[test]
    fn test_autofix_state_without_run() {
        let state: AutofixRunState = validate(&json!({"autofix": null})).unwrap();
        assert!(state.autofix.is_none());
    }

    #[test]
    fn test_autofix_unknown_status_fails() {
        let value = json!({
            "autofix": {
                "run_id": 1,
                "updated_at": "2025-04-09T22:39:50",
                "status": "SOMETHING_ELSE",
                "steps": []
            }
        });
        assert!(validate::<AutofixRunState>(&value).is_err());
    }

    #[test]
    fn test_autofix_run_keeps_extra_fields() {
        let run: AutofixRun = validate(&json!({"run_id": 123, "queued": true})).unwrap();
        assert_eq!(run.run_id.to_string(), "123");
        assert_eq!(run.extra["queued"], json!(true));
    }

    #[test]
    fn test_create_project_request_omits_absent_platform() {
        let body = serde_json::to_value(CreateProjectRequest {
            name: "web",
            platform: None,
        })
        .unwrap();
        assert_eq!(body, json!({"name": "web"}));
    }

    #[test]
    fn test_status_display_matches_wire_format() {
        assert_eq!(
            AutofixStatus::WaitingForUserResponse.to_string(),
            "WAITING_FOR_USER_RESPONSE"
        );
        let parsed: AutofixStatus = serde_json::from_value(json!("NEED_MORE_INFORMATION")).unwrap();
        assert_eq!(parsed, AutofixStatus::NeedMoreInformation);
    }
}
