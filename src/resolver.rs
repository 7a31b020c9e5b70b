//! Issue identifier resolution.
//!
//! Turns loosely specified issue references (a web URL, a short ID with
//! stray punctuation, an organization slug) into the exact
//! `(organization, issue)` pair the API needs.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use thiserror::Error;

/// Characters kept by [`sanitize_id`].
static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_-]").unwrap_or_else(|e| panic!("invalid strip pattern: {e}"))
});

/// A numeric ID, or a project code followed by a dash and an alphanumeric
/// suffix (`PROJECT-ABC123`).
static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+|[A-Za-z][A-Za-z0-9_-]*-[A-Za-z0-9]+)$")
        .unwrap_or_else(|e| panic!("invalid issue id pattern: {e}"))
});

/// Errors from resolving an issue reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The URL is not a usable issue URL.
    #[error("Invalid Sentry issue URL. {0}")]
    InvalidReference(String),

    /// The issue ID does not look like a numeric or short ID.
    #[error("Invalid issue ID format: \"{0}\". Expected either a numeric ID or a project code followed by an alphanumeric identifier (e.g., \"PROJECT-ABC123\").")]
    InvalidIdentifierFormat(String),

    /// Neither a URL nor an organization slug was given.
    #[error("Organization slug is required")]
    MissingOrganization,

    /// Neither a URL nor an issue ID was given.
    #[error("Either issueId or issueUrl must be provided")]
    MissingIdentifier,
}

/// An exact issue reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub organization_slug: String,
    pub issue_id: String,
}

/// Caller-supplied issue reference, any part of which may be missing.
#[derive(Debug, Clone, Default)]
pub struct IssueParams {
    pub issue_url: Option<String>,
    pub issue_id: Option<String>,
    pub organization_slug: Option<String>,
}

/// Extract the organization slug and raw issue ID from an issue URL.
///
/// Accepts the hosted forms (`https://{org}.sentry.io/issues/{id}`,
/// `https://sentry.io/organizations/{org}/issues/{id}`) and self-hosted
/// ones (`https://host/{org}/issues/{id}`). The ID is returned as found.
pub fn extract_from_url(url: &str) -> Result<IssueRef, ResolveError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ResolveError::InvalidReference(
            "Must start with http:// or https://".to_string(),
        ));
    }

    let parsed = Url::parse(url).map_err(|e| ResolveError::InvalidReference(e.to_string()))?;
    let parts: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let issues_at = parts.iter().position(|p| *p == "issues");
    let issues_at = match issues_at {
        Some(i) if parts.len() >= 2 => i,
        _ => {
            return Err(ResolveError::InvalidReference(
                "Path must contain '/issues/{issue_id}'".to_string(),
            ))
        }
    };

    let issue_id = parts.get(issues_at + 1).ok_or_else(|| {
        ResolveError::InvalidReference("Unable to determine issue ID from URL.".to_string())
    })?;

    let organization_slug = organization_from(&parts, parsed.host_str().unwrap_or_default())
        .ok_or_else(|| {
            ResolveError::InvalidReference("Could not determine organization.".to_string())
        })?;

    Ok(IssueRef {
        organization_slug: organization_slug.to_string(),
        issue_id: issue_id.to_string(),
    })
}

/// Organization from the path (`/organizations/{org}/` or a leading
/// `/{org}/`), else from the first label of a subdomain host.
fn organization_from<'a>(parts: &[&'a str], host: &'a str) -> Option<&'a str> {
    if let Some(i) = parts.iter().position(|p| *p == "organizations") {
        return parts.get(i + 1).copied();
    }
    if parts.len() > 1 && parts[0] != "issues" {
        return Some(parts[0]);
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 && labels[0] != "www" {
        return Some(labels[0]);
    }
    None
}

/// Strip stray punctuation from an issue ID and check its shape.
///
/// `"CLOUDFLARE-MCP-41.!"` becomes `"CLOUDFLARE-MCP-41"`.
pub fn sanitize_id(raw: &str) -> Result<String, ResolveError> {
    let cleaned = STRIP_RE.replace_all(raw, "");
    if !ID_RE.is_match(&cleaned) {
        return Err(ResolveError::InvalidIdentifierFormat(cleaned.into_owned()));
    }
    Ok(cleaned.into_owned())
}

/// Resolve caller input to an exact issue reference.
///
/// A URL wins over everything else, including a separately supplied
/// organization slug. Without a URL both an organization and an ID are
/// needed.
pub fn resolve(params: &IssueParams) -> Result<IssueRef, ResolveError> {
    if let Some(ref url) = params.issue_url {
        let found = extract_from_url(url)?;
        return Ok(IssueRef {
            issue_id: sanitize_id(&found.issue_id)?,
            organization_slug: found.organization_slug,
        });
    }

    let organization_slug = params
        .organization_slug
        .as_ref()
        .ok_or(ResolveError::MissingOrganization)?;

    match params.issue_id {
        Some(ref issue_id) => Ok(IssueRef {
            organization_slug: organization_slug.clone(),
            issue_id: sanitize_id(issue_id)?,
        }),
        None => Err(ResolveError::MissingIdentifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_ref(org: &str, id: &str) -> IssueRef {
        IssueRef {
            organization_slug: org.to_string(),
            issue_id: id.to_string(),
        }
    }

    #[test]
    fn test_extract_subdomain_url() {
        assert_eq!(
            extract_from_url("https://sentry.sentry.io/issues/1234").unwrap(),
            issue_ref("sentry", "1234")
        );
        assert_eq!(
            extract_from_url("https://my-team.sentry.io/issues/123").unwrap(),
            issue_ref("my-team", "123")
        );
    }

    #[test]
    fn test_extract_organizations_path() {
        assert_eq!(
            extract_from_url("https://sentry.io/organizations/my-org/issues/123").unwrap(),
            issue_ref("my-org", "123")
        );
    }

    #[test]
    fn test_extract_leading_org_segment() {
        assert_eq!(
            extract_from_url("https://sentry.io/sentry/issues/123").unwrap(),
            issue_ref("sentry", "123")
        );
        assert_eq!(
            extract_from_url("https://mycompany.com/my-team/issues/123").unwrap(),
            issue_ref("my-team", "123")
        );
    }

    #[test]
    fn test_extract_self_hosted_subdomain() {
        assert_eq!(
            extract_from_url("https://sentry.mycompany.com/issues/123").unwrap(),
            issue_ref("sentry", "123")
        );
    }

    #[test]
    fn test_extract_keeps_raw_id() {
        assert_eq!(
            extract_from_url("https://sentry.sentry.io/issues/abc").unwrap(),
            issue_ref("sentry", "abc")
        );
    }

    #[test]
    fn test_extract_requires_scheme() {
        for input in ["", "abc", "sentry.io/issues/1"] {
            assert_eq!(
                extract_from_url(input).unwrap_err(),
                ResolveError::InvalidReference("Must start with http:// or https://".to_string())
            );
        }
    }

    #[test]
    fn test_extract_requires_issues_segment() {
        let err = extract_from_url("https://sentry.sentry.io/projects/123").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Sentry issue URL. Path must contain '/issues/{issue_id}'"
        );
    }

    #[test]
    fn test_extract_missing_id_after_issues() {
        let err = extract_from_url("https://sentry.io/acme/issues/").unwrap_err();
        assert!(err.to_string().contains("Unable to determine issue ID"));
    }

    #[test]
    fn test_extract_without_organization() {
        let err = extract_from_url("https://sentry.io/issues/123").unwrap_err();
        assert!(err.to_string().contains("Could not determine organization"));

        let err = extract_from_url("https://www.example.com/issues/123").unwrap_err();
        assert!(err.to_string().contains("Could not determine organization"));
    }

    #[test]
    fn test_sanitize_strips_punctuation() {
        assert_eq!(sanitize_id("CLOUDFLARE-MCP-41.!").unwrap(), "CLOUDFLARE-MCP-41");
        assert_eq!(sanitize_id("ID_123-456!@#").unwrap(), "ID_123-456");
        assert_eq!(sanitize_id("CLOUDFLARE-MCP-41").unwrap(), "CLOUDFLARE-MCP-41");
        assert_eq!(sanitize_id(" 6507376925\n").unwrap(), "6507376925");
    }

    #[test]
    fn test_sanitize_rejects_bad_shapes() {
        assert_eq!(
            sanitize_id("abc").unwrap_err(),
            ResolveError::InvalidIdentifierFormat("abc".to_string())
        );
        assert!(sanitize_id("1-ABC").is_err());
        assert!(sanitize_id("PROJECT-").is_err());
        assert!(sanitize_id("!!!").is_err());
    }

    #[test]
    fn test_invalid_format_message_names_value() {
        let err = sanitize_id("nope!").unwrap_err();
        assert!(err.to_string().starts_with("Invalid issue ID format: \"nope\"."));
    }

    #[test]
    fn test_resolve_from_url_wins() {
        let params = IssueParams {
            issue_url: Some("https://sentry.io/organizations/my-org/issues/PROJ-9.".to_string()),
            issue_id: Some("123".to_string()),
            organization_slug: Some("other".to_string()),
        };
        assert_eq!(resolve(&params).unwrap(), issue_ref("my-org", "PROJ-9"));
    }

    #[test]
    fn test_resolve_from_id_and_org() {
        let params = IssueParams {
            issue_id: Some("CLOUDFLARE-MCP-41.!".to_string()),
            organization_slug: Some("sentry-mcp-evals".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve(&params).unwrap(),
            issue_ref("sentry-mcp-evals", "CLOUDFLARE-MCP-41")
        );
    }

    #[test]
    fn test_resolve_missing_organization() {
        let params = IssueParams {
            issue_id: Some("123".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve(&params).unwrap_err(), ResolveError::MissingOrganization);
    }

    #[test]
    fn test_resolve_empty_params_reports_organization_first() {
        assert_eq!(
            resolve(&IssueParams::default()).unwrap_err(),
            ResolveError::MissingOrganization
        );
    }

    #[test]
    fn test_resolve_missing_identifier() {
        let params = IssueParams {
            organization_slug: Some("foo".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve(&params).unwrap_err(), ResolveError::MissingIdentifier);
    }

    #[test]
    fn test_resolve_invalid_url() {
        let params = IssueParams {
            issue_url: Some("not-a-url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve(&params).unwrap_err(),
            ResolveError::InvalidReference(_)
        ));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        for url in [
            "https://sentry.sentry.io/issues/1234",
            "https://sentry.io/organizations/my-org/issues/PROJ-1!",
            "https://mycompany.com/my-team/issues/123/events/abc/",
            "https://acme.sentry.io/issues/WEB-3A?project=1",
        ] {
            let first = resolve(&IssueParams {
                issue_url: Some(url.to_string()),
                ..Default::default()
            })
            .unwrap();
            let second = resolve(&IssueParams {
                issue_id: Some(first.issue_id.clone()),
                organization_slug: Some(first.organization_slug.clone()),
                ..Default::default()
            })
            .unwrap();
            assert_eq!(first, second, "not idempotent for {}", url);
        }
    }
}
