//! GitHub API error types.
//!
//! Errors are categorized as transient or permanent. The detector never retries;
//! the category is carried upward so the caller can decide whether a later
//! attempt is worthwhile:
//!
//! - **Transient** errors are worth retrying (5xx, rate limits, network failures)
//! - **Permanent** errors need a human (bad credentials, unknown repository, most 4xx)

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Transient error - a later attempt may succeed.
    ///
    /// Examples:
    /// - HTTP 5xx (server errors)
    /// - HTTP 429 (rate limited)
    /// - HTTP 403 with rate limit message
    /// - Network timeouts
    Transient,

    /// Permanent error - requires human intervention.
    ///
    /// Examples:
    /// - HTTP 401 (bad credentials)
    /// - HTTP 404 (repository not found or not visible to the token)
    /// - Malformed responses
    Permanent,
}

impl GitHubErrorKind {
    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }

    /// True when the service reports the repository has no commits at all.
    ///
    /// GitHub answers the commit listing of an empty repository with HTTP 409
    /// "Git Repository is empty." rather than an empty page.
    pub fn is_empty_repository(&self) -> bool {
        self.status_code == Some(409)
            && self.message.to_lowercase().contains("repository is empty")
    }

    /// Categorizes an octocrab error.
    ///
    /// Responses GitHub answered carry their HTTP status and message in
    /// `Error::GitHub`; those are used directly. Transport-level variants only
    /// expose text, so their whole source chain is scanned instead.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        if let octocrab::Error::GitHub { source, .. } = &err {
            let status_code = source.status_code.as_u16();
            let message = source.message.clone();
            return Self {
                kind: kind_for(Some(status_code), &message),
                status_code: Some(status_code),
                message,
                source: Some(err),
            };
        }

        let message = error_chain_message(&err);
        Self::categorize(message, Some(err))
    }

    fn categorize(message: String, source: Option<octocrab::Error>) -> Self {
        let status_code = extract_status_code(&message);
        Self {
            kind: kind_for(status_code, &message),
            status_code,
            message,
            source,
        }
    }
}

fn kind_for(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    match status_code {
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None => {
            if is_rate_limit_error(message) || is_network_error(message) {
                GitHubErrorKind::Transient
            } else {
                GitHubErrorKind::Permanent
            }
        }
    }
}

/// `err: cause: cause...`, since octocrab's own display is often just the variant name.
fn error_chain_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        current = cause.source();
    }
    message
}

/// Extracts the HTTP status code from an error message, if present.
///
/// Only used for errors that never reached GitHub's API layer. Returning
/// `None` only makes categorization more conservative.
fn extract_status_code(message: &str) -> Option<u16> {
    if let Some(idx) = message.find("status: ") {
        let rest = &message[idx + 8..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if let Ok(code) = rest[..end].parse() {
            return Some(code);
        }
    }

    let lower = message.to_lowercase();
    if lower.contains("repository is empty") {
        return Some(409);
    }
    if lower.contains("bad credentials") {
        return Some(401);
    }
    if message.contains("404") && lower.contains("not found") {
        return Some(404);
    }

    [401, 403, 409, 422, 429, 500, 502, 503, 504]
        .into_iter()
        .find(|code| message.contains(&code.to_string()))
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detection() {
        assert!(is_rate_limit_error("API rate limit exceeded"));
        assert!(is_rate_limit_error("secondary rate limit"));
        assert!(is_rate_limit_error("abuse detection mechanism"));
        assert!(!is_rate_limit_error("Permission denied"));
    }

    #[test]
    fn network_error_detection() {
        assert!(is_network_error("connection timeout"));
        assert!(is_network_error("DNS resolution failed"));
        assert!(is_network_error("request timed out"));
        assert!(!is_network_error("Not found"));
    }

    #[test]
    fn status_code_extraction() {
        assert_eq!(extract_status_code("status: 502 Bad Gateway"), Some(502));
        assert_eq!(extract_status_code("Bad credentials"), Some(401));
        assert_eq!(extract_status_code("Git Repository is empty."), Some(409));
        assert_eq!(extract_status_code("HTTP 404 Not Found"), Some(404));
        assert_eq!(extract_status_code("something odd"), None);
    }

    #[test]
    fn categorization() {
        let e = GitHubApiError::categorize("status: 503".to_string(), None);
        assert_eq!(e.kind, GitHubErrorKind::Transient);

        let e = GitHubApiError::categorize("403 API rate limit exceeded".to_string(), None);
        assert_eq!(e.kind, GitHubErrorKind::Transient);

        let e = GitHubApiError::categorize("Bad credentials".to_string(), None);
        assert_eq!(e.kind, GitHubErrorKind::Permanent);
        assert_eq!(e.status_code, Some(401));

        let e = GitHubApiError::categorize("connection refused".to_string(), None);
        assert_eq!(e.kind, GitHubErrorKind::Transient);
    }

    #[test]
    fn empty_repository_is_recognized() {
        let e = GitHubApiError::categorize("GitHub: Git Repository is empty.".to_string(), None);
        assert!(e.is_empty_repository());
        assert!(!e.is_retriable());
    }

    #[test]
    fn empty_repository_needs_conflict_status() {
        let mut e = GitHubApiError::permanent_without_source("Git Repository is empty.");
        assert!(!e.is_empty_repository());
        e.status_code = Some(409);
        assert!(e.is_empty_repository());
    }

    #[test]
    fn transport_errors_are_categorized_by_their_causes() {
        #[derive(Debug, Error)]
        #[error("Hyper")]
        struct Wrapper(#[source] std::io::Error);

        let wrapped = Wrapper(std::io::Error::other("Connection refused (os error 111)"));
        let message = error_chain_message(&wrapped);
        assert_eq!(message, "Hyper: Connection refused (os error 111)");
        assert_eq!(kind_for(None, &message), GitHubErrorKind::Transient);
        assert_eq!(kind_for(None, "Hyper"), GitHubErrorKind::Permanent);
    }

    #[test]
    fn api_status_decides_kind() {
        assert_eq!(kind_for(Some(503), "Service Unavailable"), GitHubErrorKind::Transient);
        assert_eq!(kind_for(Some(429), "slow down"), GitHubErrorKind::Transient);
        assert_eq!(
            kind_for(Some(403), "API rate limit exceeded for user"),
            GitHubErrorKind::Transient
        );
        assert_eq!(kind_for(Some(403), "Resource not accessible"), GitHubErrorKind::Permanent);
        assert_eq!(kind_for(Some(401), "Bad credentials"), GitHubErrorKind::Permanent);
        assert_eq!(kind_for(Some(409), "connection reset"), GitHubErrorKind::Permanent);
    }

    #[test]
    fn display_includes_status() {
        let e = GitHubApiError::categorize("status: 500".to_string(), None);
        assert_eq!(e.to_string(), "GitHub API error (HTTP 500): status: 500");
        let e = GitHubApiError::permanent_without_source("boom");
        assert_eq!(e.to_string(), "GitHub API error: boom");
    }
}
