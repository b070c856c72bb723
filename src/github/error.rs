// src/github/error.rs
// =============================================================================
// Errors that can come out of a GitHub API call.
//
// The app never retries. Every failure ends up as a one-line banner, so the
// interesting part here is the Display text and the `banner()` helper.
// =============================================================================

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Could not reach GitHub at all (DNS, TLS, timeout...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 404 for the given path or resource
    #[error("not found: {0}")]
    NotFound(String),

    /// The file changed upstream since its content hash was fetched
    #[error("{path} changed on GitHub since it was loaded ({message}); refresh before saving")]
    Conflict { path: String, message: String },

    /// 401 / 403, bad or missing token (or rate limited)
    #[error("access denied: {0}")]
    Unauthorized(String),

    /// Any other non-success status
    #[error("GitHub returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response did not look like what the API documents
    #[error("could not decode response for {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("{0} is not a file")]
    NotAFile(String),

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    // Maps a failed HTTP status (plus GitHub's `message` field) to an error
    //
    // 409 is the documented answer to a stale `sha`. 422 shows up when the
    // file exists but no `sha` was sent, which is the same situation from
    // the user's point of view.
    pub fn from_status(status: StatusCode, path: &str, message: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
            StatusCode::CONFLICT => ApiError::Conflict {
                path: path.to_string(),
                message,
            },
            StatusCode::UNPROCESSABLE_ENTITY if message.contains("sha") => ApiError::Conflict {
                path: path.to_string(),
                message,
            },
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    // The text shown in the error banner
    pub fn banner(&self) -> String {
        match self {
            ApiError::Conflict { .. } => format!("⚠️  {}", self),
            ApiError::Unauthorized(_) => {
                format!("🔒 {} (check GITHUB_TOKEN)", self)
            }
            _ => format!("❌ {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_statuses() {
        let err = ApiError::from_status(StatusCode::CONFLICT, "a.txt", "does not match".into());
        assert!(err.is_conflict());

        let err = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            "a.txt",
            "Invalid request.\n\n\"sha\" wasn't supplied.".into(),
        );
        assert!(err.is_conflict());

        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "a.txt", "bad".into());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_not_found_keeps_path() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "docs/x.md", "Not Found".into());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: docs/x.md");
    }

    #[test]
    fn test_banner_text() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "", "Bad credentials".into());
        assert_eq!(err.banner(), "🔒 access denied: Bad credentials (check GITHUB_TOKEN)");

        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "", "upstream".into());
        assert_eq!(err.banner(), "❌ GitHub returned HTTP 502: upstream");
    }
}
