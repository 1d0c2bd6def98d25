use thiserror::Error;

use crate::types::Scrobble;

/// Errors reported by the scrobble client and its collaborators.
#[derive(Debug, Error)]
pub enum ScrobbleError {
    /// The scrobble is missing its artist, its track name or a required timestamp.
    #[error("Invalid scrobble: {0}")]
    InvalidScrobble(String),

    /// The authentication details lack a field the operation needs.
    #[error("Insufficient authentication data: {0}")]
    InsufficientAuthentication(String),

    /// Logging in to Last.fm failed, or no session is available.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Last.fm completed the call but reported that it did not apply it.
    ///
    /// `caused_duplicate` is only set by an update whose new scrobble was
    /// accepted while the outdated one could not be removed.
    #[error("{message}")]
    OperationFailed {
        message: String,
        scrobble: Box<Scrobble>,
        caused_duplicate: bool,
    },

    /// The scrobble was not handed out by this client's scrobble manager.
    #[error("Unmanaged scrobble: {0}")]
    UnmanagedScrobble(String),

    #[error("Last.fm API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrobbleError {
    pub(crate) fn operation_failed(message: String, scrobble: &Scrobble) -> Self {
        ScrobbleError::OperationFailed {
            message,
            scrobble: Box::new(scrobble.clone()),
            caused_duplicate: false,
        }
    }

    pub(crate) fn duplicate_left_behind(message: String, scrobble: &Scrobble) -> Self {
        ScrobbleError::OperationFailed {
            message,
            scrobble: Box::new(scrobble.clone()),
            caused_duplicate: true,
        }
    }

    /// Whether the failed operation left a duplicate scrobble on Last.fm.
    pub fn caused_duplicate(&self) -> bool {
        matches!(
            self,
            ScrobbleError::OperationFailed {
                caused_duplicate: true,
                ..
            }
        )
    }
}

impl From<serde_json::Error> for ScrobbleError {
    fn from(err: serde_json::Error) -> Self {
        ScrobbleError::Parse(err.to_string())
    }
}
