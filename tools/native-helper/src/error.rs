//! Request errors and their HTTP mapping.

use warp::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid or missing video ID")]
    InvalidVideoId,

    #[error("Missing ?v= video ID")]
    MissingVideoId,

    #[error("yt-dlp not found. Install with: pip install yt-dlp")]
    YtDlpNotFound,

    /// yt-dlp ran but produced nothing usable; carries the tail of stderr.
    #[error("yt-dlp failed (code {code}): {stderr_tail}")]
    YtDlpFailed { code: String, stderr_tail: String },

    #[error("failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidVideoId | Self::MissingVideoId => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
