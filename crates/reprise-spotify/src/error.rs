// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Spotify rejected the access token: {0}")]
    Unauthorized(String),

    #[error("Invalid result limit {0}: expected -1 or a non-negative number")]
    InvalidLimit(i64),

    #[error("Invalid response from Spotify API: {0}")]
    InvalidResponse(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SpotifyError {
    /// Connection and timeout failures are worth a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed(e) if e.is_connect() || e.is_timeout())
    }
}
