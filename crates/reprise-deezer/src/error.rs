// SPDX-License-Identifier: GPL-3.0-or-later

use crate::models::{PERMISSION_ERROR_CODE, TOKEN_INVALID_ERROR_CODE};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeezerError>;

#[derive(Debug, Error)]
pub enum DeezerError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Deezer API quota exceeded")]
    QuotaExceeded,

    #[error("Deezer API quota still exceeded after {attempts} attempts for query '{query}'")]
    QuotaRetriesExhausted { query: String, attempts: u32 },

    #[error("API error {code}: {message}")]
    ApiError { code: u32, message: String },

    #[error("Invalid response from Deezer API: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DeezerError {
    /// Deezer refused the access token itself rather than the request.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::ApiError {
                code: PERMISSION_ERROR_CODE | TOKEN_INVALID_ERROR_CODE,
                ..
            }
        )
    }
}
