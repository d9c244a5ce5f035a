// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing {service} credential: {field}")]
    MissingCredentials {
        service: &'static str,
        field: &'static str,
    },

    #[error("Failed to bind OAuth callback listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No OAuth callback received within {0:?}")]
    CallbackTimeout(Duration),

    #[error("Received error from auth server: {0}")]
    Denied(String),

    #[error("OAuth callback carried neither a code nor an error")]
    InvalidCallback,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid authorization URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("{0} does not support refreshing access tokens")]
    RefreshUnsupported(&'static str),

    #[error("Token cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
