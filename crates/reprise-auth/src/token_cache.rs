// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Tokens this close to their expiry are not worth sending.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An access token plus what is needed to keep it usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` for tokens that do not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// A lifetime of zero or less means the token never expires.
    pub fn expiring_in(mut self, seconds: i64, now: DateTime<Utc>) -> Self {
        self.expires_at = if seconds > 0 {
            TimeDelta::try_seconds(seconds).and_then(|lifetime| now.checked_add_signed(lifetime))
        } else {
            None
        };
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.expires_at, TimeDelta::try_seconds(EXPIRY_MARGIN_SECS)) {
            (Some(expires_at), Some(margin)) => now + margin >= expires_at,
            _ => false,
        }
    }
}

/// Access token persisted in a single local file.
///
/// The file holds a JSON [`CachedToken`]. A file containing a bare token, as
/// written by earlier versions, is read as a token without expiry.
#[derive(Debug, Clone)]
pub struct TokenCache {
    service: &'static str,
    path: PathBuf,
}

impl TokenCache {
    pub fn new(service: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            service,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing, unreadable, malformed or empty file all mean "no cached token".
    pub fn load(&self) -> Option<CachedToken> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "auth", service = self.service, "no token saved");
                return None;
            }
            Err(e) => {
                warn!(
                    target: "auth",
                    service = self.service,
                    path = %self.path.display(),
                    error = %e,
                    "failed to read token cache"
                );
                return None;
            }
        };

        let contents = contents.trim();
        if contents.is_empty() {
            info!(target: "auth", service = self.service, "token cache file is empty");
            return None;
        }

        if !contents.starts_with('{') {
            info!(target: "auth", service = self.service, "token retrieved from cache");
            return Some(CachedToken::new(contents));
        }

        match serde_json::from_str(contents) {
            Ok(token) => {
                info!(target: "auth", service = self.service, "token retrieved from cache");
                Some(token)
            }
            Err(e) => {
                warn!(
                    target: "auth",
                    service = self.service,
                    path = %self.path.display(),
                    error = %e,
                    "ignoring malformed token cache"
                );
                None
            }
        }
    }

    /// Replace the cached token.
    pub fn store(&self, token: &CachedToken) -> Result<()> {
        let contents = serde_json::to_string(token)?;
        std::fs::write(&self.path, contents)?;
        info!(target: "auth", service = self.service, "token successfully saved");
        Ok(())
    }

    /// Forget the cached token so the next run authorizes from scratch.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(
                    target: "auth",
                    service = self.service,
                    path = %self.path.display(),
                    "token cache removed"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
