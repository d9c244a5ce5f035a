// SPDX-License-Identifier: GPL-3.0-or-later

use crate::callback::CallbackListener;
use crate::error::{AuthError, Result};
use crate::token_cache::{CachedToken, TokenCache};
use async_trait::async_trait;
use chrono::Utc;
use reprise_config::{DeezerConfig, OAuthCallbackConfig, SpotifyConfig};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Deezer permissions needed to read the user's library.
const DEEZER_PERMS: &str = "basic_access,offline_access";
const SPOTIFY_SCOPES: &str = "user-library-read";

/// One service's authorization-code grant.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    fn service(&self) -> &'static str;

    /// Page the user must visit to grant access.
    fn authorize_url(&self) -> Result<String>;

    /// Trade an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<CachedToken>;

    /// Trade a refresh token for a new access token.
    async fn refresh(&self, _refresh_token: &str) -> Result<CachedToken> {
        Err(AuthError::RefreshUnsupported(self.service()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Spotify sends `expires_in`, Deezer sends `expires`, sometimes as a string.
    #[serde(default, alias = "expires")]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn lifetime_secs(&self) -> i64 {
        self.expires_in
            .as_ref()
            .and_then(|value| {
                value
                    .as_i64()
                    .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            })
            .unwrap_or_default()
    }
}

fn parse_token_response(
    service: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> Result<CachedToken> {
    if !status.is_success() {
        return Err(AuthError::TokenExchange(format!(
            "{service} answered {status}: {body}"
        )));
    }

    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|_| AuthError::TokenExchange(format!("{service} answered: {body}")))?;

    let lifetime = response.lifetime_secs();
    let mut token = CachedToken::new(response.access_token).expiring_in(lifetime, Utc::now());
    token.refresh_token = response.refresh_token;
    Ok(token)
}

fn required(value: &Option<String>, service: &'static str, field: &'static str) -> Result<String> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingCredentials { service, field })
}

/// Deezer's `connect.deezer.com` authorization-code flow.
#[derive(Debug, Clone)]
pub struct DeezerAuth {
    client: Client,
    connect_base_url: String,
    app_id: String,
    app_secret: String,
    redirect_uri: String,
}

impl DeezerAuth {
    pub fn from_config(config: &DeezerConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            connect_base_url: config.connect_base_url.trim_end_matches('/').to_string(),
            app_id: required(&config.app_id, "deezer", "app_id")?,
            app_secret: required(&config.app_secret, "deezer", "app_secret")?,
            redirect_uri: config.oauth.redirect_uri(),
        })
    }
}

#[async_trait]
impl AuthorizationFlow for DeezerAuth {
    fn service(&self) -> &'static str {
        "deezer"
    }

    fn authorize_url(&self) -> Result<String> {
        let mut url = Url::parse(&format!("{}/oauth/auth.php", self.connect_base_url))?;
        url.query_pairs_mut()
            .append_pair("app_id", &self.app_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("perms", DEEZER_PERMS);
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<CachedToken> {
        let mut url = Url::parse(&format!("{}/oauth/access_token.php", self.connect_base_url))?;
        url.query_pairs_mut()
            .append_pair("app_id", &self.app_id)
            .append_pair("secret", &self.app_secret)
            .append_pair("code", code)
            .append_pair("output", "json");

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(target: "auth", service = "deezer", %status, "token exchange answered");

        parse_token_response("deezer", status, &body)
    }
}

/// Spotify accounts service authorization-code flow.
#[derive(Debug, Clone)]
pub struct SpotifyAuth {
    client: Client,
    accounts_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyAuth {
    pub fn from_config(config: &SpotifyConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            accounts_base_url: config.accounts_base_url.trim_end_matches('/').to_string(),
            client_id: required(&config.client_id, "spotify", "client_id")?,
            client_secret: required(&config.client_secret, "spotify", "client_secret")?,
            redirect_uri: config.oauth.redirect_uri(),
        })
    }
}

#[async_trait]
impl AuthorizationFlow for SpotifyAuth {
    fn service(&self) -> &'static str {
        "spotify"
    }

    fn authorize_url(&self) -> Result<String> {
        let mut url = Url::parse(&format!("{}/authorize", self.accounts_base_url))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", SPOTIFY_SCOPES);
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<CachedToken> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CachedToken> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

impl SpotifyAuth {
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<CachedToken> {
        let url = format!("{}/api/token", self.accounts_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(target: "auth", service = "spotify", %status, "token endpoint answered");

        parse_token_response("spotify", status, &body)
    }
}

/// Return a usable access token, in order of preference:
/// 1. the cached one while it has not expired
/// 2. a refreshed one when the cache holds a refresh token
/// 3. a new one from the full authorization-code flow
///
/// Whatever is obtained is written back to the cache.
pub async fn authenticate<F: AuthorizationFlow>(
    flow: &F,
    cache: &TokenCache,
    callback: &OAuthCallbackConfig,
    timeout: Duration,
) -> Result<String> {
    if let Some(cached) = cache.load() {
        if !cached.is_expired(Utc::now()) {
            return Ok(cached.access_token);
        }

        info!(target: "auth", service = flow.service(), "cached token has expired");
        if let Some(refresh_token) = cached.refresh_token {
            match flow.refresh(&refresh_token).await {
                Ok(mut token) => {
                    if token.refresh_token.is_none() {
                        token.refresh_token = Some(refresh_token);
                    }
                    cache.store(&token)?;
                    info!(target: "auth", service = flow.service(), "access token refreshed");
                    return Ok(token.access_token);
                }
                Err(e) => warn!(
                    target: "auth",
                    service = flow.service(),
                    error = %e,
                    "token refresh failed, authorizing again"
                ),
            }
        }
    }

    let listener = CallbackListener::bind(&callback.bind_address()).await?;
    let authorize_url = flow.authorize_url()?;
    info!(
        target: "auth",
        service = flow.service(),
        "Please navigate here to authorize access: {}",
        authorize_url
    );

    let code = listener
        .wait_for_code(&callback.callback_path, timeout)
        .await?;
    let token = flow.exchange_code(&code).await?;
    cache.store(&token)?;

    info!(target: "auth", service = flow.service(), "user successfully logged in");
    Ok(token.access_token)
}
