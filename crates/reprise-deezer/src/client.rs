// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{DeezerError, Result};
use crate::models::{DeezerTrack, DeezerUser, ErrorEnvelope, SearchResponse, QUOTA_ERROR_CODE};
use crate::rate_limiter::RateLimiter;
use reprise_domain::SearchCandidate;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

const DEEZER_API_BASE: &str = "https://api.deezer.com";
const USER_AGENT: &str = concat!("Reprise/", env!("CARGO_PKG_VERSION"));

/// How the client reacts to "quota exceeded" answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRetryPolicy {
    /// Fixed wait before retrying the same query.
    pub backoff: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
}

impl Default for QuotaRetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(3),
            max_retries: 20,
        }
    }
}

/// Free-text query made of the title followed by every artist name.
pub fn build_query(title: &str, artists: &[String]) -> String {
    std::iter::once(title)
        .chain(artists.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deezer API client for track search.
#[derive(Debug, Clone)]
pub struct DeezerClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    rate_limiter: RateLimiter,
    retry_policy: QuotaRetryPolicy,
}

impl DeezerClient {
    /// Create a new Deezer client with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder() -> DeezerClientBuilder {
        DeezerClientBuilder::default()
    }

    /// Search for a track and return only the highest-ranked hit.
    ///
    /// Quota errors are retried after the policy's fixed backoff until the
    /// retry budget runs out. An empty result list is `Ok(None)`.
    ///
    /// # Example
    /// ```no_run
    /// # use reprise_deezer::DeezerClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = DeezerClient::new()?;
    /// let artists = vec!["Radiohead".to_string()];
    /// let top = client.search_top_match("Paranoid Android", &artists).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, query_artists))]
    pub async fn search_top_match(
        &self,
        query_title: &str,
        query_artists: &[String],
    ) -> Result<Option<SearchCandidate>> {
        let query = build_query(query_title, query_artists);
        let mut retries = 0;

        loop {
            match self.search(&query).await {
                Err(DeezerError::QuotaExceeded) if retries < self.retry_policy.max_retries => {
                    retries += 1;
                    warn!(
                        target: "deezer",
                        retry = retries,
                        "Deezer API quota limit attained. Waiting {:?}",
                        self.retry_policy.backoff
                    );
                    sleep(self.retry_policy.backoff).await;
                }
                Err(DeezerError::QuotaExceeded) => {
                    return Err(DeezerError::QuotaRetriesExhausted {
                        query,
                        attempts: retries + 1,
                    });
                }
                Err(e) => return Err(e),
                Ok(tracks) => {
                    let top = tracks.into_iter().next().map(SearchCandidate::from);
                    match &top {
                        Some(candidate) => debug!(
                            target: "deezer",
                            found = %candidate.title,
                            artist = %candidate.primary_artist_name,
                            "top search result"
                        ),
                        None => info!(target: "deezer", query = %query, "no search result"),
                    }
                    return Ok(top);
                }
            }
        }
    }

    /// Run one search request and return the ranked tracks.
    pub async fn search(&self, query: &str) -> Result<Vec<DeezerTrack>> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut().append_pair("q", query);

        let response: SearchResponse = self.get(url.as_str()).await?;
        Ok(response.data)
    }

    /// The account the access token belongs to.
    ///
    /// A rejected token surfaces as an error for which
    /// [`DeezerError::is_auth_error`] holds.
    pub async fn current_user(&self) -> Result<DeezerUser> {
        let url = self.endpoint("user/me")?;
        self.get(url.as_str()).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| DeezerError::InvalidResponse(e.to_string()))?;
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        Ok(url)
    }

    /// Internal method to perform rate-limited GET requests.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let _permit = self.rate_limiter.acquire().await;

        trace!(target: "deezer", "GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        debug!(target: "deezer", "response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DeezerError::QuotaExceeded);
        }

        let body = response.text().await?;
        trace!(target: "deezer", "response body: {}", body);

        parse_deezer_body(status, &body)
    }
}

/// Map a Deezer response to either its payload or the error it carries.
fn parse_deezer_body<T: serde::de::DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        if status.is_success() {
            DeezerError::InvalidResponse(format!("Failed to parse response: {}", e))
        } else {
            DeezerError::ApiError {
                code: u32::from(status.as_u16()),
                message: body.to_string(),
            }
        }
    })?;

    if value.get("error").is_some() {
        let envelope: ErrorEnvelope = serde_json::from_value(value)?;
        let code = envelope.error.code.unwrap_or_default();
        if code == QUOTA_ERROR_CODE {
            return Err(DeezerError::QuotaExceeded);
        }
        return Err(DeezerError::ApiError {
            code,
            message: envelope
                .error
                .message
                .or(envelope.error.kind)
                .unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    if !status.is_success() {
        return Err(DeezerError::ApiError {
            code: u32::from(status.as_u16()),
            message: body.to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}

/// Builder for configuring a Deezer client.
#[derive(Debug)]
pub struct DeezerClientBuilder {
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
    min_request_interval: Duration,
    retry_policy: QuotaRetryPolicy,
    rate_limiter: Option<RateLimiter>,
}

impl Default for DeezerClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEEZER_API_BASE.to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
            min_request_interval: Duration::from_millis(100),
            retry_policy: QuotaRetryPolicy::default(),
            rate_limiter: None,
        }
    }
}

impl DeezerClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Attach a user access token to every request.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the minimum interval between two requests.
    pub fn min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Share an existing limiter instead of creating a new one.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn quota_retry_policy(mut self, policy: QuotaRetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Build the Deezer client.
    pub fn build(self) -> Result<DeezerClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| RateLimiter::new(self.min_request_interval));

        Ok(DeezerClient {
            client,
            base_url: self.base_url,
            access_token: self.access_token,
            rate_limiter,
            retry_policy: self.retry_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_joins_title_and_all_artists() {
        let artists = vec!["Artist X".to_string(), "Guest".to_string()];
        assert_eq!(build_query("Song A", &artists), "Song A Artist X Guest");
        assert_eq!(build_query("Solo", &[]), "Solo");
    }

    #[test]
    fn body_error_with_quota_code_is_quota_exceeded() {
        let body = r#"{"error":{"type":"Exception","message":"Quota limit exceeded","code":4}}"#;
        let result: Result<SearchResponse> = parse_deezer_body(StatusCode::OK, body);
        assert!(matches!(result, Err(DeezerError::QuotaExceeded)));
    }

    #[test]
    fn body_error_with_other_code_is_api_error() {
        let body = r#"{"error":{"type":"DataException","message":"no data","code":800}}"#;
        let result: Result<SearchResponse> = parse_deezer_body(StatusCode::OK, body);
        match result {
            Err(DeezerError::ApiError { code, message }) => {
                assert_eq!(code, 800);
                assert_eq!(message, "no data");
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn token_errors_are_auth_errors() {
        let body = r#"{"error":{"type":"OAuthException",
            "message":"Invalid OAuth access token.","code":300}}"#;
        let result: Result<DeezerUser> = parse_deezer_body(StatusCode::OK, body);
        let err = result.unwrap_err();
        assert!(err.is_auth_error());
        assert!(!DeezerError::QuotaExceeded.is_auth_error());
    }

    #[test]
    fn non_json_server_error_keeps_status() {
        let result: Result<SearchResponse> =
            parse_deezer_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(result, Err(DeezerError::ApiError { code: 502, .. })));
    }
}
