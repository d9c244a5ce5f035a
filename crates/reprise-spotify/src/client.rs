// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{Result, SpotifyError};
use crate::models::{SavedTrackItem, SavedTracksPage};
use reprise_domain::TrackRecord;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use url::Url;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("Reprise/", env!("CARGO_PKG_VERSION"));

/// Spotify caps `limit` on the saved tracks endpoint at 50.
const MAX_PAGE_SIZE: u32 = 50;

/// `result_limit` value meaning "the whole library".
pub const UNBOUNDED: i64 = -1;

/// Spotify Web API client authenticated with a user bearer token.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    /// Create a new Spotify client with default settings.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::builder(access_token).build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder(access_token: impl Into<String>) -> SpotifyClientBuilder {
        SpotifyClientBuilder::new(access_token)
    }

    /// Start paging through the current user's saved tracks.
    ///
    /// No request is made until [`FavoritesPager::next_page`] is awaited.
    ///
    /// # Arguments
    /// * `result_limit` - Maximum number of tracks to yield, or [`UNBOUNDED`].
    /// * `page_size` - Tracks requested per page (clamped to the limit and to 50).
    ///
    /// # Example
    /// ```no_run
    /// # use reprise_spotify::{SpotifyClient, UNBOUNDED};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = SpotifyClient::new("user-access-token")?;
    /// let tracks = client.fetch_favorites(UNBOUNDED, 20)?.collect().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn fetch_favorites(&self, result_limit: i64, page_size: u32) -> Result<FavoritesPager<'_>> {
        let remaining = match result_limit {
            UNBOUNDED => None,
            limit if limit >= 0 => Some(limit as usize),
            limit => return Err(SpotifyError::InvalidLimit(limit)),
        };

        let mut page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        if let Some(limit) = remaining {
            page_size = page_size.min(u32::try_from(limit.max(1)).unwrap_or(MAX_PAGE_SIZE));
        }

        let mut url = Url::parse(&format!("{}/me/tracks", self.base_url))
            .map_err(|e| SpotifyError::InvalidResponse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("limit", &page_size.to_string())
            .append_pair("offset", "0");

        info!(target: "spotify", result_limit, page_size, "fetching saved tracks");

        Ok(FavoritesPager {
            client: self,
            next_url: Some(url.to_string()),
            remaining,
            pages_fetched: 0,
        })
    }

    /// Fetch one page, retrying once on connection or timeout failures.
    async fn get_page(&self, url: &str) -> Result<SavedTracksPage> {
        match self.send_page_request(url).await {
            Err(e) if e.is_transient() => {
                warn!(target: "spotify", error = %e, "transient network error, retrying once");
                self.send_page_request(url).await
            }
            other => other,
        }
    }

    async fn send_page_request(&self, url: &str) -> Result<SavedTracksPage> {
        trace!(target: "spotify", "GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        debug!(target: "spotify", "response status: {}", status);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SpotifyError::Unauthorized(message));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SpotifyError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        trace!(target: "spotify", "response body: {}", body);

        serde_json::from_str(&body).map_err(|e| {
            SpotifyError::InvalidResponse(format!("Failed to parse saved tracks page: {}", e))
        })
    }
}

/// Lazy cursor over the saved tracks of the current user.
#[derive(Debug)]
pub struct FavoritesPager<'a> {
    client: &'a SpotifyClient,
    next_url: Option<String>,
    remaining: Option<usize>,
    pages_fetched: usize,
}

impl FavoritesPager<'_> {
    /// Fetch the next page of tracks, or `None` once the limit or the end of
    /// the library is reached.
    pub async fn next_page(&mut self) -> Result<Option<Vec<TrackRecord>>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };

        let page = self.client.get_page(&url).await?;
        self.pages_fetched += 1;
        self.next_url = page.next;

        let mut records: Vec<TrackRecord> = page
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| to_track_record(item, page.offset + index as u32))
            .collect();

        if let Some(remaining) = self.remaining.as_mut() {
            records.truncate(*remaining);
            *remaining -= records.len();
        }

        debug!(
            target: "spotify",
            page = self.pages_fetched,
            offset = page.offset,
            tracks = records.len(),
            has_next = self.next_url.is_some(),
            "fetched saved tracks page"
        );

        Ok(Some(records))
    }

    /// Drain every remaining page into a single ordered list.
    pub async fn collect(mut self) -> Result<Vec<TrackRecord>> {
        let mut tracks = Vec::new();
        while let Some(page) = self.next_page().await? {
            tracks.extend(page);
        }

        info!(
            target: "spotify",
            tracks = tracks.len(),
            pages = self.pages_fetched,
            "finished fetching saved tracks"
        );
        Ok(tracks)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

fn to_track_record(item: SavedTrackItem, source_offset: u32) -> Option<TrackRecord> {
    let Some(track) = item.track else {
        warn!(target: "spotify", source_offset, "skipping unavailable saved track");
        return None;
    };

    let artists = track.artists.into_iter().map(|artist| artist.name).collect();
    let record = TrackRecord::new(
        track.id.unwrap_or_default(),
        track.name,
        artists,
        source_offset,
    );

    if record.is_none() {
        warn!(target: "spotify", source_offset, "skipping saved track without artists");
    }
    record
}

/// Builder for configuring a Spotify client.
#[derive(Debug)]
pub struct SpotifyClientBuilder {
    access_token: String,
    base_url: String,
    timeout: Duration,
}

impl SpotifyClientBuilder {
    fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: SPOTIFY_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the Spotify client.
    pub fn build(self) -> Result<SpotifyClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(SpotifyClient {
            client,
            base_url: self.base_url,
            access_token: self.access_token,
        })
    }
}
