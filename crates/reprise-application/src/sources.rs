// SPDX-License-Identifier: GPL-3.0-or-later

//! Service clients plugged into the reconciliation engine.

use crate::engine::{DestinationSearch, SourceLibrary};
use async_trait::async_trait;
use reprise_deezer::{DeezerClient, DeezerError};
use reprise_domain::{SearchCandidate, TrackRecord};
use reprise_spotify::{SpotifyClient, SpotifyError};

#[async_trait]
impl SourceLibrary for SpotifyClient {
    type Error = SpotifyError;

    async fn fetch_favorites(
        &self,
        result_limit: i64,
        page_size: u32,
    ) -> Result<Vec<TrackRecord>, SpotifyError> {
        SpotifyClient::fetch_favorites(self, result_limit, page_size)?
            .collect()
            .await
    }
}

#[async_trait]
impl DestinationSearch for DeezerClient {
    type Error = DeezerError;

    async fn search_top_match(
        &self,
        query_title: &str,
        query_artists: &[String],
    ) -> Result<Option<SearchCandidate>, DeezerError> {
        DeezerClient::search_top_match(self, query_title, query_artists).await
    }
}
