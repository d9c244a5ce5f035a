// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconciliation of a source library against destination search.
//!
//! A run fetches every requested favorite first, then matches them one at a
//! time in fetch order:
//! 1. Search the destination with the track's title and artists
//! 2. Classify the top hit
//! 3. Record exactly one [`MatchResult`] per track
//!
//! A failed search degrades that single track to `NotFound`; a failed fetch
//! aborts the run.

use crate::classifier::{ExactMatchClassifier, MatchClassifier};
use crate::report::ReportPresenter;
use async_trait::async_trait;
use reprise_domain::{MatchResult, SearchCandidate, TrackRecord, VerdictCounts};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Favorites page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// The service favorites are read from.
#[async_trait]
pub trait SourceLibrary: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch up to `result_limit` favorites (`-1` for all) in library order.
    async fn fetch_favorites(
        &self,
        result_limit: i64,
        page_size: u32,
    ) -> Result<Vec<TrackRecord>, Self::Error>;
}

/// The service searched for matches.
#[async_trait]
pub trait DestinationSearch: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Highest-ranked hit for the title and artists, `None` when nothing matched.
    async fn search_top_match(
        &self,
        query_title: &str,
        query_artists: &[String],
    ) -> Result<Option<SearchCandidate>, Self::Error>;
}

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("Failed to fetch favorites from the source library: {0}")]
    SourceFetch(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Fetching favorites was cancelled")]
    Cancelled,
}

impl ReconciliationError {
    /// The source library's own error, when it is an `E`.
    pub fn source_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::SourceFetch(e) => e.downcast_ref::<E>(),
            Self::Cancelled => None,
        }
    }
}

/// Everything a run produced, in source fetch order.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub results: Vec<MatchResult>,
    pub total_fetched: usize,
    pub matching_duration: Duration,
    /// Set when the run stopped before matching every fetched track.
    pub cancelled: bool,
}

impl ReconciliationReport {
    /// A run interrupted while favorites were still being fetched.
    pub fn cancelled_before_matching() -> Self {
        Self {
            results: Vec::new(),
            total_fetched: 0,
            matching_duration: Duration::ZERO,
            cancelled: true,
        }
    }

    pub fn counts(&self) -> VerdictCounts {
        VerdictCounts::tally(&self.results)
    }
}

/// Drives a source library and a destination search through a classifier.
pub struct ReconciliationEngine<S, D, C = ExactMatchClassifier> {
    source: S,
    destination: D,
    classifier: C,
    page_size: u32,
}

impl<S, D> ReconciliationEngine<S, D, ExactMatchClassifier>
where
    S: SourceLibrary,
    D: DestinationSearch,
{
    pub fn new(source: S, destination: D) -> Self {
        Self {
            source,
            destination,
            classifier: ExactMatchClassifier,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl<S, D, C> ReconciliationEngine<S, D, C>
where
    S: SourceLibrary,
    D: DestinationSearch,
    C: MatchClassifier,
{
    /// Swap the matching policy.
    pub fn with_classifier<C2: MatchClassifier>(
        self,
        classifier: C2,
    ) -> ReconciliationEngine<S, D, C2> {
        ReconciliationEngine {
            source: self.source,
            destination: self.destination,
            classifier,
            page_size: self.page_size,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetch then reconcile. Only a fetch failure is an error; a cancelled
    /// fetch yields an empty cancelled report.
    pub async fn run(
        &self,
        result_limit: i64,
        cancel: &CancellationToken,
    ) -> Result<ReconciliationReport, ReconciliationError> {
        let tracks = match self.fetch(result_limit, cancel).await {
            Err(ReconciliationError::Cancelled) => {
                return Ok(ReconciliationReport::cancelled_before_matching())
            }
            fetched => fetched?,
        };
        Ok(self.reconcile(tracks, cancel).await)
    }

    /// Materialize the requested favorites before any matching starts.
    ///
    /// Cancelling `cancel` abandons the fetch with [`ReconciliationError::Cancelled`].
    pub async fn fetch(
        &self,
        result_limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TrackRecord>, ReconciliationError> {
        info!(
            target: "reconciliation",
            result_limit,
            page_size = self.page_size,
            "beginning to fetch favorites, this might take a long time"
        );

        let tracks = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(target: "reconciliation", "fetching favorites cancelled");
                return Err(ReconciliationError::Cancelled);
            }
            fetched = self.source.fetch_favorites(result_limit, self.page_size) => {
                fetched.map_err(|e| ReconciliationError::SourceFetch(Box::new(e)))?
            }
        };

        info!(target: "reconciliation", tracks = tracks.len(), "finished fetching favorites");
        Ok(tracks)
    }

    /// Match every track in order. Cancelling `cancel` stops the run, abandoning
    /// a search still in flight (including its quota backoff).
    pub async fn reconcile(
        &self,
        tracks: Vec<TrackRecord>,
        cancel: &CancellationToken,
    ) -> ReconciliationReport {
        let total_fetched = tracks.len();
        let mut results = Vec::with_capacity(total_fetched);
        let mut cancelled = false;
        let started = Instant::now();

        for (index, track) in tracks.into_iter().enumerate() {
            let matched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.match_track(track) => Some(result),
            };

            let Some(result) = matched else {
                warn!(
                    target: "reconciliation",
                    processed = index,
                    total = total_fetched,
                    "reconciliation cancelled"
                );
                cancelled = true;
                break;
            };

            info!(
                target: "reconciliation",
                "[{}/{}] {}",
                index + 1,
                total_fetched,
                ReportPresenter::match_line(&result)
            );
            results.push(result);
        }

        let matching_duration = started.elapsed();
        let report = ReconciliationReport {
            results,
            total_fetched,
            matching_duration,
            cancelled,
        };

        let counts = report.counts();
        info!(
            target: "reconciliation",
            sure = counts.sure,
            not_sure = counts.not_sure,
            not_found = counts.not_found,
            elapsed = ?matching_duration,
            "reconciliation complete"
        );

        report
    }

    async fn match_track(&self, track: TrackRecord) -> MatchResult {
        match self
            .destination
            .search_top_match(&track.title, track.artists())
            .await
        {
            Ok(candidate) => {
                let verdict = self.classifier.classify(&track, candidate.as_ref());
                MatchResult::new(track, candidate, verdict)
            }
            Err(e) => {
                warn!(
                    target: "reconciliation",
                    track_id = %track.id,
                    title = %track.title,
                    error = %e,
                    "destination search failed, recording track as not found"
                );
                MatchResult::not_found(track)
            }
        }
    }
}
