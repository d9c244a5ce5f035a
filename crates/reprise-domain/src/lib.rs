// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Source library
// ============================================================================

/// A favorited track read from the source service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    artists: Vec<String>,
    /// Position of the track in the user's library, as reported by the page it came from.
    pub source_offset: u32,
}

impl TrackRecord {
    /// Returns `None` when `artists` is empty; every track has a primary artist.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artists: Vec<String>,
        source_offset: u32,
    ) -> Option<Self> {
        if artists.is_empty() {
            return None;
        }

        Some(Self {
            id: id.into(),
            title: title.into(),
            artists,
            source_offset,
        })
    }

    pub fn artists(&self) -> &[String] {
        &self.artists
    }

    pub fn primary_artist(&self) -> &str {
        &self.artists[0]
    }
}

// ============================================================================
// Destination search
// ============================================================================

/// Top-ranked search hit on the destination service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub title: String,
    pub primary_artist_name: String,
    pub preview_url: Option<String>,
}

impl SearchCandidate {
    pub fn new(title: impl Into<String>, primary_artist_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            primary_artist_name: primary_artist_name.into(),
            preview_url: None,
        }
    }

    pub fn with_preview(mut self, preview_url: impl Into<String>) -> Self {
        self.preview_url = Some(preview_url.into());
        self
    }
}

// ============================================================================
// Matching outcome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertaintyVerdict {
    Sure,
    NotSure,
    NotFound,
}

impl CertaintyVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sure => "SURE",
            Self::NotSure => "NOT_SURE",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for CertaintyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reconciling one source track.
///
/// A candidate is present exactly when the verdict is not `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    source_track: TrackRecord,
    candidate: Option<SearchCandidate>,
    verdict: CertaintyVerdict,
}

impl MatchResult {
    pub fn not_found(source_track: TrackRecord) -> Self {
        Self {
            source_track,
            candidate: None,
            verdict: CertaintyVerdict::NotFound,
        }
    }

    /// Pairs a track with its candidate. A `NotFound` verdict discards the candidate,
    /// and a missing candidate always yields `NotFound`.
    pub fn new(
        source_track: TrackRecord,
        candidate: Option<SearchCandidate>,
        verdict: CertaintyVerdict,
    ) -> Self {
        match (candidate, verdict) {
            (Some(candidate), CertaintyVerdict::Sure | CertaintyVerdict::NotSure) => Self {
                source_track,
                candidate: Some(candidate),
                verdict,
            },
            _ => Self::not_found(source_track),
        }
    }

    pub fn source_track(&self) -> &TrackRecord {
        &self.source_track
    }

    pub fn candidate(&self) -> Option<&SearchCandidate> {
        self.candidate.as_ref()
    }

    pub fn verdict(&self) -> CertaintyVerdict {
        self.verdict
    }
}

/// Tally of verdicts over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    pub sure: usize,
    pub not_sure: usize,
    pub not_found: usize,
}

impl VerdictCounts {
    pub fn tally(results: &[MatchResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut counts, result| {
                match result.verdict() {
                    CertaintyVerdict::Sure => counts.sure += 1,
                    CertaintyVerdict::NotSure => counts.not_sure += 1,
                    CertaintyVerdict::NotFound => counts.not_found += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.sure + self.not_sure + self.not_found
    }
}
