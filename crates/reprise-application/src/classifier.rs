// SPDX-License-Identifier: GPL-3.0-or-later

//! Confidence classification of a destination search hit.
//!
//! The policy is kept behind [`MatchClassifier`] so a fuzzier strategy can be
//! dropped into the engine without touching orchestration.

use reprise_domain::{CertaintyVerdict, SearchCandidate, TrackRecord};

/// Decides how confident a search hit is for a given source track.
pub trait MatchClassifier: Send + Sync {
    fn classify(
        &self,
        source: &TrackRecord,
        top_candidate: Option<&SearchCandidate>,
    ) -> CertaintyVerdict;
}

/// Exact, case-sensitive comparison of title and primary artist.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchClassifier;

impl MatchClassifier for ExactMatchClassifier {
    fn classify(
        &self,
        source: &TrackRecord,
        top_candidate: Option<&SearchCandidate>,
    ) -> CertaintyVerdict {
        classify(source, top_candidate)
    }
}

/// No candidate is `NotFound`; same title and same primary artist is `Sure`;
/// anything else is `NotSure`.
pub fn classify(source: &TrackRecord, top_candidate: Option<&SearchCandidate>) -> CertaintyVerdict {
    match top_candidate {
        None => CertaintyVerdict::NotFound,
        Some(candidate)
            if candidate.title == source.title
                && candidate.primary_artist_name == source.primary_artist() =>
        {
            CertaintyVerdict::Sure
        }
        Some(_) => CertaintyVerdict::NotSure,
    }
}
