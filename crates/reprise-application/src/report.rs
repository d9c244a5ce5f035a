// SPDX-License-Identifier: GPL-3.0-or-later

//! Plain-text rendering of fetched tracks and reconciliation results.

use crate::engine::ReconciliationReport;
use reprise_domain::{CertaintyVerdict, MatchResult, TrackRecord};

const INDEX_WIDTH: usize = 7;
const ID_WIDTH: usize = 27;
const TITLE_WIDTH: usize = 52;
const ARTISTS_WIDTH: usize = 62;

pub struct ReportPresenter;

impl ReportPresenter {
    /// Tabulate fetched tracks, framed by header rows on both ends.
    pub fn track_table(tracks: &[TrackRecord]) -> Vec<String> {
        let mut lines = Vec::with_capacity(tracks.len() + 6);
        lines.extend(Self::column_heads());

        for track in tracks {
            lines.push(format!(
                "| {:<iw$} | {:<dw$} | {:<tw$} | {:<aw$} |",
                track.source_offset + 1,
                track.id,
                track.title,
                track.artists().join(", "),
                iw = INDEX_WIDTH - 2,
                dw = ID_WIDTH - 2,
                tw = TITLE_WIDTH - 2,
                aw = ARTISTS_WIDTH - 2,
            ));
        }

        lines.extend(Self::column_heads());
        lines
    }

    pub fn match_line(result: &MatchResult) -> String {
        let source = result.source_track();
        match result.candidate() {
            Some(candidate) => {
                let certainty = match result.verdict() {
                    CertaintyVerdict::NotSure => "Not sure",
                    _ => "Sure",
                };
                format!(
                    "Found '{}' by {} ({}) | {}",
                    candidate.title,
                    candidate.primary_artist_name,
                    candidate.preview_url.as_deref().unwrap_or("no preview"),
                    certainty
                )
            }
            None => format!(
                "No result for track '{}' by {}.",
                source.title,
                source.primary_artist()
            ),
        }
    }

    /// Counts for every verdict, the matching time and what to do next.
    pub fn summary(report: &ReconciliationReport) -> Vec<String> {
        let counts = report.counts();
        let mut lines = vec![
            format!(
                "Matched {} of {} fetched tracks in {:.1}s",
                counts.total(),
                report.total_fetched,
                report.matching_duration.as_secs_f64()
            ),
            format!("  {:<10} {}", CertaintyVerdict::Sure.as_str(), counts.sure),
            format!("  {:<10} {}", CertaintyVerdict::NotSure.as_str(), counts.not_sure),
            format!("  {:<10} {}", CertaintyVerdict::NotFound.as_str(), counts.not_found),
        ];

        if report.cancelled && report.total_fetched == 0 {
            lines.push("Run cancelled before any favorite was fetched".to_string());
        } else if report.cancelled {
            lines.push(format!(
                "Run cancelled: {} tracks were not matched",
                report.total_fetched.saturating_sub(counts.total())
            ));
        }

        if counts.not_sure > 0 {
            lines.push(
                "NOT_SURE tracks found a close result; \
                 check title and artist by hand before adding them."
                    .to_string(),
            );
        }
        if counts.not_found > 0 {
            lines.push(
                "NOT_FOUND tracks had no result; search for them manually or retry later."
                    .to_string(),
            );
        }
        if counts.not_sure == 0 && counts.not_found == 0 && !report.cancelled {
            lines.push("Every track has a sure match.".to_string());
        }

        lines
    }

    fn column_heads() -> [String; 3] {
        let separator = format!(
            "|{}|",
            "-".repeat(INDEX_WIDTH + ID_WIDTH + TITLE_WIDTH + ARTISTS_WIDTH + 3)
        );
        let heads = format!(
            "|{:^INDEX_WIDTH$}|{:^ID_WIDTH$}|{:^TITLE_WIDTH$}|{:^ARTISTS_WIDTH$}|",
            "N°", "Track ID", "Track name", "Artists"
        );
        [separator.clone(), heads, separator]
    }
}
