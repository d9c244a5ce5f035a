// SPDX-License-Identifier: GPL-3.0-or-later

use reprise_domain::SearchCandidate;
use serde::{Deserialize, Serialize};

/// Error code Deezer uses for "Quota limit exceeded".
pub const QUOTA_ERROR_CODE: u32 = 4;
/// The token lacks a permission the request needs.
pub const PERMISSION_ERROR_CODE: u32 = 200;
/// The access token is invalid, expired or revoked.
pub const TOKEN_INVALID_ERROR_CODE: u32 = 300;

/// Body of `GET /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<DeezerTrack>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeezerTrack {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    /// 30 second MP3 preview, empty when the label does not allow one.
    #[serde(default)]
    pub preview: Option<String>,
    pub artist: DeezerArtist,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeezerArtist {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

/// Body of `GET /user/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeezerUser {
    pub id: u64,
    pub name: String,
}

impl From<DeezerTrack> for SearchCandidate {
    fn from(track: DeezerTrack) -> Self {
        SearchCandidate {
            title: track.title,
            primary_artist_name: track.artist.name,
            preview_url: track.preview.filter(|preview| !preview.is_empty()),
        }
    }
}

/// Deezer reports failures in the body, usually alongside a 200 status.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<u32>,
}
