// SPDX-License-Identifier: GPL-3.0-or-later

//! Spotify Web API client for reading the current user's saved tracks.
//!
//! The library is exposed as a lazy [`FavoritesPager`] that follows the
//! `next` cursor of each page until the requested number of tracks has been
//! yielded or the library is exhausted.

pub mod client;
pub mod error;
pub mod models;

pub use client::{FavoritesPager, SpotifyClient, SpotifyClientBuilder, UNBOUNDED};
pub use error::{Result, SpotifyError};
pub use models::{SavedTrackItem, SavedTracksPage, SpotifyArtist, SpotifyTrack};
