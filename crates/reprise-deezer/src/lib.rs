// SPDX-License-Identifier: GPL-3.0-or-later

//! Deezer search client used to find a destination match for a source track.
//!
//! Every request goes through a shared [`RateLimiter`], and quota errors
//! reported by the API are retried after a fixed backoff up to a bounded
//! number of attempts.

pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use client::{build_query, DeezerClient, DeezerClientBuilder, QuotaRetryPolicy};
pub use error::{DeezerError, Result};
pub use models::{DeezerArtist, DeezerTrack, DeezerUser, SearchResponse};
pub use rate_limiter::RateLimiter;
