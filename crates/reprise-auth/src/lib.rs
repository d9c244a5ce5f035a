// SPDX-License-Identifier: GPL-3.0-or-later

//! OAuth plumbing shared by the Spotify and Deezer integrations.
//!
//! A token is read from the service's cache file while it is still valid, and
//! refreshed when it has expired and the service issued a refresh token.
//! Otherwise the user is sent to the authorization page, a single-request
//! local listener captures the redirect, and the code is exchanged for an
//! access token that is written back to the cache.

pub mod callback;
pub mod error;
pub mod flows;
pub mod token_cache;

pub use callback::{CallbackListener, CallbackOutcome};
pub use error::{AuthError, Result};
pub use flows::{authenticate, AuthorizationFlow, DeezerAuth, SpotifyAuth};
pub use token_cache::{CachedToken, TokenCache};
