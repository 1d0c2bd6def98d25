//! # Last.fm Integration Module
//!
//! This module is the integration layer between the scrobble client and Last.fm.
//! It defines the two collaborator seams the client talks through, ships a default
//! implementation for each of them, and contains the pieces of logic that sit
//! directly on top of the remote calls: call limiting and history fetching.
//!
//! ## Architecture
//!
//! ```text
//! ScrobbleClient (facade)
//!          ↓
//! Last.fm Integration Layer
//!     ├── ApiCallLimiter   (at most N calls per window)
//!     ├── HistoryFetcher   (paged user.getRecentTracks walk)
//!     ├── LastfmApi        (sessions, recent tracks, scrobbling)
//!     └── Unscrobble       (website login, scrobble deletion)
//!          ↓
//! HTTP Layer (reqwest blocking, JSON)
//!          ↓
//! ws.audioscrobbler.com / www.last.fm
//! ```
//!
//! ## Collaborators
//!
//! [`LastfmApi`] covers everything the public web service offers the client:
//! mobile sessions, a user's recent tracks and `track.scrobble`. The web service
//! has no way to delete a scrobble, so [`Unscrobble`] covers that through the
//! website with a separate login. [`HttpLastfmApi`] and [`WebUnscrobbler`] are
//! the default implementations; tests substitute in-memory fakes.
//!
//! ## Call Limiting
//!
//! Last.fm allows about five calls per second per API key. The client asks its
//! [`ApiCallLimiter`] before every remote call, which blocks the calling thread
//! once the budget of the current window is spent.
//!
//! ## Thread Safety
//!
//! All collaborators are `Send + Sync`. The limiter serializes its callers
//! with a mutex; everything else is stateless or guards its state itself.

mod api;
mod auth;
mod history;
mod limiter;
mod unscrobbler;

pub use api::HttpLastfmApi;
pub use history::{HistoryFetcher, ScrobbleQuery};
pub use limiter::ApiCallLimiter;
pub use unscrobbler::WebUnscrobbler;

use crate::{
    Result,
    types::{RecentTracksPage, ScrobbleResult, Session},
};

/// User agent sent by the default collaborators unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("lastfm-scrobbler/", env!("CARGO_PKG_VERSION"));

/// The Last.fm web service operations used by the client.
pub trait LastfmApi: Send + Sync {
    /// Opens a mobile session. Returns `Ok(None)` if Last.fm rejects the credentials.
    fn get_session(
        &self,
        username: &str,
        password: &str,
        api_key: &str,
        shared_secret: &str,
    ) -> Result<Option<Session>>;

    /// Fetches one page (1-based) of a user's recent tracks, newest first.
    fn get_recent_tracks(
        &self,
        user: &str,
        page: u32,
        limit: u32,
        api_key: &str,
    ) -> Result<RecentTracksPage>;

    fn scrobble(
        &self,
        artist: &str,
        track_name: &str,
        timestamp: i64,
        session: &Session,
    ) -> Result<ScrobbleResult>;

    fn set_user_agent(&mut self, user_agent: &str);
}

/// Removes scrobbles from a user's library.
pub trait Unscrobble: Send + Sync {
    /// Logs in to the Last.fm account; fails with [`ScrobbleError::Authentication`].
    ///
    /// [`ScrobbleError::Authentication`]: crate::ScrobbleError::Authentication
    fn login(&self, username: &str, password: &str) -> Result<()>;

    /// Deletes one scrobble. Returns whether Last.fm confirmed the deletion.
    fn unscrobble(&self, artist: &str, track_name: &str, timestamp: i64) -> Result<bool>;

    fn set_user_agent(&mut self, user_agent: &str);
}
