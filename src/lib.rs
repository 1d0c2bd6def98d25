//! Last.fm Scrobble Client Library
//!
//! This library provides a blocking client for the Last.fm scrobble API. It
//! authenticates a user, submits play events, retrieves the play history page by
//! page and keeps track of the scrobbles it handed out, so that they can later be
//! updated or removed without the caller having to remember what was actually
//! sent to Last.fm.
//!
//! # Modules
//!
//! - `client` - The public facade sequencing all operations
//! - `config` - Configuration management and environment variables
//! - `error` - The error type shared by every operation
//! - `lastfm` - Last.fm API integration, call limiting and history fetching
//! - `management` - Scrobble identity tracking and authentication details
//! - `types` - Data structures and type definitions
//! - `utils` - Time conversion helpers
//!
//! # Example
//!
//! ```
//! use lastfm_scrobbler::{ScrobbleClient, config, management::AuthenticationDetails};
//!
//! fn main() -> lastfm_scrobbler::Result<()> {
//!     config::load_env()?;
//!
//!     let mut client = ScrobbleClient::new(config::LastfmConfiguration::from_env())?;
//!     client.login(AuthenticationDetails::from_env())?;
//!
//!     let scrobble = client.scrobble_track("Boards of Canada", "Roygbiv")?;
//!     for played in client.last_scrobbles(10)? {
//!         println!("{played}");
//!     }
//!     client.unscrobble(&scrobble)?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod lastfm;
pub mod management;
pub mod types;
pub mod utils;

pub use client::ScrobbleClient;
pub use error::ScrobbleError;
pub use types::Scrobble;

/// A convenient Result type alias for operations that may fail.
///
/// Every fallible operation of the crate reports a [`ScrobbleError`], so callers
/// can match on the failure kind (invalid input, missing credentials, a rejected
/// remote operation, ...) instead of inspecting strings.
///
/// # Example
///
/// ```
/// use lastfm_scrobbler::Result;
///
/// fn fetch_data() -> Result<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, ScrobbleError>;
