mod auth;
mod scrobble;

pub use auth::AuthenticationDetails;
pub use scrobble::ScrobbleManager;
