use std::fmt;

use crate::{Result, ScrobbleError, config, utils};

/// Credentials used to talk to Last.fm.
///
/// None of the fields is mandatory. Which ones are needed depends on the
/// operation:
///
/// - reading a user's history needs the username and the API key,
/// - deleting scrobbles logs in to the website and needs username and password,
/// - scrobbling and updating need all four fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthenticationDetails {
    pub api_key: Option<String>,
    pub shared_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthenticationDetails {
    pub fn new(
        api_key: impl Into<String>,
        shared_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            api_key: Some(api_key.into()),
            shared_secret: Some(shared_secret.into()),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Reads the credentials from the `LASTFM_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: config::lastfm_api_key(),
            shared_secret: config::lastfm_shared_secret(),
            username: config::lastfm_username(),
            password: config::lastfm_password(),
        }
    }

    pub fn has_all_data(&self) -> bool {
        self.assure_all_permissions().is_ok()
    }

    pub fn has_data_for_direct_login(&self) -> bool {
        self.assure_permission_for_direct_login().is_ok()
    }

    pub fn has_data_for_public_user_data(&self) -> bool {
        self.assure_permission_for_public_user_data().is_ok()
    }

    pub fn assure_all_permissions(&self) -> Result<()> {
        self.assure_permission_for_direct_login()?;
        self.assure_permission_for_public_user_data()?;

        if utils::is_blank(self.shared_secret.as_deref()) {
            return Err(insufficient(
                "This operation requires the shared secret of the given API key for performing API calls.",
            ));
        }
        Ok(())
    }

    pub fn assure_permission_for_public_user_data(&self) -> Result<()> {
        if utils::is_blank(self.username.as_deref()) {
            return Err(insufficient(
                "This operation requires a username for performing user related API calls.",
            ));
        }
        if utils::is_blank(self.api_key.as_deref()) {
            return Err(insufficient(
                "This operation requires an API key for performing API calls.",
            ));
        }
        Ok(())
    }

    pub fn assure_permission_for_direct_login(&self) -> Result<()> {
        if utils::is_blank(self.username.as_deref()) {
            return Err(insufficient(
                "This operation requires a username for directly logging in to Last.fm.",
            ));
        }
        if utils::is_blank(self.password.as_deref()) {
            return Err(insufficient(
                "This operation requires a password for directly logging in to Last.fm.",
            ));
        }
        Ok(())
    }

    pub(crate) fn username_or_empty(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    pub(crate) fn password_or_empty(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    pub(crate) fn api_key_or_empty(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    pub(crate) fn shared_secret_or_empty(&self) -> &str {
        self.shared_secret.as_deref().unwrap_or_default()
    }
}

impl fmt::Debug for AuthenticationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |value: &Option<String>| value.as_ref().map(|_| "******");
        f.debug_struct("AuthenticationDetails")
            .field("api_key", &self.api_key)
            .field("shared_secret", &masked(&self.shared_secret))
            .field("username", &self.username)
            .field("password", &masked(&self.password))
            .finish()
    }
}

fn insufficient(message: &str) -> ScrobbleError {
    ScrobbleError::InsufficientAuthentication(message.to_string())
}
