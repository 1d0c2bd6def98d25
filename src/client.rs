use chrono::{DateTime, Utc};

use crate::{
    Result, ScrobbleError, config,
    config::LastfmConfiguration,
    lastfm::{
        ApiCallLimiter, HistoryFetcher, HttpLastfmApi, LastfmApi, ScrobbleQuery, Unscrobble,
        WebUnscrobbler,
    },
    management::{AuthenticationDetails, ScrobbleManager},
    types::{Scrobble, Session},
    utils,
};

/// Scrobbles to, reads from and edits a Last.fm play history.
///
/// The scrobbles returned by [`scrobble`](Self::scrobble) and the history queries
/// are handles managed by the client. Edit a handle's artist or track name and
/// pass it to [`update_scrobble`](Self::update_scrobble), or pass it to
/// [`unscrobble`](Self::unscrobble) to remove it; the client remembers what
/// Last.fm actually holds for it.
///
/// Every call blocks the calling thread, including the waits enforced by the
/// call limiter.
pub struct ScrobbleClient {
    config: LastfmConfiguration,
    auth_details: AuthenticationDetails,
    session: Option<Session>,
    api: Box<dyn LastfmApi>,
    unscrobbler: Box<dyn Unscrobble>,
    scrobble_manager: ScrobbleManager,
    call_limiter: ApiCallLimiter,
}

impl ScrobbleClient {
    /// Creates a client talking to Last.fm over HTTP.
    ///
    /// Uses the `LASTFM_USER_AGENT` environment variable as user agent if set.
    pub fn new(config: LastfmConfiguration) -> Result<Self> {
        let mut client =
            Self::with_components(config, HttpLastfmApi::new()?, WebUnscrobbler::new()?);
        if let Some(user_agent) = config::lastfm_user_agent() {
            client.set_user_agent(&user_agent);
        }
        Ok(client)
    }

    /// Creates a client with custom collaborators.
    pub fn with_components(
        config: LastfmConfiguration,
        api: impl LastfmApi + 'static,
        unscrobbler: impl Unscrobble + 'static,
    ) -> Self {
        Self {
            call_limiter: ApiCallLimiter::from_config(&config),
            config,
            auth_details: AuthenticationDetails::default(),
            session: None,
            api: Box::new(api),
            unscrobbler: Box::new(unscrobbler),
            scrobble_manager: ScrobbleManager::new(),
        }
    }

    /// Logs the client in to Last.fm.
    ///
    /// None of the authentication details is mandatory: a web service session
    /// is only opened if all four are present, and the website login only
    /// happens if username and password are present. Missing details surface
    /// later as [`ScrobbleError::InsufficientAuthentication`] from the
    /// operations that need them.
    ///
    /// # Errors
    ///
    /// [`ScrobbleError::Authentication`] if Last.fm rejects the credentials.
    pub fn login(&mut self, authentication_details: AuthenticationDetails) -> Result<()> {
        self.auth_details = authentication_details;
        self.session = None;

        if self.auth_details.has_all_data() {
            self.login_with_lastfm_api()?;
        }
        if self.auth_details.has_data_for_direct_login() {
            self.login_with_unscrobbler()?;
        }
        Ok(())
    }

    /// Scrobbles a track to Last.fm.
    ///
    /// A scrobble without play time is stamped with the current time. Returns the
    /// managed handle that can be used for updating or removing the scrobble.
    ///
    /// # Errors
    ///
    /// - [`ScrobbleError::InvalidScrobble`] if artist or track name is blank.
    /// - [`ScrobbleError::InsufficientAuthentication`] without complete credentials.
    /// - [`ScrobbleError::OperationFailed`] if Last.fm did not accept the scrobble.
    pub fn scrobble(&self, mut scrobble: Scrobble) -> Result<Scrobble> {
        validate_scrobble(&scrobble)?;
        self.auth_details.assure_all_permissions()?;
        let session = self.session()?;

        self.call_limiter.consider_call();
        let timestamp = match scrobble.timestamp_seconds() {
            Some(timestamp) => timestamp,
            None => {
                let now = utils::current_seconds();
                scrobble.set_timestamp_seconds(Some(now));
                now
            }
        };

        log::info!("Scrobbling {}", scrobble);
        let result = self
            .api
            .scrobble(&scrobble.artist, &scrobble.track_name, timestamp, session)?;

        if !result.successful {
            return Err(ScrobbleError::operation_failed(
                format!("Scrobbling of scrobble {} failed.", scrobble),
                &scrobble,
            ));
        }

        Ok(self.scrobble_manager.persist(scrobble))
    }

    /// Scrobbles a track played right now.
    pub fn scrobble_track(&self, artist: &str, track_name: &str) -> Result<Scrobble> {
        self.scrobble(Scrobble::of(artist, track_name))
    }

    /// Removes a scrobble from Last.fm.
    ///
    /// # Errors
    ///
    /// - [`ScrobbleError::InvalidScrobble`] if artist, track name or play time is missing.
    /// - [`ScrobbleError::InsufficientAuthentication`] without username and password.
    /// - [`ScrobbleError::OperationFailed`] if Last.fm did not delete the scrobble.
    pub fn unscrobble(&self, scrobble: &Scrobble) -> Result<()> {
        validate_scrobble(scrobble)?;
        let timestamp = required_timestamp(scrobble)?;
        self.auth_details.assure_permission_for_direct_login()?;

        self.call_limiter.consider_call();
        log::info!("Unscrobbling {}", scrobble);
        let success = self
            .unscrobbler
            .unscrobble(&scrobble.artist, &scrobble.track_name, timestamp)?;

        if !success {
            return Err(ScrobbleError::operation_failed(
                format!("Unscrobbling of scrobble {} failed.", scrobble),
                scrobble,
            ));
        }

        self.scrobble_manager.remove(scrobble);
        Ok(())
    }

    /// Replaces a scrobble on Last.fm with the handle's artist and track name.
    ///
    /// The new data is scrobbled with the original play time, then the original
    /// scrobble is removed.
    ///
    /// # Errors
    ///
    /// - [`ScrobbleError::InvalidScrobble`] if artist, track name or play time is missing.
    /// - [`ScrobbleError::InsufficientAuthentication`] without complete credentials.
    /// - [`ScrobbleError::UnmanagedScrobble`] if the handle was not obtained from this client.
    /// - [`ScrobbleError::OperationFailed`] if scrobbling or unscrobbling failed. When
    ///   only the removal failed, Last.fm now holds both versions and
    ///   [`ScrobbleError::caused_duplicate`] is true.
    pub fn update_scrobble(&self, scrobble: &Scrobble) -> Result<()> {
        validate_scrobble(scrobble)?;
        required_timestamp(scrobble)?;
        self.auth_details.assure_all_permissions()?;
        let session = self.session()?;

        let original_scrobble = self
            .scrobble_manager
            .original_scrobble(scrobble)
            .ok_or_else(|| {
                ScrobbleError::UnmanagedScrobble(format!(
                    "The given scrobble {} is not managed by a scrobble manager.",
                    scrobble
                ))
            })?;
        let original_timestamp = required_timestamp(&original_scrobble)?;

        self.call_limiter.consider_call();
        log::info!("Scrobbling {}", scrobble);
        let result = self.api.scrobble(
            &scrobble.artist,
            &scrobble.track_name,
            original_timestamp,
            session,
        )?;

        if !result.successful {
            return Err(ScrobbleError::operation_failed(
                format!("Scrobbling of scrobble {} failed.", scrobble),
                scrobble,
            ));
        }

        self.call_limiter.consider_call();
        log::info!("Unscrobbling {}", original_scrobble);
        let unscrobble_success = self.unscrobbler.unscrobble(
            &original_scrobble.artist,
            &original_scrobble.track_name,
            original_timestamp,
        )?;

        if !unscrobble_success {
            return Err(ScrobbleError::duplicate_left_behind(
                format!("Unscrobbling of scrobble {} failed.", original_scrobble),
                scrobble,
            ));
        }

        self.scrobble_manager.update_original_scrobble(scrobble)?;
        Ok(())
    }

    /// Fetches the complete history of the authenticated user.
    pub fn all_scrobbles(&self) -> Result<Vec<Scrobble>> {
        self.scrobbles(ScrobbleQuery::all(self.config.max_results_per_page))
    }

    /// Fetches everything scrobbled at or after `since`.
    pub fn scrobbles_since(&self, since: impl Into<DateTime<Utc>>) -> Result<Vec<Scrobble>> {
        self.scrobbles_since_with_page_size(since, self.config.results_per_page)
    }

    /// Like [`scrobbles_since`](Self::scrobbles_since) with a custom page size.
    ///
    /// A bigger page size needs fewer calls when `since` lies far back.
    pub fn scrobbles_since_with_page_size(
        &self,
        since: impl Into<DateTime<Utc>>,
        results_per_page: u32,
    ) -> Result<Vec<Scrobble>> {
        self.scrobbles(ScrobbleQuery::since(since.into(), results_per_page))
    }

    /// Fetches the latest `amount` scrobbles.
    pub fn last_scrobbles(&self, amount: u32) -> Result<Vec<Scrobble>> {
        self.scrobbles(ScrobbleQuery::last(amount, self.config.results_per_page))
    }

    /// Fetches the scrobbles selected by `query`, newest first.
    ///
    /// # Errors
    ///
    /// [`ScrobbleError::InsufficientAuthentication`] without username and API key.
    pub fn scrobbles(&self, query: ScrobbleQuery) -> Result<Vec<Scrobble>> {
        self.auth_details.assure_permission_for_public_user_data()?;

        HistoryFetcher::new(
            self.api.as_ref(),
            &self.call_limiter,
            &self.scrobble_manager,
            self.config.include_now_playing,
        )
        .fetch(
            self.auth_details.username_or_empty(),
            self.auth_details.api_key_or_empty(),
            &query,
        )
    }

    /// Sets the user agent header of every HTTP call.
    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.api.set_user_agent(user_agent);
        self.unscrobbler.set_user_agent(user_agent);
    }

    pub fn config(&self) -> &LastfmConfiguration {
        &self.config
    }

    pub fn scrobble_manager(&self) -> &ScrobbleManager {
        &self.scrobble_manager
    }

    /// Number of scrobble handles the client currently keeps track of.
    pub fn managed_scrobbles(&self) -> usize {
        self.scrobble_manager.size()
    }

    fn login_with_lastfm_api(&mut self) -> Result<()> {
        self.call_limiter.consider_call();
        let session = self.api.get_session(
            self.auth_details.username_or_empty(),
            self.auth_details.password_or_empty(),
            self.auth_details.api_key_or_empty(),
            self.auth_details.shared_secret_or_empty(),
        )?;

        match session {
            Some(session) => {
                log::debug!("Opened Last.fm session for {}", session.name);
                self.session = Some(session);
                Ok(())
            }
            None => Err(ScrobbleError::Authentication(format!(
                "Failed to login to Last.fm API account: username={}, password=******, apiKey={}, sharedSecret=******",
                self.auth_details.username_or_empty(),
                self.auth_details.api_key_or_empty()
            ))),
        }
    }

    fn login_with_unscrobbler(&self) -> Result<()> {
        self.call_limiter.consider_call();
        let username = self.auth_details.username_or_empty();
        self.unscrobbler
            .login(username, self.auth_details.password_or_empty())
            .map_err(|e| {
                ScrobbleError::Authentication(format!(
                    "Failed to login to Last.fm account: username={}, password=****** ({})",
                    username, e
                ))
            })
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or_else(|| {
            ScrobbleError::Authentication(
                "No Last.fm session available. Log in with complete authentication details first."
                    .to_string(),
            )
        })
    }
}

fn validate_scrobble(scrobble: &Scrobble) -> Result<()> {
    if scrobble.artist.trim().is_empty() || scrobble.track_name.trim().is_empty() {
        return Err(ScrobbleError::InvalidScrobble(format!(
            "Artist and track name are required: {}",
            scrobble
        )));
    }
    Ok(())
}

fn required_timestamp(scrobble: &Scrobble) -> Result<i64> {
    scrobble.timestamp_seconds().ok_or_else(|| {
        ScrobbleError::InvalidScrobble(format!("Missing play time: {}", scrobble))
    })
}
