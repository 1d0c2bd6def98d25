#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{Duration, Utc};
use lastfm_scrobbler::{
    Result, ScrobbleError,
    config::LastfmConfiguration,
    lastfm::{LastfmApi, Unscrobble},
    management::AuthenticationDetails,
    types::{RecentTrack, RecentTracksPage, ScrobbleResult, Session},
};
use rand::{Rng, distr::Alphanumeric};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Helper function to create a random artist or track name
pub fn random_name() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

pub fn test_session() -> Session {
    Session {
        name: "test-user".to_string(),
        key: "session-key".to_string(),
        subscriber: false,
    }
}

pub fn full_auth_details() -> AuthenticationDetails {
    AuthenticationDetails::new("api-key", "shared-secret", "test-user", "password")
}

pub fn public_auth_details() -> AuthenticationDetails {
    AuthenticationDetails {
        api_key: Some("api-key".to_string()),
        username: Some("test-user".to_string()),
        ..AuthenticationDetails::default()
    }
}

/// Configuration that never makes a test wait for the call limiter.
pub fn fast_config() -> LastfmConfiguration {
    LastfmConfiguration {
        api_call_limit: 10_000,
        millis_for_call_limit: 1,
        ..LastfmConfiguration::default()
    }
}

/// Builds `total_pages` pages of `per_page` played tracks, newest first.
///
/// The n-th track overall (starting at zero) was played n + 1 hours ago. With
/// `now_playing` the first page additionally starts with a track that is playing.
pub fn history(total_pages: u32, per_page: u32, now_playing: bool) -> Vec<RecentTracksPage> {
    let now = Utc::now();
    let mut pages = Vec::new();

    for page in 1..=total_pages {
        let mut tracks = Vec::new();
        if page == 1 && now_playing {
            tracks.push(RecentTrack {
                artist: "Now Artist".to_string(),
                name: "Now Track".to_string(),
                played_when: None,
                now_playing: true,
            });
        }
        for i in 0..per_page {
            let index = (page - 1) * per_page + i;
            tracks.push(RecentTrack {
                artist: format!("Artist {}", index),
                name: format!("Track {}", index),
                played_when: Some(now - Duration::hours(i64::from(index) + 1)),
                now_playing: false,
            });
        }
        pages.push(RecentTracksPage {
            tracks,
            page,
            total_pages,
        });
    }

    pages
}

#[derive(Default)]
pub struct FakeApiState {
    pub session: Option<Session>,
    pub pages: HashMap<u32, RecentTracksPage>,
    pub scrobble_result: ScrobbleResult,
    pub session_calls: usize,
    pub recent_track_calls: Vec<(u32, u32)>,
    pub scrobble_calls: Vec<(String, String, i64)>,
    pub user_agent: Option<String>,
}

/// In-memory [`LastfmApi`]. Clones share their state, so a test keeps a clone
/// to inspect the calls made by the client.
#[derive(Clone, Default)]
pub struct FakeLastfmApi {
    pub state: Arc<Mutex<FakeApiState>>,
}

impl FakeLastfmApi {
    pub fn new() -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            state.session = Some(test_session());
            state.scrobble_result = ScrobbleResult::successful();
        }
        api
    }

    pub fn with_history(pages: Vec<RecentTracksPage>) -> Self {
        let api = Self::new();
        api.state.lock().unwrap().pages = pages.into_iter().map(|p| (p.page, p)).collect();
        api
    }

    pub fn reject_login(&self) {
        self.state.lock().unwrap().session = None;
    }

    pub fn set_scrobble_result(&self, result: ScrobbleResult) {
        self.state.lock().unwrap().scrobble_result = result;
    }

    pub fn recent_track_calls(&self) -> Vec<(u32, u32)> {
        self.state.lock().unwrap().recent_track_calls.clone()
    }

    pub fn scrobble_calls(&self) -> Vec<(String, String, i64)> {
        self.state.lock().unwrap().scrobble_calls.clone()
    }

    pub fn session_calls(&self) -> usize {
        self.state.lock().unwrap().session_calls
    }

    pub fn user_agent(&self) -> Option<String> {
        self.state.lock().unwrap().user_agent.clone()
    }
}

impl LastfmApi for FakeLastfmApi {
    fn get_session(
        &self,
        _username: &str,
        _password: &str,
        _api_key: &str,
        _shared_secret: &str,
    ) -> Result<Option<Session>> {
        let mut state = self.state.lock().unwrap();
        state.session_calls += 1;
        Ok(state.session.clone())
    }

    fn get_recent_tracks(
        &self,
        _user: &str,
        page: u32,
        limit: u32,
        _api_key: &str,
    ) -> Result<RecentTracksPage> {
        let mut state = self.state.lock().unwrap();
        state.recent_track_calls.push((page, limit));
        Ok(state.pages.get(&page).cloned().unwrap_or_default())
    }

    fn scrobble(
        &self,
        artist: &str,
        track_name: &str,
        timestamp: i64,
        _session: &Session,
    ) -> Result<ScrobbleResult> {
        let mut state = self.state.lock().unwrap();
        state
            .scrobble_calls
            .push((artist.to_string(), track_name.to_string(), timestamp));
        Ok(state.scrobble_result)
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        self.state.lock().unwrap().user_agent = Some(user_agent.to_string());
    }
}

pub struct FakeUnscrobblerState {
    pub login_succeeds: bool,
    pub unscrobble_succeeds: bool,
    pub login_calls: usize,
    pub unscrobble_calls: Vec<(String, String, i64)>,
    pub user_agent: Option<String>,
}

impl Default for FakeUnscrobblerState {
    fn default() -> Self {
        Self {
            login_succeeds: true,
            unscrobble_succeeds: true,
            login_calls: 0,
            unscrobble_calls: Vec::new(),
            user_agent: None,
        }
    }
}

/// In-memory [`Unscrobble`]; clones share their state.
#[derive(Clone, Default)]
pub struct FakeUnscrobbler {
    pub state: Arc<Mutex<FakeUnscrobblerState>>,
}

impl FakeUnscrobbler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_login(&self) {
        self.state.lock().unwrap().login_succeeds = false;
    }

    pub fn fail_unscrobbling(&self) {
        self.state.lock().unwrap().unscrobble_succeeds = false;
    }

    pub fn login_calls(&self) -> usize {
        self.state.lock().unwrap().login_calls
    }

    pub fn unscrobble_calls(&self) -> Vec<(String, String, i64)> {
        self.state.lock().unwrap().unscrobble_calls.clone()
    }

    pub fn user_agent(&self) -> Option<String> {
        self.state.lock().unwrap().user_agent.clone()
    }
}

impl Unscrobble for FakeUnscrobbler {
    fn login(&self, username: &str, _password: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.login_calls += 1;
        if state.login_succeeds {
            Ok(())
        } else {
            Err(ScrobbleError::Authentication(format!(
                "Failed to login to Last.fm account: username={}, password=******",
                username
            )))
        }
    }

    fn unscrobble(&self, artist: &str, track_name: &str, timestamp: i64) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state
            .unscrobble_calls
            .push((artist.to_string(), track_name.to_string(), timestamp));
        Ok(state.unscrobble_succeeds)
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        self.state.lock().unwrap().user_agent = Some(user_agent.to_string());
    }
}
