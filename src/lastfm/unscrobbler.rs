use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use reqwest::{
    Url,
    blocking::Client,
    cookie::{CookieStore, Jar},
    header::REFERER,
};
use serde_json::Value;

use super::{DEFAULT_USER_AGENT, Unscrobble};
use crate::{Result, ScrobbleError};

const LASTFM_WEB_ROOT: &str = "https://www.last.fm";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Unscrobble`] backed by the Last.fm website.
///
/// The web service cannot delete scrobbles, so this logs in to the website like
/// a browser does and uses the library's delete action. The website guards every
/// form with a CSRF token that it hands out as the `csrftoken` cookie.
///
/// Every login starts over with an empty cookie jar, so a failed login never
/// leaves the session of an earlier one behind.
pub struct WebUnscrobbler {
    web_root: String,
    user_agent: String,
    session: Mutex<WebSession>,
}

struct WebSession {
    client: Client,
    jar: Arc<Jar>,
    username: Option<String>,
}

impl WebSession {
    fn new(user_agent: &str) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        Ok(Self {
            client: build_client(Arc::clone(&jar), user_agent)?,
            jar,
            username: None,
        })
    }

    fn cookie(&self, web_root: &str, name: &str) -> Option<String> {
        let url = Url::parse(web_root).ok()?;
        let header = self.jar.cookies(&url)?;
        cookie_value(header.to_str().ok()?, name)
    }

    fn csrf_token(&self, web_root: &str) -> Result<String> {
        self.cookie(web_root, "csrftoken").ok_or_else(|| {
            ScrobbleError::Authentication("Last.fm did not hand out a CSRF token.".to_string())
        })
    }
}

impl WebUnscrobbler {
    pub fn new() -> Result<Self> {
        Self::with_web_root(LASTFM_WEB_ROOT)
    }

    pub fn with_web_root(web_root: impl Into<String>) -> Result<Self> {
        Ok(Self {
            web_root: web_root.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            session: Mutex::new(WebSession::new(DEFAULT_USER_AGENT)?),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WebSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Unscrobble for WebUnscrobbler {
    fn login(&self, username: &str, password: &str) -> Result<()> {
        let mut session = self.lock();
        *session = WebSession::new(&self.user_agent)?;

        let login_url = format!("{}/login", self.web_root);

        session.client.get(&login_url).send()?.error_for_status()?;
        let csrf_token = session.csrf_token(&self.web_root)?;

        let response = session
            .client
            .post(&login_url)
            .header(REFERER, login_url.as_str())
            .form(&[
                ("csrfmiddlewaretoken", csrf_token.as_str()),
                ("username_or_email", username),
                ("password", password),
                ("submit", ""),
            ])
            .send()?;
        log::debug!("Last.fm login answered with status {}", response.status());

        if session.cookie(&self.web_root, "sessionid").is_none() {
            return Err(ScrobbleError::Authentication(format!(
                "Failed to login to Last.fm account: username={}, password=******",
                username
            )));
        }

        session.username = Some(username.to_string());
        Ok(())
    }

    fn unscrobble(&self, artist: &str, track_name: &str, timestamp: i64) -> Result<bool> {
        let session = self.lock();
        let username = session.username.clone().ok_or_else(|| {
            ScrobbleError::Authentication("Not logged in to the Last.fm website.".to_string())
        })?;
        let csrf_token = session.csrf_token(&self.web_root)?;

        let user_url = format!("{}/user/{}", self.web_root, username);
        let delete_url = format!("{}/library/delete", user_url);
        let timestamp = timestamp.to_string();

        let response = session
            .client
            .post(&delete_url)
            .header(REFERER, user_url.as_str())
            .form(&[
                ("csrfmiddlewaretoken", csrf_token.as_str()),
                ("artist_name", artist),
                ("track_name", track_name),
                ("timestamp", timestamp.as_str()),
                ("ajax", "1"),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Deleting scrobble failed with status {}", status);
            return Ok(false);
        }

        let json: Value = match response.json() {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Unexpected answer to scrobble deletion: {}", e);
                return Ok(false);
            }
        };
        Ok(json["result"].as_bool().unwrap_or(false))
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        match build_client(Arc::clone(&session.jar), user_agent) {
            Ok(client) => {
                session.client = client;
                self.user_agent = user_agent.to_string();
            }
            Err(e) => log::warn!("Keeping previous user agent: {}", e),
        }
    }
}

fn build_client(jar: Arc<Jar>, user_agent: &str) -> Result<Client> {
    Ok(Client::builder()
        .cookie_provider(jar)
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Picks one cookie out of a `Cookie` header value.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .map(str::to_string)
}
