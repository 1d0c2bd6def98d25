use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;

use super::{DEFAULT_USER_AGENT, LastfmApi, auth};
use crate::{
    Result, ScrobbleError,
    types::{RecentTrack, RecentTracksPage, RecentTracksResponse, ScrobbleResult, Session},
    utils,
};

const LASTFM_API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_AUTHENTICATION_FAILED: i64 = 4;

/// [`LastfmApi`] backed by the Last.fm web service.
///
/// Write calls are signed with the shared secret handed to
/// [`get_session`](LastfmApi::get_session), so a session has to be opened
/// through this instance before scrobbling.
pub struct HttpLastfmApi {
    client: Client,
    api_root: String,
    signing_key: Mutex<Option<SigningKey>>,
}

#[derive(Clone)]
struct SigningKey {
    api_key: String,
    shared_secret: String,
}

enum HttpMethod {
    Get,
    Post,
}

impl HttpLastfmApi {
    pub fn new() -> Result<Self> {
        Self::with_api_root(LASTFM_API_ROOT)
    }

    /// Talks to another endpoint speaking the Last.fm 2.0 API.
    pub fn with_api_root(api_root: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
            api_root: api_root.into(),
            signing_key: Mutex::new(None),
        })
    }

    fn call(&self, method: HttpMethod, params: &[(&str, &str)]) -> Result<Value> {
        let request: RequestBuilder = match method {
            HttpMethod::Get => self.client.get(&self.api_root).query(params),
            HttpMethod::Post => self.client.post(&self.api_root).form(params),
        };

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        let json: Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(_) if !status.is_success() => {
                return Err(ScrobbleError::Api {
                    code: i64::from(status.as_u16()),
                    message: format!("HTTP status {}", status),
                });
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(code) = json["error"].as_i64() {
            return Err(ScrobbleError::Api {
                code,
                message: json["message"].as_str().unwrap_or_default().to_string(),
            });
        }
        if !status.is_success() {
            return Err(ScrobbleError::Api {
                code: i64::from(status.as_u16()),
                message: format!("HTTP status {}", status),
            });
        }

        Ok(json)
    }

    fn signing_key(&self) -> Result<SigningKey> {
        self.signing_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                ScrobbleError::Authentication(
                    "No session has been opened, write calls cannot be signed.".to_string(),
                )
            })
    }
}

impl LastfmApi for HttpLastfmApi {
    fn get_session(
        &self,
        username: &str,
        password: &str,
        api_key: &str,
        shared_secret: &str,
    ) -> Result<Option<Session>> {
        let mut params = vec![
            ("method", "auth.getMobileSession"),
            ("username", username),
            ("password", password),
            ("api_key", api_key),
        ];
        let api_sig = auth::sign(&params, shared_secret);
        params.push(("api_sig", api_sig.as_str()));
        params.push(("format", "json"));

        let json = match self.call(HttpMethod::Post, &params) {
            Ok(json) => json,
            Err(err) if is_rejected_login(&err) => {
                log::warn!("Last.fm refused to open a session: {}", err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let session = auth::parse_session(&json);
        if session.is_some() {
            *self
                .signing_key
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(SigningKey {
                api_key: api_key.to_string(),
                shared_secret: shared_secret.to_string(),
            });
        }
        Ok(session)
    }

    fn get_recent_tracks(
        &self,
        user: &str,
        page: u32,
        limit: u32,
        api_key: &str,
    ) -> Result<RecentTracksPage> {
        let page = page.to_string();
        let limit = limit.to_string();
        let json = self.call(
            HttpMethod::Get,
            &[
                ("method", "user.getrecenttracks"),
                ("user", user),
                ("page", page.as_str()),
                ("limit", limit.as_str()),
                ("api_key", api_key),
                ("format", "json"),
            ],
        )?;

        let response: RecentTracksResponse = serde_json::from_value(json)?;
        recent_tracks_page(response)
    }

    fn scrobble(
        &self,
        artist: &str,
        track_name: &str,
        timestamp: i64,
        session: &Session,
    ) -> Result<ScrobbleResult> {
        let signing_key = self.signing_key()?;
        let timestamp = timestamp.to_string();

        let mut params = vec![
            ("method", "track.scrobble"),
            ("artist", artist),
            ("track", track_name),
            ("timestamp", timestamp.as_str()),
            ("api_key", signing_key.api_key.as_str()),
            ("sk", session.key.as_str()),
        ];
        let api_sig = auth::sign(&params, &signing_key.shared_secret);
        params.push(("api_sig", api_sig.as_str()));
        params.push(("format", "json"));

        let json = self.call(HttpMethod::Post, &params)?;
        Ok(scrobble_result(&json))
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        match build_client(user_agent) {
            Ok(client) => self.client = client,
            Err(e) => log::warn!("Keeping previous user agent: {}", e),
        }
    }
}

/// Whether Last.fm answered with "Authentication Failed", i.e. the credentials
/// are wrong. Outages, rate limiting and HTTP failures are not.
fn is_rejected_login(err: &ScrobbleError) -> bool {
    matches!(
        err,
        ScrobbleError::Api {
            code: ERROR_AUTHENTICATION_FAILED,
            ..
        }
    )
}

fn build_client(user_agent: &str) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

pub(crate) fn recent_tracks_page(response: RecentTracksResponse) -> Result<RecentTracksPage> {
    let container = response.recenttracks;
    let page = parse_number(&container.attr.page, "page")?;
    let total_pages = parse_number(&container.attr.total_pages, "totalPages")?;

    let tracks = container
        .track
        .into_vec()
        .into_iter()
        .map(|entry| {
            let now_playing = entry
                .attr
                .and_then(|attr| attr.nowplaying)
                .is_some_and(|flag| flag == "true");
            let played_when = if now_playing {
                None
            } else {
                entry
                    .date
                    .and_then(|date| date.uts.parse::<i64>().ok())
                    .and_then(utils::epoch_seconds_to_date_time)
            };

            RecentTrack {
                artist: entry.artist.text,
                name: entry.name,
                played_when,
                now_playing,
            }
        })
        .collect();

    Ok(RecentTracksPage {
        tracks,
        page,
        total_pages,
    })
}

pub(crate) fn scrobble_result(json: &Value) -> ScrobbleResult {
    let attr = &json["scrobbles"]["@attr"];
    let count = |value: &Value| match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.parse::<i64>().unwrap_or(0),
        _ => 0,
    };

    ScrobbleResult {
        successful: count(&attr["accepted"]) > 0,
        ignored: count(&attr["ignored"]) > 0,
    }
}

fn parse_number(value: &str, field: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| ScrobbleError::Parse(format!("invalid {} '{}': {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page_from(json: Value) -> RecentTracksPage {
        let response: RecentTracksResponse = serde_json::from_value(json).unwrap();
        recent_tracks_page(response).unwrap()
    }

    #[test]
    fn decodes_recent_tracks_page() {
        let page = page_from(json!({
            "recenttracks": {
                "track": [
                    {
                        "artist": {"mbid": "", "#text": "Now Artist"},
                        "name": "Now Track",
                        "@attr": {"nowplaying": "true"}
                    },
                    {
                        "artist": {"mbid": "", "#text": "Old Artist"},
                        "name": "Old Track",
                        "date": {"uts": "1500000000", "#text": "14 Jul 2017, 02:40"}
                    }
                ],
                "@attr": {"user": "someone", "page": "2", "perPage": "2", "totalPages": "7", "total": "13"}
            }
        }));

        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 7);
        assert_eq!(page.tracks.len(), 2);

        assert!(page.tracks[0].now_playing);
        assert_eq!(page.tracks[0].played_when, None);
        assert_eq!(page.tracks[0].artist, "Now Artist");

        assert!(!page.tracks[1].now_playing);
        assert_eq!(page.tracks[1].name, "Old Track");
        assert_eq!(
            page.tracks[1].played_when.map(|t| t.timestamp()),
            Some(1_500_000_000)
        );
    }

    #[test]
    fn decodes_single_track_object() {
        let page = page_from(json!({
            "recenttracks": {
                "track": {
                    "artist": {"#text": "Artist"},
                    "name": "Track",
                    "date": {"uts": "1500000000"}
                },
                "@attr": {"page": "1", "totalPages": "1"}
            }
        }));

        assert_eq!(page.tracks.len(), 1);
        assert_eq!(page.tracks[0].artist, "Artist");
    }

    #[test]
    fn decodes_empty_history() {
        let page = page_from(json!({
            "recenttracks": {
                "track": [],
                "@attr": {"page": "1", "totalPages": "0"}
            }
        }));

        assert!(page.tracks.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn rejects_malformed_page_number() {
        let response: RecentTracksResponse = serde_json::from_value(json!({
            "recenttracks": {"track": [], "@attr": {"page": "x", "totalPages": "1"}}
        }))
        .unwrap();

        assert!(matches!(
            recent_tracks_page(response),
            Err(ScrobbleError::Parse(_))
        ));
    }

    #[test]
    fn accepted_scrobble_is_successful() {
        let result = scrobble_result(&json!({
            "scrobbles": {"@attr": {"accepted": 1, "ignored": 0}, "scrobble": {}}
        }));
        assert_eq!(result, ScrobbleResult::successful());
    }

    #[test]
    fn ignored_scrobble_is_not_successful() {
        let result = scrobble_result(&json!({
            "scrobbles": {"@attr": {"accepted": "0", "ignored": "1"}, "scrobble": {}}
        }));
        assert!(!result.successful);
        assert!(result.ignored);
    }

    #[test]
    fn only_authentication_failure_rejects_login() {
        let api_error = |code: i64| ScrobbleError::Api {
            code,
            message: String::new(),
        };

        assert!(is_rejected_login(&api_error(4)));
        // Service offline, rate limit exceeded and an HTTP 503 body
        assert!(!is_rejected_login(&api_error(11)));
        assert!(!is_rejected_login(&api_error(29)));
        assert!(!is_rejected_login(&api_error(503)));
        assert!(!is_rejected_login(&ScrobbleError::Parse("eof".to_string())));
    }

    #[test]
    fn unreachable_service_is_not_a_rejected_login() {
        let api = HttpLastfmApi::with_api_root("http://127.0.0.1:9").unwrap();

        assert!(matches!(
            api.get_session("user", "password", "key", "secret"),
            Err(ScrobbleError::Http(_))
        ));
    }

    #[test]
    fn scrobble_requires_an_opened_session() {
        let api = HttpLastfmApi::with_api_root("http://127.0.0.1:9").unwrap();
        let session = Session {
            name: "user".to_string(),
            key: "key".to_string(),
            subscriber: false,
        };

        assert!(matches!(
            api.scrobble("Artist", "Track", 1_500_000_000, &session),
            Err(ScrobbleError::Authentication(_))
        ));
    }
}
