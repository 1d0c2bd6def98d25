use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils;

/// Opaque identity of a scrobble handed out by a [`ScrobbleManager`].
///
/// [`ScrobbleManager`]: crate::management::ScrobbleManager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScrobbleId(u64);

impl ScrobbleId {
    pub(crate) fn new(value: u64) -> Self {
        ScrobbleId(value)
    }
}

/// A single play of a track, or the track that is playing right now.
///
/// The play time is stored once, as epoch seconds in UTC; [`Scrobble::timestamp`]
/// derives the date-time view from it. A now playing scrobble has no play time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrobble {
    pub artist: String,
    pub track_name: String,
    now_playing: bool,
    timestamp_seconds: Option<i64>,
    #[serde(skip)]
    id: Option<ScrobbleId>,
}

impl Scrobble {
    /// Creates a scrobble without a play time.
    ///
    /// The client stamps it with the current time when it gets scrobbled.
    pub fn of(artist: impl Into<String>, track_name: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            track_name: track_name.into(),
            now_playing: false,
            timestamp_seconds: None,
            id: None,
        }
    }

    pub fn with_timestamp_seconds(mut self, timestamp_seconds: i64) -> Self {
        self.set_timestamp_seconds(Some(timestamp_seconds));
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.set_timestamp(Some(timestamp));
        self
    }

    pub fn is_now_playing(&self) -> bool {
        self.now_playing
    }

    pub fn timestamp_seconds(&self) -> Option<i64> {
        self.timestamp_seconds
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_seconds
            .and_then(utils::epoch_seconds_to_date_time)
    }

    /// Sets the play time. A scrobble with a play time is no longer now playing.
    pub fn set_timestamp_seconds(&mut self, timestamp_seconds: Option<i64>) {
        if timestamp_seconds.is_some() {
            self.now_playing = false;
        }
        self.timestamp_seconds = timestamp_seconds;
    }

    pub fn set_timestamp(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.set_timestamp_seconds(timestamp.map(|t| t.timestamp()));
    }

    /// The identity assigned by the scrobble manager, if this is a managed handle.
    pub fn id(&self) -> Option<ScrobbleId> {
        self.id
    }

    pub(crate) fn with_id(mut self, id: ScrobbleId) -> Self {
        self.id = Some(id);
        self
    }
}

impl From<RecentTrack> for Scrobble {
    fn from(track: RecentTrack) -> Self {
        let timestamp_seconds = if track.now_playing {
            None
        } else {
            track.played_when.map(|played| played.timestamp())
        };

        Self {
            artist: track.artist,
            track_name: track.name,
            now_playing: track.now_playing,
            timestamp_seconds,
            id: None,
        }
    }
}

impl fmt::Display for Scrobble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.track_name)
    }
}

/// An authenticated Last.fm web service session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub key: String,
    pub subscriber: bool,
}

/// A track of a user's recent tracks as reported by Last.fm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentTrack {
    pub artist: String,
    pub name: String,
    pub played_when: Option<DateTime<Utc>>,
    pub now_playing: bool,
}

/// One page of a user's recent tracks, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecentTracksPage {
    pub tracks: Vec<RecentTrack>,
    pub page: u32,
    pub total_pages: u32,
}

/// Outcome of submitting a scrobble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrobbleResult {
    pub successful: bool,
    pub ignored: bool,
}

impl ScrobbleResult {
    pub fn successful() -> Self {
        Self {
            successful: true,
            ignored: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            successful: false,
            ignored: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentTracksResponse {
    pub recenttracks: RecentTracksContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentTracksContainer {
    #[serde(default)]
    pub track: OneOrMany<RecentTrackEntry>,
    #[serde(rename = "@attr")]
    pub attr: PageAttributes,
}

/// Last.fm sends a lone object instead of an array when a page holds one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentTrackEntry {
    pub artist: TextField,
    pub name: String,
    #[serde(rename = "@attr")]
    pub attr: Option<TrackAttributes>,
    pub date: Option<DateField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextField {
    #[serde(rename = "#text")]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackAttributes {
    pub nowplaying: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateField {
    pub uts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAttributes {
    pub page: String,
    #[serde(rename = "totalPages")]
    pub total_pages: String,
}
