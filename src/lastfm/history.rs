use chrono::{DateTime, Utc};

use super::{ApiCallLimiter, LastfmApi};
use crate::{Result, management::ScrobbleManager, types::Scrobble, utils};

/// Bounds of a history fetch.
///
/// A fetch stops at whichever comes first: a scrobble older than `since`,
/// `total_limit` collected scrobbles, `page_limit` fetched pages, or the last
/// page Last.fm has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrobbleQuery {
    pub since: Option<DateTime<Utc>>,
    pub results_per_page: u32,
    pub page_limit: u32,
    pub total_limit: u32,
}

impl ScrobbleQuery {
    /// The complete history.
    pub fn all(results_per_page: u32) -> Self {
        Self {
            since: None,
            results_per_page,
            page_limit: u32::MAX,
            total_limit: u32::MAX,
        }
    }

    /// Everything scrobbled at or after `since`.
    pub fn since(since: DateTime<Utc>, results_per_page: u32) -> Self {
        Self {
            since: Some(since),
            ..Self::all(results_per_page)
        }
    }

    /// The latest `amount` scrobbles, fetched in pages of at most `results_per_page`.
    pub fn last(amount: u32, results_per_page: u32) -> Self {
        let per_page = amount.min(results_per_page);
        let page_limit = match per_page {
            0 => 0,
            _ if amount <= results_per_page => 1,
            _ => amount.div_ceil(per_page),
        };

        Self {
            since: None,
            results_per_page: per_page,
            page_limit,
            total_limit: amount,
        }
    }

    fn is_empty(&self) -> bool {
        self.results_per_page < 1
            || self.page_limit < 1
            || self.total_limit < 1
            || utils::is_in_future(self.since)
    }
}

/// Walks a user's recent tracks page by page.
///
/// Every returned scrobble is a handle registered with the scrobble manager, so
/// it can be updated or unscrobbled later on.
pub struct HistoryFetcher<'a> {
    api: &'a dyn LastfmApi,
    limiter: &'a ApiCallLimiter,
    manager: &'a ScrobbleManager,
    include_now_playing: bool,
}

impl<'a> HistoryFetcher<'a> {
    pub fn new(
        api: &'a dyn LastfmApi,
        limiter: &'a ApiCallLimiter,
        manager: &'a ScrobbleManager,
        include_now_playing: bool,
    ) -> Self {
        Self {
            api,
            limiter,
            manager,
            include_now_playing,
        }
    }

    /// Fetches the scrobbles selected by `query`, newest first.
    ///
    /// Returns an empty list without calling Last.fm if any limit of the query is
    /// zero or `since` lies in the future.
    pub fn fetch(&self, username: &str, api_key: &str, query: &ScrobbleQuery) -> Result<Vec<Scrobble>> {
        let mut scrobbles = Vec::new();

        if query.is_empty() {
            return Ok(scrobbles);
        }

        let total_limit = query.total_limit as usize;
        let mut current_page = 1;

        'pages: loop {
            self.limiter.consider_call();
            let recent_tracks =
                self.api
                    .get_recent_tracks(username, current_page, query.results_per_page, api_key)?;

            log::debug!(
                "Fetched scrobble page {}/{}",
                current_page,
                recent_tracks.total_pages
            );

            for track in recent_tracks.tracks {
                if track.now_playing && !self.include_now_playing {
                    continue;
                }

                let scrobble = self.manager.persist(Scrobble::from(track));
                log::debug!("Fetched scrobble {}", scrobble);

                if let (Some(since), Some(timestamp)) = (query.since, scrobble.timestamp()) {
                    log::debug!(
                        "Checking scrobble's timestamp. Since: {} Timestamp: {}.",
                        since,
                        timestamp
                    );
                    if timestamp < since {
                        log::debug!(
                            "Finished scrobble fetching due to reaching the value defined in 'since'."
                        );
                        break 'pages;
                    }
                }

                scrobbles.push(scrobble);

                if scrobbles.len() == total_limit {
                    log::debug!(
                        "Finished scrobble fetching due to reaching the value defined in 'total_limit'."
                    );
                    break 'pages;
                }
            }

            if current_page >= query.page_limit {
                log::debug!(
                    "Finished scrobble fetching due to reaching the value defined in 'page_limit'."
                );
                break;
            }
            if current_page >= recent_tracks.total_pages {
                log::debug!("Finished scrobble fetching due to end of results.");
                break;
            }

            current_page += 1;
        }

        Ok(scrobbles)
    }
}
