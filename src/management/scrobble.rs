use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    Result, ScrobbleError,
    types::{Scrobble, ScrobbleId},
};

/// Keeps track of the scrobbles handed out to callers.
///
/// Every persisted scrobble is stored as the "original", the state last known to
/// Last.fm, while the caller receives a copy, the "handle", stamped with a fresh
/// [`ScrobbleId`]. Callers may freely edit a handle; the original stays untouched
/// until the edit has been confirmed by Last.fm and is reconciled with
/// [`ScrobbleManager::update_original_scrobble`].
///
/// Identity is the id, never the scrobble's content: persisting the same data
/// twice creates two independent entries.
#[derive(Debug, Default)]
pub struct ScrobbleManager {
    state: Mutex<ManagerState>,
}

#[derive(Debug, Default)]
struct ManagerState {
    next_id: u64,
    originals: HashMap<ScrobbleId, Scrobble>,
}

impl ScrobbleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `original_scrobble` and returns the handle that refers to it.
    pub fn persist(&self, original_scrobble: Scrobble) -> Scrobble {
        let mut state = self.lock();
        state.next_id += 1;
        let id = ScrobbleId::new(state.next_id);

        let persisted_scrobble = original_scrobble.clone().with_id(id);
        state.originals.insert(id, original_scrobble);
        persisted_scrobble
    }

    pub fn remove(&self, persisted_scrobble: &Scrobble) {
        if let Some(id) = persisted_scrobble.id() {
            self.lock().originals.remove(&id);
        }
    }

    pub fn size(&self) -> usize {
        self.lock().originals.len()
    }

    /// Returns the original of a handle, or `None` if the handle is not managed.
    pub fn original_scrobble(&self, persisted_scrobble: &Scrobble) -> Option<Scrobble> {
        let id = persisted_scrobble.id()?;
        self.lock().originals.get(&id).cloned()
    }

    /// Copies the handle's artist and track name onto its original.
    ///
    /// The original's play time is kept: it is when the track was actually played
    /// and an edit of the track data does not move it.
    pub fn update_original_scrobble(&self, persisted_scrobble: &Scrobble) -> Result<Scrobble> {
        let mut state = self.lock();
        let original = persisted_scrobble
            .id()
            .and_then(|id| state.originals.get_mut(&id))
            .ok_or_else(|| {
                ScrobbleError::UnmanagedScrobble(format!(
                    "The given scrobble {} is not managed by a scrobble manager.",
                    persisted_scrobble
                ))
            })?;

        original.artist = persisted_scrobble.artist.clone();
        original.track_name = persisted_scrobble.track_name.clone();
        Ok(persisted_scrobble.clone())
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
