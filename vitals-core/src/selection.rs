use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::CacheEvent;
use crate::models::Album;
use crate::mutation::MutationKey;

/// Client-only state for the "play this album?" confirmation flow, layered
/// over the server-confirmed playing state.
///
/// Invariant: `selected_side` is only ever `Some` while `selected_album`
/// is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub selected_album: Option<Album>,
    pub selected_side: Option<u32>,
}

/// Owns the selection, reacting to cache events without knowing anything
/// about the cache itself: pending events are drained and matched before
/// every read and write, so transitions stay deterministic with no
/// background listener.
pub struct SelectionStore {
    inner: Mutex<Inner>,
}

struct Inner {
    state: SelectionState,
    events: broadcast::Receiver<CacheEvent>,
}

impl SelectionStore {
    pub fn new(events: broadcast::Receiver<CacheEvent>) -> Self {
        SelectionStore {
            inner: Mutex::new(Inner {
                state: SelectionState::default(),
                events,
            }),
        }
    }

    /// Select an album for confirmation. A concrete album resets the side
    /// choice to the first side; clearing the album clears the side too.
    pub fn set_selected_album(&self, album: Option<Album>) {
        let mut inner = self.inner.lock().unwrap();
        Self::drain_events(&mut inner);
        inner.state.selected_side = if album.is_some() { Some(0) } else { None };
        inner.state.selected_album = album;
    }

    /// Pick a side of the selected album. Coerced to `None` while no album
    /// is selected.
    pub fn set_selected_side(&self, side: Option<u32>) {
        let mut inner = self.inner.lock().unwrap();
        Self::drain_events(&mut inner);
        inner.state.selected_side = if inner.state.selected_album.is_some() {
            side
        } else {
            None
        };
    }

    pub fn selected_album(&self) -> Option<Album> {
        self.snapshot().selected_album
    }

    pub fn selected_side(&self) -> Option<u32> {
        self.snapshot().selected_side
    }

    pub fn snapshot(&self) -> SelectionState {
        let mut inner = self.inner.lock().unwrap();
        Self::drain_events(&mut inner);
        inner.state.clone()
    }

    fn drain_events(inner: &mut Inner) {
        loop {
            match inner.events.try_recv() {
                Ok(CacheEvent::MutationReset {
                    key: MutationKey::AlbumMatch,
                }) => {
                    debug!("album match result removed; clearing selection");
                    inner.state = SelectionState::default();
                }
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }
}
