use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::error::ApiError;
use crate::events::CacheEvent;

/// Stable identifier for a mutation slot. Every caller naming the same key
/// observes the same result; `AlbumMatch`, `SetAlbum` and `StopPlay` are
/// shared across independent consumers of the listening flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Login,
    Logout,
    SignUp,
    AlbumMatch,
    SetAlbum,
    StopPlay,
    DiscogsSyncPlan,
    DiscogsSync,
}

impl MutationKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKey::Login => "login",
            MutationKey::Logout => "logout",
            MutationKey::SignUp => "signUp",
            MutationKey::AlbumMatch => "albumMatch",
            MutationKey::SetAlbum => "setAlbum",
            MutationKey::StopPlay => "stopPlay",
            MutationKey::DiscogsSyncPlan => "discogsSyncPlan",
            MutationKey::DiscogsSync => "executeDiscogsSync",
        }
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable lifecycle of one mutation slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MutationState {
    /// Never triggered, or reset since.
    #[default]
    Uninitialized,
    /// Request in flight.
    Loading,
    Success(Value),
    Failed(ApiError),
}

impl MutationState {
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, MutationState::Uninitialized)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, MutationState::Loading)
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            MutationState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            MutationState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

struct Slot {
    state: watch::Sender<MutationState>,
    epoch: u64,
}

/// Settlement token handed out by [`MutationRegistry::begin`]. A settle
/// with a stale token is discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutationToken {
    key: MutationKey,
    epoch: u64,
}

/// Keyed registry of mutation slots with shared, reference-counted
/// observers.
pub struct MutationRegistry {
    slots: Mutex<HashMap<MutationKey, Slot>>,
    events: broadcast::Sender<CacheEvent>,
}

impl MutationRegistry {
    pub fn new(events: broadcast::Sender<CacheEvent>) -> Self {
        MutationRegistry {
            slots: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Current state of a slot. Untriggered keys read as `Uninitialized`.
    pub fn state(&self, key: MutationKey) -> MutationState {
        let slots = self.slots.lock().unwrap();
        slots
            .get(&key)
            .map(|slot| slot.state.borrow().clone())
            .unwrap_or_default()
    }

    /// Watch a slot. Every observer of the same key sees the same sequence
    /// of states.
    pub fn observe(&self, key: MutationKey) -> watch::Receiver<MutationState> {
        let mut slots = self.slots.lock().unwrap();
        Self::slot_entry(&mut slots, key).state.subscribe()
    }

    /// Move a slot to `Loading` and hand back the settlement token.
    pub(crate) fn begin(&self, key: MutationKey) -> MutationToken {
        let mut slots = self.slots.lock().unwrap();
        let slot = Self::slot_entry(&mut slots, key);
        slot.epoch += 1;
        slot.state.send_replace(MutationState::Loading);
        MutationToken {
            key,
            epoch: slot.epoch,
        }
    }

    /// Record a settled result. Returns whether it was accepted: a slot
    /// reset (or re-triggered) since `begin` ignores the settlement, so a
    /// late response cannot resurrect cleared state.
    pub(crate) fn settle(&self, token: MutationToken, result: &Result<Value, ApiError>) -> bool {
        let mut slots = self.slots.lock().unwrap();
        let slot = Self::slot_entry(&mut slots, token.key);
        if slot.epoch != token.epoch {
            debug!("discarding stale settlement for {}", token.key);
            return false;
        }
        let state = match result {
            Ok(value) => MutationState::Success(value.clone()),
            Err(err) => MutationState::Failed(err.clone()),
        };
        slot.state.send_replace(state);
        true
    }

    /// Clear a slot back to `Uninitialized` and notify subscribers. The
    /// underlying request, if still in flight, is not aborted; its
    /// settlement just lands dead.
    pub fn reset(&self, key: MutationKey) {
        {
            let mut slots = self.slots.lock().unwrap();
            let slot = Self::slot_entry(&mut slots, key);
            slot.epoch += 1;
            slot.state.send_replace(MutationState::Uninitialized);
        }
        let _ = self.events.send(CacheEvent::MutationReset { key });
    }

    fn slot_entry(slots: &mut HashMap<MutationKey, Slot>, key: MutationKey) -> &mut Slot {
        slots.entry(key).or_insert_with(|| {
            let (state, _) = watch::channel(MutationState::Uninitialized);
            Slot { state, epoch: 0 }
        })
    }
}
