//! The vitals API client: typed endpoints over a shared query cache and
//! mutation registry, plus the cross-cutting cache rules (401
//! normalization, optimistic playback writes, post-settlement hooks).

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ApiError, SignUpError};
use crate::events::CacheEvent;
use crate::http::Backend;
use crate::listening::error_lines;
use crate::models::{
    Album, AlbumMatches, CurrentAlbumState, DiscogsIdentityResponse, DiscogsSyncPlan, UserIdentity,
};
use crate::mutation::{MutationKey, MutationRegistry, MutationState};
use crate::query::{QueryCache, QueryKey, Tag};
use crate::selection::SelectionStore;

fn identity_key() -> QueryKey {
    QueryKey::new("userIdentity")
}

fn current_album_key() -> QueryKey {
    QueryKey::new("currentAlbum")
}

fn discogs_identity_key() -> QueryKey {
    QueryKey::new("discogsIdentity")
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Outcome of a settled mutation. `accepted` is false when the slot was
/// reset or re-triggered while the request was in flight; stale
/// settlements skip their lifecycle hooks.
struct Settled {
    result: Result<Value, ApiError>,
    accepted: bool,
}

/// One `VitalsApi` is one session against the backend: its cookie jar, its
/// query cache, its mutation slots and its selection store live and die
/// together.
pub struct VitalsApi {
    backend: Backend,
    queries: QueryCache,
    mutations: MutationRegistry,
    selection: Arc<SelectionStore>,
    events: broadcast::Sender<CacheEvent>,
}

impl VitalsApi {
    pub fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(32);
        let selection = Arc::new(SelectionStore::new(events.subscribe()));
        VitalsApi {
            backend: Backend::new(&config),
            queries: QueryCache::new(events.clone()),
            mutations: MutationRegistry::new(events.clone()),
            selection,
            events,
        }
    }

    /// The selection store wired to this client's cache events.
    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    /// Cache-layer events: mutation resets and tag invalidations.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // -- queries --

    /// Who is logged in. A 401 from the backend is a legitimate answer
    /// here (anonymous), not a fetch failure.
    pub async fn user_identity(&self) -> Result<UserIdentity, ApiError> {
        let value = self
            .queries
            .get_or_fetch(identity_key(), &[Tag::UserIdentity], move || async move {
                match self.get("user/me").await {
                    Ok(value) => Ok(value),
                    Err(err) if err.is_unauthorized() => Ok(json!(UserIdentity::anonymous())),
                    Err(err) => Err(err),
                }
            })
            .await?;
        decode(value)
    }

    pub async fn current_album(&self) -> Result<CurrentAlbumState, ApiError> {
        let value = self
            .queries
            .get_or_fetch(
                current_album_key(),
                &[Tag::CurrentAlbum],
                move || async move { self.get("user/album").await },
            )
            .await?;
        decode(value)
    }

    pub async fn discogs_identity(&self) -> Result<DiscogsIdentityResponse, ApiError> {
        let value = self
            .queries
            .get_or_fetch(
                discogs_identity_key(),
                &[Tag::DiscogsIdentity],
                move || async move { self.get("discogs/identity").await },
            )
            .await?;
        decode(value)
    }

    /// Cached playing state without I/O, for derived view code.
    pub fn current_album_snapshot(&self) -> (Option<CurrentAlbumState>, bool) {
        let snapshot = self.queries.snapshot(&current_album_key());
        let data = snapshot
            .data
            .and_then(|value| serde_json::from_value(value).ok());
        (data, snapshot.is_fetching)
    }

    // -- mutations --

    /// Log in and remember the confirmed identity. A fresh login means the
    /// playing state and Discogs linkage may belong to someone else now,
    /// so both are invalidated; a failed login leaves the identity cache
    /// untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserIdentity, ApiError> {
        let body = json!({ "username": username, "password": password });
        let settled = self
            .run_mutation(MutationKey::Login, self.post_json("user/login", &body))
            .await;
        let result = settled.result.and_then(decode::<UserIdentity>);
        if settled.accepted {
            if let Ok(identity) = &result {
                info!("logged in as {:?}", identity.username);
                self.queries
                    .upsert(identity_key(), &[Tag::UserIdentity], json!(identity));
                self.queries
                    .invalidate(&[Tag::CurrentAlbum, Tag::DiscogsIdentity]);
            }
        }
        result
    }

    /// End the session. The identity cache flips to anonymous only once
    /// the server has confirmed the logout.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let settled = self
            .run_mutation(MutationKey::Logout, self.post("user/logout"))
            .await;
        if settled.accepted && settled.result.is_ok() {
            info!("logged out");
            self.queries.upsert(
                identity_key(),
                &[Tag::UserIdentity],
                json!(UserIdentity::anonymous()),
            );
        }
        settled.result.map(|_| ())
    }

    /// Create an account. The password confirmation never leaves the
    /// client: a mismatch resets the sign-up slot (dropping any earlier
    /// server error) and reports a local validation error instead of
    /// issuing a request.
    pub async fn sign_up(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), SignUpError> {
        if password != confirm_password {
            self.mutations.reset(MutationKey::SignUp);
            return Err(SignUpError::PasswordMismatch);
        }
        let body = json!({ "username": username, "password": password });
        let settled = self
            .run_mutation(MutationKey::SignUp, self.post_json("user/sign_up", &body))
            .await;
        settled.result.map(|_| ()).map_err(SignUpError::Api)
    }

    /// Identify an album from a cover photo. Settling, success or failure,
    /// drives the selection store: best match in, or cleared on failure.
    pub async fn album_match(
        &self,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<AlbumMatches, ApiError> {
        let settled = self
            .run_mutation(
                MutationKey::AlbumMatch,
                self.post_multipart("user/album/query", "query", file_name, image),
            )
            .await;
        let result = settled.result.and_then(decode::<AlbumMatches>);
        if settled.accepted {
            let best = result
                .as_ref()
                .ok()
                .and_then(|matches| matches.albums.first().cloned());
            self.selection.set_selected_album(best);
        }
        result
    }

    /// Start playing a side. The cached playing state flips immediately;
    /// a failed request puts the previous value back exactly.
    pub async fn set_album(&self, album: &Album, side: u32) -> Result<(), ApiError> {
        let path = format!(
            "user/album?catalog={}&side={}",
            urlencoding::encode(&album.catalog),
            side
        );
        let patch = self.queries.apply_patch(&current_album_key(), |value| {
            *value = json!(CurrentAlbumState {
                album: Some(album.clone()),
                side: Some(side),
            });
        });
        let settled = self
            .run_mutation(MutationKey::SetAlbum, self.post(&path))
            .await;
        if settled.result.is_err() {
            patch.undo(&self.queries);
        }
        settled.result.map(|_| ())
    }

    /// Stop playback. Optimistically clears the cached playing state; a
    /// failure restores it. Stopping an already-stopped player is a no-op
    /// change.
    pub async fn stop_play(&self) -> Result<(), ApiError> {
        let patch = self.queries.apply_patch(&current_album_key(), |value| {
            *value = json!(CurrentAlbumState::default());
        });
        let settled = self
            .run_mutation(MutationKey::StopPlay, self.delete("user/album"))
            .await;
        if settled.result.is_err() {
            patch.undo(&self.queries);
        }
        settled.result.map(|_| ())
    }

    /// Ask the backend what a Discogs sync would change. Trigger-style:
    /// tracked in the mutation registry so the confirm/cancel flow can
    /// reset it.
    pub async fn discogs_sync_plan(&self) -> Result<DiscogsSyncPlan, ApiError> {
        let settled = self
            .run_mutation(MutationKey::DiscogsSyncPlan, self.get("discogs/sync_plan"))
            .await;
        settled.result.and_then(decode)
    }

    pub async fn execute_discogs_sync(&self) -> Result<(), ApiError> {
        let settled = self
            .run_mutation(MutationKey::DiscogsSync, self.post("discogs/sync"))
            .await;
        settled.result.map(|_| ())
    }

    // -- mutation slot access --

    pub fn mutation_state(&self, key: MutationKey) -> MutationState {
        self.mutations.state(key)
    }

    pub fn observe_mutation(&self, key: MutationKey) -> watch::Receiver<MutationState> {
        self.mutations.observe(key)
    }

    /// Drop a mutation result (the user dismissed the flow). Stores that
    /// react to the emitted event clear themselves; the in-flight request,
    /// if any, is not aborted but its settlement lands dead.
    pub fn reset_mutation(&self, key: MutationKey) {
        self.mutations.reset(key);
    }

    /// Errors of the listening page's named results, one line each, for a
    /// page-level aggregator.
    pub fn listening_page_errors(&self) -> Vec<String> {
        let states: Vec<(MutationKey, MutationState)> = [
            MutationKey::SetAlbum,
            MutationKey::StopPlay,
            MutationKey::AlbumMatch,
        ]
        .into_iter()
        .map(|key| (key, self.mutations.state(key)))
        .collect();
        error_lines(
            states
                .iter()
                .map(|(key, state)| (key.as_str(), state.error())),
        )
    }

    // -- plumbing --

    async fn run_mutation<Fut>(&self, key: MutationKey, request: Fut) -> Settled
    where
        Fut: std::future::Future<Output = Result<Value, ApiError>>,
    {
        let token = self.mutations.begin(key);
        let result = request.await;
        let accepted = self.mutations.settle(token, &result);
        Settled { result, accepted }
    }

    // Every response funnels through these verbs so an expired session
    // resets the cached identity no matter which endpoint saw the 401.

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.normalize(self.backend.get(path).await)
    }

    async fn post(&self, path: &str) -> Result<Value, ApiError> {
        self.normalize(self.backend.post(path).await)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.normalize(self.backend.post_json(path, body).await)
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.normalize(self.backend.delete(path).await)
    }

    async fn post_multipart(
        &self,
        path: &str,
        field: &'static str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, ApiError> {
        self.normalize(self.backend.post_multipart(path, field, file_name, bytes).await)
    }

    fn normalize(&self, result: Result<Value, ApiError>) -> Result<Value, ApiError> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                debug!("401 from backend; resetting cached identity");
                self.queries.upsert(
                    identity_key(),
                    &[Tag::UserIdentity],
                    json!(UserIdentity::anonymous()),
                );
            }
        }
        result
    }
}
