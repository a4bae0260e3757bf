use serde::{Deserialize, Serialize};

/// The authenticated user as the backend reports it. `username == None`
/// means "not logged in" and is a legitimate value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserIdentity {
    pub username: Option<String>,
}

impl UserIdentity {
    pub fn anonymous() -> Self {
        UserIdentity { username: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}

/// A record in the user's collection. Immutable value type: the client
/// replaces references to albums, it never edits one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Unique identifier within the collection.
    pub catalog: String,
    pub title: String,
    pub artist: String,
    pub num_discs: u32,
    #[serde(default)]
    pub album_cover_url: Option<String>,
}

impl Album {
    /// Playable sides: two per disc.
    pub fn num_sides(&self) -> u32 {
        2 * self.num_discs
    }
}

/// Server-confirmed playback state. `side` is only meaningful while an
/// album is set, and ranges over `[0, 2 * num_discs)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentAlbumState {
    pub album: Option<Album>,
    #[serde(default)]
    pub side: Option<u32>,
}

/// Ranked result of a cover-image lookup; the first entry is the best
/// match. Transient: lives only between a match request and its dismissal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AlbumMatches {
    #[serde(default)]
    pub albums: Vec<Album>,
}

/// Linked Discogs account, once the user has completed the OAuth dance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscogsIdentity {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscogsIdentityResponse {
    /// Where to send the user to link their Discogs account. Consumers
    /// append a `vitals_callback` query parameter before presenting it.
    pub login_url: String,
    pub discogs_identity: Option<DiscogsIdentity>,
}

/// An album referenced by a sync plan. Title and artist are unknown for
/// records the backend has not ingested yet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlannedAlbum {
    pub catalog: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

impl PlannedAlbum {
    /// "Title by Artist", falling back to the catalog id while metadata is
    /// missing.
    pub fn display_name(&self) -> String {
        match (&self.title, &self.artist) {
            (Some(title), Some(artist)) => format!("{title} by {artist}"),
            _ => format!("catalog {}", self.catalog),
        }
    }
}

/// What a Discogs sync would change, as computed by the backend. Read-only
/// projection; the client never reconciles it locally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscogsSyncPlan {
    #[serde(default)]
    pub add_collection: Vec<PlannedAlbum>,
    #[serde(default)]
    pub rm_collection: Vec<PlannedAlbum>,
    #[serde(default)]
    pub error_messages: Vec<String>,
}
