use crate::mutation::MutationKey;
use crate::query::Tag;

/// Events emitted by the API client layer when cached state changes.
///
/// Consumers subscribe via [`crate::api::VitalsApi::subscribe_events`]. The
/// selection store matches on `MutationReset` to clear itself without
/// reaching into the cache layer's internals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    /// A mutation slot was reset back to uninitialized.
    MutationReset { key: MutationKey },
    /// Query entries providing the tag were marked stale.
    TagInvalidated { tag: Tag },
}
