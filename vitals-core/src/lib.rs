//! Client-side cache and state layer for the vitals record tracker.
//!
//! [`VitalsApi`] speaks the backend's `api/v1` REST surface and owns the
//! last-known server state (query cache plus mutation registry);
//! [`SelectionStore`] owns the purely local "play this album?" confirmation
//! flow; [`listening`] derives what a consumer should display from both.
//! Consumers only trigger mutations and dispatch the two selection actions;
//! they never write cached data directly.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod listening;
pub mod models;
pub mod mutation;
pub mod query;
pub mod selection;

pub use api::VitalsApi;
pub use config::ClientConfig;
pub use error::{ApiError, SignUpError};
pub use events::CacheEvent;
pub use mutation::{MutationKey, MutationState};
pub use selection::{SelectionState, SelectionStore};
