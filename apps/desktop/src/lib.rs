//! StudentPro engine: local-first study tracking with best-effort cloud
//! replication.
//!
//! The embedded SQLite store is the single source of truth and every
//! operation works offline. While a user is signed in, mutations land in a
//! durable queue that a background worker replicates to the hosted
//! service's tables; a full pull runs at the start of each session. A UI
//! shell embeds [`AppState`] and calls the `services` functions.

pub mod auth;
pub mod config;
pub mod db;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;

pub use state::AppState;
