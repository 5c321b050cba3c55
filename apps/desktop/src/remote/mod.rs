//! Remote table access for the hosted backend.
//!
//! The backend exposes Supabase-style REST tables. Everything the engine
//! needs from it goes through [`TableClient`], so sync logic stays
//! independent of the transport and tests can swap in a fake. Every table
//! carries a server-assigned bigint `id` plus a `user_id` owner column.

pub mod memory;
pub mod rest;

pub use memory::{InMemoryTableClient, TableCall};
pub use rest::{RemoteConfig, RestTableClient};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Remote tables mirrored by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Semesters,
    Subjects,
    Chapters,
    StudySessions,
    UserProfile,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semesters => "semesters",
            Self::Subjects => "subjects",
            Self::Chapters => "chapters",
            Self::StudySessions => "study_sessions",
            Self::UserProfile => "user_profile",
        }
    }
}

/// Remote table errors.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("network error: {0}")]
    Network(String),

    #[error("remote error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Typed access to the remote tables, scoped by user.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// All rows owned by `user_id`, ordered by server id ascending.
    async fn select(
        &self,
        table: Table,
        token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Value>, TableError>;

    /// Insert one row and return the stored row with its server id.
    async fn insert(&self, table: Table, token: &str, record: Value) -> Result<Value, TableError>;

    /// Update the row with server id `id`.
    async fn update(
        &self,
        table: Table,
        token: &str,
        id: i64,
        fields: Value,
    ) -> Result<(), TableError>;

    /// Delete the row with server id `id`. Deleting an absent row is not
    /// an error.
    async fn delete(&self, table: Table, token: &str, id: i64) -> Result<(), TableError>;

    /// Insert or update keyed on the `on_conflict` column, returning the
    /// stored row.
    async fn upsert(
        &self,
        table: Table,
        token: &str,
        record: Value,
        on_conflict: &str,
    ) -> Result<Value, TableError>;
}
