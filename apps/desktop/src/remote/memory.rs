//! In-memory table client for tests and offline development.

use super::{Table, TableClient, TableError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// One observed call, kept for assertions on ordering and payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum TableCall {
    Select(Table),
    Insert(Table, Value),
    Update(Table, i64, Value),
    Delete(Table, i64),
    Upsert(Table, Value),
}

#[derive(Default)]
struct MemoryState {
    rows: HashMap<&'static str, Vec<Value>>,
    next_id: i64,
    calls: Vec<TableCall>,
}

/// Table client backed by process memory.
///
/// Assigns sequential server ids the way the hosted backend would and
/// records every call, so tests can assert on stored rows and call order.
#[derive(Default)]
pub struct InMemoryTableClient {
    state: Mutex<MemoryState>,
}

impl InMemoryTableClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory table lock")
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock()
            .rows
            .get(table.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<TableCall> {
        self.lock().calls.clone()
    }

    /// Store a row directly, assigning a server id. Returns the id.
    pub fn seed(&self, table: Table, mut record: Value) -> i64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        record["id"] = Value::from(id);
        state.rows.entry(table.as_str()).or_default().push(record);
        id
    }
}

fn merge_into(row: &mut Value, fields: &Value) {
    if let (Some(target), Some(source)) = (row.as_object_mut(), fields.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl TableClient for InMemoryTableClient {
    async fn select(
        &self,
        table: Table,
        _token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Value>, TableError> {
        let mut state = self.lock();
        state.calls.push(TableCall::Select(table));
        let owner = user_id.to_string();
        Ok(state
            .rows
            .get(table.as_str())
            .map(|rows| {
                rows.iter()
                    .filter(|row| row["user_id"].as_str() == Some(owner.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, _token: &str, record: Value) -> Result<Value, TableError> {
        let mut state = self.lock();
        state.calls.push(TableCall::Insert(table, record.clone()));
        state.next_id += 1;
        let id = state.next_id;
        let mut stored = record;
        stored["id"] = Value::from(id);
        state
            .rows
            .entry(table.as_str())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: Table,
        _token: &str,
        id: i64,
        fields: Value,
    ) -> Result<(), TableError> {
        let mut state = self.lock();
        state.calls.push(TableCall::Update(table, id, fields.clone()));
        if let Some(rows) = state.rows.get_mut(table.as_str()) {
            if let Some(row) = rows.iter_mut().find(|row| row["id"].as_i64() == Some(id)) {
                merge_into(row, &fields);
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, _token: &str, id: i64) -> Result<(), TableError> {
        let mut state = self.lock();
        state.calls.push(TableCall::Delete(table, id));
        if let Some(rows) = state.rows.get_mut(table.as_str()) {
            rows.retain(|row| row["id"].as_i64() != Some(id));
        }
        Ok(())
    }

    async fn upsert(
        &self,
        table: Table,
        _token: &str,
        record: Value,
        on_conflict: &str,
    ) -> Result<Value, TableError> {
        let mut state = self.lock();
        state.calls.push(TableCall::Upsert(table, record.clone()));
        let keys: Vec<&str> = on_conflict.split(',').map(str::trim).collect();

        let rows = state.rows.entry(table.as_str()).or_default();
        let existing = rows
            .iter_mut()
            .find(|row| keys.iter().all(|key| row[*key] == record[*key]));
        if let Some(row) = existing {
            merge_into(row, &record);
            return Ok(row.clone());
        }

        state.next_id += 1;
        let id = state.next_id;
        let mut stored = record;
        stored["id"] = Value::from(id);
        state
            .rows
            .entry(table.as_str())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }
}
