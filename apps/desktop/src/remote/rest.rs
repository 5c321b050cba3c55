//! PostgREST table client.

use super::{Table, TableClient, TableError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Table client speaking the Supabase REST dialect.
///
/// Requests carry the project api key plus the caller's access token; the
/// backend enforces row ownership from the token.
pub struct RestTableClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestTableClient {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        }
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn request(&self, method: reqwest::Method, table: Table, token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TableError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(TableError::Status { status, message })
}

/// PostgREST wraps inserted rows in an array even for single inserts.
fn single_row(rows: Vec<Value>) -> Result<Value, TableError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| TableError::Parse("empty representation in response".to_string()))
}

#[async_trait]
impl TableClient for RestTableClient {
    async fn select(
        &self,
        table: Table,
        token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Value>, TableError> {
        let owner = format!("eq.{user_id}");
        let resp = self
            .request(reqwest::Method::GET, table, token)
            .query(&[("select", "*"), ("user_id", owner.as_str()), ("order", "id.asc")])
            .send()
            .await
            .map_err(|e| TableError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| TableError::Parse(e.to_string()))
    }

    async fn insert(&self, table: Table, token: &str, record: Value) -> Result<Value, TableError> {
        let resp = self
            .request(reqwest::Method::POST, table, token)
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await
            .map_err(|e| TableError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;
        let rows: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| TableError::Parse(e.to_string()))?;
        single_row(rows)
    }

    async fn update(
        &self,
        table: Table,
        token: &str,
        id: i64,
        fields: Value,
    ) -> Result<(), TableError> {
        let filter = format!("eq.{id}");
        let resp = self
            .request(reqwest::Method::PATCH, table, token)
            .query(&[("id", filter.as_str())])
            .json(&fields)
            .send()
            .await
            .map_err(|e| TableError::Network(e.to_string()))?;
        check_status(resp).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, token: &str, id: i64) -> Result<(), TableError> {
        let filter = format!("eq.{id}");
        let resp = self
            .request(reqwest::Method::DELETE, table, token)
            .query(&[("id", filter.as_str())])
            .send()
            .await
            .map_err(|e| TableError::Network(e.to_string()))?;
        check_status(resp).await?;
        Ok(())
    }

    async fn upsert(
        &self,
        table: Table,
        token: &str,
        record: Value,
        on_conflict: &str,
    ) -> Result<Value, TableError> {
        let resp = self
            .request(reqwest::Method::POST, table, token)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&record)
            .send()
            .await
            .map_err(|e| TableError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;
        let rows: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| TableError::Parse(e.to_string()))?;
        single_row(rows)
    }
}
