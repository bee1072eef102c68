use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

use super::realtime::RealtimeClient;
use super::{Backend, BackendError, ChannelSpec, Query, Subscription};

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

/// Tables served over PostgREST at `{base_url}/rest/v1`.
pub struct RestBackend {
    base_url: String,
    api_key: String,
    access_token: RwLock<Option<String>>,
    client: reqwest::Client,
    realtime: RealtimeClient,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            realtime: RealtimeClient::new(&base_url, api_key),
            base_url,
            api_key: api_key.to_string(),
            access_token: RwLock::new(None),
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .ok()
            .and_then(|token| token.clone())
            .unwrap_or_else(|| self.api_key.clone())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
    }

    async fn check(response: Response, action: &str, table: &str) -> Result<Response, BackendError> {
        let status = response.status();
        tracing::info!("{} {} response status: {}", action, table, status);

        if status.is_success() {
            return Ok(response);
        }

        if status == 401 || status == 403 {
            tracing::error!("Not authorized to {} {}", action, table);
            return Err(BackendError::Unauthorized);
        }

        if status == 404 {
            tracing::error!("Table not found: {}", table);
            return Err(BackendError::NotFound(table.to_string()));
        }

        if status == 429 {
            tracing::warn!("Rate limit exceeded");
            return Err(BackendError::RateLimited);
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<PostgrestError>(&body).ok();
        let is_unique_violation = parsed
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .map(|code| code == "23505")
            .unwrap_or(false);
        let message = parsed.and_then(|e| e.message).unwrap_or(body);

        if status == 409 || is_unique_violation {
            tracing::warn!("Conflict on {} {}: {}", action, table, message);
            return Err(BackendError::Conflict(message));
        }

        tracing::error!("Failed to {} {}. Status: {}, Body: {}", action, table, status, message);
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn first_row(response: Response, table: &str) -> Result<Value, BackendError> {
        let rows: Vec<Value> = response.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidRecord(format!("empty response from {}", table)))
    }
}

pub(crate) fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for (column, value) in &query.filters {
        params.push((column.clone(), format!("eq.{}", value)));
    }
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(table);
        tracing::debug!("GET {} with {:?}", url, query);

        let response = self
            .authorized(self.client.get(&url))
            .query(&query_params(query))
            .send()
            .await?;
        let response = Self::check(response, "select", table).await?;

        let rows: Vec<Value> = response.json().await?;
        tracing::info!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        let url = self.table_url(table);
        tracing::debug!("POST {} with payload: {}", url, row);

        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        let response = Self::check(response, "insert", table).await?;

        Self::first_row(response, table).await
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError> {
        let url = self.table_url(table);
        tracing::debug!("PATCH {} id={} with payload: {}", url, id, patch);

        let response = self
            .authorized(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .json(&patch)
            .send()
            .await?;
        let response = Self::check(response, "update", table).await?;

        let rows: Vec<Value> = response.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("{} row {}", table, id)))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        let url = self.table_url(table);

        let response = self
            .authorized(self.client.delete(&url))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        Self::check(response, "delete", table).await?;

        tracing::info!("Deleted {} row {}", table, id);
        Ok(())
    }

    async fn subscribe(&self, channel: ChannelSpec) -> Result<Subscription, BackendError> {
        let token = self.access_token.read().ok().and_then(|token| token.clone());
        self.realtime.subscribe(channel, token).await
    }

    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.access_token.write() {
            *current = token;
        }
    }
}
