//! Minimal PostgREST client for the Supabase score table

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::SupabaseConfig;

/// Upper bound on one ledger round trip; the ledger worker waits on it
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Server-side client. The service_role key bypasses RLS, never expose it.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SupabaseError::Request)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
    }

    /// `GET /rest/v1/{table}?{query}`, rows decoded as `T`
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(SupabaseError::Parse)
    }

    /// Insert `row`, or overwrite the existing row matching `on_conflict`
    pub async fn upsert<T: Serialize>(
        &self,
        table: &str,
        row: &T,
        on_conflict: &str,
    ) -> Result<(), SupabaseError> {
        let response = self
            .authorized(self.client.post(self.rest_url(table)))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        ensure_success(response).await.map(|_| ())
    }
}

async fn ensure_success(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SupabaseError::Api {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(#[source] reqwest::Error),
}
