use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Non-2xx answers from PostgREST, kept typed so callers can tell a
/// unique-constraint hit apart from an outage.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },
}

pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Conflict(_)))
}

/// One page of rows plus the total row count reported by the server.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => ApiError::Unauthorized(error_text),
                404 => ApiError::NotFound(error_text),
                409 => ApiError::Conflict(error_text),
                code => ApiError::Status { status: code, body: error_text },
            }
            .into());
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body, headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// `GET /rest/v1/{table}?{query}`.
    pub async fn select<T>(&self, table: &str, query: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = table_path(table, query);
        self.request(Method::GET, &path, None).await
    }

    pub async fn select_one<T>(&self, table: &str, query: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let query = if query.is_empty() {
            "limit=1".to_string()
        } else {
            format!("{}&limit=1", query)
        };
        let mut rows: Vec<T> = self.select(table, &query).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    /// Selects one page and asks the server for an exact total.
    pub async fn select_page<T>(&self, table: &str, query: &str, page: u32, limit: u32) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let offset = page.saturating_sub(1) as u64 * limit as u64;
        let query = if query.is_empty() {
            format!("limit={}&offset={}", limit, offset)
        } else {
            format!("{}&limit={}&offset={}", query, limit, offset)
        };

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .send(Method::GET, &table_path(table, &query), None, Some(headers))
            .await?;
        let reported = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let items: Vec<T> = response.json().await?;
        let total = reported.unwrap_or_else(|| offset + items.len() as u64);

        Ok(Page { items, total })
    }

    pub async fn count(&self, table: &str, query: &str) -> Result<u64> {
        let query = if query.is_empty() {
            "select=id".to_string()
        } else {
            format!("select=id&{}", query)
        };
        let page: Page<Value> = self.select_page(table, &query, 1, 1).await?;
        Ok(page.total)
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert<T>(&self, table: &str, body: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let rows: Vec<Value> = self
            .request_with_headers(Method::POST, &table_path(table, ""), Some(body), Some(headers))
            .await?;
        first_row(rows, table)
    }

    /// Patches every row matching `query`; an empty result means nothing matched.
    pub async fn update<T>(&self, table: &str, query: &str, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(Method::PATCH, &table_path(table, query), Some(body), Some(headers))
            .await
    }

    /// Insert-or-update keyed on `on_conflict`.
    pub async fn upsert<T>(&self, table: &str, on_conflict: &str, body: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let path = table_path(table, &format!("on_conflict={}", on_conflict));
        let rows: Vec<Value> = self
            .request_with_headers(Method::POST, &path, Some(body), Some(headers))
            .await?;
        first_row(rows, table)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn table_path(table: &str, query: &str) -> String {
    if query.is_empty() {
        format!("/rest/v1/{}", table)
    } else {
        format!("/rest/v1/{}?{}", table, query)
    }
}

fn first_row<T: DeserializeOwned>(mut rows: Vec<Value>, table: &str) -> Result<T> {
    if rows.is_empty() {
        return Err(anyhow!("No row returned from {}", table));
    }
    Ok(serde_json::from_value(rows.swap_remove(0))?)
}

/// `0-9/42` → 42, `*/0` → 0.
fn parse_content_range_total(raw: &str) -> Option<u64> {
    raw.rsplit('/').next().and_then(|total| total.parse().ok())
}

/// Percent-encodes a user supplied value for use inside a filter.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("0-9/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
    }

    #[test]
    fn paths_with_and_without_query() {
        assert_eq!(table_path("bookings", ""), "/rest/v1/bookings");
        assert_eq!(table_path("bookings", "id=eq.1"), "/rest/v1/bookings?id=eq.1");
    }
}
