// Generic OData Client for 1C:Enterprise and BAS
// Paged reads with $filter/$select/$expand, GUID-keyed writes, HTTP Basic auth
// Follows @odata.nextLink (or v2 d.__next) until the server stops sending one

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

use crate::services::erp::metrics;
use crate::services::erp::provider::{ErpError, Result};
use crate::utils::log_sanitizer::sanitize_for_log;

const PROVIDER: &str = "OData";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Datetime layout 1C expects inside `datetime'...'` literals.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One OData entity as returned by the server.
pub type Entity = Map<String, Value>;

// ============================================================================
// OData Client
// ============================================================================

pub struct ODataClient {
    base_url: String,
    username: String,
    password: String,
    http_client: Client,
}

impl ODataClient {
    /// Create a client with the default 60 second timeout.
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        Self::with_timeout(base_url, username, password, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ErpError::Config("OData base_url is required".to_string()));
        }
        Url::parse(&base_url)
            .map_err(|e| ErpError::Config(format!("invalid OData base_url: {}", e)))?;

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            username: username.to_string(),
            password: password.to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Fetch every entity of a collection, following pagination links.
    ///
    /// Empty `filter`, `select` or `expand` are left out of the query.
    pub async fn get(
        &self,
        entity: &str,
        filter: &str,
        select: &str,
        expand: &str,
    ) -> Result<Vec<Entity>> {
        let mut url = self.entity_url(entity)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("$format", "json");
            if !filter.is_empty() {
                query.append_pair("$filter", filter);
            }
            if !select.is_empty() {
                query.append_pair("$select", select);
            }
            if !expand.is_empty() {
                query.append_pair("$expand", expand);
            }
        }

        let mut results = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(url);
        let mut pages = 0usize;

        while let Some(page_url) = next.take() {
            visited.insert(page_url.as_str().to_string());

            let body = self.send(Method::GET, page_url, None).await?;
            let page: Value = serde_json::from_slice(&body)?;
            let (items, link) = split_page(page);

            pages += 1;
            results.extend(items);

            if let Some(link) = link {
                let link_url = self.resolve_link(&link)?;
                if visited.contains(link_url.as_str()) {
                    tracing::warn!(entity, link = %link_url, "OData next link repeats a fetched page, stopping");
                    break;
                }
                next = Some(link_url);
            }
        }

        tracing::debug!(entity, pages, count = results.len(), "OData collection fetched");
        Ok(results)
    }

    /// Fetch one entity addressed as `entity(guid'<id>')`.
    pub async fn get_by_id(&self, entity: &str, id: &str) -> Result<Entity> {
        let mut url = self.keyed_url(entity, id)?;
        url.query_pairs_mut().append_pair("$format", "json");

        let body = self.send(Method::GET, url, None).await?;

        match decode_optional_object(&body)? {
            Some(map) if !map.is_empty() => Ok(map),
            _ => Err(ErpError::NotFound(format!("{}({})", entity, id))),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// POST a new entity. A 204 or empty body yields `None`.
    pub async fn create(&self, entity: &str, data: &Value) -> Result<Option<Entity>> {
        let url = self.entity_url(entity)?;
        let body = self.send(Method::POST, url, Some(data)).await?;
        decode_optional_object(&body)
    }

    pub async fn update(&self, entity: &str, id: &str, data: &Value) -> Result<()> {
        let url = self.keyed_url(entity, id)?;
        self.send(Method::PATCH, url, Some(data)).await?;
        Ok(())
    }

    pub async fn delete(&self, entity: &str, id: &str) -> Result<()> {
        let url = self.keyed_url(entity, id)?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// Invoke a published 1C service method.
    pub async fn execute_method(&self, method: &str, params: &Value) -> Result<Option<Entity>> {
        let url = self.entity_url(method)?;
        let body = self.send(Method::POST, url, Some(params)).await?;
        decode_optional_object(&body)
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn entity_url(&self, entity: &str) -> Result<Url> {
        Url::parse(&format!("{}/{}", self.base_url, entity))
            .map_err(|e| ErpError::InvalidData(format!("invalid OData entity '{}': {}", entity, e)))
    }

    /// Unparseable keys can't name an existing entity, so they surface as NotFound.
    fn keyed_url(&self, entity: &str, id: &str) -> Result<Url> {
        let key = Uuid::parse_str(id.trim())
            .map_err(|_| ErpError::NotFound(format!("{}({})", entity, id)))?;
        self.entity_url(&format!("{}(guid'{}')", entity, key))
    }

    /// Absolute links are used as-is, root-relative ones join the server
    /// origin, anything else is relative to the service root.
    fn resolve_link(&self, link: &str) -> Result<Url> {
        match Url::parse(link) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) if link.starts_with('/') => {
                Url::parse(&self.base_url)
                    .and_then(|base| base.join(link))
                    .map_err(|e| {
                        ErpError::InvalidData(format!("invalid OData next link '{}': {}", link, e))
                    })
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => self.entity_url(link),
            Err(e) => Err(ErpError::InvalidData(format!(
                "invalid OData next link '{}': {}",
                link, e
            ))),
        }
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Vec<u8>> {
        let started = Instant::now();

        let mut request = self
            .http_client
            .request(method.clone(), url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_request(PROVIDER, method.as_str(), None, started.elapsed());
                tracing::warn!(%method, path = url.path(), "OData transport failure: {}", e);
                return Err(e.into());
            }
        };

        let status = response.status();
        metrics::record_request(PROVIDER, method.as_str(), Some(status.as_u16()), started.elapsed());

        let bytes = response.bytes().await?;
        tracing::debug!(
            %method,
            path = url.path(),
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OData request completed"
        );

        if status.as_u16() >= 400 {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::warn!(%status, body = %sanitize_for_log(&body), "OData request failed");

            return Err(match status {
                StatusCode::NOT_FOUND => ErpError::NotFound(body),
                _ => ErpError::Api {
                    provider: PROVIDER,
                    status,
                    body,
                },
            });
        }

        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Payload helpers
// ============================================================================

/// Split one page into its entities and the next link, accepting both the v4
/// (`value`, `@odata.nextLink`) and the v2 (`d.results`, `d.__next`) shapes.
fn split_page(page: Value) -> (Vec<Entity>, Option<String>) {
    let Value::Object(mut root) = page else {
        return (Vec::new(), None);
    };

    let (items, link) = match root.remove("d") {
        Some(Value::Object(mut d)) => (d.remove("results"), d.remove("__next")),
        _ => (
            root.remove("value"),
            root.remove("@odata.nextLink")
                .or_else(|| root.remove("odata.nextLink")),
        ),
    };

    let items = match items {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let link = link
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|l| !l.is_empty());

    (items, link)
}

fn unwrap_v2(value: Value) -> Value {
    match value {
        Value::Object(mut root) if matches!(root.get("d"), Some(Value::Object(_))) => {
            root.remove("d").unwrap_or_default()
        }
        other => other,
    }
}

fn decode_optional_object(body: &[u8]) -> Result<Option<Entity>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body)?;
    match unwrap_v2(value) {
        Value::Object(map) => Ok(Some(map)),
        _ => Ok(None),
    }
}

// ============================================================================
// 1C datetime handling
// ============================================================================

/// Parse a 1C datetime. Formats are tried in order and the first match wins;
/// anything unparseable (or not a string) is `None`, meaning "unknown".
pub fn parse_datetime(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value.and_then(Value::as_str).and_then(parse_datetime_str)
}

pub fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ") {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// `<field> gt datetime'<since>'`
pub fn modified_since_filter(field: &str, since: DateTime<Utc>) -> String {
    format!("{} gt datetime'{}'", field, format_datetime(since))
}

/// `<field> eq guid'<id>'`
pub fn guid_filter(field: &str, id: &str) -> String {
    format!("{} eq guid'{}'", field, id)
}
