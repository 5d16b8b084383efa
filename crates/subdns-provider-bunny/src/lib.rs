// # Bunny DNS Gateway
//
// `DnsGateway` implementation over the Bunny DNS HTTP API.
//
// ## Behaviour
//
// - One logical provider operation per trait call (delete-by-name is a lookup
//   followed by a delete)
// - Every failure is returned to the engine; no retries, no backoff
// - HTTP timeout of 15 seconds by default
// - 401/403 map to authentication errors, 429 to rate limiting, anything else
//   outside 2xx to a provider error
// - Dry-run mode performs reads and logs the writes it would have made
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or `Debug` output
// - An empty API key is rejected at construction
//
// ## API Reference
//
// - List zones: GET `/dnszone?page=..&perPage=..`
// - List records: GET `/dnszone/:zone_id/records?type=..&name=..`
// - Create record: POST `/dnszone/:zone_id/records`
// - Delete record: DELETE `/dnszone/:zone_id/records/:record_id`

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use subdns_core::config::GatewayConfig;
use subdns_core::traits::{DnsGateway, DnsGatewayFactory, RecordSpec, RecordType};
use subdns_core::{Error, Registry, Result};

/// Bunny API base URL
const BUNNY_API_BASE: &str = "https://api.bunny.net";

/// Header carrying the account API key
const ACCESS_KEY_HEADER: &str = "AccessKey";

/// Default HTTP timeout for API requests (15 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Zones requested per page when resolving a zone
const ZONE_PAGE_SIZE: u32 = 1000;

/// Upper bound on zone pages walked in a single lookup
const MAX_ZONE_PAGES: u32 = 100;

const PROVIDER: &str = "bunny";

/// Failures talking to the Bunny API, before they are folded into `subdns_core::Error`
#[derive(Debug, thiserror::Error)]
enum BunnyError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication failed: invalid API key or insufficient permissions (status {0})")]
    Unauthorized(StatusCode),

    #[error("Rate limit exceeded, retry later (status {0})")]
    RateLimited(StatusCode),

    #[error("{action} failed: {status} - {body}")]
    Status {
        action: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Invalid response format: {0}")]
    Decode(String),
}

impl From<BunnyError> for Error {
    fn from(err: BunnyError) -> Self {
        match err {
            BunnyError::Transport(e) if e.is_timeout() => {
                Error::http(format!("Bunny API request timed out: {}", e))
            }
            BunnyError::Transport(e) => Error::http(format!("Bunny API request failed: {}", e)),
            e @ BunnyError::Unauthorized(_) => Error::auth(e.to_string()),
            e @ BunnyError::RateLimited(_) => Error::rate_limited(e.to_string()),
            e => Error::provider(PROVIDER, e.to_string()),
        }
    }
}

/// One page of `GET /dnszone`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ZonePage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    has_more_items: bool,
}

/// Bunny DNS gateway
///
/// Stateless apart from the HTTP client: zone ids, collision checks and
/// ordering are owned by `SubdomainEngine`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true the gateway still performs every GET (zone and
/// record lookups) but logs creates and deletes instead of sending them.
/// Creates return a synthetic `dry-run-N` id.
pub struct BunnyGateway {
    /// Bunny account API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base URL without trailing slash
    base_url: String,

    client: reqwest::Client,

    dry_run: bool,

    /// Counter for synthetic ids handed out in dry-run mode
    dry_run_ids: AtomicU64,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for BunnyGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BunnyGateway")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl BunnyGateway {
    /// Create a new Bunny DNS gateway
    ///
    /// # Parameters
    ///
    /// - `api_key`: Bunny account API key
    /// - `base_url`: API endpoint override, `None` for the public API
    /// - `timeout`: Per-request HTTP timeout
    /// - `dry_run`: If true, perform reads but skip creates and deletes
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key is blank or the HTTP client
    /// cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::config("Bunny DNS API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(BUNNY_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            base_url,
            client,
            dry_run,
            dry_run_ids: AtomicU64::new(1),
        })
    }

    /// Create a gateway against the public API in live mode
    pub fn new_live(api_key: impl Into<String>) -> Result<Self> {
        Self::new(api_key, None, DEFAULT_HTTP_TIMEOUT, false)
    }

    /// Create a gateway against the public API in dry-run mode
    pub fn new_dry_run(api_key: impl Into<String>) -> Result<Self> {
        Self::new(api_key, None, DEFAULT_HTTP_TIMEOUT, true)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn records_url(&self, zone_id: &str) -> String {
        self.url(&format!("dnszone/{}/records", zone_id))
    }

    /// Attach credentials, send, and map non-2xx statuses
    async fn send(
        &self,
        request: RequestBuilder,
        action: &'static str,
    ) -> std::result::Result<Response, BunnyError> {
        let response = request
            .header(ACCESS_KEY_HEADER, self.api_key.as_str())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(match status.as_u16() {
            401 | 403 => BunnyError::Unauthorized(status),
            429 => BunnyError::RateLimited(status),
            _ => BunnyError::Status {
                action,
                status,
                body,
            },
        })
    }

    async fn get_json(
        &self,
        request: RequestBuilder,
        action: &'static str,
    ) -> std::result::Result<Value, BunnyError> {
        let response = self.send(request, action).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| BunnyError::Decode(format!("{} returned invalid JSON: {}", action, e)))
    }

    /// List records of one type and name in a zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /dnszone/:zone_id/records?type=CNAME&name=mc.example.com
    /// AccessKey: <key>
    /// ```
    async fn list_records(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
    ) -> std::result::Result<Vec<Value>, BunnyError> {
        tracing::debug!("Listing {} records named {} in zone {}", record_type, name, zone_id);

        let request = self
            .client
            .get(self.records_url(zone_id))
            .query(&[("type", record_type.as_str()), ("name", name)]);

        record_list(self.get_json(request, "Record lookup").await?)
    }

    /// Delete a record by id, treating 404 as "nothing deleted"
    async fn delete_by_id(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let url = format!("{}/{}", self.records_url(zone_id), record_id);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(true);
        }

        match self.send(self.client.delete(&url), "Record deletion").await {
            Ok(_) => {
                tracing::info!("Deleted record {} in zone {}", record_id, zone_id);
                Ok(true)
            }
            Err(BunnyError::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                tracing::debug!("Record {} already absent from zone {}", record_id, zone_id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Request body for `POST /dnszone/:zone_id/records`
fn record_payload(spec: &RecordSpec) -> Value {
    match spec {
        RecordSpec::Simple {
            record_type,
            name,
            content,
            ttl,
        } => json!({
            "type": record_type.as_str(),
            "name": name,
            "content": content,
            "ttl": ttl,
        }),
        RecordSpec::Service {
            name,
            ttl,
            service,
            transport,
            host,
            priority,
            weight,
            port,
            target,
        } => json!({
            "type": RecordType::Srv.as_str(),
            "name": name,
            "ttl": ttl,
            "data": {
                "service": service,
                "proto": format!("_{}", transport),
                "name": host,
                "priority": priority,
                "weight": weight,
                "port": port,
                "target": target,
            },
        }),
    }
}

/// Record lists come back either bare or wrapped in `Items`/`Records`
fn record_list(body: Value) -> std::result::Result<Vec<Value>, BunnyError> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => ["Items", "Records", "items", "records"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or_else(|| BunnyError::Decode("record list is not an array".to_string())),
        other => Err(BunnyError::Decode(format!(
            "record list has unexpected shape: {}",
            other
        ))),
    }
}

/// Bunny ids are numeric on some endpoints and strings on others
fn id_of(value: &Value) -> Option<String> {
    let id = value.get("id").or_else(|| value.get("Id"))?;
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl DnsGateway for BunnyGateway {
    /// # API Call
    ///
    /// ```http
    /// GET /dnszone?page=1&perPage=1000
    /// AccessKey: <key>
    /// ```
    async fn resolve_zone(&self, hostname: &str) -> Result<Option<String>> {
        tracing::debug!("Looking up Bunny zone for {}", hostname);

        for page in 1..=MAX_ZONE_PAGES {
            let request = self
                .client
                .get(self.url("dnszone"))
                .query(&[("page", page), ("perPage", ZONE_PAGE_SIZE)]);

            let body = self.get_json(request, "Zone lookup").await?;
            let zones: ZonePage = serde_json::from_value(body)
                .map_err(|e| Error::from(BunnyError::Decode(format!("zone list: {}", e))))?;

            let found = zones.items.iter().find(|zone| {
                zone.get("Domain")
                    .and_then(Value::as_str)
                    .is_some_and(|domain| domain == hostname)
            });

            if let Some(zone) = found {
                let zone_id = id_of(zone)
                    .ok_or_else(|| Error::from(BunnyError::Decode("zone.Id is missing".to_string())))?;
                tracing::debug!("Found zone ID {} for {}", zone_id, hostname);
                return Ok(Some(zone_id));
            }

            if !zones.has_more_items {
                break;
            }
        }

        tracing::debug!("No Bunny zone matches {}", hostname);
        Ok(None)
    }

    async fn record_absent(&self, zone_id: &str, record_type: RecordType, name: &str) -> Result<bool> {
        let records = self.list_records(zone_id, record_type, name).await?;
        Ok(records.is_empty())
    }

    /// # API Call
    ///
    /// ```http
    /// POST /dnszone/:zone_id/records
    /// {"type": "CNAME", "name": "mc.example.com", "content": "node1.example.net", "ttl": 120}
    /// ```
    async fn create_record(&self, zone_id: &str, spec: &RecordSpec) -> Result<String> {
        let payload = record_payload(spec);
        let url = self.records_url(zone_id);

        tracing::info!(
            "Creating {} record {} in zone {} [mode: {}]",
            spec.record_type(),
            spec.name(),
            zone_id,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send POST request to {} with payload: {}", url, payload);
            let n = self.dry_run_ids.fetch_add(1, Ordering::Relaxed);
            return Ok(format!("dry-run-{}", n));
        }

        let request = self.client.post(&url).json(&payload);
        let body = self.get_json(request, "Record creation").await?;

        let record_id = id_of(&body).ok_or_else(|| {
            Error::from(BunnyError::Decode("created record has no id".to_string()))
        })?;

        tracing::info!("Created {} record {} with id {}", spec.record_type(), spec.name(), record_id);
        Ok(record_id)
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        self.delete_by_id(zone_id, record_id).await
    }

    async fn delete_record_by_name(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
    ) -> Result<bool> {
        let records = self.list_records(zone_id, record_type, name).await?;

        let Some(record_id) = records.first().and_then(id_of) else {
            tracing::debug!("No {} record named {} to delete", record_type, name);
            return Ok(false);
        };

        self.delete_by_id(zone_id, &record_id).await
    }

    fn gateway_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Bunny gateways
pub struct BunnyGatewayFactory;

impl DnsGatewayFactory for BunnyGatewayFactory {
    fn create(&self, config: &GatewayConfig) -> Result<Box<dyn DnsGateway>> {
        match config {
            GatewayConfig::Bunny {
                api_key,
                base_url,
                timeout_secs,
            } => {
                if api_key.trim().is_empty() {
                    return Err(Error::config("Bunny DNS API key is required"));
                }

                let dry_run = std::env::var("SUBDNS_MODE")
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!("Bunny gateway running in DRY-RUN mode - no changes will be made");
                }

                Ok(Box::new(BunnyGateway::new(
                    api_key.clone(),
                    base_url.clone(),
                    Duration::from_secs(*timeout_secs),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Bunny gateway")),
        }
    }
}

/// Register the Bunny gateway with a registry
///
/// # Example
///
/// ```rust
/// use subdns_core::Registry;
///
/// let registry = Registry::new();
/// subdns_provider_bunny::register(&registry);
/// assert!(registry.has_gateway("bunny"));
/// ```
pub fn register(registry: &Registry) {
    registry.register_gateway(PROVIDER, Box::new(BunnyGatewayFactory));
}
