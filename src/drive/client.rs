//! Drive API Client
//!
//! Provides authenticated, paginated folder listings against the Drive `files.list` API.

use reqwest::Client;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::DriveError;
use super::lister::{ErrorEntry, HealthStatus, UpstreamHealth};
use super::types::{DriveFile, FileList};
use crate::config::{Config, ConfigError};

/// HTTP client timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of recent errors to track
const MAX_ERROR_HISTORY: usize = 10;

/// Page size requested from the listing API
const PAGE_SIZE: u32 = 1000;

/// Fields requested for every listed file
const LIST_FIELDS: &str =
    "nextPageToken, files(id, name, mimeType, createdTime, modifiedTime, webViewLink)";

/// Delay before each retry; its length is the retry count
const DEFAULT_BACKOFF: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_millis(1000),
    Duration::from_millis(2000),
];

const HEALTH_HEALTHY: u8 = 0;
const HEALTH_DEGRADED: u8 = 1;
const HEALTH_UNHEALTHY: u8 = 2;

/// Query string for the `files.list` API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesQuery<'a> {
    q: String,
    fields: &'a str,
    order_by: &'a str,
    page_size: u32,
    supports_all_drives: bool,
    include_items_from_all_drives: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
}

impl<'a> ListFilesQuery<'a> {
    fn new(folder_id: &str, page_token: Option<&'a str>, key: Option<&'a str>) -> Self {
        Self {
            q: format!(
                "'{}' in parents and trashed = false",
                folder_id.replace('\\', "\\\\").replace('\'', "\\'")
            ),
            fields: LIST_FIELDS,
            order_by: "name",
            page_size: PAGE_SIZE,
            supports_all_drives: true,
            include_items_from_all_drives: true,
            page_token,
            key,
        }
    }
}

/// Drive API client for making authenticated listing requests
#[derive(Clone)]
pub struct DriveClient {
    /// HTTP client for making requests
    http_client: Client,
    /// API base URL, without trailing slash
    api_base: String,
    /// API key sent as a query parameter
    api_key: Option<String>,
    /// OAuth access token sent as a bearer header
    access_token: Option<String>,
    /// Retry delays for retryable failures
    backoff: Vec<Duration>,
    /// Connection health (0=healthy, 1=degraded, 2=unhealthy)
    health: Arc<AtomicU8>,
    /// Recent error log
    error_log: Arc<RwLock<VecDeque<ErrorEntry>>>,
}

impl DriveClient {
    /// Create a client from the daemon configuration
    ///
    /// Fails if neither an API key nor an access token is configured.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        if config.api_key.is_none() && config.access_token.is_none() {
            return Err(ConfigError::Missing("DRIVE_API_KEY or DRIVE_ACCESS_TOKEN"));
        }

        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "HTTP client",
                value: String::new(),
                reason: e.to_string(),
            })?;

        info!(api_base = %config.api_base, "Drive client ready");

        Ok(Self {
            http_client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
            backoff: DEFAULT_BACKOFF.to_vec(),
            health: Arc::new(AtomicU8::new(HEALTH_HEALTHY)),
            error_log: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_ERROR_HISTORY))),
        })
    }

    /// Replace the retry schedule
    #[cfg(test)]
    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    /// List every child of a folder, following pagination
    pub async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let page = self
                .with_retry("list", folder_id, || {
                    self.fetch_page(folder_id, page_token.as_deref())
                })
                .await?;

            all_files.extend(page.files);

            match page.next_page_token {
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    warn!(folder_id = folder_id, token = %next, "Drive repeated a page token");
                    return Err(DriveError::Decode(format!(
                        "repeated page token while listing {}",
                        folder_id
                    )));
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(folder_id = folder_id, count = all_files.len(), "Listed folder from Drive");
        Ok(all_files)
    }

    /// Fetch a single page of a folder listing
    async fn fetch_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FileList, DriveError> {
        let url = format!("{}/drive/v3/files", self.api_base);
        let query = ListFilesQuery::new(folder_id, page_token, self.api_key.as_deref());

        debug!(folder_id = folder_id, page = ?page_token, "Listing files from Drive");

        let mut request = self.http_client.get(&url).query(&query);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::from_status(status, &body));
        }

        response
            .json::<FileList>()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))
    }

    /// Execute an operation with retry logic and backoff
    async fn with_retry<F, Fut, T>(
        &self,
        operation: &str,
        folder_id: &str,
        f: F,
    ) -> Result<T, DriveError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, DriveError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(result) => {
                    self.health.store(HEALTH_HEALTHY, Ordering::Relaxed);
                    return Ok(result);
                }
                Err(e) => {
                    let delay = match self.backoff.get(attempt) {
                        Some(delay) if e.is_retryable() => *delay,
                        _ => {
                            self.record_failure(operation, folder_id, &e);
                            return Err(e);
                        }
                    };

                    attempt += 1;
                    warn!(
                        operation = operation,
                        folder_id = folder_id,
                        attempt = attempt,
                        max = self.backoff.len(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying Drive operation"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Update health and the error history after a final failure
    fn record_failure(&self, operation: &str, folder_id: &str, error: &DriveError) {
        match error {
            DriveError::Network(_) | DriveError::Timeout => {
                self.health.store(HEALTH_UNHEALTHY, Ordering::Relaxed)
            }
            DriveError::RateLimited | DriveError::Server(_, _) => {
                self.health.store(HEALTH_DEGRADED, Ordering::Relaxed)
            }
            _ => {}
        }

        let entry = ErrorEntry {
            timestamp: chrono::Utc::now(),
            operation: operation.to_string(),
            folder_id: folder_id.to_string(),
            error: error.to_string(),
        };

        let mut log = self.error_log.write().unwrap_or_else(|p| p.into_inner());
        if log.len() >= MAX_ERROR_HISTORY {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// Current connection health and recent errors
    pub fn health(&self) -> UpstreamHealth {
        let status = match self.health.load(Ordering::Relaxed) {
            HEALTH_HEALTHY => HealthStatus::Healthy,
            HEALTH_DEGRADED => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        };
        let recent_errors = self
            .error_log
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect();

        UpstreamHealth {
            status,
            recent_errors,
        }
    }
}
