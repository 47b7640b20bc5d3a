//! Folder listing seam
//!
//! Everything above the Drive client depends on `FolderLister` rather than on
//! `DriveClient` directly, so traversal and caching can run against fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::client::DriveClient;
use super::errors::DriveError;
use super::types::DriveFile;

/// Upstream connection health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Last failure was rate limiting or a server error
    Degraded,
    /// Last failure was a network error or timeout
    Unhealthy,
}

/// A recent upstream failure
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub folder_id: String,
    pub error: String,
}

/// Health snapshot reported by a lister
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamHealth {
    pub status: HealthStatus,
    pub recent_errors: Vec<ErrorEntry>,
}

impl Default for UpstreamHealth {
    fn default() -> Self {
        Self {
            status: HealthStatus::Healthy,
            recent_errors: Vec::new(),
        }
    }
}

/// Lists the immediate children of a folder
#[async_trait]
pub trait FolderLister: Send + Sync {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError>;

    fn health(&self) -> UpstreamHealth {
        UpstreamHealth::default()
    }
}

#[async_trait]
impl FolderLister for DriveClient {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        self.list_folder(folder_id).await
    }

    fn health(&self) -> UpstreamHealth {
        DriveClient::health(self)
    }
}
