//! Drive API types
//!
//! Defines the wire types returned by the `files.list` endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type the provider uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// One file or folder from a Drive listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Provider-wide identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// MIME type (folders use `FOLDER_MIME_TYPE`)
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    /// Browser view link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// Response from the `files.list` API
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    /// Token for the next page (None if no more files)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl DriveFile {
    /// Check if this entry represents a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Check if this entry is a playable video
    pub fn is_video(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with("video/")
    }
}
