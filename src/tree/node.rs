//! Course tree nodes
//!
//! The JSON shape served to the browser. `children` is `None` for files and
//! for folders that were never traversed; `Some(vec![])` means the folder was
//! listed and found empty (or its listing failed, see `degraded`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::drive::DriveFile;

/// Template for the embeddable player of a video file
const EMBED_URL_PREFIX: &str = "https://drive.google.com/file/d/";
const EMBED_URL_SUFFIX: &str = "/preview";

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

/// One entry in the course hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    /// Set when this folder's listing failed during a full traversal
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Embed URL for a video file id
pub fn embed_url(id: &str) -> String {
    format!("{EMBED_URL_PREFIX}{id}{EMBED_URL_SUFFIX}")
}

impl Node {
    /// Build an untraversed node from a listing entry
    pub fn from_entry(entry: DriveFile) -> Self {
        let kind = if entry.is_folder() {
            NodeKind::Folder
        } else {
            NodeKind::File
        };
        let embed_url = entry.is_video().then(|| embed_url(&entry.id));

        Self {
            id: entry.id,
            name: entry.name,
            kind,
            created_time: entry.created_time,
            modified_time: entry.modified_time,
            link: entry.web_view_link,
            embed_url,
            children: None,
            degraded: false,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Number of nodes in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(Node::subtree_len)
            .sum::<usize>()
    }
}

/// Order siblings by name; stable, so equal names keep provider order
pub fn sort_by_name(nodes: &mut [Node]) {
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
}
