//! JSON bodies exchanged with the browser
//!
//! Nodes are shared with the cache behind `Arc`, so serving a cached tree
//! never copies it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::drive::lister::ErrorEntry;
use crate::drive::HealthStatus;
use crate::tree::Node;

/// `GET /courses`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursesResponse {
    pub courses: Arc<Vec<Node>>,
}

/// `GET /folder/:folder_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderResponse {
    pub contents: Arc<Vec<Node>>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub upstream: HealthStatus,
    pub cache: CacheStats,
    pub recent_errors: Vec<ErrorEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{file_entry, folder_entry};

    #[test]
    fn test_serialize_courses_response() {
        let mut folder = Node::from_entry(folder_entry("S", "Subject"));
        folder.children = Some(vec![Node::from_entry(file_entry("V", "Intro", "video/mp4"))]);
        let response = CoursesResponse {
            courses: Arc::new(vec![folder]),
        };

        let json = serde_json::to_value(&response).unwrap();
        let subject = &json["courses"][0];
        assert_eq!(subject["type"], "folder");
        assert_eq!(subject["children"][0]["type"], "file");
        assert!(subject["children"][0]["embedUrl"].is_string());
        assert!(subject["children"][0].get("children").is_none());
    }

    #[test]
    fn test_serialize_folder_response_keeps_children_absent() {
        let response = FolderResponse {
            contents: Arc::new(vec![Node::from_entry(folder_entry("S", "Subject"))]),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.starts_with(r#"{"contents":[{"#));
        assert!(!json.contains("children"));
    }

    #[test]
    fn test_serialize_error_response() {
        let response = ErrorResponse {
            error: "Failed to load course content".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"error":"Failed to load course content"}"#);
    }
}
