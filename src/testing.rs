//! In-memory lister used by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::drive::{DriveError, DriveFile, FolderLister, FOLDER_MIME_TYPE};

pub fn folder_entry(id: &str, name: &str) -> DriveFile {
    file_entry(id, name, FOLDER_MIME_TYPE)
}

pub fn file_entry(id: &str, name: &str, mime_type: &str) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        created_time: None,
        modified_time: None,
        web_view_link: None,
    }
}

/// Serves canned listings and counts calls
#[derive(Default)]
pub struct FakeLister {
    folders: Mutex<HashMap<String, Result<Vec<DriveFile>, DriveError>>>,
    calls: AtomicUsize,
    calls_by_folder: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl FakeLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder(self, id: &str, children: Vec<DriveFile>) -> Self {
        self.set_folder(id, children);
        self
    }

    pub fn failing(self, id: &str, error: DriveError) -> Self {
        self.set_failing(id, error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_folder(&self, id: &str, children: Vec<DriveFile>) {
        self.folders
            .lock()
            .unwrap()
            .insert(id.to_string(), Ok(children));
    }

    pub fn set_failing(&self, id: &str, error: DriveError) {
        self.folders
            .lock()
            .unwrap()
            .insert(id.to_string(), Err(error));
    }

    /// Total listing calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls_by_folder
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FolderLister for FakeLister {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_folder
            .lock()
            .unwrap()
            .entry(folder_id.to_string())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // answer with the state at request time, like a real upstream
        let result = self
            .folders
            .lock()
            .unwrap()
            .get(folder_id)
            .cloned()
            .unwrap_or_else(|| Err(DriveError::NotFound(folder_id.to_string())));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
