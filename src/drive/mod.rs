//! Drive listing API client

pub mod client;
pub mod errors;
pub mod lister;
pub mod types;

pub use client::DriveClient;
pub use errors::DriveError;
pub use lister::{FolderLister, HealthStatus, UpstreamHealth};
pub use types::*;
