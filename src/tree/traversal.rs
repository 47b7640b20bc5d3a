//! Recursive folder traversal
//!
//! Builds a complete snapshot of a folder hierarchy from one-level listings.
//! Sibling subtrees are resolved concurrently; a folder's `children` is only
//! set once every one of its subtrees has resolved. The number of listing
//! calls in flight is capped by a semaphore shared with the caller.
//!
//! The upstream hierarchy is assumed to be a tree. Cycles are not detected.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::node::{sort_by_name, Node};
use crate::drive::{DriveError, FolderLister};

/// Result of a full traversal
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Children of the root, fully populated
    pub nodes: Vec<Node>,
    /// Folders whose listing failed and were emitted empty
    pub degraded_branches: usize,
    /// Upstream listing calls made
    pub listings: usize,
}

/// Outcome of listing one nested folder
enum Branch {
    Listed(Vec<Node>),
    Degraded(DriveError),
}

/// A single traversal over an upstream lister
pub struct Traversal {
    lister: Arc<dyn FolderLister>,
    permits: Arc<Semaphore>,
    listings: AtomicUsize,
    degraded: AtomicUsize,
}

impl Traversal {
    pub fn new(lister: Arc<dyn FolderLister>, permits: Arc<Semaphore>) -> Self {
        Self {
            lister,
            permits,
            listings: AtomicUsize::new(0),
            degraded: AtomicUsize::new(0),
        }
    }

    /// Traverse everything below `root_id`
    ///
    /// Fails only if the root itself cannot be listed. Nested failures are
    /// recorded on the affected folder and counted in the snapshot.
    pub async fn run(&self, root_id: &str) -> Result<Snapshot, DriveError> {
        let top = self.list(root_id).await?;
        let nodes = self.populate(top).await;

        let snapshot = Snapshot {
            degraded_branches: self.degraded.load(Ordering::Relaxed),
            listings: self.listings.load(Ordering::Relaxed),
            nodes,
        };

        info!(
            root_id = root_id,
            nodes = snapshot.nodes.iter().map(Node::subtree_len).sum::<usize>(),
            listings = snapshot.listings,
            degraded = snapshot.degraded_branches,
            "Traversal complete"
        );

        Ok(snapshot)
    }

    /// List one level below `folder_id` without recursing
    pub async fn shallow(&self, folder_id: &str) -> Result<Vec<Node>, DriveError> {
        self.list(folder_id).await
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<Node>, DriveError> {
        // the semaphore is never closed
        let _permit = self.permits.acquire().await.ok();
        self.listings.fetch_add(1, Ordering::Relaxed);

        let entries = self.lister.list_children(folder_id).await?;
        let mut nodes: Vec<Node> = entries.into_iter().map(Node::from_entry).collect();
        sort_by_name(&mut nodes);

        debug!(folder_id = folder_id, count = nodes.len(), "Listed folder");
        Ok(nodes)
    }

    fn populate(&self, nodes: Vec<Node>) -> BoxFuture<'_, Vec<Node>> {
        async move { join_all(nodes.into_iter().map(|node| self.resolve(node))).await }.boxed()
    }

    async fn resolve(&self, mut node: Node) -> Node {
        if !node.is_folder() {
            return node;
        }

        match self.branch(&node.id).await {
            Branch::Listed(children) => node.children = Some(children),
            Branch::Degraded(error) => {
                warn!(
                    folder_id = %node.id,
                    name = %node.name,
                    error = %error,
                    "Folder listing failed, emitting empty branch"
                );
                self.degraded.fetch_add(1, Ordering::Relaxed);
                node.children = Some(Vec::new());
                node.degraded = true;
            }
        }
        node
    }

    async fn branch(&self, folder_id: &str) -> Branch {
        match self.list(folder_id).await {
            Ok(children) => Branch::Listed(self.populate(children).await),
            Err(e) => Branch::Degraded(e),
        }
    }
}
