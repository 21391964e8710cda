//! Recursive directory tree operations
//!
//! The service only offers per-directory primitives, so creating a
//! nested path or removing a whole tree is done here one level at a time.

use crate::error::Result;
use crate::share::manager::ShareManager;
use crate::share::path::RemotePath;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info};

impl ShareManager {
    /// Make sure every ancestor directory of `file` exists.
    ///
    /// Walks upward from the immediate parent and stops at the first
    /// directory that exists (or the share root), then creates the missing
    /// ones root-first. Returns the directories created, in creation order.
    pub async fn ensure_parent_directories(&self, file: &RemotePath) -> Result<Vec<RemotePath>> {
        let mut missing = Vec::new();
        for dir in file.ancestors() {
            if self.client().directory_exists(&dir).await? {
                break;
            }
            missing.push(dir);
        }
        missing.reverse();

        for dir in &missing {
            info!("Creating directory {}", dir);
            self.client().create_directory(dir).await?;
        }
        Ok(missing)
    }

    /// Delete `dir` and everything below it, depth first.
    ///
    /// Subdirectories go before the files at each level and the directory
    /// itself goes last. An error stops the walk; whatever was already
    /// deleted stays deleted.
    pub fn remove_tree<'a>(&'a self, dir: &'a RemotePath) -> BoxFuture<'a, Result<()>> {
        async move {
            let listing = self.client().list_directory(dir).await?;
            debug!("Removing {} ({} entries)", dir, listing.len());

            for sub in listing.directories() {
                self.remove_tree(&sub.path).await?;
            }
            for file in listing.files() {
                self.client().delete_file(&file.path).await?;
            }

            self.client().delete_directory(dir).await?;
            info!("Deleted directory {}", dir);
            Ok(())
        }
        .boxed()
    }
}
