//! Share manager for file operations on one mount
//!
//! This module provides the `ShareManager` struct and the operations a
//! single reference supports: upload, download, list, props and delete.
//! The recursive tree walks live in `operations.rs`.

use crate::config::mounts::Mount;
use crate::config::settings::Settings;
use crate::error::{AzfilesError, Result};
use crate::share::address::RemoteLocation;
use crate::share::chunk::plan;
use crate::share::client::ShareClient;
use crate::share::entry::{DirectoryEntry, DirectoryListing, EntryKind};
use crate::share::path::RemotePath;
use crate::share::transport::{ReqwestTransport, Transport};
use crate::utils::interactive::Confirm;
use crate::utils::network::NetworkConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a completed upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub remote: RemotePath,
    pub bytes: u64,
    pub ranges_written: usize,
    pub created_directories: Vec<RemotePath>,
}

/// Result of a completed download
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadReport {
    pub remote: RemotePath,
    pub local: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    NotFound,
    Declined,
    DeletedFile(RemotePath),
    DeletedDirectory(RemotePath),
}

/// Core share manager
pub struct ShareManager {
    client: ShareClient,
    settings: Settings,
}

impl ShareManager {
    pub fn new(client: ShareClient, settings: Settings) -> Self {
        Self { client, settings }
    }

    /// Manager for `mount` over the production HTTP transport
    pub fn for_mount(mount: Mount, settings: &Settings) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&NetworkConfig::from(settings))?);
        Ok(Self::new(ShareClient::new(transport, mount), settings.clone()))
    }

    pub fn client(&self) -> &ShareClient {
        &self.client
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Upload a local regular file.
    ///
    /// Missing parent directories are created first, then the remote file
    /// is cleared to the source size and written range by range in
    /// ascending order. `progress` receives `(bytes_written, total)` after
    /// every range. Any failure aborts and leaves the remote file partial.
    pub async fn upload<F>(&self, location: &mut RemoteLocation, local: &Path, mut progress: F) -> Result<UploadReport>
    where
        F: FnMut(u64, u64),
    {
        let metadata = tokio::fs::metadata(local).await?;
        if !metadata.is_file() {
            return Err(AzfilesError::invalid_argument(format!(
                "'{}' is not a regular file",
                local.display()
            )));
        }

        location.resolve_against_local(local)?;
        let remote = location.require_file()?.clone();

        let created_directories = self.ensure_parent_directories(&remote).await?;

        let size = metadata.len();
        self.client.clear_file(&remote, size).await?;

        let mut written = 0u64;
        let mut ranges_written = 0usize;
        progress(0, size);
        for range in plan(size, self.settings.chunk_size) {
            if range.is_empty() {
                continue;
            }
            debug!("Writing {}{}", remote, range);
            self.client.write_range(&remote, range, local).await?;
            written += range.len();
            ranges_written += 1;
            progress(written, size);
        }

        info!("Uploaded {} bytes to {}", written, remote);
        Ok(UploadReport {
            remote,
            bytes: written,
            ranges_written,
            created_directories,
        })
    }

    /// Download the referenced file to `local` (or into it, when it is a directory)
    pub async fn download(&self, location: &mut RemoteLocation, local: &Path) -> Result<DownloadReport> {
        location.resolve_against_local(local)?;
        let remote = location.require_file()?.clone();
        let dest = location.local_target_path(local)?;

        let bytes = self
            .client
            .download(&remote, &dest, self.settings.download_buffer)
            .await?;
        info!("Downloaded {} bytes from {} to {}", bytes, remote, dest.display());
        Ok(DownloadReport {
            remote,
            local: dest,
            bytes,
        })
    }

    /// List the reference's directory component
    pub async fn list(&self, location: &RemoteLocation) -> Result<DirectoryListing> {
        self.client.list_directory(&location.list_path()).await
    }

    /// Properties of the referenced entry, `None` when nothing is there.
    ///
    /// Directory-shaped references are looked up as a directory first.
    pub async fn props(&self, location: &RemoteLocation) -> Result<Option<DirectoryEntry>> {
        let path = location.target_path();
        let order = if location.is_directory {
            [EntryKind::Directory, EntryKind::File]
        } else {
            [EntryKind::File, EntryKind::Directory]
        };

        for kind in order {
            let entry = match kind {
                EntryKind::File => self.client.stat_file(path).await?,
                EntryKind::Directory => self.client.stat_directory(path).await?,
            };
            if entry.is_some() {
                return Ok(entry);
            }
        }
        Ok(None)
    }

    /// Delete the referenced file, or directory tree, after confirmation
    pub async fn delete(&self, location: &RemoteLocation, confirm: &dyn Confirm) -> Result<DeleteOutcome> {
        let path = location.target_path().clone();
        if path.is_root() {
            return Err(AzfilesError::invalid_argument(format!(
                "Refusing to delete the root of share '{}'",
                self.client.mount().share
            )));
        }

        let Some(entry) = self.props(location).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        match entry.kind {
            EntryKind::Directory => {
                let prompt = format!("Delete directory {location} and everything in it?");
                if !confirm.confirm(&prompt)? {
                    return Ok(DeleteOutcome::Declined);
                }
                self.remove_tree(&path).await?;
                Ok(DeleteOutcome::DeletedDirectory(path))
            }
            EntryKind::File => {
                if !confirm.confirm(&format!("Delete file {location}?"))? {
                    return Ok(DeleteOutcome::Declined);
                }
                self.client.delete_file(&path).await?;
                info!("Deleted file {}", path);
                Ok(DeleteOutcome::DeletedFile(path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::mounts::MountTable;
    use crate::share::address::Reference;
    use crate::share::testing::FakeShare;
    use crate::utils::interactive::MockConfirm;
    use std::num::NonZeroU64;
    use tempfile::TempDir;

    fn manager(share: &Arc<FakeShare>, chunk_size: u64) -> ShareManager {
        let settings = Settings {
            chunk_size: NonZeroU64::new(chunk_size).unwrap(),
            ..Settings::default()
        };
        ShareManager::new(ShareClient::new(share.clone(), FakeShare::mount()), settings)
    }

    fn location(reference: &str) -> RemoteLocation {
        let mut mounts = MountTable::new();
        mounts.insert("data", FakeShare::mount());
        RemoteLocation::parse(reference, &mounts).unwrap()
    }

    fn confirm_with(answer: bool, times: usize) -> MockConfirm {
        let mut mock = MockConfirm::new();
        mock.expect_confirm().times(times).returning(move |_| Ok(answer));
        mock
    }

    #[tokio::test]
    async fn test_upload_seven_million_bytes_in_two_ranges() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("big.bin");
        let content: Vec<u8> = (0..7_000_000u32).map(|i| (i % 253) as u8).collect();
        std::fs::write(&source, &content).unwrap();

        let share = Arc::new(FakeShare::new());
        let manager = manager(&share, 4_000_000);
        let mut loc = location("data:/big.bin");

        let mut seen = Vec::new();
        let report = manager
            .upload(&mut loc, &source, |done, total| seen.push((done, total)))
            .await
            .unwrap();

        assert_eq!(report.bytes, 7_000_000);
        assert_eq!(report.ranges_written, 2);
        assert!(report.created_directories.is_empty());
        assert_eq!(seen.last(), Some(&(7_000_000, 7_000_000)));

        let puts: Vec<_> = share.requests().into_iter().filter(|r| r.method == "PUT").collect();
        assert_eq!(puts.len(), 3);
        assert_eq!(puts[0].query, None);
        assert_eq!(puts[1].range.as_deref(), Some("bytes=0-3999999"));
        assert_eq!(puts[1].body_len, 4_000_000);
        assert_eq!(puts[2].range.as_deref(), Some("bytes=4000000-6999999"));
        assert_eq!(puts[2].body_len, 3_000_000);
        assert_eq!(share.file_content("/big.bin").unwrap(), content);
    }

    #[tokio::test]
    async fn test_upload_creates_missing_parents_root_first() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("report.csv");
        std::fs::write(&source, b"a,b\n1,2\n").unwrap();

        let share = Arc::new(FakeShare::new());
        share.add_directory("/backups");
        let manager = manager(&share, 4_000_000);
        let mut loc = location("data:/backups/2024/q1/");

        let report = manager.upload(&mut loc, &source, |_, _| {}).await.unwrap();

        assert_eq!(report.remote, RemotePath::parse("/backups/2024/q1/report.csv"));
        assert_eq!(
            report.created_directories,
            vec![RemotePath::parse("/backups/2024"), RemotePath::parse("/backups/2024/q1")]
        );
        assert_eq!(share.file_content("/backups/2024/q1/report.csv").unwrap(), b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_upload_empty_file_writes_no_ranges() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty");
        std::fs::write(&source, b"").unwrap();

        let share = Arc::new(FakeShare::new());
        let manager = manager(&share, 4_000_000);
        let mut loc = location("data:/empty");

        let report = manager.upload(&mut loc, &source, |_, _| {}).await.unwrap();
        assert_eq!(report.ranges_written, 0);
        assert_eq!(share.file_content("/empty").unwrap(), Vec::<u8>::new());
        assert!(share.requests().iter().all(|r| r.range.is_none()));
    }

    #[tokio::test]
    async fn test_upload_rejects_directory_source_before_any_request() {
        let dir = TempDir::new().unwrap();
        let share = Arc::new(FakeShare::new());
        let manager = manager(&share, 4_000_000);
        let mut loc = location("data:/x");

        let result = manager.upload(&mut loc, dir.path(), |_, _| {}).await;
        assert!(matches!(result, Err(AzfilesError::InvalidArgument(_))));
        assert!(share.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upload_stops_at_failed_range() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("f");
        std::fs::write(&source, vec![1u8; 300]).unwrap();

        let share = Arc::new(FakeShare::new());
        let manager = manager(&share, 100);
        let mut loc = location("data:/f");
        share.fail_range_at(100, 500, "ServerBusy");

        let mut progress = Vec::new();
        let err = manager
            .upload(&mut loc, &source, |done, _| progress.push(done))
            .await
            .unwrap_err();

        match err {
            AzfilesError::ProtocolError { status, body, .. } => {
                assert_eq!(status, 500);
                assert!(body.contains("ServerBusy"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        let ranges: Vec<_> = share.requests().into_iter().filter_map(|r| r.range).collect();
        assert_eq!(ranges, vec!["bytes=0-99", "bytes=100-199"]);
        assert_eq!(progress, vec![0, 100]);
    }

    #[tokio::test]
    async fn test_download_into_existing_directory() {
        let dir = TempDir::new().unwrap();
        let share = Arc::new(FakeShare::new());
        share.add_file("/docs/readme.txt", b"hello");
        let manager = manager(&share, 4_000_000);
        let mut loc = location("data:/docs/readme.txt");

        let report = manager.download(&mut loc, dir.path()).await.unwrap();
        assert_eq!(report.local, dir.path().join("readme.txt"));
        assert_eq!(report.bytes, 5);
        assert_eq!(std::fs::read(dir.path().join("readme.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_download_directory_reference_uses_local_name() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("readme.txt");
        let share = Arc::new(FakeShare::new());
        share.add_file("/docs/readme.txt", b"hello");
        let manager = manager(&share, 4_000_000);
        let mut loc = location("data:/docs/");

        let report = manager.download(&mut loc, &dest).await.unwrap();
        assert_eq!(report.remote, RemotePath::parse("/docs/readme.txt"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_list_uses_directory_component() {
        let share = Arc::new(FakeShare::new());
        share.add_file("/docs/a.txt", b"a");
        share.add_file("/docs/b.txt", b"bb");
        let manager = manager(&share, 4_000_000);

        let listing = manager.list(&location("data:/docs/")).await.unwrap();
        assert_eq!(listing.path, RemotePath::parse("/docs"));
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.get("b.txt").unwrap().size, Some(2));

        let listing = manager.list(&location("data:/docs/a.txt")).await.unwrap();
        assert_eq!(listing.path, RemotePath::parse("/docs"));
    }

    #[tokio::test]
    async fn test_props_lookup_order_follows_reference_shape() {
        let share = Arc::new(FakeShare::new());
        share.add_directory("/docs");
        let manager = manager(&share, 4_000_000);

        let entry = manager.props(&location("data:/docs/")).await.unwrap().unwrap();
        assert_eq!(entry.kind, EntryKind::Directory);
        assert_eq!(share.requests().len(), 1);
        assert_eq!(share.requests()[0].query.as_deref(), Some("restype=directory"));

        share.clear_requests();
        let entry = manager.props(&location("data:/docs")).await.unwrap().unwrap();
        assert_eq!(entry.kind, EntryKind::Directory);
        let queries: Vec<_> = share.requests().into_iter().map(|r| r.query).collect();
        assert_eq!(queries, vec![None, Some("restype=directory".to_string())]);

        share.clear_requests();
        assert!(manager.props(&location("data:/nothing")).await.unwrap().is_none());
        assert_eq!(share.requests().len(), 2);
    }

    fn unchecked_location(path: &str) -> RemoteLocation {
        let reference = Reference {
            mount_name: "data".to_string(),
            path: RemotePath::parse(path),
            is_directory: false,
            names_file: true,
        };
        RemoteLocation::new(reference, FakeShare::mount())
    }

    #[tokio::test]
    async fn test_delete_refuses_parent_components() {
        let share = Arc::new(FakeShare::new());
        share.add_file("/x/y.txt", b"nested");
        share.add_file("/y.txt", b"top");
        let manager = manager(&share, 4_000_000);
        let confirm = confirm_with(true, 0);

        let mut mounts = MountTable::new();
        mounts.insert("data", FakeShare::mount());
        assert!(matches!(
            RemoteLocation::parse("data:/x/../y.txt", &mounts),
            Err(AzfilesError::MalformedReference(_))
        ));

        let err = manager
            .delete(&unchecked_location("/x/../y.txt"), &confirm)
            .await
            .unwrap_err();
        assert!(matches!(err, AzfilesError::MalformedReference(_)));
        assert!(share.requests().is_empty());
        assert_eq!(share.file_content("/x/y.txt").as_deref(), Some(&b"nested"[..]));
        assert_eq!(share.file_content("/y.txt").as_deref(), Some(&b"top"[..]));
    }

    #[tokio::test]
    async fn test_props_refuses_parent_components() {
        let share = Arc::new(FakeShare::new());
        share.add_file("/x/y.txt", b"nested");
        let manager = manager(&share, 4_000_000);

        let err = manager.props(&unchecked_location("/x/../y.txt")).await.unwrap_err();
        assert!(matches!(err, AzfilesError::MalformedReference(_)));
        assert!(share.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_target_is_not_an_error() {
        let share = Arc::new(FakeShare::new());
        let manager = manager(&share, 4_000_000);
        let confirm = confirm_with(true, 0);

        let outcome = manager.delete(&location("data:/nope"), &confirm).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_delete_declined_is_a_noop() {
        let share = Arc::new(FakeShare::new());
        share.add_file("/f.txt", b"x");
        let manager = manager(&share, 4_000_000);
        let confirm = confirm_with(false, 1);

        let outcome = manager.delete(&location("data:/f.txt"), &confirm).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert!(share.file_content("/f.txt").is_some());
        assert!(share.requests().iter().all(|r| r.method != "DELETE"));
    }

    #[tokio::test]
    async fn test_delete_file_after_confirmation() {
        let share = Arc::new(FakeShare::new());
        share.add_file("/f.txt", b"x");
        let manager = manager(&share, 4_000_000);
        let mut confirm = MockConfirm::new();
        confirm
            .expect_confirm()
            .withf(|prompt| prompt == "Delete file data:/f.txt?")
            .times(1)
            .returning(|_| Ok(true));

        let outcome = manager.delete(&location("data:/f.txt"), &confirm).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::DeletedFile(RemotePath::parse("/f.txt")));
        assert!(share.file_content("/f.txt").is_none());
    }

    #[tokio::test]
    async fn test_delete_directory_removes_tree() {
        let share = Arc::new(FakeShare::new());
        share.add_file("/d/a.txt", b"a");
        share.add_file("/d/sub/b.txt", b"b");
        let manager = manager(&share, 4_000_000);
        let confirm = confirm_with(true, 1);

        let outcome = manager.delete(&location("data:/d/"), &confirm).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::DeletedDirectory(RemotePath::parse("/d")));
        assert!(!share.has_directory("/d"));
        assert!(share.file_content("/d/sub/b.txt").is_none());
    }

    #[tokio::test]
    async fn test_delete_share_root_is_refused() {
        let share = Arc::new(FakeShare::new());
        let manager = manager(&share, 4_000_000);
        let confirm = confirm_with(true, 0);

        let result = manager.delete(&location("data:/"), &confirm).await;
        assert!(matches!(result, Err(AzfilesError::InvalidArgument(_))));
        assert!(share.requests().is_empty());
    }
}
