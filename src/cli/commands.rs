//! CLI commands and argument parsing
//!
//! This module defines the command-line interface using clap: a remote
//! reference followed by the action to run against it.

use crate::config::mounts::Mount;
use crate::config::Config;
use crate::error::{AzfilesError, Result};
use crate::share::address::{Reference, RemoteLocation, MOUNT_SEPARATOR};
use crate::share::entry::{DirectoryEntry, DirectoryListing};
use crate::share::manager::{DeleteOutcome, ShareManager};
use crate::utils::interactive::{confirmer, Confirm, TransferProgress};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "azfiles")]
#[command(about = "Upload, download and manage files on Azure file shares")]
#[command(version, author)]
pub struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Remote reference, <mount>:<path>; a trailing '/' marks a directory
    pub reference: String,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// Upload a local file; a directory reference keeps the local file name
    Upload {
        /// Local file to upload
        local: PathBuf,
    },
    /// Download a remote file to a local path or into a local directory
    Download {
        /// Destination file or directory
        local: PathBuf,
    },
    /// List the entries of a remote directory
    List,
    /// Show the properties of a remote file or directory
    Props,
    /// Delete a remote file, or a directory with everything in it
    Delete,
    /// Store credentials for a mount (alias: add-mount)
    #[command(name = "add_mount", alias = "add-mount")]
    AddMount {
        /// Storage account name
        storage_account: String,
        /// File share name
        share: String,
        /// SAS token used to authorize requests
        access_token: String,
        /// Service endpoint, defaults to https://<account>.file.core.windows.net
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Forget a mount (alias: delete-mount)
    #[command(name = "delete_mount", alias = "delete-mount")]
    DeleteMount,
}

impl Cli {
    pub async fn execute(self, mut config: Config) -> Result<()> {
        let confirm = confirmer(self.yes);
        let Cli {
            reference, action, ..
        } = self;

        match action {
            Action::AddMount {
                storage_account,
                share,
                access_token,
                endpoint,
            } => {
                let mut mount = Mount::new(storage_account, share, access_token);
                if let Some(endpoint) = endpoint {
                    mount = mount.with_endpoint(endpoint);
                }
                execute_add_mount(&reference, mount, &mut config, confirm.as_ref()).await
            }
            Action::DeleteMount => execute_delete_mount(&reference, &mut config, confirm.as_ref()).await,
            action => {
                let mut location = RemoteLocation::parse(&reference, &config.mounts)?;
                let manager = ShareManager::for_mount(location.mount.clone(), &config.settings)?;
                execute_share_action(&manager, &mut location, action, confirm.as_ref()).await
            }
        }
    }
}

async fn execute_share_action(
    manager: &ShareManager,
    location: &mut RemoteLocation,
    action: Action,
    confirm: &dyn Confirm,
) -> Result<()> {
    match action {
        Action::Upload { local } => execute_upload(manager, location, &local).await,
        Action::Download { local } => execute_download(manager, location, &local).await,
        Action::List => {
            let listing = manager.list(location).await?;
            print!("{}", render_listing(&location.mount_name, &listing));
            Ok(())
        }
        Action::Props => {
            match manager.props(location).await? {
                Some(entry) => print!("{}", render_props(&entry)),
                None => println!("{location} does not exist"),
            }
            Ok(())
        }
        Action::Delete => {
            match manager.delete(location, confirm).await? {
                DeleteOutcome::NotFound => println!("{location} does not exist"),
                DeleteOutcome::Declined => println!("Delete operation cancelled."),
                DeleteOutcome::DeletedFile(path) => {
                    println!("Deleted file {}{}{}", location.mount_name, MOUNT_SEPARATOR, path)
                }
                DeleteOutcome::DeletedDirectory(path) => {
                    println!("Deleted directory {}{}{}/", location.mount_name, MOUNT_SEPARATOR, path)
                }
            }
            Ok(())
        }
        Action::AddMount { .. } | Action::DeleteMount => Err(AzfilesError::invalid_argument(
            "Mount actions do not operate on a share",
        )),
    }
}

async fn execute_upload(manager: &ShareManager, location: &mut RemoteLocation, local: &std::path::Path) -> Result<()> {
    let progress = TransferProgress::new(0, &local.display().to_string());
    let result = manager
        .upload(location, local, |done, total| progress.update(done, total))
        .await;
    progress.finish();

    let report = result?;
    for dir in &report.created_directories {
        println!("Created directory {}{}{}/", location.mount_name, MOUNT_SEPARATOR, dir);
    }
    println!(
        "Uploaded {} ({} bytes) to {}{}{}",
        local.display(),
        report.bytes,
        location.mount_name,
        MOUNT_SEPARATOR,
        report.remote
    );
    Ok(())
}

async fn execute_download(manager: &ShareManager, location: &mut RemoteLocation, local: &std::path::Path) -> Result<()> {
    let report = manager.download(location, local).await?;
    println!(
        "Downloaded {}{}{} ({} bytes) to {}",
        location.mount_name,
        MOUNT_SEPARATOR,
        report.remote,
        report.bytes,
        report.local.display()
    );
    Ok(())
}

/// Listing header `mount:/path/` followed by one canonical line per entry
pub fn render_listing(mount_name: &str, listing: &DirectoryListing) -> String {
    let mut out = if listing.path.is_root() {
        format!("{mount_name}{MOUNT_SEPARATOR}/\n")
    } else {
        format!("{mount_name}{MOUNT_SEPARATOR}{}/\n", listing.path)
    };
    for entry in listing.entries() {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

/// Canonical field-name header followed by the entry line
pub fn render_props(entry: &DirectoryEntry) -> String {
    format!("{}\n{}\n", DirectoryEntry::header(), entry)
}

/// Mount name from a `mount:` reference; a bare name is accepted too
fn mount_name(reference: &str) -> Result<String> {
    if reference.contains(MOUNT_SEPARATOR) {
        return Ok(Reference::parse(reference)?.mount_name);
    }
    if reference.trim().is_empty() {
        return Err(AzfilesError::malformed_reference(reference));
    }
    Ok(reference.to_string())
}

async fn execute_add_mount(reference: &str, mount: Mount, config: &mut Config, confirm: &dyn Confirm) -> Result<()> {
    let name = mount_name(reference)?;
    mount.validate(&name)?;

    let overwrite = config.mounts.get(&name).is_some_and(Mount::is_populated);
    if overwrite && !confirm.confirm(&format!("Mount '{name}' already exists. Overwrite it?"))? {
        println!("Mount '{name}' left unchanged.");
        return Ok(());
    }

    config.mounts.insert(name.clone(), mount);
    config.save().await?;
    println!("Mount '{}' saved to {}", name, config.mounts_path.display());
    Ok(())
}

async fn execute_delete_mount(reference: &str, config: &mut Config, confirm: &dyn Confirm) -> Result<()> {
    let name = mount_name(reference)?;
    config.mounts.require(&name)?;

    if !confirm.confirm(&format!("Delete mount '{name}'?"))? {
        println!("Mount '{name}' left unchanged.");
        return Ok(());
    }

    config.mounts.remove(&name);
    config.save().await?;
    println!("Mount '{name}' deleted");
    Ok(())
}
