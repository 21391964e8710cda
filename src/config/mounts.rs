//! Named mounts: the credential/location triples stored in the config file
//!
//! The file is a JSON object keyed by mount name. It is only ever read and
//! written as a whole; there is no locking, so two concurrent invocations
//! that both save can lose one update.

use crate::error::{AzfilesError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Credentials and location of one remote share
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub storage_account: String,
    pub share: String,
    #[serde(alias = "sas_token")]
    pub access_token: String,
    /// Overrides `https://<account>.file.core.windows.net`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Mount {
    pub fn new<S: Into<String>>(storage_account: S, share: S, access_token: S) -> Self {
        Self {
            storage_account: storage_account.into(),
            share: share.into(),
            access_token: access_token.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// First required field that is empty, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.storage_account.trim().is_empty() {
            Some("storage_account")
        } else if self.share.trim().is_empty() {
            Some("share")
        } else if self.access_token.trim().is_empty() {
            Some("access_token")
        } else {
            None
        }
    }

    /// Whether any field already carries a value
    pub fn is_populated(&self) -> bool {
        !self.storage_account.is_empty() || !self.share.is_empty() || !self.access_token.is_empty()
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        match self.missing_field() {
            Some(field) => Err(AzfilesError::invalid_mount(name, field)),
            None => Ok(()),
        }
    }

    /// Base service URL, without the share
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.file.core.windows.net", self.storage_account),
        }
    }
}

/// The persisted mount table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountTable {
    mounts: BTreeMap<String, Mount>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Mount> {
        self.mounts.get(name)
    }

    /// Look up a mount that must exist
    pub fn require(&self, name: &str) -> Result<&Mount> {
        self.mounts
            .get(name)
            .ok_or_else(|| AzfilesError::mount_not_found(name))
    }

    /// Insert or replace a mount, returning the previous entry
    pub fn insert<S: Into<String>>(&mut self, name: S, mount: Mount) -> Option<Mount> {
        self.mounts.insert(name.into(), mount)
    }

    pub fn remove(&mut self, name: &str) -> Option<Mount> {
        self.mounts.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Reject the table if any mount has an empty field
    pub fn validate(&self) -> Result<()> {
        for (name, mount) in &self.mounts {
            mount.validate(name)?;
        }
        Ok(())
    }

    /// Load the table from `path`; a missing file is an empty table
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            debug!("No mount file at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let contents = tokio::fs::read_to_string(path).await?;
        if contents.trim().is_empty() {
            return Ok(Self::new());
        }
        let table = serde_json::from_str::<Self>(&contents).map_err(|e| {
            AzfilesError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        debug!("Loaded {} mount(s) from {}", table.len(), path.display());
        Ok(table)
    }

    /// Validate and write the table to `path`, readable by the owner only
    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        let mut file = create_private(path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;

        debug!("Saved {} mount(s) to {}", self.len(), path.display());
        Ok(())
    }
}

/// Open `path` for writing, truncated and readable by the owner only.
///
/// A new file is created with mode 0600; an existing one is tightened
/// before anything is written to it.
#[cfg(unix)]
async fn create_private(path: &Path) -> Result<tokio::fs::File> {
    use std::os::unix::fs::PermissionsExt;
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600)).await?;
    Ok(file)
}

#[cfg(not(unix))]
async fn create_private(path: &Path) -> Result<tokio::fs::File> {
    Ok(tokio::fs::File::create(path).await?)
}

/// Default location of the mount file, `~/.azfiles.json`
pub fn default_mounts_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AzfilesError::config("Unable to determine home directory"))?;
    Ok(home.join(".azfiles.json"))
}
