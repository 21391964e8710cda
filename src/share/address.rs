//! Addressing: `mount:path` references, remote file resolution and URLs
//!
//! A reference names a mount and a path inside its share. A trailing `/`
//! marks it as a directory. When the reference does not pin down a file,
//! the file is derived later from a local path, either by appending the
//! local file name to the directory, or by mirroring the local path
//! relative to the current working directory.

use crate::config::mounts::{Mount, MountTable};
use crate::error::{AzfilesError, Result};
use crate::share::path::RemotePath;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

pub const MOUNT_SEPARATOR: char = ':';

/// Syntactic form of a reference, before the mount is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub mount_name: String,
    pub path: RemotePath,
    pub is_directory: bool,
    /// The path portion named a concrete file, not just the share root
    pub names_file: bool,
}

impl Reference {
    pub fn parse(reference: &str) -> Result<Self> {
        let (mount_name, path) = reference
            .split_once(MOUNT_SEPARATOR)
            .ok_or_else(|| AzfilesError::malformed_reference(reference))?;

        if mount_name.trim().is_empty() || path.contains(MOUNT_SEPARATOR) {
            return Err(AzfilesError::malformed_reference(reference));
        }

        let is_directory = reference.ends_with('/');
        let path = RemotePath::parse(path);
        if path.has_parent_reference() {
            return Err(AzfilesError::malformed_reference(reference));
        }
        let names_file = !is_directory && !path.is_root();

        Ok(Self {
            mount_name: mount_name.to_string(),
            path,
            is_directory,
            names_file,
        })
    }
}

/// A reference bound to its mount, plus the remote file once known
#[derive(Debug, Clone)]
pub struct RemoteLocation {
    pub mount_name: String,
    pub mount: Mount,
    pub is_directory: bool,
    pub declared_path: RemotePath,
    resolved_file: Option<RemotePath>,
}

impl RemoteLocation {
    /// Parse a reference and bind it to a mount from the table
    pub fn parse(reference: &str, mounts: &MountTable) -> Result<Self> {
        let reference = Reference::parse(reference)?;
        let mount = mounts.require(&reference.mount_name)?.clone();
        Ok(Self::new(reference, mount))
    }

    pub fn new(reference: Reference, mount: Mount) -> Self {
        let resolved_file = reference.names_file.then(|| reference.path.clone());
        Self {
            mount_name: reference.mount_name,
            mount,
            is_directory: reference.is_directory,
            declared_path: reference.path,
            resolved_file,
        }
    }

    pub fn resolved_file(&self) -> Option<&RemotePath> {
        self.resolved_file.as_ref()
    }

    /// The resolved file, or `UnresolvedPath`
    pub fn require_file(&self) -> Result<&RemotePath> {
        self.resolved_file
            .as_ref()
            .ok_or_else(|| AzfilesError::unresolved_path(self.to_string()))
    }

    /// Path to stat or delete: the file if known, else the declared path
    pub fn target_path(&self) -> &RemotePath {
        self.resolved_file.as_ref().unwrap_or(&self.declared_path)
    }

    /// Directory a bare `list` applies to: the reference's directory component
    pub fn list_path(&self) -> RemotePath {
        match &self.resolved_file {
            Some(file) if !self.is_directory => file.parent(),
            _ => self.declared_path.clone(),
        }
    }

    /// Derive the remote file from a local path, using the process cwd
    pub fn resolve_against_local(&mut self, local_path: &Path) -> Result<()> {
        let cwd = std::env::current_dir()?;
        self.resolve_against_local_in(local_path, &cwd)
    }

    /// Derive the remote file from a local path relative to `cwd`.
    ///
    /// No-op once the file is resolved. Directory references take the
    /// local file name; others mirror the local path below `cwd`.
    pub fn resolve_against_local_in(&mut self, local_path: &Path, cwd: &Path) -> Result<()> {
        if self.resolved_file.is_some() {
            return Ok(());
        }

        let local = absolute_lexical(local_path, cwd);

        let resolved = if self.is_directory {
            let name = local.file_name().ok_or_else(|| {
                AzfilesError::invalid_argument(format!(
                    "Local path '{}' has no file name",
                    local_path.display()
                ))
            })?;
            self.declared_path.join(&name.to_string_lossy())
        } else {
            let root = absolute_lexical(cwd, cwd);
            let relative = local.strip_prefix(&root).map_err(|_| {
                AzfilesError::PathOutsideWorkingDirectory {
                    local: local.display().to_string(),
                    cwd: root.display().to_string(),
                }
            })?;
            let components: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if components.is_empty() {
                return Err(AzfilesError::PathOutsideWorkingDirectory {
                    local: local.display().to_string(),
                    cwd: root.display().to_string(),
                });
            }
            RemotePath::from_components(components)
        };

        self.resolved_file = Some(resolved);
        Ok(())
    }

    /// URL of the resolved file with an optional extra query
    pub fn file_url(&self, extra_query: Option<&str>) -> Result<Url> {
        build_url(&self.mount, self.require_file()?, extra_query)
    }

    /// Local destination for a download: inside `local` when it is an
    /// existing directory, otherwise `local` itself
    pub fn local_target_path(&self, local: &Path) -> Result<PathBuf> {
        if local.is_dir() {
            let name = self
                .require_file()?
                .file_name()
                .ok_or_else(|| AzfilesError::unresolved_path(self.to_string()))?;
            Ok(local.join(name))
        } else {
            Ok(local.to_path_buf())
        }
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.mount_name, MOUNT_SEPARATOR, self.target_path())?;
        if self.is_directory && self.resolved_file.is_none() && !self.declared_path.is_root() {
            f.write_str("/")?;
        }
        Ok(())
    }
}

/// Build the protocol URL for `path` on `mount`.
///
/// `extra_query` (e.g. `restype=directory`) goes before the access token,
/// joined with `&`.
pub fn build_url(mount: &Mount, path: &RemotePath, extra_query: Option<&str>) -> Result<Url> {
    // the url crate drops `..` segments silently, which would address another file
    if path.has_parent_reference() {
        return Err(AzfilesError::malformed_reference(path.to_string()));
    }
    let mut url = Url::parse(&mount.endpoint_url())?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| AzfilesError::config(format!("Invalid endpoint '{}'", mount.endpoint_url())))?;
        segments.pop_if_empty();
        segments.push(&mount.share);
        for component in path.components() {
            segments.push(component);
        }
    }

    let token = mount.access_token.trim_start_matches('?');
    let query = match extra_query {
        Some(extra) if !extra.is_empty() && !token.is_empty() => format!("{extra}&{token}"),
        Some(extra) if !extra.is_empty() => extra.to_string(),
        _ => token.to_string(),
    };
    if !query.is_empty() {
        url.set_query(Some(&query));
    }
    Ok(url)
}

/// Make `path` absolute against `cwd` and fold `.`/`..` lexically
fn absolute_lexical(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
