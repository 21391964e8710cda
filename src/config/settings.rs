//! Configuration settings management
//!
//! This module handles loading runtime settings from defaults and
//! environment variables, and ties them to the persisted mount table.

use crate::config::mounts::{default_mounts_path, MountTable};
use crate::error::{AzfilesError, Result};
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

/// Largest range the service accepts in one write (4 MiB)
pub const MAX_RANGE_SIZE: u64 = 4 * 1024 * 1024;

/// Default upload chunk size
pub const DEFAULT_CHUNK_SIZE: u64 = 4_000_000;

/// Default write buffer for downloads
pub const DEFAULT_DOWNLOAD_BUFFER: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub debug: bool,
    pub chunk_size: NonZeroU64,
    pub download_buffer: usize,
    pub connect_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            chunk_size: NonZeroU64::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroU64::MIN),
            download_buffer: DEFAULT_DOWNLOAD_BUFFER,
            connect_timeout: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size.get() > MAX_RANGE_SIZE {
            return Err(AzfilesError::config(format!(
                "Chunk size {} exceeds the service limit of {} bytes",
                self.chunk_size, MAX_RANGE_SIZE
            )));
        }
        if self.download_buffer == 0 {
            return Err(AzfilesError::config("Download buffer must be positive"));
        }
        Ok(())
    }
}

/// Everything an invocation needs: settings, mounts and where they live
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub mounts: MountTable,
    pub mounts_path: PathBuf,
}

impl Config {
    /// Path of the mount file, honouring `AZFILES_CONFIG`
    pub fn get_config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("AZFILES_CONFIG") {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        default_mounts_path()
    }

    /// Persist the mount table back to where it was loaded from
    pub async fn save(&self) -> Result<()> {
        self.mounts.save(&self.mounts_path).await
    }
}

/// Runtime settings with priority: environment variables, then defaults
pub fn load_settings() -> Result<Settings> {
    let mut settings = Settings::default();
    load_from_env(&mut settings, |key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}

/// Bind settings to the mount table read from the config file
pub async fn load_config(settings: Settings) -> Result<Config> {
    let mounts_path = Config::get_config_path()?;
    let mounts = MountTable::load(&mounts_path).await?;

    Ok(Config {
        settings,
        mounts,
        mounts_path,
    })
}

fn load_from_env<F>(settings: &mut Settings, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = var("AZFILES_DEBUG") {
        settings.debug = value.eq_ignore_ascii_case("true") || value == "1";
    }

    if let Some(value) = var("AZFILES_CHUNK_SIZE") {
        settings.chunk_size = value
            .trim()
            .parse::<NonZeroU64>()
            .map_err(|e| AzfilesError::config(format!("AZFILES_CHUNK_SIZE '{value}': {e}")))?;
    }

    if let Some(value) = var("AZFILES_DOWNLOAD_BUFFER") {
        settings.download_buffer = value
            .trim()
            .parse::<usize>()
            .map_err(|e| AzfilesError::config(format!("AZFILES_DOWNLOAD_BUFFER '{value}': {e}")))?;
    }

    if let Some(value) = var("AZFILES_CONNECT_TIMEOUT") {
        let seconds = value
            .trim()
            .parse::<u64>()
            .map_err(|e| AzfilesError::config(format!("AZFILES_CONNECT_TIMEOUT '{value}': {e}")))?;
        settings.connect_timeout = Some(Duration::from_secs(seconds));
    }

    Ok(())
}
