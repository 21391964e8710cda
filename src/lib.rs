//! azfiles - Azure file share client
//!
//! Maps `mount:path` references onto File REST requests, uploads in
//! bounded ranges and walks remote directory trees.

pub mod cli;
pub mod config;
pub mod error;
pub mod share;
pub mod utils;

// Re-export commonly used types
pub use error::{AzfilesError, Result};
