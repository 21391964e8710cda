//! Utility functions module
//!
//! Terminal interaction, HTTP client construction and timestamp handling.

pub mod datetime;
pub mod interactive;
pub mod network;

pub use network::*;
