//! Configuration management module
//!
//! This module handles runtime settings, the persisted mount table and
//! the lifecycle that loads both at the process boundary.

pub mod mounts;
pub mod settings;

pub use mounts::*;
pub use settings::*;
