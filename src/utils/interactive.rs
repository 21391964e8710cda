//! Interactive input utilities for confirmations and transfer progress
//!
//! Destructive actions ask through the [`Confirm`] capability so the core
//! never talks to the terminal itself; `-y` swaps in [`AlwaysConfirm`].

use crate::error::{AzfilesError, Result};
use dialoguer::theme::ColorfulTheme;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Yes/no question asked before a destructive action
#[cfg_attr(test, mockall::automock)]
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompts on the terminal, defaulting to "no"
pub struct InteractiveConfirm {
    theme: ColorfulTheme,
}

impl InteractiveConfirm {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for InteractiveConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirm for InteractiveConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| AzfilesError::invalid_argument(format!("Failed to get user input: {e}")))
    }
}

/// Forced mode: every question is answered "yes" without prompting
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        tracing::debug!("Auto-confirmed: {}", prompt);
        Ok(true)
    }
}

/// Pick the confirmation capability for this invocation
pub fn confirmer(forced: bool) -> Box<dyn Confirm> {
    if forced {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(InteractiveConfirm::new())
    }
}

/// Byte progress for an upload, drawn only when stderr is a terminal
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    pub fn new(total: u64, label: &str) -> Self {
        let bar = if std::io::stderr().is_terminal() {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Record that `done` of `total` bytes have been written
    pub fn update(&self, done: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(done);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
