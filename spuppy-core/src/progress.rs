//! Byte-based progress bar for a single file upload.

use std::fmt;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str =
    "{percent:>3}%|{bar:40}| {bytes}/{total_bytes} [{elapsed_precise}<{eta_precise}, {bytes_per_sec}]";

/// Progress of one file, advanced by the upload client as bytes are sent.
///
/// Dropping an unfinished bar abandons it, so a failed upload leaves its last
/// position on screen and releases the terminal line.
pub struct UploadProgress {
    bar: ProgressBar,
}

impl fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadProgress")
            .field("position", &self.bar.position())
            .field("total", &self.bar.length())
            .finish()
    }
}

impl UploadProgress {
    /// A bar for a file of `total` bytes, drawn on stdout alongside the log lines.
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stdout());
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// A bar that tracks position but draws nothing.
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        Self { bar }
    }

    /// Moves the bar forward by `delta` bytes, never past the file size.
    pub fn advance(&self, delta: u64) {
        let total = self.bar.length().unwrap_or(u64::MAX);
        let next = self.bar.position().saturating_add(delta).min(total);
        self.bar.set_position(next);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn total(&self) -> u64 {
        self.bar.length().unwrap_or_default()
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl Drop for UploadProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
