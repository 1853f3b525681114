//! Per-run document chat state
//!
//! Everything here lives in memory for the lifetime of the process and is
//! owned by the `App`. Nothing is written to disk.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// A single transcript entry. Never modified after it is pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::User }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::Bot }
    }
}

/// A file picked in the upload form. Bytes are read at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub size: u64,
}

impl SelectedFile {
    /// Resolve a path typed by the user into a selection.
    pub fn from_input(input: &str) -> Result<Self, InputError> {
        let path = expand_home(input.trim());
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Self { path, size: meta.len() }),
            _ => Err(InputError::FileNotFound(path)),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string())
    }

    /// Human readable size, e.g. "1.4 MB"
    pub fn display_size(&self) -> String {
        const KB: f64 = 1024.0;
        let bytes = self.size as f64;
        if bytes < KB {
            format!("{} B", self.size)
        } else if bytes < KB * KB {
            format!("{:.1} KB", bytes / KB)
        } else {
            format!("{:.1} MB", bytes / (KB * KB))
        }
    }
}

fn expand_home(input: &str) -> PathBuf {
    if input == "~" || input.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return match input.strip_prefix("~/") {
                Some(rest) => home.join(rest),
                None => home,
            };
        }
    }
    Path::new(input).to_path_buf()
}

/// Problems with what the user entered. The message is shown verbatim in an alert.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Please select a PDF file")]
    NoFileSelected,
    #[error("Please enter a question")]
    EmptyQuestion,
    #[error("Upload a PDF first")]
    NoDocument,
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
