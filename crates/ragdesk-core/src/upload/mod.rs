//! Upload task domain module.
//!
//! Status records reported by the backend for a background ingestion task.

use serde::{Deserialize, Serialize};

/// File extensions the backend accepts for ingestion.
pub const SUPPORTED_UPLOAD_EXTENSIONS: [&str; 3] = ["pdf", "md", "zip"];

/// Checks the file name against [`SUPPORTED_UPLOAD_EXTENSIONS`], ignoring case.
pub fn is_supported_upload(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_UPLOAD_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Lifecycle of a background ingestion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// File stored, task queued.
    Uploaded,
    /// Task is running.
    Processing,
    /// Task finished successfully (terminal).
    Done,
    /// Task failed (terminal).
    Failed,
}

impl UploadStatus {
    /// Returns true for `done` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Status record returned by `GET /upload/status/{task_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatusInfo {
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UploadStatusInfo {
    pub fn new(status: UploadStatus) -> Self {
        Self {
            status,
            message: None,
            progress: None,
            task_id: None,
            filename: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    /// Terminal record synthesized when the backend does not know the task.
    pub fn not_found() -> Self {
        Self::new(UploadStatus::Failed)
            .with_message("not found")
            .with_progress(0)
    }

    /// Terminal record synthesized when polling gives up.
    pub fn timeout(last_progress: u8) -> Self {
        Self::new(UploadStatus::Failed)
            .with_message("timeout")
            .with_progress(last_progress)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Progress clamped to 0..=100, zero when unknown.
    pub fn progress_or_zero(&self) -> u8 {
        self.progress.unwrap_or(0).min(100)
    }

    /// Human-readable one-line rendering used by progress messages.
    pub fn describe(&self) -> String {
        let label = match self.status {
            UploadStatus::Uploaded => "Uploaded, waiting to be processed",
            UploadStatus::Processing => "Processing",
            UploadStatus::Done => "Done",
            UploadStatus::Failed => "Failed",
        };
        match (&self.message, self.progress) {
            (Some(message), Some(progress)) => format!("{label} ({progress}%): {message}"),
            (Some(message), None) => format!("{label}: {message}"),
            (None, Some(progress)) => format!("{label} ({progress}%)"),
            (None, None) => label.to_string(),
        }
    }
}
