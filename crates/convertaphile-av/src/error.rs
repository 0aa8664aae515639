//! Error types for convertaphile-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the conversion pipeline.
///
/// Execution failures of the transcoder itself are not errors: they are
/// reported inside [`crate::ConversionResult`]. These variants cover the
/// steps before any command runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// ffprobe failed to read the file or produced unparseable output.
    #[error("could not read media metadata from {}", path.display())]
    ProbeFailed { path: PathBuf },

    /// The probe report matched no supported format.
    #[error("unsupported media: {}", path.display())]
    UnsupportedMedia { path: PathBuf },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }
}
