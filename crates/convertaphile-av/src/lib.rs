//! # convertaphile-av
//!
//! Media probing, format classification and ffmpeg command policy for the
//! convertaphile conversion service.
//!
//! The pipeline is a straight line of values:
//! probe ([`analyze`]) → classify ([`classify`]) → build
//! ([`policy::build_command`]) → execute ([`run_command`]). The first two
//! stages fail by absence, the last two never fail to produce a value —
//! only the external transcoder can report failure, inside the returned
//! [`ConversionResult`].
//!
//! ## Example
//!
//! ```no_run
//! use convertaphile_av::{convert, ToolPaths, DEFAULT_TIMEOUT_SECS};
//! use std::path::Path;
//!
//! # async fn demo() -> convertaphile_av::Result<()> {
//! let tools = ToolPaths::discover()?;
//! let result = convert(
//!     Path::new("upload.gif"),
//!     Path::new("out.jpeg"),
//!     &tools,
//!     DEFAULT_TIMEOUT_SECS,
//! )
//! .await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod command;
mod error;
pub mod policy;
pub mod probe;
pub mod tools;

// Re-exports
pub use classify::{classify, FormatFamily, MediaFormat};
pub use command::{run_command, ConversionResult, DEFAULT_TIMEOUT_SECS};
pub use error::{Error, Result};
pub use probe::{analyze, ProbeFormat, ProbeReport, ProbeStream};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};

use std::path::{Path, PathBuf};

/// Paths to the external executables the pipeline invokes.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    /// Resolve both tools from `$PATH`.
    pub fn discover() -> Result<Self> {
        Ok(Self {
            ffmpeg: tools::require_tool("ffmpeg")?,
            ffprobe: tools::require_tool("ffprobe")?,
        })
    }
}

/// Probe, classify, build and execute one conversion.
///
/// The target format is taken from `target`'s extension. Returns an error
/// only when the input cannot be probed or matches no supported format;
/// transcoder failure is carried inside the `Ok` result.
pub async fn convert(
    input: &Path,
    target: &Path,
    tools: &ToolPaths,
    timeout_secs: u64,
) -> Result<ConversionResult> {
    let report = probe::analyze(input, &tools.ffprobe)
        .await
        .ok_or_else(|| Error::ProbeFailed {
            path: input.to_path_buf(),
        })?;

    let fallback_ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let format = classify::classify(&report, &fallback_ext).ok_or_else(|| {
        tracing::warn!(
            format_name = report.format_name(),
            "unsupported input: {}",
            input.display()
        );
        Error::UnsupportedMedia {
            path: input.to_path_buf(),
        }
    })?;

    tracing::info!("detected {} source: {}", format, input.display());

    let command = policy::build_command(format, input, target, &tools.ffmpeg);
    tracing::debug!("running: {}", command.join(" "));

    let result = run_command(&command, timeout_secs).await;
    if result.success {
        tracing::info!("converted {} -> {}", input.display(), target.display());
    } else {
        tracing::error!(
            exit_code = result.exit_code,
            "conversion of {} failed: {}",
            input.display(),
            result.stderr
        );
    }
    Ok(result)
}
