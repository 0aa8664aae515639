//! FFprobe-based media probing.
//!
//! Invokes ffprobe against an input file requesting format- and stream-level
//! metadata as JSON, and parses it into a [`ProbeReport`]. Probe failure is
//! absence, not an error: callers must handle `None`.

use crate::command::{run_command, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed view of ffprobe's JSON output.
///
/// A pure read-only snapshot: created once per upload, consumed by the
/// classifier, then discarded. Unknown keys in the raw report are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub format: Option<ProbeFormat>,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

/// Container-level information.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProbeFormat {
    /// ffprobe's container label. May be a comma-joined alias list,
    /// e.g. "matroska,webm" or "mov,mp4,m4a,3gp,3g2,mj2".
    pub format_name: Option<String>,
    /// Duration in seconds, as a string.
    pub duration: Option<String>,
}

/// One stream entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProbeStream {
    pub codec_name: Option<String>,
    /// Conventionally "video", "audio", "data" or "subtitle".
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ProbeReport {
    /// The container label, or an empty string when ffprobe omitted it.
    pub fn format_name(&self) -> &str {
        self.format
            .as_ref()
            .and_then(|f| f.format_name.as_deref())
            .unwrap_or("")
    }

    /// Whether any stream has the given codec type.
    pub fn has_stream(&self, codec_type: &str) -> bool {
        self.streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some(codec_type))
    }

    /// Whether any audio stream uses the given codec.
    pub fn has_audio_codec(&self, codec: &str) -> bool {
        self.streams.iter().any(|s| {
            s.codec_type.as_deref() == Some("audio") && s.codec_name.as_deref() == Some(codec)
        })
    }
}

/// Probe a media file with ffprobe.
///
/// Returns `None` when ffprobe fails to run, exits non-zero, or produces
/// output that does not parse as the expected JSON shape. No error escapes.
pub async fn analyze(file_path: &Path, ffprobe_path: &Path) -> Option<ProbeReport> {
    let command = vec![
        ffprobe_path.to_string_lossy().into_owned(),
        "-hide_banner".to_string(),
        "-of".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        file_path.to_string_lossy().into_owned(),
    ];

    tracing::debug!("probing {}", file_path.display());
    let result = run_command(&command, DEFAULT_TIMEOUT_SECS).await;

    if !result.success {
        tracing::warn!(
            exit_code = result.exit_code,
            "ffprobe failed to read {}: {}",
            file_path.display(),
            result.stderr
        );
        return None;
    }

    match serde_json::from_str::<ProbeReport>(&result.stdout) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::warn!(
                "failed to parse ffprobe output for {}: {}",
                file_path.display(),
                e
            );
            None
        }
    }
}
