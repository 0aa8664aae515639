//! Video-container command policy.
//!
//! One lookup table shared by every video container source. A target equal
//! to the source's own container has no entry and falls through to the
//! default invocation, as does any extension the table does not know.

use super::audio::{audio_target_args, is_audio_target};
use super::{default_args, push_args};
use crate::classify::MediaFormat;

pub(crate) fn video_args(command: &mut Vec<String>, source: MediaFormat, target_ext: &str) {
    if target_ext == source.extension() {
        tracing::warn!(
            "no codec override for .{} from a {} source; attempting default conversion",
            target_ext,
            source
        );
        default_args(command, target_ext);
        return;
    }

    match target_ext {
        // H.264 + AAC for the MP4-family containers.
        "mp4" | "mov" | "mkv" => {
            push_args(command, &["-c:v", "libx264", "-c:a", "aac", "-crf", "23", "-b:a", "128k"]);
        }
        "webm" => {
            // VP8; CRF range is 4-63 and lower is better quality.
            push_args(
                command,
                &["-c:v", "libvpx", "-c:a", "libopus", "-crf", "10", "-b:a", "128k"],
            );
        }
        "avi" => {
            // MPEG-4 part 2 (DivX/Xvid compatible) with MP3 audio.
            push_args(
                command,
                &["-c:v", "mpeg4", "-c:a", "libmp3lame", "-b:v", "1M", "-b:a", "128k"],
            );
        }
        "wmv" => {
            push_args(
                command,
                &["-c:v", "wmv2", "-c:a", "wmav2", "-b:v", "1M", "-b:a", "128k"],
            );
        }
        ext if is_audio_target(ext) => {
            audio_target_args(command, ext);
        }
        other => {
            tracing::warn!(
                "no codec override for .{} when converting from {}; attempting default conversion",
                other,
                source
            );
            default_args(command, other);
        }
    }
}
