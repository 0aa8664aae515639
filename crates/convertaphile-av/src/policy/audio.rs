//! Audio command policy.
//!
//! The target table serves both video-to-audio and audio-to-audio
//! conversions. Every audio target ends with `-vn`: the video stream is
//! disabled explicitly even when the source has none, so the behavior is
//! uniform across families.

use super::{default_args, push_args};

/// Audio target extensions covered by the flag table.
pub(crate) const AUDIO_TARGETS: [&str; 6] = ["mp3", "aac", "wav", "flac", "ogg", "m4a"];

pub(crate) fn is_audio_target(ext: &str) -> bool {
    AUDIO_TARGETS.contains(&ext)
}

/// Encoder/quality flags for one audio target. Callers guarantee
/// `target_ext` is in [`AUDIO_TARGETS`].
pub(crate) fn audio_target_args(command: &mut Vec<String>, target_ext: &str) {
    match target_ext {
        "mp3" => push_args(command, &["-c:a", "libmp3lame", "-b:a", "192k"]),
        "aac" => push_args(command, &["-c:a", "aac", "-b:a", "192k"]),
        "wav" => push_args(command, &["-c:a", "pcm_s16le"]),
        "flac" => push_args(command, &["-c:a", "flac"]),
        "ogg" => push_args(command, &["-c:a", "libvorbis", "-q:a", "5"]),
        // M4A carries AAC.
        "m4a" => push_args(command, &["-c:a", "aac", "-b:a", "192k"]),
        _ => {}
    }
    push_args(command, &["-vn"]);
}

/// Policy for audio sources: the target table when it applies, otherwise
/// the default invocation.
pub(crate) fn audio_source_args(command: &mut Vec<String>, target_ext: &str) {
    if is_audio_target(target_ext) {
        audio_target_args(command, target_ext);
    } else {
        tracing::warn!(
            "no codec override for .{} from an audio source; attempting default conversion",
            target_ext
        );
        default_args(command, target_ext);
    }
}
