//! Per-format ffmpeg command construction.
//!
//! Every handler produces a complete argv: the ffmpeg path first, `-i` and
//! the source next, codec/quality flags in the middle, the target path last.
//! Building never fails — a target with no override for its source family
//! falls back to the default `-i input output` invocation (with a warning)
//! and lets ffmpeg pick codecs from the output extension.

mod audio;
mod photo;
mod video;

pub use photo::SINGLE_FRAME_TARGETS;

use crate::classify::{FormatFamily, MediaFormat};
use std::path::Path;

/// Build the ffmpeg invocation converting `source` (a file of format
/// `format`) into `target`.
pub fn build_command(
    format: MediaFormat,
    source: &Path,
    target: &Path,
    ffmpeg_path: &Path,
) -> Vec<String> {
    let target_ext = extension_of(target);
    let mut command = vec![
        ffmpeg_path.to_string_lossy().into_owned(),
        "-i".to_string(),
        source.to_string_lossy().into_owned(),
    ];

    match format.family() {
        FormatFamily::Photo if format == MediaFormat::Gif => {
            photo::gif_args(&mut command, &target_ext)
        }
        FormatFamily::Photo => default_args(&mut command, &target_ext),
        FormatFamily::Video => video::video_args(&mut command, format, &target_ext),
        FormatFamily::Audio => audio::audio_source_args(&mut command, &target_ext),
    }

    command.push(target.to_string_lossy().into_owned());
    command
}

/// Default policy: no flags at all, except the universal AVIF override.
/// ffmpeg infers the output format from the target extension.
pub(crate) fn default_args(command: &mut Vec<String>, target_ext: &str) {
    if target_ext == "avif" {
        avif_args(command);
    }
}

/// ffmpeg's default encoder selection for .avif is unreliable; force the
/// AV1 encoder, a fixed quality and an explicit pixel format.
pub(crate) fn avif_args(command: &mut Vec<String>) {
    push_args(command, &["-c:v", "libaom-av1", "-crf", "23", "-pix_fmt", "yuv420p"]);
}

pub(crate) fn push_args(command: &mut Vec<String>, args: &[&str]) {
    command.extend(args.iter().map(|s| s.to_string()));
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const FFMPEG: &str = "/usr/bin/ffmpeg";

    /// Every extension the service accepts as a conversion target.
    const TARGETS: [&str; 20] = [
        "jpg", "jpeg", "png", "webp", "gif", "avif", "bmp", "tiff", "mp4", "mkv", "mov", "avi",
        "webm", "wmv", "mp3", "aac", "flac", "m4a", "ogg", "wav",
    ];

    fn build(format: MediaFormat, target_ext: &str) -> Vec<String> {
        let source = PathBuf::from(format!("/tmp/in.{}", format.extension()));
        let target = PathBuf::from(format!("/tmp/out.{}", target_ext));
        build_command(format, &source, &target, Path::new(FFMPEG))
    }

    #[test]
    fn every_pair_is_well_formed() {
        for format in MediaFormat::ALL {
            for target_ext in TARGETS {
                if target_ext == format.extension() {
                    continue;
                }
                let command = build(format, target_ext);
                assert_eq!(command[0], FFMPEG, "{format} -> {target_ext}");
                assert_eq!(
                    command.iter().filter(|a| a.as_str() == "-i").count(),
                    1,
                    "{format} -> {target_ext}"
                );
                assert_eq!(command[1], "-i");
                assert_eq!(
                    command.last().map(String::as_str),
                    Some(format!("/tmp/out.{target_ext}").as_str()),
                    "{format} -> {target_ext}"
                );
            }
        }
    }

    #[test]
    fn avif_target_forces_av1_for_every_source() {
        for format in MediaFormat::ALL {
            let command = build(format, "avif");
            assert!(
                command.iter().any(|a| a == "libaom-av1"),
                "{format} -> avif missing encoder"
            );
            assert!(
                command.iter().any(|a| a == "-pix_fmt"),
                "{format} -> avif missing pixel format"
            );
        }
    }

    #[test]
    fn gif_to_single_image_limits_frames() {
        for target_ext in SINGLE_FRAME_TARGETS {
            let command = build(MediaFormat::Gif, target_ext);
            let frames_pos = command
                .iter()
                .position(|a| a == "-frames:v")
                .unwrap_or_else(|| panic!("gif -> {target_ext} missing -frames:v"));
            let input_pos = command.iter().position(|a| a == "-i").unwrap();
            assert!(frames_pos > input_pos);
            assert!(frames_pos < command.len() - 1);
            assert_eq!(command[frames_pos + 1], "1");
        }
    }

    #[test]
    fn gif_to_multi_frame_target_keeps_all_frames() {
        for target_ext in ["mp4", "webm", "gif"] {
            let command = build(MediaFormat::Gif, target_ext);
            assert!(
                !command.iter().any(|a| a == "-frames:v"),
                "gif -> {target_ext} must not limit frames"
            );
        }
    }

    #[test]
    fn gif_to_avif_gets_both_overrides() {
        let command = build(MediaFormat::Gif, "avif");
        assert!(command.iter().any(|a| a == "-frames:v"));
        assert!(command.iter().any(|a| a == "libaom-av1"));
    }

    #[test]
    fn photo_default_is_bare_invocation() {
        let command = build(MediaFormat::Jpeg, "png");
        assert_eq!(command, vec![FFMPEG, "-i", "/tmp/in.jpeg", "/tmp/out.png"]);
    }

    #[test]
    fn video_to_mp4_uses_h264_aac() {
        let command = build(MediaFormat::Mkv, "mp4");
        assert_eq!(
            command,
            vec![
                FFMPEG, "-i", "/tmp/in.mkv", "-c:v", "libx264", "-c:a", "aac", "-crf", "23",
                "-b:a", "128k", "/tmp/out.mp4"
            ]
        );
    }

    #[test]
    fn video_to_webm_uses_vp8_opus() {
        let command = build(MediaFormat::Avi, "webm");
        assert_eq!(
            command,
            vec![
                FFMPEG, "-i", "/tmp/in.avi", "-c:v", "libvpx", "-c:a", "libopus", "-crf", "10",
                "-b:a", "128k", "/tmp/out.webm"
            ]
        );
    }

    #[test]
    fn video_to_avi_uses_mpeg4_mp3() {
        let command = build(MediaFormat::Wmv, "avi");
        assert_eq!(
            command,
            vec![
                FFMPEG, "-i", "/tmp/in.wmv", "-c:v", "mpeg4", "-c:a", "libmp3lame", "-b:v", "1M",
                "-b:a", "128k", "/tmp/out.avi"
            ]
        );
    }

    #[test]
    fn video_to_wmv_uses_wmv2_wmav2() {
        let command = build(MediaFormat::Mp4, "wmv");
        assert_eq!(
            command,
            vec![
                FFMPEG, "-i", "/tmp/in.mp4", "-c:v", "wmv2", "-c:a", "wmav2", "-b:v", "1M",
                "-b:a", "128k", "/tmp/out.wmv"
            ]
        );
    }

    #[test]
    fn video_to_audio_disables_video_stream() {
        for target_ext in ["mp3", "aac", "wav", "flac", "ogg", "m4a"] {
            let command = build(MediaFormat::Mkv, target_ext);
            assert!(
                command.iter().any(|a| a == "-vn"),
                "mkv -> {target_ext} missing -vn"
            );
        }
    }

    #[test]
    fn video_to_mp3_flags() {
        let command = build(MediaFormat::Mov, "mp3");
        assert_eq!(
            command,
            vec![
                FFMPEG, "-i", "/tmp/in.mov", "-c:a", "libmp3lame", "-b:a", "192k", "-vn",
                "/tmp/out.mp3"
            ]
        );
    }

    #[test]
    fn audio_to_audio_uses_table_and_disables_video() {
        let command = build(MediaFormat::Flac, "ogg");
        assert_eq!(
            command,
            vec![
                FFMPEG, "-i", "/tmp/in.flac", "-c:a", "libvorbis", "-q:a", "5", "-vn",
                "/tmp/out.ogg"
            ]
        );

        let command = build(MediaFormat::Mp3, "wav");
        assert_eq!(
            command,
            vec![FFMPEG, "-i", "/tmp/in.mp3", "-c:a", "pcm_s16le", "-vn", "/tmp/out.wav"]
        );
    }

    #[test]
    fn same_container_target_falls_back_to_default() {
        let command = build(MediaFormat::Mkv, "mkv");
        assert_eq!(command, vec![FFMPEG, "-i", "/tmp/in.mkv", "/tmp/out.mkv"]);
    }

    #[test]
    fn unrecognized_target_falls_back_to_default() {
        // No table entry for video -> gif; the default invocation still
        // produces a runnable command.
        let command = build(MediaFormat::Mp4, "gif");
        assert_eq!(command, vec![FFMPEG, "-i", "/tmp/in.mp4", "/tmp/out.gif"]);

        let command = build(MediaFormat::Wav, "mp4");
        assert_eq!(command, vec![FFMPEG, "-i", "/tmp/in.wav", "/tmp/out.mp4"]);
    }
}
