//! Probe-report classification.
//!
//! Maps a [`ProbeReport`] plus a filename-extension fallback onto one of the
//! supported formats. Rules are ordered and first-match-wins: photo tokens
//! are checked before any stream-type branch because a still image carries
//! no "video"/"audio" stream to branch on, and the extension acts as a
//! fallback when ffprobe's container label is ambiguous or generic.

use crate::probe::ProbeReport;
use std::fmt;

/// Broad family of a media format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    Photo,
    Video,
    Audio,
}

/// A supported source/target media format.
///
/// Closed enumeration: the policy dispatch over it is exhaustive at
/// compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    // Photo
    Jpeg,
    Png,
    Webp,
    Gif,
    Avif,
    Bmp,
    Tiff,
    // Video containers
    Mp4,
    Mkv,
    Mov,
    Avi,
    Webm,
    Wmv,
    // Audio
    Mp3,
    Aac,
    Flac,
    M4a,
    Ogg,
    Wav,
}

/// Photo tokens, in match order. "jpg" is normalized to "jpeg" before lookup.
const PHOTO_TOKENS: [(MediaFormat, &str); 7] = [
    (MediaFormat::Jpeg, "jpeg"),
    (MediaFormat::Png, "png"),
    (MediaFormat::Webp, "webp"),
    (MediaFormat::Gif, "gif"),
    (MediaFormat::Avif, "avif"),
    (MediaFormat::Bmp, "bmp"),
    (MediaFormat::Tiff, "tiff"),
];

/// Video container tokens, in match order. ffprobe labels Matroska files
/// "matroska,webm", so MKV matches on both spellings.
const VIDEO_TOKENS: [(MediaFormat, &[&str]); 6] = [
    (MediaFormat::Mp4, &["mp4"]),
    (MediaFormat::Mkv, &["mkv", "matroska"]),
    (MediaFormat::Mov, &["mov"]),
    (MediaFormat::Avi, &["avi"]),
    (MediaFormat::Webm, &["webm"]),
    (MediaFormat::Wmv, &["wmv"]),
];

/// Audio tokens, in match order. Matched against both the container label
/// and the codec name of any audio stream.
const AUDIO_TOKENS: [(MediaFormat, &str); 6] = [
    (MediaFormat::Mp3, "mp3"),
    (MediaFormat::Aac, "aac"),
    (MediaFormat::Flac, "flac"),
    (MediaFormat::M4a, "m4a"),
    (MediaFormat::Ogg, "ogg"),
    (MediaFormat::Wav, "wav"),
];

impl MediaFormat {
    /// Every supported format, photo then video then audio.
    pub const ALL: [MediaFormat; 19] = [
        MediaFormat::Jpeg,
        MediaFormat::Png,
        MediaFormat::Webp,
        MediaFormat::Gif,
        MediaFormat::Avif,
        MediaFormat::Bmp,
        MediaFormat::Tiff,
        MediaFormat::Mp4,
        MediaFormat::Mkv,
        MediaFormat::Mov,
        MediaFormat::Avi,
        MediaFormat::Webm,
        MediaFormat::Wmv,
        MediaFormat::Mp3,
        MediaFormat::Aac,
        MediaFormat::Flac,
        MediaFormat::M4a,
        MediaFormat::Ogg,
        MediaFormat::Wav,
    ];

    pub fn family(self) -> FormatFamily {
        match self {
            MediaFormat::Jpeg
            | MediaFormat::Png
            | MediaFormat::Webp
            | MediaFormat::Gif
            | MediaFormat::Avif
            | MediaFormat::Bmp
            | MediaFormat::Tiff => FormatFamily::Photo,
            MediaFormat::Mp4
            | MediaFormat::Mkv
            | MediaFormat::Mov
            | MediaFormat::Avi
            | MediaFormat::Webm
            | MediaFormat::Wmv => FormatFamily::Video,
            MediaFormat::Mp3
            | MediaFormat::Aac
            | MediaFormat::Flac
            | MediaFormat::M4a
            | MediaFormat::Ogg
            | MediaFormat::Wav => FormatFamily::Audio,
        }
    }

    /// Canonical file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpeg",
            MediaFormat::Png => "png",
            MediaFormat::Webp => "webp",
            MediaFormat::Gif => "gif",
            MediaFormat::Avif => "avif",
            MediaFormat::Bmp => "bmp",
            MediaFormat::Tiff => "tiff",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mkv => "mkv",
            MediaFormat::Mov => "mov",
            MediaFormat::Avi => "avi",
            MediaFormat::Webm => "webm",
            MediaFormat::Wmv => "wmv",
            MediaFormat::Mp3 => "mp3",
            MediaFormat::Aac => "aac",
            MediaFormat::Flac => "flac",
            MediaFormat::M4a => "m4a",
            MediaFormat::Ogg => "ogg",
            MediaFormat::Wav => "wav",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Normalize a file extension for matching: lowercase, "jpg" aliased
/// to "jpeg".
fn normalize_extension(ext: &str) -> String {
    let ext = ext.to_ascii_lowercase();
    if ext == "jpg" {
        "jpeg".to_string()
    } else {
        ext
    }
}

/// Classify a probe report into a supported format.
///
/// `fallback_extension` is the upload's filename extension (lowercase,
/// no leading dot), consulted when the container label is missing or
/// ambiguous. Returns `None` for unknown or unsupported input.
pub fn classify(report: &ProbeReport, fallback_extension: &str) -> Option<MediaFormat> {
    let format_name = report.format_name().to_ascii_lowercase();
    let ext = normalize_extension(fallback_extension);

    // Still images first. A GIF reports a video stream, and a probe label
    // like "png_pipe" carries no stream-type hint at all.
    for (format, token) in &PHOTO_TOKENS {
        if format_name.contains(token) || ext == *token {
            return Some(*format);
        }
    }

    if report.has_stream("video") {
        let candidates: Vec<MediaFormat> = VIDEO_TOKENS
            .iter()
            .filter(|(_, tokens)| tokens.iter().any(|t| format_name.contains(t)))
            .map(|(format, _)| *format)
            .collect();

        // Alias lists like "matroska,webm" or "mov,mp4,m4a,3gp,3g2,mj2"
        // match several containers; the upload's extension breaks the tie.
        if candidates.len() > 1 {
            if let Some(format) = candidates.iter().find(|f| f.extension() == ext) {
                return Some(*format);
            }
        }
        if let Some(format) = candidates.first() {
            return Some(*format);
        }
        // Label was unhelpful; the extension alone decides.
        return VIDEO_TOKENS
            .iter()
            .find(|(format, _)| format.extension() == ext)
            .map(|(format, _)| *format);
    }

    if report.has_stream("audio") {
        for (format, token) in &AUDIO_TOKENS {
            if format_name.contains(token) || report.has_audio_codec(token) {
                return Some(*format);
            }
        }
        return None;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeFormat, ProbeStream};

    fn report(format_name: &str, streams: &[(&str, &str)]) -> ProbeReport {
        ProbeReport {
            format: Some(ProbeFormat {
                format_name: Some(format_name.to_string()),
                duration: None,
            }),
            streams: streams
                .iter()
                .map(|(codec_type, codec_name)| ProbeStream {
                    codec_name: Some(codec_name.to_string()),
                    codec_type: Some(codec_type.to_string()),
                    width: None,
                    height: None,
                })
                .collect(),
        }
    }

    #[test]
    fn photo_check_precedes_stream_checks() {
        // A jpeg label with no streams at all must still classify.
        let r = report("jpeg_pipe", &[]);
        assert_eq!(classify(&r, ""), Some(MediaFormat::Jpeg));

        // Even with a video stream present (ffprobe reports one for
        // still images), the photo branch wins.
        let r = report("gif", &[("video", "gif")]);
        assert_eq!(classify(&r, "gif"), Some(MediaFormat::Gif));
    }

    #[test]
    fn extension_fallback_for_photos() {
        let r = report("", &[]);
        assert_eq!(classify(&r, "png"), Some(MediaFormat::Png));
        assert_eq!(classify(&r, "jpg"), Some(MediaFormat::Jpeg));
        assert_eq!(classify(&r, "jpeg"), Some(MediaFormat::Jpeg));
    }

    #[test]
    fn video_container_from_label() {
        let r = report("avi", &[("video", "mpeg4"), ("audio", "mp3")]);
        assert_eq!(classify(&r, "avi"), Some(MediaFormat::Avi));
    }

    #[test]
    fn ambiguous_label_resolved_by_extension() {
        // "matroska,webm" covers both MKV and WebM; the extension decides.
        let r = report("matroska,webm", &[("video", "h264")]);
        assert_eq!(classify(&r, "mkv"), Some(MediaFormat::Mkv));
        assert_eq!(classify(&r, "webm"), Some(MediaFormat::Webm));

        // The MP4 family label covers MP4 and MOV.
        let r = report("mov,mp4,m4a,3gp,3g2,mj2", &[("video", "h264")]);
        assert_eq!(classify(&r, "mov"), Some(MediaFormat::Mov));
        assert_eq!(classify(&r, "mp4"), Some(MediaFormat::Mp4));
    }

    #[test]
    fn ambiguous_label_without_matching_extension_uses_enumeration_order() {
        let r = report("matroska,webm", &[("video", "h264")]);
        assert_eq!(classify(&r, "bin"), Some(MediaFormat::Mkv));
    }

    #[test]
    fn video_extension_fallback_when_label_unhelpful() {
        let r = report("generic-container", &[("video", "h264")]);
        assert_eq!(classify(&r, "wmv"), Some(MediaFormat::Wmv));
    }

    #[test]
    fn unsupported_video_container_fails() {
        let r = report("yuv4mpegpipe", &[("video", "rawvideo")]);
        assert_eq!(classify(&r, "y4m"), None);
    }

    #[test]
    fn audio_from_label() {
        let r = report("mp3", &[("audio", "mp3")]);
        assert_eq!(classify(&r, "mp3"), Some(MediaFormat::Mp3));
    }

    #[test]
    fn audio_from_stream_codec() {
        // FLAC label sometimes comes back generic; codec name still matches.
        let r = report("some-container", &[("audio", "flac")]);
        assert_eq!(classify(&r, ""), Some(MediaFormat::Flac));
    }

    #[test]
    fn unsupported_audio_fails() {
        let r = report("dsf", &[("audio", "dsd_lsbf")]);
        assert_eq!(classify(&r, "dsf"), None);
    }

    #[test]
    fn empty_report_fails() {
        let r = ProbeReport::default();
        assert_eq!(classify(&r, ""), None);
    }
}
