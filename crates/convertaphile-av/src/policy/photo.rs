//! GIF-specific command policy.

use super::{default_args, push_args};

/// Target extensions that can hold exactly one image.
/// "svg" and "ico" are not yet supported as targets.
pub const SINGLE_FRAME_TARGETS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "bmp", "tiff", "avif"];

/// GIF sources converting to a single-image target are restricted to one
/// frame: an animated source would otherwise produce one output file per
/// frame, or fail outright.
pub(crate) fn gif_args(command: &mut Vec<String>, target_ext: &str) {
    if SINGLE_FRAME_TARGETS.contains(&target_ext) {
        tracing::debug!("gif source: limiting output to a single frame");
        push_args(command, &["-frames:v", "1"]);
    }
    default_args(command, target_ext);
}
