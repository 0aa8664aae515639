//! Conversion, download and statistics endpoints.

use crate::server::AppContext;
use axum::{
    body::Body,
    extract::{Multipart, Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use convertaphile_av::{check_tools, convert, Error as AvError, ToolInfo};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Every extension accepted as a conversion target.
const SUPPORTED_TARGETS: [&str; 20] = [
    "jpg", "jpeg", "png", "webp", "gif", "avif", "bmp", "tiff", "mp4", "mkv", "mov", "avi",
    "webm", "wmv", "mp3", "aac", "flac", "m4a", "ogg", "wav",
];

/// Metadata returned after a successful conversion.
#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    #[serde(rename = "conversionId")]
    pub conversion_id: String,
    #[serde(rename = "originalFileName")]
    pub original_file_name: String,
    #[serde(rename = "convertedFileName")]
    pub converted_file_name: String,
    #[serde(rename = "targetFormat")]
    pub target_format: String,
    #[serde(rename = "fileSizeBytes")]
    pub file_size_bytes: u64,
    #[serde(rename = "fileSizeMB")]
    pub file_size_mb: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ConversionStatsResponse {
    #[serde(rename = "totalFiles")]
    pub total_files: u64,
    #[serde(rename = "totalSizeMB")]
    pub total_size_mb: f64,
    #[serde(rename = "totalDownloads")]
    pub total_downloads: u64,
    pub message: String,
}

pub async fn health() -> &'static str {
    "Fine & Dandy!"
}

/// Multipart upload + conversion. Expects a file part and a `targetFormat`
/// form field.
pub async fn convert_upload(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<ConversionResponse>, (StatusCode, String)> {
    let mut saved_input: Option<(PathBuf, String)> = None;
    let mut target_extension: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some("targetFormat") {
            let value = field.text().await.map_err(bad_multipart)?;
            target_extension = Some(
                value
                    .trim()
                    .trim_start_matches('.')
                    .to_ascii_lowercase(),
            );
        } else if let Some(file_name) = field.file_name() {
            let original_name = sanitize_file_name(file_name);
            let data = field.bytes().await.map_err(bad_multipart)?;

            // Keep the upload's extension: the classifier uses it as a
            // fallback when the probe label is ambiguous.
            let ext = extension_of(&original_name);
            let temp_name = if ext.is_empty() {
                format!("uploaded_{}", Uuid::new_v4())
            } else {
                format!("uploaded_{}.{}", Uuid::new_v4(), ext)
            };
            let path = ctx.temp_dir.join(temp_name);
            tokio::fs::write(&path, &data).await.map_err(internal)?;
            tracing::debug!("saved upload of {} bytes to {:?}", data.len(), path);
            saved_input = Some((path, original_name));
        } else {
            tracing::debug!("skipping unknown multipart part: {:?}", field.name());
        }
    }

    let (input_path, original_name, target_extension) = match (saved_input, target_extension) {
        (Some((path, name)), Some(ext)) if !ext.is_empty() => (path, name, ext),
        (saved, _) => {
            if let Some((path, _)) = saved {
                let _ = tokio::fs::remove_file(&path).await;
            }
            return Err((
                StatusCode::BAD_REQUEST,
                "Missing file or target format".to_string(),
            ));
        }
    };

    if !SUPPORTED_TARGETS.contains(&target_extension.as_str()) {
        let _ = tokio::fs::remove_file(&input_path).await;
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Unsupported target format: {}", target_extension),
        ));
    }

    let output_path = ctx
        .temp_dir
        .join(format!("convertaphile_{}.{}", Uuid::new_v4(), target_extension));

    let response =
        run_conversion(&ctx, &input_path, &output_path, &original_name, &target_extension).await;

    // Scratch files go away regardless of outcome; the stored copy is the
    // only artifact that survives a successful conversion.
    let _ = tokio::fs::remove_file(&input_path).await;
    let _ = tokio::fs::remove_file(&output_path).await;

    response.map(Json)
}

async fn run_conversion(
    ctx: &AppContext,
    input_path: &Path,
    output_path: &Path,
    original_name: &str,
    target_extension: &str,
) -> Result<ConversionResponse, (StatusCode, String)> {
    let result = convert(
        input_path,
        output_path,
        &ctx.tools,
        ctx.config.conversion.timeout_secs,
    )
    .await
    .map_err(|e| match e {
        AvError::ProbeFailed { .. } => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Could not analyze input file type. Is it a valid media file?".to_string(),
        ),
        AvError::UnsupportedMedia { .. } => (
            StatusCode::BAD_REQUEST,
            "Unsupported input file type detected.".to_string(),
        ),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;

    if !result.success {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("File conversion failed: {}", stderr_excerpt(&result.stderr)),
        ));
    }

    let metadata = tokio::fs::metadata(output_path).await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Converted file not found or is empty".to_string(),
        )
    })?;
    if metadata.len() == 0 {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Converted file not found or is empty".to_string(),
        ));
    }

    // Move the artifact into the download store under a unique id.
    let conversion_id = Uuid::new_v4().to_string();
    let stem = file_stem_of(original_name);
    let stored_file_name = format!("{}_{}.{}", conversion_id, stem, target_extension);
    let stored_path = ctx.converted_dir.join(&stored_file_name);
    tokio::fs::copy(output_path, &stored_path)
        .await
        .map_err(internal)?;

    let file_size_bytes = metadata.len();
    ctx.stats.record_conversion(file_size_bytes);
    tracing::info!("stored converted file at {:?}", stored_path);

    Ok(ConversionResponse {
        conversion_id: conversion_id.clone(),
        original_file_name: original_name.to_string(),
        converted_file_name: stored_file_name,
        target_format: target_extension.to_string(),
        file_size_bytes,
        file_size_mb: format!("{:.2}", file_size_bytes as f64 / (1024.0 * 1024.0)),
        download_url: format!("/download/{}", conversion_id),
        message: "File converted successfully".to_string(),
    })
}

/// Serve a stored converted file once, then delete it.
pub async fn download(
    State(ctx): State<AppContext>,
    UrlPath(conversion_id): UrlPath<String>,
) -> Result<Response, (StatusCode, String)> {
    // Ids are UUIDs; anything with path-ish characters is hostile.
    if conversion_id.is_empty() || conversion_id.contains(['/', '\\', '.']) {
        return Err((StatusCode::BAD_REQUEST, "Invalid conversion ID".to_string()));
    }

    let prefix = format!("{}_", conversion_id);
    let mut entries = tokio::fs::read_dir(&ctx.converted_dir)
        .await
        .map_err(internal)?;

    let mut found: Option<PathBuf> = None;
    while let Some(entry) = entries.next_entry().await.map_err(internal)? {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            found = Some(entry.path());
            break;
        }
    }

    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            "File not found or has expired".to_string(),
        )
    };
    let path = found.ok_or_else(not_found)?;
    let file = tokio::fs::File::open(&path).await.map_err(|_| not_found())?;
    let metadata = file.metadata().await.map_err(internal)?;
    if metadata.len() == 0 {
        return Err((StatusCode::NOT_FOUND, "File not found or is empty".to_string()));
    }

    let stored_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // Strip the UUID prefix for the user-facing filename.
    let download_name = stored_name
        .splitn(2, '_')
        .nth(1)
        .unwrap_or(stored_name.as_str())
        .to_string();
    let content_type = content_type_for(&extension_of(&stored_name));

    ctx.stats.record_download();
    tracing::info!("serving download {}", stored_name);

    // One-shot downloads: the sweeper is only a fallback for files nobody
    // ever fetched. Unlinking now is safe; the open handle keeps the data
    // readable until the stream finishes.
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("failed to delete {:?} after download: {}", path, e);
    }

    // Stream instead of buffering: artifacts can run to the upload cap.
    let body = Body::from_stream(ReaderStream::new(file));

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (header::CONTENT_LENGTH, metadata.len().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        ),
    ];
    Ok((headers, body).into_response())
}

pub async fn stats(State(ctx): State<AppContext>) -> Json<ConversionStatsResponse> {
    let stats = ctx.stats.snapshot();
    Json(ConversionStatsResponse {
        total_files: stats.total_files,
        total_size_mb: stats.total_size_mb,
        total_downloads: stats.total_downloads,
        message: "Statistics retrieved successfully".to_string(),
    })
}

pub async fn tool_status() -> Result<Json<Vec<ToolInfo>>, (StatusCode, String)> {
    // check_tools shells out to each binary; keep that off the async workers.
    let tools = tokio::task::spawn_blocking(check_tools).await.map_err(|e| {
        tracing::error!("tool check task failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Tool check failed".to_string(),
        )
    })?;
    Ok(Json(tools))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("Invalid multipart payload: {}", e),
    )
}

fn internal(e: std::io::Error) -> (StatusCode, String) {
    tracing::error!("I/O error while handling request: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal storage error".to_string(),
    )
}

/// Reduce an upload's filename to a safe basename.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

fn file_stem_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload")
        .to_string()
}

/// Keep ffmpeg's error output readable in a JSON-ish error string.
fn stderr_excerpt(stderr: &str) -> &str {
    const MAX: usize = 2000;
    if stderr.len() <= MAX {
        return stderr;
    }
    let start = stderr.len() - MAX;
    // Avoid splitting a UTF-8 sequence.
    let mut cut = start;
    while !stderr.is_char_boundary(cut) {
        cut += 1;
    }
    &stderr[cut..]
}

/// MIME type for a converted file's extension.
fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "avif" => "image/avif",

        "mp3" => "audio/mpeg",
        "aac" => "audio/aac",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",

        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
    }

    #[test]
    fn content_types_cover_supported_formats() {
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("jpg"), "image/jpeg");
        assert_eq!(content_type_for("mkv"), "video/x-matroska");
        assert_eq!(content_type_for("m4a"), "audio/mp4");
        assert_eq!(content_type_for("xyz"), "application/octet-stream");
    }

    #[test]
    fn stderr_excerpt_keeps_short_text() {
        assert_eq!(stderr_excerpt("boom"), "boom");
        let long = "x".repeat(5000);
        assert_eq!(stderr_excerpt(&long).len(), 2000);
    }

    #[test]
    fn file_stem_handles_dotless_names() {
        assert_eq!(file_stem_of("video.mkv"), "video");
        assert_eq!(file_stem_of("video"), "video");
        assert_eq!(file_stem_of(""), "upload");
    }
}
