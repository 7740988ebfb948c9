use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::multipart::Part;
use tokio_util::io::ReaderStream;

use crate::{ApiError, FailureKind};

/// Receives byte counts while a video file is streamed to the service.
pub trait UploadProgressSink: Send + Sync {
    fn emit(&self, sent: u64, total: u64);
}

/// Percent of `total` covered by `sent`, rounded like the progress bar shows it.
pub fn upload_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (sent.min(total) as f64 * 100.0 / total as f64).round();
    percent as u8
}

/// Opens `path` and wraps it as the multipart `video` field, streaming the
/// file and reporting every chunk to `sink`.
pub(crate) async fn build_video_part(
    path: &Path,
    sink: Arc<dyn UploadProgressSink>,
) -> Result<Part, ApiError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| ApiError::new(FailureKind::InvalidRequest, "video path has no file name"))?;

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|err| ApiError::new(FailureKind::FileRead, format!("{}: {err}", path.display())))?;
    let total = file
        .metadata()
        .await
        .map_err(|err| ApiError::new(FailureKind::FileRead, err.to_string()))?
        .len();

    let sent = Arc::new(AtomicU64::new(0));
    let stream = ReaderStream::new(file).map(move |chunk: std::io::Result<Bytes>| {
        if let Ok(bytes) = &chunk {
            let now = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed) + bytes.len() as u64;
            sink.emit(now, total);
        }
        chunk
    });

    Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
        .file_name(file_name.clone())
        .mime_str(mime_for(&file_name))
        .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_empty_and_partial_files() {
        assert_eq!(upload_percent(0, 0), 100);
        assert_eq!(upload_percent(1, 3), 33);
        assert_eq!(upload_percent(2, 3), 67);
        assert_eq!(upload_percent(10, 3), 100);
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for("clip.MP4"), "video/mp4");
        assert_eq!(mime_for("clip.mov"), "video/quicktime");
        assert_eq!(mime_for("README"), "application/octet-stream");
    }
}
