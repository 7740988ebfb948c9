use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::types::{ProgressBody, QueryBody};
use crate::upload::{build_video_part, UploadProgressSink};
use crate::{ApiError, FailureKind, ProgressReport, QueryOutcome, UploadReceipt, VideoSummary};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Root of the service, e.g. `http://127.0.0.1:5000`. `/api/...` is appended.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Uploads stream whole video files and get their own, longer budget.
    pub upload_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// The part of the service the progress monitor talks to.
#[async_trait::async_trait]
pub trait JobService: Send + Sync {
    async fn start_analysis(&self, video_id: &str) -> Result<(), ApiError>;

    async fn fetch_progress(&self, video_id: &str) -> Result<ProgressReport, ApiError>;

    async fn request_cancel(&self, video_id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    settings: ClientSettings,
    base: Url,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

impl ApiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base = parse_base_url(&settings.base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            http,
        })
    }

    /// Builds `{base}/api/videos/{segments...}` with each segment escaped.
    fn videos_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::new(FailureKind::InvalidUrl, "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(["api", "videos"])
            .extend(segments);
        Ok(url)
    }

    /// Turns a frame or video link from a query result into an absolute URL.
    pub fn resolve_asset_url(&self, raw: &str) -> String {
        self.base
            .join(raw)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| raw.to_string())
    }

    pub async fn list_videos(&self) -> Result<Vec<VideoSummary>, ApiError> {
        let url = self.videos_url(&[])?;
        let response = send_checked(self.http.get(url)).await?;
        decode_json(response).await
    }

    pub async fn delete_video(&self, video_id: &str) -> Result<(), ApiError> {
        let url = self.videos_url(&[video_id])?;
        send_checked(self.http.delete(url)).await?;
        engine_info!("Deleted video {}", video_id);
        Ok(())
    }

    pub async fn upload_video(
        &self,
        path: &Path,
        sink: Arc<dyn UploadProgressSink>,
    ) -> Result<UploadReceipt, ApiError> {
        let part = build_video_part(path, sink).await?;
        let form = reqwest::multipart::Form::new().part("video", part);
        let url = self.videos_url(&[])?;
        let request = self
            .http
            .post(url)
            .timeout(self.settings.upload_timeout)
            .multipart(form);
        let response = send_checked(request).await?;
        let receipt: UploadReceipt = decode_json(response).await?;
        engine_info!("Uploaded {:?} as video {}", path, receipt.video_id);
        Ok(receipt)
    }

    pub async fn query_video(&self, video_id: &str, query: &str) -> Result<QueryOutcome, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::new(
                FailureKind::InvalidRequest,
                "query text is empty",
            ));
        }
        let url = self.videos_url(&[video_id, "query"])?;
        let response = send_checked(self.http.post(url).json(&QueryRequest { query })).await?;
        let body: QueryBody = decode_json(response).await?;
        Ok(body.into())
    }
}

#[async_trait::async_trait]
impl JobService for ApiClient {
    async fn start_analysis(&self, video_id: &str) -> Result<(), ApiError> {
        let url = self.videos_url(&[video_id, "analyze"])?;
        send_checked(self.http.post(url)).await?;
        engine_info!("Analysis started for video {}", video_id);
        Ok(())
    }

    async fn fetch_progress(&self, video_id: &str) -> Result<ProgressReport, ApiError> {
        let url = self.videos_url(&[video_id, "analysis-progress"])?;
        let response = send_checked(self.http.get(url)).await?;
        let body: ProgressBody = decode_json(response).await?;
        let report = ProgressReport::from(body);
        engine_debug!(
            "Progress for video {}: {}% {}",
            video_id,
            report.percent,
            report.status
        );
        Ok(report)
    }

    async fn request_cancel(&self, video_id: &str) -> Result<(), ApiError> {
        let url = self.videos_url(&[video_id, "cancel-analysis"])?;
        send_checked(self.http.post(url)).await?;
        engine_info!("Cancellation requested for video {}", video_id);
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::new(
            FailureKind::InvalidUrl,
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(ApiError::new(FailureKind::InvalidUrl, "url cannot be a base"));
    }
    Ok(url)
}

async fn send_checked(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    Ok(response)
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
