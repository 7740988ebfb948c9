use std::fmt;

use serde::{Deserialize, Deserializer};

pub type VideoId = String;
pub type PollTicket = u64;

/// One entry of `GET /api/videos`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoSummary {
    #[serde(alias = "id", deserialize_with = "id_from_json")]
    pub video_id: VideoId,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(alias = "id", deserialize_with = "id_from_json")]
    pub video_id: VideoId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Job status as reported by the service. Labels other than the four the
/// monitor acts on (`Pending`, `Running`, `Cancelling`, `NotFound`, ...) are
/// kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Analyzing,
    Completed,
    Error,
    Cancelled,
    Other(String),
}

impl JobStatus {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Analyzing" => JobStatus::Analyzing,
            "Completed" => JobStatus::Completed,
            "Error" => JobStatus::Error,
            "Cancelled" => JobStatus::Cancelled,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Analyzing => f.write_str("Analyzing"),
            JobStatus::Completed => f.write_str("Completed"),
            JobStatus::Error => f.write_str("Error"),
            JobStatus::Cancelled => f.write_str("Cancelled"),
            JobStatus::Other(label) => f.write_str(label),
        }
    }
}

/// Parsed body of `GET /api/videos/{id}/analysis-progress`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub percent: u8,
    pub status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProgressBody {
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    status: Option<String>,
}

impl From<ProgressBody> for ProgressReport {
    fn from(body: ProgressBody) -> Self {
        let percent = body
            .progress
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(0);
        // A missing status means the job is still running.
        let status = body
            .status
            .as_deref()
            .map(JobStatus::from_label)
            .unwrap_or(JobStatus::Analyzing);
        Self { percent, status }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectedObject {
    pub object_type: String,
    #[serde(default)]
    pub object_color: Option<String>,
}

/// Position of a frame in the video. The service sends either seconds or a
/// preformatted label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Timeframe {
    Seconds(f64),
    Label(String),
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Seconds(seconds) => write!(f, "{seconds:.1}s"),
            Timeframe::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameMatch {
    pub frame_url: String,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub video_link: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub detected_objects: Vec<DetectedObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryBody {
    #[serde(default)]
    frames: Option<Vec<FrameMatch>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Frames(Vec<FrameMatch>),
    /// The service answered with a message instead of frames.
    Message(String),
    NoMatches,
}

impl From<QueryBody> for QueryOutcome {
    fn from(body: QueryBody) -> Self {
        if let Some(message) = body.message.filter(|m| !m.trim().is_empty()) {
            return QueryOutcome::Message(message);
        }
        match body.frames {
            Some(frames) if !frames.is_empty() => QueryOutcome::Frames(frames),
            _ => QueryOutcome::NoMatches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The poll timer armed under `ticket` fired.
    PollDue { ticket: PollTicket },
    ProgressFetched {
        ticket: PollTicket,
        video_id: VideoId,
        result: Result<ProgressReport, ApiError>,
    },
    CancelFinished {
        video_id: VideoId,
        result: Result<(), ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    FileRead,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
            FailureKind::FileRead => write!(f, "could not read file"),
        }
    }
}

/// The service passes detector output through as-is, so the list may be `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_from_json<'de, D>(deserializer: D) -> Result<VideoId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
