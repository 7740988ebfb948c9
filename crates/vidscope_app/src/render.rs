use std::fmt::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use vidscope_core::{AnalysisStatus, FailureKind, MonitorView, Notice};
use vidscope_engine::{upload_percent, QueryOutcome, UploadProgressSink, VideoSummary};

use crate::monitor::MonitorRenderer;

const BAR_TEMPLATE: &str = "{spinner} {msg} [{bar:40}] {pos:>3}%";
const UPLOAD_TEMPLATE: &str = "Uploading [{bar:40}] {bytes}/{total_bytes} ({msg})";

pub fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::Terminal { status, failure, .. } => match (status, failure) {
            (AnalysisStatus::Completed, _) => "Video analysis completed successfully!".to_string(),
            (AnalysisStatus::Cancelled, _) => "Video analysis was cancelled.".to_string(),
            (AnalysisStatus::Error, Some(FailureKind::Transport { message })) => {
                format!("Error fetching analysis progress: {message}")
            }
            (AnalysisStatus::Error, _) => "Video analysis encountered an error.".to_string(),
            (other, _) => format!("Analysis status: {other}"),
        },
        Notice::CancelRequestFailed { video_id, message } => {
            format!("Failed to cancel analysis for video {video_id}: {message}")
        }
    }
}

pub fn format_video_list(videos: &[VideoSummary]) -> String {
    if videos.is_empty() {
        return "No videos uploaded yet.".to_string();
    }
    let width = videos
        .iter()
        .map(|video| video.video_id.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for video in videos {
        let _ = writeln!(out, "{:<width$}  {}", video.video_id, video.filename);
    }
    out
}

/// `resolve` turns relative frame and video links into absolute URLs.
pub fn format_query_outcome(outcome: &QueryOutcome, resolve: impl Fn(&str) -> String) -> String {
    let frames = match outcome {
        QueryOutcome::Message(message) => return message.clone(),
        QueryOutcome::NoMatches => {
            return "Sorry, no relevant video frames found for your query.".to_string()
        }
        QueryOutcome::Frames(frames) => frames,
    };

    let mut out = String::new();
    let _ = writeln!(out, "Query Results ({} frames)", frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "#{}  {}", index + 1, resolve(&frame.frame_url));
        let _ = writeln!(out, "    Timeframe: {}", frame.timeframe);
        if let Some(link) = frame.video_link.as_deref().filter(|link| *link != "#") {
            let _ = writeln!(out, "    Video Link: {}", resolve(link));
        }
        if !frame.detected_objects.is_empty() {
            let _ = writeln!(out, "    Detected Objects:");
            for object in &frame.detected_objects {
                let color = object.object_color.as_deref().unwrap_or("unknown");
                let _ = writeln!(out, "      - Type: {}  Color: {}", object.object_type, color);
            }
        }
    }
    out
}

/// Progress bar for `watch`. Notices are printed above the bar.
pub struct TerminalRenderer {
    bar: ProgressBar,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl MonitorRenderer for TerminalRenderer {
    fn render(&mut self, view: &MonitorView) {
        self.bar.set_position(u64::from(view.percent));
        self.bar.set_message(view.status_line());
    }

    fn notice(&mut self, notice: &Notice) {
        self.bar.println(notice_text(notice));
    }

    fn finish(&mut self, view: &MonitorView) {
        self.bar.set_position(u64::from(view.percent));
        self.bar.finish_with_message(view.status_line());
    }
}

/// Upload progress bar driven by the engine's byte counts.
pub struct UploadBar {
    bar: ProgressBar,
}

impl UploadBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(UPLOAD_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl UploadProgressSink for UploadBar {
    fn emit(&self, sent: u64, total: u64) {
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
        }
        self.bar.set_position(sent);
        self.bar.set_message(format!("{}%", upload_percent(sent, total)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidscope_engine::{DetectedObject, FrameMatch, Timeframe};

    #[test]
    fn transport_and_remote_errors_read_differently() {
        let transport = Notice::Terminal {
            video_id: "v1".into(),
            status: AnalysisStatus::Error,
            failure: Some(FailureKind::Transport {
                message: "timeout".into(),
            }),
        };
        let remote = Notice::Terminal {
            video_id: "v1".into(),
            status: AnalysisStatus::Error,
            failure: Some(FailureKind::Remote),
        };
        assert_eq!(
            notice_text(&transport),
            "Error fetching analysis progress: timeout"
        );
        assert_eq!(notice_text(&remote), "Video analysis encountered an error.");
    }

    #[test]
    fn video_list_is_aligned() {
        let videos = vec![
            VideoSummary {
                video_id: "a".into(),
                filename: "one.mp4".into(),
            },
            VideoSummary {
                video_id: "abc".into(),
                filename: "two.mp4".into(),
            },
        ];
        assert_eq!(format_video_list(&videos), "a    one.mp4\nabc  two.mp4\n");
        assert_eq!(format_video_list(&[]), "No videos uploaded yet.");
    }

    #[test]
    fn query_frames_are_listed_with_resolved_urls() {
        let outcome = QueryOutcome::Frames(vec![FrameMatch {
            frame_url: "/frames/f1.jpg".into(),
            timeframe: Timeframe::Label("00:01:05".into()),
            video_link: Some("#".into()),
            detected_objects: vec![DetectedObject {
                object_type: "car".into(),
                object_color: Some("blue".into()),
            }],
        }]);

        let text = format_query_outcome(&outcome, |raw| format!("http://h{raw}"));

        assert!(text.starts_with("Query Results (1 frames)"));
        assert!(text.contains("#1  http://h/frames/f1.jpg"));
        assert!(text.contains("Timeframe: 00:01:05"));
        assert!(!text.contains("Video Link"));
        assert!(text.contains("- Type: car  Color: blue"));
    }

    #[test]
    fn query_without_frames_says_so() {
        assert_eq!(
            format_query_outcome(&QueryOutcome::NoMatches, str::to_string),
            "Sorry, no relevant video frames found for your query."
        );
        assert_eq!(
            format_query_outcome(&QueryOutcome::Message("busy".into()), str::to_string),
            "busy"
        );
    }
}
