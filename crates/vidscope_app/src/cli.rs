use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Terminal client for the video analysis service.
#[derive(Debug, Parser)]
#[command(name = "vidscope", version, about)]
pub struct Cli {
    /// Service root, e.g. http://127.0.0.1:5000. Overrides the settings file.
    #[arg(long, global = true, env = "VIDSCOPE_API_URL")]
    pub api_url: Option<String>,

    /// RON settings file. Defaults to ./vidscope.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log debug output to the terminal.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List uploaded videos.
    List,
    /// Upload a video file.
    Upload { file: PathBuf },
    /// Delete a video.
    Delete {
        video_id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Start analysis and follow its progress.
    Analyze {
        video_id: String,
        /// Return right after the job is started.
        #[arg(long)]
        detach: bool,
        /// Resume polling this many times after a failed progress request.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Follow the analysis progress of a video. Ctrl-C cancels the job.
    Watch {
        video_id: String,
        /// Resume polling this many times after a failed progress request.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Ask the service to cancel a running analysis.
    Cancel { video_id: String },
    /// Search an analyzed video with a natural-language query.
    Query {
        video_id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

impl Command {
    /// Commands that keep a progress bar on the terminal while they run.
    pub fn draws_progress(&self) -> bool {
        matches!(
            self,
            Command::Upload { .. } | Command::Watch { .. } | Command::Analyze { detach: false, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_words_are_collected() {
        let cli = Cli::parse_from(["vidscope", "query", "v1", "person", "in", "red"]);
        match cli.command {
            Command::Query { video_id, text } => {
                assert_eq!(video_id, "v1");
                assert_eq!(text.join(" "), "person in red");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["vidscope", "watch", "v1", "--api-url", "http://h:1", "-v"]);
        assert_eq!(cli.api_url.as_deref(), Some("http://h:1"));
        assert!(cli.verbose);
    }

    #[test]
    fn retries_default_to_zero() {
        let cli = Cli::parse_from(["vidscope", "watch", "v1"]);
        assert!(matches!(cli.command, Command::Watch { retries: 0, .. }));

        let cli = Cli::parse_from(["vidscope", "analyze", "v1", "--retries", "3"]);
        assert!(matches!(cli.command, Command::Analyze { retries: 3, .. }));
    }

    #[test]
    fn only_bar_commands_draw_progress() {
        let parse = |args: &[&str]| Cli::parse_from(args).command;
        assert!(parse(&["vidscope", "watch", "v1"]).draws_progress());
        assert!(parse(&["vidscope", "analyze", "v1"]).draws_progress());
        assert!(parse(&["vidscope", "upload", "a.mp4"]).draws_progress());
        assert!(!parse(&["vidscope", "analyze", "v1", "--detach"]).draws_progress());
        assert!(!parse(&["vidscope", "list"]).draws_progress());
    }
}
