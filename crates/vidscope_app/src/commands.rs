use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use engine_logging::{engine_debug, engine_warn};
use vidscope_core::{AnalysisStatus, Msg};
use vidscope_engine::{ApiClient, JobService};

use crate::cli::Command;
use crate::effects::EffectRunner;
use crate::monitor::{MonitorSession, MonitorSummary};
use crate::render::{format_query_outcome, format_video_list, TerminalRenderer, UploadBar};
use crate::settings::AppSettings;

/// Exit code used when the user abandons a watch with a second Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

pub fn execute(command: Command, settings: &AppSettings) -> Result<ExitCode> {
    let client = ApiClient::new(settings.client_settings())
        .with_context(|| format!("invalid service url {}", settings.api_url))?;

    match command {
        Command::List => {
            let videos = block_on(client.list_videos())?.context("failed to list videos")?;
            print!("{}", format_video_list(&videos));
            if videos.is_empty() {
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Upload { file } => upload(&client, &file),
        Command::Delete { video_id, yes } => {
            if !yes && !confirm(&format!("Delete video {video_id}?"))? {
                println!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            block_on(client.delete_video(&video_id))?
                .with_context(|| format!("failed to delete video {video_id}"))?;
            println!("Deleted video {video_id}.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze {
            video_id,
            detach,
            retries,
        } => {
            block_on(client.start_analysis(&video_id))?
                .with_context(|| format!("failed to start analysis of video {video_id}"))?;
            println!("Analysis started for video {video_id}.");
            if detach {
                return Ok(ExitCode::SUCCESS);
            }
            watch(client, settings, &video_id, retries)
        }
        Command::Watch { video_id, retries } => watch(client, settings, &video_id, retries),
        Command::Cancel { video_id } => {
            block_on(client.request_cancel(&video_id))?
                .with_context(|| format!("failed to cancel analysis of video {video_id}"))?;
            println!("Cancellation requested for video {video_id}.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Query { video_id, text } => {
            let query = text.join(" ");
            let outcome = block_on(client.query_video(&video_id, &query))?
                .with_context(|| format!("query against video {video_id} failed"))?;
            print!(
                "{}",
                format_query_outcome(&outcome, |raw| client.resolve_asset_url(raw))
            );
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn upload(client: &ApiClient, file: &Path) -> Result<ExitCode> {
    let bar = Arc::new(UploadBar::new());
    let result = block_on(client.upload_video(file, bar.clone()))?;
    bar.finish();
    let receipt = result.with_context(|| format!("failed to upload {}", file.display()))?;
    match receipt.message.as_deref() {
        Some(message) => println!("{message} (video id {})", receipt.video_id),
        None => println!("Uploaded video {}.", receipt.video_id),
    }
    Ok(ExitCode::SUCCESS)
}

fn watch(
    client: ApiClient,
    settings: &AppSettings,
    video_id: &str,
    retries: u32,
) -> Result<ExitCode> {
    let runner = EffectRunner::new(Arc::new(client)).context("failed to start engine")?;
    let (msg_tx, msg_rx) = mpsc::channel();
    spawn_interrupt_listener(msg_tx)?;

    let session = MonitorSession::new(
        settings.poll_policy(),
        runner,
        TerminalRenderer::new(),
        msg_rx,
    )
    .with_transport_retries(retries);
    let summary = session.watch(video_id);
    engine_debug!(
        "Watch of video {} ended as {} with {} notice(s)",
        summary.video_id,
        summary.status,
        summary.notices.len()
    );
    if summary.interrupted {
        println!(
            "Stopped watching video {} at {}%.",
            summary.video_id, summary.percent
        );
    }
    Ok(ExitCode::from(exit_status(&summary)))
}

fn exit_status(summary: &MonitorSummary) -> u8 {
    if summary.interrupted {
        return EXIT_INTERRUPTED;
    }
    match summary.status {
        AnalysisStatus::Error => 1,
        _ => 0,
    }
}

/// First Ctrl-C asks the monitor to cancel the job, the second abandons the
/// watch.
fn spawn_interrupt_listener(msg_tx: Sender<Msg>) -> Result<()> {
    thread::Builder::new()
        .name("vidscope-signals".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_warn!("Ctrl-C handling unavailable: {}", err);
                    return;
                }
            };
            for msg in [Msg::CancelClicked, Msg::Shutdown] {
                if let Err(err) = runtime.block_on(tokio::signal::ctrl_c()) {
                    engine_warn!("Failed to listen for Ctrl-C: {}", err);
                    return;
                }
                engine_debug!("Ctrl-C received; sending {:?}", msg);
                if msg_tx.send(msg).is_err() {
                    return;
                }
            }
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    Ok(runtime.block_on(future))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    let accepted = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    engine_debug!("Confirmation for {:?}: {}", prompt, accepted);
    Ok(accepted)
}
