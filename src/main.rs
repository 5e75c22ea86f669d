use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use karaoke::config::{Config, OverwritePolicy};
use karaoke::interactive::{default_output_dir, run_interactive_wizard, ConsolePrompt};
use karaoke::pipeline::{
    print_summary, CancelToken, Pipeline, PipelineState, RunOutcome, StatusEvent, Toolchain,
    WorkItem,
};
use karaoke::video::SourceRef;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const EXIT_FAILED: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "karaoke")]
#[command(version, about = "Turn a music video into a karaoke video")]
#[command(long_about = "Remove the vocals from a music video, transcribe the lyrics and burn them \
in as subtitles. The original audio is kept as a second track. Run without a source to start \
the interactive wizard.")]
struct Cli {
    /// Video file or http(s) URL
    source: Option<String>,

    /// Folder receiving output.mp4 and the intermediate files [default: <video>_karaoke]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Transcription model: tiny, base, small, medium, large-v3
    #[arg(short, long)]
    model: Option<String>,

    /// Subtitle delay in milliseconds (may be negative)
    #[arg(long, allow_hyphen_values = true)]
    offset_ms: Option<i64>,

    /// Open the lyrics in an editor before rendering
    #[arg(short, long)]
    edit: bool,

    /// Replace an existing output.mp4 without asking
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn overwrite_policy(cli: &Cli) -> OverwritePolicy {
    if cli.overwrite {
        OverwritePolicy::Overwrite
    } else {
        OverwritePolicy::Abort
    }
}

fn build_work_item(cli: &Cli, source: &str, config: &Config) -> Result<WorkItem> {
    let source = SourceRef::parse(source);

    let model = match &cli.model {
        Some(m) => m.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => config.default_model,
    };
    let working_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(config, &source));

    Ok(WorkItem::new(source, working_dir)
        .with_model(model)
        .with_offset_ms(cli.offset_ms.unwrap_or(config.offset_ms))
        .with_overwrite_policy(overwrite_policy(cli))
        .with_manual_correction(cli.edit))
}

fn exit_code(outcome: &RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Completed(_) => 0,
        RunOutcome::Cancelled(_) => EXIT_CANCELLED,
        RunOutcome::Failed(_) | RunOutcome::AwaitingManualEdit(_) => EXIT_FAILED,
    }
}

/// One spinner per running stage, fed by the pipeline's status events.
struct StageProgress {
    enabled: bool,
    current: Option<ProgressBar>,
}

impl StageProgress {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            current: None,
        }
    }

    fn handle(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::StateChanged(state) => self.enter(*state),
            StatusEvent::StageFinished { stage, elapsed } => {
                if let Some(pb) = self.current.take() {
                    pb.finish_with_message(format!(
                        "✓ {} done ({:.1}s)",
                        stage,
                        elapsed.as_secs_f64()
                    ));
                }
            }
            StatusEvent::CleanupWarning(warning) => {
                if let Some(pb) = &self.current {
                    pb.println(format!("{} {}", style("!").yellow(), warning));
                }
            }
        }
    }

    fn enter(&mut self, state: PipelineState) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
        if !self.enabled
            || state.is_terminal()
            || matches!(state, PipelineState::Idle | PipelineState::AwaitingManualEdit)
        {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(state.label());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current = Some(pb);
    }
}

/// Wait for the worker task while relaying its status events.
async fn drive(
    mut worker: JoinHandle<RunOutcome>,
    status: &mut UnboundedReceiver<StatusEvent>,
    progress: &mut StageProgress,
) -> Result<RunOutcome> {
    loop {
        tokio::select! {
            Some(event) = status.recv() => progress.handle(&event),
            outcome = &mut worker => {
                while let Ok(event) = status.try_recv() {
                    progress.handle(&event);
                }
                return outcome.context("Pipeline task panicked");
            }
        }
    }
}

async fn edit_lyrics(raw: String) -> Result<String> {
    let edited = tokio::task::spawn_blocking(move || {
        dialoguer::Editor::new()
            .extension(".ass")
            .edit(&raw)
            .map(|edited| edited.unwrap_or(raw))
    })
    .await
    .context("Editor task panicked")?;
    Ok(edited?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let (work, config) = match cli.source.as_deref() {
        Some(source) => (build_work_item(&cli, source, &config)?, config),
        None => {
            let result = run_interactive_wizard(config)?;
            let work = result.work.with_overwrite_policy(overwrite_policy(&cli));
            (work, result.config)
        }
    };

    info!("Source:  {}", work.source);
    info!("Folder:  {}", work.working_dir.display());
    info!("Model:   {}", work.model);
    info!("Offset:  {}ms", work.offset_ms);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current stage...");
        handler_token.cancel();
    })
    .context("Failed to install the Ctrl-C handler")?;

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let mut pipeline = Pipeline::new(work, Toolchain::from_config(&config))
        .with_cancel_token(cancel.clone())
        .with_status(status_tx);
    if console::user_attended() {
        pipeline = pipeline.with_overwrite_prompt(Arc::new(ConsolePrompt));
    }

    let mut progress = StageProgress::new(!cli.json);
    let mut outcome = drive(tokio::spawn(pipeline.run()), &mut status_rx, &mut progress).await?;

    while let RunOutcome::AwaitingManualEdit(pending) = outcome {
        println!(
            "{} Lyrics ready for review: {}",
            style("✎").cyan(),
            pending.raw_subtitle_path().display()
        );

        let edited = match edit_lyrics(pending.raw_subtitle().to_string()).await {
            Ok(edited) => Some(edited),
            Err(e) => {
                warn!("Could not open an editor: {}", e);
                None
            }
        };

        outcome = match edited {
            Some(subtitle) if !cancel.is_cancelled() => {
                drive(
                    tokio::spawn(pending.resume(subtitle)),
                    &mut status_rx,
                    &mut progress,
                )
                .await?
            }
            _ => pending.cancel(),
        };
        while let Ok(event) = status_rx.try_recv() {
            progress.handle(&event);
        }
    }

    let code = exit_code(&outcome);
    match outcome {
        RunOutcome::Completed(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                print_summary(&report);
            }
        }
        RunOutcome::Failed(failure) => {
            if cli.json {
                let value = serde_json::json!({
                    "status": "failed",
                    "stage": failure.stage.to_string(),
                    "error": failure.error.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            eprintln!("{} {}", style("✗").red(), failure.error);
        }
        RunOutcome::Cancelled(reason) => {
            if cli.json {
                let value = serde_json::json!({
                    "status": "cancelled",
                    "reason": reason.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            eprintln!("{} {}", style("!").yellow(), reason);
        }
        RunOutcome::AwaitingManualEdit(_) => {}
    }

    Ok(ExitCode::from(code))
}
