pub mod artifact;
pub mod cleanup;
pub mod stage;
pub mod state;

pub use artifact::{Artifact, ArtifactKind, ArtifactRegistry};
pub use cleanup::CleanupWarning;
pub use stage::{Stage, Toolchain};
pub use state::PipelineState;

use crate::config::{ModelProfile, OverwritePolicy, DEFAULT_OFFSET_MS};
use crate::error::{KaraokeError, Result};
use crate::video::{MuxRequest, SourceRef};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

/// One video to turn into a karaoke video.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub source: SourceRef,
    /// Owned exclusively by this item while the pipeline runs.
    pub working_dir: PathBuf,
    pub model: ModelProfile,
    /// Applied to every subtitle timestamp.
    pub offset_ms: i64,
    pub overwrite_policy: OverwritePolicy,
    /// Pause after transcription so the lyrics can be corrected.
    pub manual_correction: bool,
}

impl WorkItem {
    pub fn new(source: SourceRef, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            working_dir: working_dir.into(),
            model: ModelProfile::default(),
            offset_ms: DEFAULT_OFFSET_MS,
            overwrite_policy: OverwritePolicy::default(),
            manual_correction: false,
        }
    }

    pub fn with_model(mut self, model: ModelProfile) -> Self {
        self.model = model;
        self
    }

    pub fn with_offset_ms(mut self, offset_ms: i64) -> Self {
        self.offset_ms = offset_ms;
        self
    }

    pub fn with_overwrite_policy(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite_policy = policy;
        self
    }

    pub fn with_manual_correction(mut self, enabled: bool) -> Self {
        self.manual_correction = enabled;
        self
    }
}

/// Shared flag asking the pipeline to stop at the next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress published by the worker for the control side.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    StateChanged(PipelineState),
    StageFinished { stage: Stage, elapsed: Duration },
    CleanupWarning(CleanupWarning),
}

/// Asked before an existing output video is replaced.
#[async_trait]
pub trait OverwritePrompt: Send + Sync {
    async fn confirm_overwrite(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Cancellation was requested through the token or at the edit pause.
    Requested,
    /// The output exists and nobody agreed to overwrite it.
    OverwriteDeclined,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "Processing was stopped."),
            CancelReason::OverwriteDeclined => write!(f, "Processing aborted by user."),
        }
    }
}

#[derive(Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    pub error: KaraokeError,
}

/// Statistics from one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Wall time from start to completion, including any edit pause.
    pub total_time: Duration,
    /// Time spent in each stage, in execution order.
    pub stage_times: Vec<(Stage, Duration)>,
    /// Duration of the extracted audio.
    pub audio_duration: Option<Duration>,
    /// Cues in the transcribed subtitle track.
    pub cue_count: usize,
}

impl PipelineStats {
    pub fn stage_time(&self, stage: Stage) -> Option<Duration> {
        self.stage_times
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, d)| *d)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub output_path: PathBuf,
    pub stats: PipelineStats,
    pub cleanup_warnings: Vec<CleanupWarning>,
}

impl PipelineReport {
    pub fn to_json(&self) -> serde_json::Value {
        let stages: serde_json::Map<String, serde_json::Value> = self
            .stats
            .stage_times
            .iter()
            .map(|(stage, d)| (stage.to_string(), serde_json::json!(d.as_secs_f64())))
            .collect();

        serde_json::json!({
            "output": self.output_path.display().to_string(),
            "cues": self.stats.cue_count,
            "audio_seconds": self.stats.audio_duration.map(|d| d.as_secs_f64()),
            "total_seconds": self.stats.total_time.as_secs_f64(),
            "stage_seconds": stages,
            "cleanup_warnings": self
                .cleanup_warnings
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>(),
        })
    }
}

/// How a call to [`Pipeline::run`] or [`PendingEdit::resume`] ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(PipelineReport),
    /// Suspended for manual lyric correction.
    AwaitingManualEdit(PendingEdit),
    Failed(StageFailure),
    Cancelled(CancelReason),
}

impl RunOutcome {
    pub fn state(&self) -> PipelineState {
        match self {
            RunOutcome::Completed(_) => PipelineState::Completed,
            RunOutcome::AwaitingManualEdit(_) => PipelineState::AwaitingManualEdit,
            RunOutcome::Failed(_) => PipelineState::Failed,
            RunOutcome::Cancelled(_) => PipelineState::Cancelled,
        }
    }
}

/// A pipeline paused after transcription, holding the subtitle to correct.
pub struct PendingEdit {
    pipeline: Pipeline,
    raw_subtitle: String,
}

impl PendingEdit {
    pub fn raw_subtitle(&self) -> &str {
        &self.raw_subtitle
    }

    pub fn raw_subtitle_path(&self) -> &Path {
        self.pipeline.artifacts.path(ArtifactKind::RawSubtitle)
    }

    /// Continue with `subtitle` as the final subtitle track.
    pub async fn resume(self, subtitle: String) -> RunOutcome {
        self.pipeline.finish(subtitle).await
    }

    pub fn cancel(self) -> RunOutcome {
        self.pipeline.halt(Halt::Cancelled(CancelReason::Requested))
    }
}

impl fmt::Debug for PendingEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEdit")
            .field("raw_subtitle_path", &self.raw_subtitle_path())
            .field("raw_subtitle_len", &self.raw_subtitle.len())
            .finish()
    }
}

/// Why the pipeline stopped short of completion.
enum Halt {
    Cancelled(CancelReason),
    Failed(StageFailure),
}

/// What to do once transcription is done.
enum Next {
    Edit(String),
    Merge(String),
}

/// Drives one [`WorkItem`] through the stages.
pub struct Pipeline {
    work: WorkItem,
    artifacts: ArtifactRegistry,
    tools: Toolchain,
    state: PipelineState,
    cancel: CancelToken,
    status: Option<UnboundedSender<StatusEvent>>,
    prompt: Option<Arc<dyn OverwritePrompt>>,
    stats: PipelineStats,
    started: Instant,
}

impl Pipeline {
    pub fn new(work: WorkItem, tools: Toolchain) -> Self {
        let artifacts = ArtifactRegistry::new(&work.working_dir, tools.separator.model());
        Self {
            work,
            artifacts,
            tools,
            state: PipelineState::Idle,
            cancel: CancelToken::new(),
            status: None,
            prompt: None,
            stats: PipelineStats::default(),
            started: Instant::now(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_status(mut self, status: UnboundedSender<StatusEvent>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_overwrite_prompt(mut self, prompt: Arc<dyn OverwritePrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn work_item(&self) -> &WorkItem {
        &self.work
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    /// Run every stage up to completion, or up to the manual edit pause.
    pub async fn run(mut self) -> RunOutcome {
        self.started = Instant::now();
        info!("Processing {} in {}", self.work.source, self.work.working_dir.display());

        let next = self.process().await;
        match next {
            Ok(Next::Edit(raw_subtitle)) => RunOutcome::AwaitingManualEdit(PendingEdit {
                pipeline: self,
                raw_subtitle,
            }),
            Ok(Next::Merge(subtitle)) => self.finish(subtitle).await,
            Err(halt) => self.halt(halt),
        }
    }

    fn source_video(&self) -> PathBuf {
        match &self.work.source {
            SourceRef::Local(path) => path.clone(),
            SourceRef::Remote(_) => self
                .artifacts
                .path(ArtifactKind::DownloadedVideo)
                .to_path_buf(),
        }
    }

    async fn process(&mut self) -> std::result::Result<Next, Halt> {
        let tools = self.tools.clone();
        let artifacts = self.artifacts.clone();

        if let SourceRef::Remote(locator) = self.work.source.clone() {
            self.checkpoint()?;
            self.enter(PipelineState::Fetching);
            self.execute(Stage::Fetch, async {
                fs::create_dir_all(artifacts.root()).await?;
                stage::run_fetch(tools.fetcher.as_ref(), &locator, &artifacts).await
            })
            .await?;
        }

        self.checkpoint()?;
        self.enter(PipelineState::Extracting);
        let video = self.source_video();
        let metadata = self
            .execute(Stage::Extract, async {
                fs::create_dir_all(artifacts.root()).await?;
                stage::run_extract(tools.extractor.as_ref(), &video, &artifacts).await
            })
            .await?;
        self.stats.audio_duration = Some(metadata.duration);

        self.checkpoint()?;
        self.enter(PipelineState::Separating);
        self.execute(
            Stage::Separate,
            stage::run_separate(tools.separator.as_ref(), &artifacts),
        )
        .await?;

        self.checkpoint()?;
        self.enter(PipelineState::Transcribing);
        let (model, offset_ms) = (self.work.model, self.work.offset_ms);
        let (subtitle, document) = self
            .execute(
                Stage::Transcribe,
                stage::run_transcribe(tools.transcriber.as_ref(), model, offset_ms, &artifacts),
            )
            .await?;
        self.stats.cue_count = document.len();

        self.checkpoint()?;
        if self.work.manual_correction {
            self.enter(PipelineState::AwaitingManualEdit);
            info!("Waiting for lyric corrections");
            Ok(Next::Edit(subtitle))
        } else {
            Ok(Next::Merge(subtitle))
        }
    }

    async fn finish(mut self, subtitle: String) -> RunOutcome {
        match self.merge(subtitle).await {
            Ok(()) => self.complete(),
            Err(halt) => self.halt(halt),
        }
    }

    async fn merge(&mut self, subtitle: String) -> std::result::Result<(), Halt> {
        self.checkpoint()?;

        let output = self.artifacts.path(ArtifactKind::OutputVideo).to_path_buf();
        let overwrite = if output.exists() {
            self.decide_overwrite(&output).await?
        } else {
            false
        };

        self.enter(PipelineState::Merging);
        let final_subtitle = self.artifacts.path(ArtifactKind::FinalSubtitle).to_path_buf();
        let request = MuxRequest {
            video: self.source_video(),
            instrumental: self.artifacts.path(ArtifactKind::InstrumentalStem).to_path_buf(),
            original_audio: self.artifacts.path(ArtifactKind::ExtractedAudio).to_path_buf(),
            subtitle: final_subtitle.clone(),
            output,
            overwrite,
        };
        let muxer = self.tools.muxer.clone();

        self.execute(Stage::Mux, async {
            fs::write(&final_subtitle, subtitle).await?;
            stage::run_mux(muxer.as_ref(), &request).await
        })
        .await
    }

    async fn decide_overwrite(&self, output: &Path) -> std::result::Result<bool, Halt> {
        if self.work.overwrite_policy == OverwritePolicy::Overwrite {
            info!("Overwriting existing {}", output.display());
            return Ok(true);
        }

        let confirmed = match &self.prompt {
            Some(prompt) => prompt.confirm_overwrite(output).await,
            None => false,
        };
        if confirmed {
            Ok(true)
        } else {
            info!("{} already exists, not overwriting", output.display());
            Err(Halt::Cancelled(CancelReason::OverwriteDeclined))
        }
    }

    fn complete(mut self) -> RunOutcome {
        self.enter(PipelineState::CleaningUp);
        let cleanup_warnings = cleanup::remove_intermediates(&self.artifacts);
        for warning in &cleanup_warnings {
            self.emit(StatusEvent::CleanupWarning(warning.clone()));
        }
        if cleanup_warnings.is_empty() {
            info!("Temporary files cleaned up.");
        }

        self.enter(PipelineState::Completed);
        self.stats.total_time = self.started.elapsed();

        let output_path = self.artifacts.path(ArtifactKind::OutputVideo).to_path_buf();
        info!("Karaoke video written to {}", output_path.display());

        RunOutcome::Completed(PipelineReport {
            output_path,
            stats: self.stats,
            cleanup_warnings,
        })
    }

    fn halt(mut self, halt: Halt) -> RunOutcome {
        match halt {
            Halt::Cancelled(reason) => {
                info!("{}", reason);
                self.enter(PipelineState::Cancelled);
                RunOutcome::Cancelled(reason)
            }
            Halt::Failed(failure) => {
                error!("{}", failure);
                self.enter(PipelineState::Failed);
                RunOutcome::Failed(failure)
            }
        }
    }

    fn checkpoint(&self) -> std::result::Result<(), Halt> {
        if self.cancel.is_cancelled() {
            Err(Halt::Cancelled(CancelReason::Requested))
        } else {
            Ok(())
        }
    }

    /// Await one stage, recording its time or turning its error into a failure.
    async fn execute<T, F>(&mut self, stage: Stage, work: F) -> std::result::Result<T, Halt>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = work.await;
        let elapsed = start.elapsed();

        match result {
            Ok(value) => {
                info!("Stage {} finished in {:.2}s", stage, elapsed.as_secs_f64());
                self.stats.stage_times.push((stage, elapsed));
                self.emit(StatusEvent::StageFinished { stage, elapsed });
                Ok(value)
            }
            // a tool interrupted by the same Ctrl-C that cancelled the run
            Err(e) if self.cancel.is_cancelled() => {
                info!("Stage {} interrupted by cancellation: {}", stage, e);
                Err(Halt::Cancelled(CancelReason::Requested))
            }
            Err(e) => Err(Halt::Failed(StageFailure {
                stage,
                error: stage.normalize(e),
            })),
        }
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("State {} -> {}", self.state, next);
        self.state = next;
        self.emit(StatusEvent::StateChanged(next));
    }

    fn emit(&self, event: StatusEvent) {
        if let Some(status) = &self.status {
            // the receiver may already be gone
            let _ = status.send(event);
        }
    }
}

pub fn print_summary(report: &PipelineReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                     Karaoke Video Complete                     ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", report.output_path.display());
    println!("  Cues:       {}", report.stats.cue_count);
    if let Some(duration) = report.stats.audio_duration {
        println!("  Duration:   {:.1}s audio", duration.as_secs_f64());
    }
    println!();
    println!("  Timing:");
    for (stage, elapsed) in &report.stats.stage_times {
        println!("    {:<12} {:.2}s", format!("{}:", stage), elapsed.as_secs_f64());
    }
    println!("    {:<12} {:.2}s", "total:", report.stats.total_time.as_secs_f64());
    if !report.cleanup_warnings.is_empty() {
        println!();
        println!("  Left behind:");
        for warning in &report.cleanup_warnings {
            println!("    {}", warning.path.display());
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_defaults() {
        let item = WorkItem::new(SourceRef::parse("song.mp4"), "/out");
        assert_eq!(item.model, ModelProfile::LargeV3);
        assert_eq!(item.offset_ms, 750);
        assert_eq!(item.overwrite_policy, OverwritePolicy::Abort);
        assert!(!item.manual_correction);
    }

    #[test]
    fn test_work_item_builder() {
        let item = WorkItem::new(SourceRef::parse("https://example.com/v"), "/out")
            .with_model(ModelProfile::Small)
            .with_offset_ms(-100)
            .with_overwrite_policy(OverwritePolicy::Overwrite)
            .with_manual_correction(true);

        assert!(item.source.is_remote());
        assert_eq!(item.model, ModelProfile::Small);
        assert_eq!(item.offset_ms, -100);
        assert_eq!(item.overwrite_policy, OverwritePolicy::Overwrite);
        assert!(item.manual_correction);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_report_json() {
        let report = PipelineReport {
            output_path: PathBuf::from("/out/output.mp4"),
            stats: PipelineStats {
                total_time: Duration::from_secs(30),
                stage_times: vec![(Stage::Extract, Duration::from_secs(2))],
                audio_duration: Some(Duration::from_secs(10)),
                cue_count: 12,
            },
            cleanup_warnings: Vec::new(),
        };

        let json = report.to_json();
        assert_eq!(json["output"], "/out/output.mp4");
        assert_eq!(json["cues"], 12);
        assert_eq!(json["stage_seconds"]["extract"], 2.0);
        assert_eq!(report.stats.stage_time(Stage::Extract), Some(Duration::from_secs(2)));
        assert_eq!(report.stats.stage_time(Stage::Mux), None);
    }
}
