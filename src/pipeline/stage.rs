use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use crate::audio::{
    stem_output_dir, AudioExtractor, AudioMetadata, DemucsSeparator, FfmpegExtractor, Separator,
    INSTRUMENTAL_STEM, VOCALS_STEM,
};
use crate::config::{Config, ModelProfile};
use crate::error::{KaraokeError, Result};
use crate::subtitle::{prepare_karaoke_subtitles, SubtitleDocument};
use crate::transcribe::{StableTsTranscriber, Transcriber};
use crate::video::{FfmpegMuxer, Fetcher, MuxRequest, Muxer, YtDlpFetcher};

use super::artifact::{ArtifactKind, ArtifactRegistry};

/// One collaborator-backed unit of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Extract,
    Separate,
    Transcribe,
    Mux,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Separate => "separate",
            Stage::Transcribe => "transcribe",
            Stage::Mux => "mux",
        }
    }

    /// Fold any error raised while this stage ran into the stage's own variant.
    pub fn normalize(self, err: KaraokeError) -> KaraokeError {
        if err.is_stage_error() {
            return err;
        }
        let detail = err.to_string();
        match self {
            Stage::Fetch => KaraokeError::Fetch(detail),
            Stage::Extract => KaraokeError::Extraction(detail),
            Stage::Separate => KaraokeError::Separation(detail),
            Stage::Transcribe => KaraokeError::Transcription(detail),
            Stage::Mux => KaraokeError::Mux(detail),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The external collaborators a pipeline drives.
#[derive(Clone)]
pub struct Toolchain {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub separator: Arc<dyn Separator>,
    pub transcriber: Arc<dyn Transcriber>,
    pub muxer: Arc<dyn Muxer>,
}

impl Toolchain {
    /// The command-line tools named in `config`.
    pub fn from_config(config: &Config) -> Self {
        let tools = &config.tools;
        Self {
            fetcher: Arc::new(YtDlpFetcher::new(&tools.yt_dlp)),
            extractor: Arc::new(FfmpegExtractor::new(&tools.ffmpeg, &tools.ffprobe)),
            separator: Arc::new(DemucsSeparator::new(&tools.demucs, &config.separation_model)),
            transcriber: Arc::new(StableTsTranscriber::new(&tools.stable_ts)),
            muxer: Arc::new(FfmpegMuxer::new(&tools.ffmpeg)),
        }
    }
}

/// Download `locator` into the work item's directory.
pub async fn run_fetch(
    fetcher: &dyn Fetcher,
    locator: &str,
    artifacts: &ArtifactRegistry,
) -> Result<PathBuf> {
    let destination = artifacts.path(ArtifactKind::DownloadedVideo);
    fetcher.fetch(locator, destination).await?;
    Ok(destination.to_path_buf())
}

pub async fn run_extract(
    extractor: &dyn AudioExtractor,
    video: &Path,
    artifacts: &ArtifactRegistry,
) -> Result<AudioMetadata> {
    if !video.exists() {
        return Err(KaraokeError::Extraction(format!(
            "Source video not found: {}",
            video.display()
        )));
    }

    let output = artifacts.path(ArtifactKind::ExtractedAudio);
    extractor.extract(video, output).await
}

/// Split the extracted audio and move the stems to their artifact paths.
pub async fn run_separate(separator: &dyn Separator, artifacts: &ArtifactRegistry) -> Result<()> {
    let audio = artifacts.path(ArtifactKind::ExtractedAudio);
    let launch_dir = artifacts.separation_launch_dir();
    fs::create_dir_all(&launch_dir).await?;

    separator.separate(audio, &launch_dir).await?;

    let produced = stem_output_dir(&launch_dir, separator.model(), audio);
    for (stem, kind) in [
        (VOCALS_STEM, ArtifactKind::VocalStem),
        (INSTRUMENTAL_STEM, ArtifactKind::InstrumentalStem),
    ] {
        let source = produced.join(stem);
        if !source.exists() {
            return Err(KaraokeError::Separation(format!(
                "Expected output {} is missing",
                source.display()
            )));
        }
        let target = artifacts.path(kind);
        fs::rename(&source, target).await?;
        debug!("Moved {} to {}", source.display(), target.display());
    }

    info!("Stems from {} saved successfully", separator.model());
    Ok(())
}

/// Transcribe the vocal stem and persist the prepared subtitle track.
pub async fn run_transcribe(
    transcriber: &dyn Transcriber,
    model: ModelProfile,
    offset_ms: i64,
    artifacts: &ArtifactRegistry,
) -> Result<(String, SubtitleDocument)> {
    let vocals = artifacts.path(ArtifactKind::VocalStem);
    let native = transcriber.transcribe(vocals, model).await?;

    let prepared = prepare_karaoke_subtitles(&native, offset_ms);
    let document = SubtitleDocument::parse(&prepared);
    if document.is_empty() {
        return Err(KaraokeError::Transcription(
            "No lyrics were recognised in the vocal track".to_string(),
        ));
    }

    let raw = artifacts.path(ArtifactKind::RawSubtitle);
    fs::write(raw, &prepared).await?;
    info!("Subtitle file saved to: {} ({} cues)", raw.display(), document.len());

    Ok((prepared, document))
}

pub async fn run_mux(muxer: &dyn Muxer, request: &MuxRequest) -> Result<()> {
    for input in [
        &request.video,
        &request.instrumental,
        &request.original_audio,
        &request.subtitle,
    ] {
        if !input.exists() {
            return Err(KaraokeError::Mux(format!(
                "Input {} is missing",
                input.display()
            )));
        }
    }

    muxer.mux(request).await?;

    if !request.output.exists() {
        return Err(KaraokeError::Mux(format!(
            "{} was not produced",
            request.output.display()
        )));
    }
    Ok(())
}
