use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{KaraokeError, Result};
use crate::tool::{check_tool, run_tool};

const VIDEO_CODEC: &str = "libx264";
const AUDIO_CODEC: &str = "aac";

/// Inputs for the final karaoke video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxRequest {
    /// Picture source.
    pub video: PathBuf,
    /// Becomes audio track 1, "Instrumental".
    pub instrumental: PathBuf,
    /// Becomes audio track 2, "Original".
    pub original_audio: PathBuf,
    /// Burned into the picture.
    pub subtitle: PathBuf,
    pub output: PathBuf,
    /// Replace `output` if it exists; otherwise the muxer refuses to.
    pub overwrite: bool,
}

/// Combines picture, stems and subtitles into the output video.
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, request: &MuxRequest) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Escape a path for use inside an ffmpeg filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
}

/// ffmpeg arguments for `request`, without the program name.
pub fn mux_args(request: &MuxRequest) -> Vec<OsString> {
    let filter = format!("ass='{}'", escape_filter_path(&request.subtitle));

    let mut args: Vec<OsString> = Vec::new();
    for input in [&request.video, &request.instrumental, &request.original_audio] {
        args.push("-i".into());
        args.push(input.into());
    }
    let options = [
        ("-vf", filter.as_str()),
        ("-map", "0:v:0"),
        ("-map", "1:a:0"),
        ("-map", "2:a:0"),
        ("-c:v", VIDEO_CODEC),
        ("-c:a", AUDIO_CODEC),
        ("-metadata:s:a:0", "title=Instrumental"),
        ("-metadata:s:a:1", "title=Original"),
    ];
    for (flag, value) in options {
        args.push(flag.into());
        args.push(value.into());
    }
    args.push(if request.overwrite { "-y" } else { "-n" }.into());
    args.push(request.output.as_os_str().to_owned());
    args
}

pub struct FfmpegMuxer {
    ffmpeg: String,
}

impl FfmpegMuxer {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, request: &MuxRequest) -> Result<()> {
        check_tool(&self.ffmpeg, "-version")
            .await
            .map_err(KaraokeError::Mux)?;

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(mux_args(request));

        info!("Muxing karaoke video into {}", request.output.display());
        run_tool("ffmpeg", &mut cmd)
            .await
            .map_err(KaraokeError::Mux)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
