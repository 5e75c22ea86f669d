use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{KaraokeError, Result};
use crate::tool::{check_tool, run_tool};

use super::AudioMetadata;

/// Sample rate of the extracted track; demucs models are trained at 44.1kHz.
pub const EXTRACT_SAMPLE_RATE: u32 = 44_100;

/// Channel count of the extracted track.
pub const EXTRACT_CHANNELS: u16 = 2;

/// Pulls the audio track out of a video container into a PCM WAV file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video: &Path, output: &Path) -> Result<AudioMetadata>;
    fn name(&self) -> &'static str;
}

pub struct FfmpegExtractor {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

/// Check that `input` is a readable container with at least one audio stream.
pub async fn probe_audio_stream(ffprobe: &str, input: &Path) -> Result<()> {
    let mut cmd = Command::new(ffprobe);
    cmd.args([
        "-v",
        "error",
        "-select_streams",
        "a:0",
        "-show_entries",
        "stream=codec_type",
        "-of",
        "csv=p=0",
    ])
    .arg(input);

    let output = run_tool("ffprobe", &mut cmd)
        .await
        .map_err(|e| KaraokeError::Extraction(format!("Cannot read container: {e}")))?;

    let streams = String::from_utf8_lossy(&output.stdout);
    if !streams.lines().any(|l| l.trim() == "audio") {
        return Err(KaraokeError::Extraction(format!(
            "{} has no audio track",
            input.display()
        )));
    }

    Ok(())
}

/// Read format information from a PCM WAV header.
pub fn read_wav_metadata(path: &Path) -> Result<AudioMetadata> {
    let reader = hound::WavReader::open(path).map_err(|e| {
        KaraokeError::Extraction(format!("{} is not a valid WAV file: {e}", path.display()))
    })?;

    let spec = reader.spec();
    let duration = if spec.sample_rate == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(f64::from(reader.duration()) / f64::from(spec.sample_rate))
    };

    Ok(AudioMetadata {
        duration,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, video: &Path, output: &Path) -> Result<AudioMetadata> {
        check_tool(&self.ffmpeg, "-version")
            .await
            .map_err(KaraokeError::Extraction)?;

        if !video.exists() {
            return Err(KaraokeError::FileNotFound(video.display().to_string()));
        }

        info!("Extracting audio from {}", video.display());
        probe_audio_stream(&self.ffprobe, video).await?;

        let sample_rate = EXTRACT_SAMPLE_RATE.to_string();
        let channels = EXTRACT_CHANNELS.to_string();

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-i"])
            .arg(video)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
            .arg(&sample_rate)
            .arg("-ac")
            .arg(&channels)
            .arg(output);

        run_tool("ffmpeg", &mut cmd)
            .await
            .map_err(KaraokeError::Extraction)?;

        if !output.exists() {
            return Err(KaraokeError::Extraction(
                "Output file was not created".to_string(),
            ));
        }

        let metadata = read_wav_metadata(output)?;
        debug!("Extracted audio: {:?}", metadata);
        info!("Audio extracted to {}", output.display());

        Ok(metadata)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn ffmpeg_available() -> bool {
        ["ffmpeg", "ffprobe"].iter().all(|bin| {
            StdCommand::new(bin)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * u32::from(channels) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_read_wav_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_seconds.wav");
        write_wav(&path, 8_000, 2, 16_000);

        let metadata = read_wav_metadata(&path).unwrap();
        assert_eq!(metadata.sample_rate, 8_000);
        assert_eq!(metadata.channels, 2);
        assert_eq!(metadata.duration, Duration::from_secs(2));
    }

    #[test]
    fn test_read_wav_metadata_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_audio.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();

        assert!(matches!(
            read_wav_metadata(&path),
            Err(KaraokeError::Extraction(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_audio_file_not_found() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let result = FfmpegExtractor::default()
            .extract(Path::new("/nonexistent/file.mp4"), &dir.path().join("out.wav"))
            .await;

        match result {
            Err(KaraokeError::FileNotFound(path)) => assert!(path.contains("nonexistent")),
            Err(other) => panic!("Expected FileNotFound error, got: {other}"),
            Ok(_) => panic!("Expected error but got Ok"),
        }
    }

    #[tokio::test]
    async fn test_extract_rejects_video_without_audio() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("silent.mp4");
        let status = StdCommand::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "lavfi",
                "-i",
                "color=c=black:s=64x64:d=1",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&video)
            .output()
            .unwrap();
        if !status.status.success() {
            eprintln!("Skipping test: cannot synthesize test video");
            return;
        }

        let result = FfmpegExtractor::default()
            .extract(&video, &dir.path().join("out.wav"))
            .await;
        assert!(matches!(result, Err(KaraokeError::Extraction(msg)) if msg.contains("no audio")));
    }

    #[tokio::test]
    async fn test_extract_writes_stereo_wav() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("tone.mp4");
        let status = StdCommand::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "lavfi",
                "-i",
                "color=c=black:s=64x64:d=1",
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=440:duration=1",
                "-pix_fmt",
                "yuv420p",
                "-shortest",
            ])
            .arg(&video)
            .output()
            .unwrap();
        if !status.status.success() {
            eprintln!("Skipping test: cannot synthesize test video");
            return;
        }

        let output = dir.path().join("out.wav");
        let metadata = FfmpegExtractor::default().extract(&video, &output).await.unwrap();
        assert_eq!(metadata.sample_rate, EXTRACT_SAMPLE_RATE);
        assert_eq!(metadata.channels, EXTRACT_CHANNELS);
        assert!(output.exists());
    }
}
