use crate::config::ModelProfile;
use crate::error::{KaraokeError, Result};
use crate::tool::{check_tool, run_tool};
use crate::transcribe::Transcriber;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// Name of the engine output inside its scratch directory.
const TRANSCRIPT_FILE: &str = "transcript.ass";

/// Whisper with stable timestamps, driven through the `stable-ts` CLI.
pub struct StableTsTranscriber {
    bin: String,
}

impl StableTsTranscriber {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn command(&self, audio: &Path, model: ModelProfile, output: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg(audio)
            .args(["--model", model.as_str()])
            .args(["--word_level", "true"])
            .args(["--vad", "true"])
            .args(["--suppress_silence", "true"])
            .args(["--ts_num", "16"])
            .arg("--output")
            .arg(output);
        cmd
    }
}

impl Default for StableTsTranscriber {
    fn default() -> Self {
        Self::new("stable-ts")
    }
}

#[async_trait]
impl Transcriber for StableTsTranscriber {
    async fn transcribe(&self, audio: &Path, model: ModelProfile) -> Result<String> {
        check_tool(&self.bin, "--help")
            .await
            .map_err(KaraokeError::Transcription)?;

        if !audio.exists() {
            return Err(KaraokeError::FileNotFound(audio.display().to_string()));
        }

        let scratch = tempfile::Builder::new().prefix("karaoke-transcript").tempdir()?;
        let output = scratch.path().join(TRANSCRIPT_FILE);
        debug!("Using scratch directory: {:?}", scratch.path());

        info!("Transcribing {} with model {}", audio.display(), model);
        let mut cmd = self.command(audio, model, &output);
        run_tool("stable-ts", &mut cmd)
            .await
            .map_err(KaraokeError::Transcription)?;

        let content = fs::read_to_string(&output).await.map_err(|e| {
            KaraokeError::Transcription(format!("Engine produced no readable output: {e}"))
        })?;

        Ok(content)
    }

    fn name(&self) -> &'static str {
        "stable-ts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_arguments() {
        let transcriber = StableTsTranscriber::default();
        let cmd = transcriber.command(
            Path::new("vocals_final.wav"),
            ModelProfile::Medium,
            Path::new("/tmp/x/transcript.ass"),
        );

        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "vocals_final.wav",
                "--model",
                "medium",
                "--word_level",
                "true",
                "--vad",
                "true",
                "--suppress_silence",
                "true",
                "--ts_num",
                "16",
                "--output",
                "/tmp/x/transcript.ass"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let transcriber = StableTsTranscriber::new("no-such-stable-ts");
        let result = transcriber
            .transcribe(Path::new("vocals.wav"), ModelProfile::Tiny)
            .await;
        assert!(matches!(result, Err(KaraokeError::Transcription(_))));
    }
}
