use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{KaraokeError, Result};
use crate::tool::{check_tool, run_tool};

/// File name demucs gives the isolated vocals.
pub const VOCALS_STEM: &str = "vocals.wav";

/// File name demucs gives everything but the vocals.
pub const INSTRUMENTAL_STEM: &str = "no_vocals.wav";

/// Splits a mix into a vocal stem and an instrumental stem.
///
/// Implementations write their stems under `launch_dir`, at
/// [`stem_output_dir`]`(launch_dir, model, audio)`.
#[async_trait]
pub trait Separator: Send + Sync {
    async fn separate(&self, audio: &Path, launch_dir: &Path) -> Result<()>;
    fn model(&self) -> &str;
}

/// Where a demucs-style separator leaves the stems for `audio`:
/// `<launch_dir>/separated/<model>/<audio file stem>/`.
pub fn stem_output_dir(launch_dir: &Path, model: &str, audio: &Path) -> PathBuf {
    let track = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    launch_dir.join("separated").join(model).join(track)
}

/// Runs the `demucs` CLI in two-stem mode.
pub struct DemucsSeparator {
    bin: String,
    model: String,
}

impl DemucsSeparator {
    pub fn new(bin: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            model: model.into(),
        }
    }

    fn command(&self, audio: &Path, launch_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-n", &self.model, "--two-stems", "vocals", "--float32"])
            .arg(audio)
            // demucs writes relative to its cwd; only the child's cwd changes
            .current_dir(launch_dir);
        cmd
    }
}

#[async_trait]
impl Separator for DemucsSeparator {
    async fn separate(&self, audio: &Path, launch_dir: &Path) -> Result<()> {
        check_tool(&self.bin, "--help")
            .await
            .map_err(KaraokeError::Separation)?;

        let audio = std::path::absolute(audio)?;
        info!(
            "Separating vocals from {} with model {}",
            audio.display(),
            self.model
        );

        let mut cmd = self.command(&audio, launch_dir);
        run_tool("demucs", &mut cmd)
            .await
            .map_err(KaraokeError::Separation)?;

        info!("Processed with model: {}", self.model);
        Ok(())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_output_dir() {
        let dir = stem_output_dir(
            Path::new("/work/separated/htdemucs_ft"),
            "htdemucs_ft",
            Path::new("/work/extracted_audio.wav"),
        );
        assert_eq!(
            dir,
            PathBuf::from("/work/separated/htdemucs_ft/separated/htdemucs_ft/extracted_audio")
        );
    }

    #[test]
    fn test_command_runs_in_launch_dir() {
        let separator = DemucsSeparator::new("demucs", "htdemucs_ft");
        let cmd = separator.command(Path::new("/work/a.wav"), Path::new("/work/sep"));
        let std_cmd = cmd.as_std();

        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["-n", "htdemucs_ft", "--two-stems", "vocals", "--float32", "/work/a.wav"]
        );
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/work/sep")));
    }

    #[tokio::test]
    async fn test_missing_binary_is_separation_error() {
        let dir = tempfile::tempdir().unwrap();
        let separator = DemucsSeparator::new("no-such-demucs-binary", "htdemucs_ft");

        let result = separator
            .separate(&dir.path().join("a.wav"), dir.path())
            .await;
        assert!(matches!(result, Err(KaraokeError::Separation(_))));
    }
}
