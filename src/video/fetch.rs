use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{KaraokeError, Result};
use crate::tool::{check_tool, run_tool};

use super::is_remote_locator;

/// Prefer an mp4 container so extraction and muxing can read it directly.
const FORMAT_SELECTOR: &str = "bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]/bv*+ba/b";

/// Resolves a remote video locator to a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, locator: &str, destination: &Path) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Downloads with the `yt-dlp` CLI.
pub struct YtDlpFetcher {
    bin: String,
}

impl YtDlpFetcher {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn command(&self, locator: &str, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["--no-playlist", "-f", FORMAT_SELECTOR])
            .args(["--merge-output-format", "mp4", "--force-overwrites", "-o"])
            .arg(destination)
            .arg(locator);
        cmd
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, locator: &str, destination: &Path) -> Result<()> {
        if !is_remote_locator(locator) {
            return Err(KaraokeError::Fetch(format!("Invalid video locator: {locator}")));
        }

        check_tool(&self.bin, "--version")
            .await
            .map_err(KaraokeError::Fetch)?;

        info!("Downloading {}", locator);
        let mut cmd = self.command(locator, destination);
        run_tool("yt-dlp", &mut cmd)
            .await
            .map_err(KaraokeError::Fetch)?;

        if !destination.exists() {
            return Err(KaraokeError::Fetch(format!(
                "No compatible stream found for {locator}"
            )));
        }

        info!("Downloaded video to: {}", destination.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
