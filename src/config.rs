use crate::error::{KaraokeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default subtitle delay compensating the lag between vocal onset and perceived sync.
pub const DEFAULT_OFFSET_MS: i64 = 750;

/// Demucs model used for the vocals / accompaniment split.
pub const DEFAULT_SEPARATION_MODEL: &str = "htdemucs_ft";

/// Transcription model profile, smallest and fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelProfile {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[default]
    #[serde(rename = "large-v3")]
    LargeV3,
}

impl ModelProfile {
    pub const ALL: [ModelProfile; 5] = [
        ModelProfile::Tiny,
        ModelProfile::Base,
        ModelProfile::Small,
        ModelProfile::Medium,
        ModelProfile::LargeV3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProfile::Tiny => "tiny",
            ModelProfile::Base => "base",
            ModelProfile::Small => "small",
            ModelProfile::Medium => "medium",
            ModelProfile::LargeV3 => "large-v3",
        }
    }
}

impl std::fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelProfile::Tiny),
            "base" => Ok(ModelProfile::Base),
            "small" => Ok(ModelProfile::Small),
            "medium" => Ok(ModelProfile::Medium),
            "large-v3" | "large" => Ok(ModelProfile::LargeV3),
            _ => Err(format!(
                "Unknown model: {}. Use 'tiny', 'base', 'small', 'medium' or 'large-v3'",
                s
            )),
        }
    }
}

/// What to do when the output video already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Ask the front-end; without an explicit yes the run is cancelled.
    #[default]
    Abort,
    Overwrite,
}

impl std::fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverwritePolicy::Abort => write!(f, "abort"),
            OverwritePolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Locations of the external tools the pipeline drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub demucs: String,
    pub stable_ts: String,
    pub yt_dlp: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            demucs: "demucs".to_string(),
            stable_ts: "stable-ts".to_string(),
            yt_dlp: "yt-dlp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_model: ModelProfile,
    pub offset_ms: i64,
    pub separation_model: String,
    pub output_dir: Option<PathBuf>,
    pub tools: ToolPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: ModelProfile::default(),
            offset_ms: DEFAULT_OFFSET_MS,
            separation_model: DEFAULT_SEPARATION_MODEL.to_string(),
            output_dir: None,
            tools: ToolPaths::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = Self::from_toml(&contents)?;
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Override fields from `KARAOKE_*` variables; unparsable values are ignored.
    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = var("KARAOKE_MODEL") {
            if let Ok(m) = model.parse() {
                self.default_model = m;
            }
        }
        if let Some(offset) = var("KARAOKE_OFFSET_MS") {
            if let Ok(o) = offset.trim().parse() {
                self.offset_ms = o;
            }
        }
        if let Some(model) = var("KARAOKE_SEPARATION_MODEL") {
            self.separation_model = model;
        }
        if let Some(dir) = var("KARAOKE_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(bin) = var("KARAOKE_FFMPEG") {
            self.tools.ffmpeg = bin;
        }
        if let Some(bin) = var("KARAOKE_FFPROBE") {
            self.tools.ffprobe = bin;
        }
        if let Some(bin) = var("KARAOKE_DEMUCS") {
            self.tools.demucs = bin;
        }
        if let Some(bin) = var("KARAOKE_STABLE_TS") {
            self.tools.stable_ts = bin;
        }
        if let Some(bin) = var("KARAOKE_YT_DLP") {
            self.tools.yt_dlp = bin;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.separation_model.trim().is_empty() {
            return Err(KaraokeError::Config(
                "separation_model must not be empty".to_string(),
            ));
        }

        let tools = [
            ("ffmpeg", &self.tools.ffmpeg),
            ("ffprobe", &self.tools.ffprobe),
            ("demucs", &self.tools.demucs),
            ("stable_ts", &self.tools.stable_ts),
            ("yt_dlp", &self.tools.yt_dlp),
        ];
        for (name, bin) in tools {
            if bin.trim().is_empty() {
                return Err(KaraokeError::Config(format!(
                    "tools.{name} must not be empty"
                )));
            }
        }

        Ok(())
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("karaoke").join("config.toml"))
    }
}
