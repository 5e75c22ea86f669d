use thiserror::Error;

#[derive(Error, Debug)]
pub enum KaraokeError {
    #[error("Video download failed: {0}")]
    Fetch(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("Source separation failed: {0}")]
    Separation(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Muxing failed: {0}")]
    Mux(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KaraokeError {
    /// Whether this error already belongs to one of the pipeline stages.
    pub fn is_stage_error(&self) -> bool {
        matches!(
            self,
            KaraokeError::Fetch(_)
                | KaraokeError::Extraction(_)
                | KaraokeError::Separation(_)
                | KaraokeError::Transcription(_)
                | KaraokeError::Mux(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, KaraokeError>;
