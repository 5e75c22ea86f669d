pub mod stable_ts;

pub use stable_ts::StableTsTranscriber;

use crate::config::ModelProfile;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Speech-to-text engine producing word-timed ASS text in its own timestamp grammar.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path, model: ModelProfile) -> Result<String>;
    fn name(&self) -> &'static str;
}
