pub mod extract;
pub mod separate;

pub use extract::{probe_audio_stream, read_wav_metadata, AudioExtractor, FfmpegExtractor};
pub use separate::{stem_output_dir, DemucsSeparator, Separator, INSTRUMENTAL_STEM, VOCALS_STEM};

use std::time::Duration;

/// Metadata about an audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}
