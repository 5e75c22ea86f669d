pub mod audio;
pub mod config;
pub mod error;
pub mod interactive;
pub mod pipeline;
pub mod subtitle;
pub mod tool;
pub mod transcribe;
pub mod video;

pub use config::Config;
pub use error::{KaraokeError, Result};
pub use pipeline::{
    print_summary, CancelToken, Pipeline, PipelineReport, PipelineState, PipelineStats,
    RunOutcome, StatusEvent, Toolchain, WorkItem,
};
