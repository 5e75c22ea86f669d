pub mod fetch;
pub mod mux;

pub use fetch::{Fetcher, YtDlpFetcher};
pub use mux::{escape_filter_path, FfmpegMuxer, MuxRequest, Muxer};

use std::fmt;
use std::path::PathBuf;

/// Where the source video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Local(PathBuf),
    Remote(String),
}

impl SourceRef {
    /// `http://` and `https://` locators are remote, anything else is a path.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if is_remote_locator(trimmed) {
            SourceRef::Remote(trimmed.to_string())
        } else {
            SourceRef::Local(PathBuf::from(trimmed))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceRef::Remote(_))
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Local(path) => write!(f, "{}", path.display()),
            SourceRef::Remote(url) => f.write_str(url),
        }
    }
}

pub fn is_remote_locator(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://")) && s.len() > "http://".len()
}
