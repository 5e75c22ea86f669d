use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::artifact::ArtifactRegistry;

/// A removal that failed after an otherwise successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to remove {}: {}", self.path.display(), self.message)
    }
}

fn warning(path: &Path, err: io::Error) -> CleanupWarning {
    let warning = CleanupWarning {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    warn!("{}", warning);
    warning
}

/// Remove the intermediate artifacts of a finished run.
///
/// Never fails: every removal error is logged and returned as a warning.
pub fn remove_intermediates(artifacts: &ArtifactRegistry) -> Vec<CleanupWarning> {
    let mut warnings = Vec::new();
    let separation_root = artifacts.separation_root();

    for artifact in artifacts.intermediates() {
        // stems go with the whole separation subtree below
        if artifact.path.starts_with(&separation_root) {
            continue;
        }
        match std::fs::remove_file(&artifact.path) {
            Ok(()) => debug!("Removed {} ({})", artifact.path.display(), artifact.kind),
            Err(e) => warnings.push(warning(&artifact.path, e)),
        }
    }

    match std::fs::remove_dir_all(&separation_root) {
        Ok(()) => debug!("Removed {}", separation_root.display()),
        Err(e) => warnings.push(warning(&separation_root, e)),
    }

    warnings
}
