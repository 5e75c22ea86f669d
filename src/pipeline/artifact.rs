use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::stage::Stage;

/// Directory holding everything the separation stage writes.
pub const SEPARATION_DIR: &str = "separated";

/// A file the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    DownloadedVideo,
    ExtractedAudio,
    VocalStem,
    InstrumentalStem,
    RawSubtitle,
    FinalSubtitle,
    OutputVideo,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 7] = [
        ArtifactKind::DownloadedVideo,
        ArtifactKind::ExtractedAudio,
        ArtifactKind::VocalStem,
        ArtifactKind::InstrumentalStem,
        ArtifactKind::RawSubtitle,
        ArtifactKind::FinalSubtitle,
        ArtifactKind::OutputVideo,
    ];

    pub fn producer(self) -> Stage {
        match self {
            ArtifactKind::DownloadedVideo => Stage::Fetch,
            ArtifactKind::ExtractedAudio => Stage::Extract,
            ArtifactKind::VocalStem | ArtifactKind::InstrumentalStem => Stage::Separate,
            ArtifactKind::RawSubtitle | ArtifactKind::FinalSubtitle => Stage::Transcribe,
            ArtifactKind::OutputVideo => Stage::Mux,
        }
    }

    /// Intermediate artifacts are removed after a successful mux.
    /// The source video and the output video never are.
    pub fn is_intermediate(self) -> bool {
        !matches!(self, ArtifactKind::DownloadedVideo | ArtifactKind::OutputVideo)
    }

    fn relative_path(self, separation_model: &str) -> PathBuf {
        match self {
            ArtifactKind::DownloadedVideo => PathBuf::from("input_video.mp4"),
            ArtifactKind::ExtractedAudio => PathBuf::from("extracted_audio.wav"),
            ArtifactKind::VocalStem => Path::new(SEPARATION_DIR)
                .join(separation_model)
                .join("vocals_final.wav"),
            ArtifactKind::InstrumentalStem => Path::new(SEPARATION_DIR)
                .join(separation_model)
                .join("instruments_final.wav"),
            ArtifactKind::RawSubtitle => PathBuf::from("output.raw.ass"),
            ArtifactKind::FinalSubtitle => PathBuf::from("output.ass"),
            ArtifactKind::OutputVideo => PathBuf::from("output.mp4"),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A resolved artifact location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl Artifact {
    pub fn producer(&self) -> Stage {
        self.kind.producer()
    }

    pub fn is_intermediate(&self) -> bool {
        self.kind.is_intermediate()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Every artifact path of one work item, derived from its working directory.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    root: PathBuf,
    separation_model: String,
    paths: BTreeMap<ArtifactKind, PathBuf>,
}

impl ArtifactRegistry {
    pub fn new(root: impl Into<PathBuf>, separation_model: &str) -> Self {
        let root = root.into();
        let paths = ArtifactKind::ALL
            .iter()
            .map(|&kind| (kind, root.join(kind.relative_path(separation_model))))
            .collect();

        Self {
            root,
            separation_model: separation_model.to_string(),
            paths,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: ArtifactKind) -> &Path {
        // every kind is inserted in `new`
        &self.paths[&kind]
    }

    pub fn get(&self, kind: ArtifactKind) -> Artifact {
        Artifact {
            kind,
            path: self.path(kind).to_path_buf(),
        }
    }

    /// Root of everything the separation stage writes.
    pub fn separation_root(&self) -> PathBuf {
        self.root.join(SEPARATION_DIR)
    }

    /// Directory the separator is launched in: `separated/<model>/`.
    pub fn separation_launch_dir(&self) -> PathBuf {
        self.separation_root().join(&self.separation_model)
    }

    pub fn intermediates(&self) -> impl Iterator<Item = Artifact> + '_ {
        ArtifactKind::ALL
            .into_iter()
            .filter(|k| k.is_intermediate())
            .map(|k| self.get(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_deterministic() {
        let registry = ArtifactRegistry::new("/work", "htdemucs_ft");

        assert_eq!(
            registry.path(ArtifactKind::ExtractedAudio),
            Path::new("/work/extracted_audio.wav")
        );
        assert_eq!(
            registry.path(ArtifactKind::VocalStem),
            Path::new("/work/separated/htdemucs_ft/vocals_final.wav")
        );
        assert_eq!(
            registry.path(ArtifactKind::InstrumentalStem),
            Path::new("/work/separated/htdemucs_ft/instruments_final.wav")
        );
        assert_eq!(
            registry.path(ArtifactKind::OutputVideo),
            Path::new("/work/output.mp4")
        );
        assert_eq!(
            registry.separation_launch_dir(),
            PathBuf::from("/work/separated/htdemucs_ft")
        );
    }

    #[test]
    fn test_paths_are_distinct() {
        let registry = ArtifactRegistry::new("/work", "m");
        let mut paths: Vec<_> = ArtifactKind::ALL.iter().map(|&k| registry.path(k)).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), ArtifactKind::ALL.len());
    }

    #[test]
    fn test_intermediates_exclude_source_and_output() {
        let registry = ArtifactRegistry::new("/work", "m");
        let kinds: Vec<_> = registry.intermediates().map(|a| a.kind).collect();

        assert!(!kinds.contains(&ArtifactKind::OutputVideo));
        assert!(!kinds.contains(&ArtifactKind::DownloadedVideo));
        assert!(kinds.contains(&ArtifactKind::ExtractedAudio));
        assert!(kinds.contains(&ArtifactKind::RawSubtitle));
        assert!(kinds.contains(&ArtifactKind::FinalSubtitle));
    }

    #[test]
    fn test_producers() {
        assert_eq!(ArtifactKind::DownloadedVideo.producer(), Stage::Fetch);
        assert_eq!(ArtifactKind::InstrumentalStem.producer(), Stage::Separate);
        assert_eq!(ArtifactKind::OutputVideo.producer(), Stage::Mux);
    }
}
