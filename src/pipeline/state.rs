use std::fmt;

/// Where a work item is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Fetching,
    Extracting,
    Separating,
    Transcribing,
    AwaitingManualEdit,
    Merging,
    CleaningUp,
    Completed,
    Failed,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Failed | PipelineState::Cancelled
        )
    }

    /// Whether a stage can fail out of this state.
    fn runs_stage(self) -> bool {
        matches!(
            self,
            PipelineState::Fetching
                | PipelineState::Extracting
                | PipelineState::Separating
                | PipelineState::Transcribing
                | PipelineState::Merging
        )
    }

    /// The legal edges of the state machine.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }
        match next {
            Cancelled => true,
            Failed => self.runs_stage(),
            Fetching => self == Idle,
            Extracting => matches!(self, Idle | Fetching),
            Separating => self == Extracting,
            Transcribing => self == Separating,
            AwaitingManualEdit => self == Transcribing,
            Merging => matches!(self, Transcribing | AwaitingManualEdit),
            CleaningUp => self == Merging,
            Completed => self == CleaningUp,
            Idle => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Fetching => "Downloading the video...",
            PipelineState::Extracting => "Extracting the audio...",
            PipelineState::Separating => "Removing the vocals...",
            PipelineState::Transcribing => "Transcribing the lyrics...",
            PipelineState::AwaitingManualEdit => "Waiting for lyric corrections...",
            PipelineState::Merging => "Finalizing...",
            PipelineState::CleaningUp => "Cleaning up...",
            PipelineState::Completed => "Processing completed.",
            PipelineState::Failed => "Processing failed.",
            PipelineState::Cancelled => "Processing was stopped.",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineState::*;
    use super::*;

    const ALL: [PipelineState; 11] = [
        Idle,
        Fetching,
        Extracting,
        Separating,
        Transcribing,
        AwaitingManualEdit,
        Merging,
        CleaningUp,
        Completed,
        Failed,
        Cancelled,
    ];

    #[test]
    fn test_happy_paths() {
        let local = [Idle, Extracting, Separating, Transcribing, Merging, CleaningUp, Completed];
        let remote_with_edit = [
            Idle,
            Fetching,
            Extracting,
            Separating,
            Transcribing,
            AwaitingManualEdit,
            Merging,
            CleaningUp,
            Completed,
        ];

        for path in [&local[..], &remote_with_edit[..]] {
            for pair in path.windows(2) {
                assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for state in ALL {
            assert_eq!(state.can_transition_to(Cancelled), !state.is_terminal());
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [Completed, Failed, Cancelled] {
            for to in ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_fail_only_from_stages() {
        assert!(Separating.can_transition_to(Failed));
        assert!(Merging.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Failed));
        assert!(!AwaitingManualEdit.can_transition_to(Failed));
        assert!(!CleaningUp.can_transition_to(Failed));
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!Idle.can_transition_to(Separating));
        assert!(!Extracting.can_transition_to(Transcribing));
        assert!(!Separating.can_transition_to(Merging));
        assert!(!Merging.can_transition_to(Completed));
    }
}
