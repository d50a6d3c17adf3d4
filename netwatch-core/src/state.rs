/// Lifecycle of a trial session
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Rendering,
    Animating,
    AwaitingAllCompletions,
    Submitting,
    Done,
    /// Submission failed; the error was logged and the session stays here.
    Failed,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl SessionState {
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Animating | Self::AwaitingAllCompletions)
    }

    pub fn collects_gaze(&self) -> bool {
        matches!(
            self,
            Self::Rendering | Self::Animating | Self::AwaitingAllCompletions
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Successor on the happy path
    pub fn next(&self) -> Option<Self> {
        use SessionState::*;
        Some(match self {
            Idle => Rendering,
            Rendering => Animating,
            Animating => AwaitingAllCompletions,
            AwaitingAllCompletions => Submitting,
            Submitting => Done,
            Done | Failed => return None,
        })
    }
}
