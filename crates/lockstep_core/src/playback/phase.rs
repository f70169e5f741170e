//! Run lifecycle phases.

use std::fmt;

/// Lifecycle of one engine run.
///
/// `Idle -> Configuring -> Running -> Stopping -> Idle`. A failed configure
/// returns straight to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Configuring,
    Running,
    Stopping,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Configuring => "configuring",
            RunPhase::Running => "running",
            RunPhase::Stopping => "stopping",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (RunPhase::Idle, RunPhase::Configuring)
                | (RunPhase::Configuring, RunPhase::Running)
                | (RunPhase::Configuring, RunPhase::Idle)
                | (RunPhase::Configuring, RunPhase::Stopping)
                | (RunPhase::Running, RunPhase::Stopping)
                | (RunPhase::Stopping, RunPhase::Idle)
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_edges() {
        use RunPhase::*;
        assert!(Idle.can_transition_to(Configuring));
        assert!(Configuring.can_transition_to(Running));
        assert!(Running.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Idle));

        assert!(!Running.can_transition_to(Configuring));
        assert!(!Idle.can_transition_to(Running));
        assert!(!Stopping.can_transition_to(Configuring));
    }
}
