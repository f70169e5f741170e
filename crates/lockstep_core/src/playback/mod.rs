//! Shared playback state and run phases.

mod phase;
mod state;

pub use phase::RunPhase;
pub use state::{PlaybackSnapshot, PlaybackState, Transition, NOTHING_SHOWN};
