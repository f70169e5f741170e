//! Maps input events onto playback transitions.

use std::sync::Arc;

use crate::playback::{PlaybackSnapshot, PlaybackState, Transition};

/// User command delivered by an [`InputSource`](super::InputSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    SeekLeft,
    SeekRight,
    TogglePlay,
    /// End the run.
    Stop,
}

impl InputEvent {
    /// Parse a key name as typed on a terminal.
    ///
    /// `d`/`right` seek forward, `a`/`left` seek back, `space`/`p` (or a
    /// bare space) toggle play, `q`/`quit` stop.
    pub fn from_key(key: &str) -> Option<Self> {
        if key == " " {
            return Some(InputEvent::TogglePlay);
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "d" | "right" => Some(InputEvent::SeekRight),
            "a" | "left" => Some(InputEvent::SeekLeft),
            "p" | "space" => Some(InputEvent::TogglePlay),
            "q" | "quit" => Some(InputEvent::Stop),
            _ => None,
        }
    }

    fn transition(&self) -> Transition {
        match self {
            InputEvent::SeekLeft => Transition::SeekBackward,
            InputEvent::SeekRight => Transition::SeekForward,
            InputEvent::TogglePlay => Transition::TogglePlay,
            InputEvent::Stop => Transition::Stop,
        }
    }
}

/// Applies input events to the shared playback state.
#[derive(Debug, Clone)]
pub struct InputHandler {
    playback: Arc<PlaybackState>,
}

impl InputHandler {
    pub fn new(playback: Arc<PlaybackState>) -> Self {
        Self { playback }
    }

    pub fn handle(&self, event: InputEvent) -> PlaybackSnapshot {
        let snapshot = self.playback.apply(event.transition());
        tracing::debug!(
            ?event,
            current = snapshot.current,
            playing = snapshot.playing,
            "Input event applied"
        );
        snapshot
    }
}
