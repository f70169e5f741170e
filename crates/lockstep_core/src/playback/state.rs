//! Mutex-guarded frame position and play/run flags.

use parking_lot::Mutex;

/// Sentinel for "no frame shown yet".
pub const NOTHING_SHOWN: i64 = -1;

/// A change to the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Begin a run over `maximum + 1` frames, starting paused at frame 0.
    Start { maximum: usize },
    /// Step one frame forward and pause.
    SeekForward,
    /// Step one frame back and pause.
    SeekBackward,
    TogglePlay,
    /// Scheduler tick: advance one frame while playing, below the ceiling.
    Tick,
    /// Record that `index` has been presented.
    MarkShown(usize),
    /// Clear the running flag; the scheduler exits on its next tick.
    Stop,
}

/// Copy of the playback fields taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub current: usize,
    pub previous: i64,
    pub maximum: usize,
    pub running: bool,
    pub playing: bool,
}

impl PlaybackSnapshot {
    /// Whether `current` has not been presented yet.
    pub fn frame_changed(&self) -> bool {
        self.previous != self.current as i64
    }
}

#[derive(Debug)]
struct Fields {
    current: usize,
    previous: i64,
    maximum: usize,
    running: bool,
    playing: bool,
}

/// Single source of truth for the frame position, shared by the input
/// handler and the scheduler.
///
/// All fields change under one mutex through [`PlaybackState::apply`];
/// `current` never leaves `0..=maximum`.
#[derive(Debug)]
pub struct PlaybackState {
    fields: Mutex<Fields>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            fields: Mutex::new(Fields {
                current: 0,
                previous: NOTHING_SHOWN,
                maximum: 0,
                running: false,
                playing: false,
            }),
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let f = self.fields.lock();
        snapshot_of(&f)
    }

    /// Apply `transition` atomically and return the resulting state.
    pub fn apply(&self, transition: Transition) -> PlaybackSnapshot {
        let mut f = self.fields.lock();
        match transition {
            Transition::Start { maximum } => {
                f.maximum = maximum;
                f.current = 0;
                f.previous = NOTHING_SHOWN;
                f.playing = false;
                f.running = true;
            }
            Transition::SeekForward => {
                f.playing = false;
                if f.current < f.maximum {
                    f.current += 1;
                }
            }
            Transition::SeekBackward => {
                f.playing = false;
                f.current = f.current.saturating_sub(1);
            }
            Transition::TogglePlay => {
                f.playing = !f.playing;
            }
            Transition::Tick => {
                if f.running && f.playing && f.current < f.maximum {
                    f.current += 1;
                }
            }
            Transition::MarkShown(index) => {
                f.previous = index as i64;
            }
            Transition::Stop => {
                f.running = false;
            }
        }
        snapshot_of(&f)
    }
}

fn snapshot_of(f: &Fields) -> PlaybackSnapshot {
    PlaybackSnapshot {
        current: f.current,
        previous: f.previous,
        maximum: f.maximum,
        running: f.running,
        playing: f.playing,
    }
}
