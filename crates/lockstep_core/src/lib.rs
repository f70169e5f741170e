//! Lockstep Core - frame-synchronized multi-modal pipeline engine
//!
//! Per-modality record stores (lidar, camera, calibration, labels) are
//! prefetched in the background and read by frame index. A scheduler loop
//! follows the shared playback position: whenever it moves, one frame is
//! loaded from every store into a [`DataBag`], run through the enabled
//! stages in priority order and handed to the presenters.
//!
//! The crate has no UI dependencies; front-ends plug in through the
//! [`Presenter`] and [`InputSource`] traits.

pub mod config;
pub mod data_bag;
pub mod input;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod playback;
pub mod presentation;
pub mod stages;
pub mod storage;

pub use data_bag::DataBag;
pub use input::InputSource;
pub use orchestrator::{Engine, EngineError, EngineResult, Stage, StageCatalog, StageContext};
pub use presentation::Presenter;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
