//! Orchestrator: stage registry, frame scheduler and run lifecycle.
//!
//! The engine opens one store per enabled modality, resolves the enabled
//! stages through a [`StageCatalog`], then hands both to the [`Scheduler`],
//! which loads and processes a frame whenever the playback position moves.
//!
//! Stages run per group in this order: lidar, camera, calib, label, post.
//! A group is skipped when its modality has no open store; post always runs.

mod engine;
mod errors;
mod registry;
mod scheduler;
mod stage;

pub use engine::{Engine, StopHandle};
pub use errors::{EngineError, EngineResult, StageError, StageResult};
pub use registry::{StageCatalog, StageEntry, StageFactory, StageRegistry};
pub use scheduler::{Scheduler, TickOutcome};
pub use stage::{Stage, StageContext};
