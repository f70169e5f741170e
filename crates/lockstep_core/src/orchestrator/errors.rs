//! Error types for the engine and its stages.
//!
//! Errors carry context that chains through layers:
//! Engine → Stage group → Stage → Operation

use std::io;

use thiserror::Error;

use crate::models::{Modality, StageGroup};
use crate::playback::RunPhase;
use crate::storage::StoreError;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Operation not allowed in the current run phase.
    #[error("Engine is {actual}, expected {expected}")]
    InvalidPhase {
        expected: RunPhase,
        actual: RunPhase,
    },

    /// Configuration cannot be applied.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An enabled stage has no registered implementation.
    #[error("Unknown {group} stage '{name}'. Registered: [{}]", available.join(", "))]
    UnknownStage {
        group: StageGroup,
        name: String,
        available: Vec<String>,
    },

    /// A registered stage refused its settings.
    #[error("Failed to build {group} stage '{name}': {source}")]
    StageBuild {
        group: StageGroup,
        name: String,
        #[source]
        source: StageError,
    },

    /// A modality store could not be opened.
    #[error("Failed to open {modality} store: {source}")]
    Store {
        modality: Modality,
        #[source]
        source: StoreError,
    },

    /// The run log could not be created.
    #[error("Failed to create run log: {0}")]
    Logger(#[source] io::Error),

    /// The input source could not be hooked.
    #[error("Failed to hook input source: {0}")]
    Input(#[source] io::Error),
}

impl EngineError {
    /// Create an invalid phase error.
    pub fn invalid_phase(expected: RunPhase, actual: RunPhase) -> Self {
        Self::InvalidPhase { expected, actual }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Error returned by a stage.
#[derive(Error, Debug)]
pub enum StageError {
    /// A required parameter is absent from the stage's settings.
    #[error("Missing parameter '{0}'")]
    MissingParameter(String),

    /// A parameter is present but unusable.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Generic stage error with message.
    #[error("{0}")]
    Other(String),
}

impl StageError {
    /// Create a missing parameter error.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_stage_lists_registered_names() {
        let err = EngineError::UnknownStage {
            group: StageGroup::Lidar,
            name: "segment".to_string(),
            available: vec!["crop".to_string(), "denoise".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("lidar"));
        assert!(msg.contains("segment"));
        assert!(msg.contains("crop, denoise"));
    }

    #[test]
    fn phase_error_names_both_phases() {
        let msg = EngineError::invalid_phase(RunPhase::Idle, RunPhase::Running).to_string();
        assert!(msg.contains("running"));
        assert!(msg.contains("idle"));
    }
}
