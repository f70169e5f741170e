//! Configuration management for Lockstep.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Per-stage settings with free-form parameters
//!
//! # Example
//!
//! ```no_run
//! use lockstep_core::config::ConfigManager;
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new("lockstep.toml");
//! config.load_or_create().unwrap();
//!
//! // Read settings
//! println!("Dataset: {}", config.settings().data.path);
//!
//! // Modify a setting and write the whole file atomically
//! config.settings_mut().threads.vis_sleep = 0.1;
//! config.save().unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, DataSettings, LabelSettings, LoggingSettings, ModalitySettings,
    OutputSettings, ProcSettings, Settings, StageSettings, ThreadSettings, VisualizationSettings,
    MAX_SLEEP_SECS,
};
