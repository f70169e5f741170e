//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::{Modality, StageGroup};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Input data locations and modality switches.
    #[serde(default)]
    pub data: DataSettings,

    /// Processing stages, per stage group.
    #[serde(default)]
    pub proc: ProcSettings,

    /// Loop and prefetch pacing.
    #[serde(default)]
    pub threads: ThreadSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Presentation switches.
    #[serde(default)]
    pub visualization: VisualizationSettings,

    /// Where post stages write their results.
    #[serde(default)]
    pub outputs: OutputSettings,
}

impl Settings {
    /// Whether a modality is enabled.
    pub fn modality_enabled(&self, modality: Modality) -> bool {
        match modality {
            Modality::Lidar => self.data.lidar.enabled,
            Modality::Camera => self.data.camera.enabled,
            Modality::Calib => self.data.calib.enabled,
            Modality::Label => self.data.label.enabled,
        }
    }
}

/// Input data layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    /// Dataset root.
    #[serde(default = "default_data_path")]
    pub path: String,

    #[serde(default = "default_lidar_subdir")]
    pub lidar_subdir: String,

    #[serde(default = "default_camera_subdir")]
    pub camera_subdir: String,

    #[serde(default = "default_calib_subdir")]
    pub calib_subdir: String,

    #[serde(default = "default_label_subdir")]
    pub label_subdir: String,

    /// Point cloud file extension.
    #[serde(default = "default_pcd_type")]
    pub pcd_type: String,

    /// Image file extension.
    #[serde(default = "default_img_type")]
    pub img_type: String,

    /// Calibration file extension.
    #[serde(default = "default_clb_type")]
    pub clb_type: String,

    /// Maximum number of records loaded per modality.
    #[serde(default = "default_size")]
    pub size: usize,

    #[serde(default = "default_enabled")]
    pub lidar: ModalitySettings,

    #[serde(default = "default_enabled")]
    pub camera: ModalitySettings,

    #[serde(default = "default_enabled")]
    pub calib: ModalitySettings,

    #[serde(default)]
    pub label: LabelSettings,
}

fn default_data_path() -> String {
    "data".to_string()
}

fn default_lidar_subdir() -> String {
    "velodyne".to_string()
}

fn default_camera_subdir() -> String {
    "image_2".to_string()
}

fn default_calib_subdir() -> String {
    "calib".to_string()
}

fn default_label_subdir() -> String {
    "label_2".to_string()
}

fn default_pcd_type() -> String {
    ".bin".to_string()
}

fn default_img_type() -> String {
    ".png".to_string()
}

fn default_clb_type() -> String {
    ".txt".to_string()
}

fn default_size() -> usize {
    10_000
}

fn default_enabled() -> ModalitySettings {
    ModalitySettings { enabled: true }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            lidar_subdir: default_lidar_subdir(),
            camera_subdir: default_camera_subdir(),
            calib_subdir: default_calib_subdir(),
            label_subdir: default_label_subdir(),
            pcd_type: default_pcd_type(),
            img_type: default_img_type(),
            clb_type: default_clb_type(),
            size: default_size(),
            lidar: default_enabled(),
            camera: default_enabled(),
            calib: default_enabled(),
            label: LabelSettings::default(),
        }
    }
}

impl DataSettings {
    /// Directory holding the records of a modality.
    pub fn modality_dir(&self, modality: Modality) -> PathBuf {
        let subdir = match modality {
            Modality::Lidar => &self.lidar_subdir,
            Modality::Camera => &self.camera_subdir,
            Modality::Calib => &self.calib_subdir,
            Modality::Label => &self.label_subdir,
        };
        PathBuf::from(&self.path).join(subdir)
    }
}

/// On/off switch for one modality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModalitySettings {
    #[serde(default)]
    pub enabled: bool,
}

/// Label modality switch and format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Annotation format name. Validated when the engine is configured.
    #[serde(default = "default_lbl_type")]
    pub lbl_type: String,
}

fn default_lbl_type() -> String {
    "kitti".to_string()
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            lbl_type: default_lbl_type(),
        }
    }
}

/// Stage configuration per group, keyed by stage name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcSettings {
    #[serde(default)]
    pub lidar: BTreeMap<String, StageSettings>,
    #[serde(default)]
    pub camera: BTreeMap<String, StageSettings>,
    #[serde(default)]
    pub calib: BTreeMap<String, StageSettings>,
    #[serde(default)]
    pub label: BTreeMap<String, StageSettings>,
    #[serde(default)]
    pub post: BTreeMap<String, StageSettings>,
}

impl ProcSettings {
    /// Stage entries of one group.
    pub fn group(&self, group: StageGroup) -> &BTreeMap<String, StageSettings> {
        match group {
            StageGroup::Lidar => &self.lidar,
            StageGroup::Camera => &self.camera,
            StageGroup::Calib => &self.calib,
            StageGroup::Label => &self.label,
            StageGroup::Post => &self.post,
        }
    }

    /// Mutable stage entries of one group.
    pub fn group_mut(&mut self, group: StageGroup) -> &mut BTreeMap<String, StageSettings> {
        match group {
            StageGroup::Lidar => &mut self.lidar,
            StageGroup::Camera => &mut self.camera,
            StageGroup::Calib => &mut self.calib,
            StageGroup::Label => &mut self.label,
            StageGroup::Post => &mut self.post,
        }
    }

    /// Look up one stage's settings.
    pub fn stage(&self, group: StageGroup, name: &str) -> Option<&StageSettings> {
        self.group(group).get(name)
    }
}

/// Configuration of a single stage.
///
/// `enabled` and `priority` are reserved; every other key is a parameter
/// handed to the stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Lower runs earlier.
    #[serde(default)]
    pub priority: i64,

    #[serde(flatten)]
    pub params: toml::Table,
}

impl StageSettings {
    pub fn new(enabled: bool, priority: i64) -> Self {
        Self {
            enabled,
            priority,
            params: toml::Table::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn with_param(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Numeric parameter; integers are widened.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        match self.params.get(key)? {
            toml::Value::Float(f) => Some(*f),
            toml::Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key)?.as_bool()
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.as_str()
    }

    /// Numeric array parameter. `None` if any element is not a number.
    pub fn param_f64_list(&self, key: &str) -> Option<Vec<f64>> {
        self.params
            .get(key)?
            .as_array()?
            .iter()
            .map(|v| match v {
                toml::Value::Float(f) => Some(*f),
                toml::Value::Integer(i) => Some(*i as f64),
                _ => None,
            })
            .collect()
    }

    /// String array parameter. `None` if any element is not a string.
    pub fn param_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.params
            .get(key)?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

/// Pacing of background work, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSettings {
    /// Sleep between two prefetched records, clamped to [`MAX_SLEEP_SECS`].
    #[serde(default = "default_io_sleep")]
    pub io_sleep: f64,

    /// Sleep between two scheduler ticks, clamped to [`MAX_SLEEP_SECS`].
    #[serde(default = "default_vis_sleep")]
    pub vis_sleep: f64,
}

fn default_io_sleep() -> f64 {
    0.01
}

fn default_vis_sleep() -> f64 {
    0.01
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            io_sleep: default_io_sleep(),
            vis_sleep: default_vis_sleep(),
        }
    }
}

impl ThreadSettings {
    pub fn io_interval(&self) -> Duration {
        seconds(self.io_sleep)
    }

    pub fn tick_interval(&self) -> Duration {
        seconds(self.vis_sleep)
    }
}

/// Longest sleep either interval may take. Larger values are clamped.
pub const MAX_SLEEP_SECS: f64 = 60.0;

fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value.min(MAX_SLEEP_SECS))
        .unwrap_or(Duration::from_secs(MAX_SLEEP_SECS as u64))
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for the run log.
    #[serde(default)]
    pub level: LogLevel,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Keep per-tick chatter out of the log.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of recent lines replayed when a stage fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            logs_folder: default_logs_folder(),
            compact: true,
            error_tail: default_error_tail(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_path")]
    pub path: String,
}

fn default_output_path() -> String {
    "outputs".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

/// Top-level configuration tables, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Data,
    Proc,
    Threads,
    Logging,
    Visualization,
    Outputs,
}

impl ConfigSection {
    /// Every section, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Data,
        ConfigSection::Proc,
        ConfigSection::Threads,
        ConfigSection::Logging,
        ConfigSection::Visualization,
        ConfigSection::Outputs,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Data => "data",
            ConfigSection::Proc => "proc",
            ConfigSection::Threads => "threads",
            ConfigSection::Logging => "logging",
            ConfigSection::Visualization => "visualization",
            ConfigSection::Outputs => "outputs",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Data => "Input data locations and modality switches",
            ConfigSection::Proc => "Processing stages per group (lower priority runs first)",
            ConfigSection::Threads => "Prefetch and scheduler pacing, in seconds",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Visualization => "Presentation",
            ConfigSection::Outputs => "Export locations",
        }
    }
}
