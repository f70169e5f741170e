//! Core enums used throughout the engine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A data stream kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Point clouds.
    Lidar,
    /// Image frames.
    Camera,
    /// Calibration matrices.
    Calib,
    /// Annotations.
    Label,
}

impl Modality {
    /// All modalities, in the order the scheduler reads them.
    pub const ALL: [Modality; 4] = [
        Modality::Lidar,
        Modality::Camera,
        Modality::Calib,
        Modality::Label,
    ];

    /// Config/log name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Lidar => "lidar",
            Modality::Camera => "camera",
            Modality::Calib => "calib",
            Modality::Label => "label",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of processing stages.
///
/// Groups always execute in [`StageGroup::EXECUTION_ORDER`], independent of
/// the order they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageGroup {
    Lidar,
    Camera,
    Calib,
    Label,
    Post,
}

impl StageGroup {
    /// Fixed execution order of stage groups within a tick.
    pub const EXECUTION_ORDER: [StageGroup; 5] = [
        StageGroup::Lidar,
        StageGroup::Camera,
        StageGroup::Calib,
        StageGroup::Label,
        StageGroup::Post,
    ];

    /// Modality gating this group, `None` for groups that always run.
    pub fn modality(&self) -> Option<Modality> {
        match self {
            StageGroup::Lidar => Some(Modality::Lidar),
            StageGroup::Camera => Some(Modality::Camera),
            StageGroup::Calib => Some(Modality::Calib),
            StageGroup::Label => Some(Modality::Label),
            StageGroup::Post => None,
        }
    }

    /// Config/log name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageGroup::Lidar => "lidar",
            StageGroup::Camera => "camera",
            StageGroup::Calib => "calib",
            StageGroup::Label => "label",
            StageGroup::Post => "post",
        }
    }
}

impl std::fmt::Display for StageGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// On-disk annotation format for the label modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelFormat {
    /// KITTI object text files, paired with KITTI calibration.
    #[default]
    Kitti,
    /// SUSTechPOINTS JSON annotations.
    SustechPoints,
}

impl LabelFormat {
    /// Every supported format.
    pub const SUPPORTED: [LabelFormat; 2] = [LabelFormat::Kitti, LabelFormat::SustechPoints];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelFormat::Kitti => "kitti",
            LabelFormat::SustechPoints => "sustechpoints",
        }
    }

    /// File extension of the annotation files, including the dot.
    pub fn label_extension(&self) -> &'static str {
        match self {
            LabelFormat::Kitti => ".txt",
            LabelFormat::SustechPoints => ".json",
        }
    }

    /// Comma separated list of supported format names.
    pub fn supported_list() -> String {
        Self::SUPPORTED
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LabelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Label type '{}' not supported. Supported types: {}.",
                    s,
                    Self::supported_list()
                )
            })
    }
}
