//! Axis aligned crop box shared by the lidar and label stages.

use crate::config::StageSettings;
use crate::orchestrator::{StageError, StageResult};

pub const MIN_KEY: &str = "min_xyz";
pub const MAX_KEY: &str = "max_xyz";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl CropBounds {
    /// Read `min_xyz`/`max_xyz` from stage parameters.
    pub fn from_settings(settings: &StageSettings) -> StageResult<Self> {
        let min = xyz(settings, MIN_KEY)?;
        let max = xyz(settings, MAX_KEY)?;
        if (0..3).any(|i| min[i] > max[i]) {
            return Err(StageError::invalid_parameter(
                MIN_KEY,
                format!("{:?} exceeds {} {:?}", min, MAX_KEY, max),
            ));
        }
        Ok(Self { min, max })
    }

    /// Bounds only if both keys are present.
    pub fn from_optional(settings: &StageSettings) -> StageResult<Option<Self>> {
        if settings.params.contains_key(MIN_KEY) || settings.params.contains_key(MAX_KEY) {
            Self::from_settings(settings).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}

fn xyz(settings: &StageSettings, key: &str) -> StageResult<[f64; 3]> {
    if !settings.params.contains_key(key) {
        return Err(StageError::missing_parameter(key));
    }
    match settings.param_f64_list(key).as_deref() {
        Some(&[x, y, z]) => Ok([x, y, z]),
        _ => Err(StageError::invalid_parameter(key, "expected three numbers")),
    }
}
