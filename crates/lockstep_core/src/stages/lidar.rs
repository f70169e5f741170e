//! Lidar stages.

use std::sync::Arc;

use super::bounds::CropBounds;
use crate::config::StageSettings;
use crate::data_bag::{keys, DataBag};
use crate::models::{PointCloud, Record};
use crate::orchestrator::{Stage, StageContext, StageResult};

/// Keeps the points inside an axis aligned box.
///
/// Parameters: `min_xyz`, `max_xyz` (three numbers each).
pub struct CropStage {
    bounds: CropBounds,
}

impl CropStage {
    pub const NAME: &'static str = "crop";

    pub fn from_settings(settings: &StageSettings) -> StageResult<Self> {
        Ok(Self {
            bounds: CropBounds::from_settings(settings)?,
        })
    }
}

impl Stage for CropStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::POINT_CLOUD]
    }

    fn run(&self, bag: &mut DataBag, ctx: &StageContext) -> StageResult<()> {
        if !ctx.require(bag, self.name(), self.required_keys()) {
            return Ok(());
        }
        let Some(record) = bag.get::<Arc<Record<PointCloud>>>(keys::POINT_CLOUD) else {
            ctx.logger.error(&format!(
                "[{}] '{}' has an unexpected type",
                self.name(),
                keys::POINT_CLOUD
            ));
            return Ok(());
        };

        let kept: Vec<[f32; 4]> = record
            .data
            .points
            .iter()
            .filter(|p| self.bounds.contains([p[0] as f64, p[1] as f64, p[2] as f64]))
            .copied()
            .collect();
        ctx.logger.tick(&format!(
            "[{}] kept {} of {} points",
            self.name(),
            kept.len(),
            record.data.len()
        ));

        let cropped = Record::new(record.path.clone(), PointCloud::new(kept));
        bag.insert(keys::POINT_CLOUD, Arc::new(cropped));
        Ok(())
    }
}
