//! Reference stage implementations and the default catalog.
//!
//! | group  | stage                        |
//! |--------|------------------------------|
//! | lidar  | `crop`                       |
//! | camera | `project_point_cloud_points` |
//! | label  | `remove_out_of_bound_labels` |
//! | label  | `filter_classes`             |
//! | post   | `export_labels`              |

mod bounds;
mod camera;
mod label;
mod lidar;
mod post;

pub use bounds::CropBounds;
pub use camera::{paint_points, velo_to_image, ProjectPointsStage};
pub use label::{FilterClassesStage, RemoveOutOfBoundLabelsStage};
pub use lidar::CropStage;
pub use post::ExportLabelsStage;

use crate::models::StageGroup;
use crate::orchestrator::{Stage, StageCatalog};

/// Catalog holding every reference stage.
pub fn default_catalog() -> StageCatalog {
    let mut catalog = StageCatalog::new();
    catalog
        .register(StageGroup::Lidar, CropStage::NAME, |s| {
            Ok(Box::new(CropStage::from_settings(s)?) as Box<dyn Stage>)
        })
        .register(StageGroup::Camera, ProjectPointsStage::NAME, |s| {
            Ok(Box::new(ProjectPointsStage::from_settings(s)?) as Box<dyn Stage>)
        })
        .register(StageGroup::Label, RemoveOutOfBoundLabelsStage::NAME, |s| {
            Ok(Box::new(RemoveOutOfBoundLabelsStage::from_settings(s)?) as Box<dyn Stage>)
        })
        .register(StageGroup::Label, FilterClassesStage::NAME, |s| {
            Ok(Box::new(FilterClassesStage::from_settings(s)?) as Box<dyn Stage>)
        })
        .register(StageGroup::Post, ExportLabelsStage::NAME, |s| {
            Ok(Box::new(ExportLabelsStage::from_settings(s)?) as Box<dyn Stage>)
        });
    catalog
}
