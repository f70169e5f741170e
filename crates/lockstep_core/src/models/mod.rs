//! Data models for the pipeline engine.
//!
//! This module contains the core data structures shared by stores, stages
//! and presenters:
//! - Enums for modalities, stage groups and label formats
//! - Record payloads (point clouds, images, calibration, labels)
//! - Small matrix helpers used by readers and stages

mod enums;
mod records;

pub use enums::{LabelFormat, Modality, StageGroup};
pub use records::{
    class_color, identity4, invert_rigid, mul34, mul4, transform_point, BoundingBox2d,
    BoundingBox3d, Calibration, CameraImage, Label, Mat3x4, Mat4, PointCloud, Record,
};
