//! Per-frame record types produced by the modality stores.

use std::collections::BTreeMap;
use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Row-major 4x4 homogeneous transform.
pub type Mat4 = [[f64; 4]; 4];

/// Row-major 3x4 projection matrix.
pub type Mat3x4 = [[f64; 4]; 3];

/// Parsed data for one frame of one modality, plus where it came from.
///
/// Records are immutable once produced; stores hand them out behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// Source file of the record (primary file for joined records).
    pub path: PathBuf,
    /// Parsed payload.
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(path: impl Into<PathBuf>, data: T) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// File stem of the source path, used as the frame's basename.
    pub fn basename(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// Point cloud as `(x, y, z, intensity)` rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<[f32; 4]>,
}

impl PointCloud {
    pub fn new(points: Vec<[f32; 4]>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Camera frame in RGB8.
pub type CameraImage = RgbImage;

/// Calibration matrices for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Projection from rectified reference camera to image 2.
    pub p2: Mat3x4,
    /// Rectifying rotation, padded to 4x4.
    pub r0_rect: Mat4,
    /// Lidar to reference camera transform, padded to 4x4.
    pub tr_velo_to_cam: Mat4,
    /// Every other key found in the file, verbatim.
    #[serde(default)]
    pub extra: BTreeMap<String, Vec<f64>>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            p2: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            r0_rect: identity4(),
            tr_velo_to_cam: identity4(),
            extra: BTreeMap::new(),
        }
    }
}

/// Oriented 3D box in the lidar frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3d {
    pub center: [f64; 3],
    /// Width, length, height.
    pub extent: [f64; 3],
    pub euler_angles: [f64; 3],
    pub color: [u8; 3],
}

/// Axis aligned box in image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2d {
    pub xy_center: [f64; 2],
    pub xy_extent: [f64; 2],
    pub color: [u8; 3],
}

/// A single annotation, read from disk or predicted by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lidar_bbox: Option<BoundingBox3d>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox_2d: Option<BoundingBox2d>,
    /// True when produced by an algorithm rather than read from disk.
    #[serde(default)]
    pub predicted: bool,
    /// Name of the stage that produced a predicted label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Label {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            lidar_bbox: None,
            bbox_2d: None,
            predicted: false,
            source: None,
        }
    }
}

/// Display color for a KITTI-style object class.
pub fn class_color(class: &str) -> [u8; 3] {
    match class {
        "Car" | "Van" | "Truck" => [0, 255, 0],
        "Pedestrian" | "Person_sitting" => [255, 0, 0],
        "Cyclist" => [0, 0, 255],
        "Tram" | "Misc" => [255, 255, 0],
        _ => [255, 255, 255],
    }
}

/// 4x4 identity.
pub fn identity4() -> Mat4 {
    let mut m = [[0.0; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// `a * b` for 4x4 matrices.
pub fn mul4(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// `a * b` for a 3x4 times 4x4 product.
pub fn mul34(a: &Mat3x4, b: &Mat4) -> Mat3x4 {
    let mut out = [[0.0; 4]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Inverse of a rigid transform `[R | t; 0 0 0 1]`.
pub fn invert_rigid(m: &Mat4) -> Mat4 {
    let mut out = identity4();
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = m[j][i];
        }
    }
    for i in 0..3 {
        out[i][3] = -(0..3).map(|k| out[i][k] * m[k][3]).sum::<f64>();
    }
    out
}

/// Apply a 4x4 transform to a point.
pub fn transform_point(m: &Mat4, p: [f64; 3]) -> [f64; 3] {
    let v = [p[0], p[1], p[2], 1.0];
    let mut out = [0.0; 3];
    for (i, cell) in out.iter_mut().enumerate() {
        *cell = (0..4).map(|k| m[i][k] * v[k]).sum();
    }
    out
}
