//! Annotation readers.
//!
//! A label record is the annotation list of one frame. KITTI labels are
//! stored in camera coordinates, so their reader joins each label file with
//! the calibration file of the same basename to place boxes in the lidar
//! frame.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use super::calib::read_calibration;
use crate::models::{
    class_color, invert_rigid, transform_point, BoundingBox2d, BoundingBox3d, Label, LabelFormat,
    Mat4,
};
use crate::storage::errors::{StoreError, StoreResult};
use crate::storage::store::RecordParser;

/// Build the parser for `format`.
///
/// `calib_dir` and `calib_extension` locate the calibration file joined with
/// each KITTI label.
pub fn label_parser(
    format: LabelFormat,
    calib_dir: PathBuf,
    calib_extension: String,
) -> Arc<dyn RecordParser<Vec<Label>>> {
    match format {
        LabelFormat::Kitti => Arc::new(KittiLabelReader {
            calib_dir,
            calib_extension,
        }),
        LabelFormat::SustechPoints => Arc::new(read_sustechpoints_labels),
    }
}

/// KITTI object labels joined with per-frame calibration.
struct KittiLabelReader {
    calib_dir: PathBuf,
    calib_extension: String,
}

impl RecordParser<Vec<Label>> for KittiLabelReader {
    fn parse(&self, path: &Path) -> StoreResult<Vec<Label>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| StoreError::parse(path, "label file has no basename"))?;
        let calib_path = self
            .calib_dir
            .join(format!("{}{}", stem, self.calib_extension));
        let calib = read_calibration(&calib_path)?;
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::io(format!("reading {}", path.display()), e))?;
        parse_kitti_labels(path, &content, &calib.tr_velo_to_cam)
    }
}

pub(crate) fn parse_kitti_labels(
    path: &Path,
    content: &str,
    tr_velo_to_cam: &Mat4,
) -> StoreResult<Vec<Label>> {
    let cam_to_velo = invert_rigid(tr_velo_to_cam);
    let mut labels = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 15 {
            return Err(StoreError::parse(
                path,
                format!("line {}: expected 15 columns, found {}", line_no + 1, parts.len()),
            ));
        }
        let values = parts[1..15]
            .iter()
            .map(|v| v.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::parse(path, format!("line {}: {}", line_no + 1, e)))?;

        // values: truncation, occlusion, alpha, l, t, r, b, h, w, len, x, y, z, ry
        let (left, top, right, bottom) = (values[3], values[4], values[5], values[6]);
        let (height, width, length) = (values[7], values[8], values[9]);
        let camera_xyz = [values[10], values[11], values[12]];
        let ry = values[13];

        let class = parts[0].to_string();
        let color = class_color(&class);
        let mut center = transform_point(&cam_to_velo, camera_xyz);
        center[2] += height / 2.0;

        let mut label = Label::new(class);
        label.lidar_bbox = Some(BoundingBox3d {
            center,
            extent: [width, length, height],
            euler_angles: [0.0, 0.0, -ry],
            color,
        });
        label.bbox_2d = Some(BoundingBox2d {
            xy_center: [(left + right) / 2.0, (top + bottom) / 2.0],
            xy_extent: [right - left, bottom - top],
            color,
        });
        labels.push(label);
    }

    Ok(labels)
}

#[derive(Deserialize)]
struct SustechObject {
    obj_type: String,
    psr: Psr,
}

#[derive(Deserialize)]
struct Psr {
    position: Xyz,
    scale: Xyz,
    rotation: Xyz,
}

#[derive(Deserialize)]
struct Xyz {
    x: f64,
    y: f64,
    z: f64,
}

impl Xyz {
    fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Read a SUSTechPOINTS JSON annotation file. Boxes are already in the
/// lidar frame.
pub fn read_sustechpoints_labels(path: &Path) -> StoreResult<Vec<Label>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| StoreError::io(format!("reading {}", path.display()), e))?;
    let objects: Vec<SustechObject> =
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(objects
        .into_iter()
        .map(|obj| {
            let color = sustech_color(&obj.obj_type);
            let mut label = Label::new(obj.obj_type);
            label.lidar_bbox = Some(BoundingBox3d {
                center: obj.psr.position.to_array(),
                extent: obj.psr.scale.to_array(),
                euler_angles: obj.psr.rotation.to_array(),
                color,
            });
            label
        })
        .collect())
}

fn sustech_color(class: &str) -> [u8; 3] {
    match class {
        "Car" | "Van" => [0, 255, 0],
        "Bus" => [0, 255, 255],
        "Pedestrian" => [0, 0, 255],
        "Rider" | "Cyclist" => [0, 136, 255],
        "Bicycle" | "BicycleGroup" => [0, 255, 136],
        "Motor" => [0, 176, 176],
        "Truck" | "Tram" => [255, 255, 0],
        "Animal" => [255, 176, 0],
        "Misc" | "Unknown" => [136, 136, 0],
        _ => [0, 0, 0],
    }
}
