//! KITTI-style binary point clouds.

use std::fs;
use std::path::Path;

use crate::models::PointCloud;
use crate::storage::errors::{StoreError, StoreResult};

const POINT_BYTES: usize = 16;

/// Read a `.bin` file of little-endian `f32` quadruples `(x, y, z, intensity)`.
pub fn read_point_cloud(path: &Path) -> StoreResult<PointCloud> {
    let bytes = fs::read(path)
        .map_err(|e| StoreError::io(format!("reading {}", path.display()), e))?;

    if bytes.len() % POINT_BYTES != 0 {
        return Err(StoreError::parse(
            path,
            format!(
                "{} bytes is not a multiple of the {}-byte point size",
                bytes.len(),
                POINT_BYTES
            ),
        ));
    }

    let points = bytes
        .chunks_exact(POINT_BYTES)
        .map(|chunk| {
            let mut point = [0.0f32; 4];
            for (value, raw) in point.iter_mut().zip(chunk.chunks_exact(4)) {
                *value = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            }
            point
        })
        .collect();

    Ok(PointCloud::new(points))
}

#[cfg(test)]
pub(crate) fn encode_points(points: &[[f32; 4]]) -> Vec<u8> {
    points
        .iter()
        .flat_map(|p| p.iter().flat_map(|v| v.to_le_bytes()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_points() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("000000.bin");
        fs::write(&path, encode_points(&[[1.0, 2.0, 3.0, 0.5], [-1.0, 0.0, 4.5, 1.0]])).unwrap();

        let cloud = read_point_cloud(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[1], [-1.0, 0.0, 4.5, 1.0]);
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("000000.bin");
        fs::write(&path, [0u8; 10]).unwrap();

        assert!(matches!(
            read_point_cloud(&path),
            Err(StoreError::Parse { .. })
        ));
    }
}
