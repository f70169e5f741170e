//! KITTI calibration text files (`KEY: v1 v2 ...` per line).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::models::{identity4, Calibration, Mat3x4, Mat4};
use crate::storage::errors::{StoreError, StoreResult};

/// Read and normalize a KITTI calibration file.
///
/// `P2` and `Tr_velo_to_cam` are required; a missing `R0_rect` is identity.
pub fn read_calibration(path: &Path) -> StoreResult<Calibration> {
    let content = fs::read_to_string(path)
        .map_err(|e| StoreError::io(format!("reading {}", path.display()), e))?;
    parse_calibration(path, &content)
}

pub(crate) fn parse_calibration(path: &Path, content: &str) -> StoreResult<Calibration> {
    let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, rest) = line.split_once(':').ok_or_else(|| {
            StoreError::parse(path, format!("line {}: missing ':'", line_no + 1))
        })?;
        let numbers = rest
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::parse(path, format!("line {}: {}", line_no + 1, e)))?;
        values.insert(key.trim().to_string(), numbers);
    }

    let p2 = take_3x4(path, &mut values, "P2")?;
    let tr_velo_to_cam = pad_3x4(&take_3x4(path, &mut values, "Tr_velo_to_cam")?);
    let r0_rect = match values.remove("R0_rect") {
        Some(v) if v.len() == 9 => {
            let mut m = identity4();
            for (i, row) in m.iter_mut().take(3).enumerate() {
                row[..3].copy_from_slice(&v[i * 3..i * 3 + 3]);
            }
            m
        }
        Some(v) => {
            return Err(StoreError::parse(
                path,
                format!("R0_rect has {} values, expected 9", v.len()),
            ))
        }
        None => identity4(),
    };

    Ok(Calibration {
        p2,
        r0_rect,
        tr_velo_to_cam,
        extra: values,
    })
}

fn take_3x4(
    path: &Path,
    values: &mut BTreeMap<String, Vec<f64>>,
    key: &str,
) -> StoreResult<Mat3x4> {
    let v = values
        .remove(key)
        .ok_or_else(|| StoreError::parse(path, format!("missing {}", key)))?;
    if v.len() != 12 {
        return Err(StoreError::parse(
            path,
            format!("{} has {} values, expected 12", key, v.len()),
        ));
    }
    let mut m = [[0.0; 4]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        row.copy_from_slice(&v[i * 4..i * 4 + 4]);
    }
    Ok(m)
}

fn pad_3x4(m: &Mat3x4) -> Mat4 {
    let mut out = identity4();
    out[..3].copy_from_slice(m);
    out
}

#[cfg(test)]
pub(crate) const SAMPLE: &str = "\
P0: 1 0 0 0 0 1 0 0 0 0 1 0
P2: 700 0 600 45 0 700 180 0 0 0 1 0
R0_rect: 1 0 0 0 1 0 0 0 1
Tr_velo_to_cam: 0 -1 0 0 0 0 -1 0 1 0 0 -0.3
";
