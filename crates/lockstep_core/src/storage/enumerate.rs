//! Record enumeration: which files make up a modality, in frame order.

use std::fs;
use std::path::Path;

use super::errors::{StoreError, StoreResult};

/// Numeric value of all digits in `name`, concatenated.
///
/// Non-digit characters are ignored, so `frame_0012a` and `0012` compare
/// equal. Names without digits sort first.
pub fn embedded_number(name: &str) -> u128 {
    name.chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0u128, |acc, d| acc.saturating_mul(10).saturating_add(d as u128))
}

/// Sort basenames ascending by their embedded number.
///
/// Ties fall back to the name itself so the order never depends on the
/// directory listing.
pub fn sort_basenames(names: &mut [String]) {
    names.sort_by(|a, b| {
        embedded_number(a)
            .cmp(&embedded_number(b))
            .then_with(|| a.cmp(b))
    });
}

/// List basenames (file stems) in `dir` whose name ends with `extension`.
///
/// `extension` includes the dot (".bin"). The result is sorted with
/// [`sort_basenames`] and truncated to `cap`. A missing directory yields an
/// empty list.
pub fn enumerate(dir: &Path, extension: &str, cap: usize) -> StoreResult<Vec<String>> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Record directory not found");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| StoreError::io(format!("listing {}", dir.display()), e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(format!("listing {}", dir.display()), e))?;
        if !entry.path().is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(stem) = file_name.strip_suffix(extension) {
            if !stem.is_empty() {
                names.push(stem.to_string());
            }
        }
    }

    sort_basenames(&mut names);
    names.truncate(cap);
    Ok(names)
}
