//! Camera frames decoded with the `image` crate.

use std::path::Path;

use crate::models::CameraImage;
use crate::storage::errors::{StoreError, StoreResult};

/// Decode any supported image file into RGB8.
pub fn read_image(path: &Path) -> StoreResult<CameraImage> {
    let decoded = image::open(path).map_err(|source| StoreError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.into_rgb8())
}
