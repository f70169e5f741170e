//! Post stages, run after every modality group.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StageSettings;
use crate::data_bag::{keys, DataBag};
use crate::orchestrator::{Stage, StageContext, StageError, StageResult};

/// Writes the frame's label list as JSON to `<outputs.path>/<basename>.json`.
///
/// The basename comes from the first record path in the bag (label, point
/// cloud, image, calibration), falling back to the zero-padded frame index.
pub struct ExportLabelsStage;

impl ExportLabelsStage {
    pub const NAME: &'static str = "export_labels";

    pub fn from_settings(_settings: &StageSettings) -> StageResult<Self> {
        Ok(Self)
    }

    fn output_path(&self, bag: &DataBag, dir: &Path) -> Option<PathBuf> {
        let from_records = [
            keys::LABEL_PATH,
            keys::POINT_CLOUD_PATH,
            keys::IMAGE_PATH,
            keys::CALIB_PATH,
        ]
        .iter()
        .filter_map(|key| bag.get::<PathBuf>(key))
        .find_map(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned());

        let basename = from_records.or_else(|| {
            bag.get::<usize>(keys::FRAME_INDEX)
                .map(|i| format!("{:06}", i))
        })?;
        Some(dir.join(format!("{}.json", basename)))
    }
}

impl Stage for ExportLabelsStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::LABEL_LIST]
    }

    fn run(&self, bag: &mut DataBag, ctx: &StageContext) -> StageResult<()> {
        if !ctx.require(bag, self.name(), self.required_keys()) {
            return Ok(());
        }
        let dir = ctx.output_dir();
        let path = self
            .output_path(bag, &dir)
            .ok_or_else(|| StageError::other("cannot name the export file for this frame"))?;
        let labels = bag.labels().map(Vec::as_slice).unwrap_or(&[]);

        let json = serde_json::to_string_pretty(labels)
            .map_err(|e| StageError::other(format!("failed to serialize labels: {}", e)))?;
        fs::create_dir_all(&dir).map_err(|e| StageError::io("creating output directory", e))?;
        fs::write(&path, json).map_err(|e| StageError::io("writing label export", e))?;

        ctx.logger.tick(&format!(
            "[{}] {} labels -> {}",
            self.name(),
            labels.len(),
            path.display()
        ));
        Ok(())
    }
}
