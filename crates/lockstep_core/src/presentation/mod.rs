//! Presentation collaborators notified by the scheduler.
//!
//! Rendering itself lives outside the engine. A presenter receives the
//! finished [`DataBag`] of every new frame through `update`, and `redraw` on
//! every tick so it can pump its own event loop.

use std::path::PathBuf;
use std::sync::Arc;

use crate::data_bag::{keys, DataBag};
use crate::logging::RunLogger;
use crate::models::{CameraImage, PointCloud, Record};

/// Receiver of processed frames.
pub trait Presenter: Send {
    fn name(&self) -> &str;

    /// New frame ready.
    fn update(&mut self, bag: &DataBag);

    /// Called once per tick, after `update` when the frame changed.
    fn redraw(&mut self) {}

    /// Release resources at the end of a run.
    fn quit(&mut self) {}
}

/// Presenter that writes a one-line summary of each frame to the run log.
pub struct LogPresenter {
    logger: Arc<RunLogger>,
    frames: usize,
}

impl LogPresenter {
    pub fn new(logger: Arc<RunLogger>) -> Self {
        Self { logger, frames: 0 }
    }

    /// Frames presented so far.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Presenter for LogPresenter {
    fn name(&self) -> &str {
        "log"
    }

    fn update(&mut self, bag: &DataBag) {
        self.frames += 1;
        self.logger.info(&summarize(bag));
    }

    fn quit(&mut self) {
        self.logger
            .debug(&format!("Log presenter showed {} frames", self.frames));
    }
}

/// `frame 12 [000012]: 12034 points, 1242x375 image, 3 labels`
pub fn summarize(bag: &DataBag) -> String {
    let index = bag
        .get::<usize>(keys::FRAME_INDEX)
        .map_or_else(|| "?".to_string(), |i| i.to_string());

    let basename = [
        keys::POINT_CLOUD_PATH,
        keys::IMAGE_PATH,
        keys::CALIB_PATH,
        keys::LABEL_PATH,
    ]
    .iter()
    .find_map(|k| bag.get::<PathBuf>(k))
    .and_then(|p| p.file_stem())
    .map(|s| s.to_string_lossy().into_owned());

    let mut parts = Vec::new();
    if let Some(cloud) = bag.get::<Arc<Record<PointCloud>>>(keys::POINT_CLOUD) {
        parts.push(format!("{} points", cloud.data.len()));
    }
    if let Some(image) = bag.get::<Arc<Record<CameraImage>>>(keys::IMAGE) {
        let (w, h) = image.data.dimensions();
        parts.push(format!("{}x{} image", w, h));
    }
    if bag.contains(keys::CALIB) {
        parts.push("calib".to_string());
    }
    if let Some(labels) = bag.labels() {
        parts.push(format!("{} labels", labels.len()));
    }

    let mut line = format!("frame {}", index);
    if let Some(basename) = basename {
        line.push_str(&format!(" [{}]", basename));
    }
    if !parts.is_empty() {
        line.push_str(": ");
        line.push_str(&parts.join(", "));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::models::Label;

    #[test]
    fn summary_lists_present_modalities() {
        let mut bag = DataBag::new();
        bag.insert(keys::FRAME_INDEX, 4usize);
        bag.insert(keys::POINT_CLOUD_PATH, PathBuf::from("/d/velodyne/000004.bin"));
        bag.insert(
            keys::POINT_CLOUD,
            Arc::new(Record::new(
                "/d/velodyne/000004.bin",
                PointCloud::new(vec![[0.0; 4]; 3]),
            )),
        );
        bag.labels_mut().push(Label::new("Car"));

        assert_eq!(summarize(&bag), "frame 4 [000004]: 3 points, 1 labels");
    }

    #[test]
    fn log_presenter_counts_frames() {
        let logger = Arc::new(RunLogger::detached("test", LogConfig::default()));
        let mut presenter = LogPresenter::new(Arc::clone(&logger));
        presenter.update(&DataBag::new());
        presenter.redraw();
        presenter.update(&DataBag::new());
        presenter.quit();
        assert_eq!(presenter.frames(), 2);
        assert!(logger.get_tail().iter().any(|l| l.contains("frame ?")));
    }
}
