//! Camera stages.

use std::sync::Arc;

use image::Rgb;

use crate::config::StageSettings;
use crate::data_bag::{keys, DataBag};
use crate::models::{mul34, mul4, Calibration, CameraImage, Mat3x4, PointCloud, Record};
use crate::orchestrator::{Stage, StageContext, StageResult};

/// Paints lidar points onto the camera image, red by distance: near points
/// are bright, points beyond ~42.5 m are black.
pub struct ProjectPointsStage;

impl ProjectPointsStage {
    pub const NAME: &'static str = "project_point_cloud_points";

    pub fn from_settings(_settings: &StageSettings) -> StageResult<Self> {
        Ok(Self)
    }
}

impl Stage for ProjectPointsStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn required_keys(&self) -> &[&'static str] {
        &[keys::POINT_CLOUD, keys::IMAGE, keys::CALIB]
    }

    fn run(&self, bag: &mut DataBag, ctx: &StageContext) -> StageResult<()> {
        if !ctx.require(bag, self.name(), self.required_keys()) {
            return Ok(());
        }
        let (Some(cloud), Some(image), Some(calib)) = (
            bag.get::<Arc<Record<PointCloud>>>(keys::POINT_CLOUD),
            bag.get::<Arc<Record<CameraImage>>>(keys::IMAGE),
            bag.get::<Arc<Record<Calibration>>>(keys::CALIB),
        ) else {
            ctx.logger
                .error(&format!("[{}] input records have unexpected types", self.name()));
            return Ok(());
        };

        let mut painted = image.data.clone();
        let drawn = paint_points(&mut painted, &cloud.data, &velo_to_image(&calib.data));
        ctx.logger.tick(&format!(
            "[{}] {} of {} points in view",
            self.name(),
            drawn,
            cloud.data.len()
        ));

        let record = Record::new(image.path.clone(), painted);
        bag.insert(keys::IMAGE, Arc::new(record));
        Ok(())
    }
}

/// `P2 · R0_rect · Tr_velo_to_cam`
pub fn velo_to_image(calib: &Calibration) -> Mat3x4 {
    mul34(&calib.p2, &mul4(&calib.r0_rect, &calib.tr_velo_to_cam))
}

/// Paint every point that lands inside `image` in front of the camera.
/// Returns the number of painted points.
pub fn paint_points(image: &mut CameraImage, cloud: &PointCloud, projection: &Mat3x4) -> usize {
    let (width, height) = (image.width() as i64, image.height() as i64);
    let mut drawn = 0;

    for p in &cloud.points {
        let xyz = [p[0] as f64, p[1] as f64, p[2] as f64];
        let [u, v, w] = project(projection, xyz);
        if w <= 0.0 {
            continue;
        }
        // Truncate toward zero, as pixel indices.
        let (px, py) = ((u / w) as i64, (v / w) as i64);
        if px < 0 || px >= width || py < 0 || py >= height {
            continue;
        }

        let range = (xyz[0] * xyz[0] + xyz[1] * xyz[1] + xyz[2] * xyz[2]).sqrt();
        let shade = (255.0 - (range * 6.0).clamp(0.0, 255.0)) as u8;
        image.put_pixel(px as u32, py as u32, Rgb([shade, 0, 0]));
        drawn += 1;
    }

    drawn
}

fn project(m: &Mat3x4, p: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (row, value) in m.iter().zip(out.iter_mut()) {
        *value = row[0] * p[0] + row[1] * p[1] + row[2] * p[2] + row[3];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::logging::{LogConfig, RunLogger};
    use crate::models::identity4;

    /// Camera looking down +x: image u = -y, v = -z, depth = x, centred at
    /// (5, 5) with unit focal length.
    fn calibration() -> Calibration {
        let mut tr = identity4();
        tr[0] = [0.0, -1.0, 0.0, 0.0];
        tr[1] = [0.0, 0.0, -1.0, 0.0];
        tr[2] = [1.0, 0.0, 0.0, 0.0];
        Calibration {
            p2: [
                [1.0, 0.0, 5.0, 0.0],
                [0.0, 1.0, 5.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            r0_rect: identity4(),
            tr_velo_to_cam: tr,
            extra: Default::default(),
        }
    }

    #[test]
    fn paints_visible_points_by_distance() {
        let cloud = PointCloud::new(vec![
            [1.0, 0.0, 0.0, 1.0],  // centre, 1 m
            [10.0, 0.0, 0.0, 1.0], // centre, 10 m
            [-1.0, 0.0, 0.0, 1.0], // behind the camera
            [1.0, 9.0, 0.0, 1.0],  // left of the image
        ]);
        let mut image = CameraImage::new(10, 10);

        let drawn = paint_points(&mut image, &cloud, &velo_to_image(&calibration()));

        assert_eq!(drawn, 2);
        // The far point is painted last and wins the shared pixel.
        assert_eq!(image.get_pixel(5, 5), &Rgb([195, 0, 0]));
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn replaces_image_record_with_painted_copy() {
        let ctx = StageContext::new(
            Arc::new(Settings::default()),
            Arc::new(RunLogger::detached("camera-test", LogConfig::default())),
        );
        let original = Arc::new(Record::new("000000.png", CameraImage::new(10, 10)));
        let mut bag = DataBag::new();
        bag.insert(
            keys::POINT_CLOUD,
            Arc::new(Record::new(
                "000000.bin",
                PointCloud::new(vec![[2.0, 1.0, 1.0, 0.0]]),
            )),
        );
        bag.insert(keys::IMAGE, Arc::clone(&original));
        bag.insert(keys::CALIB, Arc::new(Record::new("000000.txt", calibration())));

        ProjectPointsStage.run(&mut bag, &ctx).unwrap();

        let painted = bag.get::<Arc<Record<CameraImage>>>(keys::IMAGE).unwrap();
        // u = 5 - 1/2, v = 5 - 1/2, range = sqrt(6)
        let shade = (255.0 - 6.0_f64.sqrt() * 6.0) as u8;
        assert_eq!(painted.data.get_pixel(4, 4), &Rgb([shade, 0, 0]));
        assert_eq!(original.data.get_pixel(4, 4), &Rgb([0, 0, 0]));
    }

    #[test]
    fn missing_calibration_is_logged() {
        let ctx = StageContext::new(
            Arc::new(Settings::default()),
            Arc::new(RunLogger::detached("camera-test", LogConfig::default())),
        );
        let mut bag = DataBag::new();
        bag.insert(
            keys::POINT_CLOUD,
            Arc::new(Record::new("a.bin", PointCloud::default())),
        );
        bag.insert(keys::IMAGE, Arc::new(Record::new("a.png", CameraImage::new(2, 2))));

        ProjectPointsStage.run(&mut bag, &ctx).unwrap();
        assert!(ctx
            .logger
            .get_tail()
            .iter()
            .any(|l| l.contains(keys::CALIB)));
    }
}
