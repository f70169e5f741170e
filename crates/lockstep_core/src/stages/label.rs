//! Label stages. Both edit the frame's label list in place.

use super::bounds::CropBounds;
use super::lidar::CropStage;
use crate::config::StageSettings;
use crate::data_bag::{keys, DataBag};
use crate::models::{Label, StageGroup};
use crate::orchestrator::{Stage, StageContext, StageError, StageResult};

/// Drops labels whose 3D centre lies outside the crop box.
///
/// Uses its own `min_xyz`/`max_xyz` when given, otherwise those of the
/// `[proc.lidar.crop]` entry. Labels without a 3D box are kept.
pub struct RemoveOutOfBoundLabelsStage {
    bounds: Option<CropBounds>,
}

impl RemoveOutOfBoundLabelsStage {
    pub const NAME: &'static str = "remove_out_of_bound_labels";

    pub fn from_settings(settings: &StageSettings) -> StageResult<Self> {
        Ok(Self {
            bounds: CropBounds::from_optional(settings)?,
        })
    }

    fn bounds(&self, ctx: &StageContext) -> StageResult<CropBounds> {
        if let Some(bounds) = self.bounds {
            return Ok(bounds);
        }
        let crop = ctx
            .settings
            .proc
            .stage(StageGroup::Lidar, CropStage::NAME)
            .ok_or_else(|| {
                StageError::other(format!(
                    "no bounds given and no [proc.lidar.{}] entry",
                    CropStage::NAME
                ))
            })?;
        CropBounds::from_settings(crop)
    }
}

impl Stage for RemoveOutOfBoundLabelsStage {
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
        let bounds = self.bounds(ctx)?;

        let labels = bag.labels_mut();
        let before = labels.len();
        labels.retain(|label| match &label.lidar_bbox {
            Some(bbox) => bounds.contains(bbox.center),
            None => true,
        });
        ctx.logger.tick(&format!(
            "[{}] removed {} labels",
            self.name(),
            before - labels.len()
        ));
        Ok(())
    }
}

/// Keeps only labels whose class is listed in `classes` (case-insensitive).
pub struct FilterClassesStage {
    classes: Vec<String>,
}

impl FilterClassesStage {
    pub const NAME: &'static str = "filter_classes";

    pub fn from_settings(settings: &StageSettings) -> StageResult<Self> {
        if !settings.params.contains_key("classes") {
            return Err(StageError::missing_parameter("classes"));
        }
        let classes = settings
            .param_str_list("classes")
            .ok_or_else(|| StageError::invalid_parameter("classes", "expected a list of names"))?;
        Ok(Self { classes })
    }

    fn keeps(&self, label: &Label) -> bool {
        self.classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&label.class))
    }
}

impl Stage for FilterClassesStage {
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
        bag.labels_mut().retain(|label| self.keeps(label));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Settings;
    use crate::logging::{LogConfig, RunLogger};
    use crate::models::BoundingBox3d;

    fn context(settings: Settings) -> StageContext {
        StageContext::new(
            Arc::new(settings),
            Arc::new(RunLogger::detached("label-test", LogConfig::default())),
        )
    }

    fn boxed(class: &str, center: [f64; 3]) -> Label {
        let mut label = Label::new(class);
        label.lidar_bbox = Some(BoundingBox3d {
            center,
            extent: [1.0, 1.0, 1.0],
            euler_angles: [0.0; 3],
            color: [0, 255, 0],
        });
        label
    }

    fn classes(bag: &DataBag) -> Vec<&str> {
        bag.labels()
            .unwrap()
            .iter()
            .map(|l| l.class.as_str())
            .collect()
    }

    #[test]
    fn falls_back_to_lidar_crop_bounds() {
        let mut settings = Settings::default();
        settings.proc.lidar.insert(
            CropStage::NAME.to_string(),
            StageSettings::new(true, 0)
                .with_param("min_xyz", vec![0.0, -10.0, -3.0])
                .with_param("max_xyz", vec![40.0, 10.0, 3.0]),
        );
        let ctx = context(settings);
        let stage = RemoveOutOfBoundLabelsStage::from_settings(&StageSettings::new(true, 0))
            .unwrap();

        let mut bag = DataBag::new();
        bag.insert(
            keys::LABEL_LIST,
            vec![
                boxed("Car", [10.0, 0.0, 0.0]),
                boxed("Van", [-5.0, 0.0, 0.0]),
                Label::new("Sign"),
                boxed("Cyclist", [39.0, 9.0, 2.0]),
            ],
        );
        stage.run(&mut bag, &ctx).unwrap();
        assert_eq!(classes(&bag), vec!["Car", "Sign", "Cyclist"]);
    }

    #[test]
    fn without_any_bounds_fails() {
        let ctx = context(Settings::default());
        let stage = RemoveOutOfBoundLabelsStage::from_settings(&StageSettings::new(true, 0))
            .unwrap();
        let mut bag = DataBag::new();
        bag.insert(keys::LABEL_LIST, vec![Label::new("Car")]);
        assert!(matches!(
            stage.run(&mut bag, &ctx),
            Err(StageError::Other(_))
        ));
    }

    #[test]
    fn filter_keeps_listed_classes() {
        let settings = StageSettings::new(true, 0).with_param("classes", vec!["car", "Pedestrian"]);
        let stage = FilterClassesStage::from_settings(&settings).unwrap();
        let mut bag = DataBag::new();
        bag.insert(
            keys::LABEL_LIST,
            vec![
                Label::new("Car"),
                Label::new("Tram"),
                Label::new("Pedestrian"),
            ],
        );
        stage.run(&mut bag, &context(Settings::default())).unwrap();
        assert_eq!(classes(&bag), vec!["Car", "Pedestrian"]);
    }

    #[test]
    fn filter_requires_string_list() {
        assert!(matches!(
            FilterClassesStage::from_settings(&StageSettings::new(true, 0)),
            Err(StageError::MissingParameter(_))
        ));
        let numbers = StageSettings::new(true, 0).with_param("classes", vec![1i64, 2]);
        assert!(matches!(
            FilterClassesStage::from_settings(&numbers),
            Err(StageError::InvalidParameter { .. })
        ));
    }
}
