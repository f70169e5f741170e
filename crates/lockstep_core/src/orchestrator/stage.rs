//! Stage trait definition and the context stages run with.
//!
//! A stage is one algorithm applied to the frame's data bag. Stages are
//! built from their `[proc.<group>.<name>]` settings by a factory registered
//! in the [`StageCatalog`](super::StageCatalog), then run once per new frame
//! in priority order.

use std::path::PathBuf;
use std::sync::Arc;

use super::errors::StageResult;
use crate::config::Settings;
use crate::data_bag::DataBag;
use crate::logging::RunLogger;

/// Trait for processing stages.
///
/// # Example
///
/// ```ignore
/// struct CountPoints;
///
/// impl Stage for CountPoints {
///     fn name(&self) -> &str { "count_points" }
///
///     fn required_keys(&self) -> &[&'static str] { &[keys::POINT_CLOUD] }
///
///     fn run(&self, bag: &mut DataBag, ctx: &StageContext) -> StageResult<()> {
///         if !ctx.require(bag, self.name(), self.required_keys()) {
///             return Ok(());
///         }
///         // ...
///         Ok(())
///     }
/// }
/// ```
pub trait Stage: Send + Sync {
    /// Stage name (for logging and error context).
    fn name(&self) -> &str;

    /// Bag keys the stage reads. Checked by the stage itself.
    fn required_keys(&self) -> &[&'static str] {
        &[]
    }

    /// Process the current frame.
    ///
    /// A missing key is not an error: log it through `ctx` and return
    /// `Ok(())`. Returned errors (and panics) are logged by the scheduler and
    /// the remaining stages still run.
    fn run(&self, bag: &mut DataBag, ctx: &StageContext) -> StageResult<()>;
}

/// Read-only context passed to stages.
pub struct StageContext {
    /// Settings the run was configured with.
    pub settings: Arc<Settings>,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
}

impl StageContext {
    pub fn new(settings: Arc<Settings>, logger: Arc<RunLogger>) -> Self {
        Self { settings, logger }
    }

    /// Directory for files written by post stages.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.settings.outputs.path)
    }

    /// Check that `bag` holds every key in `required`.
    ///
    /// Logs an error naming the stage and the first missing key and returns
    /// `false` if one is absent.
    pub fn require(&self, bag: &DataBag, stage: &str, required: &[&str]) -> bool {
        match bag.missing(required) {
            Some(key) => {
                self.logger
                    .error(&format!("[{}] '{}' not found in data bag", stage, key));
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_bag::keys;
    use crate::logging::LogConfig;

    struct MockStage;

    impl Stage for MockStage {
        fn name(&self) -> &str {
            "mock"
        }

        fn required_keys(&self) -> &[&'static str] {
            &[keys::IMAGE]
        }

        fn run(&self, bag: &mut DataBag, ctx: &StageContext) -> StageResult<()> {
            if !ctx.require(bag, self.name(), self.required_keys()) {
                return Ok(());
            }
            bag.insert("mock_ran", true);
            Ok(())
        }
    }

    fn context() -> StageContext {
        StageContext::new(
            Arc::new(Settings::default()),
            Arc::new(RunLogger::detached("stage-test", LogConfig::default())),
        )
    }

    #[test]
    fn missing_key_logs_and_skips() {
        let ctx = context();
        let stage: Box<dyn Stage> = Box::new(MockStage);
        let mut bag = DataBag::new();

        stage.run(&mut bag, &ctx).unwrap();
        assert!(!bag.contains("mock_ran"));
        assert!(ctx
            .logger
            .get_tail()
            .iter()
            .any(|l| l.contains("[mock]") && l.contains(keys::IMAGE)));

        bag.insert(keys::IMAGE, 0u8);
        stage.run(&mut bag, &ctx).unwrap();
        assert_eq!(bag.get::<bool>("mock_ran"), Some(&true));
    }

    #[test]
    fn output_dir_follows_settings() {
        let ctx = context();
        assert_eq!(ctx.output_dir(), PathBuf::from("outputs"));
    }
}
