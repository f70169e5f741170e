//! Stage catalog (name → factory) and the per-run stage registry.

use std::collections::BTreeMap;

use super::errors::{EngineError, EngineResult, StageResult};
use super::stage::Stage;
use crate::config::{ProcSettings, StageSettings};
use crate::models::StageGroup;

/// Builds a stage from its settings.
pub type StageFactory = Box<dyn Fn(&StageSettings) -> StageResult<Box<dyn Stage>> + Send + Sync>;

/// Explicit table of every stage implementation the engine can run, keyed
/// by group and name.
#[derive(Default)]
pub struct StageCatalog {
    factories: BTreeMap<StageGroup, BTreeMap<String, StageFactory>>,
}

impl StageCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` as `group/name`, replacing any earlier entry.
    pub fn register<F>(&mut self, group: StageGroup, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&StageSettings) -> StageResult<Box<dyn Stage>> + Send + Sync + 'static,
    {
        self.factories
            .entry(group)
            .or_default()
            .insert(name.into(), Box::new(factory));
        self
    }

    /// Register a factory (builder pattern).
    pub fn with<F>(mut self, group: StageGroup, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&StageSettings) -> StageResult<Box<dyn Stage>> + Send + Sync + 'static,
    {
        self.register(group, name, factory);
        self
    }

    pub fn contains(&self, group: StageGroup, name: &str) -> bool {
        self.factories
            .get(&group)
            .is_some_and(|g| g.contains_key(name))
    }

    /// Registered names of `group`, sorted.
    pub fn names(&self, group: StageGroup) -> Vec<String> {
        self.factories
            .get(&group)
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn build(
        &self,
        group: StageGroup,
        name: &str,
        settings: &StageSettings,
    ) -> EngineResult<Box<dyn Stage>> {
        let factory = self
            .factories
            .get(&group)
            .and_then(|g| g.get(name))
            .ok_or_else(|| EngineError::UnknownStage {
                group,
                name: name.to_string(),
                available: self.names(group),
            })?;
        factory(settings).map_err(|source| EngineError::StageBuild {
            group,
            name: name.to_string(),
            source,
        })
    }
}

/// An enabled, built stage with its ordering key.
pub struct StageEntry {
    name: String,
    priority: i64,
    stage: Box<dyn Stage>,
}

impl StageEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn stage(&self) -> &dyn Stage {
        self.stage.as_ref()
    }
}

/// Enabled stages of every group, each group sorted by ascending priority
/// and then by name.
#[derive(Default)]
pub struct StageRegistry {
    groups: BTreeMap<StageGroup, Vec<StageEntry>>,
}

impl StageRegistry {
    /// Resolve every enabled `[proc.*.*]` entry through `catalog`.
    ///
    /// Fails on the first enabled name the catalog does not know.
    pub fn build(catalog: &StageCatalog, proc: &ProcSettings) -> EngineResult<Self> {
        let mut groups = BTreeMap::new();

        for group in StageGroup::EXECUTION_ORDER {
            let mut entries = Vec::new();
            for (name, settings) in proc.group(group) {
                if !settings.enabled {
                    continue;
                }
                let stage = catalog.build(group, name, settings)?;
                entries.push(StageEntry {
                    name: name.clone(),
                    priority: settings.priority,
                    stage,
                });
            }
            entries.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.name.cmp(&b.name))
            });
            groups.insert(group, entries);
        }

        Ok(Self { groups })
    }

    /// Entries of `group` in execution order.
    pub fn group(&self, group: StageGroup) -> &[StageEntry] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of enabled stages.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `group/name` of every stage, in the order a tick runs them.
    pub fn execution_plan(&self) -> Vec<String> {
        StageGroup::EXECUTION_ORDER
            .iter()
            .flat_map(|g| {
                self.group(*g)
                    .iter()
                    .map(move |e| format!("{}/{}", g, e.name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_bag::DataBag;
    use crate::orchestrator::errors::StageError;
    use crate::orchestrator::stage::StageContext;

    struct Named(String);

    impl Stage for Named {
        fn name(&self) -> &str {
            &self.0
        }

        fn run(&self, _bag: &mut DataBag, _ctx: &StageContext) -> StageResult<()> {
            Ok(())
        }
    }

    fn catalog(group: StageGroup, names: &[&'static str]) -> StageCatalog {
        let mut catalog = StageCatalog::new();
        for &name in names {
            catalog.register(group, name, move |_| {
                Ok(Box::new(Named(name.to_string())) as Box<dyn Stage>)
            });
        }
        catalog
    }

    fn proc_with(group: StageGroup, stages: &[(&str, bool, i64)]) -> ProcSettings {
        let mut proc = ProcSettings::default();
        for (name, enabled, priority) in stages {
            proc.group_mut(group)
                .insert(name.to_string(), StageSettings::new(*enabled, *priority));
        }
        proc
    }

    fn names(registry: &StageRegistry, group: StageGroup) -> Vec<&str> {
        registry.group(group).iter().map(|e| e.name()).collect()
    }

    #[test]
    fn orders_by_priority() {
        let catalog = catalog(StageGroup::Lidar, &["a", "b", "c"]);
        let proc = proc_with(
            StageGroup::Lidar,
            &[("a", true, 3), ("b", true, 1), ("c", true, 2)],
        );
        let registry = StageRegistry::build(&catalog, &proc).unwrap();
        assert_eq!(names(&registry, StageGroup::Lidar), vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_priorities_order_by_name() {
        let catalog = catalog(StageGroup::Camera, &["zeta", "alpha", "mid"]);
        let proc = proc_with(
            StageGroup::Camera,
            &[("zeta", true, 1), ("alpha", true, 1), ("mid", true, 0)],
        );
        let registry = StageRegistry::build(&catalog, &proc).unwrap();
        assert_eq!(
            names(&registry, StageGroup::Camera),
            vec!["mid", "alpha", "zeta"]
        );
    }

    #[test]
    fn disabled_entries_are_skipped() {
        let catalog = catalog(StageGroup::Label, &["keep", "drop"]);
        let proc = proc_with(StageGroup::Label, &[("keep", true, 1), ("drop", false, 0)]);
        let registry = StageRegistry::build(&catalog, &proc).unwrap();
        assert_eq!(names(&registry, StageGroup::Label), vec!["keep"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_enabled_stage_fails_with_registered_names() {
        let catalog = catalog(StageGroup::Lidar, &["crop", "denoise"]);
        let proc = proc_with(StageGroup::Lidar, &[("segment", true, 0)]);

        match StageRegistry::build(&catalog, &proc) {
            Err(EngineError::UnknownStage {
                group,
                name,
                available,
            }) => {
                assert_eq!(group, StageGroup::Lidar);
                assert_eq!(name, "segment");
                assert_eq!(available, vec!["crop", "denoise"]);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn unknown_disabled_stage_is_ignored() {
        let catalog = StageCatalog::new();
        let proc = proc_with(StageGroup::Post, &[("ghost", false, 0)]);
        assert!(StageRegistry::build(&catalog, &proc).unwrap().is_empty());
    }

    #[test]
    fn factory_errors_surface_as_build_errors() {
        let catalog = StageCatalog::new().with(StageGroup::Post, "strict", |_| {
            Err(StageError::missing_parameter("path"))
        });
        let proc = proc_with(StageGroup::Post, &[("strict", true, 0)]);
        assert!(matches!(
            StageRegistry::build(&catalog, &proc),
            Err(EngineError::StageBuild { .. })
        ));
    }

    #[test]
    fn execution_plan_puts_post_last() {
        let mut catalog = catalog(StageGroup::Post, &["export"]);
        catalog.register(StageGroup::Lidar, "crop", |_| {
            Ok(Box::new(Named("crop".to_string())) as Box<dyn Stage>)
        });
        let mut proc = proc_with(StageGroup::Post, &[("export", true, -10)]);
        proc.group_mut(StageGroup::Lidar)
            .insert("crop".to_string(), StageSettings::new(true, 100));

        let registry = StageRegistry::build(&catalog, &proc).unwrap();
        assert_eq!(registry.execution_plan(), vec!["lidar/crop", "post/export"]);
    }
}
