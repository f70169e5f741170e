//! Per-frame key/value bag handed through the stage groups.
//!
//! The bag is rebuilt whenever the frame index changes. Modality stores fill
//! it under the fixed keys in [`keys`]; stages add, replace or remove entries
//! as they see fit. Values are type-erased and fetched back by type.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};

use crate::models::{Label, Modality};

/// Fixed keys used by the scheduler and the reference stages.
pub mod keys {
    use crate::models::Modality;

    pub const POINT_CLOUD_PATH: &str = "current_point_cloud_path";
    /// `Arc<Record<PointCloud>>`
    pub const POINT_CLOUD: &str = "current_point_cloud";

    pub const IMAGE_PATH: &str = "current_image_path";
    /// `Arc<Record<CameraImage>>`
    pub const IMAGE: &str = "current_image";

    pub const CALIB_PATH: &str = "current_calib_path";
    /// `Arc<Record<Calibration>>`
    pub const CALIB: &str = "current_calib_data";

    pub const LABEL_PATH: &str = "current_label_path";
    /// `Vec<Label>`, the accumulated annotations of the frame.
    pub const LABEL_LIST: &str = "current_label_list";

    /// Frame index the bag was built for (`usize`).
    pub const FRAME_INDEX: &str = "current_frame_index";

    /// `(path_key, data_key)` owned by a modality.
    pub fn modality_keys(modality: Modality) -> (&'static str, &'static str) {
        match modality {
            Modality::Lidar => (POINT_CLOUD_PATH, POINT_CLOUD),
            Modality::Camera => (IMAGE_PATH, IMAGE),
            Modality::Calib => (CALIB_PATH, CALIB),
            Modality::Label => (LABEL_PATH, LABEL_LIST),
        }
    }

    /// Whether `key` is refreshed by the scheduler every frame.
    pub fn is_modality_key(key: &str) -> bool {
        Modality::ALL.iter().any(|m| {
            let (path, data) = modality_keys(*m);
            key == path || key == data
        })
    }
}

type Value = Box<dyn Any + Send + Sync>;

/// Named, type-erased values for one frame.
#[derive(Default)]
pub struct DataBag {
    values: HashMap<String, Value>,
    persistent: BTreeSet<String>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Value under `key` if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Remove `key`, returning its value when it had type `T`.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let value = self.values.remove(key)?;
        value.downcast::<T>().ok().map(|b| *b)
    }

    /// Remove `key` regardless of its type.
    pub fn discard(&mut self, key: &str) -> bool {
        self.persistent.remove(key);
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// First of `required` that is absent, if any.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Option<&'a str> {
        required.iter().copied().find(|k| !self.contains(k))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Carry `key` over into the next frame's bag.
    ///
    /// Modality keys are never carried over.
    pub fn persist(&mut self, key: impl Into<String>) {
        self.persistent.insert(key.into());
    }

    pub fn is_persistent(&self, key: &str) -> bool {
        self.persistent.contains(key)
    }

    /// Bag for the next frame: only persistent, non-modality entries survive.
    pub fn next_frame(mut self) -> Self {
        self.persistent.retain(|k| !keys::is_modality_key(k));
        let persistent = self.persistent;
        let values = self
            .values
            .into_iter()
            .filter(|(k, _)| persistent.contains(k))
            .collect();
        Self { values, persistent }
    }

    /// Drop both keys of `modality`.
    pub fn clear_modality(&mut self, modality: Modality) {
        let (path, data) = keys::modality_keys(modality);
        self.values.remove(path);
        self.values.remove(data);
    }

    /// Frame label list, created empty if absent.
    pub fn labels_mut(&mut self) -> &mut Vec<Label> {
        let present = self.get::<Vec<Label>>(keys::LABEL_LIST).is_some();
        if !present {
            self.insert(keys::LABEL_LIST, Vec::<Label>::new());
        }
        self.values
            .get_mut(keys::LABEL_LIST)
            .and_then(|v| v.downcast_mut::<Vec<Label>>())
            .unwrap_or_else(|| unreachable!("label list inserted above"))
    }

    /// Frame label list, if any.
    pub fn labels(&self) -> Option<&Vec<Label>> {
        self.get(keys::LABEL_LIST)
    }
}

impl std::fmt::Debug for DataBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBag")
            .field("keys", &self.keys())
            .field("persistent", &self.persistent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn typed_get_and_remove() {
        let mut bag = DataBag::new();
        bag.insert("count", 3usize);
        bag.insert(keys::IMAGE_PATH, PathBuf::from("a.png"));

        assert_eq!(bag.get::<usize>("count"), Some(&3));
        assert!(bag.get::<String>("count").is_none());
        *bag.get_mut::<usize>("count").unwrap() += 1;
        assert_eq!(bag.remove::<usize>("count"), Some(4));
        assert!(!bag.contains("count"));
        assert_eq!(bag.keys(), vec![keys::IMAGE_PATH]);
    }

    #[test]
    fn missing_reports_first_absent_key() {
        let mut bag = DataBag::new();
        bag.insert(keys::POINT_CLOUD, 1u8);
        assert_eq!(bag.missing(&[keys::POINT_CLOUD, keys::IMAGE, keys::CALIB]), Some(keys::IMAGE));
        assert_eq!(bag.missing(&[keys::POINT_CLOUD]), None);
    }

    #[test]
    fn next_frame_keeps_only_persistent_entries() {
        let mut bag = DataBag::new();
        bag.insert("model", String::from("weights"));
        bag.insert("scratch", 1u32);
        bag.insert(keys::POINT_CLOUD_PATH, PathBuf::from("0.bin"));
        bag.persist("model");
        bag.persist(keys::POINT_CLOUD_PATH);

        let next = bag.next_frame();
        assert_eq!(next.get::<String>("model").map(String::as_str), Some("weights"));
        assert!(!next.contains("scratch"));
        assert!(!next.contains(keys::POINT_CLOUD_PATH));
        assert!(next.is_persistent("model"));
        assert!(!next.is_persistent(keys::POINT_CLOUD_PATH));
    }

    #[test]
    fn labels_mut_creates_list() {
        let mut bag = DataBag::new();
        assert!(bag.labels().is_none());
        bag.labels_mut().push(Label::new("Car"));
        bag.labels_mut().push(Label::new("Van"));
        assert_eq!(bag.labels().unwrap().len(), 2);
    }

    #[test]
    fn clear_modality_removes_both_keys() {
        let mut bag = DataBag::new();
        bag.insert(keys::CALIB_PATH, PathBuf::from("c.txt"));
        bag.insert(keys::CALIB, 0u8);
        bag.clear_modality(Modality::Calib);
        assert!(bag.is_empty());
    }
}
