//! Type-erased view of a modality store, as seen by the scheduler.

use std::sync::Arc;
use std::time::Duration;

use super::enumerate::enumerate;
use super::errors::StoreResult;
use super::readers::{label_parser, read_calibration, read_image, read_point_cloud};
use super::store::{ModalityStore, StoreOptions};
use crate::config::DataSettings;
use crate::data_bag::{keys, DataBag};
use crate::models::{Calibration, CameraImage, Label, LabelFormat, Modality, PointCloud, Record};

/// A store that can put its record for a frame into a [`DataBag`].
pub trait FrameSource: Send + Sync {
    fn modality(&self) -> Modality;

    /// Number of records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the record at `index` and insert it under the modality's keys.
    fn load_into(&self, index: usize, bag: &mut DataBag) -> StoreResult<()>;

    /// Stop background work without waiting for it.
    fn close(&self);
}

type Fill<T> = fn(&mut DataBag, &'static str, Arc<Record<T>>);

/// A [`ModalityStore`] paired with how its records enter the bag.
pub struct BagEntry<T> {
    store: ModalityStore<T>,
    fill: Fill<T>,
}

impl<T: Send + Sync + 'static> BagEntry<T> {
    /// Records are inserted as shared `Arc<Record<T>>`.
    pub fn shared(store: ModalityStore<T>) -> Self {
        Self {
            store,
            fill: insert_shared::<T>,
        }
    }

    pub fn store(&self) -> &ModalityStore<T> {
        &self.store
    }
}

impl BagEntry<Vec<Label>> {
    /// Labels are copied into an owned list that stages extend.
    pub fn labels(store: ModalityStore<Vec<Label>>) -> Self {
        Self {
            store,
            fill: insert_label_list,
        }
    }
}

fn insert_shared<T: Send + Sync + 'static>(
    bag: &mut DataBag,
    key: &'static str,
    record: Arc<Record<T>>,
) {
    bag.insert(key, record);
}

fn insert_label_list(bag: &mut DataBag, key: &'static str, record: Arc<Record<Vec<Label>>>) {
    bag.insert(key, record.data.clone());
}

impl<T: Send + Sync + 'static> FrameSource for BagEntry<T> {
    fn modality(&self) -> Modality {
        self.store.modality()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn load_into(&self, index: usize, bag: &mut DataBag) -> StoreResult<()> {
        let record = self.store.read(index)?;
        let (path_key, data_key) = keys::modality_keys(self.store.modality());
        bag.insert(path_key, record.path.clone());
        (self.fill)(bag, data_key, record);
        Ok(())
    }

    fn close(&self) {
        self.store.close();
    }
}

/// Open the store of `modality` with its reference reader.
///
/// `label_format` is only consulted for [`Modality::Label`].
pub fn open_source(
    data: &DataSettings,
    modality: Modality,
    label_format: LabelFormat,
    io_interval: Duration,
) -> StoreResult<Box<dyn FrameSource>> {
    let options = |extension: &str| StoreOptions {
        modality,
        dir: data.modality_dir(modality),
        extension: extension.to_string(),
        cap: data.size,
        io_interval,
    };

    let source: Box<dyn FrameSource> = match modality {
        Modality::Lidar => Box::new(BagEntry::shared(ModalityStore::<PointCloud>::open(
            options(&data.pcd_type),
            read_point_cloud,
        )?)),
        Modality::Camera => Box::new(BagEntry::shared(ModalityStore::<CameraImage>::open(
            options(&data.img_type),
            read_image,
        )?)),
        Modality::Calib => Box::new(BagEntry::shared(ModalityStore::<Calibration>::open(
            options(&data.clb_type),
            read_calibration,
        )?)),
        Modality::Label => {
            let store_options = options(label_format.label_extension());
            let basenames = enumerate(
                &store_options.dir,
                &store_options.extension,
                store_options.cap,
            )?;
            let parser = label_parser(
                label_format,
                data.modality_dir(Modality::Calib),
                data.clb_type.clone(),
            );
            Box::new(BagEntry::labels(ModalityStore::with_basenames(
                store_options,
                basenames,
                parser,
            )?))
        }
    };

    tracing::info!(
        modality = %modality,
        records = source.len(),
        "Opened modality store"
    );
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::storage::readers::encode_points;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lidar_source_fills_path_and_record() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data.path = dir.path().to_string_lossy().into_owned();
        let lidar_dir = settings.data.modality_dir(Modality::Lidar);
        fs::create_dir_all(&lidar_dir).unwrap();
        fs::write(lidar_dir.join("000000.bin"), encode_points(&[[1.0, 2.0, 3.0, 0.0]])).unwrap();

        let source =
            open_source(&settings.data, Modality::Lidar, LabelFormat::Kitti, Duration::ZERO)
                .unwrap();
        assert_eq!(source.modality(), Modality::Lidar);

        let mut bag = DataBag::new();
        source.load_into(0, &mut bag).unwrap();
        let record = bag
            .get::<Arc<Record<PointCloud>>>(keys::POINT_CLOUD)
            .unwrap();
        assert_eq!(record.data.len(), 1);
        assert!(bag.contains(keys::POINT_CLOUD_PATH));
        assert!(source.load_into(1, &mut bag).is_err());
        source.close();
    }

    #[test]
    fn label_source_inserts_owned_list() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data.path = dir.path().to_string_lossy().into_owned();
        let label_dir = settings.data.modality_dir(Modality::Label);
        fs::create_dir_all(&label_dir).unwrap();
        fs::write(
            label_dir.join("000000.json"),
            r#"[{"obj_type": "Car", "psr": {"position": {"x": 0, "y": 0, "z": 0},
                "scale": {"x": 1, "y": 1, "z": 1}, "rotation": {"x": 0, "y": 0, "z": 0}}}]"#,
        )
        .unwrap();

        let source = open_source(
            &settings.data,
            Modality::Label,
            LabelFormat::SustechPoints,
            Duration::ZERO,
        )
        .unwrap();

        let mut bag = DataBag::new();
        source.load_into(0, &mut bag).unwrap();
        bag.labels_mut().push(Label::new("Pedestrian"));
        assert_eq!(bag.labels().unwrap().len(), 2);
    }

    #[test]
    fn missing_directory_gives_empty_source() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data.path = dir.path().to_string_lossy().into_owned();

        let source =
            open_source(&settings.data, Modality::Camera, LabelFormat::Kitti, Duration::ZERO)
                .unwrap();
        assert!(source.is_empty());
        assert!(source.load_into(0, &mut DataBag::new()).is_err());
    }
}
