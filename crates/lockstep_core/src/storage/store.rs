//! Background-prefetching, index-addressed record store.
//!
//! A [`ModalityStore`] owns the ordered list of record basenames for one
//! modality and a cache that a single background thread fills in index
//! order. Readers get cached records when the prefetcher has reached them,
//! and pay for a synchronous parse otherwise.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::enumerate::enumerate;
use super::errors::{StoreError, StoreResult};
use crate::models::{Modality, Record};

/// Turns one record file into its parsed payload.
///
/// Implemented for any `Fn(&Path) -> StoreResult<T>` closure.
pub trait RecordParser<T>: Send + Sync + 'static {
    fn parse(&self, path: &Path) -> StoreResult<T>;
}

impl<T, F> RecordParser<T> for F
where
    F: Fn(&Path) -> StoreResult<T> + Send + Sync + 'static,
{
    fn parse(&self, path: &Path) -> StoreResult<T> {
        self(path)
    }
}

/// One cache position. Failed parses still occupy their index so the cache
/// stays append-only and index-aligned.
enum Slot<T> {
    Ready(Arc<Record<T>>),
    Failed,
}

/// State shared between the store handle and its prefetch thread.
struct Shared<T> {
    /// Append-only; its length is the prefetch high-water mark.
    cache: Mutex<Vec<Slot<T>>>,
    stop: AtomicBool,
}

/// Where a store reads from and how.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub modality: Modality,
    pub dir: PathBuf,
    /// File extension including the dot.
    pub extension: String,
    /// Maximum number of records.
    pub cap: usize,
    /// Sleep between two prefetched records.
    pub io_interval: Duration,
}

/// Prefetching store for one modality.
pub struct ModalityStore<T> {
    modality: Modality,
    dir: PathBuf,
    extension: String,
    basenames: Arc<Vec<String>>,
    parser: Arc<dyn RecordParser<T>>,
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> ModalityStore<T> {
    /// Enumerate records and start the prefetch thread.
    pub fn open(options: StoreOptions, parser: impl RecordParser<T>) -> StoreResult<Self> {
        let basenames = enumerate(&options.dir, &options.extension, options.cap)?;
        Self::with_basenames(options, basenames, Arc::new(parser))
    }

    /// Start a store over an explicit, already ordered basename list.
    pub fn with_basenames(
        options: StoreOptions,
        basenames: Vec<String>,
        parser: Arc<dyn RecordParser<T>>,
    ) -> StoreResult<Self> {
        let basenames = Arc::new(basenames);
        let shared = Arc::new(Shared {
            cache: Mutex::new(Vec::with_capacity(basenames.len())),
            stop: AtomicBool::new(false),
        });

        tracing::debug!(
            modality = %options.modality,
            dir = %options.dir.display(),
            records = basenames.len(),
            "Opening modality store"
        );

        let worker = {
            let job = PrefetchJob {
                modality: options.modality,
                dir: options.dir.clone(),
                extension: options.extension.clone(),
                basenames: Arc::clone(&basenames),
                parser: Arc::clone(&parser),
                shared: Arc::clone(&shared),
                interval: options.io_interval,
            };
            thread::Builder::new()
                .name(format!("prefetch-{}", options.modality))
                .spawn(move || job.run())
                .map_err(StoreError::Spawn)?
        };

        Ok(Self {
            modality: options.modality,
            dir: options.dir,
            extension: options.extension,
            basenames,
            parser,
            shared,
            worker: Some(worker),
        })
    }

    /// Modality served by this store.
    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Number of records; fixed at construction.
    pub fn len(&self) -> usize {
        self.basenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basenames.is_empty()
    }

    /// Ordered record basenames.
    pub fn basenames(&self) -> &[String] {
        &self.basenames
    }

    /// How many indices the prefetcher has processed so far.
    pub fn cached_len(&self) -> usize {
        self.shared.cache.lock().len()
    }

    /// Path of the record file at `index`.
    pub fn record_path(&self, index: usize) -> StoreResult<PathBuf> {
        let basename = self
            .basenames
            .get(index)
            .ok_or(StoreError::IndexOutOfRange {
                index,
                len: self.len(),
            })?;
        Ok(record_path(&self.dir, basename, &self.extension))
    }

    /// Record at `index`.
    ///
    /// Served from the cache when prefetched; otherwise parsed now without
    /// touching the cache.
    pub fn read(&self, index: usize) -> StoreResult<Arc<Record<T>>> {
        let path = self.record_path(index)?;

        {
            let cache = self.shared.cache.lock();
            if let Some(Slot::Ready(record)) = cache.get(index) {
                return Ok(Arc::clone(record));
            }
        }

        let data = self.parser.parse(&path)?;
        Ok(Arc::new(Record::new(path, data)))
    }

    /// Ask the prefetch thread to stop before its next record.
    ///
    /// Idempotent and non-blocking.
    pub fn close(&self) {
        if !self.shared.stop.swap(true, Ordering::SeqCst) {
            tracing::debug!(modality = %self.modality, "Closing modality store");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }

    /// Whether the prefetch thread has exited.
    pub fn prefetch_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }
}

impl<T> Drop for ModalityStore<T> {
    fn drop(&mut self) {
        // Detach; the thread exits on its own at the next record boundary.
        self.shared.stop.store(true, Ordering::SeqCst);
        self.worker.take();
    }
}

fn record_path(dir: &Path, basename: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}{}", basename, extension))
}

/// Everything the prefetch thread owns.
struct PrefetchJob<T> {
    modality: Modality,
    dir: PathBuf,
    extension: String,
    basenames: Arc<Vec<String>>,
    parser: Arc<dyn RecordParser<T>>,
    shared: Arc<Shared<T>>,
    interval: Duration,
}

impl<T: Send + Sync + 'static> PrefetchJob<T> {
    fn run(self) {
        for (index, basename) in self.basenames.iter().enumerate() {
            if self.shared.stop.load(Ordering::SeqCst) {
                tracing::debug!(modality = %self.modality, index, "Prefetch stopped");
                return;
            }

            let path = record_path(&self.dir, basename, &self.extension);
            let slot = match self.parser.parse(&path) {
                Ok(data) => Slot::Ready(Arc::new(Record::new(path, data))),
                Err(e) => {
                    tracing::warn!(
                        modality = %self.modality,
                        index,
                        error = %e,
                        "Prefetch parse failed, skipping record"
                    );
                    Slot::Failed
                }
            };
            self.shared.cache.lock().push(slot);

            if !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }
        tracing::debug!(
            modality = %self.modality,
            records = self.basenames.len(),
            "Prefetch complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tempfile::tempdir;

    fn options(dir: &Path, cap: usize, io_interval: Duration) -> StoreOptions {
        StoreOptions {
            modality: Modality::Lidar,
            dir: dir.to_path_buf(),
            extension: ".txt".to_string(),
            cap,
            io_interval,
        }
    }

    fn write_records(dir: &Path, count: usize) {
        for i in 0..count {
            fs::write(dir.join(format!("{:06}.txt", i)), format!("record {}", i)).unwrap();
        }
    }

    /// Parser that reads the file and counts calls per path.
    fn counting_parser(
        counts: Arc<Mutex<std::collections::HashMap<PathBuf, usize>>>,
    ) -> impl RecordParser<String> {
        move |path: &Path| {
            *counts.lock().entry(path.to_path_buf()).or_insert(0) += 1;
            fs::read_to_string(path).map_err(|e| StoreError::io("read", e))
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn length_is_min_of_files_and_cap() {
        let dir = tempdir().unwrap();
        write_records(dir.path(), 5);

        let capped: ModalityStore<String> =
            ModalityStore::open(options(dir.path(), 3, Duration::ZERO), |p: &Path| {
                fs::read_to_string(p).map_err(|e| StoreError::io("read", e))
            })
            .unwrap();
        assert_eq!(capped.len(), 3);

        let uncapped: ModalityStore<String> =
            ModalityStore::open(options(dir.path(), 10, Duration::ZERO), |p: &Path| {
                fs::read_to_string(p).map_err(|e| StoreError::io("read", e))
            })
            .unwrap();
        assert_eq!(uncapped.len(), 5);
    }

    #[test]
    fn cached_index_is_parsed_once() {
        let dir = tempdir().unwrap();
        write_records(dir.path(), 3);
        let counts = Arc::new(Mutex::new(std::collections::HashMap::new()));

        let store = ModalityStore::open(
            options(dir.path(), 10, Duration::ZERO),
            counting_parser(Arc::clone(&counts)),
        )
        .unwrap();
        wait_for(|| store.prefetch_finished());
        assert_eq!(store.cached_len(), 3);

        let first = store.read(1).unwrap();
        let second = store.read(1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.data, "record 1");

        let path = store.record_path(1).unwrap();
        assert_eq!(counts.lock()[&path], 1);
    }

    #[test]
    fn uncached_index_is_parsed_per_read() {
        let dir = tempdir().unwrap();
        write_records(dir.path(), 4);
        let counts = Arc::new(Mutex::new(std::collections::HashMap::new()));

        // Close immediately so the prefetcher never reaches index 3.
        let store = ModalityStore::open(
            options(dir.path(), 10, Duration::from_millis(200)),
            counting_parser(Arc::clone(&counts)),
        )
        .unwrap();
        store.close();

        let path = store.record_path(3).unwrap();
        store.read(3).unwrap();
        store.read(3).unwrap();
        wait_for(|| store.prefetch_finished());
        assert!(store.cached_len() <= 1);
        assert_eq!(counts.lock()[&path], 2);
    }

    #[test]
    fn out_of_range_read_fails() {
        let dir = tempdir().unwrap();
        write_records(dir.path(), 2);
        let store: ModalityStore<String> =
            ModalityStore::open(options(dir.path(), 10, Duration::ZERO), |p: &Path| {
                fs::read_to_string(p).map_err(|e| StoreError::io("read", e))
            })
            .unwrap();

        match store.read(2) {
            Err(StoreError::IndexOutOfRange { index: 2, len: 2 }) => {}
            other => panic!("unexpected: {:?}", other.map(|r| r.data.clone())),
        }
    }

    #[test]
    fn close_is_non_blocking_and_bounds_extra_parses() {
        let parses = Arc::new(AtomicUsize::new(0));
        let parses_clone = Arc::clone(&parses);
        let basenames: Vec<String> = (0..50).map(|i| i.to_string()).collect();

        let store: ModalityStore<usize> = ModalityStore::with_basenames(
            StoreOptions {
                modality: Modality::Camera,
                dir: PathBuf::from("unused"),
                extension: ".png".to_string(),
                cap: 50,
                io_interval: Duration::ZERO,
            },
            basenames,
            Arc::new(move |_: &Path| -> StoreResult<usize> {
                thread::sleep(Duration::from_millis(20));
                Ok(parses_clone.fetch_add(1, Ordering::SeqCst))
            }),
        )
        .unwrap();

        wait_for(|| parses.load(Ordering::SeqCst) >= 2);

        let started = Instant::now();
        store.close();
        let at_close = parses.load(Ordering::SeqCst);
        assert!(started.elapsed() < Duration::from_millis(15));

        store.close();
        wait_for(|| store.prefetch_finished());
        assert!(parses.load(Ordering::SeqCst) <= at_close + 1);
        assert!(store.is_closed());
    }

    #[test]
    fn failed_prefetch_keeps_index_alignment() {
        let dir = tempdir().unwrap();
        write_records(dir.path(), 3);
        fs::write(dir.path().join("000001.txt"), "bad").unwrap();

        let store: ModalityStore<String> =
            ModalityStore::open(options(dir.path(), 10, Duration::ZERO), |p: &Path| -> StoreResult<String> {
                let text = fs::read_to_string(p).map_err(|e| StoreError::io("read", e))?;
                if text == "bad" {
                    return Err(StoreError::parse(p, "corrupt record"));
                }
                Ok(text)
            })
            .unwrap();
        wait_for(|| store.prefetch_finished());

        assert_eq!(store.cached_len(), 3);
        assert!(matches!(store.read(1), Err(StoreError::Parse { .. })));
        assert_eq!(store.read(2).unwrap().data, "record 2");
    }

    #[test]
    fn empty_store_has_no_records() {
        let dir = tempdir().unwrap();
        let store: ModalityStore<String> =
            ModalityStore::open(options(dir.path(), 10, Duration::ZERO), |p: &Path| {
                fs::read_to_string(p).map_err(|e| StoreError::io("read", e))
            })
            .unwrap();
        assert!(store.is_empty());
        assert!(store.read(0).is_err());
    }
}
