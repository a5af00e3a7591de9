use std::{
    ffi::OsString,
    io::BufWriter,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU32, Ordering::Relaxed},
};

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use parking_lot::{Mutex, RwLock};
use vid_fingerprint_lib::{Fingerprint, LAYOUT_VERSION};

use crate::{
    errors::{StoreError::*, StoreResult},
    query::{SimilarMatch, StoreStats},
    record::{FingerprintRecord, NewRecord},
    store_file::{StoreFile, Tables},
};

/// Options for how a store writes to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Number of modifications buffered in memory before the store file is rewritten.
    /// 1 writes every modification through immediately.
    pub save_threshold: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { save_threshold: 1 }
    }
}

/// A persistent collection of fingerprints, unique by fingerprint bits.
///
/// The whole collection is held in memory and saved to a single file. All methods take
/// `&self`, and the store may be shared between threads.
#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    options: StoreOptions,
    tables: RwLock<Tables>,
    modified_count: AtomicU32,
    save_lock: Mutex<()>,
}

impl FingerprintStore {
    /// Open the store at `path`, or start an empty one if the file does not exist yet.
    ///
    /// # Errors
    /// Returns `Err` if the file exists but cannot be read, or its contents are corrupt.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_options(path, StoreOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = Self::load(&path)?;

        Ok(Self {
            path,
            options,
            tables: RwLock::new(tables),
            modified_count: AtomicU32::default(),
            save_lock: Mutex::default(),
        })
    }

    /// Flush any buffered modifications and close the store.
    pub fn close(self) -> StoreResult<()> {
        self.flush()
    }

    /// Write buffered modifications to disk, if there are any.
    ///
    /// If the write fails the modifications stay pending, so a later `flush` or `close`
    /// tries again and reports the failure again.
    pub fn flush(&self) -> StoreResult<()> {
        let pending = self.modified_count.swap(0, Relaxed);
        if pending == 0 {
            return Ok(());
        }

        self.save().map_err(|e| {
            self.modified_count.fetch_add(pending, Relaxed);
            e
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a record, or merge it into the record that already has the same fingerprint.
    /// Returns the id of the inserted or merged record.
    ///
    /// When merging, each optional field is overwritten only if the incoming record has a
    /// value for it. The fingerprint, id and creation time of the existing record never change.
    ///
    /// # Errors
    /// * [`StoreError::LayoutVersionConflict`](crate::StoreError::LayoutVersionConflict) if the
    ///   stored record has the same bits but another layout version. Nothing is changed.
    /// * An I/O error if the store file cannot be written. The record is kept in memory and
    ///   saved by the next successful write.
    pub fn put(&self, record: NewRecord) -> StoreResult<u64> {
        self.put_at(record, Utc::now())
    }

    #[doc(hidden)]
    pub fn put_at(&self, record: NewRecord, created_at: DateTime<Utc>) -> StoreResult<u64> {
        let id = {
            let mut tables = self.tables.write();
            let existing_id = tables.by_fingerprint.get(&record.fingerprint).copied();

            match existing_id {
                Some(id) => {
                    if let Some(existing) = tables.records.get_mut(&id) {
                        if existing.layout_version != record.layout_version {
                            return Err(LayoutVersionConflict {
                                id,
                                stored: existing.layout_version,
                                incoming: record.layout_version,
                            });
                        }
                        debug!(target: "store_transactions", "merging into record {id}");
                        existing.fields.merge_from(record.fields);
                    }
                    id
                }
                None => {
                    let id = tables.next_id;
                    tables.next_id += 1;
                    debug!(target: "store_transactions", "inserting record {id}: {}", record.fingerprint);

                    tables.by_fingerprint.insert(record.fingerprint, id);
                    tables.records.insert(
                        id,
                        FingerprintRecord {
                            id,
                            fingerprint: record.fingerprint,
                            layout_version: record.layout_version,
                            created_at,
                            fields: record.fields,
                        },
                    );
                    id
                }
            }
        };

        self.record_modification()?;
        Ok(id)
    }

    /// Remove a record. Returns whether it existed.
    pub fn delete(&self, id: u64) -> StoreResult<bool> {
        let removed = {
            let mut tables = self.tables.write();
            match tables.records.remove(&id) {
                Some(record) => {
                    tables.by_fingerprint.remove(&record.fingerprint);
                    true
                }
                None => false,
            }
        };

        if removed {
            debug!(target: "store_transactions", "deleted record {id}");
            self.record_modification()?;
        }
        Ok(removed)
    }

    pub fn get(&self, id: u64) -> Option<FingerprintRecord> {
        self.tables.read().records.get(&id).cloned()
    }

    pub fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<FingerprintRecord> {
        let tables = self.tables.read();
        let id = tables.by_fingerprint.get(fingerprint)?;
        tables.records.get(id).cloned()
    }

    /// Every record within `threshold` bits of `fingerprint`, optionally restricted to one
    /// platform. Results are ordered by distance, then by id, and truncated to `limit`.
    ///
    /// Records created with a different layout version are not comparable and are skipped.
    pub fn query_similar(
        &self,
        fingerprint: &Fingerprint,
        threshold: u32,
        platform: Option<&str>,
        limit: usize,
    ) -> Vec<SimilarMatch> {
        let tables = self.tables.read();

        let mut skipped = 0;
        let mut matches = tables
            .records
            .values()
            .filter(|record| match platform {
                Some(platform) => record.fields.platform.as_deref() == Some(platform),
                None => true,
            })
            .filter(|record| {
                let comparable = record.layout_version == LAYOUT_VERSION;
                if !comparable {
                    skipped += 1;
                }
                comparable
            })
            .filter_map(|record| {
                let distance = fingerprint.hamming_distance(&record.fingerprint);
                (distance <= threshold).then(|| SimilarMatch::new(record.clone(), distance))
            })
            .collect::<Vec<_>>();
        drop(tables);

        if skipped > 0 {
            warn!(target: "store_queries",
                "skipped {skipped} records with a layout version other than {LAYOUT_VERSION}"
            );
        }

        matches.sort_by_key(|m| (m.distance, m.record.id));
        matches.truncate(limit);

        trace!(target: "store_queries", "{} matches within {threshold} bits", matches.len());
        matches
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats::from_records(self.tables.read().records.values())
    }

    fn record_modification(&self) -> StoreResult<()> {
        let count = self.modified_count.fetch_add(1, Relaxed) + 1;
        if count >= self.options.save_threshold.max(1) {
            self.flush()
        } else {
            Ok(())
        }
    }

    fn save(&self) -> StoreResult<()> {
        let _save_guard = self.save_lock.lock();

        //The store file and its directory may not exist yet.
        if !self.path.exists() {
            if let Some(parent_dir) = self.path.parent() {
                std::fs::create_dir_all(parent_dir).map_err(|e| StoreFileIo {
                    src: e,
                    path: self.path.clone(),
                })?;
            }
        }

        let snapshot = StoreFile::from_tables(&self.tables.read());

        info!(target: "store_transactions",
            "saving store at {} with {} records",
            self.path.display(), self.len()
        );

        //Save to a temporary file first, so that a crash while saving cannot destroy the
        //existing store.
        let temp_store_path = temp_path_for(&self.path);
        let temp_file = std::fs::File::create(&temp_store_path).map_err(|e| StoreFileIo {
            src: e,
            path: temp_store_path.clone(),
        })?;

        let mut store_buf = BufWriter::new(temp_file);
        bincode::serialize_into(&mut store_buf, &snapshot).map_err(|e| Serialization {
            src: format!("{e}"),
            path: self.path.clone(),
        })?;

        let temp_file = store_buf.into_inner().map_err(|e| StoreFileIo {
            src: e.into_error(),
            path: temp_store_path.clone(),
        })?;

        temp_file.sync_all().map_err(|e| StoreFileIo {
            src: e,
            path: temp_store_path.clone(),
        })?;

        std::fs::rename(&temp_store_path, &self.path).map_err(|e| StoreFileIo {
            src: e,
            path: self.path.clone(),
        })?;

        Ok(())
    }

    fn load(path: &Path) -> StoreResult<Tables> {
        //A missing file is not an error. The store simply starts empty.
        if !path.exists() {
            info!(target: "store_startup", "Creating new store: {}", path.display());
            return Ok(Tables::new());
        }

        let store_file = std::fs::File::open(path).map_err(|e| StoreFileIo {
            src: e,
            path: path.to_path_buf(),
        })?;

        let reader = std::io::BufReader::new(store_file);
        let data: StoreFile = bincode::deserialize_from(reader).map_err(|e| Corrupt {
            reason: format!("{e}"),
            path: path.to_path_buf(),
        })?;

        let tables = data.into_tables(path)?;

        info!(target: "store_startup",
            "Loaded store. Path: {}, Records: {}", path.display(), tables.records.len()
        );
        Ok(tables)
    }
}

//"store.bin" is saved through "store.bin.tmp".
fn temp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map(OsString::from).unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use rand::prelude::*;

    use super::*;

    fn temp_store(dir: &tempfile::TempDir) -> FingerprintStore {
        FingerprintStore::open(dir.path().join("store.bin")).unwrap()
    }

    #[test]
    fn test_ids_are_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let mut rng = StdRng::seed_from_u64(1);

        let a = store.put(NewRecord::new(Fingerprint::random_fingerprint(&mut rng))).unwrap();
        let b = store.put(NewRecord::new(Fingerprint::random_fingerprint(&mut rng))).unwrap();
        assert!(store.delete(b).unwrap());
        let c = store.put(NewRecord::new(Fingerprint::random_fingerprint(&mut rng))).unwrap();

        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn test_merge_keeps_creation_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let fp = Fingerprint::random_fingerprint(&mut StdRng::seed_from_u64(2));

        let first = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let id = store.put_at(NewRecord::new(fp).with_video_id("a"), first).unwrap();
        let merged_id = store.put_at(NewRecord::new(fp).with_platform("p"), later).unwrap();
        assert_eq!(id, merged_id);

        let record = store.get(id).unwrap();
        assert_eq!(record.created_at, first);
        assert_eq!(record.fields.video_id.as_deref(), Some("a"));
        assert_eq!(record.fields.platform.as_deref(), Some("p"));
    }

    #[test]
    fn test_save_threshold_buffers_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.bin");
        let store =
            FingerprintStore::open_with_options(&path, StoreOptions { save_threshold: 3 }).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        for _i in 0..2 {
            store.put(NewRecord::new(Fingerprint::random_fingerprint(&mut rng))).unwrap();
        }
        assert!(!path.exists());

        store.put(NewRecord::new(Fingerprint::random_fingerprint(&mut rng))).unwrap();
        assert!(path.exists());

        store.put(NewRecord::new(Fingerprint::random_fingerprint(&mut rng))).unwrap();
        assert_eq!(FingerprintStore::open(&path).unwrap().len(), 3);

        store.close().unwrap();
        assert_eq!(FingerprintStore::open(&path).unwrap().len(), 4);
    }

    #[test]
    fn test_temp_path_never_aliases_the_store() {
        assert_eq!(temp_path_for(Path::new("/db/store.bin")), Path::new("/db/store.bin.tmp"));
        assert_eq!(temp_path_for(Path::new("/db/store.tmp")), Path::new("/db/store.tmp.tmp"));
        assert_ne!(
            temp_path_for(Path::new("/db/store.bin")),
            temp_path_for(Path::new("/db/store.db"))
        );
    }

    #[test]
    fn test_saving_a_store_named_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.tmp");
        let store = FingerprintStore::open(&path).unwrap();
        store.put(NewRecord::new(Fingerprint::full_fingerprint())).unwrap();
        store.close().unwrap();

        assert!(!dir.path().join("store.tmp.tmp").exists());
        assert_eq!(FingerprintStore::open(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_disagreeing_binary_and_hex_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let store = FingerprintStore::open(&path).unwrap();
        store.put(NewRecord::new(Fingerprint::default())).unwrap();

        let mut file = StoreFile::from_tables(&store.tables.read());
        for (_bits, hex) in file.rows_mut() {
            *hex = "f".repeat(64);
        }
        std::fs::write(&path, bincode::serialize(&file).unwrap()).unwrap();

        assert!(matches!(FingerprintStore::open(&path), Err(Corrupt { .. })));
    }

    #[test]
    fn test_duplicate_fingerprint_on_disk_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let store = FingerprintStore::open(&path).unwrap();
        store.put(NewRecord::new(Fingerprint::full_fingerprint())).unwrap();

        let mut file = StoreFile::from_tables(&store.tables.read());
        file.duplicate_first_row();
        std::fs::write(&path, bincode::serialize(&file).unwrap()).unwrap();

        let err = FingerprintStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate fingerprint"), "{err}");
    }
}
