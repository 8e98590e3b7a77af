use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use contrail_error::{ContrailError, ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::{FlightId, FlightKey};
use contrail_table::Table;
use itertools::Itertools;
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::store;

/// One active registry entry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: FlightKey,
    pub table: Table,
}

/// The server-resident store mapping identifiers to datasets.
///
/// Identifiers are slot indices into an arena that only grows: deleting
/// an entry tombstones its slot instead of compacting, so an id issued
/// once never silently resolves to a different dataset later. The single
/// exception is [`Registry::clear`], which resets the arena wholesale.
///
/// All state sits behind one lock; mutations serialize against each
/// other and against the dispatcher's read-then-store sequences.
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

pub(crate) struct RegistryInner {
    data_dir: PathBuf,
    slots: Vec<Option<FlightKey>>,
    tables: HashMap<FlightKey, Table>,
}

impl RegistryInner {
    pub(crate) fn store(&mut self, key: FlightKey, table: Table) -> ContrailResult<FlightId> {
        if matches!(key, FlightKey::Unknown) {
            contrail_bail!(InvalidArguments: "cannot store a dataset under an unknown key");
        }
        if self.tables.contains_key(&key) {
            contrail_bail!(DuplicateKey: "{}", key);
        }
        let id = self.slots.len().to_string();
        self.slots.push(Some(key.clone()));
        self.tables.insert(key, table);
        Ok(id)
    }

    pub(crate) fn lookup(&self, id: &str) -> ContrailResult<Entry> {
        let key = self
            .slot(id)
            .and_then(|index| self.slots[index].clone())
            .ok_or_else(|| contrail_err!(UnknownId: "{}", id))?;
        let table = self
            .tables
            .get(&key)
            .cloned()
            .ok_or_else(|| contrail_err!(UnknownId: "{}", id))?;
        Ok(Entry { key, table })
    }

    pub(crate) fn resolve_key(&self, key: &FlightKey) -> ContrailResult<FlightId> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref() == Some(key))
            .map(|index| index.to_string())
            .ok_or_else(|| contrail_err!(UnknownKey: "{}", key))
    }

    pub(crate) fn table_for_key(&self, key: &FlightKey) -> ContrailResult<Table> {
        self.tables
            .get(key)
            .cloned()
            .ok_or_else(|| contrail_err!(UnknownKey: "{}", key))
    }

    pub(crate) fn list(&self) -> Vec<(FlightId, Option<Entry>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let entry = slot.as_ref().and_then(|key| {
                    self.tables.get(key).map(|table| Entry {
                        key: key.clone(),
                        table: table.clone(),
                    })
                });
                (index.to_string(), entry)
            })
            .collect()
    }

    pub(crate) fn delete(&mut self, id: &str) -> ContrailResult<bool> {
        let Some(index) = self.slot(id) else {
            return Ok(false);
        };
        let Some(key) = self.slots[index].take() else {
            return Ok(false);
        };
        self.tables.remove(&key);
        if let Some(name) = key.path_name() {
            let path = self.dataset_path(name)?;
            match fs::remove_file(&path) {
                Ok(()) => log::info!("removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.tables.clear();
    }

    /// Resolve a dataset name to its artifact path. Names must be bare
    /// file names; the `.parquet` extension is appended when missing.
    pub(crate) fn dataset_path(&self, name: &str) -> ContrailResult<PathBuf> {
        if name.is_empty() {
            contrail_bail!(InvalidArguments: "dataset name is empty");
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            contrail_bail!(InvalidArguments: "dataset name '{}' must be a bare file name", name);
        }
        let stem = name.strip_suffix(".parquet").unwrap_or(name);
        Ok(self.data_dir.join(format!("{}.parquet", stem)))
    }

    fn slot(&self, id: &str) -> Option<usize> {
        id.parse::<usize>().ok().filter(|index| *index < self.slots.len())
    }
}

impl Registry {
    /// Open the registry over a data directory, re-registering every
    /// `*.parquet` artifact found there in file-name order.
    pub fn open(data_dir: impl Into<PathBuf>) -> ContrailResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        let mut inner = RegistryInner {
            data_dir,
            slots: Vec::new(),
            tables: HashMap::new(),
        };
        let artifacts = fs::read_dir(&inner.data_dir)?
            .map_ok(|entry| entry.path())
            .filter_ok(|path| path.extension() == Some(OsStr::new("parquet")))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .sorted()
            .collect_vec();
        for path in artifacts {
            let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
                continue;
            };
            match store::read_table(&path) {
                Ok(table) => {
                    let id = inner.store(FlightKey::Path(vec![stem.to_string()]), table)?;
                    log::info!("loaded flight {} from {}", id, path.display());
                }
                Err(e) => log::warn!("skipping unreadable dataset {}: {}", path.display(), e),
            }
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Register a table under a fresh identifier. Fails with
    /// `DuplicateKey` if an active entry already holds this key.
    pub fn store(&self, key: FlightKey, table: Table) -> ContrailResult<FlightId> {
        self.inner.write().store(key, table)
    }

    /// Fails with `UnknownId` for ids never issued or tombstoned.
    pub fn lookup(&self, id: &str) -> ContrailResult<Entry> {
        self.inner.read().lookup(id)
    }

    /// The id of the active entry holding `key`, if any.
    pub fn resolve_key(&self, key: &FlightKey) -> ContrailResult<FlightId> {
        self.inner.read().resolve_key(key)
    }

    pub fn table_for_key(&self, key: &FlightKey) -> ContrailResult<Table> {
        self.inner.read().table_for_key(key)
    }

    /// Every slot in id order; tombstoned slots are `None` so id
    /// positions stay visible.
    pub fn list(&self) -> Vec<(FlightId, Option<Entry>)> {
        self.inner.read().list()
    }

    /// Tombstone `id`, drop its table, and remove the persisted artifact
    /// for path-style keys. Returns false if the id is unknown or already
    /// tombstoned.
    pub fn delete(&self, id: &str) -> ContrailResult<bool> {
        self.inner.write().delete(id)
    }

    /// Drop every entry and reset the id counter to zero.
    ///
    /// Destructive and not backward compatible: previously issued ids
    /// will be reissued for new datasets. Persisted artifacts are left on
    /// disk.
    pub fn clear(&self) {
        self.inner.write().clear();
        log::info!("cleared all flights");
    }

    /// Persist the entry's table under `name` without deregistering it.
    /// Returns false if the id is unknown or tombstoned.
    pub fn save(&self, id: &str, name: &str) -> ContrailResult<bool> {
        // Clone the handle under the read lock, write the file outside it.
        let (entry, path) = {
            let inner = self.inner.read();
            let entry = match inner.lookup(id) {
                Ok(entry) => entry,
                Err(ContrailError::UnknownId(_)) => return Ok(false),
                Err(e) => return Err(e),
            };
            (entry, inner.dataset_path(name)?)
        };
        store::write_table(&path, &entry.table)?;
        log::info!("saved flight {} to {}", id, path.display());
        Ok(true)
    }

    pub fn dataset_path(&self, name: &str) -> ContrailResult<PathBuf> {
        self.inner.read().dataset_path(name)
    }

    /// Number of slots ever allocated, tombstones included.
    pub fn slot_count(&self) -> usize {
        self.inner.read().list().len()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use arrow_array::{Int32Array, RecordBatch};
    use arrow_schema::{DataType, Field, Schema};

    use super::*;

    fn table(values: Vec<i32>) -> Table {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, false)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(values))])
                .unwrap();
        Table::try_new(schema, vec![batch]).unwrap()
    }

    fn path_key(name: &str) -> FlightKey {
        FlightKey::Path(vec![name.to_string()])
    }

    fn open_registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        (dir, registry)
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let (_dir, registry) = open_registry();
        assert_eq!(registry.store(path_key("a"), table(vec![1])).unwrap(), "0");
        assert_eq!(registry.store(path_key("b"), table(vec![2])).unwrap(), "1");
        assert_eq!(registry.lookup("0").unwrap().key, path_key("a"));
        assert_eq!(registry.resolve_key(&path_key("b")).unwrap(), "1");
    }

    #[test]
    fn duplicate_active_keys_are_rejected() {
        let (_dir, registry) = open_registry();
        registry.store(path_key("a"), table(vec![1])).unwrap();
        assert!(matches!(
            registry.store(path_key("a"), table(vec![2])),
            Err(ContrailError::DuplicateKey(_))
        ));
    }

    #[test]
    fn deleted_ids_are_never_reissued() {
        let (_dir, registry) = open_registry();
        registry.store(path_key("a"), table(vec![1])).unwrap();
        assert!(registry.delete("0").unwrap());
        assert!(matches!(
            registry.lookup("0"),
            Err(ContrailError::UnknownId(_))
        ));
        // The slot stays tombstoned; the next store gets a fresh id.
        assert_eq!(registry.store(path_key("a"), table(vec![1])).unwrap(), "1");
        assert!(!registry.delete("0").unwrap());
        assert!(!registry.delete("99").unwrap());
    }

    #[test]
    fn list_reports_tombstone_placeholders() {
        let (_dir, registry) = open_registry();
        registry.store(path_key("a"), table(vec![1])).unwrap();
        registry.store(path_key("b"), table(vec![2])).unwrap();
        registry.delete("0").unwrap();
        let listing = registry.list();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].0, "0");
        assert!(listing[0].1.is_none());
        assert_eq!(listing[1].1.as_ref().unwrap().key, path_key("b"));
    }

    #[test]
    fn clear_resets_the_counter() {
        let (_dir, registry) = open_registry();
        registry.store(path_key("a"), table(vec![1])).unwrap();
        registry.clear();
        assert_eq!(registry.slot_count(), 0);
        assert_eq!(registry.store(path_key("a"), table(vec![1])).unwrap(), "0");
    }

    #[test]
    fn save_then_reopen_reloads_the_artifact() {
        let (dir, registry) = open_registry();
        registry.store(path_key("a"), table(vec![1, 2])).unwrap();
        assert!(registry.save("0", "out").unwrap());
        assert!(!registry.save("7", "out").unwrap());

        let reopened = Registry::open(dir.path()).unwrap();
        let id = reopened.resolve_key(&path_key("out")).unwrap();
        assert_eq!(reopened.lookup(&id).unwrap().table.num_rows(), 2);
    }

    #[test]
    fn delete_removes_the_persisted_artifact() {
        let (dir, registry) = open_registry();
        registry.store(path_key("a"), table(vec![1])).unwrap();
        registry.save("0", "a").unwrap();
        assert!(dir.path().join("a.parquet").exists());
        registry.delete("0").unwrap();
        assert!(!dir.path().join("a.parquet").exists());
    }

    #[test]
    fn dataset_names_must_be_bare_file_names() {
        let (_dir, registry) = open_registry();
        assert!(registry.dataset_path("../escape").is_err());
        assert!(registry.dataset_path("a/b").is_err());
        assert!(registry.dataset_path("").is_err());
        let path = registry.dataset_path("t.parquet").unwrap();
        assert!(path.to_string_lossy().ends_with("t.parquet"));
    }

    #[test]
    fn concurrent_stores_allocate_dense_distinct_ids() {
        let (_dir, registry) = open_registry();
        let ids = std::thread::scope(|scope| {
            (0..16)
                .map(|i| {
                    let registry = &registry;
                    scope.spawn(move || {
                        registry
                            .store(path_key(&format!("t{}", i)), table(vec![i]))
                            .unwrap()
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });
        let mut numeric = ids.iter().map(|id| id.parse::<usize>().unwrap()).collect_vec();
        numeric.sort_unstable();
        assert_eq!(numeric, (0..16).collect_vec());
    }
}
