use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::{GameError, PersistenceError};
use crate::events::{Channel, EventEmitter, EventObserver};
use crate::model::{Provenance, StatRecord, StatsBatch};

/// Most records a store keeps; the oldest are dropped first.
pub const MAX_RECORDS: usize = 100;

/// Somewhere stat records are kept. Every change is published as the full
/// contents of the store through `observer`.
pub trait StatsStore {
    fn provenance(&self) -> Provenance;

    fn save(&self, record: &StatRecord) -> Result<(), GameError>;

    /// Newest first, labelled with this store's provenance.
    fn records(&self) -> Vec<StatRecord>;

    fn observer(&self) -> EventObserver<StatsBatch>;

    fn clear(&self) -> Result<(), GameError>;
}

fn push_newest(records: &mut Vec<StatRecord>, record: StatRecord) {
    records.insert(0, record);
    records.truncate(MAX_RECORDS);
}

/// Records kept as a JSON list in the user's data directory.
pub struct JsonStatsStore {
    path: PathBuf,
    records: RefCell<Vec<StatRecord>>,
    emitter: EventEmitter<StatsBatch>,
    observer: EventObserver<StatsBatch>,
}

impl JsonStatsStore {
    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        glib::user_data_dir().join("memory-match").join("stats.json")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load(&path);
        let (emitter, observer) = Channel::new();
        Self {
            path,
            records: RefCell::new(records),
            emitter,
            observer,
        }
    }

    fn load(path: &Path) -> Vec<StatRecord> {
        let Ok(contents) = fs::read_to_string(path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<StatRecord>>(&contents) {
            Ok(records) => {
                info!(target: "stats_store", "Loaded {} records from {:?}", records.len(), path);
                records
                    .into_iter()
                    .map(|record| record.with_provenance(Provenance::Local))
                    .collect()
            }
            Err(err) => {
                warn!(target: "stats_store", "Ignoring unreadable stats file {:?}: {}", path, err);
                Vec::new()
            }
        }
    }

    fn write(&self, records: &[StatRecord]) -> Result<(), PersistenceError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Applies `change` and writes the result; the in-memory list is only replaced
    /// once the write succeeded.
    fn update<F>(&self, change: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut Vec<StatRecord>),
    {
        let mut records = self.records.borrow().clone();
        change(&mut records);
        if let Err(err) = self.write(&records) {
            error!(target: "stats_store", "Failed to write {:?}: {}", self.path, err);
            return Err(err.into());
        }
        *self.records.borrow_mut() = records;
        self.emitter.emit(StatsBatch {
            provenance: Provenance::Local,
            records: self.records(),
        });
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonStatsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsStore for JsonStatsStore {
    fn provenance(&self) -> Provenance {
        Provenance::Local
    }

    fn save(&self, record: &StatRecord) -> Result<(), GameError> {
        let record = record.with_provenance(Provenance::Local);
        self.update(move |records| push_newest(records, record))
    }

    fn records(&self) -> Vec<StatRecord> {
        self.records.borrow().clone()
    }

    fn observer(&self) -> EventObserver<StatsBatch> {
        self.observer.clone()
    }

    fn clear(&self) -> Result<(), GameError> {
        self.update(|records| records.clear())
    }
}

/// Process-local store standing in for a shared backend. It can be taken offline
/// and re-sends its full contents on `redeliver`, the way a live query would.
pub struct MemoryStatsStore {
    provenance: Provenance,
    online: Cell<bool>,
    records: RefCell<Vec<StatRecord>>,
    emitter: EventEmitter<StatsBatch>,
    observer: EventObserver<StatsBatch>,
}

impl MemoryStatsStore {
    pub fn new(provenance: Provenance) -> Self {
        let (emitter, observer) = Channel::new();
        Self {
            provenance,
            online: Cell::new(true),
            records: RefCell::new(Vec::new()),
            emitter,
            observer,
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.set(online);
    }

    pub fn is_online(&self) -> bool {
        self.online.get()
    }

    pub fn redeliver(&self) {
        self.publish();
    }

    fn publish(&self) {
        self.emitter.emit(StatsBatch {
            provenance: self.provenance,
            records: self.records(),
        });
    }

    fn check_online(&self) -> Result<(), GameError> {
        if self.online.get() {
            Ok(())
        } else {
            Err(PersistenceError::Unavailable(format!("{} store is offline", self.provenance)).into())
        }
    }
}

impl StatsStore for MemoryStatsStore {
    fn provenance(&self) -> Provenance {
        self.provenance
    }

    fn save(&self, record: &StatRecord) -> Result<(), GameError> {
        self.check_online()?;
        push_newest(
            &mut self.records.borrow_mut(),
            record.with_provenance(self.provenance),
        );
        self.publish();
        Ok(())
    }

    fn records(&self) -> Vec<StatRecord> {
        self.records.borrow().clone()
    }

    fn observer(&self) -> EventObserver<StatsBatch> {
        self.observer.clone()
    }

    fn clear(&self) -> Result<(), GameError> {
        self.check_online()?;
        self.records.borrow_mut().clear();
        self.publish();
        Ok(())
    }
}
