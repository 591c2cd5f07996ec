use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use super::stats_store::StatsStore;
use crate::events::Unsubscriber;
use crate::model::{Provenance, StatRecord, StatsBatch};

/// Records gathered from every connected store, in arrival order until sorted.
#[derive(Debug, Default)]
pub struct HistoryViewModel {
    records: Vec<StatRecord>,
}

impl HistoryViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a batch delivered by a store. Entries already present for the same
    /// player, moves, duration and provenance are replaced rather than duplicated.
    pub fn ingest(&mut self, records: &[StatRecord], provenance: Provenance) {
        let incoming: Vec<StatRecord> = records
            .iter()
            .map(|record| record.with_provenance(provenance))
            .collect();
        let before = self.records.len();
        self.records
            .retain(|existing| !incoming.iter().any(|record| record.is_same_entry(existing)));
        trace!(
            target: "history",
            "Ingesting {} {} records; replaced {}",
            incoming.len(),
            provenance,
            before - self.records.len()
        );
        self.records.extend(incoming);
    }

    pub fn sort_by_moves(&mut self) {
        self.records.sort_by_key(|record| record.moves);
    }

    pub fn sort_by_duration(&mut self) {
        self.records.sort_by_key(|record| record.duration_secs);
    }

    pub fn records(&self) -> &[StatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feeds `model` with what `store` holds now and with every later batch.
    pub fn connect(model: &Rc<RefCell<Self>>, store: &dyn StatsStore) -> Unsubscriber<StatsBatch> {
        model
            .borrow_mut()
            .ingest(&store.records(), store.provenance());

        let weak_model = Rc::downgrade(model);
        store.observer().subscribe(move |batch: &StatsBatch| {
            if let Some(model) = weak_model.upgrade() {
                model.borrow_mut().ingest(&batch.records, batch.provenance);
            }
        })
    }
}
