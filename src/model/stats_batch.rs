use super::{Provenance, StatRecord};

/// Full contents of one store, published whenever the store changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsBatch {
    pub provenance: Provenance,
    pub records: Vec<StatRecord>,
}
