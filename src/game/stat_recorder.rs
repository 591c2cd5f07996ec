use uuid::Uuid;

use crate::model::{Provenance, StatRecord};

/// Everything about a session that ends up in its stat record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub player_name: String,
    pub card_count: usize,
    pub moves: u32,
    pub elapsed_secs: u32,
    pub completed: bool,
    pub playthrough_id: Uuid,
    /// Unix seconds at which the session ended.
    pub ended_at: i64,
}

pub fn record(summary: &SessionSummary) -> StatRecord {
    StatRecord::new(
        summary.player_name.clone(),
        summary.card_count,
        summary.moves,
        summary.elapsed_secs,
        summary.completed,
        Provenance::Session,
        summary.ended_at,
        summary.playthrough_id,
    )
}
