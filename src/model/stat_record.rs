use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::board_descriptor;

/// Which store a record came from. Display only; never affects game logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Provenance {
    /// Produced by the live session and not yet read back from a store.
    #[default]
    Session,
    Local,
    Remote,
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Session => "SESSION",
            Provenance::Local => "LOCAL",
            Provenance::Remote => "REMOTE",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one session, finished or abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub player_name: String,
    pub board: String,
    pub card_count: usize,
    pub moves: u32,
    pub duration_secs: u32,
    pub completed: bool,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default = "Uuid::nil")]
    pub playthrough_id: Uuid,
}

impl StatRecord {
    pub fn new(
        player_name: impl Into<String>,
        card_count: usize,
        moves: u32,
        duration_secs: u32,
        completed: bool,
        provenance: Provenance,
        timestamp: i64,
        playthrough_id: Uuid,
    ) -> Self {
        Self {
            player_name: player_name.into(),
            board: board_descriptor(card_count),
            card_count,
            moves,
            duration_secs,
            completed,
            provenance,
            timestamp,
            playthrough_id,
        }
    }

    /// Copy of this record relabelled as coming from `provenance`.
    pub fn with_provenance(&self, provenance: Provenance) -> Self {
        let mut record = self.clone();
        record.provenance = provenance;
        record
    }

    /// Records that a redelivering store would send twice compare equal here.
    pub fn is_same_entry(&self, other: &StatRecord) -> bool {
        self.player_name == other.player_name
            && self.moves == other.moves
            && self.duration_secs == other.duration_secs
            && self.provenance == other.provenance
    }
}
