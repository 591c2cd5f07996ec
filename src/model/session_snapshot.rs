use serde::{Deserialize, Serialize};

use super::{Card, MatchColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionPhase {
    /// No deck dealt yet.
    #[default]
    Idle,
    /// Timer running, taps accepted.
    Active,
    /// Every card matched; only a new game changes anything.
    Over,
}

/// What the presentation layer may know about one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub index: usize,
    /// Only present while the card is face up or matched.
    pub value: Option<u32>,
    pub face_up: bool,
    pub matched: bool,
    pub match_color: Option<MatchColor>,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        Self {
            index: card.index,
            value: card.is_revealed().then_some(card.value),
            face_up: card.face_up,
            matched: card.matched,
            match_color: card.match_color,
        }
    }
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    pub game_id: u64,
    pub phase: SessionPhase,
    pub cards: Vec<CardView>,
    /// Card waiting for its partner, if any.
    pub pending_selection: Option<usize>,
    pub moves: u32,
    pub elapsed_secs: u32,
    pub columns: usize,
    pub player_name: String,
}

impl SessionSnapshot {
    pub fn is_game_over(&self) -> bool {
        self.phase == SessionPhase::Over
    }

    pub fn rows(&self) -> usize {
        if self.columns == 0 {
            return 0;
        }
        self.cards.len().div_ceil(self.columns)
    }
}
