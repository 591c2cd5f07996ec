use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

pub const MIN_CARDS: usize = 4;
pub const MAX_CARDS: usize = 64;
pub const MIN_COLUMNS: usize = 2;
pub const MAX_COLUMNS: usize = 8;

/// Validated board size. Columns only matter to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardConfig {
    card_count: usize,
    columns: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            card_count: 16,
            columns: 4,
        }
    }
}

impl BoardConfig {
    pub fn new(card_count: usize, columns: usize) -> Result<Self, ConfigurationError> {
        validate_card_count(card_count)?;
        if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&columns) {
            return Err(ConfigurationError::ColumnsOutOfRange {
                columns,
                min: MIN_COLUMNS,
                max: MAX_COLUMNS,
            });
        }
        Ok(Self {
            card_count,
            columns,
        })
    }

    pub fn card_count(&self) -> usize {
        self.card_count
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn pair_count(&self) -> usize {
        self.card_count / 2
    }

    /// Label stored with every stat record, e.g. "16 cards".
    pub fn descriptor(&self) -> String {
        board_descriptor(self.card_count)
    }
}

pub fn board_descriptor(card_count: usize) -> String {
    format!("{} cards", card_count)
}

pub fn validate_card_count(card_count: usize) -> Result<(), ConfigurationError> {
    if card_count % 2 != 0 {
        return Err(ConfigurationError::OddCardCount(card_count));
    }
    if !(MIN_CARDS..=MAX_CARDS).contains(&card_count) {
        return Err(ConfigurationError::CardCountOutOfRange {
            count: card_count,
            min: MIN_CARDS,
            max: MAX_CARDS,
        });
    }
    Ok(())
}
