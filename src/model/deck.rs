use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::Card;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds a deck laying out `values` in order; positions are assigned 0..len.
    pub fn from_values(values: impl IntoIterator<Item = u32>) -> Self {
        let cards = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| Card::new(index, value))
            .collect();
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Card> {
        self.cards.get_mut(index)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.cards.iter().map(|card| card.value)
    }

    pub fn all_matched(&self) -> bool {
        !self.cards.is_empty() && self.cards.iter().all(|card| card.matched)
    }

    pub fn matched_count(&self) -> usize {
        self.cards.iter().filter(|card| card.matched).count()
    }

    /// Every value in 1..=len/2 appears exactly twice.
    pub fn is_well_paired(&self) -> bool {
        if self.cards.len() % 2 != 0 {
            return false;
        }
        let pairs = (self.cards.len() / 2) as u32;
        let counts = self.values().counts();
        counts.len() == pairs as usize
            && (1..=pairs).all(|value| counts.get(&value) == Some(&2))
    }
}
