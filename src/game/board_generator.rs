use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::GameError;
use crate::model::{validate_card_count, Deck};

/// Deals a shuffled deck where every value in 1..=card_count/2 appears twice.
pub fn generate(card_count: usize) -> Result<Deck, GameError> {
    generate_with_rng(card_count, &mut rand::rng())
}

pub fn generate_with_rng<R: Rng + ?Sized>(
    card_count: usize,
    rng: &mut R,
) -> Result<Deck, GameError> {
    validate_card_count(card_count)?;

    let pairs = (card_count / 2) as u32;
    let mut values: Vec<u32> = (1..=pairs).chain(1..=pairs).collect();
    values.shuffle(rng);
    trace!(target: "board_generator", "Dealt {} cards: {:?}", card_count, values);

    Ok(Deck::from_values(values))
}
