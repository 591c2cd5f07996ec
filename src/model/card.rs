use rand::Rng;
use serde::{Deserialize, Serialize};

/// Opaque tag shared by the two cards of a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl MatchColor {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            red: rng.random(),
            green: rng.random(),
            blue: rng.random(),
        }
    }
}

impl std::fmt::Display for MatchColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub index: usize,
    pub value: u32,
    pub face_up: bool,
    pub matched: bool,
    pub match_color: Option<MatchColor>,
}

impl Card {
    pub fn new(index: usize, value: u32) -> Self {
        Self {
            index,
            value,
            face_up: false,
            matched: false,
            match_color: None,
        }
    }

    /// Face up but still waiting on a comparison or a pending hide.
    pub fn is_exposed(&self) -> bool {
        self.face_up && !self.matched
    }

    pub fn is_revealed(&self) -> bool {
        self.face_up || self.matched
    }
}
