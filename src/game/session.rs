use chrono::Utc;
use log::{info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use super::board_generator;
use super::stat_recorder::{self, SessionSummary};
use crate::error::{GameError, IllegalTapReason};
use crate::model::{
    BoardConfig, CardView, Deck, MatchColor, SessionPhase, SessionSnapshot, StatRecord,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// First card of a comparison turned face up.
    FirstSelected(usize),
    Matched {
        first: usize,
        second: usize,
        color: MatchColor,
    },
    /// Both cards stay face up until `hide_mismatch` is called for them.
    Mismatched { first: usize, second: usize },
    /// The last pair was found; the session is now over.
    Completed {
        first: usize,
        second: usize,
        color: MatchColor,
        record: StatRecord,
    },
}

/// State of one game instance: the dealt deck and everything the player has done to it.
///
/// All mutation happens through `start`, `tap`, `restart`, `update_configuration`, `tick`
/// and `hide_mismatch`; the caller is responsible for serializing those calls.
pub struct Session {
    config: BoardConfig,
    player_name: String,
    deck: Deck,
    phase: SessionPhase,
    moves: u32,
    elapsed_secs: u32,
    pending: Option<usize>,
    game_id: u64,
    playthrough_id: Uuid,
    rng: StdRng,
}

impl Session {
    pub fn new(config: BoardConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            player_name: String::new(),
            deck: Deck::default(),
            phase: SessionPhase::Idle,
            moves: 0,
            elapsed_secs: 0,
            pending: None,
            game_id: 0,
            playthrough_id: Uuid::nil(),
            rng,
        }
    }

    /// Deals a new board with the current configuration.
    pub fn start(&mut self) -> Result<(), GameError> {
        self.start_with(self.config)
    }

    pub fn start_with(&mut self, config: BoardConfig) -> Result<(), GameError> {
        let deck = board_generator::generate_with_rng(config.card_count(), &mut self.rng)?;
        self.config = config;
        self.reset(deck);
        Ok(())
    }

    pub fn update_configuration(
        &mut self,
        card_count: usize,
        columns: usize,
    ) -> Result<(), GameError> {
        let config = BoardConfig::new(card_count, columns)?;
        self.start_with(config)
    }

    /// Abandons the current game and deals a new one with the same configuration.
    ///
    /// Returns the incomplete record of the abandoned game, or `None` when nothing had
    /// been dealt yet.
    pub fn restart(&mut self) -> Result<Option<StatRecord>, GameError> {
        let deck = board_generator::generate_with_rng(self.config.card_count(), &mut self.rng)?;
        let record = match self.phase {
            SessionPhase::Idle => None,
            SessionPhase::Active | SessionPhase::Over => {
                Some(stat_recorder::record(&self.summary(false)))
            }
        };
        self.reset(deck);
        Ok(record)
    }

    fn reset(&mut self, deck: Deck) {
        self.deck = deck;
        self.phase = SessionPhase::Active;
        self.moves = 0;
        self.elapsed_secs = 0;
        self.pending = None;
        self.game_id = self.game_id.wrapping_add(1);
        self.playthrough_id = Uuid::new_v4();
        info!(
            target: "session",
            "New game; cards: {}; columns: {}; game_id: {}",
            self.config.card_count(),
            self.config.columns(),
            self.game_id
        );
    }

    pub fn tap(&mut self, index: usize) -> Result<TapOutcome, GameError> {
        self.check_tap(index)?;

        self.set_face_up(index);
        let Some(first) = self.pending.take() else {
            self.pending = Some(index);
            return Ok(TapOutcome::FirstSelected(index));
        };

        self.moves += 1;
        if self.value_at(first) != self.value_at(index) {
            trace!(target: "session", "Mismatch: {} / {}", first, index);
            return Ok(TapOutcome::Mismatched {
                first,
                second: index,
            });
        }

        let color = MatchColor::random(&mut self.rng);
        for position in [first, index] {
            if let Some(card) = self.deck.get_mut(position) {
                card.matched = true;
                card.match_color = Some(color);
            }
        }
        trace!(target: "session", "Match: {} / {} ({})", first, index, color);

        if self.deck.all_matched() {
            self.phase = SessionPhase::Over;
            let record = stat_recorder::record(&self.summary(true));
            info!(
                target: "session",
                "Game over; moves: {}; seconds: {}",
                self.moves,
                self.elapsed_secs
            );
            return Ok(TapOutcome::Completed {
                first,
                second: index,
                color,
                record,
            });
        }

        Ok(TapOutcome::Matched {
            first,
            second: index,
            color,
        })
    }

    fn check_tap(&self, index: usize) -> Result<(), GameError> {
        let reason = if self.phase != SessionPhase::Active {
            Some(IllegalTapReason::NotActive)
        } else {
            match self.deck.get(index) {
                None => Some(IllegalTapReason::OutOfRange {
                    len: self.deck.len(),
                }),
                Some(card) if card.matched => Some(IllegalTapReason::AlreadyMatched),
                Some(card) if card.face_up => Some(IllegalTapReason::AlreadyFaceUp),
                Some(_) => None,
            }
        };
        match reason {
            Some(reason) => Err(GameError::IllegalTap { index, reason }),
            None => Ok(()),
        }
    }

    fn set_face_up(&mut self, index: usize) {
        if let Some(card) = self.deck.get_mut(index) {
            card.face_up = true;
        }
    }

    fn value_at(&self, index: usize) -> Option<u32> {
        self.deck.get(index).map(|card| card.value)
    }

    /// Turns a mismatched pair back face down. Cards matched in the meantime stay up.
    ///
    /// Returns the positions actually hidden.
    pub fn hide_mismatch(&mut self, first: usize, second: usize) -> Vec<usize> {
        let mut hidden = Vec::new();
        for index in [first, second] {
            if self.pending == Some(index) {
                continue;
            }
            if let Some(card) = self.deck.get_mut(index) {
                if card.is_exposed() {
                    card.face_up = false;
                    hidden.push(index);
                }
            }
        }
        hidden
    }

    /// Adds one second of play time. Ignored unless the session is active.
    pub fn tick(&mut self) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        self.elapsed_secs += 1;
        true
    }

    pub fn summary(&self, completed: bool) -> SessionSummary {
        SessionSummary {
            player_name: self.player_name.clone(),
            card_count: self.config.card_count(),
            moves: self.moves,
            elapsed_secs: self.elapsed_secs,
            completed,
            playthrough_id: self.playthrough_id,
            ended_at: Utc::now().timestamp(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game_id: self.game_id,
            phase: self.phase,
            cards: self.deck.cards().iter().map(CardView::from).collect(),
            pending_selection: self.pending,
            moves: self.moves,
            elapsed_secs: self.elapsed_secs,
            columns: self.config.columns(),
            player_name: self.player_name.clone(),
        }
    }

    pub fn set_player_name(&mut self, player_name: impl Into<String>) {
        self.player_name = player_name.into();
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn config(&self) -> BoardConfig {
        self.config
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == SessionPhase::Over
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    pub fn playthrough_id(&self) -> Uuid {
        self.playthrough_id
    }
}
