mod board_config;
mod card;
mod deck;
mod game_engine_command;
mod game_engine_event;
mod session_snapshot;
mod stat_record;
mod stats_batch;

pub use board_config::{
    board_descriptor, validate_card_count, BoardConfig, MAX_CARDS, MAX_COLUMNS, MIN_CARDS,
    MIN_COLUMNS,
};
pub use card::{Card, MatchColor};
pub use deck::Deck;
pub use game_engine_command::GameEngineCommand;
pub use game_engine_event::GameEngineEvent;
pub use session_snapshot::{CardView, SessionPhase, SessionSnapshot};
pub use stat_record::{Provenance, StatRecord};
pub use stats_batch::StatsBatch;
