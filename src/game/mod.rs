pub mod board_generator;
pub mod game_engine;
pub mod history;
pub mod scheduler;
pub mod session;
pub mod session_timer;
pub mod settings;
pub mod stat_recorder;
pub mod stats_store;

pub use game_engine::GameEngine;
pub use history::HistoryViewModel;
pub use scheduler::{GlibScheduler, ManualScheduler, Scheduler};
pub use session::{Session, TapOutcome};
pub use settings::Settings;
pub use stats_store::{JsonStatsStore, MemoryStatsStore, StatsStore};
