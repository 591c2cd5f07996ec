use super::{SessionSnapshot, StatRecord};

#[derive(Debug, Clone)]
pub enum GameEngineEvent {
    SessionUpdated(SessionSnapshot),
    TimerTicked(u32),
    /// Cards turned back face down after a mismatch.
    CardsHidden(Vec<usize>),
    GameOver(StatRecord),
    StatRecorded(StatRecord),
    PersistenceFailed { record: StatRecord, error: String },
    ConfigurationRejected(String),
}
