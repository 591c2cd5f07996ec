use std::time::Duration;

use super::Provenance;

#[derive(Debug, Clone)]
pub enum GameEngineCommand {
    /// Deal a fresh board with the current configuration.
    NewGame,
    Tap(usize),
    Restart,
    UpdateConfiguration { card_count: usize, columns: usize },
    SetPlayerName(String),
    SetSaveLocation(Provenance),
    SetHideDelay(Duration),
    /// Re-publish the current snapshot.
    InitDisplay,
}
