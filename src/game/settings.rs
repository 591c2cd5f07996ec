use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigurationError, PersistenceError};
use crate::model::{BoardConfig, Provenance};

const SETTINGS_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub(crate) version: u32,

    #[serde(default = "default_card_count")]
    pub card_count: usize,

    #[serde(default = "default_columns")]
    pub columns: usize,

    #[serde(default)]
    pub player_name: String,

    /// Store that receives finished and abandoned games.
    #[serde(default = "default_save_location")]
    pub save_location: Provenance,

    /// How long a mismatched pair stays visible.
    #[serde(default = "default_hide_delay_ms")]
    pub hide_delay_ms: u64,
}

// Helper functions for default values
fn default_version() -> u32 {
    SETTINGS_VERSION
}
fn default_card_count() -> usize {
    BoardConfig::default().card_count()
}
fn default_columns() -> usize {
    BoardConfig::default().columns()
}
fn default_save_location() -> Provenance {
    Provenance::Local
}
fn default_hide_delay_ms() -> u64 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: SETTINGS_VERSION,
            card_count: default_card_count(),
            columns: default_columns(),
            player_name: String::new(),
            save_location: default_save_location(),
            hide_delay_ms: default_hide_delay_ms(),
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(contents) = fs::read_to_string(path) {
            match serde_json::from_str::<Settings>(&contents) {
                Ok(mut settings) => {
                    settings.migrate();
                    settings.sanitize();
                    return settings;
                }
                Err(err) => warn!(target: "settings", "Ignoring unreadable settings: {}", err),
            }
        }
        Settings::default()
    }

    pub fn save(&self) -> Result<(), PersistenceError> {
        self.save_to(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PersistenceError> {
        // Ensure the directory exists
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn settings_path() -> PathBuf {
        let data_dir = glib::user_data_dir();
        let mut path = data_dir.join("memory-match");
        path.push("settings.json");
        path
    }

    fn migrate(&mut self) {
        match self.version {
            // version 1 stored the delay used by the first release
            0 | 1 => {
                if self.hide_delay_ms == 0 {
                    self.hide_delay_ms = 500;
                }
                self.version = SETTINGS_VERSION;
            }
            _ => (),
        }
    }

    /// Falls back to the default board when the stored one cannot be dealt.
    fn sanitize(&mut self) {
        if let Err(err) = self.board_config() {
            warn!(target: "settings", "Resetting stored board size: {}", err);
            let board = BoardConfig::default();
            self.card_count = board.card_count();
            self.columns = board.columns();
        }
        if self.save_location == Provenance::Session {
            self.save_location = default_save_location();
        }
    }

    pub fn board_config(&self) -> Result<BoardConfig, ConfigurationError> {
        BoardConfig::new(self.card_count, self.columns)
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_debug_mode() -> bool {
        std::env::var("DEBUG").map(|v| v == "1").unwrap_or(false)
    }

    pub fn seed_from_env() -> Option<u64> {
        std::env::var("SEED").ok().and_then(|v| v.parse::<u64>().ok())
    }
}
