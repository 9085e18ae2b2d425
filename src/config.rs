use std::{
    io,
    ops::Not,
    path::{Path, PathBuf},
};

use chrono::format::{Item, StrftimeItems};
use eframe::egui;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::i18n::Language;

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Not for Theme {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl From<Theme> for egui::Visuals {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't write config file: {0}")]
    Io(#[from] io::Error),
    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub time_format: String,
    pub theme: Theme,
    pub language: Language,
    pub alert_sound: PathBuf,
    /// 0 to 100
    pub volume: f32,
    /// when unset the user's music folder is used
    pub music_dir: Option<PathBuf>,
    pub schedule_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%H:%M:%S".to_string(),
            theme: Theme::Dark,
            language: Language::English,
            alert_sound: Self::sounds_path().join("alert.wav"),
            volume: 100.0,
            music_dir: None,
            schedule_file: Self::data_path().join("medications.json"),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the config, falling back to the defaults if it is missing or broken.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(config) => toml::from_str::<Self>(&config)
                .map(Self::checked)
                .unwrap_or_else(|e| {
                    log::warn!("config {} is malformed, using defaults: {e}", path.display());
                    Self::default()
                }),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("couldn't read config {}: {e}", path.display());
                }
                Self::default()
            }
        }
    }

    /// swaps out a time format chrono can't render
    fn checked(mut self) -> Self {
        let broken = StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error));
        if broken {
            let default = Self::default().time_format;
            log::warn!("time format `{}` is invalid, using `{default}`", self.time_format);
            self.time_format = default;
        }
        self
    }

    /// # Errors
    /// if the config can't be serialized or written
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config)?;
        Ok(())
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "dose_clock")
    }

    /// falls back to the working directory when there is no home to put it in
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map_or_else(PathBuf::new, |dirs| dirs.config_dir().to_path_buf())
            .join("config.toml")
    }

    #[must_use]
    pub fn data_path() -> PathBuf {
        Self::project_dirs().map_or_else(PathBuf::new, |dirs| dirs.data_dir().to_path_buf())
    }

    #[must_use]
    pub fn sounds_path() -> PathBuf {
        Self::data_path().join("sounds")
    }

    #[must_use]
    pub fn music_path(&self) -> Option<PathBuf> {
        self.music_dir.clone().or_else(|| {
            directories::UserDirs::new().and_then(|u| u.audio_dir().map(Path::to_path_buf))
        })
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().exists()
    }
}
