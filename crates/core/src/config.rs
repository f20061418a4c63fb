use anyhow::Context;
use drum_program::{DEFAULT_PAD_COUNT, MAX_PAD_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_pad_count() -> usize {
    DEFAULT_PAD_COUNT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pads per program. Saves only load into programs with the same count.
    #[serde(default = "default_pad_count")]
    pub pad_count: usize,
    /// Where save slots are kept. Defaults to the platform data directory.
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pad_count: DEFAULT_PAD_COUNT,
            preferences_path: None,
        }
    }
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("drum").join("config.toml"))
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read a config file, falling back to defaults if it is missing or malformed.
    ///
    /// A pad count outside `1..=MAX_PAD_COUNT` is replaced by the default.
    pub fn load_from(path: &Path) -> Self {
        let mut config: Self = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("ignoring malformed config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        if !(1..=MAX_PAD_COUNT).contains(&config.pad_count) {
            log::warn!(
                "pad_count {} in {} is out of range, using {DEFAULT_PAD_COUNT}",
                config.pad_count,
                path.display()
            );
            config.pad_count = DEFAULT_PAD_COUNT;
        }
        config
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().context("no config directory on this platform")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Resolved location of the preferences file.
    pub fn preferences_file(&self) -> Option<PathBuf> {
        self.preferences_path.clone().or_else(|| {
            dirs::data_dir().map(|p| p.join("drum").join("preferences.json"))
        })
    }
}
