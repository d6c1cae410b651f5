use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use taskview_shared::FilterSettings;

/// A named set of filters the user can recall with `list --preset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub name: String,
    pub settings: FilterSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub filter_presets: Vec<FilterPreset>,
    /// Filters used by the last `list`, reused when none are given.
    #[serde(default)]
    pub last_filters: FilterSettings,
}

impl UserPreferences {
    /// Get the path to the preferences file
    fn prefs_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("taskview");

        fs::create_dir_all(&config_dir).context("Could not create config directory")?;

        Ok(config_dir.join("preferences.json"))
    }

    /// Load preferences from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::prefs_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).context("Could not read preferences file")?;

        let prefs: Self =
            serde_json::from_str(&contents).context("Could not parse preferences file")?;

        Ok(prefs)
    }

    /// Save preferences to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::prefs_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(self).context("Could not serialize preferences")?;

        fs::write(path, contents).context("Could not write preferences file")?;

        Ok(())
    }

    pub fn preset(&self, name: &str) -> Option<&FilterSettings> {
        self.filter_presets
            .iter()
            .find(|preset| preset.name == name)
            .map(|preset| &preset.settings)
    }

    /// Stores `settings` under `name`, replacing an existing preset of that name.
    pub fn save_preset(&mut self, name: &str, settings: FilterSettings) {
        match self.filter_presets.iter_mut().find(|p| p.name == name) {
            Some(preset) => preset.settings = settings,
            None => self.filter_presets.push(FilterPreset {
                name: name.to_string(),
                settings,
            }),
        }
    }

    pub fn remove_preset(&mut self, name: &str) -> bool {
        let before = self.filter_presets.len();
        self.filter_presets.retain(|p| p.name != name);
        self.filter_presets.len() != before
    }
}
