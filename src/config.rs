//! Runtime configuration: embedded defaults merged with an optional user file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::offline::OfflineConfig;
use crate::scheduler::ScheduleBounds;
use crate::synth::StrikeParameters;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    strike: StrikeSection,
    #[serde(default)]
    auto: AutoSection,
    #[serde(default)]
    audio: AudioSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    offline: OfflineSection,
}

#[derive(Deserialize, Default)]
struct StrikeSection {
    volume: Option<f64>,
    tone: Option<f64>,
    dampen: Option<f64>,
}

#[derive(Deserialize, Default)]
struct AutoSection {
    lower: Option<u32>,
    upper: Option<u32>,
    countdown_interval_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct AudioSection {
    sample_rate: Option<u32>,
    start_suspended: Option<bool>,
}

#[derive(Deserialize, Default)]
struct StorageSection {
    settings_key: Option<String>,
}

#[derive(Deserialize, Default)]
struct OfflineSection {
    cache_name: Option<String>,
    root_document: Option<String>,
    core_assets: Option<Vec<String>>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GongConfig {
    /// Control values used before any settings are restored.
    pub strike: StrikeParameters,
    pub bounds: ScheduleBounds,
    /// Countdown refresh period.
    pub countdown_interval_ms: u64,
    pub sample_rate: u32,
    /// New audio contexts start suspended until a user gesture.
    pub start_suspended: bool,
    /// Namespaced key of the persisted settings record.
    pub settings_key: String,
    pub offline: OfflineConfig,
}

impl Default for GongConfig {
    fn default() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        GongConfig::resolve(base)
    }
}

impl GongConfig {
    /// Load the embedded defaults, then apply the user config file if present.
    /// A missing, unreadable, or malformed user file leaves the defaults in place.
    pub fn load() -> Self {
        Self::load_from(user_config_path().as_deref())
    }

    /// [`GongConfig::load`] against an optional user file.
    pub fn load_from(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_with(path),
            None => Self::default(),
        }
    }

    /// Same as [`GongConfig::load`] with an explicit user file.
    pub fn load_with(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let result = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
            .and_then(|contents| Self::from_toml_str(&contents));
        match result {
            Ok(config) => config,
            Err(e) => {
                log::warn!(target: "config", "ignoring user config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Merge a user TOML document over the embedded defaults.
    pub fn from_toml_str(user: &str) -> Result<Self, ConfigError> {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        let user: ConfigFile = toml::from_str(user).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        merge(&mut base, user);
        Ok(GongConfig::resolve(base))
    }

    fn resolve(file: ConfigFile) -> Self {
        let fallback = StrikeParameters::default();
        let strike = StrikeParameters {
            volume: file.strike.volume.unwrap_or(fallback.volume),
            tone: file.strike.tone.unwrap_or(fallback.tone),
            dampen: file.strike.dampen.unwrap_or(fallback.dampen),
        };
        let bounds = ScheduleBounds::new(
            file.auto.lower.unwrap_or(5),
            file.auto.upper.unwrap_or(10),
        );
        let default_offline = OfflineConfig::default();
        let offline = OfflineConfig {
            cache_name: file.offline.cache_name.unwrap_or(default_offline.cache_name),
            root_document: file
                .offline
                .root_document
                .unwrap_or(default_offline.root_document),
            core_assets: file.offline.core_assets.unwrap_or(default_offline.core_assets),
        };
        GongConfig {
            strike,
            bounds,
            countdown_interval_ms: file.auto.countdown_interval_ms.unwrap_or(200).max(1),
            sample_rate: file.audio.sample_rate.unwrap_or(44100).max(1),
            start_suspended: file.audio.start_suspended.unwrap_or(true),
            settings_key: file
                .storage
                .settings_key
                .unwrap_or_else(|| "gong:settings:v1".to_string()),
            offline,
        }
    }
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    if user.strike.volume.is_some() {
        base.strike.volume = user.strike.volume;
    }
    if user.strike.tone.is_some() {
        base.strike.tone = user.strike.tone;
    }
    if user.strike.dampen.is_some() {
        base.strike.dampen = user.strike.dampen;
    }
    if user.auto.lower.is_some() {
        base.auto.lower = user.auto.lower;
    }
    if user.auto.upper.is_some() {
        base.auto.upper = user.auto.upper;
    }
    if user.auto.countdown_interval_ms.is_some() {
        base.auto.countdown_interval_ms = user.auto.countdown_interval_ms;
    }
    if user.audio.sample_rate.is_some() {
        base.audio.sample_rate = user.audio.sample_rate;
    }
    if user.audio.start_suspended.is_some() {
        base.audio.start_suspended = user.audio.start_suspended;
    }
    if user.storage.settings_key.is_some() {
        base.storage.settings_key = user.storage.settings_key;
    }
    if user.offline.cache_name.is_some() {
        base.offline.cache_name = user.offline.cache_name;
    }
    if user.offline.root_document.is_some() {
        base.offline.root_document = user.offline.root_document;
    }
    if user.offline.core_assets.is_some() {
        base.offline.core_assets = user.offline.core_assets;
    }
}

#[cfg(feature = "native")]
fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("net", "gong", "gong").map(|d| d.config_dir().join("config.toml"))
}

#[cfg(not(feature = "native"))]
fn user_config_path() -> Option<PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults() {
        let c = GongConfig::default();
        assert_eq!(c.strike, StrikeParameters::default());
        assert_eq!(c.bounds, ScheduleBounds::new(5, 10));
        assert_eq!(c.countdown_interval_ms, 200);
        assert_eq!(c.settings_key, "gong:settings:v1");
        assert_eq!(c.offline.cache_name, "gong-v1");
        assert_eq!(c.offline.core_assets.len(), 4);
        assert!(c.start_suspended);
    }

    #[test]
    fn user_overrides_subset() {
        let c = GongConfig::from_toml_str(
            r#"
[strike]
tone = 220.0

[offline]
cache_name = "gong-v2"
"#,
        )
        .unwrap();
        assert_eq!(c.strike.tone, 220.0);
        assert_eq!(c.strike.volume, 0.6);
        assert_eq!(c.offline.cache_name, "gong-v2");
        assert_eq!(c.offline.root_document, "/gong/");
    }

    #[test]
    fn user_bounds_are_validated() {
        let c = GongConfig::from_toml_str("[auto]\nlower = 0\nupper = 0\n").unwrap();
        assert_eq!(c.bounds, ScheduleBounds::new(1, 1));
    }

    #[test]
    fn malformed_user_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[strike\nvolume = ").unwrap();
        assert_eq!(GongConfig::load_with(&path), GongConfig::default());
    }

    #[test]
    fn user_file_found_through_optional_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[audio]\nstart_suspended = false\n").unwrap();
        assert!(!GongConfig::load_from(Some(&path)).start_suspended);
        assert_eq!(GongConfig::load_from(None), GongConfig::default());
    }

    #[test]
    fn missing_user_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            GongConfig::load_with(&dir.path().join("nope.toml")),
            GongConfig::default()
        );
    }
}
