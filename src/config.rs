use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    flash::FlashEnvelope,
    metronome::Settings,
    tap_tempo::{DEFAULT_TAP_WINDOW, MAX_TAP_WINDOW, MIN_TAP_WINDOW},
    tempo::{Bpm, DEFAULT_BPM},
};

pub const DEFAULT_COLOR: &str = "#FF0000";

/// Contents of the optional YAML configuration file.
///
/// ```yaml
/// bpm: 96
/// color: "#00FFAA"
/// click_sound: sounds/click.wav
/// tap_window: 4
/// flash:
///   rise_ms: 80
///   fall_ms: 200
/// midi_port: "nanoKONTROL"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub bpm: u32,
    pub color: String,
    pub click_sound: Option<PathBuf>,
    pub tap_window: usize,
    pub flash: FlashEnvelope,
    pub midi_port: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            color: DEFAULT_COLOR.to_string(),
            click_sound: None,
            tap_window: DEFAULT_TAP_WINDOW,
            flash: FlashEnvelope::default(),
            midi_port: None,
        }
    }
}

impl Config {
    /// Read `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Bpm::new(self.bpm).map_err(|err| ConfigError::Invalid(format!("bpm: {err}")))?;
        if !(MIN_TAP_WINDOW..=MAX_TAP_WINDOW).contains(&self.tap_window) {
            return Err(ConfigError::Invalid(format!(
                "tap_window must be {MIN_TAP_WINDOW}..={MAX_TAP_WINDOW}, got {}",
                self.tap_window
            )));
        }
        Ok(())
    }

    /// Validated settings for the metronome screen.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        self.validate()?;
        Ok(Settings {
            bpm: Bpm::new(self.bpm).map_err(|err| ConfigError::Invalid(err.to_string()))?,
            color: self.color.clone(),
            tap_window: self.tap_window,
            flash: self.flash,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => {
                write!(f, "failed to read config {}: {err}", path.display())
            }
            ConfigError::Parse(err) => write!(f, "failed to parse config: {err}"),
            ConfigError::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bpm, 120);
        assert_eq!(config.color, "#FF0000");
        assert_eq!(config.flash.rise_ms, 80);
        assert_eq!(config.flash.fall_ms, 200);
    }

    #[test]
    fn reads_partial_file() {
        let config = Config::from_yaml(
            "bpm: 96\ncolor: \"#00FFAA\"\nflash:\n  fall_ms: 350\nmidi_port: nano\n",
        )
        .unwrap();
        assert_eq!(config.bpm, 96);
        assert_eq!(config.color, "#00FFAA");
        assert_eq!(config.flash.rise_ms, 80);
        assert_eq!(config.flash.fall_ms, 350);
        assert_eq!(config.midi_port.as_deref(), Some("nano"));
        assert_eq!(config.tap_window, 4);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_yaml("bpm: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_yaml("tap_window: 1"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_yaml("tap_window: 5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_yaml("tempo: 120"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn smaller_tap_window_is_allowed() {
        let settings = Config::from_yaml("tap_window: 3").unwrap().settings().unwrap();
        assert_eq!(settings.tap_window, 3);
    }

    #[test]
    fn missing_path_means_defaults() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
        assert!(matches!(
            Config::load(Some(Path::new("/nonexistent/bpm-flash.yml"))),
            Err(ConfigError::Io(..))
        ));
    }
}
