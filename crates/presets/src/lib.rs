//! Enhancement parameters, named presets, and the settings channel.
//!
//! The pipeline consumes a single immutable value type,
//! [`EnhancementParameters`], holding the three stage intensities. Presets are
//! named parameter triples: a handful ship built in, and users may define
//! their own in a TOML [`PresetLibrary`]. Parameter changes reach running
//! sessions through the [`hub::SettingsHub`] fan-out channel, and the
//! [`advisor`] module offers an optional preset recommendation heuristic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod advisor;
pub mod hub;

pub use hub::{SettingsEvent, SettingsHub};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse preset library: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid preset library: {0}")]
    Invalid(String),
}

/// The full parameter set consumed by the shader chain.
///
/// Each intensity lives in `[0, 1]`; zero disables the stage entirely. The
/// value is replaced wholesale on every change — partial-field updates are
/// never meaningful, so there are no per-field setters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EnhancementParameters {
    pub debanding: f32,
    pub smoothing: f32,
    pub sharpening: f32,
}

impl EnhancementParameters {
    /// All stages disabled; the chain is an exact identity.
    pub const DISABLED: Self = Self {
        debanding: 0.0,
        smoothing: 0.0,
        sharpening: 0.0,
    };

    pub fn new(debanding: f32, smoothing: f32, sharpening: f32) -> Self {
        Self {
            debanding,
            smoothing,
            sharpening,
        }
        .clamped()
    }

    /// Returns a copy with every intensity clamped to `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self {
            debanding: self.debanding.clamp(0.0, 1.0),
            smoothing: self.smoothing.clamp(0.0, 1.0),
            sharpening: self.sharpening.clamp(0.0, 1.0),
        }
    }

    /// True when every stage is gated off and the chain passes pixels through.
    pub fn is_identity(&self) -> bool {
        self.debanding == 0.0 && self.smoothing == 0.0 && self.sharpening == 0.0
    }

    fn in_range(&self) -> bool {
        let ok = |v: f32| (0.0..=1.0).contains(&v);
        ok(self.debanding) && ok(self.smoothing) && ok(self.sharpening)
    }
}

impl Default for EnhancementParameters {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// A named, fixed intensity triple selectable by a user or heuristic.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Preset {
    pub name: String,
    #[serde(flatten)]
    pub parameters: EnhancementParameters,
}

impl Preset {
    pub fn new(name: impl Into<String>, parameters: EnhancementParameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// The presets shipped with the application. Values are authored by eye on
/// low-bitrate test footage, not derived.
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::new("off", EnhancementParameters::DISABLED),
        Preset::new("light", EnhancementParameters::new(0.3, 0.2, 0.1)),
        Preset::new("medium", EnhancementParameters::new(0.5, 0.3, 0.15)),
        Preset::new("strong", EnhancementParameters::new(0.8, 0.5, 0.3)),
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct PresetEntry {
    debanding: f32,
    smoothing: f32,
    sharpening: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct LibraryFile {
    version: u32,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    presets: BTreeMap<String, PresetEntry>,
}

/// Built-in presets plus any user-defined entries loaded from TOML.
///
/// User entries shadow built-ins of the same name. The library validates on
/// load: intensities must sit in `[0, 1]` and the declared default preset
/// must exist.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    presets: Vec<Preset>,
    default: String,
}

impl PresetLibrary {
    /// A library holding only the built-in presets, defaulting to `medium`.
    pub fn builtin() -> Self {
        Self {
            presets: builtin_presets(),
            default: "medium".to_string(),
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LibraryFile = toml::from_str(input)?;
        if raw.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported preset library version {}; expected 1",
                raw.version
            )));
        }

        let mut library = Self::builtin();
        for (name, entry) in &raw.presets {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("preset name may not be empty".into()));
            }
            let parameters = EnhancementParameters {
                debanding: entry.debanding,
                smoothing: entry.smoothing,
                sharpening: entry.sharpening,
            };
            if !parameters.in_range() {
                return Err(ConfigError::Invalid(format!(
                    "preset '{name}' has an intensity outside [0, 1]"
                )));
            }
            library.upsert(Preset::new(name.clone(), parameters));
        }

        if let Some(default) = raw.default {
            if library.preset(&default).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "default references unknown preset '{default}'"
                )));
            }
            library.default = default;
        }

        Ok(library)
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.name == name)
    }

    pub fn default_preset(&self) -> &Preset {
        self.preset(&self.default)
            .unwrap_or_else(|| &self.presets[0])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|preset| preset.name.as_str())
    }

    fn upsert(&mut self, preset: Preset) {
        match self
            .presets
            .iter_mut()
            .find(|existing| existing.name == preset.name)
        {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
default = "movie-night"

[presets.movie-night]
debanding = 0.6
smoothing = 0.4
sharpening = 0.2

[presets.light]
debanding = 0.25
smoothing = 0.1
sharpening = 0.05
"#;

    #[test]
    fn parses_sample_library() {
        let library = PresetLibrary::from_toml_str(SAMPLE).expect("parse library");
        assert_eq!(library.default_preset().name, "movie-night");
        let custom = library.preset("movie-night").unwrap();
        assert_eq!(custom.parameters.debanding, 0.6);
        // Built-ins survive alongside user entries.
        assert!(library.preset("off").is_some());
        // User entry shadows the built-in of the same name.
        assert_eq!(library.preset("light").unwrap().parameters.smoothing, 0.1);
    }

    #[test]
    fn rejects_out_of_range_intensity() {
        let bad = r#"
version = 1

[presets.hot]
debanding = 1.5
smoothing = 0.0
sharpening = 0.0
"#;
        let err = PresetLibrary::from_toml_str(bad).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_default() {
        let bad = r#"
version = 1
default = "missing"
"#;
        let err = PresetLibrary::from_toml_str(bad).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = PresetLibrary::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn parameters_clamp_and_identity() {
        let params = EnhancementParameters::new(2.0, -1.0, 0.5);
        assert_eq!(params.debanding, 1.0);
        assert_eq!(params.smoothing, 0.0);
        assert_eq!(params.sharpening, 0.5);
        assert!(!params.is_identity());
        assert!(EnhancementParameters::DISABLED.is_identity());
    }
}
