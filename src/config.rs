use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    fs, io,
    path::Path,
};

use serde::Deserialize;

use crate::renderer::uniform::skin::MAX_JOINTS;

/// When a skin refreshes the palette rows of a joint that reported a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteUpdate {
    /// Mark the joint dirty and recompute its rows on the next palette read.
    #[default]
    Deferred,
    /// Recompute the joint's rows inside the change notification.
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SkinningConfig {
    pub max_joints: usize,
    pub palette_update: PaletteUpdate,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            max_joints: MAX_JOINTS,
            palette_update: PaletteUpdate::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Failed to read skinning config: {}", err),
            ConfigError::Parse(err) => write!(f, "Bad skinning config: {}", err),
        }
    }
}

impl Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        ConfigError::Parse(value)
    }
}

impl SkinningConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod test {
    use super::{PaletteUpdate, SkinningConfig};
    use crate::renderer::uniform::skin::MAX_JOINTS;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = SkinningConfig::from_json("{}").unwrap();
        assert_eq!(config, SkinningConfig::default());
        assert_eq!(config.max_joints, MAX_JOINTS);
        assert_eq!(config.palette_update, PaletteUpdate::Deferred);
    }

    #[test]
    fn test_parse_immediate_policy() {
        let config =
            SkinningConfig::from_json(r#"{ "max_joints": 64, "palette_update": "immediate" }"#)
                .unwrap();
        assert_eq!(config.max_joints, 64);
        assert_eq!(config.palette_update, PaletteUpdate::Immediate);
    }

    #[test]
    fn test_reject_unknown_policy() {
        assert!(SkinningConfig::from_json(r#"{ "palette_update": "sometimes" }"#).is_err());
    }
}
