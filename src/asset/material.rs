use std::{collections::BTreeMap, path::PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialAlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MaterialStateAsset {
    pub alpha_mode: MaterialAlphaMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_face: bool,
}

impl Default for MaterialStateAsset {
    fn default() -> Self {
        Self {
            alpha_mode: MaterialAlphaMode::Opaque,
            depth_test: true,
            depth_write: true,
            cull_face: true,
        }
    }
}

/// Constant parameter as written in a material file: a scalar or a list of
/// 2, 3, 4 or 16 floats.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParameterAsset {
    Float(f32),
    Floats(Vec<f32>),
}

/// Material descriptor file contents (JSON).
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialAsset {
    #[serde(default)]
    pub name: Option<String>,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub state: MaterialStateAsset,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterAsset>,
}
