use std::{
    cell::RefCell,
    collections::BTreeMap,
    path::PathBuf,
    rc::Rc,
};

use log::debug;

use crate::asset::material::{MaterialAlphaMode, MaterialStateAsset};

use super::{node::new_node_id, RenderEncoder};

pub mod loader;
pub mod parameter;

use parameter::{MaterialParameter, ParameterBinding, ParameterValue};

/// Splits a newline separated define list, dropping blank lines.
pub fn parse_defines(defines: &str) -> Vec<String> {
    defines
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub path: Option<PathBuf>,
    pub source: String,
}

impl ShaderSource {
    pub fn new(path: Option<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path,
            source: source.into(),
        }
    }
}

#[derive(Debug)]
pub struct ShaderProgram {
    id: usize,
    vertex: ShaderSource,
    fragment: ShaderSource,
    defines: Vec<String>,
}

impl ShaderProgram {
    pub fn new(vertex: ShaderSource, fragment: ShaderSource, defines: Vec<String>) -> Self {
        Self {
            id: new_node_id(),
            vertex,
            fragment,
            defines,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn vertex(&self) -> &ShaderSource {
        &self.vertex
    }

    pub fn fragment(&self) -> &ShaderSource {
        &self.fragment
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    /// `#define` lines prepended to both stages when compiling.
    pub fn preamble(&self) -> String {
        self.defines
            .iter()
            .map(|define| format!("#define {}\n", define))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub alpha_mode: MaterialAlphaMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_face: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        MaterialStateAsset::default().into()
    }
}

impl From<MaterialStateAsset> for RenderState {
    fn from(value: MaterialStateAsset) -> Self {
        Self {
            alpha_mode: value.alpha_mode,
            depth_test: value.depth_test,
            depth_write: value.depth_write,
            cull_face: value.cull_face,
        }
    }
}

/// Shader program, render state and named parameters used to draw a mesh
/// part. Materials are shared between models through `Rc`.
#[derive(Debug)]
pub struct Material {
    id: usize,
    name: Option<String>,
    program: Rc<ShaderProgram>,
    state: RenderState,
    parameters: RefCell<BTreeMap<String, MaterialParameter>>,
}

impl Material {
    pub fn new(name: Option<String>, program: Rc<ShaderProgram>, state: RenderState) -> Self {
        Self {
            id: new_node_id(),
            name,
            program,
            state,
            parameters: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn program(&self) -> &Rc<ShaderProgram> {
        &self.program
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: ParameterValue) {
        self.parameters
            .borrow_mut()
            .insert(name.into(), MaterialParameter::Value(value));
    }

    /// Replaces whatever `name` held with a binding evaluated on every bind.
    pub fn bind_parameter(&self, name: impl Into<String>, binding: ParameterBinding) {
        self.parameters
            .borrow_mut()
            .insert(name.into(), MaterialParameter::Binding(binding));
    }

    pub fn clear_parameter(&self, name: &str) -> bool {
        self.parameters.borrow_mut().remove(name).is_some()
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.borrow().contains_key(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.parameters
            .borrow()
            .get(name)
            .is_some_and(MaterialParameter::is_binding)
    }

    /// Current value, with bindings evaluated.
    pub fn parameter(&self, name: &str) -> Option<ParameterValue> {
        self.parameters.borrow().get(name)?.value()
    }

    pub fn bind(&self, encoder: &mut dyn RenderEncoder) {
        encoder.set_render_state(&self.state);
        encoder.set_program(&self.program);
        for (name, parameter) in self.parameters.borrow().iter() {
            match parameter.value() {
                Some(value) => encoder.set_uniform(name, &value),
                None => debug!(
                    "Parameter {} of material #{} has no source, skipped",
                    name, self.id
                ),
            }
        }
    }
}
