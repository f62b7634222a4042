use log::debug;

use crate::config::SkinningConfig;

pub mod context;
pub mod depth_stencil;
mod depth_texture;
pub mod index;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod model;
pub mod node;
pub mod skin;
pub mod uniform;

pub use depth_texture::{DepthTexture, DEPTH_TEXTURE_FORMAT};

use depth_stencil::DepthStencilTargetRegistry;
use index::IndexFormat;
use loader::RendererAssetLoader;
use material::{parameter::ParameterValue, RenderState, ShaderProgram};
use mesh::{MeshPart, PrimitiveMode};
use model::Model;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

/// Sink for draw submissions. A GPU backend implements this on top of its
/// command encoder; `CommandRecorder` keeps the stream for inspection.
pub trait RenderEncoder {
    fn set_render_state(&mut self, state: &RenderState);
    fn set_program(&mut self, program: &ShaderProgram);
    fn set_uniform(&mut self, name: &str, value: &ParameterValue);
    fn draw_indexed(&mut self, part: &MeshPart, polygon_mode: PolygonMode);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    SetRenderState(RenderState),
    SetProgram(usize),
    SetUniform(String, ParameterValue),
    DrawIndexed {
        mode: PrimitiveMode,
        index_format: IndexFormat,
        index_count: usize,
        polygon_mode: PolygonMode,
    },
}

#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<RenderCommand>,
}

impl CommandRecorder {
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::DrawIndexed { .. }))
            .count()
    }

    /// Last value uploaded for `name`.
    pub fn uniform(&self, name: &str) -> Option<&ParameterValue> {
        self.commands.iter().rev().find_map(|command| match command {
            RenderCommand::SetUniform(uniform, value) if uniform == name => Some(value),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl RenderEncoder for CommandRecorder {
    fn set_render_state(&mut self, state: &RenderState) {
        self.commands.push(RenderCommand::SetRenderState(*state));
    }

    fn set_program(&mut self, program: &ShaderProgram) {
        self.commands.push(RenderCommand::SetProgram(program.id()));
    }

    fn set_uniform(&mut self, name: &str, value: &ParameterValue) {
        self.commands
            .push(RenderCommand::SetUniform(name.to_string(), value.clone()));
    }

    fn draw_indexed(&mut self, part: &MeshPart, polygon_mode: PolygonMode) {
        self.commands.push(RenderCommand::DrawIndexed {
            mode: part.mode(),
            index_format: part.index_format(),
            index_count: part.index_count(),
            polygon_mode,
        });
    }
}

/// Owns the frame-independent renderer resources.
#[derive(Debug)]
pub struct Renderer {
    config: SkinningConfig,
    depth_stencil_targets: DepthStencilTargetRegistry,
    wireframe: bool,
}

impl Renderer {
    pub fn new(config: SkinningConfig) -> Self {
        Self {
            config,
            depth_stencil_targets: DepthStencilTargetRegistry::default(),
            wireframe: false,
        }
    }

    pub fn config(&self) -> &SkinningConfig {
        &self.config
    }

    pub fn loader(&self) -> RendererAssetLoader {
        RendererAssetLoader::new(self.config.clone())
    }

    pub fn depth_stencil_targets(&self) -> &DepthStencilTargetRegistry {
        &self.depth_stencil_targets
    }

    pub fn depth_stencil_targets_mut(&mut self) -> &mut DepthStencilTargetRegistry {
        &mut self.depth_stencil_targets
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.wireframe = wireframe;
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Draws every model, returns the number of parts submitted.
    pub fn render<'a>(
        &self,
        models: impl IntoIterator<Item = &'a mut Model>,
        encoder: &mut dyn RenderEncoder,
    ) -> usize {
        let drawn: usize = models
            .into_iter()
            .map(|model| model.draw(&mut *encoder, self.wireframe))
            .sum();
        debug!("Submitted {} parts", drawn);
        drawn
    }
}
