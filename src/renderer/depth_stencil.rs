use std::rc::Rc;

use log::info;

pub use super::depth_texture::DepthStencilFormat;
use super::DepthTexture;

/// Depth (and optionally stencil) attachment that frame buffers render into.
#[derive(Debug)]
pub struct DepthStencilTarget {
    id: String,
    texture: DepthTexture,
}

impl DepthStencilTarget {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> DepthStencilFormat {
        self.texture.format()
    }

    pub fn has_stencil(&self) -> bool {
        self.texture.format().has_stencil()
    }

    pub fn texture(&self) -> &DepthTexture {
        &self.texture
    }
}

/// Targets created by the renderer, looked up by id.
///
/// Ids are not required to be unique, lookups return the oldest match.
#[derive(Debug, Default)]
pub struct DepthStencilTargetRegistry {
    targets: Vec<Rc<DepthStencilTarget>>,
}

impl DepthStencilTargetRegistry {
    pub fn create(
        &mut self,
        id: impl Into<String>,
        format: DepthStencilFormat,
        width: u32,
        height: u32,
    ) -> Rc<DepthStencilTarget> {
        let target = Rc::new(DepthStencilTarget {
            id: id.into(),
            texture: DepthTexture::new((width, height), format),
        });
        info!(
            "Created depth stencil target {} ({}x{}, {:?})",
            target.id, width, height, format
        );
        self.targets.push(target.clone());
        target
    }

    pub fn get(&self, id: &str) -> Option<Rc<DepthStencilTarget>> {
        self.targets.iter().find(|target| target.id == id).cloned()
    }

    /// Drops the registry's hold on the oldest target named `id`. Handles
    /// given out earlier stay valid.
    pub fn remove(&mut self, id: &str) -> Option<Rc<DepthStencilTarget>> {
        let position = self.targets.iter().position(|target| target.id == id)?;
        info!("Removed depth stencil target {}", id);
        Some(self.targets.remove(position))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.targets.is_empty() {
            info!("Clearing {} depth stencil targets", self.targets.len());
        }
        self.targets.clear();
    }
}
