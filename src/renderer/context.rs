use glam::Mat4;

pub static DEFAULT_CONTEXT: Context = Context {
    transform: Mat4::IDENTITY,
};

/// Accumulated transform from the root of a node tree down to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Context {
    transform: Mat4,
}

impl Default for Context {
    fn default() -> Self {
        DEFAULT_CONTEXT
    }
}

impl Context {
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn add_transform(&self, transform: &Mat4) -> Self {
        Self {
            transform: self.transform * (*transform),
        }
    }
}
