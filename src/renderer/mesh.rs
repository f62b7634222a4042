use std::{cell::RefCell, rc::Rc};

use super::index::{IndexBuffer, IndexFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    LineStrip,
    LineList,
    TriangleStrip,
    TriangleList,
}

/// A range of the mesh drawn with one material and one indexed draw.
#[derive(Debug)]
pub struct MeshPart {
    mode: PrimitiveMode,
    indices: IndexBuffer,
}

impl MeshPart {
    pub fn new(mode: PrimitiveMode, indices: &[u32]) -> Self {
        Self {
            mode,
            indices: IndexBuffer::new(indices),
        }
    }

    pub fn mode(&self) -> PrimitiveMode {
        self.mode
    }

    pub fn index_format(&self) -> IndexFormat {
        self.indices.format()
    }

    pub fn index_count(&self) -> usize {
        self.indices.indices()
    }

    pub fn index_buffer(&self) -> &IndexBuffer {
        &self.indices
    }
}

/// Shared between models. Parts may be appended or truncated after models
/// were created, models pick the change up on their next draw.
#[derive(Debug, Default)]
pub struct Mesh {
    name: Option<String>,
    parts: RefCell<Vec<Rc<MeshPart>>>,
}

impl Mesh {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            parts: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn add_part(&self, part: MeshPart) -> usize {
        let mut parts = self.parts.borrow_mut();
        parts.push(Rc::new(part));
        parts.len() - 1
    }

    /// Drops every part from `count` on. Returns how many were removed.
    pub fn truncate_parts(&self, count: usize) -> usize {
        let mut parts = self.parts.borrow_mut();
        let removed = parts.len().saturating_sub(count);
        parts.truncate(count);
        removed
    }

    pub fn part_count(&self) -> usize {
        self.parts.borrow().len()
    }

    pub fn part(&self, index: usize) -> Option<Rc<MeshPart>> {
        self.parts.borrow().get(index).cloned()
    }
}
