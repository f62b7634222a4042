use std::{
    cell::Cell,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

use glam::Mat4;

use crate::asset::node::DecomposedTransform;

use super::transform::TransformNode;

struct JointInner {
    node: TransformNode,
    inverse_bind_matrix: Cell<Mat4>,
}

/// A skeleton joint: a transform node plus the inverse of its bind pose.
///
/// Cloning shares the joint, so several skins can reference the same
/// skeleton. Identity is by handle, not by id.
#[derive(Clone)]
pub struct Joint(Rc<JointInner>);

impl Joint {
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_node(TransformNode::new(Some(id.into())))
    }

    pub fn with_transform(id: impl Into<String>, transform: DecomposedTransform) -> Self {
        Self::from_node(TransformNode::from_decomposed_transform(
            Some(id.into()),
            transform,
        ))
    }

    pub fn from_node(node: TransformNode) -> Self {
        Self(Rc::new(JointInner {
            node,
            inverse_bind_matrix: Cell::new(Mat4::IDENTITY),
        }))
    }

    pub fn id(&self) -> &str {
        self.0.node.name().unwrap_or_default()
    }

    pub fn node(&self) -> &TransformNode {
        &self.0.node
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.0.node.world_matrix()
    }

    pub fn inverse_bind_matrix(&self) -> Mat4 {
        self.0.inverse_bind_matrix.get()
    }

    /// The skinning matrix depends on the inverse bind matrix, so listeners
    /// are notified as if the transform had changed.
    pub fn set_inverse_bind_matrix(&self, matrix: Mat4) {
        self.0.inverse_bind_matrix.set(matrix);
        self.0.node.notify_listeners();
    }

    pub fn add_child(&self, child: &Joint) {
        self.0.node.add_child(&child.0.node);
    }

    /// Matrix taking a vertex from mesh space to its deformed world position:
    /// bind shape first, then the inverse bind pose, then the joint's world
    /// transform.
    pub fn joint_matrix(&self, bind_shape: &Mat4) -> Mat4 {
        self.world_matrix() * self.inverse_bind_matrix() * *bind_shape
    }
}

impl PartialEq for Joint {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Joint {}

impl Debug for Joint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Joint")
            .field("id", &self.id())
            .field("node", &self.0.node.id())
            .field("inverse_bind_matrix", &self.0.inverse_bind_matrix.get())
            .finish()
    }
}
