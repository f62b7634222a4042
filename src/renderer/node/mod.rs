use std::sync::atomic::{AtomicUsize, Ordering};

pub mod joint;
pub mod transform;

use transform::TransformNode;

static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn new_node_id() -> usize {
    ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Opaque value handed back to a listener with every change notification.
/// The node never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub usize);

/// Receives a call whenever an observed node's world transform changes.
///
/// Nodes hold their listeners weakly, so a listener that is dropped without
/// unregistering is skipped and pruned on the next notification.
pub trait TransformListener {
    fn transform_changed(&self, transform: &TransformNode, token: ListenerToken);
}
