use std::{
    cell::{Cell, RefCell},
    fmt::{self, Debug, Formatter},
    ptr,
    rc::{Rc, Weak},
};

use glam::{Mat4, Quat, Vec3};
use log::{trace, warn};

use crate::{
    asset::node::{DecomposedTransform, NodeTransform},
    renderer::context::Context,
};

use super::{new_node_id, ListenerToken, TransformListener};

struct ListenerEntry {
    listener: Weak<dyn TransformListener>,
    token: ListenerToken,
}

struct TransformNodeInner {
    id: usize,
    name: Option<String>,
    transform: RefCell<DecomposedTransform>,
    // World transform, kept current on every local or parent change
    context: Cell<Context>,
    parent: RefCell<Weak<TransformNodeInner>>,
    children: RefCell<Vec<TransformNode>>,
    listeners: RefCell<Vec<ListenerEntry>>,
}

/// Shared handle to a node of the transform hierarchy.
///
/// Parents own their children, children point back weakly. Every change of a
/// local transform is pushed down the subtree right away, and each node whose
/// world transform moved notifies its listeners before its children do.
#[derive(Clone)]
pub struct TransformNode(Rc<TransformNodeInner>);

#[derive(Debug, Clone, Default)]
pub struct WeakTransformNode(Weak<TransformNodeInner>);

impl WeakTransformNode {
    pub fn upgrade(&self) -> Option<TransformNode> {
        self.0.upgrade().map(TransformNode)
    }
}

impl TransformNode {
    pub fn new(name: Option<String>) -> Self {
        Self::from_decomposed_transform(name, DecomposedTransform::default())
    }

    pub fn from_transform(name: Option<String>, transform: NodeTransform) -> Self {
        Self::from_decomposed_transform(name, transform.into())
    }

    pub fn from_decomposed_transform(name: Option<String>, transform: DecomposedTransform) -> Self {
        let context = Context::default().add_transform(&transform.clone().into());
        Self(Rc::new(TransformNodeInner {
            id: new_node_id(),
            name,
            transform: RefCell::new(transform),
            context: Cell::new(context),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn transform(&self) -> DecomposedTransform {
        self.0.transform.borrow().clone()
    }

    /// Local transform matrix.
    pub fn matrix(&self) -> Mat4 {
        self.transform().into()
    }

    pub fn set_transform(&self, new_transform: DecomposedTransform) {
        self.update_transform(|transform| *transform = new_transform);
    }

    pub fn set_translation(&self, translation: Vec3) {
        self.update_transform(|transform| transform.translation = translation);
    }

    pub fn set_rotation(&self, rotation: Quat) {
        self.update_transform(|transform| transform.rotation = rotation);
    }

    pub fn set_scale(&self, scale: Vec3) {
        self.update_transform(|transform| transform.scale = scale);
    }

    fn update_transform(&self, func: impl FnOnce(&mut DecomposedTransform)) {
        func(&mut self.0.transform.borrow_mut());
        self.update_context();
    }

    pub fn context(&self) -> Context {
        self.0.context.get()
    }

    pub fn world_matrix(&self) -> Mat4 {
        *self.0.context.get().transform()
    }

    pub fn parent(&self) -> Option<TransformNode> {
        self.0.parent.borrow().upgrade().map(TransformNode)
    }

    pub fn children(&self) -> Vec<TransformNode> {
        self.0.children.borrow().clone()
    }

    pub fn add_child(&self, child: &TransformNode) {
        if child == self || child.is_ancestor_of(self) {
            warn!(
                "Refusing to attach node #{} under #{}: it would create a cycle",
                child.id(),
                self.id()
            );
            return;
        }
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
        child.update_context();
    }

    /// Returns false when `child` is not a direct child of this node.
    pub fn remove_child(&self, child: &TransformNode) -> bool {
        if child.parent().as_ref() != Some(self) {
            return false;
        }
        child.detach();
        child.update_context();
        true
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.0.children.borrow_mut().retain(|item| item != self);
        }
        *self.0.parent.borrow_mut() = Weak::new();
    }

    fn is_ancestor_of(&self, node: &TransformNode) -> bool {
        let mut current = node.parent();
        while let Some(parent) = current {
            if &parent == self {
                return true;
            }
            current = parent.parent();
        }
        false
    }

    /// Registers a listener. The same listener may be registered several
    /// times with different tokens, each registration is notified separately.
    pub fn add_listener(&self, listener: Weak<dyn TransformListener>, token: ListenerToken) {
        self.0
            .listeners
            .borrow_mut()
            .push(ListenerEntry { listener, token });
    }

    /// Removes the first registration matching both listener and token.
    pub fn remove_listener(
        &self,
        listener: &Weak<dyn TransformListener>,
        token: ListenerToken,
    ) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let position = listeners.iter().position(|entry| {
            entry.token == token && ptr::addr_eq(entry.listener.as_ptr(), listener.as_ptr())
        });
        match position {
            Some(position) => {
                listeners.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.0
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.listener.strong_count() > 0)
            .count()
    }

    /// Calls every live listener with this node and its token. The listener
    /// table is not borrowed during the calls, so listeners may read this node
    /// or register and unregister themselves.
    pub fn notify_listeners(&self) {
        let listeners: Vec<_> = {
            let mut entries = self.0.listeners.borrow_mut();
            entries.retain(|entry| entry.listener.strong_count() > 0);
            entries
                .iter()
                .map(|entry| (entry.listener.clone(), entry.token))
                .collect()
        };
        if !listeners.is_empty() {
            trace!(
                "Node #{} changed, notifying {} listeners",
                self.id(),
                listeners.len()
            );
        }
        for (listener, token) in listeners {
            if let Some(listener) = listener.upgrade() {
                listener.transform_changed(self, token);
            }
        }
    }

    fn update_context(&self) {
        let parent_context = self
            .parent()
            .map(|parent| parent.context())
            .unwrap_or_default();
        self.0
            .context
            .set(parent_context.add_transform(&self.matrix()));
        self.notify_listeners();
        for child in self.children() {
            child.update_context();
        }
    }

    pub fn downgrade(&self) -> WeakTransformNode {
        WeakTransformNode(Rc::downgrade(&self.0))
    }
}

impl PartialEq for TransformNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TransformNode {}

impl Debug for TransformNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformNode")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("transform", &*self.0.transform.borrow())
            .field("listeners", &self.0.listeners.borrow().len())
            .field("children", &*self.0.children.borrow())
            .finish()
    }
}
