use std::{
    cell::{Cell, RefCell},
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    mem,
    rc::{Rc, Weak},
};

use glam::{Mat4, Vec4};
use log::{debug, trace, warn};

use crate::config::{PaletteUpdate, SkinningConfig};

use super::{
    model::ModelId,
    node::{joint::Joint, transform::TransformNode, ListenerToken, TransformListener},
    uniform::skin::MatrixPalette,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkinError {
    JointIndexOutOfRange { index: usize, count: usize },
    JointCountExceeded { count: usize, max: usize },
    RootJointNotMember,
}

impl Display for SkinError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkinError::JointIndexOutOfRange { index, count } => {
                write!(f, "Joint index {} out of range, skin has {} joints", index, count)
            }
            SkinError::JointCountExceeded { count, max } => {
                write!(f, "Skin can hold at most {} joints, {} requested", max, count)
            }
            SkinError::RootJointNotMember => {
                write!(f, "Root joint must be one of the skin's joints")
            }
        }
    }
}

impl Error for SkinError {}

// Shared with the joints (as a weak listener) and with material bindings (as
// a weak palette source). Only the owning MeshSkin holds it strongly.
struct SkinState {
    update: PaletteUpdate,
    bind_shape: Cell<Mat4>,
    joints: RefCell<Vec<Option<Joint>>>,
    palette: RefCell<MatrixPalette>,
    // Joint slots whose palette rows are stale
    dirty: RefCell<Vec<bool>>,
    any_dirty: Cell<bool>,
}

impl SkinState {
    fn joint_matrix(&self, index: usize) -> Mat4 {
        let bind_shape = self.bind_shape.get();
        self.joints
            .borrow()
            .get(index)
            .and_then(Option::as_ref)
            .map_or(Mat4::IDENTITY, |joint| joint.joint_matrix(&bind_shape))
    }

    fn mark_dirty(&self, index: usize) {
        if let Some(flag) = self.dirty.borrow_mut().get_mut(index) {
            *flag = true;
            self.any_dirty.set(true);
        }
    }

    fn mark_all_dirty(&self) {
        let mut dirty = self.dirty.borrow_mut();
        dirty.iter_mut().for_each(|flag| *flag = true);
        self.any_dirty.set(!dirty.is_empty());
    }

    /// Recomputes every stale joint exactly once.
    fn refresh(&self) {
        if !self.any_dirty.get() {
            return;
        }
        let mut palette = self.palette.borrow_mut();
        let joints = self.joints.borrow();
        let mut dirty = self.dirty.borrow_mut();
        let bind_shape = self.bind_shape.get();
        let mut refreshed = 0;
        for (index, flag) in dirty.iter_mut().enumerate() {
            if !*flag {
                continue;
            }
            let matrix = joints[index]
                .as_ref()
                .map_or(Mat4::IDENTITY, |joint| joint.joint_matrix(&bind_shape));
            palette.write_joint(index, &matrix);
            *flag = false;
            refreshed += 1;
        }
        self.any_dirty.set(false);
        trace!("Refreshed {} palette joints", refreshed);
    }
}

impl TransformListener for SkinState {
    fn transform_changed(&self, transform: &TransformNode, token: ListenerToken) {
        let index = token.0;
        let count = self.dirty.borrow().len();
        if index >= count {
            warn!(
                "Node #{} reported a change for joint slot {}, but the skin has {} joints",
                transform.id(),
                index,
                count
            );
            return;
        }
        match self.update {
            PaletteUpdate::Deferred => self.mark_dirty(index),
            PaletteUpdate::Immediate => {
                let matrix = self.joint_matrix(index);
                self.palette.borrow_mut().write_joint(index, &matrix);
                self.dirty.borrow_mut()[index] = false;
            }
        }
    }
}

/// Weak view of a skin's palette, used by material parameter bindings.
#[derive(Clone)]
pub(crate) struct PaletteSource(Weak<SkinState>);

impl PaletteSource {
    pub(crate) fn rows(&self) -> Option<Vec<Vec4>> {
        let state = self.0.upgrade()?;
        state.refresh();
        let rows = state.palette.borrow().rows().to_vec();
        Some(rows)
    }
}

/// Keeps the matrix palette of a skinned model in sync with its joints.
///
/// The skin registers itself on every joint it references, with the joint's
/// slot index as token. A change notification only touches that slot's three
/// rows, so the per-frame cost follows the number of joints that moved.
pub struct MeshSkin {
    state: Rc<SkinState>,
    max_joints: usize,
    root_joint: Option<Joint>,
    model: Option<ModelId>,
}

impl MeshSkin {
    pub(crate) fn new(config: &SkinningConfig) -> Self {
        Self {
            state: Rc::new(SkinState {
                update: config.palette_update,
                bind_shape: Cell::new(Mat4::IDENTITY),
                joints: RefCell::new(Vec::new()),
                palette: RefCell::new(MatrixPalette::default()),
                dirty: RefCell::new(Vec::new()),
                any_dirty: Cell::new(false),
            }),
            max_joints: config.max_joints,
            root_joint: None,
            model: None,
        }
    }

    fn listener(&self) -> Weak<dyn TransformListener> {
        let state: Rc<dyn TransformListener> = self.state.clone();
        Rc::downgrade(&state)
    }

    fn after_change(&self) {
        if self.state.update == PaletteUpdate::Immediate {
            self.state.refresh();
        }
    }

    pub fn bind_shape(&self) -> Mat4 {
        self.state.bind_shape.get()
    }

    pub fn set_bind_shape(&mut self, matrix: Mat4) {
        self.state.bind_shape.set(matrix);
        self.state.mark_all_dirty();
        self.after_change();
    }

    pub fn joint_count(&self) -> usize {
        self.state.joints.borrow().len()
    }

    /// Resizes the joint list. New slots are empty, dropped joints stop
    /// notifying this skin, and every palette row is recomputed.
    pub(crate) fn set_joint_count(&mut self, count: usize) -> Result<(), SkinError> {
        if count > self.max_joints {
            return Err(SkinError::JointCountExceeded {
                count,
                max: self.max_joints,
            });
        }
        let listener = self.listener();
        {
            let mut joints = self.state.joints.borrow_mut();
            for (index, joint) in joints.iter().enumerate().skip(count) {
                if let Some(joint) = joint {
                    joint
                        .node()
                        .remove_listener(&listener, ListenerToken(index));
                }
            }
            joints.resize(count, None);
        }
        self.state.palette.borrow_mut().resize(count);
        *self.state.dirty.borrow_mut() = vec![true; count];
        self.state.any_dirty.set(count > 0);
        self.validate_root_joint();
        self.after_change();
        Ok(())
    }

    pub(crate) fn set_joint(&mut self, joint: Joint, index: usize) -> Result<(), SkinError> {
        self.replace_joint(Some(joint), index)
    }

    pub(crate) fn clear_joint(&mut self, index: usize) -> Result<(), SkinError> {
        self.replace_joint(None, index)
    }

    fn replace_joint(&mut self, joint: Option<Joint>, index: usize) -> Result<(), SkinError> {
        let count = self.joint_count();
        if index >= count {
            return Err(SkinError::JointIndexOutOfRange { index, count });
        }
        let listener = self.listener();
        let previous = mem::replace(&mut self.state.joints.borrow_mut()[index], joint.clone());
        if let Some(previous) = previous {
            previous
                .node()
                .remove_listener(&listener, ListenerToken(index));
        }
        if let Some(joint) = joint {
            joint.node().add_listener(listener, ListenerToken(index));
        }
        self.state.mark_dirty(index);
        self.validate_root_joint();
        self.after_change();
        Ok(())
    }

    /// Returns `Ok(None)` for an empty slot.
    pub fn joint(&self, index: usize) -> Result<Option<Joint>, SkinError> {
        let joints = self.state.joints.borrow();
        joints
            .get(index)
            .cloned()
            .ok_or(SkinError::JointIndexOutOfRange {
                index,
                count: joints.len(),
            })
    }

    pub fn joint_by_id(&self, id: &str) -> Option<Joint> {
        self.state
            .joints
            .borrow()
            .iter()
            .flatten()
            .find(|joint| joint.id() == id)
            .cloned()
    }

    /// Slot of `joint`, which is also its block in the palette.
    pub fn joint_index(&self, joint: &Joint) -> Option<usize> {
        self.state
            .joints
            .borrow()
            .iter()
            .position(|item| item.as_ref() == Some(joint))
    }

    pub fn root_joint(&self) -> Option<&Joint> {
        self.root_joint.as_ref()
    }

    pub fn set_root_joint(&mut self, joint: Option<&Joint>) -> Result<(), SkinError> {
        if let Some(joint) = joint {
            if self.joint_index(joint).is_none() {
                return Err(SkinError::RootJointNotMember);
            }
        }
        self.root_joint = joint.cloned();
        Ok(())
    }

    fn validate_root_joint(&mut self) {
        let orphaned = self
            .root_joint
            .as_ref()
            .is_some_and(|root| self.joint_index(root).is_none());
        if orphaned {
            debug!("Root joint was removed from the skin, clearing it");
            self.root_joint = None;
        }
    }

    /// Three rows per joint, current with every notification delivered so far.
    ///
    /// Returns a copy, so holding on to an earlier read never blocks a refresh.
    pub fn matrix_palette(&self) -> Vec<Vec4> {
        self.state.refresh();
        self.state.palette.borrow().rows().to_vec()
    }

    pub fn matrix_palette_size(&self) -> usize {
        self.state.palette.borrow().len()
    }

    pub(crate) fn palette_source(&self) -> PaletteSource {
        PaletteSource(Rc::downgrade(&self.state))
    }

    pub fn model(&self) -> Option<ModelId> {
        self.model
    }

    pub(crate) fn set_model(&mut self, model: Option<ModelId>) {
        self.model = model;
    }

    #[cfg(test)]
    fn dirty_joint_count(&self) -> usize {
        self.state.dirty.borrow().iter().filter(|flag| **flag).count()
    }
}

impl TransformListener for MeshSkin {
    fn transform_changed(&self, transform: &TransformNode, token: ListenerToken) {
        self.state.transform_changed(transform, token);
    }
}

impl Drop for MeshSkin {
    fn drop(&mut self) {
        let listener = self.listener();
        for (index, joint) in self.state.joints.borrow().iter().enumerate() {
            if let Some(joint) = joint {
                joint
                    .node()
                    .remove_listener(&listener, ListenerToken(index));
            }
        }
    }
}

impl Debug for MeshSkin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshSkin")
            .field("update", &self.state.update)
            .field("bind_shape", &self.state.bind_shape.get())
            .field("joints", &*self.state.joints.borrow())
            .field("root_joint", &self.root_joint.as_ref().map(Joint::id))
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::f32::consts::FRAC_PI_2;

    use glam::{Mat4, Quat, Vec3, Vec4};

    use super::{MeshSkin, SkinError};
    use crate::{
        config::{PaletteUpdate, SkinningConfig},
        renderer::node::{joint::Joint, ListenerToken, TransformListener},
    };

    fn skin_with(joints: &[&Joint]) -> MeshSkin {
        let mut skin = MeshSkin::new(&SkinningConfig::default());
        skin.set_joint_count(joints.len()).unwrap();
        for (index, joint) in joints.iter().enumerate() {
            skin.set_joint((*joint).clone(), index).unwrap();
        }
        skin
    }

    fn assert_rows(actual: &[Vec4], expected: &[Vec4]) {
        assert_eq!(actual.len(), expected.len());
        for (actual, expected) in actual.iter().zip(expected) {
            assert!(
                actual.abs_diff_eq(*expected, 1e-6),
                "{} != {}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_palette_size_follows_joint_count() {
        let mut skin = MeshSkin::new(&SkinningConfig::default());
        for count in [0, 1, 5, 3, 0, 7] {
            skin.set_joint_count(count).unwrap();
            assert_eq!(skin.joint_count(), count);
            assert_eq!(skin.matrix_palette_size(), 3 * count);
            assert_eq!(skin.matrix_palette().len(), 3 * count);
        }
    }

    #[test]
    fn test_joint_count_limit() {
        let config = SkinningConfig {
            max_joints: 4,
            ..Default::default()
        };
        let mut skin = MeshSkin::new(&config);
        assert_eq!(
            skin.set_joint_count(5),
            Err(SkinError::JointCountExceeded { count: 5, max: 4 })
        );
        assert_eq!(skin.joint_count(), 0);
        assert!(skin.set_joint_count(4).is_ok());
    }

    #[test]
    fn test_empty_slots_are_identity() {
        let mut skin = MeshSkin::new(&SkinningConfig::default());
        skin.set_joint_count(2).unwrap();
        assert_eq!(skin.joint(1), Ok(None));
        assert_rows(
            &skin.matrix_palette(),
            &[Vec4::X, Vec4::Y, Vec4::Z, Vec4::X, Vec4::Y, Vec4::Z],
        );
    }

    #[test]
    fn test_rows_for_reference_joints() {
        let identity = Joint::new("identity");
        let moved = Joint::new("moved");
        let turned = Joint::new("turned");
        let skin = skin_with(&[&identity, &moved, &turned]);

        moved.node().set_translation(Vec3::new(1.0, 2.0, 3.0));
        turned.node().set_rotation(Quat::from_rotation_z(FRAC_PI_2));

        let palette = skin.matrix_palette();
        assert_rows(&palette[0..3], &[Vec4::X, Vec4::Y, Vec4::Z]);
        assert_rows(
            &palette[3..6],
            &[
                Vec4::new(1.0, 0.0, 0.0, 1.0),
                Vec4::new(0.0, 1.0, 0.0, 2.0),
                Vec4::new(0.0, 0.0, 1.0, 3.0),
            ],
        );
        assert_rows(
            &palette[6..9],
            &[
                Vec4::new(0.0, -1.0, 0.0, 0.0),
                Vec4::new(1.0, 0.0, 0.0, 0.0),
                Vec4::new(0.0, 0.0, 1.0, 0.0),
            ],
        );
    }

    #[test]
    fn test_rows_include_inverse_bind_and_bind_shape() {
        let joint = Joint::new("joint");
        let mut skin = skin_with(&[&joint]);
        joint.node().set_translation(Vec3::new(0.0, 5.0, 0.0));
        joint.set_inverse_bind_matrix(Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0)));
        skin.set_bind_shape(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));

        assert_rows(
            &skin.matrix_palette(),
            &[
                Vec4::new(1.0, 0.0, 0.0, 1.0),
                Vec4::new(0.0, 1.0, 0.0, 3.0),
                Vec4::new(0.0, 0.0, 1.0, 0.0),
            ],
        );
    }

    #[test]
    fn test_only_moved_joint_rows_change() {
        let root = Joint::new("root");
        let arm = Joint::new("arm");
        root.add_child(&arm);
        let mut skin = skin_with(&[&root, &arm]);
        skin.set_root_joint(Some(&root)).unwrap();

        let before = skin.matrix_palette().to_vec();
        arm.node().set_translation(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(skin.dirty_joint_count(), 1);
        let after = skin.matrix_palette().to_vec();

        assert_eq!(before[0..3], after[0..3]);
        assert_ne!(before[3..6], after[3..6]);
        assert_eq!(skin.dirty_joint_count(), 0);
    }

    #[test]
    fn test_parent_move_updates_child_rows() {
        let root = Joint::new("root");
        let arm = Joint::new("arm");
        root.add_child(&arm);
        let skin = skin_with(&[&root, &arm]);

        root.node().set_translation(Vec3::X);
        let palette = skin.matrix_palette();
        assert_eq!(palette[3].w, 1.0);
        assert_eq!(palette[0].w, 1.0);
    }

    #[test]
    fn test_replaced_joint_no_longer_notifies() {
        let old = Joint::new("old");
        let new = Joint::new("new");
        let mut skin = skin_with(&[&old]);
        assert_eq!(old.node().listener_count(), 1);

        skin.set_joint(new.clone(), 0).unwrap();
        assert_eq!(old.node().listener_count(), 0);
        assert_eq!(new.node().listener_count(), 1);

        let before = skin.matrix_palette().to_vec();
        old.node().set_translation(Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(skin.dirty_joint_count(), 0);
        assert_eq!(*skin.matrix_palette(), before[..]);
    }

    #[test]
    fn test_shrink_unregisters_dropped_joints() {
        let kept = Joint::new("kept");
        let dropped = Joint::new("dropped");
        let mut skin = skin_with(&[&kept, &dropped]);
        skin.set_root_joint(Some(&dropped)).unwrap();

        skin.set_joint_count(1).unwrap();
        assert_eq!(dropped.node().listener_count(), 0);
        assert_eq!(kept.node().listener_count(), 1);
        assert!(skin.root_joint().is_none());
        assert_eq!(skin.joint_index(&dropped), None);
    }

    #[test]
    fn test_set_joint_out_of_range() {
        let mut skin = MeshSkin::new(&SkinningConfig::default());
        skin.set_joint_count(2).unwrap();
        assert_eq!(
            skin.set_joint(Joint::new("late"), 2),
            Err(SkinError::JointIndexOutOfRange { index: 2, count: 2 })
        );
        assert_eq!(
            skin.joint(3),
            Err(SkinError::JointIndexOutOfRange { index: 3, count: 2 })
        );
    }

    #[test]
    fn test_joint_lookup() {
        let hip = Joint::new("hip");
        let knee = Joint::new("knee");
        let skin = skin_with(&[&hip, &knee]);

        for index in 0..skin.joint_count() {
            let joint = skin.joint(index).unwrap().unwrap();
            assert_eq!(skin.joint_index(&joint), Some(index));
        }
        assert_eq!(skin.joint_index(&Joint::new("hip")), None);
        assert_eq!(skin.joint_by_id("knee"), Some(knee));
        assert_eq!(skin.joint_by_id("ankle"), None);
    }

    #[test]
    fn test_root_joint_must_be_member() {
        let hip = Joint::new("hip");
        let stranger = Joint::new("stranger");
        let mut skin = skin_with(&[&hip]);
        skin.set_root_joint(Some(&hip)).unwrap();

        assert_eq!(
            skin.set_root_joint(Some(&stranger)),
            Err(SkinError::RootJointNotMember)
        );
        assert_eq!(skin.root_joint(), Some(&hip));
        skin.set_root_joint(None).unwrap();
        assert!(skin.root_joint().is_none());
    }

    #[test]
    fn test_immediate_policy_recomputes_in_notification() {
        let config = SkinningConfig {
            palette_update: PaletteUpdate::Immediate,
            ..Default::default()
        };
        let joint = Joint::new("joint");
        let mut skin = MeshSkin::new(&config);
        skin.set_joint_count(1).unwrap();
        skin.set_joint(joint.clone(), 0).unwrap();
        assert_eq!(skin.dirty_joint_count(), 0);

        joint.node().set_translation(Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(skin.dirty_joint_count(), 0);
        assert_eq!(skin.matrix_palette()[2].w, 2.0);
    }

    #[test]
    fn test_joint_shared_between_skins() {
        let joint = Joint::new("shared");
        let first = skin_with(&[&joint]);
        let second = skin_with(&[&Joint::new("other"), &joint]);
        assert_eq!(joint.node().listener_count(), 2);

        joint.node().set_translation(Vec3::X);
        assert_eq!(first.matrix_palette()[0].w, 1.0);
        assert_eq!(second.matrix_palette()[3].w, 1.0);
        assert_eq!(second.matrix_palette()[0].w, 0.0);

        drop(first);
        assert_eq!(joint.node().listener_count(), 1);
    }

    #[test]
    fn test_same_joint_in_two_slots() {
        let joint = Joint::new("twice");
        let mut skin = skin_with(&[&joint, &joint]);
        let _ = skin.matrix_palette();
        assert_eq!(skin.dirty_joint_count(), 0);
        joint.node().set_translation(Vec3::Y);
        assert_eq!(skin.dirty_joint_count(), 2);

        skin.clear_joint(0).unwrap();
        assert_eq!(joint.node().listener_count(), 1);
        assert_eq!(skin.joint_index(&joint), Some(1));
    }

    #[test]
    fn test_earlier_read_does_not_block_refresh() {
        let joint = Joint::new("joint");
        let skin = skin_with(&[&joint]);
        let first = skin.matrix_palette();
        joint.node().set_translation(Vec3::new(5.0, 0.0, 0.0));
        let second = skin.matrix_palette();
        assert_eq!(first[0].w, 0.0);
        assert_eq!(second[0].w, 5.0);
        assert_eq!(skin.dirty_joint_count(), 0);
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let joint = Joint::new("joint");
        let skin = skin_with(&[&joint]);
        skin.transform_changed(joint.node(), ListenerToken(10));
        assert_eq!(skin.dirty_joint_count(), 0);
    }
}
