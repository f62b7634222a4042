use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
    rc::Rc,
};

use log::{debug, warn};

use crate::{
    asset::{
        node::{DecomposedTransform, NodeAsset},
        skin::SkinAsset,
    },
    config::SkinningConfig,
};

use super::{
    mesh::Mesh,
    model::Model,
    node::{joint::Joint, transform::TransformNode},
    skin::{MeshSkin, SkinError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    MissingJoint(String),
    InverseBindCount { expected: usize, actual: usize },
    Skin(SkinError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::MissingJoint(id) => write!(f, "Joint {} is not loaded", id),
            LoadError::InverseBindCount { expected, actual } => write!(
                f,
                "Skin has {} joints but {} inverse bind matrices",
                expected, actual
            ),
            LoadError::Skin(error) => write!(f, "Invalid skin: {}", error),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Skin(error) => Some(error),
            _ => None,
        }
    }
}

impl From<SkinError> for LoadError {
    fn from(value: SkinError) -> Self {
        LoadError::Skin(value)
    }
}

/// Turns skeleton and skin assets into runtime joints and skins.
///
/// Joints are registered by asset id, skins reference them by that id.
#[derive(Debug)]
pub struct RendererAssetLoader {
    config: SkinningConfig,
    joints: HashMap<String, Joint>,
}

impl RendererAssetLoader {
    pub fn new(config: SkinningConfig) -> Self {
        Self {
            config,
            joints: HashMap::new(),
        }
    }

    /// Returns the joint previously registered under the same id.
    pub fn register_joint(&mut self, joint: Joint) -> Option<Joint> {
        let previous = self.joints.insert(joint.id().to_string(), joint);
        if let Some(previous) = &previous {
            warn!("Joint {} registered twice, keeping the newer one", previous.id());
        }
        previous
    }

    pub fn joint(&self, id: &str) -> Option<Joint> {
        self.joints.get(id).cloned()
    }

    /// Loads a node tree as joints, registering every node. Returns the root.
    pub fn load_skeleton(&mut self, node: &NodeAsset) -> Joint {
        let transform = node
            .transform
            .clone()
            .map(DecomposedTransform::from)
            .unwrap_or_default();
        let joint = Joint::with_transform(node.id.clone(), transform);
        for child in &node.children {
            let child = self.load_skeleton(child);
            joint.add_child(&child);
        }
        self.register_joint(joint.clone());
        joint
    }

    fn resolve_joint(&self, id: &str) -> Result<Joint, LoadError> {
        self.joint(id)
            .ok_or_else(|| LoadError::MissingJoint(id.to_string()))
    }

    pub fn load_skin(&self, skin: &SkinAsset) -> Result<MeshSkin, LoadError> {
        let joint_count = skin.joint_ids.len();
        let inverse_count = skin.inverse_bind_matrices.len();
        if inverse_count != 0 && inverse_count != joint_count {
            return Err(LoadError::InverseBindCount {
                expected: joint_count,
                actual: inverse_count,
            });
        }
        let joints = skin
            .joint_ids
            .iter()
            .map(|id| self.resolve_joint(id))
            .collect::<Result<Vec<_>, _>>()?;
        let root_joint = skin
            .root_joint
            .as_deref()
            .map(|id| self.resolve_joint(id))
            .transpose()?;
        // Checked before any shared joint is touched
        if let Some(root) = &root_joint {
            if !joints.contains(root) {
                return Err(SkinError::RootJointNotMember.into());
            }
        }
        if joint_count > self.config.max_joints {
            return Err(SkinError::JointCountExceeded {
                count: joint_count,
                max: self.config.max_joints,
            }
            .into());
        }

        let mut mesh_skin = MeshSkin::new(&self.config);
        mesh_skin.set_bind_shape(skin.bind_shape);
        mesh_skin.set_joint_count(joint_count)?;
        for (index, joint) in joints.into_iter().enumerate() {
            if let Some(matrix) = skin.inverse_bind_matrices.get(index) {
                joint.set_inverse_bind_matrix(*matrix);
            }
            mesh_skin.set_joint(joint, index)?;
        }
        mesh_skin.set_root_joint(root_joint.as_ref())?;
        debug!("Loaded skin with {} joints", joint_count);
        Ok(mesh_skin)
    }

    pub fn load_model(
        &self,
        mesh: Rc<Mesh>,
        skin: Option<&SkinAsset>,
        node: Option<&TransformNode>,
    ) -> Result<Model, LoadError> {
        let skin = skin.map(|skin| self.load_skin(skin)).transpose()?;
        let mut model = Model::new(mesh);
        model.set_node(node);
        if skin.is_some() {
            model.set_skin(skin);
        }
        Ok(model)
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use glam::{Mat4, Vec3};

    use super::{LoadError, RendererAssetLoader};
    use crate::{
        asset::{
            node::{DecomposedTransform, NodeAsset, NodeTransform},
            skin::SkinAsset,
        },
        config::SkinningConfig,
        renderer::{mesh::Mesh, skin::SkinError},
    };

    fn skeleton() -> NodeAsset {
        NodeAsset::new("hip")
            .with_transform(NodeTransform::Decomposed(
                DecomposedTransform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            ))
            .with_child(
                NodeAsset::new("knee").with_transform(NodeTransform::Decomposed(
                    DecomposedTransform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
                )),
            )
    }

    fn loader() -> RendererAssetLoader {
        let mut loader = RendererAssetLoader::new(SkinningConfig::default());
        loader.load_skeleton(&skeleton());
        loader
    }

    #[test]
    fn test_load_skeleton() {
        let loader = loader();
        let knee = loader.joint("knee").unwrap();
        assert!(knee
            .world_matrix()
            .abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)), 1e-6));
        assert_eq!(
            knee.node().parent(),
            loader.joint("hip").map(|hip| hip.node().clone())
        );
    }

    #[test]
    fn test_load_skin() {
        let loader = loader();
        let asset = SkinAsset {
            joint_ids: vec!["hip".to_string(), "knee".to_string()],
            root_joint: Some("hip".to_string()),
            inverse_bind_matrices: vec![
                Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
                Mat4::from_translation(Vec3::new(0.0, -0.5, 0.0)),
            ],
            bind_shape: Mat4::IDENTITY,
        };
        let skin = loader.load_skin(&asset).unwrap();
        assert_eq!(skin.joint_count(), 2);
        assert_eq!(skin.root_joint(), loader.joint("hip").as_ref());
        assert_eq!(skin.joint_by_id("knee"), loader.joint("knee"));

        // Bind pose: every joint matrix is identity
        let palette = skin.matrix_palette();
        for (index, row) in palette.iter().enumerate() {
            let expected = Mat4::IDENTITY.row(index % 3);
            assert!(row.abs_diff_eq(expected, 1e-6));
        }
    }

    #[test]
    fn test_load_skin_errors() {
        let loader = loader();
        let missing = SkinAsset {
            joint_ids: vec!["hip".to_string(), "ankle".to_string()],
            ..Default::default()
        };
        assert_eq!(
            loader.load_skin(&missing).unwrap_err(),
            LoadError::MissingJoint("ankle".to_string())
        );

        let counts = SkinAsset {
            joint_ids: vec!["hip".to_string()],
            inverse_bind_matrices: vec![Mat4::IDENTITY; 2],
            ..Default::default()
        };
        assert_eq!(
            loader.load_skin(&counts).unwrap_err(),
            LoadError::InverseBindCount {
                expected: 1,
                actual: 2
            }
        );

        let outside_root = SkinAsset {
            joint_ids: vec!["knee".to_string()],
            root_joint: Some("hip".to_string()),
            inverse_bind_matrices: vec![Mat4::from_translation(Vec3::splat(9.0))],
            ..Default::default()
        };
        assert_eq!(
            loader.load_skin(&outside_root).unwrap_err(),
            LoadError::Skin(SkinError::RootJointNotMember)
        );
        // The failed skins left the shared joints as they were
        let knee = loader.joint("knee").unwrap();
        assert_eq!(knee.node().listener_count(), 0);
        assert_eq!(knee.inverse_bind_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_load_model() {
        let loader = loader();
        let asset = SkinAsset {
            joint_ids: vec!["hip".to_string()],
            ..Default::default()
        };
        let model = loader
            .load_model(Rc::new(Mesh::new(None)), Some(&asset), None)
            .unwrap();
        let skin = model.skin().unwrap();
        assert_eq!(skin.model(), Some(model.id()));
        assert_eq!(skin.matrix_palette_size(), 3);

        let plain = loader.load_model(Rc::new(Mesh::new(None)), None, None).unwrap();
        assert!(plain.skin().is_none());
    }
}
