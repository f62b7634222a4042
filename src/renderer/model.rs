use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    path::Path,
    rc::Rc,
};

use log::{debug, warn};

use super::{
    material::{
        loader::{MaterialLoadError, MaterialLoader},
        parameter::{
            ParameterBinding, ParameterValue, INVERSE_TRANSPOSE_WORLD_MATRIX, MATRIX_PALETTE,
            WORLD_MATRIX,
        },
        parse_defines, Material,
    },
    mesh::Mesh,
    node::{
        new_node_id,
        transform::{TransformNode, WeakTransformNode},
    },
    skin::MeshSkin,
    uniform::transform::normal_matrix,
    PolygonMode, RenderEncoder,
};

/// Non-owning reference from a skin back to the model it deforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartIndex {
    Shared,
    Part(usize),
}

impl From<usize> for PartIndex {
    fn from(value: usize) -> Self {
        PartIndex::Part(value)
    }
}

#[derive(Debug)]
pub enum ModelError {
    PartIndexOutOfRange { index: usize, count: usize },
    Material(MaterialLoadError),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::PartIndexOutOfRange { index, count } => {
                write!(f, "Part index {} out of range, mesh has {} parts", index, count)
            }
            ModelError::Material(error) => write!(f, "Failed to create material: {}", error),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelError::Material(error) => Some(error),
            ModelError::PartIndexOutOfRange { .. } => None,
        }
    }
}

impl From<MaterialLoadError> for ModelError {
    fn from(value: MaterialLoadError) -> Self {
        ModelError::Material(value)
    }
}

/// A drawable instance of a mesh.
///
/// Each part draws with its own material when one is set, otherwise with the
/// shared material. Materials held by the model get the node's world matrices
/// and, for skinned models, the matrix palette bound as parameters.
#[derive(Debug)]
pub struct Model {
    id: ModelId,
    mesh: Rc<Mesh>,
    shared_material: Option<Rc<Material>>,
    part_materials: Vec<Option<Rc<Material>>>,
    skin: Option<MeshSkin>,
    node: Option<WeakTransformNode>,
}

impl Model {
    pub fn new(mesh: Rc<Mesh>) -> Self {
        let part_count = mesh.part_count();
        Self {
            id: ModelId(new_node_id()),
            mesh,
            shared_material: None,
            part_materials: vec![None; part_count],
            skin: None,
            node: None,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    pub fn mesh_part_count(&self) -> usize {
        self.mesh.part_count()
    }

    fn check_part(&self, part: PartIndex) -> Result<(), ModelError> {
        match part {
            PartIndex::Part(index) if index >= self.mesh.part_count() => {
                Err(ModelError::PartIndexOutOfRange {
                    index,
                    count: self.mesh.part_count(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Material used to draw `part`, falling back to the shared material.
    pub fn material(&self, part: PartIndex) -> Result<Option<Rc<Material>>, ModelError> {
        self.check_part(part)?;
        let material = match part {
            PartIndex::Shared => None,
            PartIndex::Part(index) => self.part_materials.get(index).cloned().flatten(),
        };
        Ok(material.or_else(|| self.shared_material.clone()))
    }

    /// Stores `material` for `part`, dropping the model's hold on the previous
    /// one. `None` clears the slot.
    pub fn set_material(
        &mut self,
        material: Option<Rc<Material>>,
        part: PartIndex,
    ) -> Result<(), ModelError> {
        self.check_part(part)?;
        self.validate_part_count();
        if let Some(material) = &material {
            self.bind_node_parameters(material);
        }
        let slot = match part {
            PartIndex::Shared => &mut self.shared_material,
            PartIndex::Part(index) => &mut self.part_materials[index],
        };
        *slot = material;
        Ok(())
    }

    /// Builds a material from a shader pair and sets it for `part`. The model
    /// is left untouched when loading fails.
    pub fn set_material_from_shaders(
        &mut self,
        loader: &mut dyn MaterialLoader,
        vertex_path: &Path,
        fragment_path: &Path,
        defines: &str,
        part: PartIndex,
    ) -> Result<Rc<Material>, ModelError> {
        self.check_part(part)?;
        let material = loader.from_shaders(vertex_path, fragment_path, &parse_defines(defines))?;
        self.set_material(Some(material.clone()), part)?;
        Ok(material)
    }

    pub fn set_material_from_file(
        &mut self,
        loader: &mut dyn MaterialLoader,
        path: &Path,
        part: PartIndex,
    ) -> Result<Rc<Material>, ModelError> {
        self.check_part(part)?;
        let material = loader.from_file(path)?;
        self.set_material(Some(material.clone()), part)?;
        Ok(material)
    }

    pub fn skin(&self) -> Option<&MeshSkin> {
        self.skin.as_ref()
    }

    pub fn skin_mut(&mut self) -> Option<&mut MeshSkin> {
        self.skin.as_mut()
    }

    pub(crate) fn set_skin(&mut self, skin: Option<MeshSkin>) {
        if let Some(mut previous) = self.skin.take() {
            previous.set_model(None);
        }
        self.skin = skin.map(|mut skin| {
            skin.set_model(Some(self.id));
            skin
        });
        self.rebind_materials();
    }

    pub fn node(&self) -> Option<TransformNode> {
        self.node.as_ref().and_then(WeakTransformNode::upgrade)
    }

    /// Attaches the model to `node` and rebinds the node parameters of every
    /// material it holds.
    pub fn set_node(&mut self, node: Option<&TransformNode>) {
        self.node = node.map(TransformNode::downgrade);
        self.rebind_materials();
    }

    /// Grows or shrinks the part table to the mesh's current part count,
    /// keeping the slots both sizes have in common.
    pub fn validate_part_count(&mut self) {
        let part_count = self.mesh.part_count();
        if self.part_materials.len() != part_count {
            debug!(
                "Model #{} part table resized from {} to {}",
                self.id.0,
                self.part_materials.len(),
                part_count
            );
            self.part_materials.resize(part_count, None);
        }
    }

    fn materials(&self) -> impl Iterator<Item = &Rc<Material>> {
        self.shared_material
            .iter()
            .chain(self.part_materials.iter().flatten())
    }

    fn rebind_materials(&self) {
        for material in self.materials() {
            self.bind_node_parameters(material);
        }
    }

    // Only the node-bound parameters are replaced, a material shared with
    // another model keeps its other parameters.
    fn bind_node_parameters(&self, material: &Material) {
        if let Some(node) = &self.node {
            let world = node.clone();
            material.bind_parameter(
                WORLD_MATRIX,
                ParameterBinding::new(move || {
                    Some(ParameterValue::Mat4(world.upgrade()?.world_matrix()))
                }),
            );
            let normal = node.clone();
            material.bind_parameter(
                INVERSE_TRANSPOSE_WORLD_MATRIX,
                ParameterBinding::new(move || {
                    let world = normal.upgrade()?.world_matrix();
                    Some(ParameterValue::Mat4(normal_matrix(&world)))
                }),
            );
        }
        if let Some(skin) = &self.skin {
            let palette = skin.palette_source();
            material.bind_parameter(
                MATRIX_PALETTE,
                ParameterBinding::new(move || palette.rows().map(ParameterValue::Vec4Array)),
            );
        }
    }

    /// Issues one indexed draw per part that resolves to a material. Returns
    /// the number of parts drawn.
    pub fn draw(&mut self, encoder: &mut dyn RenderEncoder, wireframe: bool) -> usize {
        self.validate_part_count();
        let polygon_mode = if wireframe {
            PolygonMode::Line
        } else {
            PolygonMode::Fill
        };
        let mut drawn = 0;
        for (index, material) in self.part_materials.iter().enumerate() {
            let Some(part) = self.mesh.part(index) else {
                continue;
            };
            let Some(material) = material.as_ref().or(self.shared_material.as_ref()) else {
                warn!(
                    "Part {} of model #{} has no material, skipped",
                    index, self.id.0
                );
                continue;
            };
            material.bind(encoder);
            encoder.draw_indexed(&part, polygon_mode);
            drawn += 1;
        }
        drawn
    }
}
