use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{info, warn};

use crate::asset::material::MaterialAsset;

use super::{parameter::ParameterValue, Material, RenderState, ShaderProgram, ShaderSource};

#[derive(Debug)]
pub enum MaterialLoadError {
    Io { path: PathBuf, source: io::Error },
    Descriptor(serde_json::Error),
    EmptyShaderSource(PathBuf),
}

impl Display for MaterialLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MaterialLoadError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            MaterialLoadError::Descriptor(error) => write!(f, "Bad material file: {}", error),
            MaterialLoadError::EmptyShaderSource(path) => {
                write!(f, "Shader {} is empty", path.display())
            }
        }
    }
}

impl Error for MaterialLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MaterialLoadError::Io { source, .. } => Some(source),
            MaterialLoadError::Descriptor(error) => Some(error),
            MaterialLoadError::EmptyShaderSource(_) => None,
        }
    }
}

impl From<serde_json::Error> for MaterialLoadError {
    fn from(value: serde_json::Error) -> Self {
        MaterialLoadError::Descriptor(value)
    }
}

/// Creates materials for models. Failures leave the caller's state alone.
pub trait MaterialLoader {
    fn from_shaders(
        &mut self,
        vertex_path: &Path,
        fragment_path: &Path,
        defines: &[String],
    ) -> Result<Rc<Material>, MaterialLoadError>;

    fn from_file(&mut self, path: &Path) -> Result<Rc<Material>, MaterialLoadError>;
}

/// Reads shaders and JSON material descriptors from disk.
#[derive(Debug, Default)]
pub struct FileMaterialLoader {
    base_path: Option<PathBuf>,
}

impl FileMaterialLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base_path.into()),
        }
    }

    fn resolve(base: Option<&Path>, path: &Path) -> PathBuf {
        match base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn read(path: &Path) -> Result<String, MaterialLoadError> {
        let source = fs::read_to_string(path).map_err(|source| MaterialLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if source.trim().is_empty() {
            return Err(MaterialLoadError::EmptyShaderSource(path.to_path_buf()));
        }
        Ok(source)
    }

    fn load_program(
        base: Option<&Path>,
        vertex_path: &Path,
        fragment_path: &Path,
        defines: &[String],
    ) -> Result<ShaderProgram, MaterialLoadError> {
        let vertex_path = Self::resolve(base, vertex_path);
        let fragment_path = Self::resolve(base, fragment_path);
        let vertex = Self::read(&vertex_path)?;
        let fragment = Self::read(&fragment_path)?;
        Ok(ShaderProgram::new(
            ShaderSource::new(Some(vertex_path), vertex),
            ShaderSource::new(Some(fragment_path), fragment),
            defines.to_vec(),
        ))
    }
}

impl MaterialLoader for FileMaterialLoader {
    fn from_shaders(
        &mut self,
        vertex_path: &Path,
        fragment_path: &Path,
        defines: &[String],
    ) -> Result<Rc<Material>, MaterialLoadError> {
        let program =
            Self::load_program(self.base_path.as_deref(), vertex_path, fragment_path, defines)?;
        Ok(Rc::new(Material::new(
            None,
            Rc::new(program),
            RenderState::default(),
        )))
    }

    fn from_file(&mut self, path: &Path) -> Result<Rc<Material>, MaterialLoadError> {
        let path = Self::resolve(self.base_path.as_deref(), path);
        let descriptor = fs::read_to_string(&path).map_err(|source| MaterialLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let asset: MaterialAsset = serde_json::from_str(&descriptor)?;

        // Shader paths in a descriptor are relative to the descriptor itself
        let program = Self::load_program(
            path.parent(),
            &asset.vertex_shader,
            &asset.fragment_shader,
            &asset.defines,
        )?;
        let material = Material::new(asset.name, Rc::new(program), asset.state.into());
        for (name, value) in &asset.parameters {
            match ParameterValue::try_from(value) {
                Ok(value) => material.set_parameter(name.clone(), value),
                Err(len) => warn!(
                    "Parameter {} in {} has {} floats, ignored",
                    name,
                    path.display(),
                    len
                ),
            }
        }
        info!("Loaded material from {}", path.display());
        Ok(Rc::new(material))
    }
}

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use glam::Vec4;

    use super::{FileMaterialLoader, MaterialLoadError, MaterialLoader};
    use crate::{
        asset::material::MaterialAlphaMode, renderer::material::parameter::ParameterValue,
    };

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "skinned-renderer-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("shaders")).unwrap();
        fs::write(dir.join("shaders/skin.vert"), "void main() {}").unwrap();
        fs::write(dir.join("shaders/color.frag"), "void main() {}").unwrap();
        fs::write(dir.join("shaders/empty.frag"), "  \n").unwrap();
        dir
    }

    #[test]
    fn test_from_shaders() {
        let dir = test_dir("from-shaders");
        let mut loader = FileMaterialLoader::new(&dir);
        let defines = vec!["SKINNING".to_string()];
        let material = loader
            .from_shaders(
                "shaders/skin.vert".as_ref(),
                "shaders/color.frag".as_ref(),
                &defines,
            )
            .unwrap();
        assert_eq!(material.program().defines(), &defines[..]);
        assert_eq!(
            material.program().vertex().path.as_deref(),
            Some(dir.join("shaders/skin.vert").as_path())
        );
    }

    #[test]
    fn test_from_shaders_errors() {
        let dir = test_dir("shader-errors");
        let mut loader = FileMaterialLoader::new(&dir);
        let missing = loader.from_shaders("shaders/nope.vert".as_ref(), "shaders/color.frag".as_ref(), &[]);
        assert!(matches!(missing, Err(MaterialLoadError::Io { .. })));
        let empty = loader.from_shaders("shaders/skin.vert".as_ref(), "shaders/empty.frag".as_ref(), &[]);
        assert!(matches!(empty, Err(MaterialLoadError::EmptyShaderSource(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = test_dir("from-file");
        fs::write(
            dir.join("shaders/body.material"),
            r#"{
                "name": "body",
                "vertex_shader": "skin.vert",
                "fragment_shader": "color.frag",
                "defines": ["SKINNING"],
                "state": { "alpha_mode": "blend", "cull_face": false },
                "parameters": { "u_diffuseColor": [1.0, 0.5, 0.25, 1.0], "u_bad": [1.0, 2.0, 3.0, 4.0, 5.0] }
            }"#,
        )
        .unwrap();
        let mut loader = FileMaterialLoader::default();
        let material = loader.from_file(&dir.join("shaders/body.material")).unwrap();
        assert_eq!(material.name(), Some("body"));
        assert_eq!(material.state().alpha_mode, MaterialAlphaMode::Blend);
        assert!(!material.state().cull_face);
        assert!(material.state().depth_test);
        assert_eq!(
            material.parameter("u_diffuseColor"),
            Some(ParameterValue::Vec4(Vec4::new(1.0, 0.5, 0.25, 1.0)))
        );
        assert!(!material.has_parameter("u_bad"));

        fs::write(dir.join("broken.material"), "{ not json").unwrap();
        assert!(matches!(
            loader.from_file(&dir.join("broken.material")),
            Err(MaterialLoadError::Descriptor(_))
        ));
    }
}
