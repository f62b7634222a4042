use std::{env, error::Error, f32::consts::FRAC_PI_8, path::PathBuf, process, rc::Rc};

use glam::{Mat4, Quat, Vec3};
use log::{error, info};
use renderer::{
    asset::{
        node::{DecomposedTransform, NodeAsset, NodeTransform},
        skin::SkinAsset,
    },
    config::SkinningConfig,
    renderer::{
        material::{parse_defines, Material, RenderState, ShaderProgram, ShaderSource},
        mesh::{Mesh, MeshPart, PrimitiveMode},
        model::PartIndex,
        node::transform::TransformNode,
        CommandRecorder, Renderer, DEPTH_TEXTURE_FORMAT,
    },
};

const CONFIG_ENV: &str = "SKINNING_CONFIG";
const FRAMES: usize = 8;

const VERTEX_SHADER: &str = "\
uniform mat4 u_worldMatrix;
uniform vec4 u_matrixPalette[SKINNING_JOINT_COUNT * 3];
void main() {}
";

const FRAGMENT_SHADER: &str = "void main() {}\n";

fn load_config() -> SkinningConfig {
    let Some(path) = env::var_os(CONFIG_ENV).map(PathBuf::from) else {
        return SkinningConfig::default();
    };
    match SkinningConfig::from_path(&path) {
        Ok(config) => {
            info!("Loaded skinning config from {}", path.display());
            config
        }
        Err(err) => {
            error!("Ignoring {}: {}", path.display(), err);
            SkinningConfig::default()
        }
    }
}

fn arm_skeleton() -> NodeAsset {
    let bone = |id: &str, length: f32| {
        NodeAsset::new(id).with_transform(NodeTransform::Decomposed(
            DecomposedTransform::from_translation(Vec3::new(length, 0.0, 0.0)),
        ))
    };
    bone("shoulder", 0.0).with_child(bone("elbow", 1.0).with_child(bone("wrist", 1.0)))
}

fn arm_skin() -> SkinAsset {
    let joint_ids = ["shoulder", "elbow", "wrist"];
    SkinAsset {
        joint_ids: joint_ids.iter().map(|id| id.to_string()).collect(),
        root_joint: Some("shoulder".to_string()),
        inverse_bind_matrices: (0..joint_ids.len())
            .map(|index| Mat4::from_translation(Vec3::new(-(index as f32), 0.0, 0.0)))
            .collect(),
        bind_shape: Mat4::IDENTITY,
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut renderer = Renderer::new(load_config());
    renderer
        .depth_stencil_targets_mut()
        .create("main", DEPTH_TEXTURE_FORMAT, 1280, 720);

    let mut loader = renderer.loader();
    loader.load_skeleton(&arm_skeleton());

    let mesh = Rc::new(Mesh::new(Some("arm".to_string())));
    mesh.add_part(MeshPart::new(PrimitiveMode::TriangleList, &[0, 1, 2, 2, 1, 3]));
    mesh.add_part(MeshPart::new(PrimitiveMode::LineStrip, &[0, 1, 3]));

    let node = TransformNode::new(Some("arm".to_string()));
    let mut model = loader.load_model(mesh, Some(&arm_skin()), Some(&node))?;

    let program = ShaderProgram::new(
        ShaderSource::new(None, VERTEX_SHADER),
        ShaderSource::new(None, FRAGMENT_SHADER),
        parse_defines("SKINNING\nSKINNING_JOINT_COUNT 3"),
    );
    let material = Material::new(
        Some("arm".to_string()),
        Rc::new(program),
        RenderState::default(),
    );
    model.set_material(Some(Rc::new(material)), PartIndex::Shared)?;

    let elbow = loader.joint("elbow").ok_or("elbow joint missing")?;
    let mut recorder = CommandRecorder::default();
    for frame in 0..FRAMES {
        elbow
            .node()
            .set_rotation(Quat::from_rotation_z(FRAC_PI_8 * frame as f32));
        node.set_translation(Vec3::new(0.0, 0.0, -(frame as f32) * 0.1));
        renderer.set_wireframe(frame % 4 == 3);

        recorder.clear();
        let drawn = renderer.render([&mut model], &mut recorder);
        info!(
            "Frame {}: {} parts, {} commands",
            frame,
            drawn,
            recorder.commands().len()
        );
    }

    if let Some(skin) = model.skin() {
        let palette = skin.matrix_palette();
        info!(
            "Final palette: {} rows, wrist row 0 = {}",
            palette.len(),
            palette[6]
        );
    }
    Ok(())
}

fn main() {
    env_logger::init();
    #[cfg(feature = "panics-log")]
    log_panics::init();

    if let Err(err) = run() {
        error!("{}", err);
        process::exit(1);
    }
}
