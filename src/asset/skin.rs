use glam::Mat4;

#[derive(Debug, Clone)]
pub struct SkinAsset {
    pub joint_ids: Vec<String>,
    pub root_joint: Option<String>,
    /// Either empty or one matrix per joint id.
    pub inverse_bind_matrices: Vec<Mat4>,
    pub bind_shape: Mat4,
}

impl Default for SkinAsset {
    fn default() -> Self {
        Self {
            joint_ids: Vec::new(),
            root_joint: None,
            inverse_bind_matrices: Vec::new(),
            bind_shape: Mat4::IDENTITY,
        }
    }
}
