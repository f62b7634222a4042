use glam::{Mat3, Mat4};

/// Inverse transpose of the world matrix, widened back to 4x4 with no
/// translation.
pub fn normal_matrix(world: &Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(world.inverse().transpose()))
}
