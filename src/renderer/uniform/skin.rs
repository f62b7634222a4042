use bytemuck::cast_slice;
use glam::{Mat4, Vec4};

pub const MAX_JOINTS: usize = 1024;

/// Each joint contributes the top three rows of its 4x4 matrix; the fourth
/// row of an affine transform is always (0, 0, 0, 1).
pub const ROWS_PER_JOINT: usize = 3;

fn identity_rows() -> [Vec4; ROWS_PER_JOINT] {
    palette_rows(&Mat4::IDENTITY)
}

pub fn palette_rows(matrix: &Mat4) -> [Vec4; ROWS_PER_JOINT] {
    [matrix.row(0), matrix.row(1), matrix.row(2)]
}

/// Rebuilds the 4x4 matrix stored in three palette rows.
pub fn matrix_from_rows(rows: &[Vec4]) -> Mat4 {
    Mat4::from_cols(rows[0], rows[1], rows[2], Vec4::W).transpose()
}

/// Contiguous row buffer uploaded to the skinning vertex stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixPalette {
    rows: Vec<Vec4>,
}

impl MatrixPalette {
    pub fn new(joint_count: usize) -> Self {
        let mut palette = Self::default();
        palette.resize(joint_count);
        palette
    }

    /// Reallocates for `joint_count` joints, every joint reset to identity.
    pub fn resize(&mut self, joint_count: usize) {
        self.rows = identity_rows()
            .into_iter()
            .cycle()
            .take(joint_count * ROWS_PER_JOINT)
            .collect();
    }

    pub fn joint_count(&self) -> usize {
        self.rows.len() / ROWS_PER_JOINT
    }

    pub fn write_joint(&mut self, index: usize, matrix: &Mat4) {
        let start = index * ROWS_PER_JOINT;
        self.rows[start..start + ROWS_PER_JOINT].copy_from_slice(&palette_rows(matrix));
    }

    pub fn joint_rows(&self, index: usize) -> &[Vec4] {
        let start = index * ROWS_PER_JOINT;
        &self.rows[start..start + ROWS_PER_JOINT]
    }

    pub fn rows(&self) -> &[Vec4] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.rows)
    }
}
