use std::{
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::asset::material::ParameterAsset;

pub const WORLD_MATRIX: &str = "u_worldMatrix";
pub const INVERSE_TRANSPOSE_WORLD_MATRIX: &str = "u_inverseTransposeWorldMatrix";
pub const MATRIX_PALETTE: &str = "u_matrixPalette";

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Vec4Array(Vec<Vec4>),
}

impl ParameterValue {
    pub fn as_mat4(&self) -> Option<Mat4> {
        match self {
            ParameterValue::Mat4(matrix) => Some(*matrix),
            _ => None,
        }
    }

    pub fn as_vec4_array(&self) -> Option<&[Vec4]> {
        match self {
            ParameterValue::Vec4Array(rows) => Some(rows),
            _ => None,
        }
    }
}

impl TryFrom<&ParameterAsset> for ParameterValue {
    type Error = usize;

    /// Fails with the number of floats when it matches no known shape.
    fn try_from(value: &ParameterAsset) -> Result<Self, Self::Error> {
        match value {
            ParameterAsset::Float(value) => Ok(ParameterValue::Float(*value)),
            ParameterAsset::Floats(values) => match values.len() {
                1 => Ok(ParameterValue::Float(values[0])),
                2 => Ok(ParameterValue::Vec2(Vec2::from_slice(values))),
                3 => Ok(ParameterValue::Vec3(Vec3::from_slice(values))),
                4 => Ok(ParameterValue::Vec4(Vec4::from_slice(values))),
                16 => Ok(ParameterValue::Mat4(Mat4::from_cols_slice(values))),
                len => Err(len),
            },
        }
    }
}

/// A parameter whose value is produced at bind time.
#[derive(Clone)]
pub struct ParameterBinding(Rc<dyn Fn() -> Option<ParameterValue>>);

impl ParameterBinding {
    pub fn new(func: impl Fn() -> Option<ParameterValue> + 'static) -> Self {
        Self(Rc::new(func))
    }

    /// `None` once the source the binding reads from is gone.
    pub fn evaluate(&self) -> Option<ParameterValue> {
        (self.0)()
    }
}

impl Debug for ParameterBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("ParameterBinding(..)")
    }
}

#[derive(Debug, Clone)]
pub enum MaterialParameter {
    Value(ParameterValue),
    Binding(ParameterBinding),
}

impl MaterialParameter {
    pub fn value(&self) -> Option<ParameterValue> {
        match self {
            MaterialParameter::Value(value) => Some(value.clone()),
            MaterialParameter::Binding(binding) => binding.evaluate(),
        }
    }

    pub fn is_binding(&self) -> bool {
        matches!(self, MaterialParameter::Binding(_))
    }
}
