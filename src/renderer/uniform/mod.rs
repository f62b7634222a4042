pub mod skin;
pub mod transform;
