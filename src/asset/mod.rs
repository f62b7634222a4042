pub mod material;
pub mod node;
pub mod skin;
