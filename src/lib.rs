pub mod asset;
pub mod config;
pub mod renderer;
