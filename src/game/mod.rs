pub mod camera;
pub mod config;
pub mod height_field;
pub mod math;
pub mod render;
pub mod resources;
pub mod scene;
pub mod terrain;
