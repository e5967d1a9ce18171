pub mod chunks;
pub mod frame_renderer;
pub mod materials;
pub mod mesh;
pub mod pass;
pub mod provider;
pub mod shadows;
pub mod variables;
