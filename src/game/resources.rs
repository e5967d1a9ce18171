use ahash::HashMap;
use glam::Vec4;
use renderer::Renderer;

use crate::game::{
    render::{materials::MaterialLibrary, mesh::Mesh},
    terrain::{
        Lod,
        patch::{PatchLod, generate_indices},
    },
};

/// Resources shared between every component in a scene. Created once and passed to whatever
/// needs them during construction.
pub struct SharedResources {
    pub materials: MaterialLibrary,
    /// Unit cube, used by props and the sky.
    pub cube: Mesh,
    /// Unit quad in the XZ plane, used by water, particles and overlays.
    pub quad: Mesh,
    /// Unit cube edges, used to visualize bounding boxes.
    pub wire_cube: Mesh,
    /// Terrain index buffers keyed by patch width and LOD. All patches of the same width share
    /// their index buffers.
    terrain_index_buffers: HashMap<(u32, Lod), PatchLod>,
}

impl SharedResources {
    pub fn new(renderer: &mut Renderer) -> Self {
        Self::with_materials(renderer, MaterialLibrary::with_builtin())
    }

    pub fn with_materials(renderer: &mut Renderer, materials: MaterialLibrary) -> Self {
        Self {
            materials,
            cube: Mesh::cube(renderer, "cube"),
            quad: Mesh::quad(renderer, "quad"),
            wire_cube: Mesh::wire_cube(renderer, "wire_cube", Vec4::new(1.0, 1.0, 0.0, 1.0)),
            terrain_index_buffers: HashMap::default(),
        }
    }

    /// Index buffer for a terrain patch `width` vertices wide at `lod`, created on first use.
    pub fn terrain_index_buffer(
        &mut self,
        renderer: &mut Renderer,
        width: u32,
        lod: Lod,
    ) -> PatchLod {
        *self
            .terrain_index_buffers
            .entry((width, lod))
            .or_insert_with(|| {
                let indices = generate_indices(width, lod);
                let label = format!("terrain_indices_{width}_{lod}");
                PatchLod {
                    index_buffer: renderer.create_index_buffer(&label, &indices),
                    primitive_count: indices.len() as u32 / 3,
                }
            })
    }
}
