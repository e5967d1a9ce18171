use glam::{Mat4, Vec3, Vec4};
use renderer::{BufferId, PrimitiveTopology};

use crate::{
    engine::pool::{Pool, PoolHandle, Poolable},
    game::render::materials::MaterialId,
};

/// Coarse draw ordering inside a pass. Chunks in the same bucket keep their insertion order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
pub enum RenderOrder {
    RenderFirst,
    #[default]
    RenderNormal,
    RenderLast,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryChunk {
    pub vertex_buffer: Option<BufferId>,
    pub index_buffer: Option<BufferId>,
    pub base_vertex: u32,
    pub vertex_count: u32,
    pub start_index: u32,
    pub primitive_count: u32,
    pub topology: PrimitiveTopology,
    pub world: Mat4,
    pub material: Option<MaterialId>,
    pub technique: String,
    pub render_order: RenderOrder,
    pub casts_shadows: bool,
    pub receives_shadows: bool,
    pub transparent: bool,
}

impl Poolable for GeometryChunk {
    fn reset(&mut self) {
        let mut technique = std::mem::take(&mut self.technique);
        technique.clear();
        *self = Self {
            technique,
            ..Self::default()
        };
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LightKind {
    #[default]
    Directional,
    Point,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LightChunk {
    pub kind: LightKind,
    pub position: Vec3,
    /// Direction the light travels in. Only used by directional lights.
    pub direction: Vec3,
    pub color: Vec3,
    pub range: f32,
    pub casts_shadows: bool,
}

impl Poolable for LightChunk {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleChunk {
    pub vertex_buffer: Option<BufferId>,
    pub index_buffer: Option<BufferId>,
    pub primitive_count: u32,
    pub instance_positions: Vec<Vec3>,
    pub size: f32,
    pub color: Vec4,
    pub material: Option<MaterialId>,
    pub technique: String,
}

impl Poolable for ParticleChunk {
    fn reset(&mut self) {
        let mut instance_positions = std::mem::take(&mut self.instance_positions);
        instance_positions.clear();
        let mut technique = std::mem::take(&mut self.technique);
        technique.clear();
        *self = Self {
            instance_positions,
            technique,
            ..Self::default()
        };
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaterChunk {
    pub vertex_buffer: Option<BufferId>,
    pub index_buffer: Option<BufferId>,
    pub primitive_count: u32,
    pub elevation: f32,
    pub world: Mat4,
    pub material: Option<MaterialId>,
    pub technique: String,
}

impl Poolable for WaterChunk {
    fn reset(&mut self) {
        let mut technique = std::mem::take(&mut self.technique);
        technique.clear();
        *self = Self {
            technique,
            ..Self::default()
        };
    }
}

/// Backing storage for every chunk handed out during a frame.
pub struct ChunkPools {
    pub geometry: Pool<GeometryChunk>,
    pub lights: Pool<LightChunk>,
    pub particles: Pool<ParticleChunk>,
    pub water: Pool<WaterChunk>,
}

impl Default for ChunkPools {
    fn default() -> Self {
        Self {
            geometry: Pool::with_prewarm("geometry", Self::PREWARM_COUNT),
            lights: Pool::with_prewarm("light", Self::PREWARM_COUNT),
            particles: Pool::with_prewarm("particle", Self::PREWARM_COUNT),
            water: Pool::with_prewarm("water", Self::PREWARM_COUNT),
        }
    }
}

impl ChunkPools {
    /// Items created up front in each pool.
    pub const PREWARM_COUNT: usize = 10;

    pub fn recycle_all(&mut self) {
        self.geometry.recycle_all();
        self.lights.recycle_all();
        self.particles.recycle_all();
        self.water.recycle_all();
    }

    pub fn active_count(&self) -> usize {
        self.geometry.active_count()
            + self.lights.active_count()
            + self.particles.active_count()
            + self.water.active_count()
    }

    /// Items owned across all pools, active or free.
    pub fn capacity(&self) -> usize {
        self.geometry.capacity()
            + self.lights.capacity()
            + self.particles.capacity()
            + self.water.capacity()
    }
}

/// Chunks gathered for a single pass, in the order the providers emitted them.
#[derive(Debug, Default)]
pub struct RenderChunkList {
    pub geometry: Vec<PoolHandle<GeometryChunk>>,
    pub lights: Vec<PoolHandle<LightChunk>>,
    pub particles: Vec<PoolHandle<ParticleChunk>>,
    pub water: Vec<PoolHandle<WaterChunk>>,
}

impl RenderChunkList {
    pub fn clear(&mut self) {
        self.geometry.clear();
        self.lights.clear();
        self.particles.clear();
        self.water.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
            && self.lights.is_empty()
            && self.particles.is_empty()
            && self.water.is_empty()
    }

    pub fn len(&self) -> usize {
        self.geometry.len() + self.lights.len() + self.particles.len() + self.water.len()
    }
}
