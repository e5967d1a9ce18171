use crate::game::render::{
    chunks::{ChunkPools, GeometryChunk, LightChunk, ParticleChunk, RenderChunkList, WaterChunk},
    pass::RenderPassDescriptor,
};

/// Anything that contributes chunks to a pass.
///
/// Providers append the chunks relevant to the described pass and may flag conditions they
/// detect on the descriptor (e.g. the camera being underwater).
pub trait RenderChunkProvider {
    fn query_render_chunks(&self, desc: &mut RenderPassDescriptor, chunks: &mut ChunkCollector);
}

/// Allocates chunks from the pools and records them in the list for the current pass.
pub struct ChunkCollector<'a> {
    pools: &'a mut ChunkPools,
    list: &'a mut RenderChunkList,
}

impl<'a> ChunkCollector<'a> {
    pub fn new(pools: &'a mut ChunkPools, list: &'a mut RenderChunkList) -> Self {
        Self { pools, list }
    }

    pub fn geometry(&mut self) -> &mut GeometryChunk {
        let (handle, chunk) = self.pools.geometry.allocate_mut();
        self.list.geometry.push(handle);
        chunk
    }

    pub fn light(&mut self) -> &mut LightChunk {
        let (handle, chunk) = self.pools.lights.allocate_mut();
        self.list.lights.push(handle);
        chunk
    }

    pub fn particles(&mut self) -> &mut ParticleChunk {
        let (handle, chunk) = self.pools.particles.allocate_mut();
        self.list.particles.push(handle);
        chunk
    }

    pub fn water(&mut self) -> &mut WaterChunk {
        let (handle, chunk) = self.pools.water.allocate_mut();
        self.list.water.push(handle);
        chunk
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
