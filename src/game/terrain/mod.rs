use std::path::Path;

use glam::Vec3;
use renderer::{BufferId, Renderer};

use crate::game::{
    config::{GraphicsQuality, TerrainConfig},
    height_field::{HeightField, HeightFieldError},
    render::{
        materials::{MaterialId, MissingMaterial},
        mesh::Mesh,
        pass::{RenderPassDescriptor, RenderPassFlags},
        provider::{ChunkCollector, RenderChunkProvider},
    },
    resources::SharedResources,
};

mod lod;
pub mod patch;
pub mod quad_tree;
pub mod vertex;

pub use lod::Lod;
use quad_tree::{LeafDrawParams, QuadTree, QuadTreeError};

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("Height field error: {0}")]
    HeightField(#[from] HeightFieldError),

    #[error("Quad tree error: {0}")]
    QuadTree(#[from] QuadTreeError),

    #[error(transparent)]
    MissingMaterial(#[from] MissingMaterial),
}

pub struct Terrain {
    height_field: HeightField,
    quad_tree: QuadTree,
    /// Vertices of every leaf, baked in world space.
    vertex_buffer: BufferId,
    material: MaterialId,
    debug_material: MaterialId,
    wire_cube: Mesh,
    /// Leaves closer than this use the detailed technique. `None` if the quality setting does
    /// not allow it.
    detail_technique_distance: Option<f32>,
}

impl Terrain {
    pub const MATERIAL: &str = "terrain";
    pub const DEBUG_MATERIAL: &str = "debug";

    /// Load a height map image, smooth it and build the terrain over it.
    pub fn load(
        path: impl AsRef<Path>,
        config: &TerrainConfig,
        quality: GraphicsQuality,
        resources: &mut SharedResources,
        renderer: &mut Renderer,
    ) -> Result<Self, TerrainError> {
        let mut height_field = HeightField::from_image(
            path,
            config.scale_factor as f32,
            config.elevation_strength,
        )?;
        height_field.smooth(config.smoothing_passes);

        Self::new(height_field, config, quality, resources, renderer)
    }

    pub fn new(
        height_field: HeightField,
        config: &TerrainConfig,
        quality: GraphicsQuality,
        resources: &mut SharedResources,
        renderer: &mut Renderer,
    ) -> Result<Self, TerrainError> {
        let material = resources.materials.require(Self::MATERIAL)?;
        let debug_material = resources.materials.require(Self::DEBUG_MATERIAL)?;

        let mut quad_tree = QuadTree::build(&height_field, config.min_leaf_size)?;
        let vertices = quad_tree.bake_vertices(&height_field);
        let vertex_buffer = renderer.create_vertex_buffer("terrain_vertices", &vertices);

        let mut terrain = Self {
            height_field,
            quad_tree,
            vertex_buffer,
            material,
            debug_material,
            wire_cube: resources.wire_cube,
            detail_technique_distance: quality
                .allows_detail_technique()
                .then_some(config.detail_technique_distance),
        };

        terrain.add_new_patch_lod(config.detail, resources, renderer);
        for &lod in quality.extra_lods() {
            terrain.add_new_patch_lod(lod, resources, renderer);
        }

        Ok(terrain)
    }

    /// Make `lod` available on every patch. Levels that were not added explicitly fall back to
    /// the nearest available level.
    pub fn add_new_patch_lod(
        &mut self,
        lod: Lod,
        resources: &mut SharedResources,
        renderer: &mut Renderer,
    ) {
        if self.quad_tree.has_explicit_lod(lod) {
            return;
        }

        let patch_lod =
            resources.terrain_index_buffer(renderer, self.quad_tree.leaf_width(), lod);
        self.quad_tree.add_patch_lod(lod, patch_lod);

        tracing::info!(
            "Added terrain LOD {lod} ({} triangles per patch).",
            patch_lod.primitive_count
        );
    }

    pub fn height_field(&self) -> &HeightField {
        &self.height_field
    }

    pub fn quad_tree(&self) -> &QuadTree {
        &self.quad_tree
    }

    /// Interpolated height at a world position, `None` outside the terrain.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.height_field.height_at(x, z)
    }

    pub fn normal_at(&self, x: f32, z: f32) -> Option<Vec3> {
        self.height_field.normal_at(x, z)
    }

    pub fn is_in_bounds(&self, x: f32, z: f32) -> bool {
        self.height_field.height_at(x, z).is_some()
    }
}

impl RenderChunkProvider for Terrain {
    fn query_render_chunks(&self, desc: &mut RenderPassDescriptor, chunks: &mut ChunkCollector) {
        // Terrain is opaque and never casts shadows.
        if !desc.wants(RenderPassFlags::TERRAIN) || !desc.accepts_geometry(false, false) {
            return;
        }

        let params = LeafDrawParams {
            vertex_buffer: self.vertex_buffer,
            material: self.material,
            technique: "Terrain",
            detailed: self
                .detail_technique_distance
                .map(|distance| (distance, "TerrainDetailed")),
            bounding_boxes: desc
                .render_bounding_boxes
                .then_some((&self.wire_cube, self.debug_material)),
        };

        self.quad_tree.query_render_chunks(
            &desc.frustum,
            desc.clip_plane.as_ref(),
            desc.lod,
            &params,
            chunks,
        );
    }
}
