use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3, Vec4};
use renderer::{
    BufferId, ClearValue, DrawCall, Frame, FrameStats, PassEncoder, PrimitiveTopology,
    RenderTarget, RenderTargetDescriptor, RenderTargetId, Renderer, TextureFormat,
};
use strum::IntoEnumIterator;

use crate::game::{
    camera::Camera,
    config::GraphicsConfig,
    render::{
        chunks::{ChunkPools, GeometryChunk, LightChunk, LightKind, RenderChunkList, RenderOrder},
        materials::{MaterialId, MaterialLibrary, MissingMaterial},
        mesh::{DebugVertex, Mesh},
        pass::{RenderPassDescriptor, RenderPassFlags, RenderPassType},
        provider::ChunkCollector,
        shadows::ShadowMap,
        variables::{
            FloatVariable, MatrixVariable, ShaderVariables, TextureVariable, VectorVariable,
        },
    },
    scene::{Scene, water::WaterPlanes},
    terrain::Lod,
};

/// Technique suffix used while the camera is below a water surface.
const UNDERWATER_VARIANT: &str = "CameraUnderwater";
/// Fraction of the sun's color used as ambient light.
const AMBIENT_FACTOR: f32 = 0.3;

/// The steps of a frame, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum FrameStage {
    PrepareFrame,
    ProcessLighting,
    ProcessFog,
    ProcessShadowMap,
    CreateWaterTextures,
    ProcessGeometryChunks,
    ProcessWaterChunks,
    ProcessParticleChunks,
    ProcessTransparentGeometryChunks,
    DrawOverlays,
    DrawPhysicsDebug,
    DrawGUI,
    ClearChunks,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("The scene has no active camera")]
    NoActiveCamera,

    #[error(transparent)]
    MissingMaterial(#[from] MissingMaterial),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub stats: FrameStats,
    /// Chunks gathered over all passes.
    pub chunks: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameReport {
    /// The scene is exiting, nothing was drawn.
    Skipped,
    Rendered(FrameSummary),
}

/// Values that only live for a single frame.
struct FrameState {
    camera: Camera,
    sun: Option<LightChunk>,
    camera_underwater: bool,
    shadow_map_rendered: bool,
    water_textures: bool,
    chunks: usize,
}

impl FrameState {
    fn new(camera: Camera) -> Self {
        Self {
            camera,
            sun: None,
            camera_underwater: false,
            shadow_map_rendered: false,
            water_textures: false,
            chunks: 0,
        }
    }

    fn variant(&self) -> Option<&'static str> {
        self.camera_underwater.then_some(UNDERWATER_VARIANT)
    }
}

/// Runs every pass of a frame by asking the scene's providers for chunks and turning them into
/// draw calls.
pub struct FrameRenderer {
    config: GraphicsConfig,
    /// LOD requested for passes seen through the main camera.
    detail: Lod,
    pools: ChunkPools,
    list: RenderChunkList,
    variables: ShaderVariables,
    shadow_map: ShadowMap,
    water_reflection: RenderTargetId,
    water_refraction: RenderTargetId,
    debug_material: MaterialId,
    overlay_quad: Mesh,
    /// Line list queued by collaborators for the current frame.
    debug_lines: Vec<DebugVertex>,
    /// Buffer holding last frame's debug lines. Destroyed when the next frame starts.
    debug_lines_buffer: Option<BufferId>,
}

impl FrameRenderer {
    pub const DEBUG_MATERIAL: &str = "debug";

    pub fn new(
        config: &GraphicsConfig,
        detail: Lod,
        materials: &MaterialLibrary,
        quad: Mesh,
        renderer: &mut Renderer,
    ) -> Result<Self, RenderError> {
        let debug_material = materials.require(Self::DEBUG_MATERIAL)?;

        let mut water_target = |label: &str| {
            renderer.create_render_target(RenderTargetDescriptor {
                label: label.to_string(),
                width: config.water_texture_resolution,
                height: config.water_texture_resolution,
                format: TextureFormat::Rgba8UnormSrgb,
            })
        };
        let water_reflection = water_target("water_reflection");
        let water_refraction = water_target("water_refraction");

        Ok(Self {
            config: config.clone(),
            detail,
            pools: ChunkPools::default(),
            list: RenderChunkList::default(),
            variables: ShaderVariables::default(),
            shadow_map: ShadowMap::new(renderer, config.shadow_map_resolution),
            water_reflection,
            water_refraction,
            debug_material,
            overlay_quad: quad,
            debug_lines: Vec::new(),
            debug_lines_buffer: None,
        })
    }

    pub fn detail(&self) -> Lod {
        self.detail
    }

    /// Change the terrain detail for normal passes. Water passes use one level coarser.
    pub fn set_detail(&mut self, detail: Lod) {
        if detail != self.detail {
            tracing::info!("Terrain detail set to {detail}.");
        }
        self.detail = detail;
    }

    pub fn variables(&self) -> &ShaderVariables {
        &self.variables
    }

    pub fn chunk_pools(&self) -> &ChunkPools {
        &self.pools
    }

    /// Queue a line to draw during the physics debug stage of the next frame.
    pub fn queue_debug_line(&mut self, start: Vec3, end: Vec3, color: Vec4) {
        let color = color.to_array();
        self.debug_lines.extend([
            DebugVertex {
                position: start,
                color,
            },
            DebugVertex {
                position: end,
                color,
            },
        ]);
    }

    pub fn render_frame(
        &mut self,
        scene: &Scene,
        renderer: &mut Renderer,
    ) -> Result<FrameReport, RenderError> {
        if scene.is_exiting() {
            return Ok(FrameReport::Skipped);
        }

        let (frame, chunks) = self.record_frame(scene, renderer)?;
        let stats = renderer.submit(frame);

        Ok(FrameReport::Rendered(FrameSummary { stats, chunks }))
    }

    /// Run every stage and return the recorded frame along with the number of chunks gathered.
    pub fn record_frame(
        &mut self,
        scene: &Scene,
        renderer: &mut Renderer,
    ) -> Result<(Frame, usize), RenderError> {
        let camera = scene.camera().ok_or(RenderError::NoActiveCamera)?.clone();

        let mut frame = renderer.begin_frame();
        let mut state = FrameState::new(camera);

        for stage in FrameStage::iter() {
            self.run_stage(stage, scene, renderer, &mut frame, &mut state);
        }

        Ok((frame, state.chunks))
    }

    fn run_stage(
        &mut self,
        stage: FrameStage,
        scene: &Scene,
        renderer: &mut Renderer,
        frame: &mut Frame,
        state: &mut FrameState,
    ) {
        match stage {
            FrameStage::PrepareFrame => self.prepare_frame(renderer, state),
            FrameStage::ProcessLighting => self.process_lighting(scene, state),
            FrameStage::ProcessFog => {
                let fog = &scene.fog;
                self.variables
                    .set_vector(VectorVariable::FogColor, fog.color.extend(1.0));
                self.variables.set_float(FloatVariable::FogStart, fog.start);
                self.variables.set_float(FloatVariable::FogEnd, fog.end);
            }
            FrameStage::ProcessShadowMap => self.process_shadow_map(scene, frame, state),
            FrameStage::CreateWaterTextures => self.create_water_textures(scene, frame, state),
            FrameStage::ProcessGeometryChunks => {
                let mut desc = self.camera_pass(RenderPassType::OpaqueOnly, &state.camera);
                let clear = ClearValue::ColorDepth {
                    color: scene.fog.color.extend(1.0),
                    depth: 1.0,
                };
                self.render_geometry_pass(
                    scene,
                    frame,
                    state,
                    &mut desc,
                    "opaque",
                    RenderTarget::Surface,
                    Some(clear),
                );
            }
            FrameStage::ProcessWaterChunks => self.process_water_chunks(scene, frame, state),
            FrameStage::ProcessParticleChunks => {
                self.process_particle_chunks(scene, frame, state)
            }
            FrameStage::ProcessTransparentGeometryChunks => {
                let mut desc =
                    self.camera_pass(RenderPassType::SemiTransparentOnly, &state.camera);
                self.gather(scene, &mut desc, state);
                if !self.list.geometry.is_empty() {
                    let mut pass = frame.begin_pass("transparent", RenderTarget::Surface, None);
                    self.draw_geometry(&mut pass, &scene.resources().materials, state);
                }
                self.finish_pass();
            }
            FrameStage::DrawOverlays => self.draw_overlays(scene, frame, state),
            FrameStage::DrawPhysicsDebug => self.draw_physics_debug(scene, renderer, frame, state),
            FrameStage::DrawGUI => {
                let mut desc = self.camera_pass(RenderPassType::GUIOnly, &state.camera);
                self.gather(scene, &mut desc, state);
                if !self.list.geometry.is_empty() {
                    let mut pass = frame.begin_pass("gui", RenderTarget::Surface, None);
                    self.draw_geometry(&mut pass, &scene.resources().materials, state);
                }
                self.finish_pass();
            }
            FrameStage::ClearChunks => {
                self.finish_pass();
                self.debug_lines.clear();
                debug_assert_eq!(self.pools.active_count(), 0);
            }
        }
    }

    fn prepare_frame(&mut self, renderer: &mut Renderer, state: &FrameState) {
        self.variables.reset();

        if let Some(buffer) = self.debug_lines_buffer.take() {
            renderer.destroy_buffer(buffer);
        }

        let camera = &state.camera;
        let view = camera.view();
        let projection = camera.projection();
        self.variables.set_matrix(MatrixVariable::View, view);
        self.variables
            .set_matrix(MatrixVariable::Projection, projection);
        self.variables
            .set_matrix(MatrixVariable::ViewProjection, projection * view);
        self.variables
            .set_vector(VectorVariable::CameraPosition, camera.position.extend(1.0));
    }

    fn process_lighting(&mut self, scene: &Scene, state: &mut FrameState) {
        let mut desc = self
            .camera_pass(RenderPassType::Normal, &state.camera)
            .with_flags(RenderPassFlags::LIGHTS);
        self.gather(scene, &mut desc, state);

        // This is the first pass seen from the main camera, so water providers flag the camera
        // here for the whole frame.
        state.camera_underwater = desc.camera_underwater;

        let mut point_lights = 0;
        for light in self
            .list
            .lights
            .iter()
            .filter_map(|&handle| self.pools.lights.get(handle))
        {
            match light.kind {
                LightKind::Directional if state.sun.is_none() => state.sun = Some(light.clone()),
                LightKind::Directional => {}
                LightKind::Point => point_lights += 1,
            }
        }

        if let Some(sun) = &state.sun {
            self.variables
                .set_vector(VectorVariable::SunDirection, sun.direction.extend(0.0));
            self.variables
                .set_vector(VectorVariable::SunColor, sun.color.extend(1.0));
            self.variables.set_vector(
                VectorVariable::AmbientColor,
                (sun.color * AMBIENT_FACTOR).extend(1.0),
            );
        }
        self.variables
            .set_float(FloatVariable::PointLightCount, point_lights as f32);

        self.finish_pass();
    }

    fn process_shadow_map(&mut self, scene: &Scene, frame: &mut Frame, state: &mut FrameState) {
        let Some(sun_direction) = state
            .sun
            .as_ref()
            .filter(|sun| sun.casts_shadows)
            .map(|sun| sun.direction)
        else {
            return;
        };

        self.shadow_map.update(sun_direction, &state.camera);
        let view_projection = self.shadow_map.view_projection.clone();
        self.variables
            .set_matrix(MatrixVariable::LightViewProjection, view_projection.mat);

        let mut desc = RenderPassDescriptor::new(
            RenderPassType::ShadowMapCreate,
            view_projection,
            state.camera.position,
            self.detail,
        );
        self.render_geometry_pass(
            scene,
            frame,
            state,
            &mut desc,
            "shadow_map",
            RenderTarget::Offscreen(self.shadow_map.target),
            Some(ClearValue::Depth(1.0)),
        );

        self.variables
            .set_texture(TextureVariable::ShadowMap, Some(self.shadow_map.target));
        state.shadow_map_rendered = true;
    }

    fn create_water_textures(&mut self, scene: &Scene, frame: &mut Frame, state: &mut FrameState) {
        let mut desc = self
            .camera_pass(RenderPassType::Normal, &state.camera)
            .with_flags(RenderPassFlags::WATER);
        self.gather(scene, &mut desc, state);
        let elevation = self
            .list
            .water
            .first()
            .and_then(|&handle| self.pools.water.get(handle))
            .map(|water| water.elevation);
        self.finish_pass();

        // No visible water, no textures.
        let Some(elevation) = elevation else {
            return;
        };

        let camera = state.camera.clone();
        let planes = WaterPlanes::new(elevation, camera.position);
        let lod = self.detail.coarser();

        let reflected = camera.mirrored_view_projection(&planes.surface);
        self.variables
            .set_matrix(MatrixVariable::ReflectionViewProjection, reflected.mat);
        let mirrored_position = planes
            .surface
            .reflection()
            .transform_point3(camera.position);

        let mut desc = RenderPassDescriptor::new(
            RenderPassType::WaterReflection,
            reflected,
            mirrored_position,
            lod,
        )
        .with_clip_plane(planes.reflection);
        let clear = ClearValue::ColorDepth {
            color: scene.fog.color.extend(1.0),
            depth: 1.0,
        };
        self.render_geometry_pass(
            scene,
            frame,
            state,
            &mut desc,
            "water_reflection",
            RenderTarget::Offscreen(self.water_reflection),
            Some(clear),
        );

        let mut desc = RenderPassDescriptor::new(
            RenderPassType::WaterRefraction,
            camera.view_projection(),
            camera.position,
            lod,
        )
        .with_clip_plane(planes.refraction);
        self.render_geometry_pass(
            scene,
            frame,
            state,
            &mut desc,
            "water_refraction",
            RenderTarget::Offscreen(self.water_refraction),
            Some(clear),
        );

        self.variables
            .set_float(FloatVariable::WaterElevation, elevation);
        self.variables
            .set_texture(TextureVariable::WaterReflection, Some(self.water_reflection));
        self.variables
            .set_texture(TextureVariable::WaterRefraction, Some(self.water_refraction));
        state.water_textures = true;
    }

    fn process_water_chunks(&mut self, scene: &Scene, frame: &mut Frame, state: &mut FrameState) {
        let mut desc = self
            .camera_pass(RenderPassType::Normal, &state.camera)
            .with_flags(RenderPassFlags::WATER);
        self.gather(scene, &mut desc, state);

        if !self.list.water.is_empty() {
            let materials = &scene.resources().materials;
            let textures = if state.water_textures {
                vec![self.water_reflection, self.water_refraction]
            } else {
                vec![]
            };

            let mut pass = frame.begin_pass("water", RenderTarget::Surface, None);
            for chunk in self
                .list
                .water
                .iter()
                .filter_map(|&handle| self.pools.water.get(handle))
            {
                let Some(vertex_buffer) = chunk.vertex_buffer else {
                    continue;
                };
                pass.draw(DrawCall {
                    vertex_buffer,
                    index_buffer: chunk.index_buffer,
                    base_vertex: 0,
                    vertex_count: 0,
                    start_index: 0,
                    primitive_count: chunk.primitive_count,
                    topology: PrimitiveTopology::TriangleList,
                    instance_count: 1,
                    world: chunk.world,
                    technique: resolve(materials, chunk.material, &chunk.technique, state),
                    textures: textures.clone(),
                });
            }
        }

        self.finish_pass();
    }

    fn process_particle_chunks(
        &mut self,
        scene: &Scene,
        frame: &mut Frame,
        state: &mut FrameState,
    ) {
        let mut desc = self
            .camera_pass(RenderPassType::Normal, &state.camera)
            .with_flags(RenderPassFlags::PARTICLES);
        self.gather(scene, &mut desc, state);

        if !self.list.particles.is_empty() {
            let materials = &scene.resources().materials;
            let mut pass = frame.begin_pass("particles", RenderTarget::Surface, None);
            for chunk in self
                .list
                .particles
                .iter()
                .filter_map(|&handle| self.pools.particles.get(handle))
            {
                let Some(vertex_buffer) = chunk.vertex_buffer else {
                    continue;
                };
                pass.draw(DrawCall {
                    vertex_buffer,
                    index_buffer: chunk.index_buffer,
                    base_vertex: 0,
                    vertex_count: 0,
                    start_index: 0,
                    primitive_count: chunk.primitive_count,
                    topology: PrimitiveTopology::TriangleList,
                    instance_count: chunk.instance_positions.len() as u32,
                    world: Mat4::from_scale(Vec3::splat(chunk.size)),
                    technique: resolve(materials, chunk.material, &chunk.technique, state),
                    textures: vec![],
                });
            }
        }

        self.finish_pass();
    }

    fn draw_overlays(&mut self, scene: &Scene, frame: &mut Frame, state: &FrameState) {
        if !self.config.show_shadow_map || !state.shadow_map_rendered {
            return;
        }

        // Top right corner of the screen, in clip space.
        let world = Mat4::from_translation(Vec3::new(0.5, 0.5, 0.0))
            * Mat4::from_scale(Vec3::splat(0.45))
            * Mat4::from_rotation_x(-FRAC_PI_2);

        let mut pass = frame.begin_pass("overlays", RenderTarget::Surface, None);
        pass.draw(DrawCall {
            vertex_buffer: self.overlay_quad.vertex_buffer,
            index_buffer: Some(self.overlay_quad.index_buffer),
            base_vertex: 0,
            vertex_count: self.overlay_quad.vertex_count,
            start_index: 0,
            primitive_count: self.overlay_quad.primitive_count,
            topology: self.overlay_quad.topology,
            instance_count: 1,
            world,
            technique: resolve(
                &scene.resources().materials,
                Some(self.debug_material),
                "ShadowMapDebug",
                state,
            ),
            textures: vec![self.shadow_map.target],
        });
    }

    fn draw_physics_debug(
        &mut self,
        scene: &Scene,
        renderer: &mut Renderer,
        frame: &mut Frame,
        state: &FrameState,
    ) {
        if self.debug_lines.is_empty() {
            return;
        }

        let buffer = renderer.create_vertex_buffer("debug_lines", &self.debug_lines);
        self.debug_lines_buffer = Some(buffer);

        let vertex_count = self.debug_lines.len() as u32;
        let mut pass = frame.begin_pass("physics_debug", RenderTarget::Surface, None);
        pass.draw(DrawCall {
            vertex_buffer: buffer,
            index_buffer: None,
            base_vertex: 0,
            vertex_count,
            start_index: 0,
            primitive_count: vertex_count / PrimitiveTopology::LineList.vertices_per_primitive(),
            topology: PrimitiveTopology::LineList,
            instance_count: 1,
            world: Mat4::IDENTITY,
            technique: resolve(
                &scene.resources().materials,
                Some(self.debug_material),
                "DebugLines",
                state,
            ),
            textures: vec![],
        });
    }

    fn camera_pass(&self, pass_type: RenderPassType, camera: &Camera) -> RenderPassDescriptor {
        let mut desc = RenderPassDescriptor::new(
            pass_type,
            camera.view_projection(),
            camera.position,
            self.detail,
        );
        desc.render_bounding_boxes = self.config.render_bounding_boxes;
        desc
    }

    /// Ask every provider, in registration order, for the chunks of this pass.
    fn gather(&mut self, scene: &Scene, desc: &mut RenderPassDescriptor, state: &mut FrameState) {
        self.list.clear();
        let mut collector = ChunkCollector::new(&mut self.pools, &mut self.list);
        for provider in scene.providers() {
            provider.query_render_chunks(desc, &mut collector);
        }
        state.chunks += self.list.len();
    }

    fn finish_pass(&mut self) {
        self.list.clear();
        self.pools.recycle_all();
    }

    #[allow(clippy::too_many_arguments)]
    fn render_geometry_pass(
        &mut self,
        scene: &Scene,
        frame: &mut Frame,
        state: &mut FrameState,
        desc: &mut RenderPassDescriptor,
        label: &str,
        target: RenderTarget,
        clear: Option<ClearValue>,
    ) {
        self.gather(scene, desc, state);

        {
            let mut pass = frame.begin_pass(label, target, clear);
            if let Some(clip_plane) = desc.clip_plane {
                pass.set_clip_plane(Some(clip_plane.as_vec4()));
            }
            self.draw_geometry(&mut pass, &scene.resources().materials, state);
            if desc.clip_plane.is_some() {
                pass.set_clip_plane(None);
            }
        }

        self.finish_pass();
    }

    /// Draw the gathered geometry chunks, bucket by bucket, in the order they were gathered.
    fn draw_geometry(
        &self,
        pass: &mut PassEncoder,
        materials: &MaterialLibrary,
        state: &FrameState,
    ) {
        for order in RenderOrder::iter() {
            for chunk in self
                .list
                .geometry
                .iter()
                .filter_map(|&handle| self.pools.geometry.get(handle))
                .filter(|chunk| chunk.render_order == order)
            {
                if let Some(draw) = self.geometry_draw(chunk, materials, state) {
                    pass.draw(draw);
                }
            }
        }
    }

    fn geometry_draw(
        &self,
        chunk: &GeometryChunk,
        materials: &MaterialLibrary,
        state: &FrameState,
    ) -> Option<DrawCall> {
        let textures = if chunk.receives_shadows && state.shadow_map_rendered {
            vec![self.shadow_map.target]
        } else {
            vec![]
        };

        Some(DrawCall {
            vertex_buffer: chunk.vertex_buffer?,
            index_buffer: chunk.index_buffer,
            base_vertex: chunk.base_vertex,
            vertex_count: chunk.vertex_count,
            start_index: chunk.start_index,
            primitive_count: chunk.primitive_count,
            topology: chunk.topology,
            instance_count: 1,
            world: chunk.world,
            technique: resolve(materials, chunk.material, &chunk.technique, state),
            textures,
        })
    }
}

fn resolve(
    materials: &MaterialLibrary,
    material: Option<MaterialId>,
    technique: &str,
    state: &FrameState,
) -> String {
    match material {
        Some(material) => materials.resolve_technique(material, technique, state.variant()),
        None => technique.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, UVec2, Vec2};
    use renderer::Command;

    use super::*;
    use crate::game::{
        config::{GraphicsQuality, TerrainConfig},
        height_field::HeightField,
        resources::SharedResources,
        scene::{
            lights::Light,
            particles::{EmitterSettings, ParticleEmitter},
            props::Prop,
            sky::Sky,
            water::Water,
        },
        terrain::Terrain,
    };

    struct Fixture {
        renderer: Renderer,
        scene: Scene,
        frame_renderer: FrameRenderer,
    }

    impl Fixture {
        fn new(config: GraphicsConfig) -> Self {
            let mut renderer = Renderer::default();
            let mut resources = SharedResources::new(&mut renderer);

            let height_field =
                HeightField::from_samples(UVec2::splat(16), 1.0, vec![2.0; 16 * 16]).unwrap();
            let terrain = Terrain::new(
                height_field,
                &TerrainConfig {
                    min_leaf_size: 16,
                    ..TerrainConfig::default()
                },
                GraphicsQuality::Low,
                &mut resources,
                &mut renderer,
            )
            .unwrap();

            let frame_renderer = FrameRenderer::new(
                &config,
                Lod::High,
                &resources.materials,
                resources.quad,
                &mut renderer,
            )
            .unwrap();

            let mut scene = Scene::new(resources);
            scene.add(terrain);

            Self {
                renderer,
                scene,
                frame_renderer,
            }
        }

        fn add_camera(&mut self, position: Vec3) {
            let mut camera = Camera {
                position,
                ..Default::default()
            };
            camera.look_at(Vec3::new(8.0, 2.0, 8.0));
            self.scene.add(camera);
        }

        fn add_sun_and_prop(&mut self) {
            self.scene
                .add(Light::directional(Vec3::new(0.2, -1.0, 0.1), Vec3::ONE));
            let prop = Prop::new(
                Vec3::new(8.0, 2.0, 8.0),
                Vec3::splat(2.0),
                Quat::IDENTITY,
                self.scene.resources(),
            )
            .unwrap();
            self.scene.add(prop);
        }

        fn add_water(&mut self, elevation: f32) {
            let water =
                Water::new(elevation, Vec2::ZERO, Vec2::splat(16.0), self.scene.resources())
                    .unwrap();
            self.scene.add(water);
        }

        fn record(&mut self) -> Frame {
            self.frame_renderer
                .record_frame(&self.scene, &mut self.renderer)
                .unwrap()
                .0
        }
    }

    fn pass_labels(frame: &Frame) -> Vec<&str> {
        frame
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::BeginPass { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Draws recorded in each pass, keyed by the pass label.
    fn draws_by_pass(frame: &Frame) -> Vec<(&str, Vec<&DrawCall>)> {
        let mut passes = Vec::new();
        for command in frame.commands() {
            match command {
                Command::BeginPass { label, .. } => passes.push((label.as_str(), Vec::new())),
                Command::Draw(draw) => {
                    if let Some((_, draws)) = passes.last_mut() {
                        draws.push(draw);
                    }
                }
                _ => {}
            }
        }
        passes
    }

    fn techniques(frame: &Frame) -> Vec<&str> {
        frame
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::Draw(draw) => Some(draw.technique.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn stage_order() {
        let stages: Vec<_> = FrameStage::iter().collect();
        assert_eq!(stages.len(), 13);
        assert_eq!(stages[0], FrameStage::PrepareFrame);
        assert_eq!(stages[3], FrameStage::ProcessShadowMap);
        assert_eq!(stages[4], FrameStage::CreateWaterTextures);
        assert_eq!(stages[5], FrameStage::ProcessGeometryChunks);
        assert_eq!(stages[12], FrameStage::ClearChunks);
    }

    #[test]
    fn missing_camera_is_an_error() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        let result = fixture
            .frame_renderer
            .render_frame(&fixture.scene, &mut fixture.renderer);
        assert!(matches!(result, Err(RenderError::NoActiveCamera)));
    }

    #[test]
    fn exiting_scene_is_skipped() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.scene.request_exit();
        let result = fixture
            .frame_renderer
            .render_frame(&fixture.scene, &mut fixture.renderer);
        assert_eq!(result.unwrap(), FrameReport::Skipped);
    }

    #[test]
    fn terrain_only_frame() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));

        let frame = fixture.record();
        assert_eq!(pass_labels(&frame), vec!["opaque"]);
        assert!(techniques(&frame).iter().all(|&t| t == "Terrain"));
        assert!(!techniques(&frame).is_empty());
        assert_eq!(fixture.frame_renderer.chunk_pools().active_count(), 0);

        let report = fixture
            .frame_renderer
            .render_frame(&fixture.scene, &mut fixture.renderer)
            .unwrap();
        let FrameReport::Rendered(summary) = report else {
            panic!("frame was skipped");
        };
        assert_eq!(summary.stats.passes, 1);
        assert!(summary.chunks > 0);
    }

    #[test]
    fn full_frame_runs_every_pass() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));
        fixture.add_sun_and_prop();
        fixture.add_water(10.0);
        let sky = Sky::new(fixture.scene.resources()).unwrap();
        fixture.scene.add(sky);

        let frame = fixture.record();
        assert_eq!(
            pass_labels(&frame),
            vec![
                "shadow_map",
                "water_reflection",
                "water_refraction",
                "opaque",
                "water"
            ]
        );

        // The sky is drawn first even though it was added last.
        let commands = frame.commands();
        let opaque = commands
            .iter()
            .position(|c| matches!(c, Command::BeginPass { label, .. } if label == "opaque"))
            .unwrap();
        let Command::Draw(first) = &commands[opaque + 1] else {
            panic!("expected a draw");
        };
        assert_eq!(first.technique, "Sky");

        // Water passes clip at the surface.
        assert!(commands.iter().any(|c| matches!(c, Command::SetClipPlane(Some(_)))));

        // Water is drawn with both water textures.
        let Some(Command::Draw(water)) = commands
            .iter()
            .rev()
            .find(|c| matches!(c, Command::Draw(_)))
        else {
            panic!("expected a water draw");
        };
        assert_eq!(water.technique, "Water");
        assert_eq!(water.textures.len(), 2);

        let variables = fixture.frame_renderer.variables();
        assert_eq!(variables.float(FloatVariable::WaterElevation), 10.0);
        assert!(variables.texture(TextureVariable::ShadowMap).is_some());
        assert_eq!(
            variables.vector(VectorVariable::SunDirection).truncate(),
            Vec3::new(0.2, -1.0, 0.1).normalize()
        );
    }

    #[test]
    fn particles_and_transparent_geometry_follow_opaque_passes() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));
        fixture.add_sun_and_prop();
        fixture.add_water(10.0);

        let glass = Prop::new(
            Vec3::new(4.0, 2.0, 8.0),
            Vec3::ONE,
            Quat::IDENTITY,
            fixture.scene.resources(),
        )
        .unwrap()
        .transparent(true);
        fixture.scene.add(glass);
        // The unit cube's origin corner lands here.
        let glass_corner = Vec3::new(3.5, 2.0, 7.5);

        let emitter = ParticleEmitter::new(
            Vec3::new(8.0, 3.0, 8.0),
            EmitterSettings::default(),
            fixture.scene.resources(),
        )
        .unwrap();
        fixture.scene.add(emitter);
        fixture.scene.update(0.5);

        let frame = fixture.record();
        assert_eq!(
            pass_labels(&frame),
            vec![
                "shadow_map",
                "water_reflection",
                "water_refraction",
                "opaque",
                "water",
                "particles",
                "transparent"
            ]
        );

        let is_glass = |draw: &DrawCall| {
            draw.world
                .transform_point3(Vec3::ZERO)
                .abs_diff_eq(glass_corner, 1e-5)
        };

        for (label, draws) in draws_by_pass(&frame) {
            match label {
                "transparent" => {
                    assert_eq!(draws.len(), 1);
                    assert_eq!(draws[0].technique, "Prop");
                    assert!(is_glass(draws[0]));
                }
                "particles" => {
                    assert_eq!(draws.len(), 1);
                    assert_eq!(draws[0].technique, "Particles");
                    assert_eq!(draws[0].instance_count, 10);
                }
                "shadow_map" | "opaque" => {
                    assert!(!draws.is_empty());
                    assert!(!draws.iter().any(|&draw| is_glass(draw)), "{label}");
                    assert!(!draws.iter().any(|draw| draw.technique == "Particles"));
                }
                _ => assert!(!draws.iter().any(|draw| draw.technique == "Particles")),
            }
        }
    }

    #[test]
    fn coarser_detail_draws_fewer_primitives() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));

        let high = FrameStats::from_commands(fixture.record().commands()).primitives;

        fixture.frame_renderer.set_detail(Lod::Minimum);
        assert_eq!(fixture.frame_renderer.detail(), Lod::Minimum);
        let minimum = FrameStats::from_commands(fixture.record().commands()).primitives;

        assert!(minimum > 0);
        assert!(minimum < high, "{minimum} >= {high}");
    }

    #[test]
    fn shadow_pass_only_draws_casters() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));
        fixture.add_sun_and_prop();

        let frame = fixture.record();
        let commands = frame.commands();
        assert!(matches!(&commands[0], Command::BeginPass { label, .. } if label == "shadow_map"));
        let Command::Draw(draw) = &commands[1] else {
            panic!("expected a draw");
        };
        assert_eq!(draw.technique, "ShadowMapCreate");
        assert_eq!(commands[2], Command::EndPass);
    }

    #[test]
    fn underwater_camera_uses_variants() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.add_camera(Vec3::new(8.0, 5.0, 14.0));
        fixture.add_water(10.0);

        let frame = fixture.record();
        let techniques = techniques(&frame);
        assert!(techniques.contains(&"TerrainCameraUnderwater"));
        assert!(!techniques.contains(&"Terrain"));
    }

    #[test]
    fn invisible_water_skips_water_passes() {
        let mut fixture = Fixture::new(GraphicsConfig::default());
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));
        // Far behind the camera.
        let water = Water::new(
            10.0,
            Vec2::new(0.0, 500.0),
            Vec2::new(16.0, 516.0),
            fixture.scene.resources(),
        )
        .unwrap();
        fixture.scene.add(water);

        let frame = fixture.record();
        assert_eq!(pass_labels(&frame), vec!["opaque"]);
        assert!(
            fixture
                .frame_renderer
                .variables()
                .texture(TextureVariable::WaterReflection)
                .is_none()
        );
    }

    #[test]
    fn overlays_and_debug_lines() {
        let mut fixture = Fixture::new(GraphicsConfig {
            show_shadow_map: true,
            ..GraphicsConfig::default()
        });
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));
        fixture.add_sun_and_prop();
        fixture
            .frame_renderer
            .queue_debug_line(Vec3::ZERO, Vec3::Y, Vec4::ONE);

        let buffers = fixture.renderer.buffer_count();
        let frame = fixture.record();
        assert_eq!(
            pass_labels(&frame),
            vec!["shadow_map", "opaque", "overlays", "physics_debug"]
        );
        let techniques = techniques(&frame);
        assert!(techniques.contains(&"ShadowMapDebug"));
        assert!(techniques.contains(&"DebugLines"));
        assert_eq!(fixture.renderer.buffer_count(), buffers + 1);

        // Lines only last a single frame.
        let frame = fixture.record();
        assert!(!pass_labels(&frame).contains(&"physics_debug"));
        assert_eq!(fixture.renderer.buffer_count(), buffers);
    }

    #[test]
    fn bounding_boxes_are_drawn_last() {
        let mut fixture = Fixture::new(GraphicsConfig {
            render_bounding_boxes: true,
            ..GraphicsConfig::default()
        });
        fixture.add_camera(Vec3::new(8.0, 30.0, 24.0));

        let frame = fixture.record();
        let techniques = techniques(&frame);
        let first_box = techniques.iter().position(|&t| t == "BoundingBox").unwrap();
        assert!(techniques[first_box..].iter().all(|&t| t == "BoundingBox"));
        assert_eq!(techniques.len(), first_box * 2);
    }
}
