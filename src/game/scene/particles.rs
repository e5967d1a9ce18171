use glam::{Vec3, Vec4};

use crate::game::{
    math::BoundingBox,
    render::{
        materials::{MaterialId, MissingMaterial},
        mesh::Mesh,
        pass::{RenderPassDescriptor, RenderPassFlags},
        provider::{ChunkCollector, RenderChunkProvider},
    },
    resources::SharedResources,
};

#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds since the particle was spawned.
    pub age: f32,
}

/// How an emitter spawns and moves its particles.
#[derive(Clone, Debug)]
pub struct EmitterSettings {
    /// Particles spawned per second.
    pub rate: f32,
    /// Seconds a particle lives.
    pub lifetime: f32,
    pub initial_velocity: Vec3,
    /// Horizontal speed added in a different direction for every particle.
    pub spread: f32,
    pub gravity: Vec3,
    pub size: f32,
    pub color: Vec4,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            rate: 20.0,
            lifetime: 2.0,
            initial_velocity: Vec3::new(0.0, 4.0, 0.0),
            spread: 1.0,
            gravity: Vec3::new(0.0, -1.0, 0.0),
            size: 0.5,
            color: Vec4::ONE,
        }
    }
}

/// Particles simulated on the CPU and drawn as instanced quads.
pub struct ParticleEmitter {
    pub origin: Vec3,
    pub settings: EmitterSettings,
    particles: Vec<Particle>,
    /// Fractional particles owed from previous updates.
    accumulator: f32,
    spawned: u32,
    mesh: Mesh,
    material: MaterialId,
}

impl ParticleEmitter {
    pub const MATERIAL: &str = "particles";

    pub fn new(
        origin: Vec3,
        settings: EmitterSettings,
        resources: &SharedResources,
    ) -> Result<Self, MissingMaterial> {
        Ok(Self {
            origin,
            settings,
            particles: Vec::new(),
            accumulator: 0.0,
            spawned: 0,
            mesh: resources.quad,
            material: resources.materials.require(Self::MATERIAL)?,
        })
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Advance the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let lifetime = self.settings.lifetime;
        let gravity = self.settings.gravity;

        self.particles.retain_mut(|particle| {
            particle.age += dt;
            if particle.age >= lifetime {
                return false;
            }
            particle.velocity += gravity * dt;
            particle.position += particle.velocity * dt;
            true
        });

        self.accumulator += self.settings.rate * dt;
        while self.accumulator >= 1.0 {
            self.accumulator -= 1.0;
            self.spawn();
        }
    }

    fn spawn(&mut self) {
        // Spread successive particles around the golden angle.
        const GOLDEN_ANGLE: f32 = 2.399_963;
        let (sin, cos) = (self.spawned as f32 * GOLDEN_ANGLE).sin_cos();
        self.spawned = self.spawned.wrapping_add(1);

        self.particles.push(Particle {
            position: self.origin,
            velocity: self.settings.initial_velocity
                + Vec3::new(cos, 0.0, sin) * self.settings.spread,
            age: 0.0,
        });
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        let half = Vec3::splat(self.settings.size * 0.5);
        BoundingBox::from_points(self.particles.iter().map(|p| p.position))
            .map(|b| BoundingBox::new(b.min - half, b.max + half))
    }
}

impl RenderChunkProvider for ParticleEmitter {
    fn query_render_chunks(&self, desc: &mut RenderPassDescriptor, chunks: &mut ChunkCollector) {
        if !desc.wants(RenderPassFlags::PARTICLES) {
            return;
        }

        let Some(bounding_box) = self.bounding_box() else {
            return;
        };
        if !desc.frustum.intersects_bounding_box(&bounding_box) {
            return;
        }

        let chunk = chunks.particles();
        chunk.vertex_buffer = Some(self.mesh.vertex_buffer);
        chunk.index_buffer = Some(self.mesh.index_buffer);
        chunk.primitive_count = self.mesh.primitive_count;
        chunk
            .instance_positions
            .extend(self.particles.iter().map(|p| p.position));
        chunk.size = self.settings.size;
        chunk.color = self.settings.color;
        chunk.material = Some(self.material);
        chunk.technique.push_str("Particles");
    }
}
