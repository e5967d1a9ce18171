use glam::Vec3;

use crate::game::{
    camera::Camera,
    render::provider::RenderChunkProvider,
    resources::SharedResources,
    terrain::Terrain,
};

pub mod lights;
pub mod particles;
pub mod props;
pub mod sky;
pub mod water;

use lights::Light;
use particles::ParticleEmitter;
use props::Prop;
use sky::Sky;
use water::Water;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

/// Everything that can live in a scene.
#[derive(strum::IntoStaticStr)]
pub enum SceneComponent {
    Terrain(Box<Terrain>),
    Water(Water),
    Light(Light),
    Particles(ParticleEmitter),
    Sky(Sky),
    Prop(Prop),
    Camera(Camera),
}

impl SceneComponent {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// The component's chunk provider, if it draws anything.
    pub fn as_provider(&self) -> Option<&dyn RenderChunkProvider> {
        match self {
            Self::Terrain(terrain) => Some(terrain.as_ref()),
            Self::Water(water) => Some(water),
            Self::Light(light) => Some(light),
            Self::Particles(emitter) => Some(emitter),
            Self::Sky(sky) => Some(sky),
            Self::Prop(prop) => Some(prop),
            Self::Camera(_) => None,
        }
    }

    pub fn handle_query(&self, query: &SceneQuery) -> QueryResponse {
        let Self::Terrain(terrain) = self else {
            return QueryResponse::Unhandled;
        };

        match *query {
            SceneQuery::TerrainHeight { x, z } => QueryResponse::Height(terrain.height_at(x, z)),
            SceneQuery::TerrainNormal { x, z } => QueryResponse::Normal(terrain.normal_at(x, z)),
            SceneQuery::IsInTerrainBounds { x, z } => {
                QueryResponse::InBounds(terrain.is_in_bounds(x, z))
            }
        }
    }

    pub fn update(&mut self, dt: f32) {
        if let Self::Particles(emitter) = self {
            emitter.update(dt);
        }
    }
}

impl From<Terrain> for SceneComponent {
    fn from(value: Terrain) -> Self {
        Self::Terrain(Box::new(value))
    }
}

macro_rules! impl_from_component {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SceneComponent {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_component!(
    Water(Water),
    Light(Light),
    Particles(ParticleEmitter),
    Sky(Sky),
    Prop(Prop),
    Camera(Camera),
);

/// Requests answered by whichever component understands them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneQuery {
    TerrainHeight { x: f32, z: f32 },
    TerrainNormal { x: f32, z: f32 },
    IsInTerrainBounds { x: f32, z: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryResponse {
    /// No component understood the query.
    Unhandled,
    /// `None` outside the terrain.
    Height(Option<f32>),
    Normal(Option<Vec3>),
    InBounds(bool),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    pub start: f32,
    pub end: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: Vec3::new(0.6, 0.7, 0.8),
            start: 500.0,
            end: 1_500.0,
        }
    }
}

pub struct Scene {
    resources: SharedResources,
    components: Vec<SceneComponent>,
    /// Components that provide render chunks, in registration order.
    providers: Vec<ComponentId>,
    active_camera: Option<ComponentId>,
    pub fog: Fog,
    exiting: bool,
}

impl Scene {
    pub fn new(resources: SharedResources) -> Self {
        Self {
            resources,
            components: Vec::new(),
            providers: Vec::new(),
            active_camera: None,
            fog: Fog::default(),
            exiting: false,
        }
    }

    pub fn resources(&self) -> &SharedResources {
        &self.resources
    }

    /// Add a component. Components that draw are registered as providers and the first camera
    /// becomes the active camera.
    pub fn add(&mut self, component: impl Into<SceneComponent>) -> ComponentId {
        let component = component.into();
        let id = ComponentId(self.components.len());

        if component.as_provider().is_some() {
            self.providers.push(id);
        }
        if matches!(component, SceneComponent::Camera(_)) && self.active_camera.is_none() {
            self.active_camera = Some(id);
        }

        tracing::debug!("Added {} component {}.", component.name(), id.0);
        self.components.push(component);
        id
    }

    pub fn get(&self, id: ComponentId) -> Option<&SceneComponent> {
        self.components.get(id.0)
    }

    fn get_mut(&mut self, id: ComponentId) -> Option<&mut SceneComponent> {
        self.components.get_mut(id.0)
    }

    pub fn camera(&self) -> Option<&Camera> {
        match self.get(self.active_camera?) {
            Some(SceneComponent::Camera(camera)) => Some(camera),
            _ => None,
        }
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        match self.get_mut(self.active_camera?) {
            Some(SceneComponent::Camera(camera)) => Some(camera),
            _ => None,
        }
    }

    /// Chunk providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = &dyn RenderChunkProvider> {
        self.providers
            .iter()
            .filter_map(|&id| self.get(id)?.as_provider())
    }

    /// Ask every component in turn until one handles the query.
    pub fn query(&self, query: SceneQuery) -> QueryResponse {
        self.components
            .iter()
            .map(|component| component.handle_query(&query))
            .find(|response| *response != QueryResponse::Unhandled)
            .unwrap_or(QueryResponse::Unhandled)
    }

    pub fn update(&mut self, dt: f32) {
        for component in &mut self.components {
            component.update(dt);
        }
    }

    pub fn request_exit(&mut self) {
        self.exiting = true;
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }
}
