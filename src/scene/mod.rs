//! Scene container
//!
//! The session owns one [`Scene`] and hands it to frame listeners and the
//! surface every tick. It never walks the objects itself: the scene is
//! storage for whoever draws it.

mod camera;
mod transform;

pub use camera::*;
pub use transform::*;

use glam::Vec4;

/// Opaque handle to a texture owned by the caller's asset system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// What the surface shows behind the scene's objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Linear RGBA clear color
    Color(Vec4),
    /// Texture or cube map drawn behind everything
    Texture(TextureId),
}

/// Environment map used for image-based lighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentMap(pub TextureId);

/// A renderable object in the scene
#[derive(Debug, Clone)]
pub struct RenderObject {
    pub mesh_id: usize,
    pub material_id: usize,
    pub transform: Transform,
}

impl RenderObject {
    pub fn new(mesh_id: usize, material_id: usize) -> Self {
        Self {
            mesh_id,
            material_id,
            transform: Transform::default(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Property overrides applied onto a freshly created [`Scene`]
///
/// Every `Some` field replaces the scene's value; `None` keeps the default.
/// For `background` and `environment` the inner option lets callers clear
/// the value explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneProps {
    pub auto_update: Option<bool>,
    pub background: Option<Option<Background>>,
    pub environment: Option<Option<EnvironmentMap>>,
}

/// The scene containing all renderable content
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Option<Background>,
    pub environment: Option<EnvironmentMap>,
    /// Whether world transforms should be refreshed before drawing
    pub auto_update: bool,
    pub objects: Vec<RenderObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            background: None,
            environment: None,
            auto_update: true,
            objects: Vec::new(),
        }
    }

    /// Shallow-apply property overrides
    pub fn apply(&mut self, props: &SceneProps) {
        if let Some(auto_update) = props.auto_update {
            self.auto_update = auto_update;
        }
        if let Some(background) = props.background {
            self.background = background;
        }
        if let Some(environment) = props.environment {
            self.environment = environment;
        }
    }

    /// Add a render object to the scene
    pub fn add(&mut self, object: RenderObject) -> usize {
        let id = self.objects.len();
        self.objects.push(object);
        id
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut RenderObject> {
        self.objects.get_mut(id)
    }

    /// Background color, if the background is a plain color
    pub fn background_color(&self) -> Option<Vec4> {
        match self.background {
            Some(Background::Color(color)) => Some(color),
            _ => None,
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
