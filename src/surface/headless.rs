//! Offscreen surface that records what it was asked to draw

use super::{physical_size, RenderSurface, SurfaceConfig, SurfaceError, SurfaceResult};
use crate::scene::{Camera, Scene};
use glam::{Mat4, Vec4};

/// One `render` call as seen by a [`HeadlessSurface`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord {
    /// Physical size of the target at draw time
    pub physical_size: (u32, u32),
    pub clear_color: Vec4,
    pub object_count: usize,
    pub view_projection: Mat4,
}

/// Surface with no GPU behind it
///
/// Useful for offscreen sessions and for checking what a session does
/// without a window.
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    pixel_ratio: f64,
    attached: bool,
    clear_color: Vec4,
    log: Vec<RenderRecord>,
    fail_next: Option<SurfaceError>,
}

impl HeadlessSurface {
    pub fn renders(&self) -> &[RenderRecord] {
        &self.log
    }

    pub fn render_count(&self) -> usize {
        self.log.len()
    }

    pub fn physical_size(&self) -> (u32, u32) {
        physical_size(self.width, self.height, self.pixel_ratio)
    }

    /// Make the next `render` fail with `error`
    pub fn fail_next_render(&mut self, error: SurfaceError) {
        self.fail_next = Some(error);
    }
}

impl RenderSurface for HeadlessSurface {
    type Canvas = ();

    fn create(config: SurfaceConfig<()>) -> SurfaceResult<Self> {
        Ok(Self {
            width: 1,
            height: 1,
            pixel_ratio: 1.0,
            attached: config.canvas.is_some(),
            clear_color: config.clear_color,
            log: Vec::new(),
            fail_next: None,
        })
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn attach(&mut self) -> SurfaceResult<()> {
        self.attached = true;
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> SurfaceResult<()> {
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }

        self.log.push(RenderRecord {
            physical_size: self.physical_size(),
            clear_color: scene.background_color().unwrap_or(self.clear_color),
            object_count: scene.objects.len(),
            view_projection: camera.view_projection_matrix(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Background, RenderObject};

    #[test]
    fn records_scene_background_over_config_clear() {
        let mut surface = HeadlessSurface::create(SurfaceConfig::default()).unwrap();
        surface.set_pixel_ratio(2.0);
        surface.set_size(320, 240);

        let mut scene = Scene::new();
        scene.add(RenderObject::new(0, 0));
        surface.render(&scene, &Camera::default()).unwrap();

        scene.background = Some(Background::Color(Vec4::ONE));
        surface.render(&scene, &Camera::default()).unwrap();

        let log = surface.renders();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].physical_size, (640, 480));
        assert_eq!(log[0].clear_color, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(log[0].object_count, 1);
        assert_eq!(log[1].clear_color, Vec4::ONE);
    }

    #[test]
    fn supplied_canvas_counts_as_attached() {
        let surface = HeadlessSurface::create(SurfaceConfig::default().with_canvas(())).unwrap();
        assert!(surface.is_attached());
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let mut surface = HeadlessSurface::create(SurfaceConfig::default()).unwrap();
        surface.fail_next_render(SurfaceError::SurfaceLost);
        let scene = Scene::new();
        assert!(matches!(
            surface.render(&scene, &Camera::default()),
            Err(SurfaceError::SurfaceLost)
        ));
        assert!(surface.render(&scene, &Camera::default()).is_ok());
    }
}
