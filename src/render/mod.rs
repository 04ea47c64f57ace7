pub mod camera;
mod gpu;
mod tessellate;

pub use gpu::GpuRenderer;

use crate::app::egui_host::EguiFrameOutput;
use crate::scene::lights::LightKind;
use crate::scene::materials::{Material, Rgb};
use crate::scene::shapes::Geometry;
use crate::scene::{NodeId, NodeKind, SceneGraph};
use camera::OrbitCamera;
use glam::{Mat4, Vec3};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("output surface has zero size")]
    EmptySurface,
    #[error("surface was lost and has been reconfigured")]
    SurfaceLost,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("cannot create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("cannot open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no texture formats")]
    NoSurfaceFormat,
}

impl RenderError {
    /// Errors the next frame gets past on its own, such as a minimized window.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RenderError::EmptySurface
                | RenderError::SurfaceLost
                | RenderError::Surface(wgpu::SurfaceError::Timeout)
        )
    }
}

/// One visible mesh, ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub model: Mat4,
    pub geometry: Arc<Geometry>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// Light as seen by a backend, already resolved to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightItem {
    pub node: NodeId,
    pub kind: LightKind,
    pub position: Vec3,
    pub color: Rgb,
    pub intensity: f32,
    pub range: f32,
    pub cast_shadow: bool,
    /// Set when the helper should be drawn.
    pub helper_color: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridItem {
    pub node: NodeId,
    pub model: Mat4,
    pub size: f32,
    pub divisions: u32,
}

/// Everything a backend needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDraws {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub meshes: Vec<DrawItem>,
    pub lights: Vec<LightItem>,
    pub grids: Vec<GridItem>,
}

impl FrameDraws {
    /// Flattens the visible part of `scene`. Hidden nodes are skipped.
    pub fn collect(scene: &SceneGraph, camera: &OrbitCamera) -> Self {
        let mut draws = FrameDraws {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            eye: camera.eye(),
            ..FrameDraws::default()
        };
        for node in scene.nodes().iter().filter(|node| node.visible) {
            match &node.kind {
                NodeKind::Mesh(mesh) => draws.meshes.push(DrawItem {
                    node: node.id,
                    model: node.transform.matrix(),
                    geometry: mesh.geometry.clone(),
                    material: mesh.material.clone(),
                    cast_shadow: node.cast_shadow,
                    receive_shadow: node.receive_shadow,
                }),
                NodeKind::Light(light) => draws.lights.push(LightItem {
                    node: node.id,
                    kind: light.kind,
                    position: node.transform.position,
                    color: light.color,
                    intensity: light.intensity,
                    range: light.range,
                    cast_shadow: light.cast_shadow,
                    helper_color: light
                        .helper
                        .filter(|helper| helper.visible)
                        .map(|helper| helper.color),
                }),
                NodeKind::Grid(grid) => draws.grids.push(GridItem {
                    node: node.id,
                    model: node.transform.matrix(),
                    size: grid.size,
                    divisions: grid.divisions,
                }),
            }
        }
        draws
    }
}

/// Two-tone stand-in for a reflection cube map: what lies above and below
/// the capture point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Environment {
    pub sky: Rgb,
    pub ground: Rgb,
}

impl Environment {
    /// Sky is the sum of the visible lights, ground the mean colour of the
    /// visible meshes sitting below `origin`.
    pub fn capture(scene: &SceneGraph, origin: Vec3) -> Self {
        let sky = scene
            .lights()
            .filter(|node| node.visible)
            .filter_map(|node| node.light())
            .fold(Vec3::ZERO, |sky, light| {
                sky + Vec3::from_array(light.color) * light.intensity.min(1.0)
            });
        let below: Vec<Vec3> = scene
            .nodes()
            .iter()
            .filter(|node| node.visible && node.transform.position.y < origin.y)
            .filter_map(|node| node.mesh())
            .map(|mesh| Vec3::from_array(mesh.material.color))
            .collect();
        let ground = if below.is_empty() {
            Vec3::ZERO
        } else {
            below.iter().sum::<Vec3>() / below.len() as f32
        };
        Self {
            sky: sky.min(Vec3::ONE).to_array(),
            ground: ground.to_array(),
        }
    }
}

/// Rasterizer behind the frame loop.
pub trait RenderBackend {
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, scene: &SceneGraph, camera: &OrbitCamera) -> Result<(), RenderError>;

    /// Re-renders the surroundings of `origin` into the reflection map.
    fn refresh_environment_capture(
        &mut self,
        scene: &SceneGraph,
        origin: Vec3,
    ) -> Result<(), RenderError>;

    /// Panel output to draw over the next rendered frame.
    fn submit_ui(&mut self, ui: EguiFrameOutput);
}

/// Backend that only records what it was asked to draw. Used until a GPU
/// surface exists, when none can be created, and by tests.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    size: [u32; 2],
    frames: u64,
    captures: u64,
    ui_primitives: usize,
    last_frame: Option<FrameDraws>,
}

impl HeadlessRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: [width, height],
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[cfg(test)]
    pub fn captures(&self) -> u64 {
        self.captures
    }

    #[cfg(test)]
    pub fn ui_primitives(&self) -> usize {
        self.ui_primitives
    }

    #[cfg(test)]
    pub fn last_frame(&self) -> Option<&FrameDraws> {
        self.last_frame.as_ref()
    }
}

impl RenderBackend for HeadlessRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Headless surface resized to {}x{}", width, height);
        self.size = [width, height];
    }

    fn render(&mut self, scene: &SceneGraph, camera: &OrbitCamera) -> Result<(), RenderError> {
        if self.size[0] == 0 || self.size[1] == 0 {
            return Err(RenderError::EmptySurface);
        }
        let draws = FrameDraws::collect(scene, camera);
        log::trace!(
            "Frame {}: {} meshes, {} lights, {} grids, {} UI primitives",
            self.frames,
            draws.meshes.len(),
            draws.lights.len(),
            draws.grids.len(),
            self.ui_primitives
        );
        self.last_frame = Some(draws);
        self.frames += 1;
        Ok(())
    }

    fn refresh_environment_capture(
        &mut self,
        scene: &SceneGraph,
        origin: Vec3,
    ) -> Result<(), RenderError> {
        let environment = Environment::capture(scene, origin);
        log::trace!("Environment at {}: {:?}", origin, environment);
        self.captures += 1;
        Ok(())
    }

    fn submit_ui(&mut self, ui: EguiFrameOutput) {
        self.ui_primitives = ui.clipped_primitives.len();
    }
}
