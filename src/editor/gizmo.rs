use crate::scene::{NodeId, SceneGraph};
use crate::settings::AffineMode;
use glam::{Quat, Vec2, Vec3};

const TRANSLATE_PER_PIXEL: f32 = 0.005;
const ROTATE_PER_PIXEL: f32 = 0.01;
const SCALE_PER_PIXEL: f32 = 0.005;
const MIN_SCALE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoState {
    Detached,
    Translate,
    Rotate,
    Scale,
}

impl GizmoState {
    pub fn for_mode(mode: AffineMode) -> Self {
        match mode {
            AffineMode::None => GizmoState::Detached,
            AffineMode::Translate => GizmoState::Translate,
            AffineMode::Rotate => GizmoState::Rotate,
            AffineMode::Scale => GizmoState::Scale,
        }
    }
}

/// Pointer motion for one drag step, with the camera basis it happened in.
#[derive(Debug, Clone, Copy)]
pub struct DragInput {
    pub delta_px: Vec2,
    pub camera_right: Vec3,
    pub camera_up: Vec3,
}

/// Transform handle attached to at most one node.
#[derive(Debug, Clone)]
pub struct TransformGizmo {
    state: GizmoState,
    target: Option<NodeId>,
    dragging: bool,
}

impl Default for TransformGizmo {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformGizmo {
    pub fn new() -> Self {
        Self {
            state: GizmoState::Detached,
            target: None,
            dragging: false,
        }
    }

    pub fn state(&self) -> GizmoState {
        self.state
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Brings attachment in line with `mode` for `primary`.
    pub fn sync(&mut self, mode: AffineMode, primary: Option<NodeId>) {
        let state = GizmoState::for_mode(mode);
        match (state, primary) {
            (GizmoState::Detached, _) | (_, None) => self.detach(),
            (state, Some(node)) => {
                if self.target != Some(node) || self.state != state {
                    log::debug!("Gizmo {:?} attached to {:?}", state, node);
                }
                self.state = state;
                self.target = Some(node);
            }
        }
    }

    pub fn detach(&mut self) {
        if self.target.is_some() {
            log::debug!("Gizmo detached");
        }
        self.state = GizmoState::Detached;
        self.target = None;
        self.dragging = false;
    }

    /// Returns `true` when a drag actually started.
    pub fn begin_drag(&mut self) -> bool {
        if self.target.is_none() {
            return false;
        }
        self.dragging = true;
        true
    }

    /// Returns `true` when a drag was in progress.
    pub fn end_drag(&mut self) -> bool {
        std::mem::replace(&mut self.dragging, false)
    }

    pub fn drag(&self, scene: &mut SceneGraph, input: DragInput) {
        if !self.dragging {
            return;
        }
        let Some(node) = self.target.and_then(|id| scene.get_mut(id)) else {
            return;
        };
        let DragInput {
            delta_px,
            camera_right,
            camera_up,
        } = input;
        let transform = &mut node.transform;
        match self.state {
            GizmoState::Detached => {}
            GizmoState::Translate => {
                transform.position += (camera_right * delta_px.x - camera_up * delta_px.y)
                    * TRANSLATE_PER_PIXEL;
            }
            GizmoState::Rotate => {
                let yaw = Quat::from_axis_angle(
                    camera_up.normalize_or_zero(),
                    delta_px.x * ROTATE_PER_PIXEL,
                );
                let pitch = Quat::from_axis_angle(
                    camera_right.normalize_or_zero(),
                    delta_px.y * ROTATE_PER_PIXEL,
                );
                let spin = yaw * pitch;
                transform.rotation = (spin * transform.rotation).normalize();
            }
            GizmoState::Scale => {
                let factor = 1.0 + (delta_px.x - delta_px.y) * SCALE_PER_PIXEL;
                transform.scale = (transform.scale * factor).max(Vec3::splat(MIN_SCALE));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{GridHelper, NodeKind, Transform};

    fn scene() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let id = scene.add(
            "object",
            NodeKind::Grid(GridHelper {
                size: 1.0,
                divisions: 1,
            }),
            Transform::default(),
        );
        (scene, id)
    }

    fn input(x: f32, y: f32) -> DragInput {
        DragInput {
            delta_px: Vec2::new(x, y),
            camera_right: Vec3::X,
            camera_up: Vec3::Y,
        }
    }

    #[test]
    fn sync_follows_mode() {
        let (_, id) = scene();
        let mut gizmo = TransformGizmo::new();
        for mode in [AffineMode::Translate, AffineMode::Rotate, AffineMode::Scale] {
            gizmo.sync(mode, Some(id));
            assert_eq!(gizmo.state(), GizmoState::for_mode(mode));
            assert_eq!(gizmo.target(), Some(id));
        }
        gizmo.sync(AffineMode::None, Some(id));
        assert_eq!(gizmo.state(), GizmoState::Detached);
        assert!(!gizmo.is_attached());
    }

    #[test]
    fn no_target_means_detached() {
        let mut gizmo = TransformGizmo::new();
        gizmo.sync(AffineMode::Rotate, None);
        assert_eq!(gizmo.state(), GizmoState::Detached);
        assert!(!gizmo.begin_drag());
    }

    #[test]
    fn translate_moves_in_view_plane() {
        let (mut scene, id) = scene();
        let mut gizmo = TransformGizmo::new();
        gizmo.sync(AffineMode::Translate, Some(id));
        assert!(gizmo.begin_drag());
        gizmo.drag(&mut scene, input(100.0, -100.0));
        let position = scene.get(id).unwrap().transform.position;
        assert!(position.abs_diff_eq(Vec3::new(0.5, 0.5, 0.0), 1e-5));
        assert!(gizmo.end_drag());
        assert!(!gizmo.end_drag());
    }

    #[test]
    fn drag_without_begin_does_nothing() {
        let (mut scene, id) = scene();
        let mut gizmo = TransformGizmo::new();
        gizmo.sync(AffineMode::Scale, Some(id));
        gizmo.drag(&mut scene, input(50.0, 0.0));
        assert_eq!(scene.get(id).unwrap().transform, Transform::default());
    }

    #[test]
    fn scale_never_collapses() {
        let (mut scene, id) = scene();
        let mut gizmo = TransformGizmo::new();
        gizmo.sync(AffineMode::Scale, Some(id));
        gizmo.begin_drag();
        gizmo.drag(&mut scene, input(-10_000.0, 0.0));
        assert_eq!(scene.get(id).unwrap().transform.scale, Vec3::splat(MIN_SCALE));
    }

    #[test]
    fn rotate_spins_about_camera_up() {
        let (mut scene, id) = scene();
        let mut gizmo = TransformGizmo::new();
        gizmo.sync(AffineMode::Rotate, Some(id));
        gizmo.begin_drag();
        gizmo.drag(&mut scene, input(100.0, 0.0));
        let rotation = scene.get(id).unwrap().transform.rotation;
        assert!(rotation.abs_diff_eq(Quat::from_rotation_y(1.0), 1e-5));
    }

    #[test]
    fn detach_cancels_drag() {
        let (_, id) = scene();
        let mut gizmo = TransformGizmo::new();
        gizmo.sync(AffineMode::Translate, Some(id));
        gizmo.begin_drag();
        gizmo.detach();
        assert!(!gizmo.is_dragging());
    }
}
