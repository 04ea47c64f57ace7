use glam::Vec2;
use winit::event::MouseScrollDelta;

const PIXELS_PER_LINE: f32 = 50.0;

/// What a held left button is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerDrag {
    #[default]
    Idle,
    Orbit,
    Gizmo,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PointerState {
    position: Option<Vec2>,
    drag: PointerDrag,
}

impl PointerState {
    pub fn drag(&self) -> PointerDrag {
        self.drag
    }

    pub fn begin(&mut self, drag: PointerDrag) {
        self.drag = drag;
    }

    /// Ends any drag and reports what it was.
    pub fn release(&mut self) -> PointerDrag {
        std::mem::take(&mut self.drag)
    }

    /// Records a new cursor position and returns the movement since the last
    /// one while a drag is active.
    pub fn moved(&mut self, x: f32, y: f32) -> Option<(PointerDrag, Vec2)> {
        let position = Vec2::new(x, y);
        let previous = self.position.replace(position);
        match (self.drag, previous) {
            (PointerDrag::Idle, _) | (_, None) => None,
            (drag, Some(previous)) => Some((drag, position - previous)),
        }
    }

    pub fn left_window(&mut self) {
        self.position = None;
    }
}

/// Wheel motion in lines, positive away from the user.
pub fn wheel_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
    }
}
