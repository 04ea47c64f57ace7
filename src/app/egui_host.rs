use egui_winit::winit::event::WindowEvent;
use winit::window::Window;

/// Tessellated UI for one frame, handed to the render backend.
pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
    pub screen_size_px: [u32; 2],
}

/// Bridges winit events into egui and runs the panel each frame.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self {
            context,
            winit_state,
        }
    }

    /// Returns `true` when the panel took the event and the scene should not
    /// see it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn wants_pointer(&self) -> bool {
        self.context.wants_pointer_input() || self.context.is_pointer_over_area()
    }

    pub fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, output.platform_output);
        let pixels_per_point = output.pixels_per_point;
        let size = window.inner_size();
        EguiFrameOutput {
            clipped_primitives: self.context.tessellate(output.shapes, pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point,
            screen_size_px: [size.width.max(1), size.height.max(1)],
        }
    }
}
