pub mod egui_host;
mod frame_loop;
mod input;
mod timing;

use crate::assets::{AssetError, FileAssetSource};
use crate::config::AppConfig;
use crate::editor::Editor;
use crate::render::{GpuRenderer, HeadlessRenderer, RenderBackend};
use crate::ui::{ControlPanel, PanelActions, PanelStatus};
use egui_host::EguiHost;
use frame_loop::FrameLoop;
use input::{PointerDrag, PointerState};

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Modifiers, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("cannot resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    egui: Option<EguiHost>,
    editor: Editor,
    /// Headless until a window and GPU device exist.
    backend: Box<dyn RenderBackend>,
    panel: ControlPanel,
    frame_loop: FrameLoop,
    pointer: PointerState,
    modifiers: Modifiers,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    fn new(config: AppConfig, editor: Editor) -> Self {
        let backend = Box::new(HeadlessRenderer::new(
            config.window.width,
            config.window.height,
        ));
        let frame_loop = FrameLoop::new(config.window.title.clone());
        Self {
            config,
            window: None,
            egui: None,
            editor,
            backend,
            panel: ControlPanel::new(),
            frame_loop,
            pointer: PointerState::default(),
            modifiers: Modifiers::default(),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        self.editor.camera_mut().set_aspect(size.width, size.height);
        self.backend.resize(size.width, size.height);
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(millihz) = window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz())
        {
            let hz = millihz as f32 / 1000.0;
            if hz > 1.0 {
                target = Duration::from_secs_f32(1.0 / hz);
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn upload(&mut self, path: &Path) {
        if let Err(err) = self.editor.upload_texture(path) {
            log::warn!("Cannot load {}: {}", path.display(), err);
        }
    }

    fn handle_panel_actions(&mut self, actions: PanelActions) {
        if actions.reset {
            self.editor.reset_all();
        }
        if actions.upload_image {
            let Some(path) = rfd::FileDialog::new()
                .add_filter("Images", &IMAGE_EXTENSIONS)
                .pick_file()
            else {
                return;
            };
            self.upload(&path);
        }
    }

    fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                let drag = if self.modifiers.state().shift_key() && self.editor.begin_gizmo_drag() {
                    PointerDrag::Gizmo
                } else {
                    PointerDrag::Orbit
                };
                self.pointer.begin(drag);
            }
            ElementState::Released => {
                if self.pointer.release() == PointerDrag::Gizmo {
                    self.editor.end_gizmo_drag();
                }
            }
        }
    }

    fn handle_cursor(&mut self, x: f32, y: f32) {
        match self.pointer.moved(x, y) {
            Some((PointerDrag::Orbit, delta)) => {
                self.editor.camera_mut().orbit(delta.x, delta.y);
            }
            Some((PointerDrag::Gizmo, delta)) => self.editor.drag_gizmo(delta),
            Some((PointerDrag::Idle, _)) | None => {}
        }
    }

    fn redraw(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let now = Instant::now();

        let mut actions = PanelActions::default();
        let ui_output = self.egui.as_mut().map(|egui| {
            let mut snapshot = self.editor.settings().clone();
            let status = PanelStatus {
                gizmo: self.editor.gizmo_state(),
                pending_loads: self.editor.pending_loads(),
                animation: self
                    .editor
                    .animation()
                    .map(|player| (player.time(), player.is_finished())),
            };
            let panel = &mut self.panel;
            let output = egui.run_ui(&window, |ctx| {
                actions = panel.show(ctx, &mut snapshot, &status);
            });
            if !panel.edited().is_empty() {
                log::debug!("Panel edited {:?}", panel.edited());
            }
            let changed = self.editor.apply_settings(snapshot);
            if !changed.is_empty() {
                log::debug!("Settings changed {:?}", changed);
            }
            output
        });
        self.handle_panel_actions(actions);

        if let Some(output) = ui_output {
            self.backend.submit_ui(output);
        }
        let report = self
            .frame_loop
            .tick(&mut self.editor, self.backend.as_mut(), now);
        if let Some(title) = report.title {
            window.set_title(&title);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        match GpuRenderer::new(window.clone()) {
            Ok(renderer) => {
                log::info!("GPU renderer ready");
                self.backend = Box::new(renderer);
            }
            Err(err) => log::warn!("GPU renderer unavailable, drawing headless: {}", err),
        }
        self.egui = Some(EguiHost::new(&window));
        self.handle_resize(window.inner_size());
        self.update_target_frame_duration(&window);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let ui_consumed = match (&mut self.egui, &self.window) {
            (Some(egui), Some(window)) => egui.on_window_event(window, &event),
            _ => false,
        };
        let pointer_on_panel = self
            .egui
            .as_ref()
            .map(|egui| egui.wants_pointer())
            .unwrap_or(false);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !ui_consumed && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("Escape pressed, shutting down...");
                    event_loop.exit();
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers;
            }
            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                self.handle_resize(size);
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::DroppedFile(path) => {
                log::info!("File dropped: {}", path.display());
                self.upload(&path);
            }
            WindowEvent::CursorMoved { position, .. } => {
                // An active drag keeps going even over the panel.
                if self.pointer.drag() != PointerDrag::Idle || !ui_consumed {
                    self.handle_cursor(position.x as f32, position.y as f32);
                }
            }
            WindowEvent::CursorLeft { .. } => self.pointer.left_window(),
            WindowEvent::MouseInput { state, button, .. } => {
                let releasing = state == ElementState::Released;
                if releasing || !(ui_consumed || pointer_on_panel) {
                    self.handle_mouse_button(button, state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !(ui_consumed || pointer_on_panel) {
                    self.editor.camera_mut().zoom(input::wheel_lines(delta));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("shapelab starting");
    log::info!("   Drag to orbit, Shift+drag to use the gizmo, ESC to exit");

    let config = AppConfig::load_or_default();
    let root = std::env::current_dir().map_err(AppError::WorkingDir)?;
    let editor = Editor::new(&config, Arc::new(FileAssetSource::new(root)))?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, editor);
    event_loop.run_app(&mut app)?;

    log::info!("Goodbye!");
    Ok(())
}
