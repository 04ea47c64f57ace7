use super::timing::FrameTiming;
use crate::editor::Editor;
use crate::render::{RenderBackend, RenderError};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct FrameReport {
    pub loads_applied: usize,
    pub captured: bool,
    pub title: Option<String>,
}

/// Per-refresh update order: finished loads, object spin, light orbit,
/// animation, render, environment capture.
pub struct FrameLoop {
    timing: FrameTiming,
}

impl FrameLoop {
    pub fn new(base_title: String) -> Self {
        Self {
            timing: FrameTiming::new(base_title),
        }
    }

    /// One frame at `now`. Render failures are logged; the next frame tries
    /// again.
    pub fn tick(
        &mut self,
        editor: &mut Editor,
        backend: &mut dyn RenderBackend,
        now: Instant,
    ) -> FrameReport {
        let title = self.timing.update(now);
        let started = Instant::now();
        let report = match step(editor, backend, self.timing.frame_dt) {
            Ok(report) => report,
            // A minimized window would otherwise warn on every refresh.
            Err(err) if err.is_transient() => {
                log::trace!("Frame skipped: {}", err);
                FrameReport::default()
            }
            Err(err) => {
                log::warn!("Frame skipped: {}", err);
                FrameReport::default()
            }
        };
        if report.loads_applied > 0 || report.captured {
            log::debug!(
                "Frame applied {} loads, captured environment: {}",
                report.loads_applied,
                report.captured
            );
        }
        self.timing
            .set_render_ms(started.elapsed().as_secs_f32() * 1000.0);
        FrameReport { title, ..report }
    }
}

pub fn step(
    editor: &mut Editor,
    backend: &mut dyn RenderBackend,
    dt: f32,
) -> Result<FrameReport, RenderError> {
    let loads_applied = editor.process_loads();
    editor.autorotate_object();
    editor.orbit_light();
    editor.advance_animation(dt);

    backend.render(editor.scene(), editor.camera())?;

    let mut captured = false;
    if editor.uses_environment_capture() {
        if let Some(node) = editor.primary().and_then(|id| editor.scene().get(id)) {
            backend.refresh_environment_capture(editor.scene(), node.transform.position)?;
            captured = true;
        }
    }
    Ok(FrameReport {
        loads_applied,
        captured,
        title: None,
    })
}
