//! Control panel: one widget per settings field, grouped by category.

use crate::editor::gizmo::GizmoState;
use crate::settings::{Category, Field, Settings, Value};

const CATEGORIES: [(Category, &str); 5] = [
    (Category::Common, "Common"),
    (Category::Geometry, "Geometry"),
    (Category::Light, "Light"),
    (Category::Affine, "Affine"),
    (Category::Animation, "Animation"),
];

/// Read-only facts shown under the folders.
#[derive(Debug, Clone, Copy)]
pub struct PanelStatus {
    pub gizmo: GizmoState,
    pub pending_loads: usize,
    /// Playback time and whether a non-looping clip has ended.
    pub animation: Option<(f32, bool)>,
}

/// Buttons pressed this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelActions {
    pub reset: bool,
    pub upload_image: bool,
}

#[derive(Debug, Default)]
pub struct ControlPanel {
    /// Fields the user touched this frame; handy for logging.
    edited: Vec<Field>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edited(&self) -> &[Field] {
        &self.edited
    }

    /// Draws the panel, writing edits straight into `settings`.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        settings: &mut Settings,
        status: &PanelStatus,
    ) -> PanelActions {
        self.edited.clear();
        let mut actions = PanelActions::default();
        egui::Window::new("Controls")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                for (category, title) in CATEGORIES {
                    egui::CollapsingHeader::new(title)
                        .default_open(category == Category::Geometry)
                        .show(ui, |ui| {
                            for field in Field::ALL.into_iter().filter(|f| f.category() == category)
                            {
                                if field_widget(ui, settings, field) {
                                    self.edited.push(field);
                                }
                            }
                        });
                }
                ui.separator();
                ui.horizontal(|ui| {
                    actions.reset = ui.button("Reset all").clicked();
                    actions.upload_image = ui.button("Upload image").clicked();
                });
                ui.label(format!("Gizmo: {:?}", status.gizmo));
                if let Some((time, finished)) = status.animation {
                    let state = if finished { "finished" } else { "playing" };
                    ui.label(format!("Animation: {:.2}s ({})", time, state));
                }
                if status.pending_loads > 0 {
                    ui.label(format!("Loading {} asset(s)...", status.pending_loads));
                }
            });
        actions
    }
}

/// Shows the widget for `field`; returns `true` when the value changed.
fn field_widget(ui: &mut egui::Ui, settings: &mut Settings, field: Field) -> bool {
    let label = field.name();
    let edited = match settings.get(field) {
        Value::Number(mut number) => {
            let range = field.range().unwrap_or(0.0..=1.0);
            let mut slider = egui::Slider::new(&mut number, range).text(label);
            if let Some(step) = field.step() {
                slider = slider.step_by(step);
            }
            ui.add(slider).changed().then_some(Value::Number(number))
        }
        Value::Bool(mut flag) => ui
            .checkbox(&mut flag, label)
            .changed()
            .then_some(Value::Bool(flag)),
        Value::Color(mut color) => ui
            .horizontal(|ui| {
                let changed = ui.color_edit_button_rgb(&mut color).changed();
                ui.label(label);
                changed
            })
            .inner
            .then_some(Value::Color(color)),
        Value::Choice(current) => {
            let mut selected = current.clone();
            egui::ComboBox::from_id_salt((field.category().name(), label))
                .selected_text(selected.clone())
                .show_ui(ui, |ui| {
                    for option in field.options() {
                        ui.selectable_value(&mut selected, option.to_string(), option);
                    }
                });
            ui.label(label);
            (selected != current).then_some(Value::Choice(selected))
        }
    };
    match edited.map(|value| settings.set(field, value)) {
        Some(Ok(changed)) => changed,
        Some(Err(err)) => {
            log::debug!("Panel edit rejected: {}", err);
            false
        }
        None => false,
    }
}
