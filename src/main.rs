//! shapelab - a single-object scene playground.
//!
//! One primary object, one light, a floor and axes, all driven by a live
//! settings panel:
//! - shapes, materials and lights are swapped in place as settings change
//! - models and textures load on a worker thread
//! - a transform gizmo and a fixed keyframe clip act on the object

mod app;
mod assets;
mod config;
mod editor;
mod render;
mod scene;
mod settings;
mod ui;

fn main() {
    if let Err(err) = app::run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
