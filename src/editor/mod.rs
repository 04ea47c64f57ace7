//! Editor context: owns the settings, the scene graph and everything that
//! reacts to a settings change.

pub mod animation;
pub mod gizmo;

use crate::assets::{
    AssetError, AssetLoader, AssetSource, LoadOutcome, LoadRequest, LoadSlot, LoadTicket,
    LoadedAsset, TexturePurpose,
};
use crate::config::{AppConfig, AssetCatalog, MotionConstants};
use crate::render::camera::OrbitCamera;
use crate::scene::lights::Light;
use crate::scene::materials::{rgb_from_hex, Material, Shading, TextureImage, CURVE_RED};
use crate::scene::shapes::{Geometry, GeometrySource, Shape};
use crate::scene::{
    GridHelper, Mesh, NodeId, NodeKind, SceneGraph, Transform, AXES_TAG, FLOOR_TAG, LIGHT_TAG,
    OBJECT_TAG,
};
use crate::settings::{AnimationMode, Field, Settings, SettingsError, Value};
use animation::AnimationPlayer;
use gizmo::{DragInput, GizmoState, TransformGizmo};
use glam::{Quat, Vec2, Vec3};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

const CAMERA_START: Vec3 = Vec3::new(0.0, 0.0, 2.0);
const FLOOR_SIZE: f32 = 5.0;
const FLOOR_COLOR: u32 = 0x222222;
const FLOOR_HEIGHT: f32 = -0.6;
const AXES_SIZE: f32 = 100.0;
const AXES_DIVISIONS: u32 = 2;

/// How the primary object should change.
#[derive(Debug, Clone)]
pub enum ObjectChange {
    /// New node with a fresh transform.
    Geometry {
        geometry: Arc<Geometry>,
        material: Material,
    },
    /// Same node, transform untouched.
    MaterialOnly(Material),
}

/// Texture queued for the material slot and not back yet.
struct PendingTexture {
    ticket: LoadTicket,
    source: String,
    upload: bool,
}

pub struct Editor {
    settings: Settings,
    catalog: AssetCatalog,
    motion: MotionConstants,
    scene: SceneGraph,
    camera: OrbitCamera,
    floor: NodeId,
    axes: NodeId,
    primary: Option<NodeId>,
    light: Option<NodeId>,
    gizmo: TransformGizmo,
    animation: Option<AnimationPlayer>,
    loader: AssetLoader,
    textures: HashMap<String, Arc<TextureImage>>,
    models: HashMap<Shape, Arc<Geometry>>,
    upload: Option<String>,
    pending_texture: Option<PendingTexture>,
    light_angle: f32,
}

impl Editor {
    pub fn new(config: &AppConfig, source: Arc<dyn AssetSource>) -> Result<Self, AssetError> {
        let settings = Settings::default();
        let loader = AssetLoader::new(source)?;
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
        let camera = OrbitCamera::new(
            CAMERA_START,
            aspect,
            settings.common.near,
            settings.common.far,
        );

        let mut scene = SceneGraph::new();
        let floor = scene.add(
            FLOOR_TAG,
            NodeKind::Mesh(Mesh {
                geometry: Arc::new(Geometry::Plane {
                    width: FLOOR_SIZE,
                    height: FLOOR_SIZE,
                    width_segments: 1,
                    height_segments: 1,
                }),
                material: Material::new(Shading::Standard, rgb_from_hex(FLOOR_COLOR)),
            }),
            Transform {
                position: Vec3::new(0.0, FLOOR_HEIGHT, 0.0),
                rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                scale: Vec3::ONE,
            },
        );
        let axes = scene.add(
            AXES_TAG,
            NodeKind::Grid(GridHelper {
                size: AXES_SIZE,
                divisions: AXES_DIVISIONS,
            }),
            Transform::default(),
        );

        let mut editor = Self {
            settings,
            catalog: config.assets.clone(),
            motion: config.motion,
            scene,
            camera,
            floor,
            axes,
            primary: None,
            light: None,
            gizmo: TransformGizmo::new(),
            animation: None,
            loader,
            textures: HashMap::new(),
            models: HashMap::new(),
            upload: None,
            pending_texture: None,
            light_angle: 0.0,
        };
        editor.rebuild_all();
        editor.apply_overrides(&config.settings);
        log::info!(
            "Editor ready: {} nodes, shape {:?}",
            editor.scene.len(),
            editor.settings.geometry.shape
        );
        Ok(editor)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn primary(&self) -> Option<NodeId> {
        self.primary
    }

    #[cfg(test)]
    pub fn light(&self) -> Option<NodeId> {
        self.light
    }

    #[cfg(test)]
    pub fn gizmo(&self) -> &TransformGizmo {
        &self.gizmo
    }

    pub fn animation(&self) -> Option<&AnimationPlayer> {
        self.animation.as_ref()
    }

    #[cfg(test)]
    pub fn light_angle(&self) -> f32 {
        self.light_angle
    }

    pub fn pending_loads(&self) -> usize {
        self.loader.in_flight()
    }

    /// Sets one field and runs its effect if the value changed.
    pub fn set(&mut self, field: Field, value: Value) -> Result<bool, SettingsError> {
        let changed = self.settings.set(field, value).map_err(|err| {
            log::debug!("Rejected {}.{}: {}", field.category().name(), field.name(), err);
            err
        })?;
        if changed {
            self.apply_field(field);
        }
        Ok(changed)
    }

    pub fn set_named(
        &mut self,
        category: &str,
        name: &str,
        value: Value,
    ) -> Result<bool, SettingsError> {
        let field = crate::settings::resolve(category, name).map_err(|err| {
            log::debug!("{}", err);
            err
        })?;
        self.set(field, value)
    }

    /// Applies `"category.field"` overrides from the config file. Bad entries
    /// are logged and skipped; returns how many changed a setting.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, serde_json::Value>) -> usize {
        let mut applied = 0;
        for (key, json) in overrides {
            let Some((category, name)) = key.split_once('.') else {
                log::warn!("Setting {:?} is not of the form category.field", key);
                continue;
            };
            let Some(value) = Value::from_json(json) else {
                log::warn!("Setting {} has an unsupported value {}", key, json);
                continue;
            };
            match self.set_named(category, name, value) {
                Ok(changed) => applied += changed as usize,
                Err(err) => log::warn!("Ignoring setting {}: {}", key, err),
            }
        }
        applied
    }

    /// Replaces the settings with `snapshot` and runs the effect of every
    /// changed field once, in field order. Returns the changed fields.
    pub fn apply_settings(&mut self, snapshot: Settings) -> Vec<Field> {
        let changed = self.settings.diff(&snapshot);
        if changed.is_empty() {
            return changed;
        }
        self.settings = snapshot;
        let mut rebuilt = false;
        for &field in &changed {
            if field == Field::Shape {
                rebuilt = self.rebuild_geometry();
                continue;
            }
            // A rebuilt object already carries the current colour and material.
            if rebuilt && matches!(field, Field::Color | Field::Material) {
                continue;
            }
            self.apply_field(field);
        }
        changed
    }

    fn apply_field(&mut self, field: Field) {
        log::debug!(
            "Apply {}.{} = {:?}",
            field.category().name(),
            field.name(),
            self.settings.get(field)
        );
        match field {
            Field::Scale => {
                let scale = Vec3::splat(self.settings.common.scale);
                self.with_rest_pose(|editor| {
                    if let Some(node) = editor.primary.and_then(|id| editor.scene.get_mut(id)) {
                        node.transform.scale = scale;
                    }
                });
            }
            Field::ShowAxes => {
                let visible = self.settings.common.show_axes;
                if let Some(node) = self.scene.get_mut(self.axes) {
                    node.visible = visible;
                }
            }
            Field::AutoRotate | Field::LightAutoRotate => {}
            Field::Near | Field::Far => {
                let common = &self.settings.common;
                self.camera.set_clip(common.near, common.far);
            }
            Field::Shape => {
                self.rebuild_geometry();
            }
            Field::Color | Field::Material => self.rebuild_material(),
            Field::LightType => self.rebuild_light(),
            Field::LightEnable => {
                let enable = self.settings.light.enable;
                if let Some(node) = self.light_node_mut() {
                    node.visible = enable;
                }
            }
            Field::LightShadow => self.apply_shadows(),
            Field::LightX | Field::LightY | Field::LightZ => {
                let position = Vec3::from_array(self.settings.light.position);
                if let Some(node) = self.light_node_mut() {
                    node.transform.position = position;
                }
            }
            Field::Intensity => {
                let intensity = self.settings.light.intensity;
                if let Some(light) = self.light_node_mut().and_then(|node| node.light_mut()) {
                    light.intensity = intensity;
                }
            }
            Field::LightHelper => {
                let helper = self.settings.light.helper;
                if let Some(light) = self.light_node_mut().and_then(|node| node.light_mut()) {
                    light.set_helper_visible(helper);
                }
            }
            Field::AffineMode => self.sync_gizmo(),
            Field::AnimationMode => match self.settings.animation.mode {
                AnimationMode::None => self.stop_animation(),
                AnimationMode::Keyframes => self.sync_animation(),
            },
            Field::AnimationLoop => {
                let looping = self.settings.animation.looping;
                if let Some(player) = &mut self.animation {
                    player.set_looping(looping);
                }
            }
        }
    }

    /// Swaps the primary object. A geometry change always leaves exactly one
    /// node tagged `"object"`.
    pub fn replace_object(&mut self, change: ObjectChange) {
        match change {
            ObjectChange::Geometry { geometry, material } => {
                self.gizmo.detach();
                self.animation = None;
                let removed = self.scene.remove_by_name(OBJECT_TAG);
                let transform = Transform {
                    scale: Vec3::splat(self.settings.common.scale),
                    ..Transform::default()
                };
                let id = self.scene.add(
                    OBJECT_TAG,
                    NodeKind::Mesh(Mesh { geometry, material }),
                    transform,
                );
                let shadows = self.settings.light.shadow;
                if let Some(node) = self.scene.get_mut(id) {
                    node.cast_shadow = shadows;
                }
                log::debug!("Primary object replaced ({} removed, now {:?})", removed, id);
                self.primary = Some(id);
                self.sync_animation();
                self.sync_gizmo();
            }
            ObjectChange::MaterialOnly(material) => {
                let Some(mesh) = self
                    .primary
                    .and_then(|id| self.scene.get_mut(id))
                    .and_then(|node| node.mesh_mut())
                else {
                    log::warn!("Material change with no primary object");
                    return;
                };
                mesh.material = material;
                if let Some(player) = &mut self.animation {
                    player.rebase_material(&self.scene);
                }
            }
        }
    }

    /// Back to defaults, as if the editor had just been created.
    pub fn reset_all(&mut self) {
        log::info!("Resetting all settings");
        self.gizmo.detach();
        self.camera.enabled = true;
        self.animation = None;
        self.loader.invalidate(LoadSlot::Geometry);
        self.loader.invalidate(LoadSlot::Material);
        self.upload = None;
        self.pending_texture = None;
        self.light_angle = 0.0;
        self.settings = Settings::default();
        self.rebuild_all();
    }

    /// Queues `path` as the primary object's texture.
    pub fn upload_texture(&mut self, path: &Path) -> Result<(), AssetError> {
        let source = path.display().to_string();
        log::info!("Loading uploaded texture {}", source);
        self.request_texture(source, TexturePurpose::Upload)
    }

    fn request_texture(
        &mut self,
        source: String,
        purpose: TexturePurpose,
    ) -> Result<(), AssetError> {
        let upload = purpose == TexturePurpose::Upload;
        if let Some(pending) = &self.pending_texture {
            let in_flight = self.loader.is_current(pending.ticket);
            if in_flight && !upload && (pending.upload || pending.source == source) {
                log::debug!("Texture {} already on its way", pending.source);
                return Ok(());
            }
        }
        let ticket = self.loader.request(
            LoadSlot::Material,
            LoadRequest::Texture {
                source: source.clone(),
                purpose,
            },
        )?;
        self.pending_texture = Some(PendingTexture {
            ticket,
            source,
            upload,
        });
        Ok(())
    }

    /// Applies finished loads. Returns how many were accepted.
    pub fn process_loads(&mut self) -> usize {
        let outcomes = self.loader.poll();
        let count = outcomes.len();
        for outcome in outcomes {
            self.apply_outcome(outcome);
        }
        count
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        if outcome.ticket.slot == LoadSlot::Material {
            self.pending_texture = None;
        }
        let result = match outcome.result {
            Ok(asset) => asset,
            Err(err) => {
                log::warn!("Load of {} failed: {}", outcome.request.describe(), err);
                return;
            }
        };
        match (outcome.request, result) {
            (LoadRequest::Model { shape, .. }, LoadedAsset::Model(geometry)) => {
                let geometry = Arc::new(geometry);
                self.models.insert(shape, geometry.clone());
                if shape != self.settings.geometry.shape {
                    return;
                }
                let material = self.configured_material();
                self.replace_object(ObjectChange::Geometry { geometry, material });
            }
            (LoadRequest::Texture { source, purpose }, LoadedAsset::Texture(image)) => {
                let image = Arc::new(image);
                self.textures.insert(source.clone(), image.clone());
                match purpose {
                    TexturePurpose::Upload => {
                        self.upload = Some(source.clone());
                        let material = Material::uploaded(&source, Some(image));
                        self.replace_object(ObjectChange::MaterialOnly(material));
                    }
                    TexturePurpose::Material(_) => self.fill_texture(&source, image),
                }
            }
            (request, _) => {
                log::warn!("Load of {} returned the wrong asset kind", request.describe());
            }
        }
    }

    fn fill_texture(&mut self, source: &str, image: Arc<TextureImage>) {
        let Some(map) = self
            .primary
            .and_then(|id| self.scene.get_mut(id))
            .and_then(|node| node.mesh_mut())
            .and_then(|mesh| mesh.material.map.as_mut())
        else {
            return;
        };
        if map.source == source && map.image.is_none() {
            log::debug!("Texture {} ready", source);
            map.image = Some(image);
        }
    }

    pub fn begin_gizmo_drag(&mut self) -> bool {
        let started = self.gizmo.begin_drag();
        if started {
            self.camera.enabled = false;
        }
        started
    }

    pub fn drag_gizmo(&mut self, delta_px: Vec2) {
        let (_, camera_right, camera_up) = self.camera.basis();
        self.gizmo.drag(
            &mut self.scene,
            DragInput {
                delta_px,
                camera_right,
                camera_up,
            },
        );
    }

    pub fn end_gizmo_drag(&mut self) {
        if self.gizmo.end_drag() {
            self.camera.enabled = true;
        }
    }

    pub fn gizmo_state(&self) -> GizmoState {
        self.gizmo.state()
    }

    /// Per-tick spin of the primary object.
    pub fn autorotate_object(&mut self) {
        if !self.settings.common.autorotate {
            return;
        }
        let [x, y] = self.motion.object_rotation_step;
        if let Some(node) = self.primary.and_then(|id| self.scene.get_mut(id)) {
            node.transform.rotate_local(x, y);
        }
    }

    /// Per-tick step of the light around the vertical axis.
    pub fn orbit_light(&mut self) {
        if !self.settings.light.autorotate {
            return;
        }
        let motion = self.motion;
        self.light_angle =
            (self.light_angle + motion.light_orbit_step).rem_euclid(std::f32::consts::TAU);
        let angle = self.light_angle;
        if let Some(node) = self.light_node_mut() {
            node.transform.position = Vec3::new(
                angle.sin() * motion.light_orbit_radius,
                motion.light_orbit_height,
                angle.cos() * motion.light_orbit_radius,
            );
        }
    }

    pub fn advance_animation(&mut self, dt: f32) {
        if let Some(player) = &mut self.animation {
            player.advance(&mut self.scene, dt);
        }
    }

    pub fn uses_environment_capture(&self) -> bool {
        self.primary_material()
            .map(|material| material.env_mapped)
            .unwrap_or(false)
    }

    pub fn primary_material(&self) -> Option<&Material> {
        self.primary
            .and_then(|id| self.scene.get(id))
            .and_then(|node| node.mesh())
            .map(|mesh| &mesh.material)
    }

    fn rebuild_all(&mut self) {
        let common = &self.settings.common;
        self.camera.set_clip(common.near, common.far);
        let show_axes = common.show_axes;
        if let Some(node) = self.scene.get_mut(self.axes) {
            node.visible = show_axes;
        }
        self.rebuild_light();
        self.apply_shadows();
        self.rebuild_geometry();
    }

    /// True when the object was replaced right away; false while a model is
    /// still loading.
    fn rebuild_geometry(&mut self) -> bool {
        self.loader.invalidate(LoadSlot::Geometry);
        let shape = self.settings.geometry.shape;
        let geometry = match shape.build(&self.catalog) {
            GeometrySource::Primitive(geometry) => Arc::new(geometry),
            GeometrySource::Model { path, scale } => match self.models.get(&shape) {
                Some(geometry) => geometry.clone(),
                None => {
                    let request = LoadRequest::Model { shape, path, scale };
                    if let Err(err) = self.loader.request(LoadSlot::Geometry, request) {
                        log::warn!("Could not queue {:?} model: {}", shape, err);
                    }
                    return false;
                }
            },
        };
        let material = self.configured_material();
        self.replace_object(ObjectChange::Geometry { geometry, material });
        true
    }

    fn rebuild_material(&mut self) {
        self.upload = None;
        self.pending_texture = None;
        self.loader.invalidate(LoadSlot::Material);
        let material = self.configured_material();
        self.replace_object(ObjectChange::MaterialOnly(material));
    }

    /// Material for the current shape and settings. Queues a texture load when
    /// the image is neither cached nor already coming.
    fn configured_material(&mut self) -> Material {
        if self.settings.geometry.shape == Shape::Curve {
            return Material::line(CURVE_RED);
        }
        if let Some(source) = &self.upload {
            let image = self.textures.get(source).cloned();
            return Material::uploaded(source, image);
        }
        let kind = self.settings.geometry.material;
        let textures = &self.textures;
        let material = kind.build(self.settings.geometry.color, &self.catalog, |source| {
            textures.get(source).cloned()
        });
        if let Some(map) = material.map.as_ref().filter(|map| !map.is_loaded()) {
            let source = map.source.clone();
            if let Err(err) = self.request_texture(source, TexturePurpose::Material(kind)) {
                log::warn!("Could not queue texture {}: {}", map.source, err);
            }
        }
        material
    }

    fn rebuild_light(&mut self) {
        self.scene.remove_by_name(LIGHT_TAG);
        let settings = &self.settings.light;
        let light = Light::new(
            settings.kind,
            settings.intensity,
            settings.shadow,
            settings.helper,
        );
        let cast_shadow = light.cast_shadow;
        let visible = settings.enable;
        let id = self.scene.add(
            LIGHT_TAG,
            NodeKind::Light(light),
            Transform::from_position(Vec3::from_array(settings.position)),
        );
        if let Some(node) = self.scene.get_mut(id) {
            node.visible = visible;
            node.cast_shadow = cast_shadow;
        }
        log::debug!("Light rebuilt as {:?}", self.settings.light.kind);
        self.light = Some(id);
    }

    fn apply_shadows(&mut self) {
        let shadows = self.settings.light.shadow;
        if let Some(node) = self.scene.get_mut(self.floor) {
            node.receive_shadow = shadows;
        }
        if let Some(node) = self.light_node_mut() {
            if let Some(light) = node.light_mut() {
                light.set_cast_shadow(shadows);
            }
            node.cast_shadow = node.light().map(|light| light.cast_shadow).unwrap_or(false);
        }
        if let Some(node) = self.primary.and_then(|id| self.scene.get_mut(id)) {
            node.cast_shadow = shadows;
        }
    }

    fn sync_gizmo(&mut self) {
        self.gizmo.sync(self.settings.affine.mode, self.primary);
        if !self.gizmo.is_dragging() {
            self.camera.enabled = true;
        }
    }

    fn sync_animation(&mut self) {
        if self.settings.animation.mode != AnimationMode::Keyframes || self.animation.is_some() {
            return;
        }
        let Some(id) = self.primary else {
            return;
        };
        self.animation = AnimationPlayer::bind(&self.scene, id, self.settings.animation.looping);
        if self.animation.is_some() {
            log::debug!("Animation bound to {:?}", id);
        }
    }

    fn stop_animation(&mut self) {
        if let Some(player) = self.animation.take() {
            player.restore(&mut self.scene);
            log::debug!("Animation stopped");
        }
    }

    /// Runs `edit` with any running animation rewound to its rest pose, then
    /// rebinds so the clip plays around the edited pose.
    fn with_rest_pose(&mut self, edit: impl FnOnce(&mut Self)) {
        self.stop_animation();
        edit(self);
        self.sync_animation();
    }

    fn light_node_mut(&mut self) -> Option<&mut crate::scene::SceneNode> {
        self.light.and_then(|id| self.scene.get_mut(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::FakeSource;
    use crate::scene::lights::LightKind;
    use crate::scene::materials::{MaterialKind, WHITE};
    use crate::settings::{AffineMode, Choice};
    use std::time::Duration;

    fn editor_with(config: &AppConfig) -> Editor {
        Editor::new(config, Arc::new(FakeSource::default())).unwrap()
    }

    fn editor() -> Editor {
        editor_with(&AppConfig::default())
    }

    fn settle(editor: &mut Editor) {
        for outcome in editor.loader.wait(Duration::from_secs(5)) {
            editor.apply_outcome(outcome);
        }
    }

    fn object(editor: &Editor) -> &crate::scene::SceneNode {
        editor
            .primary()
            .and_then(|id| editor.scene().get(id))
            .expect("primary object")
    }

    fn geometry(editor: &Editor) -> Geometry {
        object(editor).mesh().unwrap().geometry.as_ref().clone()
    }

    fn material(editor: &Editor) -> Material {
        object(editor).mesh().unwrap().material.clone()
    }

    #[test]
    fn fresh_editor_builds_the_fixed_scene() {
        let editor = editor();
        let scene = editor.scene();
        assert_eq!(scene.count_by_name(OBJECT_TAG), 1);
        assert_eq!(scene.count_by_name(LIGHT_TAG), 1);
        assert_eq!(scene.count_by_name(FLOOR_TAG), 1);
        assert!(scene.find_by_name(AXES_TAG).unwrap().visible);

        let floor = scene.find_by_name(FLOOR_TAG).unwrap();
        assert_eq!(floor.transform.position.y, FLOOR_HEIGHT);
        assert!(floor.receive_shadow);

        assert_eq!(
            geometry(&editor),
            Geometry::Box {
                width: 0.4,
                height: 0.4,
                depth: 0.4
            }
        );
        assert_eq!(material(&editor).shading, Shading::Unlit);
        assert_eq!(editor.gizmo_state(), GizmoState::Detached);
        assert!(editor.camera().eye().abs_diff_eq(CAMERA_START, 1e-5));
    }

    #[test]
    fn shape_switching_keeps_a_single_object() {
        let mut editor = editor();
        for _ in 0..3 {
            for shape in [
                Shape::Cone,
                Shape::Sphere,
                Shape::Torus,
                Shape::Cylinder,
                Shape::Teapot,
                Shape::Curve,
                Shape::Cube,
            ] {
                editor.set(Field::Shape, shape.label().into()).unwrap();
                assert_eq!(editor.scene().count_by_name(OBJECT_TAG), 1);
            }
        }
        editor.set(Field::Shape, "Curve".into()).unwrap();
        assert!(geometry(&editor).is_line());
        assert_eq!(material(&editor), Material::line(CURVE_RED));
    }

    #[test]
    fn material_switch_keeps_transform_bits() {
        let mut editor = editor();
        editor.set(Field::AutoRotate, true.into()).unwrap();
        for _ in 0..37 {
            editor.autorotate_object();
        }
        editor.set(Field::AffineMode, "Translate".into()).unwrap();
        assert!(editor.begin_gizmo_drag());
        editor.drag_gizmo(Vec2::new(13.0, -7.0));
        editor.end_gizmo_drag();
        let id = editor.primary();
        let before = object(&editor).transform;

        for kind in MaterialKind::ALL {
            editor.set(Field::Material, kind.label().into()).unwrap();
            let after = object(&editor).transform;
            assert_eq!(after.position.to_array(), before.position.to_array());
            assert_eq!(after.rotation.to_array(), before.rotation.to_array());
            assert_eq!(after.scale.to_array(), before.scale.to_array());
        }
        assert_eq!(editor.primary(), id);
    }

    #[test]
    fn affine_mode_drives_gizmo_attachment() {
        let mut editor = editor();
        for (label, state) in [
            ("Translate", GizmoState::Translate),
            ("Rotate", GizmoState::Rotate),
            ("Scale", GizmoState::Scale),
        ] {
            editor.set(Field::AffineMode, label.into()).unwrap();
            assert_eq!(editor.gizmo_state(), state);
            assert_eq!(editor.gizmo().target(), editor.primary());
        }
        editor.set(Field::AffineMode, "None".into()).unwrap();
        assert_eq!(editor.gizmo_state(), GizmoState::Detached);
        assert!(!editor.gizmo().is_attached());
    }

    #[test]
    fn gizmo_follows_replaced_object() {
        let mut editor = editor();
        editor.set(Field::AffineMode, "Scale".into()).unwrap();
        editor.set(Field::Shape, "Torus".into()).unwrap();
        assert_eq!(editor.gizmo_state(), GizmoState::Scale);
        assert_eq!(editor.gizmo().target(), editor.primary());
    }

    #[test]
    fn dragging_disables_orbit_until_released() {
        let mut editor = editor();
        assert!(!editor.begin_gizmo_drag());
        assert!(editor.camera().enabled);

        editor.set(Field::AffineMode, "Translate".into()).unwrap();
        assert!(editor.begin_gizmo_drag());
        assert!(!editor.camera().enabled);
        editor.end_gizmo_drag();
        assert!(editor.camera().enabled);

        editor.begin_gizmo_drag();
        editor.set(Field::AffineMode, "None".into()).unwrap();
        assert!(editor.camera().enabled);
    }

    #[test]
    fn light_types_keep_exactly_one_light() {
        let mut editor = editor();
        for kind in LightKind::ALL.iter().chain(LightKind::ALL) {
            editor.set(Field::LightType, kind.label().into()).unwrap();
            assert_eq!(editor.scene().lights().count(), 1);
            let node = editor.scene().find_by_name(LIGHT_TAG).unwrap();
            assert_eq!(node.light().unwrap().kind, *kind);
            assert_eq!(Some(node.id), editor.light());
        }

        editor.set(Field::LightEnable, false.into()).unwrap();
        let node = editor.scene().find_by_name(LIGHT_TAG).unwrap();
        assert!(!node.visible);
        assert_eq!(editor.scene().lights().count(), 1);

        // Rebuilt lights keep the current settings.
        editor.set(Field::Intensity, 20.0.into()).unwrap();
        editor.set(Field::LightType, "Spot light".into()).unwrap();
        let node = editor.scene().find_by_name(LIGHT_TAG).unwrap();
        assert!(!node.visible);
        assert_eq!(node.light().unwrap().intensity, 20.0);
    }

    #[test]
    fn shadow_toggle_reaches_floor_light_and_object() {
        let mut editor = editor();
        assert!(object(&editor).cast_shadow);
        editor.set(Field::LightShadow, false.into()).unwrap();
        assert!(!object(&editor).cast_shadow);
        assert!(!editor.scene().find_by_name(FLOOR_TAG).unwrap().receive_shadow);
        let light = editor.scene().find_by_name(LIGHT_TAG).unwrap();
        assert!(!light.light().unwrap().cast_shadow);
    }

    #[test]
    fn reset_matches_a_fresh_editor() {
        let mut editor = editor();
        editor.set(Field::Shape, "Torus".into()).unwrap();
        editor.set(Field::Material, "Phong shading".into()).unwrap();
        editor.set(Field::Color, [0.1, 0.2, 0.3].into()).unwrap();
        editor.set(Field::LightType, "Ambient light".into()).unwrap();
        editor.set(Field::LightEnable, false.into()).unwrap();
        editor.set(Field::ShowAxes, false.into()).unwrap();
        editor.set(Field::Far, 50.0.into()).unwrap();
        editor.set(Field::Scale, 1.5.into()).unwrap();
        editor.set(Field::AffineMode, "Rotate".into()).unwrap();
        editor.set(Field::AnimationMode, "Keyframes".into()).unwrap();
        editor.advance_animation(0.4);

        editor.reset_all();
        let fresh = editor_with(&AppConfig::default());

        assert_eq!(editor.settings(), &Settings::default());
        assert_eq!(editor.settings(), fresh.settings());
        assert_eq!(editor.scene().len(), fresh.scene().len());
        assert_eq!(object(&editor).kind, object(&fresh).kind);
        assert_eq!(object(&editor).transform, object(&fresh).transform);
        let light = editor.scene().find_by_name(LIGHT_TAG).unwrap();
        let fresh_light = fresh.scene().find_by_name(LIGHT_TAG).unwrap();
        assert_eq!(light.kind, fresh_light.kind);
        assert_eq!(light.visible, fresh_light.visible);
        assert_eq!(light.transform, fresh_light.transform);
        assert!(editor.scene().find_by_name(AXES_TAG).unwrap().visible);
        assert_eq!(editor.camera().far, fresh.camera().far);
        assert_eq!(editor.gizmo_state(), GizmoState::Detached);
        assert!(editor.animation().is_none());
    }

    #[test]
    fn sphere_wire_lambert_rotate_then_scale() {
        let mut editor = editor();
        editor.set_named("geometry", "shape", "Sphere".into()).unwrap();
        editor.set_named("geometry", "material", "Wire lambert".into()).unwrap();
        editor.set_named("affine", "mode", "Rotate".into()).unwrap();

        assert_eq!(editor.scene().count_by_name(OBJECT_TAG), 1);
        assert!(matches!(geometry(&editor), Geometry::Sphere { radius, .. } if radius == 0.4));
        let wire = material(&editor);
        assert_eq!(wire.shading, Shading::Lambert);
        assert!(wire.wireframe);
        assert_eq!(editor.gizmo_state(), GizmoState::Rotate);
        assert_eq!(editor.gizmo().target(), editor.primary());

        editor.set_named("common", "scale", 2.0.into()).unwrap();
        assert_eq!(object(&editor).transform.scale, Vec3::splat(2.0));
        assert!(matches!(geometry(&editor), Geometry::Sphere { .. }));
        assert_eq!(material(&editor), wire);
    }

    #[test]
    fn light_orbit_wraps_after_two_hundred_ticks() {
        let mut editor = editor();
        editor.set(Field::LightAutoRotate, true.into()).unwrap();
        for _ in 0..200 {
            editor.orbit_light();
        }
        let angle = editor.light_angle();
        assert!((0.0..std::f32::consts::TAU).contains(&angle));

        let position = editor.scene().find_by_name(LIGHT_TAG).unwrap().transform.position;
        assert!((position.y - 1.0).abs() < 1e-6);
        assert!((Vec2::new(position.x, position.z).length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn light_stays_put_without_autorotate() {
        let mut editor = editor();
        editor.orbit_light();
        assert_eq!(editor.light_angle(), 0.0);
        let position = editor.scene().find_by_name(LIGHT_TAG).unwrap().transform.position;
        assert_eq!(position, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn model_shapes_arrive_asynchronously() {
        let mut editor = editor();
        let first = editor.primary();
        editor.set(Field::Shape, "Suzanne".into()).unwrap();
        assert_eq!(editor.primary(), first);

        settle(&mut editor);
        assert_ne!(editor.primary(), first);
        assert_eq!(editor.scene().count_by_name(OBJECT_TAG), 1);
        assert!(matches!(geometry(&editor), Geometry::Box { width, .. } if width == 0.4));

        // Cached on the way back.
        editor.set(Field::Shape, "Cube".into()).unwrap();
        editor.set(Field::Shape, "Suzanne".into()).unwrap();
        assert_eq!(editor.pending_loads(), 0);
        assert!(matches!(geometry(&editor), Geometry::Box { width, .. } if width == 0.4));
    }

    #[test]
    fn superseded_model_load_is_dropped() {
        let mut editor = editor();
        editor.set(Field::Shape, "Suzanne".into()).unwrap();
        editor.set(Field::Shape, "Sphere".into()).unwrap();
        settle(&mut editor);
        assert!(matches!(geometry(&editor), Geometry::Sphere { .. }));
        assert_eq!(editor.scene().count_by_name(OBJECT_TAG), 1);
    }

    #[test]
    fn failed_model_load_keeps_previous_geometry() {
        let mut config = AppConfig::default();
        config.assets.suzanne.path = "missing/suzanne.gltf".to_string();
        let mut editor = editor_with(&config);
        editor.set(Field::Shape, "Cone".into()).unwrap();
        let cone = editor.primary();

        editor.set(Field::Shape, "Suzanne".into()).unwrap();
        settle(&mut editor);
        assert_eq!(editor.primary(), cone);
        assert!(matches!(geometry(&editor), Geometry::Cone { .. }));
    }

    #[test]
    fn failed_model_load_still_takes_snapshot_material() {
        let mut config = AppConfig::default();
        config.assets.suzanne.path = "missing/suzanne.gltf".to_string();
        let mut editor = editor_with(&config);
        let mut snapshot = editor.settings().clone();
        snapshot.geometry.shape = Shape::Suzanne;
        snapshot.geometry.material = MaterialKind::Phong;

        editor.apply_settings(snapshot);
        settle(&mut editor);
        assert!(matches!(geometry(&editor), Geometry::Box { .. }));
        assert_eq!(material(&editor).shading, Shading::Phong);
    }

    #[test]
    fn texture_material_is_filled_in_place() {
        let mut editor = editor();
        editor.set(Field::Material, "Texture 1".into()).unwrap();
        let id = editor.primary();
        let pending = material(&editor).map.unwrap();
        assert!(!pending.is_loaded());
        assert_eq!(pending.repeat, [10.0, 10.0]);

        settle(&mut editor);
        assert_eq!(editor.primary(), id);
        let map = material(&editor).map.unwrap();
        assert!(map.is_loaded());
        assert_eq!(map.source, AppConfig::default().assets.texture_1.source);
    }

    #[test]
    fn stale_texture_does_not_land_on_new_material() {
        let mut editor = editor();
        editor.set(Field::Material, "Texture 2".into()).unwrap();
        editor.set(Field::Material, "Phong shading".into()).unwrap();
        settle(&mut editor);
        let material = material(&editor);
        assert_eq!(material.shading, Shading::Phong);
        assert!(material.map.is_none());
    }

    #[test]
    fn texture_in_flight_is_not_fetched_again_for_a_new_shape() {
        let source = Arc::new(FakeSource::default());
        let mut editor = Editor::new(&AppConfig::default(), source.clone()).unwrap();
        editor.set(Field::Material, "Texture 2".into()).unwrap();
        editor.set(Field::Shape, "Sphere".into()).unwrap();
        editor.set(Field::Shape, "Cone".into()).unwrap();
        settle(&mut editor);

        let url = AppConfig::default().assets.texture_2.source;
        let calls = source.calls.lock().unwrap();
        let fetches = calls.iter().filter(|call| **call == url).count();
        assert_eq!(fetches, 1);
        let map = material(&editor).map.unwrap();
        assert_eq!(map.source, url);
        assert!(map.is_loaded());
    }

    #[test]
    fn upload_in_flight_survives_a_shape_change() {
        let mut editor = editor();
        editor.set(Field::Material, "Texture 1".into()).unwrap();
        editor.upload_texture(Path::new("photo.png")).unwrap();
        editor.set(Field::Shape, "Sphere".into()).unwrap();
        settle(&mut editor);

        assert!(matches!(geometry(&editor), Geometry::Sphere { .. }));
        let map = material(&editor).map.unwrap();
        assert_eq!(map.source, "photo.png");
        assert!(map.is_loaded());
    }

    #[test]
    fn uploaded_image_becomes_the_texture_until_material_changes() {
        let mut editor = editor();
        editor.upload_texture(Path::new("photo.png")).unwrap();
        settle(&mut editor);
        let uploaded = material(&editor);
        let map = uploaded.map.as_ref().unwrap();
        assert_eq!(map.source, "photo.png");
        assert!(map.is_loaded());
        assert_eq!(map.repeat, [1.0, 1.0]);

        // Survives a shape change.
        editor.set(Field::Shape, "Sphere".into()).unwrap();
        assert_eq!(material(&editor).map.unwrap().source, "photo.png");

        editor.set(Field::Color, [0.0, 0.0, 1.0].into()).unwrap();
        let recolored = material(&editor);
        assert!(recolored.map.is_none());
        assert_eq!(recolored.color, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn animation_binds_plays_and_restores() {
        let mut editor = editor();
        editor.set(Field::AnimationMode, "Keyframes".into()).unwrap();
        assert_eq!(
            editor.animation().map(|player| player.target()),
            editor.primary()
        );

        editor.advance_animation(1.0);
        assert!(object(&editor).transform.scale.abs_diff_eq(Vec3::splat(2.0), 1e-5));
        assert_eq!(material(&editor).color, [0.0, 1.0, 0.0]);

        editor.set(Field::AnimationMode, "None".into()).unwrap();
        assert!(editor.animation().is_none());
        assert_eq!(object(&editor).transform, Transform::default());
        assert_eq!(material(&editor).color, WHITE);
        assert!(!material(&editor).transparent);
    }

    #[test]
    fn animation_is_rebound_after_replacement() {
        let mut editor = editor();
        editor.set(Field::AnimationMode, "Keyframes".into()).unwrap();
        editor.advance_animation(0.5);
        editor.set(Field::Shape, "Cone".into()).unwrap();
        let player = editor.animation().unwrap();
        assert_eq!(Some(player.target()), editor.primary());
        assert_eq!(player.time(), 0.0);
    }

    #[test]
    fn snapshot_with_shape_and_material_applies_once() {
        let mut editor = editor();
        let mut snapshot = editor.settings().clone();
        snapshot.geometry.shape = Shape::Torus;
        snapshot.geometry.material = MaterialKind::Lambert;
        snapshot.geometry.color = [0.5, 0.5, 0.5];
        snapshot.affine.mode = AffineMode::Translate;

        let changed = editor.apply_settings(snapshot.clone());
        assert_eq!(
            changed,
            vec![Field::Shape, Field::Color, Field::Material, Field::AffineMode]
        );
        assert_eq!(editor.settings(), &snapshot);
        assert!(matches!(geometry(&editor), Geometry::Torus { .. }));
        let material = material(&editor);
        assert_eq!(material.shading, Shading::Lambert);
        assert_eq!(material.color, [0.5, 0.5, 0.5]);
        assert_eq!(editor.gizmo_state(), GizmoState::Translate);
        assert!(editor.apply_settings(snapshot).is_empty());
    }

    #[test]
    fn rejected_values_change_nothing() {
        let mut editor = editor();
        let id = editor.primary();
        assert!(editor.set(Field::Shape, "".into()).is_err());
        assert!(editor.set_named("geometry", "wobble", true.into()).is_err());
        assert_eq!(editor.set(Field::Shape, "cube".into()), Ok(false));
        assert_eq!(editor.primary(), id);
        assert_eq!(editor.settings(), &Settings::default());
    }

    #[test]
    fn config_overrides_apply_at_start_up() {
        let mut config = AppConfig::default();
        config.settings = serde_json::from_str(
            r##"{
                "geometry.shape": "Cone",
                "geometry.color": "#ff0000",
                "geometry.wobble": true,
                "light.intensity": null,
                "scale": 2
            }"##,
        )
        .unwrap();
        let mut editor = editor_with(&config);
        assert_eq!(editor.settings().geometry.shape, Shape::Cone);
        assert_eq!(editor.settings().geometry.color, [1.0, 0.0, 0.0]);
        assert_eq!(
            object(&editor).mesh().unwrap().material.color,
            [1.0, 0.0, 0.0]
        );
        // Unknown, malformed and unconvertible entries leave the rest alone.
        assert_eq!(editor.apply_overrides(&config.settings), 0);
        assert_eq!(
            editor.set_named("geometry", "wobble", true.into()),
            Err(SettingsError::UnknownField {
                category: "geometry".to_string(),
                name: "wobble".to_string(),
            })
        );
    }

    #[test]
    fn reflective_material_requests_environment_capture() {
        let mut editor = editor();
        assert!(!editor.uses_environment_capture());
        editor.set(Field::Material, "Reflective".into()).unwrap();
        assert!(editor.uses_environment_capture());
    }

    #[test]
    fn clip_planes_follow_settings() {
        let mut editor = editor();
        editor.set(Field::Near, 0.5.into()).unwrap();
        editor.set(Field::Far, 100.0.into()).unwrap();
        assert_eq!(editor.camera().near, 0.5);
        assert_eq!(editor.camera().far, 100.0);
    }
}
