//! Live scene parameters grouped by panel folder.
//!
//! The store only checks value types and option membership. Range clamping is
//! left to the panel widgets, which read [`Field::range`].

use crate::scene::lights::LightKind;
use crate::scene::materials::{rgb_from_hex, MaterialKind, Rgb, WHITE};
use crate::scene::shapes::Shape;
use std::ops::RangeInclusive;

/// Closed option set selectable by label.
pub trait Choice: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    /// Case, whitespace, `-` and `_` are ignored, so `"wire-lambert"` selects
    /// `"Wire lambert"`.
    fn parse(text: &str) -> Option<Self> {
        let key = normalize(text);
        if key.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|option| option.accepts(&key))
    }

    /// Whether the normalized `key` names this option.
    fn accepts(self, key: &str) -> bool {
        normalize(self.label()) == key
    }

    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|option| option.label()).collect()
    }
}

pub(crate) fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AffineMode {
    #[default]
    None,
    Translate,
    Rotate,
    Scale,
}

impl Choice for AffineMode {
    const ALL: &'static [Self] = &[
        AffineMode::None,
        AffineMode::Translate,
        AffineMode::Rotate,
        AffineMode::Scale,
    ];

    fn label(self) -> &'static str {
        match self {
            AffineMode::None => "None",
            AffineMode::Translate => "Translate",
            AffineMode::Rotate => "Rotate",
            AffineMode::Scale => "Scale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationMode {
    #[default]
    None,
    Keyframes,
}

impl Choice for AnimationMode {
    const ALL: &'static [Self] = &[AnimationMode::None, AnimationMode::Keyframes];

    fn label(self) -> &'static str {
        match self {
            AnimationMode::None => "None",
            AnimationMode::Keyframes => "Keyframes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Common,
    Geometry,
    Light,
    Affine,
    Animation,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Common => "common",
            Category::Geometry => "geometry",
            Category::Light => "light",
            Category::Affine => "affine",
            Category::Animation => "animation",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let key = normalize(text);
        [
            Category::Common,
            Category::Geometry,
            Category::Light,
            Category::Affine,
            Category::Animation,
        ]
        .into_iter()
        .find(|category| category.name() == key)
    }
}

/// Every addressable setting, in the order effects are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Scale,
    ShowAxes,
    AutoRotate,
    Near,
    Far,
    Shape,
    Color,
    Material,
    LightType,
    LightEnable,
    LightAutoRotate,
    LightShadow,
    LightX,
    LightY,
    LightZ,
    Intensity,
    LightHelper,
    AffineMode,
    AnimationMode,
    AnimationLoop,
}

impl Field {
    pub const ALL: [Field; 20] = [
        Field::Scale,
        Field::ShowAxes,
        Field::AutoRotate,
        Field::Near,
        Field::Far,
        Field::Shape,
        Field::Color,
        Field::Material,
        Field::LightType,
        Field::LightEnable,
        Field::LightAutoRotate,
        Field::LightShadow,
        Field::LightX,
        Field::LightY,
        Field::LightZ,
        Field::Intensity,
        Field::LightHelper,
        Field::AffineMode,
        Field::AnimationMode,
        Field::AnimationLoop,
    ];

    pub fn category(self) -> Category {
        match self {
            Field::Scale | Field::ShowAxes | Field::AutoRotate | Field::Near | Field::Far => {
                Category::Common
            }
            Field::Shape | Field::Color | Field::Material => Category::Geometry,
            Field::LightType
            | Field::LightEnable
            | Field::LightAutoRotate
            | Field::LightShadow
            | Field::LightX
            | Field::LightY
            | Field::LightZ
            | Field::Intensity
            | Field::LightHelper => Category::Light,
            Field::AffineMode => Category::Affine,
            Field::AnimationMode | Field::AnimationLoop => Category::Animation,
        }
    }

    /// Field name within its category.
    pub fn name(self) -> &'static str {
        match self {
            Field::Scale => "scale",
            Field::ShowAxes => "showAxes",
            Field::AutoRotate => "autorotate",
            Field::Near => "near",
            Field::Far => "far",
            Field::Shape => "shape",
            Field::Color => "color",
            Field::Material => "material",
            Field::LightType => "lightType",
            Field::LightEnable => "enable",
            Field::LightAutoRotate => "autorotate",
            Field::LightShadow => "shadow",
            Field::LightX => "positionX",
            Field::LightY => "positionY",
            Field::LightZ => "positionZ",
            Field::Intensity => "intensity",
            Field::LightHelper => "helper",
            Field::AffineMode => "mode",
            Field::AnimationMode => "mode",
            Field::AnimationLoop => "loop",
        }
    }

    pub fn lookup(category: Category, name: &str) -> Option<Field> {
        let key = normalize(name);
        Field::ALL
            .into_iter()
            .find(|field| field.category() == category && normalize(field.name()) == key)
    }

    /// Slider bounds for numeric fields.
    pub fn range(self) -> Option<RangeInclusive<f32>> {
        match self {
            Field::Scale => Some(0.1..=2.0),
            Field::Near => Some(0.01..=10.0),
            Field::Far => Some(10.0..=2000.0),
            Field::LightX | Field::LightY | Field::LightZ => Some(-5.0..=5.0),
            Field::Intensity => Some(0.0..=50.0),
            _ => None,
        }
    }

    pub fn step(self) -> Option<f64> {
        match self {
            Field::Scale => Some(0.1),
            Field::Intensity => Some(2.0),
            _ => None,
        }
    }

    /// Labels for option fields, empty otherwise.
    pub fn options(self) -> Vec<&'static str> {
        match self {
            Field::Shape => Shape::labels(),
            Field::Material => MaterialKind::labels(),
            Field::LightType => LightKind::labels(),
            Field::AffineMode => AffineMode::labels(),
            Field::AnimationMode => AnimationMode::labels(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f32),
    Bool(bool),
    Choice(String),
    Color(Rgb),
}

impl Value {
    /// Value for a JSON scalar: numbers, booleans, option labels, and colours
    /// written as `"#rrggbb"` or `[r, g, b]` in `0..=1`.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Number(number) => number.as_f64().map(|n| Value::Number(n as f32)),
            serde_json::Value::Bool(flag) => Some(Value::Bool(*flag)),
            serde_json::Value::String(text) => match text.strip_prefix('#') {
                Some(hex) if hex.len() == 6 => u32::from_str_radix(hex, 16)
                    .ok()
                    .map(|hex| Value::Color(rgb_from_hex(hex))),
                _ => Some(Value::Choice(text.clone())),
            },
            serde_json::Value::Array(items) if items.len() == 3 => {
                let mut rgb = [0.0; 3];
                for (channel, item) in rgb.iter_mut().zip(items) {
                    *channel = item.as_f64()? as f32;
                }
                Some(Value::Color(rgb))
            }
            _ => None,
        }
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Choice(value.to_string())
    }
}

impl From<Rgb> for Value {
    fn from(value: Rgb) -> Self {
        Value::Color(value)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown setting {category}.{name}")]
    UnknownField { category: String, name: String },
    #[error("{field} expects a {expected} value")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },
    #[error("{field} has no option {label:?}")]
    UnknownOption { field: &'static str, label: String },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommonSettings {
    pub scale: f32,
    pub show_axes: bool,
    pub autorotate: bool,
    pub near: f32,
    pub far: f32,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            show_axes: true,
            autorotate: false,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySettings {
    pub shape: Shape,
    pub color: Rgb,
    pub material: MaterialKind,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            shape: Shape::Cube,
            color: WHITE,
            material: MaterialKind::Basic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightSettings {
    pub kind: LightKind,
    pub enable: bool,
    pub autorotate: bool,
    pub shadow: bool,
    pub position: [f32; 3],
    pub intensity: f32,
    pub helper: bool,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            enable: true,
            autorotate: false,
            shadow: true,
            position: [0.0, 1.0, 0.0],
            intensity: 4.0,
            helper: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffineSettings {
    pub mode: AffineMode,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationSettings {
    pub mode: AnimationMode,
    pub looping: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub common: CommonSettings,
    pub geometry: GeometrySettings,
    pub light: LightSettings,
    pub affine: AffineSettings,
    pub animation: AnimationSettings,
}

impl Settings {
    pub fn get(&self, field: Field) -> Value {
        match field {
            Field::Scale => Value::Number(self.common.scale),
            Field::ShowAxes => Value::Bool(self.common.show_axes),
            Field::AutoRotate => Value::Bool(self.common.autorotate),
            Field::Near => Value::Number(self.common.near),
            Field::Far => Value::Number(self.common.far),
            Field::Shape => Value::from(self.geometry.shape.label()),
            Field::Color => Value::Color(self.geometry.color),
            Field::Material => Value::from(self.geometry.material.label()),
            Field::LightType => Value::from(self.light.kind.label()),
            Field::LightEnable => Value::Bool(self.light.enable),
            Field::LightAutoRotate => Value::Bool(self.light.autorotate),
            Field::LightShadow => Value::Bool(self.light.shadow),
            Field::LightX => Value::Number(self.light.position[0]),
            Field::LightY => Value::Number(self.light.position[1]),
            Field::LightZ => Value::Number(self.light.position[2]),
            Field::Intensity => Value::Number(self.light.intensity),
            Field::LightHelper => Value::Bool(self.light.helper),
            Field::AffineMode => Value::from(self.affine.mode.label()),
            Field::AnimationMode => Value::from(self.animation.mode.label()),
            Field::AnimationLoop => Value::Bool(self.animation.looping),
        }
    }

    /// Writes `value` into `field`. Returns `Ok(false)` when the field already
    /// held that value, in which case nothing downstream should react.
    pub fn set(&mut self, field: Field, value: Value) -> Result<bool, SettingsError> {
        match value {
            Value::Number(number) => {
                if !number.is_finite() {
                    return Err(SettingsError::NotFinite {
                        field: field.name(),
                    });
                }
                let slot = match field {
                    Field::Scale => &mut self.common.scale,
                    Field::Near => &mut self.common.near,
                    Field::Far => &mut self.common.far,
                    Field::LightX => &mut self.light.position[0],
                    Field::LightY => &mut self.light.position[1],
                    Field::LightZ => &mut self.light.position[2],
                    Field::Intensity => &mut self.light.intensity,
                    _ => return Err(mismatch(field)),
                };
                Ok(assign(slot, number))
            }
            Value::Bool(flag) => {
                let slot = match field {
                    Field::ShowAxes => &mut self.common.show_axes,
                    Field::AutoRotate => &mut self.common.autorotate,
                    Field::LightEnable => &mut self.light.enable,
                    Field::LightAutoRotate => &mut self.light.autorotate,
                    Field::LightShadow => &mut self.light.shadow,
                    Field::LightHelper => &mut self.light.helper,
                    Field::AnimationLoop => &mut self.animation.looping,
                    _ => return Err(mismatch(field)),
                };
                Ok(assign(slot, flag))
            }
            Value::Color(color) => match field {
                Field::Color => Ok(assign(&mut self.geometry.color, color)),
                _ => Err(mismatch(field)),
            },
            Value::Choice(label) => match field {
                Field::Shape => Ok(assign(
                    &mut self.geometry.shape,
                    parse_option(field, &label)?,
                )),
                Field::Material => Ok(assign(
                    &mut self.geometry.material,
                    parse_option(field, &label)?,
                )),
                Field::LightType => Ok(assign(&mut self.light.kind, parse_option(field, &label)?)),
                Field::AffineMode => Ok(assign(
                    &mut self.affine.mode,
                    parse_option(field, &label)?,
                )),
                Field::AnimationMode => Ok(assign(
                    &mut self.animation.mode,
                    parse_option(field, &label)?,
                )),
                _ => Err(mismatch(field)),
            },
        }
    }

    /// Fields whose value differs between `self` and `other`, in effect order.
    pub fn diff(&self, other: &Settings) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.get(*field) != other.get(*field))
            .collect()
    }
}

pub fn resolve(category: &str, name: &str) -> Result<Field, SettingsError> {
    Category::parse(category)
        .and_then(|category| Field::lookup(category, name))
        .ok_or_else(|| SettingsError::UnknownField {
            category: category.to_string(),
            name: name.to_string(),
        })
}

fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn parse_option<T: Choice>(field: Field, label: &str) -> Result<T, SettingsError> {
    T::parse(label).ok_or_else(|| SettingsError::UnknownOption {
        field: field.name(),
        label: label.to_string(),
    })
}

fn mismatch(field: Field) -> SettingsError {
    let expected = match field {
        Field::Scale
        | Field::Near
        | Field::Far
        | Field::LightX
        | Field::LightY
        | Field::LightZ
        | Field::Intensity => "number",
        Field::Color => "color",
        Field::Shape
        | Field::Material
        | Field::LightType
        | Field::AffineMode
        | Field::AnimationMode => "option",
        _ => "boolean",
    };
    SettingsError::TypeMismatch {
        field: field.name(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_scalars_become_values() {
        let json: serde_json::Value =
            serde_json::from_str(r##"[1.5, true, "Cone", "#ff0000", [0, 0.5, 1], null]"##).unwrap();
        let values: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(Value::from_json)
            .collect();
        assert_eq!(
            values,
            vec![
                Some(Value::Number(1.5)),
                Some(Value::Bool(true)),
                Some(Value::Choice("Cone".to_string())),
                Some(Value::Color([1.0, 0.0, 0.0])),
                Some(Value::Color([0.0, 0.5, 1.0])),
                None,
            ]
        );
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!(LightKind::parse("pointLight"), Some(LightKind::Point));
        assert_eq!(MaterialKind::parse("wire lambert"), Some(MaterialKind::WireLambert));
        assert_eq!(MaterialKind::parse("Texture 1"), Some(MaterialKind::Texture1));
        assert_eq!(Shape::parse("SPHERE"), Some(Shape::Sphere));
        assert_eq!(Shape::parse(""), None);
        assert_eq!(Shape::parse("dodecahedron"), None);
    }

    #[test]
    fn setting_an_equal_value_reports_no_change() {
        let mut settings = Settings::default();
        assert_eq!(settings.set(Field::Scale, 1.0.into()), Ok(false));
        assert_eq!(settings.set(Field::Scale, 2.0.into()), Ok(true));
        assert_eq!(settings.set(Field::Scale, 2.0.into()), Ok(false));
        assert_eq!(settings.set(Field::AffineMode, "none".into()), Ok(false));
    }

    #[test]
    fn named_access_resolves_category_and_field() {
        let mut settings = Settings::default();
        let shape = resolve("geometry", "shape").unwrap();
        assert_eq!(settings.set(shape, "Sphere".into()), Ok(true));
        assert_eq!(settings.geometry.shape, Shape::Sphere);
        assert_eq!(
            settings.get(resolve("Light", "light_type").unwrap()),
            Value::from("Point")
        );
        // Same field name in two categories.
        let light_autorotate = resolve("light", "autorotate").unwrap();
        assert_eq!(light_autorotate, Field::LightAutoRotate);
        assert_eq!(settings.set(light_autorotate, true.into()), Ok(true));
        assert!(!settings.common.autorotate);
        assert!(matches!(
            resolve("light", "wattage"),
            Err(SettingsError::UnknownField { .. })
        ));
        assert!(matches!(
            resolve("lighting", "intensity"),
            Err(SettingsError::UnknownField { .. })
        ));
    }

    #[test]
    fn bad_values_leave_the_store_untouched() {
        let mut settings = Settings::default();
        let before = settings.clone();

        assert!(matches!(
            settings.set(Field::Shape, "".into()),
            Err(SettingsError::UnknownOption { .. })
        ));
        assert!(matches!(
            settings.set(Field::Scale, true.into()),
            Err(SettingsError::TypeMismatch { .. })
        ));
        assert!(matches!(
            settings.set(Field::Intensity, f32::NAN.into()),
            Err(SettingsError::NotFinite { .. })
        ));
        assert_eq!(settings, before);
    }

    #[test]
    fn diff_lists_changed_fields_in_effect_order() {
        let before = Settings::default();
        let mut after = before.clone();
        after.affine.mode = AffineMode::Rotate;
        after.geometry.material = MaterialKind::Phong;
        after.geometry.shape = Shape::Torus;

        assert_eq!(
            before.diff(&after),
            vec![Field::Shape, Field::Material, Field::AffineMode]
        );
        assert!(after.diff(&after).is_empty());
    }

    #[test]
    fn every_field_round_trips_through_get_and_set() {
        let source = Settings::default();
        let mut target = Settings::default();
        for field in Field::ALL {
            assert_eq!(target.set(field, source.get(field)), Ok(false), "{:?}", field);
        }
    }

    #[test]
    fn option_fields_list_their_labels() {
        assert_eq!(Field::AffineMode.options(), ["None", "Translate", "Rotate", "Scale"]);
        assert!(Field::Scale.options().is_empty());
        assert_eq!(Field::Scale.range(), Some(0.1..=2.0));
    }
}
