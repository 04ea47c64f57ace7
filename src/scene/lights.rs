use crate::scene::materials::{Rgb, WHITE};
use crate::settings::{normalize, Choice};

pub const LIGHT_RANGE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Point,
    Spot,
    Directional,
    Ambient,
}

impl Choice for LightKind {
    const ALL: &'static [Self] = &[
        LightKind::Point,
        LightKind::Spot,
        LightKind::Directional,
        LightKind::Ambient,
    ];

    fn label(self) -> &'static str {
        match self {
            LightKind::Point => "Point",
            LightKind::Spot => "Spot",
            LightKind::Directional => "Directional",
            LightKind::Ambient => "Ambient",
        }
    }

    /// `"pointLight"` and `"point light"` select `Point` as well.
    fn accepts(self, key: &str) -> bool {
        let key = key.strip_suffix("light").unwrap_or(key);
        normalize(self.label()) == key
    }
}

impl LightKind {
    pub fn casts_shadow(self) -> bool {
        !matches!(self, LightKind::Ambient)
    }

    pub fn has_helper(self) -> bool {
        !matches!(self, LightKind::Ambient)
    }
}

/// Debug visualisation drawn at the light's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightHelper {
    pub color: Rgb,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Rgb,
    pub intensity: f32,
    pub range: f32,
    pub cast_shadow: bool,
    pub helper: Option<LightHelper>,
}

impl Light {
    pub fn new(kind: LightKind, intensity: f32, shadows: bool, show_helper: bool) -> Self {
        Self {
            kind,
            color: WHITE,
            intensity,
            range: LIGHT_RANGE,
            cast_shadow: shadows && kind.casts_shadow(),
            helper: kind.has_helper().then_some(LightHelper {
                color: helper_color(kind),
                visible: show_helper,
            }),
        }
    }

    pub fn set_cast_shadow(&mut self, shadows: bool) {
        self.cast_shadow = shadows && self.kind.casts_shadow();
    }

    pub fn set_helper_visible(&mut self, visible: bool) {
        if let Some(helper) = &mut self.helper {
            helper.visible = visible;
        }
    }
}

fn helper_color(kind: LightKind) -> Rgb {
    match kind {
        LightKind::Directional => [1.0, 0.92, 0.50],
        LightKind::Point => [0.45, 0.90, 1.0],
        LightKind::Spot => [0.95, 0.65, 0.40],
        LightKind::Ambient => WHITE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_light_has_no_helper_and_never_casts() {
        let light = Light::new(LightKind::Ambient, 4.0, true, true);
        assert!(light.helper.is_none());
        assert!(!light.cast_shadow);

        let mut light = light;
        light.set_cast_shadow(true);
        assert!(!light.cast_shadow);
    }

    #[test]
    fn short_and_suffixed_labels_select_the_same_kind() {
        for (kind, names) in [
            (LightKind::Point, ["Point", "pointLight", "point light"]),
            (LightKind::Spot, ["Spot", "spotLight", "SPOT LIGHT"]),
            (LightKind::Directional, ["Directional", "directionalLight", "directional_light"]),
            (LightKind::Ambient, ["Ambient", "ambientLight", "ambient-light"]),
        ] {
            for name in names {
                assert_eq!(LightKind::parse(name), Some(kind), "{}", name);
            }
        }
        assert_eq!(LightKind::parse("light"), None);
        assert_eq!(LightKind::parse("Pointy"), None);
    }

    #[test]
    fn helper_visibility_follows_flag() {
        let mut light = Light::new(LightKind::Spot, 4.0, true, false);
        assert_eq!(light.helper.map(|h| h.visible), Some(false));
        light.set_helper_visible(true);
        assert_eq!(light.helper.map(|h| h.visible), Some(true));
        assert!(light.cast_shadow);
    }
}
