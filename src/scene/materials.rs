use crate::config::AssetCatalog;
use crate::settings::Choice;
use std::sync::Arc;

pub type Rgb = [f32; 3];

pub const WHITE: Rgb = [1.0, 1.0, 1.0];
pub const CURVE_RED: Rgb = [1.0, 0.0, 0.0];
const PHONG_SPECULAR: u32 = 0x009900;
const PHONG_SHININESS: f32 = 10.0;

pub fn rgb_from_hex(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    Unlit,
    Normal,
    Phong,
    Lambert,
    Standard,
    Line,
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureMap {
    pub source: String,
    pub repeat: [f32; 2],
    pub wrap_repeat: bool,
    /// `None` until decoding finishes.
    pub image: Option<Arc<TextureImage>>,
}

impl TextureMap {
    pub fn pending(source: &str, repeat: [f32; 2]) -> Self {
        Self {
            source: source.to_string(),
            repeat,
            wrap_repeat: true,
            image: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub shading: Shading,
    pub color: Rgb,
    pub specular: Option<Rgb>,
    pub shininess: f32,
    pub flat_shading: bool,
    pub wireframe: bool,
    pub env_mapped: bool,
    pub map: Option<TextureMap>,
    pub opacity: f32,
    pub transparent: bool,
}

impl Material {
    pub fn new(shading: Shading, color: Rgb) -> Self {
        Self {
            shading,
            color,
            specular: None,
            shininess: 0.0,
            flat_shading: false,
            wireframe: false,
            env_mapped: false,
            map: None,
            opacity: 1.0,
            transparent: false,
        }
    }

    pub fn wireframe(mut self) -> Self {
        self.wireframe = true;
        self
    }

    pub fn with_map(mut self, map: TextureMap) -> Self {
        self.map = Some(map);
        self
    }

    pub fn line(color: Rgb) -> Self {
        Self::new(Shading::Line, color)
    }

    /// Textured unlit material for an image the user supplied.
    pub fn uploaded(source: &str, image: Option<Arc<TextureImage>>) -> Self {
        let mut map = TextureMap::pending(source, [1.0, 1.0]);
        map.image = image;
        Self::new(Shading::Unlit, WHITE).with_map(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Basic,
    Normal,
    Line,
    Texture1,
    Texture2,
    Phong,
    Lambert,
    WireLambert,
    Reflective,
}

impl Choice for MaterialKind {
    const ALL: &'static [Self] = &[
        MaterialKind::Basic,
        MaterialKind::Normal,
        MaterialKind::Line,
        MaterialKind::Texture1,
        MaterialKind::Texture2,
        MaterialKind::Phong,
        MaterialKind::Lambert,
        MaterialKind::WireLambert,
        MaterialKind::Reflective,
    ];

    fn label(self) -> &'static str {
        match self {
            MaterialKind::Basic => "Basic",
            MaterialKind::Normal => "Normal",
            MaterialKind::Line => "Line",
            MaterialKind::Texture1 => "Texture 1",
            MaterialKind::Texture2 => "Texture 2",
            MaterialKind::Phong => "Phong shading",
            MaterialKind::Lambert => "Lambert shading",
            MaterialKind::WireLambert => "Wire lambert",
            MaterialKind::Reflective => "Reflective",
        }
    }
}

impl MaterialKind {
    /// Builds the material. Texture-backed kinds come back with a pending map
    /// unless `cached` already holds the decoded image.
    pub fn build(
        self,
        color: Rgb,
        catalog: &AssetCatalog,
        cached: impl Fn(&str) -> Option<Arc<TextureImage>>,
    ) -> Material {
        match self {
            MaterialKind::Basic => Material::new(Shading::Unlit, color),
            MaterialKind::Normal => Material::new(Shading::Normal, WHITE),
            MaterialKind::Line => Material::new(Shading::Normal, WHITE).wireframe(),
            MaterialKind::Phong => {
                let mut material = Material::new(Shading::Phong, color);
                material.specular = Some(rgb_from_hex(PHONG_SPECULAR));
                material.shininess = PHONG_SHININESS;
                material.flat_shading = true;
                material
            }
            MaterialKind::Lambert => Material::new(Shading::Lambert, color),
            MaterialKind::WireLambert => Material::new(Shading::Lambert, color).wireframe(),
            MaterialKind::Reflective => {
                let mut material = Material::new(Shading::Unlit, color);
                material.env_mapped = true;
                material
            }
            MaterialKind::Texture1 | MaterialKind::Texture2 => {
                let asset = match self {
                    MaterialKind::Texture1 => &catalog.texture_1,
                    _ => &catalog.texture_2,
                };
                let mut map = TextureMap::pending(&asset.source, asset.repeat);
                map.image = cached(&asset.source);
                Material::new(Shading::Unlit, WHITE).with_map(map)
            }
        }
    }
}
