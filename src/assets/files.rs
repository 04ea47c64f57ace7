use super::{AssetError, AssetSource};
use crate::scene::materials::TextureImage;
use crate::scene::shapes::Geometry;
use glam::Vec3;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::PathBuf;

/// Loads models and images from disk, or images over http(s).
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        if candidate.is_absolute() {
            candidate
        } else {
            self.root.join(candidate)
        }
    }

    fn read_bytes(&self, source: &str) -> Result<Vec<u8>, AssetError> {
        if is_remote(source) {
            return fetch(source);
        }
        let path = self.resolve(source);
        std::fs::read(&path).map_err(|source| AssetError::Read {
            path: path.display().to_string(),
            source,
        })
    }
}

impl AssetSource for FileAssetSource {
    fn load_model(&self, path: &str, scale: f32) -> Result<Geometry, AssetError> {
        let (document, buffers, name) = if is_remote(path) {
            let (document, buffers) = import_remote(path)?;
            (document, buffers, path.to_string())
        } else {
            let resolved = self.resolve(path);
            let name = resolved.display().to_string();
            let (document, buffers, _images) =
                gltf::import(&resolved).map_err(|source| AssetError::ParseGltf {
                    path: name.clone(),
                    source,
                })?;
            let buffers = buffers.into_iter().map(|data| data.0).collect();
            (document, buffers, name)
        };

        let (positions, indices) = mesh_data(&document, &buffers, scale)
            .ok_or_else(|| AssetError::NoMesh { path: name.clone() })?;
        log::info!(
            "Loaded model {} ({} vertices, {} indices, scale {})",
            name,
            positions.len(),
            indices.len(),
            scale
        );
        Ok(Geometry::Mesh { positions, indices })
    }

    fn load_texture(&self, source: &str) -> Result<TextureImage, AssetError> {
        let bytes = self.read_bytes(source)?;
        let content_hash = format!("{:x}", Sha256::digest(&bytes));
        let image = image::load_from_memory(&bytes).map_err(|err| AssetError::Decode {
            name: source.to_string(),
            source: err,
        })?;
        let rgba = image.to_rgba8();
        log::info!(
            "Decoded texture {} ({}x{})",
            source,
            rgba.width(),
            rgba.height()
        );
        Ok(TextureImage {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
            content_hash,
        })
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn fetch(url: &str) -> Result<Vec<u8>, AssetError> {
    let response = ureq::get(url).call().map_err(|err| AssetError::Fetch {
        url: url.to_string(),
        message: err.to_string(),
    })?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|source| AssetError::Read {
            path: url.to_string(),
            source,
        })?;
    Ok(bytes)
}

/// Fetches a glTF (or GLB) document and every buffer it references.
/// Relative buffer URIs resolve against `url`.
fn import_remote(url: &str) -> Result<(gltf::Document, Vec<Vec<u8>>), AssetError> {
    let bytes = fetch(url)?;
    let gltf = gltf::Gltf::from_slice(&bytes).map_err(|source| AssetError::ParseGltf {
        path: url.to_string(),
        source,
    })?;
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf.blob.clone().unwrap_or_default(),
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                return Err(AssetError::Fetch {
                    url: url.to_string(),
                    message: "embedded data URIs are not supported for remote models".to_string(),
                });
            }
            gltf::buffer::Source::Uri(uri) => fetch(&join_url(url, uri))?,
        };
        if data.len() < buffer.length() {
            return Err(AssetError::ShortBuffer {
                path: url.to_string(),
                expected: buffer.length(),
                actual: data.len(),
            });
        }
        buffers.push(data);
    }
    Ok((gltf.document, buffers))
}

fn join_url(base: &str, relative: &str) -> String {
    if is_remote(relative) {
        return relative.to_string();
    }
    match base.rfind('/') {
        Some(slash) => format!("{}{}", &base[..=slash], relative),
        None => relative.to_string(),
    }
}

/// Positions scaled by `scale` and triangle indices of every primitive of the
/// first mesh. Primitives without indices are drawn in vertex order.
fn mesh_data(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    scale: f32,
) -> Option<(Vec<Vec3>, Vec<u32>)> {
    let mesh = first_mesh(document)?;
    let mut positions: Vec<Vec3> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let Some(read_positions) = reader.read_positions() else {
            continue;
        };
        let base = positions.len() as u32;
        positions.extend(read_positions.map(|p| Vec3::from_array(p) * scale));
        let count = positions.len() as u32 - base;
        match reader.read_indices() {
            Some(read_indices) => indices.extend(read_indices.into_u32().map(|i| base + i)),
            None => indices.extend(base..base + count),
        }
    }
    (!positions.is_empty()).then_some((positions, indices))
}

/// First mesh met in a depth-first walk of the default scene.
fn first_mesh(document: &gltf::Document) -> Option<gltf::Mesh<'_>> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    scene
        .and_then(|scene| scene.nodes().find_map(find_mesh))
        .or_else(|| document.meshes().next())
}

fn find_mesh(node: gltf::Node<'_>) -> Option<gltf::Mesh<'_>> {
    if let Some(mesh) = node.mesh() {
        return Some(mesh);
    }
    node.children().find_map(find_mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "shapelab_assets_{}_{}_{}",
            tag,
            std::process::id(),
            nonce
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn decodes_png_relative_to_root() {
        let dir = temp_dir("png");
        let mut img = image::RgbaImage::new(2, 3);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        img.save(dir.join("tex.png")).unwrap();

        let source = FileAssetSource::new(&dir);
        let texture = source.load_texture("tex.png").unwrap();
        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(texture.pixels.len(), 2 * 3 * 4);
        assert_eq!(&texture.pixels[..4], &[10, 20, 30, 255]);
        assert_eq!(texture.content_hash.len(), 64);

        let again = source.load_texture("tex.png").unwrap();
        assert_eq!(again.content_hash, texture.content_hash);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn garbage_image_is_a_decode_error() {
        let dir = temp_dir("garbage");
        std::fs::write(dir.join("bad.jpg"), b"definitely not a jpeg").unwrap();
        let source = FileAssetSource::new(&dir);
        assert!(matches!(
            source.load_texture("bad.jpg"),
            Err(AssetError::Decode { .. })
        ));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_files_are_read_or_parse_errors() {
        let dir = temp_dir("missing");
        let source = FileAssetSource::new(&dir);
        assert!(matches!(
            source.load_texture("nope.png"),
            Err(AssetError::Read { .. })
        ));
        assert!(matches!(
            source.load_model("nope.glb", 1.0),
            Err(AssetError::ParseGltf { .. })
        ));
        let _ = std::fs::remove_dir_all(dir);
    }

    fn write_scene(dir: &std::path::Path) {
        let tri_a = [[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let tri_b = [[1.0f32, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 0.0, 1.0]];
        let mut bin: Vec<u8> = tri_a
            .iter()
            .chain(tri_b.iter())
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        bin.extend([0u16, 2, 1].iter().flat_map(|i| i.to_le_bytes()));
        std::fs::write(dir.join("scene.bin"), &bin).unwrap();

        let position = |view: usize| {
            serde_json::json!({
                "bufferView": view, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 1.0]
            })
        };
        let gltf = serde_json::json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [
                { "name": "root", "children": [1] },
                { "name": "child", "mesh": 1 },
                { "name": "outside", "mesh": 0 }
            ],
            "meshes": [
                { "primitives": [{ "attributes": { "POSITION": 1 } }] },
                { "primitives": [
                    { "attributes": { "POSITION": 0 }, "indices": 2 },
                    { "attributes": { "POSITION": 1 } }
                ] }
            ],
            "accessors": [
                position(0),
                position(1),
                { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 72, "byteLength": 6 }
            ],
            "buffers": [{ "uri": "scene.bin", "byteLength": bin.len() }]
        });
        std::fs::write(dir.join("scene.gltf"), gltf.to_string()).unwrap();
    }

    #[test]
    fn gltf_takes_first_mesh_in_depth_first_order() {
        let dir = temp_dir("gltf");
        write_scene(&dir);

        let source = FileAssetSource::new(&dir);
        let Geometry::Mesh { positions, indices } = source.load_model("scene.gltf", 2.0).unwrap()
        else {
            panic!("model should load as a mesh");
        };
        // Both primitives of the child's mesh, not the unreferenced one.
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(positions[3], Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(indices, vec![0, 2, 1, 3, 4, 5]);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn relative_buffer_uris_join_the_model_url() {
        assert_eq!(
            join_url("https://host/models/suzanne/Suzanne.gltf", "Suzanne.bin"),
            "https://host/models/suzanne/Suzanne.bin"
        );
        assert_eq!(
            join_url("https://host/a.gltf", "https://cdn/b.bin"),
            "https://cdn/b.bin"
        );
    }

    #[test]
    fn remote_sources_are_detected_by_scheme() {
        assert!(is_remote("https://example.com/a.jpg"));
        assert!(is_remote("http://example.com/a.jpg"));
        assert!(!is_remote("assets/a.jpg"));
    }
}
