//! Triangle and line lists for the GPU backend. Primitives follow the usual
//! conventions: boxes, spheres and cylinders centred on the origin, cylinders
//! and cones along Y, planes and torus rings in the XY plane.

use crate::scene::shapes::Geometry;
use glam::Vec3;
use std::collections::HashSet;
use std::f32::consts::{PI, TAU};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

/// Vertices plus a triangle list, or a line list when `lines` is set.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub lines: bool,
}

impl MeshData {
    fn line_list() -> Self {
        Self {
            lines: true,
            ..Self::default()
        }
    }

    /// Grid of `(columns + 1) * (rows + 1)` vertices from `vertex(u, v)`,
    /// two triangles per cell.
    fn surface(&mut self, columns: u32, rows: u32, vertex: impl Fn(f32, f32) -> Vertex) {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let base = self.vertices.len() as u32;
        for row in 0..=rows {
            let v = row as f32 / rows as f32;
            for column in 0..=columns {
                self.vertices.push(vertex(column as f32 / columns as f32, v));
            }
        }
        let stride = columns + 1;
        for row in 0..rows {
            for column in 0..columns {
                let a = base + row * stride + column;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                self.indices.extend([a, c, b, b, c, d]);
            }
        }
    }
}

pub fn tessellate(geometry: &Geometry) -> MeshData {
    match geometry {
        Geometry::Box {
            width,
            height,
            depth,
        } => cuboid(Vec3::new(*width, *height, *depth) * 0.5),
        Geometry::Cone {
            radius,
            height,
            radial_segments,
            height_segments,
        } => cylinder(0.0, *radius, *height, *radial_segments, *height_segments),
        Geometry::Sphere {
            radius,
            width_segments,
            height_segments,
        } => sphere(*radius, *width_segments, *height_segments),
        Geometry::Torus {
            radius,
            tube,
            radial_segments,
            tubular_segments,
        } => torus(*radius, *tube, *radial_segments, *tubular_segments),
        Geometry::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
            height_segments,
        } => cylinder(
            *radius_top,
            *radius_bottom,
            *height,
            *radial_segments,
            *height_segments,
        ),
        Geometry::Plane {
            width,
            height,
            width_segments,
            height_segments,
        } => {
            let mut mesh = MeshData::default();
            mesh.surface(*width_segments, *height_segments, |u, v| {
                let position = Vec3::new((u - 0.5) * width, (0.5 - v) * height, 0.0);
                Vertex::new(position, Vec3::Z, [u, 1.0 - v])
            });
            mesh
        }
        Geometry::Line { points } => polyline(points),
        Geometry::Mesh { positions, indices } => smooth_mesh(positions, indices),
    }
}

fn cuboid(half: Vec3) -> MeshData {
    // (normal, right, up) per face.
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let mut mesh = MeshData::default();
    for (normal, right, up) in FACES {
        mesh.surface(1, 1, |u, v| {
            let corner = normal + right * (u * 2.0 - 1.0) + up * (1.0 - v * 2.0);
            Vertex::new(corner * half, normal, [u, 1.0 - v])
        });
    }
    mesh
}

fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    mesh.surface(width_segments, height_segments, |u, v| {
        let (phi, theta) = (u * TAU, v * PI);
        let normal = Vec3::new(
            -phi.cos() * theta.sin(),
            theta.cos(),
            phi.sin() * theta.sin(),
        );
        Vertex::new(normal * radius, normal, [u, 1.0 - v])
    });
    mesh
}

fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    mesh.surface(tubular_segments, radial_segments, |u, v| {
        let (sin, cos) = (u * TAU).sin_cos();
        let across = v * TAU;
        let centre = Vec3::new(cos, sin, 0.0) * radius;
        let ring = radius + tube * across.cos();
        let position = Vec3::new(ring * cos, ring * sin, tube * across.sin());
        Vertex::new(position, (position - centre).normalize_or_zero(), [u, v])
    });
    mesh
}

/// Open tube from `radius_top` down to `radius_bottom`, capped where the
/// radius is non-zero. A zero top radius gives a cone.
fn cylinder(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
    height_segments: u32,
) -> MeshData {
    let half = height * 0.5;
    let slope = if height > 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };
    let mut mesh = MeshData::default();
    mesh.surface(radial_segments, height_segments, |u, v| {
        let theta = u * TAU;
        let (sin, cos) = theta.sin_cos();
        let radius = radius_top + (radius_bottom - radius_top) * v;
        let position = Vec3::new(radius * sin, half - v * height, radius * cos);
        let normal = Vec3::new(sin, slope, cos).normalize();
        Vertex::new(position, normal, [u, 1.0 - v])
    });
    let caps = [
        (radius_top, half, Vec3::Y),
        (radius_bottom, -half, Vec3::NEG_Y),
    ];
    for (radius, y, normal) in caps {
        if radius > 0.0 {
            cap(&mut mesh, radius, y, normal, radial_segments.max(3));
        }
    }
    mesh
}

fn cap(mesh: &mut MeshData, radius: f32, y: f32, normal: Vec3, segments: u32) {
    let centre = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::new(Vec3::new(0.0, y, 0.0), normal, [0.5, 0.5]));
    for i in 0..=segments {
        let (sin, cos) = (i as f32 / segments as f32 * TAU).sin_cos();
        let uv = [cos * 0.5 + 0.5, sin * 0.5 * normal.y + 0.5];
        let position = Vec3::new(radius * sin, y, radius * cos);
        mesh.vertices.push(Vertex::new(position, normal, uv));
    }
    for i in 0..segments {
        mesh.indices.extend([centre, centre + 1 + i, centre + 2 + i]);
    }
}

fn polyline(points: &[Vec3]) -> MeshData {
    let mut mesh = MeshData::line_list();
    mesh.vertices = points
        .iter()
        .map(|point| Vertex::new(*point, Vec3::ZERO, [0.0, 0.0]))
        .collect();
    for i in 1..points.len() as u32 {
        mesh.indices.extend([i - 1, i]);
    }
    mesh
}

/// Vertex normals averaged from the area-weighted normals of the faces
/// around each vertex. Triangles with an out-of-range index are dropped.
fn smooth_mesh(positions: &[Vec3], indices: &[u32]) -> MeshData {
    let count = positions.len();
    let triangles: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .filter(|t| t.iter().all(|&i| (i as usize) < count))
        .collect();
    let mut normals = vec![Vec3::ZERO; count];
    for [a, b, c] in &triangles {
        let [pa, pb, pc] = [a, b, c].map(|i| positions[*i as usize]);
        let face = (pb - pa).cross(pc - pa);
        for i in [a, b, c] {
            normals[*i as usize] += face;
        }
    }
    MeshData {
        vertices: positions
            .iter()
            .zip(normals)
            .map(|(position, normal)| {
                Vertex::new(*position, normal.normalize_or(Vec3::Y), [0.0, 0.0])
            })
            .collect(),
        indices: triangles.into_iter().flatten().collect(),
        lines: false,
    }
}

/// Unique triangle edges of `mesh` as a line list over the same vertices.
pub fn wireframe(mesh: &MeshData) -> MeshData {
    if mesh.lines {
        return mesh.clone();
    }
    let mut seen = HashSet::new();
    let mut indices = Vec::new();
    for triangle in mesh.indices.chunks_exact(3) {
        for (a, b) in [
            (triangle[0], triangle[1]),
            (triangle[1], triangle[2]),
            (triangle[2], triangle[0]),
        ] {
            if seen.insert((a.min(b), a.max(b))) {
                indices.extend([a, b]);
            }
        }
    }
    MeshData {
        vertices: mesh.vertices.clone(),
        indices,
        lines: true,
    }
}

/// Square grid of `size` in the XZ plane with `divisions` cells per side.
pub fn grid_lines(size: f32, divisions: u32) -> MeshData {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;
    let mut mesh = MeshData::line_list();
    for i in 0..=divisions {
        let offset = -half + step * i as f32;
        for (from, to) in [
            (Vec3::new(-half, 0.0, offset), Vec3::new(half, 0.0, offset)),
            (Vec3::new(offset, 0.0, -half), Vec3::new(offset, 0.0, half)),
        ] {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.push(Vertex::new(from, Vec3::ZERO, [0.0, 0.0]));
            mesh.vertices.push(Vertex::new(to, Vec3::ZERO, [0.0, 0.0]));
            mesh.indices.extend([base, base + 1]);
        }
    }
    mesh
}

/// Three axis-aligned strokes of length `size` crossing at the origin.
pub fn light_marker(size: f32) -> MeshData {
    let mut mesh = MeshData::line_list();
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        let base = mesh.vertices.len() as u32;
        for end in [-axis, axis] {
            mesh.vertices.push(Vertex::new(end * size * 0.5, Vec3::ZERO, [0.0, 0.0]));
        }
        mesh.indices.extend([base, base + 1]);
    }
    mesh
}
