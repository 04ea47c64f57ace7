//! Procedural teapot: body and lid lathed from Bézier profiles, handle and
//! spout swept along Bézier centrelines. Control points are in the classic
//! Newell units, where the body is two units in radius.

use super::shapes::Geometry;
use glam::{Vec2, Vec3};
use std::f32::consts::TAU;

const BODY_RADIUS: f32 = 2.0;
const LID_TOP: f32 = 3.15;
const RADIAL_SEGMENTS: u32 = 32;
const TUBE_SEGMENTS: u32 = 12;
const CURVE_STEPS: u32 = 8;

type Bezier = [[f32; 2]; 4];

/// (radius, height) from the rim down to the centre of the base.
const BODY: [Bezier; 4] = [
    [[1.4, 2.4], [1.3375, 2.53125], [1.4375, 2.53125], [1.5, 2.4]],
    [[1.5, 2.4], [1.75, 1.875], [2.0, 1.35], [2.0, 0.9]],
    [[2.0, 0.9], [2.0, 0.45], [1.5, 0.225], [1.5, 0.15]],
    [[1.5, 0.15], [1.5, 0.0], [1.0, 0.0], [0.0, 0.0]],
];

/// (radius, height) from the knob down to where the lid sits in the rim.
const LID: [Bezier; 2] = [
    [[0.0, 3.15], [0.8, 3.15], [0.0, 2.85], [0.2, 2.7]],
    [[0.2, 2.7], [0.4, 2.55], [1.3, 2.55], [1.3, 2.4]],
];

/// Centrelines in the XY plane.
const HANDLE: [Bezier; 2] = [
    [[-1.6, 1.875], [-2.3, 1.875], [-2.7, 1.875], [-2.7, 1.65]],
    [[-2.7, 1.65], [-2.7, 1.425], [-2.5, 0.975], [-2.0, 0.75]],
];
const SPOUT: [Bezier; 2] = [
    [[1.7, 1.275], [2.6, 1.275], [2.3, 1.95], [2.7, 2.25]],
    [[2.7, 2.25], [2.8, 2.325], [2.9, 2.325], [3.2, 2.4]],
];

/// Half-widths of the handle cross-section: in the curve plane and across it.
const HANDLE_HALF_WIDTH: (f32, f32) = (0.12, 0.3);
const SPOUT_BASE_RADIUS: f32 = 0.45;
const SPOUT_TIP_RADIUS: f32 = 0.18;

/// Teapot `size` units in body radius, centred vertically on the origin.
pub fn build(size: f32) -> Geometry {
    let mut mesh = MeshBuilder::default();
    mesh.lathe(&sample_path(&LID));
    mesh.lathe(&sample_path(&BODY));
    mesh.sweep(&sample_path(&HANDLE), |_| HANDLE_HALF_WIDTH);
    mesh.sweep(&sample_path(&SPOUT), |t| {
        let radius = SPOUT_BASE_RADIUS + (SPOUT_TIP_RADIUS - SPOUT_BASE_RADIUS) * t;
        (radius, radius)
    });

    let scale = size / BODY_RADIUS;
    let centre = Vec3::new(0.0, LID_TOP * 0.5, 0.0);
    Geometry::Mesh {
        positions: mesh
            .positions
            .into_iter()
            .map(|p| (p - centre) * scale)
            .collect(),
        indices: mesh.indices,
    }
}

fn bezier(curve: &Bezier, t: f32) -> Vec2 {
    let [a, b, c, d] = curve.map(Vec2::from_array);
    let u = 1.0 - t;
    a * (u * u * u) + b * (3.0 * u * u * t) + c * (3.0 * u * t * t) + d * (t * t * t)
}

/// Joined samples of consecutive curves; shared end points appear once.
fn sample_path(curves: &[Bezier]) -> Vec<Vec2> {
    let mut points = Vec::new();
    for (index, curve) in curves.iter().enumerate() {
        let first = if index == 0 { 0 } else { 1 };
        points.extend(
            (first..=CURVE_STEPS).map(|i| bezier(curve, i as f32 / CURVE_STEPS as f32)),
        );
    }
    points
}

#[derive(Default)]
struct MeshBuilder {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    /// Two triangles between each pair of neighbouring rows and columns.
    fn grid(&mut self, rows: Vec<Vec<Vec3>>) {
        let Some(columns) = rows.first().map(Vec::len) else {
            return;
        };
        let base = self.positions.len() as u32;
        let columns = columns as u32;
        let row_count = rows.len() as u32;
        self.positions.extend(rows.into_iter().flatten());
        for row in 0..row_count.saturating_sub(1) {
            for column in 0..columns.saturating_sub(1) {
                let a = base + row * columns + column;
                let b = a + 1;
                let c = a + columns;
                let d = c + 1;
                self.indices.extend([a, c, b, b, c, d]);
            }
        }
    }

    fn lathe(&mut self, profile: &[Vec2]) {
        let rows = profile
            .iter()
            .map(|point| {
                (0..=RADIAL_SEGMENTS)
                    .map(|j| {
                        let angle = TAU * j as f32 / RADIAL_SEGMENTS as f32;
                        Vec3::new(point.x * angle.cos(), point.y, point.x * angle.sin())
                    })
                    .collect()
            })
            .collect();
        self.grid(rows);
    }

    /// Tube along `path`; `half_width(t)` gives the in-plane and depth
    /// half-widths at path parameter `t` in `0..=1`.
    fn sweep(&mut self, path: &[Vec2], half_width: impl Fn(f32) -> (f32, f32)) {
        let last = path.len().saturating_sub(1);
        let rows = path
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let tangent = (path[(i + 1).min(last)] - path[i.saturating_sub(1)])
                    .normalize_or(Vec2::X);
                let normal = Vec2::new(-tangent.y, tangent.x);
                let (across, depth) = half_width(i as f32 / last.max(1) as f32);
                (0..=TUBE_SEGMENTS)
                    .map(|k| {
                        let angle = TAU * k as f32 / TUBE_SEGMENTS as f32;
                        let offset = normal * (across * angle.cos());
                        Vec3::new(point.x + offset.x, point.y + offset.y, depth * angle.sin())
                    })
                    .collect()
            })
            .collect();
        self.grid(rows);
    }
}
