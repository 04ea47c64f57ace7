use super::teapot;
use crate::config::AssetCatalog;
use crate::settings::Choice;
use glam::Vec3;

const TEAPOT_SIZE: f32 = 0.4;

const CURVE_CONTROL_POINTS: [[f32; 3]; 3] =
    [[-10.0, 0.0, 0.0], [20.0, 15.0, 0.0], [10.0, 0.0, 0.0]];
const CURVE_DIVISIONS: usize = 50;

/// Geometry description handed to the render backend. Primitive variants keep
/// their construction parameters; the backend tessellates them.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cone {
        radius: f32,
        height: f32,
        radial_segments: u32,
        height_segments: u32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
        height_segments: u32,
    },
    Plane {
        width: f32,
        height: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Line {
        points: Vec<Vec3>,
    },
    Mesh {
        positions: Vec<Vec3>,
        indices: Vec<u32>,
    },
}

impl Geometry {
    /// Full size of the local bounding box.
    #[cfg(test)]
    pub fn extent(&self) -> Vec3 {
        match self {
            Geometry::Box {
                width,
                height,
                depth,
            } => Vec3::new(*width, *height, *depth),
            Geometry::Cone { radius, height, .. } => Vec3::new(radius * 2.0, *height, radius * 2.0),
            Geometry::Sphere { radius, .. } => Vec3::splat(radius * 2.0),
            // Ring lies in the XY plane.
            Geometry::Torus { radius, tube, .. } => {
                let outer = (radius + tube) * 2.0;
                Vec3::new(outer, outer, tube * 2.0)
            }
            Geometry::Cylinder {
                radius_top,
                radius_bottom,
                height,
                ..
            } => {
                let diameter = radius_top.max(*radius_bottom) * 2.0;
                Vec3::new(diameter, *height, diameter)
            }
            Geometry::Plane { width, height, .. } => Vec3::new(*width, *height, 0.0),
            Geometry::Line { points } => points_extent(points),
            Geometry::Mesh { positions, .. } => points_extent(positions),
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Geometry::Line { .. })
    }
}

#[cfg(test)]
fn points_extent(points: &[Vec3]) -> Vec3 {
    let Some(first) = points.first() else {
        return Vec3::ZERO;
    };
    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
    max - min
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Cube,
    Cone,
    Sphere,
    Torus,
    Cylinder,
    Teapot,
    Suzanne,
    Curve,
}

impl Choice for Shape {
    const ALL: &'static [Self] = &[
        Shape::Cube,
        Shape::Cone,
        Shape::Sphere,
        Shape::Torus,
        Shape::Cylinder,
        Shape::Teapot,
        Shape::Suzanne,
        Shape::Curve,
    ];

    fn label(self) -> &'static str {
        match self {
            Shape::Cube => "Cube",
            Shape::Cone => "Cone",
            Shape::Sphere => "Sphere",
            Shape::Torus => "Torus",
            Shape::Cylinder => "Cylinder",
            Shape::Teapot => "Teapot",
            Shape::Suzanne => "Suzanne",
            Shape::Curve => "Curve",
        }
    }
}

/// Where the geometry for a shape comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    Primitive(Geometry),
    Model { path: String, scale: f32 },
}

impl Shape {
    pub fn build(self, catalog: &AssetCatalog) -> GeometrySource {
        match self {
            Shape::Cube => GeometrySource::Primitive(Geometry::Box {
                width: 0.4,
                height: 0.4,
                depth: 0.4,
            }),
            Shape::Cone => GeometrySource::Primitive(Geometry::Cone {
                radius: 0.4,
                height: 0.4,
                radial_segments: 32,
                height_segments: 32,
            }),
            Shape::Sphere => GeometrySource::Primitive(Geometry::Sphere {
                radius: 0.4,
                width_segments: 50,
                height_segments: 50,
            }),
            Shape::Torus => GeometrySource::Primitive(Geometry::Torus {
                radius: 0.4,
                tube: 0.2,
                radial_segments: 40,
                tubular_segments: 40,
            }),
            Shape::Cylinder => GeometrySource::Primitive(Geometry::Cylinder {
                radius_top: 0.4,
                radius_bottom: 0.4,
                height: 0.8,
                radial_segments: 32,
                height_segments: 32,
            }),
            Shape::Curve => GeometrySource::Primitive(Geometry::Line {
                points: bezier_points(),
            }),
            Shape::Teapot => GeometrySource::Primitive(teapot::build(TEAPOT_SIZE)),
            Shape::Suzanne => GeometrySource::Model {
                path: catalog.suzanne.path.clone(),
                scale: catalog.suzanne.scale,
            },
        }
    }

    #[cfg(test)]
    pub fn is_model(self) -> bool {
        matches!(self, Shape::Suzanne)
    }
}

fn bezier_points() -> Vec<Vec3> {
    let [p0, p1, p2] = CURVE_CONTROL_POINTS.map(Vec3::from_array);
    (0..=CURVE_DIVISIONS)
        .map(|i| {
            let t = i as f32 / CURVE_DIVISIONS as f32;
            let u = 1.0 - t;
            p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primitive(shape: Shape) -> Geometry {
        match shape.build(&AssetCatalog::default()) {
            GeometrySource::Primitive(geometry) => geometry,
            GeometrySource::Model { .. } => panic!("{:?} should be primitive", shape),
        }
    }

    fn assert_extent(shape: Shape, expected: [f32; 3]) {
        let extent = primitive(shape).extent();
        assert!(
            extent.abs_diff_eq(Vec3::from_array(expected), 1e-5),
            "{:?}: {:?} != {:?}",
            shape,
            extent,
            expected
        );
    }

    #[test]
    fn primitive_footprints_match_fixed_dimensions() {
        assert_extent(Shape::Cube, [0.4, 0.4, 0.4]);
        assert_extent(Shape::Cone, [0.8, 0.4, 0.8]);
        assert_extent(Shape::Sphere, [0.8, 0.8, 0.8]);
        assert_extent(Shape::Torus, [1.2, 1.2, 0.4]);
        assert_extent(Shape::Cylinder, [0.8, 0.8, 0.8]);
    }

    #[test]
    fn every_shape_builds_something() {
        let catalog = AssetCatalog::default();
        for shape in Shape::ALL {
            match shape.build(&catalog) {
                GeometrySource::Primitive(geometry) => {
                    assert!(geometry.extent().length() > 0.0, "{:?}", shape)
                }
                GeometrySource::Model { path, scale } => {
                    assert!(shape.is_model());
                    assert!(!path.is_empty());
                    assert!(scale > 0.0);
                }
            }
        }
    }

    #[test]
    fn curve_is_sampled_between_its_end_points() {
        let Geometry::Line { points } = primitive(Shape::Curve) else {
            panic!("curve should be a line");
        };
        assert_eq!(points.len(), CURVE_DIVISIONS + 1);
        assert_eq!(points[0], Vec3::new(-10.0, 0.0, 0.0));
        assert_eq!(points[CURVE_DIVISIONS], Vec3::new(10.0, 0.0, 0.0));
        // Peak of the quadratic is at t = 0.5 with y = 7.5.
        assert!((points[25].y - 7.5).abs() < 1e-4);
    }

    #[test]
    fn model_shapes_take_catalog_scale() {
        let mut catalog = AssetCatalog::default();
        catalog.suzanne.scale = 0.25;
        assert_eq!(
            Shape::Suzanne.build(&catalog),
            GeometrySource::Model {
                path: catalog.suzanne.path.clone(),
                scale: 0.25
            }
        );
    }

    #[test]
    fn teapot_is_built_in_place() {
        let geometry = primitive(Shape::Teapot);
        assert!(matches!(geometry, Geometry::Mesh { .. }));
        assert!(!Shape::Teapot.is_model());
        assert!((geometry.extent().z - TEAPOT_SIZE * 2.0).abs() < 1e-3);
    }
}
