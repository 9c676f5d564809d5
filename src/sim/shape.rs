//! Shape variants and pairwise narrow-phase dispatch
//!
//! Shapes are stored in local coordinates. To test them they are first posed
//! at a center and angle, producing a [`Posed`] value; the pairwise functions
//! below then match on both operands. A pairing a shape cannot evaluate
//! directly is delegated to the swapped call, so every pair has exactly one
//! implementation.

use std::cell::Cell;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry;
use crate::consts::PRECISION;
use crate::error::{Result, SimError};

/// Cached trig values of the current orientation and of the last look-ahead angle
#[derive(Debug, Clone, Copy)]
struct TrigCache {
    angle: f64,
    cos: f64,
    sin: f64,
    look_angle: f64,
    look_cos: f64,
    look_sin: f64,
}

impl Default for TrigCache {
    fn default() -> Self {
        // NaN angles never match, forcing a recompute on first use
        Self {
            angle: f64::NAN,
            cos: 1.0,
            sin: 0.0,
            look_angle: f64::NAN,
            look_cos: 1.0,
            look_sin: 0.0,
        }
    }
}

/// Polygon in local coordinates (offsets from the entity center)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonShape {
    vertices: Vec<DVec2>,
    #[serde(skip)]
    trig: Cell<TrigCache>,
}

impl PartialEq for PolygonShape {
    fn eq(&self, other: &Self) -> bool {
        self.vertices == other.vertices
    }
}

impl PolygonShape {
    pub fn new(vertices: Vec<DVec2>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(SimError::InvalidMotionParameters(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(SimError::InvalidMotionParameters(
                "polygon vertices must be finite".to_string(),
            ));
        }
        Ok(Self {
            vertices,
            trig: Cell::new(TrigCache::default()),
        })
    }

    /// Local vertices in order
    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Refresh the cached trig values of the committed orientation
    pub fn sync_angle(&self, angle: f64) {
        let mut cache = self.trig.get();
        if cache.angle != angle {
            cache.angle = angle;
            cache.cos = angle.cos();
            cache.sin = angle.sin();
            self.trig.set(cache);
        }
    }

    /// (cos, sin) of `angle`, reusing either cached pair when within tolerance
    pub fn cos_sin(&self, angle: f64) -> (f64, f64) {
        let mut cache = self.trig.get();
        if (angle - cache.angle).abs() <= PRECISION {
            return (cache.cos, cache.sin);
        }
        if (angle - cache.look_angle).abs() <= PRECISION {
            return (cache.look_cos, cache.look_sin);
        }
        cache.look_angle = angle;
        cache.look_cos = angle.cos();
        cache.look_sin = angle.sin();
        self.trig.set(cache);
        (cache.look_cos, cache.look_sin)
    }

    /// World-space vertices for a pose
    pub fn world_vertices(&self, center: DVec2, angle: f64) -> Vec<DVec2> {
        let (cos, sin) = self.cos_sin(angle);
        let rotation = DVec2::new(cos, sin);
        self.vertices
            .iter()
            .map(|&v| center + rotation.rotate(v))
            .collect()
    }

    /// Distance of the farthest vertex from the center
    pub fn extent(&self) -> f64 {
        self.vertices
            .iter()
            .map(|v| v.length())
            .fold(0.0, f64::max)
    }
}

/// Shape of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Circle { radius: f64 },
    Polygon(PolygonShape),
}

impl Shape {
    pub fn circle(radius: f64) -> Result<Self> {
        if radius < 0.0 || !radius.is_finite() {
            return Err(SimError::InvalidMotionParameters(format!(
                "circle radius must be finite and non-negative, got {radius}"
            )));
        }
        Ok(Shape::Circle { radius })
    }

    pub fn polygon(vertices: Vec<DVec2>) -> Result<Self> {
        Ok(Shape::Polygon(PolygonShape::new(vertices)?))
    }

    /// Re-run the constructor checks, for shapes that came from serde
    pub fn validate(&self) -> Result<()> {
        match self {
            Shape::Circle { radius } => Shape::circle(*radius).map(|_| ()),
            Shape::Polygon(poly) => PolygonShape::new(poly.vertices.clone()).map(|_| ()),
        }
    }

    /// Radius of the smallest center-anchored disc containing the shape
    pub fn extent(&self) -> f64 {
        match self {
            Shape::Circle { radius } => *radius,
            Shape::Polygon(poly) => poly.extent(),
        }
    }

    /// Place the shape in the world
    pub fn pose(&self, center: DVec2, angle: f64) -> Posed {
        match self {
            Shape::Circle { radius } => Posed::Circle {
                center,
                radius: *radius,
            },
            Shape::Polygon(poly) => Posed::Polygon(poly.world_vertices(center, angle)),
        }
    }
}

/// A shape placed in world space
#[derive(Debug, Clone, PartialEq)]
pub enum Posed {
    Circle { center: DVec2, radius: f64 },
    Polygon(Vec<DVec2>),
}

impl Posed {
    pub fn bounds(&self) -> geometry::Aabb {
        match self {
            Posed::Circle { center, radius } => geometry::Aabb::around_circle(*center, *radius),
            Posed::Polygon(vertices) => geometry::Aabb::from_points(vertices.iter().copied())
                .unwrap_or_else(|| geometry::Aabb::new(DVec2::ZERO, DVec2::ZERO)),
        }
    }
}

/// Exact overlap test between two posed shapes
pub fn overlaps(a: &Posed, b: &Posed) -> bool {
    match (a, b) {
        (
            Posed::Circle {
                center: c1,
                radius: r1,
            },
            Posed::Circle {
                center: c2,
                radius: r2,
            },
        ) => geometry::circles_overlap(*c1, *r1, *c2, *r2),
        (Posed::Polygon(vertices), Posed::Circle { center, radius }) => {
            geometry::polygon_circle_overlap(vertices, *center, *radius)
        }
        (Posed::Circle { .. }, Posed::Polygon(_)) => overlaps(b, a),
        (Posed::Polygon(va), Posed::Polygon(vb)) => geometry::polygons_overlap(va, vb),
    }
}

/// Approximate contact point and a direction vector of the contact tangent
pub fn contact_point_and_tangent(a: &Posed, b: &Posed) -> (DVec2, DVec2) {
    match (a, b) {
        (
            Posed::Circle {
                center: c1,
                radius: r1,
            },
            Posed::Circle { center: c2, .. },
        ) => {
            let between = *c2 - *c1;
            let dir = between.try_normalize().unwrap_or(DVec2::X);
            (*c1 + dir * *r1, dir.perp())
        }
        (Posed::Polygon(vertices), Posed::Circle { center, .. }) => {
            polygon_circle_contact(vertices, *center)
        }
        (Posed::Circle { .. }, Posed::Polygon(_)) => contact_point_and_tangent(b, a),
        (Posed::Polygon(va), Posed::Polygon(vb)) => polygon_polygon_contact(va, vb),
    }
}

/// Nearest feature of the polygon to the circle center: an edge projection or a vertex
fn polygon_circle_contact(vertices: &[DVec2], center: DVec2) -> (DVec2, DVec2) {
    let mut nearest_vertex = (f64::INFINITY, center);
    let mut nearest_edge: Option<(f64, DVec2, DVec2)> = None;

    for edge in geometry::edges(vertices) {
        let d = center.distance_squared(edge.a);
        if d < nearest_vertex.0 {
            nearest_vertex = (d, edge.a);
        }
        if let Some(projection) = edge.projection_within(center) {
            let d = center.distance_squared(projection);
            if nearest_edge.is_none_or(|(best, _, _)| d < best) {
                nearest_edge = Some((d, projection, edge.vector()));
            }
        }
    }

    match nearest_edge {
        Some((d, point, tangent)) if d < nearest_vertex.0 => (point, tangent),
        _ => {
            let vertex = nearest_vertex.1;
            (vertex, (vertex - center).perp())
        }
    }
}

/// Closest vertex-to-edge projection of `vertices` onto `edges_of`
fn nearest_projection(edges_of: &[DVec2], vertices: &[DVec2]) -> Option<(f64, DVec2, DVec2)> {
    let mut best: Option<(f64, DVec2, DVec2)> = None;
    for edge in geometry::edges(edges_of) {
        for &vertex in vertices {
            if let Some(projection) = edge.projection_within(vertex) {
                let d = vertex.distance_squared(projection);
                if best.is_none_or(|(bd, _, _)| d < bd) {
                    best = Some((d, vertex, edge.vector()));
                }
            }
        }
    }
    best
}

fn polygon_polygon_contact(a: &[DVec2], b: &[DVec2]) -> (DVec2, DVec2) {
    match (nearest_projection(a, b), nearest_projection(b, a)) {
        (Some(first), Some(second)) => {
            let (_, point, tangent) = if second.0 < first.0 { second } else { first };
            (point, tangent)
        }
        (Some((_, point, tangent)), None) | (None, Some((_, point, tangent))) => (point, tangent),
        (None, None) => nearest_vertex_pair(a, b),
    }
}

/// Vertex-to-vertex fallback when no projection lands inside an edge
fn nearest_vertex_pair(a: &[DVec2], b: &[DVec2]) -> (DVec2, DVec2) {
    let mut best = (f64::INFINITY, DVec2::ZERO, DVec2::X);
    for &va in a {
        for &vb in b {
            let d = va.distance_squared(vb);
            if d < best.0 {
                best = (d, va, vb);
            }
        }
    }
    let (_, va, vb) = best;
    let tangent = (vb - va).perp().try_normalize().unwrap_or(DVec2::Y);
    (va, tangent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn square(half: f64) -> Shape {
        Shape::polygon(vec![
            DVec2::new(-half, -half),
            DVec2::new(half, -half),
            DVec2::new(half, half),
            DVec2::new(-half, half),
        ])
        .unwrap()
    }

    fn unit_square() -> Shape {
        square(1.0)
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(matches!(
            Shape::circle(-1.0),
            Err(SimError::InvalidMotionParameters(_))
        ));
        assert!(Shape::polygon(vec![DVec2::ZERO, DVec2::X]).is_err());
        assert!(Shape::circle(0.0).is_ok());
    }

    #[test]
    fn test_trig_cache_slots() {
        let poly = PolygonShape::new(vec![DVec2::X, DVec2::Y, DVec2::NEG_X]).unwrap();
        poly.sync_angle(0.0);
        assert_eq!(poly.cos_sin(0.0), (1.0, 0.0));
        // Within tolerance of the committed angle: primary slot
        assert_eq!(poly.cos_sin(1e-7), (1.0, 0.0));

        let (c, s) = poly.cos_sin(FRAC_PI_2);
        assert!(c.abs() < 1e-12 && (s - 1.0).abs() < 1e-12);
        assert_eq!(poly.trig.get().look_angle, FRAC_PI_2);
        // Primary slot untouched by look-ahead queries
        assert_eq!(poly.trig.get().angle, 0.0);
    }

    #[test]
    fn test_world_vertices() {
        let sq = unit_square();
        let Posed::Polygon(v) = sq.pose(DVec2::new(10.0, 0.0), FRAC_PI_2) else {
            panic!("expected polygon");
        };
        assert!((v[0] - DVec2::new(11.0, -1.0)).length() < 1e-9);
        assert_eq!(sq.extent(), 2.0_f64.sqrt());
    }

    #[test]
    fn test_overlap_dispatch_is_symmetric() {
        let sq = unit_square().pose(DVec2::ZERO, 0.0);
        let near = Posed::Circle {
            center: DVec2::new(1.5, 0.0),
            radius: 1.0,
        };
        let far = Posed::Circle {
            center: DVec2::new(5.0, 0.0),
            radius: 1.0,
        };
        assert!(overlaps(&sq, &near));
        assert!(overlaps(&near, &sq));
        assert!(!overlaps(&far, &sq));
        assert!(overlaps(&near, &Posed::Circle { center: DVec2::new(2.4, 0.0), radius: 0.5 }));
    }

    #[test]
    fn test_circle_contact() {
        let a = Posed::Circle {
            center: DVec2::ZERO,
            radius: 2.0,
        };
        let b = Posed::Circle {
            center: DVec2::new(3.0, 0.0),
            radius: 2.0,
        };
        let (point, tangent) = contact_point_and_tangent(&a, &b);
        assert_eq!(point, DVec2::new(2.0, 0.0));
        assert_eq!(tangent, DVec2::Y);

        // Coincident centers fall back to +X
        let (point, _) = contact_point_and_tangent(&a, &a);
        assert_eq!(point, DVec2::new(2.0, 0.0));
    }

    #[test]
    fn test_polygon_circle_contact_edge_and_vertex() {
        let sq = unit_square().pose(DVec2::ZERO, 0.0);
        let beside = Posed::Circle {
            center: DVec2::new(1.5, 0.2),
            radius: 1.0,
        };
        let (point, tangent) = contact_point_and_tangent(&beside, &sq);
        assert!((point - DVec2::new(1.0, 0.2)).length() < 1e-12);
        assert_eq!(tangent.x, 0.0);

        let corner = Posed::Circle {
            center: DVec2::new(1.5, 1.5),
            radius: 1.0,
        };
        let (point, tangent) = contact_point_and_tangent(&sq, &corner);
        assert_eq!(point, DVec2::new(1.0, 1.0));
        assert!(tangent.dot(DVec2::new(1.0, 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_polygon_polygon_contact() {
        let a = unit_square().pose(DVec2::ZERO, 0.0);
        let b = square(0.5).pose(DVec2::new(1.3, 0.0), 0.0);
        let (point, tangent) = contact_point_and_tangent(&a, &b);
        // Vertex of b at (0.8, -0.5) sits just inside a's right edge
        assert!((point - DVec2::new(0.8, -0.5)).length() < 1e-12);
        assert_eq!(tangent.x, 0.0);
    }

    #[test]
    fn test_polygon_polygon_vertex_fallback() {
        // Corner to corner on the diagonal: no vertex projects inside any edge span
        let a = unit_square().pose(DVec2::ZERO, 0.0);
        let b = unit_square().pose(DVec2::new(2.1, 2.1), 0.0);
        let (Posed::Polygon(va), Posed::Polygon(vb)) = (&a, &b) else {
            panic!("expected polygons");
        };
        assert!(nearest_projection(va, vb).is_none());
        assert!(nearest_projection(vb, va).is_none());

        let (point, tangent) = contact_point_and_tangent(&a, &b);
        assert_eq!(point, DVec2::new(1.0, 1.0));
        assert!(tangent.dot(DVec2::new(1.0, 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_posed_bounds() {
        let b = unit_square().pose(DVec2::new(5.0, 5.0), 0.0).bounds();
        assert_eq!(b.min, DVec2::new(4.0, 4.0));
        assert_eq!(b.max, DVec2::new(6.0, 6.0));
    }
}
