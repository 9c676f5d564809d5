//! Geometry primitives for the broad and narrow phase
//!
//! Everything here works on world-space points; shapes are posed by the
//! caller before testing.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec2,
    pub max: DVec2,
}

impl Aabb {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Square around a circle
    pub fn around_circle(center: DVec2, radius: f64) -> Self {
        let r = DVec2::splat(radius.abs());
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Smallest rectangle containing every point (None for an empty set)
    pub fn from_points<I: IntoIterator<Item = DVec2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Overlap test, touching edges count as overlapping
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }
}

/// Line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: DVec2,
    pub b: DVec2,
}

impl Segment {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self { a, b }
    }

    /// Direction vector from `a` to `b`
    #[inline]
    pub fn vector(&self) -> DVec2 {
        self.b - self.a
    }

    /// Parameter of the orthogonal projection of `p` on the supporting line
    ///
    /// 0 at `a`, 1 at `b`. A degenerate segment projects everything onto `a`.
    pub fn projection_param(&self, p: DVec2) -> f64 {
        let v = self.vector();
        let len_sq = v.length_squared();
        if len_sq < 1e-12 {
            return 0.0;
        }
        (p - self.a).dot(v) / len_sq
    }

    /// Projection of `p` on the segment, if it falls within the segment span
    pub fn projection_within(&self, p: DVec2) -> Option<DVec2> {
        let t = self.projection_param(p);
        (0.0..=1.0)
            .contains(&t)
            .then(|| self.a + self.vector() * t)
    }

    /// Closest point of the segment to `p`
    pub fn closest_point(&self, p: DVec2) -> DVec2 {
        let t = self.projection_param(p).clamp(0.0, 1.0);
        self.a + self.vector() * t
    }

    pub fn distance_squared_to(&self, p: DVec2) -> f64 {
        (p - self.closest_point(p)).length_squared()
    }

    /// Proper or touching intersection with another segment
    pub fn intersects(&self, other: &Segment) -> bool {
        let d1 = orientation(other.a, other.b, self.a);
        let d2 = orientation(other.a, other.b, self.b);
        let d3 = orientation(self.a, self.b, other.a);
        let d4 = orientation(self.a, self.b, other.b);

        if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
            && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
        {
            return true;
        }

        // Collinear / endpoint-touching cases
        (d1 == 0.0 && on_segment(other, self.a))
            || (d2 == 0.0 && on_segment(other, self.b))
            || (d3 == 0.0 && on_segment(self, other.a))
            || (d4 == 0.0 && on_segment(self, other.b))
    }
}

/// Signed area of the triangle (a, b, c); positive when counter-clockwise
#[inline]
fn orientation(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// `p` is known collinear with `s`; check it lies within the bounding box
fn on_segment(s: &Segment, p: DVec2) -> bool {
    p.x >= s.a.x.min(s.b.x)
        && p.x <= s.a.x.max(s.b.x)
        && p.y >= s.a.y.min(s.b.y)
        && p.y <= s.a.y.max(s.b.y)
}

/// Edges of a closed polygon, in vertex order
pub fn edges(vertices: &[DVec2]) -> impl Iterator<Item = Segment> + '_ {
    let n = vertices.len();
    (0..n).map(move |i| Segment::new(vertices[i], vertices[(i + 1) % n]))
}

/// Even-odd point containment; works for concave polygons
pub fn point_in_polygon(p: DVec2, vertices: &[DVec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > p.y) != (vj.y > p.y) {
            let x_cross = vj.x + (p.y - vj.y) * (vi.x - vj.x) / (vi.y - vj.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Circle-circle overlap (strict: tangent circles do not collide)
#[inline]
pub fn circles_overlap(c1: DVec2, r1: f64, c2: DVec2, r2: f64) -> bool {
    c1.distance_squared(c2) < (r1 + r2) * (r1 + r2)
}

/// Circle-polygon overlap: center inside, or an edge closer than the radius
pub fn polygon_circle_overlap(vertices: &[DVec2], center: DVec2, radius: f64) -> bool {
    if point_in_polygon(center, vertices) {
        return true;
    }
    let r_sq = radius * radius;
    edges(vertices).any(|edge| edge.distance_squared_to(center) < r_sq)
}

/// Polygon-polygon overlap: crossing edges, or one contained in the other
pub fn polygons_overlap(a: &[DVec2], b: &[DVec2]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let crossing = edges(a).any(|ea| edges(b).any(|eb| ea.intersects(&eb)));
    crossing || point_in_polygon(a[0], b) || point_in_polygon(b[0], a)
}

/// Quadrilateral covering a disc of `half_width` swept from `start` to `end`
///
/// Corners are the two centers offset along the travel normal; the round caps
/// are not covered.
pub fn swept_quad(start: DVec2, end: DVec2, half_width: f64) -> [DVec2; 4] {
    let normal = (end - start).perp().normalize_or_zero() * half_width;
    [start - normal, start + normal, end + normal, end - normal]
}
