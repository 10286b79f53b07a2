//! Ray intersection with hair curve segments.
//!
//! Segments are uniform Catmull-Rom splines over four control points, converted to cubic
//! Bezier form and intersected by recursive subdivision in a coordinate system where the
//! ray runs along +z from the origin. Subdivision stops once the flattened curve is within
//! a fraction of its radius, the remaining piece is treated as a line segment.

use super::{FloatType, Interpolate, LocalRay, WorldBox, WorldMatrix, WorldPoint, WorldVector};

const MAX_SUBDIVISION_DEPTH: u32 = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CurveShape {
    /// Round tube, the hit is placed on its front surface
    Thick,
    /// Flat strip facing the ray
    Ribbon,
}

/// One span of a Catmull-Rom curve, between `keys[1]` and `keys[2]`.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveSegment {
    pub keys: [WorldPoint; 4],
    /// Radius at the start and at the end of the span
    pub radius: [FloatType; 2],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurveHit {
    pub t: FloatType,
    /// Position along the span, 0 at the start, 1 at the end
    pub u: FloatType,
    /// Position across the curve, 0.5 on the center line
    pub v: FloatType,
}

impl CurveSegment {
    pub fn new(keys: [WorldPoint; 4], radius: [FloatType; 2]) -> CurveSegment {
        CurveSegment { keys, radius }
    }

    pub fn max_radius(&self) -> FloatType {
        self.radius[0].max(self.radius[1])
    }

    /// Control points of the equivalent cubic Bezier curve
    pub fn bezier_points(&self) -> [WorldPoint; 4] {
        let [p0, p1, p2, p3] = self.keys;
        [p1, p1 + (p2 - p0) / 6.0, p2 - (p3 - p1) / 6.0, p2]
    }

    /// Box around the center line. Does not include the radius.
    pub fn center_line_bounds(&self) -> WorldBox {
        // Bezier curve lies in the convex hull of its control points
        self.bezier_points()
            .iter()
            .fold(WorldBox::empty(), |b, p| b.including(p))
    }

    pub fn bounds(&self) -> WorldBox {
        self.center_line_bounds().padded(self.max_radius())
    }

    pub fn transformed(&self, matrix: &WorldMatrix) -> CurveSegment {
        let scale = super::ray_point_intersection::uniform_scale(matrix);
        CurveSegment {
            keys: self.keys.map(|p| matrix.transform_point(&p)),
            radius: self.radius.map(|r| r * scale),
        }
    }

    fn radius_at(&self, u: FloatType) -> FloatType {
        self.radius[0] + (self.radius[1] - self.radius[0]) * u
    }

    /// Nearest intersection strictly inside (tmin, tmax).
    pub fn intersect(
        &self,
        ray: &LocalRay,
        shape: CurveShape,
        tmin: FloatType,
        tmax: FloatType,
    ) -> Option<CurveHit> {
        let direction_length = ray.direction.norm();
        let max_radius = self.max_radius();
        if direction_length == 0.0 || max_radius <= 0.0 {
            return None;
        }

        let frame = RaySpace::new(ray, direction_length);
        let control_points = self.bezier_points().map(|p| frame.to_ray_space(&p));

        // Distances are measured along the normalized direction in ray space
        let z_range = (tmin * direction_length, tmax * direction_length);

        let depth = subdivision_depth(&control_points, max_radius);
        let hit = self.recursive_intersect(&control_points, (0.0, 1.0), depth, z_range, shape)?;

        Some(CurveHit {
            t: hit.t / direction_length,
            ..hit
        })
    }

    fn recursive_intersect(
        &self,
        cp: &[WorldVector; 4],
        u_range: (FloatType, FloatType),
        depth: u32,
        z_range: (FloatType, FloatType),
        shape: CurveShape,
    ) -> Option<CurveHit> {
        let max_radius = self.radius_at(u_range.0).max(self.radius_at(u_range.1));

        if !overlaps_ray(cp, max_radius, z_range) {
            return None;
        }

        if depth > 0 {
            let halves = split_bezier(cp);
            let u_mid = (u_range.0 + u_range.1) / 2.0;

            let mut best: Option<CurveHit> = None;
            for (half, range) in halves.iter().zip([(u_range.0, u_mid), (u_mid, u_range.1)]) {
                let z_max = best.map_or(z_range.1, |b| b.t);
                if let Some(hit) =
                    self.recursive_intersect(half, range, depth - 1, (z_range.0, z_max), shape)
                {
                    best = Some(hit);
                }
            }
            return best;
        }

        self.segment_intersect(cp, u_range, z_range, shape)
    }

    /// Intersection with the flattened remainder of the curve, treated as a line segment.
    fn segment_intersect(
        &self,
        cp: &[WorldVector; 4],
        u_range: (FloatType, FloatType),
        z_range: (FloatType, FloatType),
        shape: CurveShape,
    ) -> Option<CurveHit> {
        // Reject hits behind the planes perpendicular to the curve at the segment ends,
        // these belong to the neighbouring segments
        let start_edge = (cp[1].y - cp[0].y) * -cp[0].y + cp[0].x * (cp[0].x - cp[1].x);
        if start_edge < 0.0 {
            return None;
        }
        let end_edge = (cp[2].y - cp[3].y) * -cp[3].y + cp[3].x * (cp[3].x - cp[2].x);
        if end_edge < 0.0 {
            return None;
        }

        let segment = cp[3].xy() - cp[0].xy();
        let length_squared = segment.norm_squared();
        let w = if length_squared == 0.0 {
            0.0
        } else {
            (-cp[0].xy().dot(&segment) / length_squared).clamp(0.0, 1.0)
        };

        let u = u_range.0 + (u_range.1 - u_range.0) * w;
        let radius = self.radius_at(u);
        let point = evaluate_bezier(cp, w);

        let distance_squared = point.xy().norm_squared();
        if distance_squared > radius * radius {
            return None;
        }
        let distance = distance_squared.sqrt();

        // Side of the curve the ray passes on, for the across-curve coordinate
        let side = segment.perp(&-point.xy());
        let signed_distance = if side < 0.0 { -distance } else { distance };
        let v = 0.5 + 0.5 * signed_distance / radius;

        let z = match shape {
            CurveShape::Ribbon => point.z,
            CurveShape::Thick => {
                let depth = (radius * radius - distance_squared).sqrt();
                let front = point.z - depth;
                if front > z_range.0 { front } else { point.z + depth }
            }
        };

        if z > z_range.0 && z < z_range.1 {
            Some(CurveHit { t: z, u, v })
        } else {
            None
        }
    }
}

impl Interpolate for CurveSegment {
    fn interpolate(&self, other: &Self, factor: FloatType) -> Self {
        CurveSegment {
            keys: std::array::from_fn(|i| self.keys[i].interpolate(&other.keys[i], factor)),
            radius: std::array::from_fn(|i| {
                self.radius[i] + (other.radius[i] - self.radius[i]) * factor
            }),
        }
    }
}

/// Orthonormal frame with the ray origin at zero and the ray direction along +z.
struct RaySpace {
    origin: WorldPoint,
    x: WorldVector,
    y: WorldVector,
    z: WorldVector,
}

impl RaySpace {
    fn new(ray: &LocalRay, direction_length: FloatType) -> RaySpace {
        let z = ray.direction / direction_length;
        let x = if z.x.abs() > z.y.abs() {
            WorldVector::new(-z.z, 0.0, z.x) / (z.x * z.x + z.z * z.z).sqrt()
        } else {
            WorldVector::new(0.0, z.z, -z.y) / (z.y * z.y + z.z * z.z).sqrt()
        };
        let y = z.cross(&x);
        RaySpace {
            origin: ray.origin,
            x,
            y,
            z,
        }
    }

    fn to_ray_space(&self, p: &WorldPoint) -> WorldVector {
        let d = p - self.origin;
        WorldVector::new(d.dot(&self.x), d.dot(&self.y), d.dot(&self.z))
    }
}

/// Whether the hull of the control points, grown by the radius, can contain the ray.
fn overlaps_ray(cp: &[WorldVector; 4], radius: FloatType, z_range: (FloatType, FloatType)) -> bool {
    let (min, max) = cp.iter().fold(
        (
            WorldVector::repeat(FloatType::INFINITY),
            WorldVector::repeat(FloatType::NEG_INFINITY),
        ),
        |(min, max), p| (min.inf(p), max.sup(p)),
    );

    min.x - radius <= 0.0
        && max.x + radius >= 0.0
        && min.y - radius <= 0.0
        && max.y + radius >= 0.0
        && max.z + radius >= z_range.0
        && min.z - radius <= z_range.1
}

/// Number of halvings needed to flatten the curve to within a fraction of its radius.
fn subdivision_depth(cp: &[WorldVector; 4], radius: FloatType) -> u32 {
    let l0 = (0..2)
        .map(|i| (cp[i] - 2.0 * cp[i + 1] + cp[i + 2]).amax())
        .fold(0.0, FloatType::max);
    let epsilon = radius * 0.05;
    let depth = ((std::f32::consts::SQRT_2 * 6.0 * l0 / (8.0 * epsilon)).log2() / 2.0).ceil();
    if depth.is_nan() || depth <= 0.0 {
        0
    } else {
        (depth as u32).min(MAX_SUBDIVISION_DEPTH)
    }
}

/// De Casteljau split at the parameter midpoint.
fn split_bezier(cp: &[WorldVector; 4]) -> [[WorldVector; 4]; 2] {
    let mid = |a: &WorldVector, b: &WorldVector| (a + b) / 2.0;
    let p01 = mid(&cp[0], &cp[1]);
    let p12 = mid(&cp[1], &cp[2]);
    let p23 = mid(&cp[2], &cp[3]);
    let p012 = mid(&p01, &p12);
    let p123 = mid(&p12, &p23);
    let p0123 = mid(&p012, &p123);

    [[cp[0], p01, p012, p0123], [p0123, p123, p23, cp[3]]]
}

fn evaluate_bezier(cp: &[WorldVector; 4], t: FloatType) -> WorldVector {
    let s = 1.0 - t;
    cp[0] * (s * s * s) + cp[1] * (3.0 * s * s * t) + cp[2] * (3.0 * s * t * t) + cp[3] * (t * t * t)
}
