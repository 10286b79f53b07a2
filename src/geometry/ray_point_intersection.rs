use super::{FloatType, Interpolate, LocalRay, WorldBox, WorldMatrix, WorldPoint, WorldVector};

/// Point cloud primitive, a sphere of the given radius.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointPrimitive {
    pub center: WorldPoint,
    pub radius: FloatType,
}

impl PointPrimitive {
    pub fn new(center: WorldPoint, radius: FloatType) -> PointPrimitive {
        PointPrimitive { center, radius }
    }

    /// Nearest intersection strictly inside (tmin, tmax).
    /// The ray direction does not have to be normalized.
    #[inline]
    pub fn intersect(
        &self,
        ray: &LocalRay,
        tmin: FloatType,
        tmax: FloatType,
    ) -> Option<FloatType> {
        let oc = ray.origin - self.center;
        let a = ray.direction.norm_squared();
        let b = oc.dot(&ray.direction);
        let c = oc.norm_squared() - self.radius * self.radius;
        let discriminant = b * b - a * c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / a;
        let t2 = (-b + sqrt_disc) / a;
        [t1, t2].into_iter().find(|t| *t > tmin && *t < tmax)
    }

    pub fn bounds(&self) -> WorldBox {
        let r_vec = WorldVector::repeat(self.radius);
        WorldBox {
            min: self.center - r_vec,
            max: self.center + r_vec,
        }
    }

    pub fn transformed(&self, matrix: &WorldMatrix) -> PointPrimitive {
        PointPrimitive {
            center: matrix.transform_point(&self.center),
            radius: self.radius * uniform_scale(matrix),
        }
    }
}

impl Interpolate for PointPrimitive {
    fn interpolate(&self, other: &Self, factor: FloatType) -> Self {
        PointPrimitive {
            center: self.center.interpolate(&other.center, factor),
            radius: self.radius + (other.radius - self.radius) * factor,
        }
    }
}

/// Radius scale of an affine transform, the average length of the transformed basis vectors.
pub(super) fn uniform_scale(matrix: &WorldMatrix) -> FloatType {
    (0..3)
        .map(|i| matrix.fixed_view::<3, 1>(0, i).norm())
        .sum::<FloatType>()
        / 3.0
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::{assert, let_assert};

    fn point() -> PointPrimitive {
        PointPrimitive::new([1.0, 2.0, 3.0].into(), 1.0)
    }

    fn ray(origin: [f32; 3], direction: [f32; 3]) -> LocalRay {
        LocalRay::new(origin.into(), direction.into())
    }

    #[test]
    fn test_direct_hit_through_center() {
        let hit = point().intersect(&ray([1.0, 2.0, 0.0], [0.0, 0.0, 1.0]), 0.0, f32::INFINITY);

        let_assert!(Some(t) = hit);
        assert!((t - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_grazing_hit() {
        let hit = point().intersect(&ray([2.0, 2.0, 0.0], [0.0, 0.0, 1.0]), 0.0, f32::INFINITY);

        let_assert!(Some(t) = hit);
        assert!((t - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_narrow_miss() {
        let hit = point().intersect(&ray([2.0, 2.01, 0.0], [0.0, 0.0, 1.0]), 0.0, f32::INFINITY);
        assert!(hit.is_none());
    }

    #[test]
    fn test_unnormalized_direction() {
        let hit = point().intersect(&ray([1.0, 2.0, 0.0], [0.0, 0.0, 4.0]), 0.0, f32::INFINITY);

        let_assert!(Some(t) = hit);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_origin_inside_reports_exit() {
        let hit = point().intersect(&ray([1.0, 2.0, 3.0], [0.0, 0.0, 1.0]), 0.0, f32::INFINITY);

        let_assert!(Some(t) = hit);
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_range_excludes_hit() {
        let hit = point().intersect(&ray([1.0, 2.0, 0.0], [0.0, 0.0, 1.0]), 0.0, 1.5);
        assert!(hit.is_none());
    }

    #[test]
    fn transformed_scales_radius() {
        let matrix = WorldMatrix::new_scaling(2.0);
        let p = point().transformed(&matrix);
        assert!(p.center == WorldPoint::new(2.0, 4.0, 6.0));
        assert!((p.radius - 2.0).abs() < 1e-6);
    }
}
