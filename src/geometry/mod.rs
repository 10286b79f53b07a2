mod aabb;
mod ray_box_intersection;
mod ray_curve_intersection;
mod ray_point_intersection;
mod ray_triangle_intersection;
mod transform;
mod triangle;

pub use aabb::AABB;
pub use ray_box_intersection::RayIntersectionExt;
pub use ray_curve_intersection::{CurveHit, CurveSegment, CurveShape};
pub use ray_point_intersection::PointPrimitive;
pub use transform::{DecomposedTransform, ObjectTransform};
pub use triangle::{BarycentricCoordinates, Triangle};

use crate::scene::{ObjectIdx, PrimIdx};

pub type FloatType = f32;
pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;
pub type WorldMatrix = nalgebra::Matrix4<FloatType>;
pub type WorldBox = AABB<WorldPoint>;

pub const EPSILON: FloatType = 1e-6;

/// A ray as issued by the caller, always in world space.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: WorldVector,

    /// Valid parametric interval, intersections are reported only strictly inside it
    pub tmin: FloatType,
    pub tmax: FloatType,

    /// Shutter time in [0, 1], used for motion blur
    pub time: FloatType,

    pub self_token: SelfToken,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
            tmin: 0.0,
            tmax: FloatType::INFINITY,
            time: 0.0,
            self_token: SelfToken::default(),
        }
    }

    pub fn with_range(self, tmin: FloatType, tmax: FloatType) -> Ray {
        Ray { tmin, tmax, ..self }
    }

    pub fn with_time(self, time: FloatType) -> Ray {
        Ray { time, ..self }
    }

    pub fn with_self_token(self, self_token: SelfToken) -> Ray {
        Ray { self_token, ..self }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }

    /// Rays failing this check are answered with "no intersection" without touching the scene.
    pub fn is_valid(&self) -> bool {
        self.origin.iter().all(|x| x.is_finite())
            && self.direction.iter().all(|x| x.is_finite())
            && self.direction.norm_squared() > 0.0
            && self.tmin <= self.tmax
    }

    pub(crate) fn local(&self) -> LocalRay {
        LocalRay::new(self.origin, self.direction)
    }
}

/// Identifies a primitive placed in the scene by a specific object.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PrimitiveRef {
    pub object: ObjectIdx,
    pub prim: PrimIdx,
}

/// Primitives a ray must never report, to avoid hitting the surface it starts on
/// (and for shadow rays, the light it ends on).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SelfToken {
    pub origin: Option<PrimitiveRef>,
    pub light: Option<PrimitiveRef>,
}

impl SelfToken {
    pub fn from_origin(object: ObjectIdx, prim: PrimIdx) -> SelfToken {
        SelfToken {
            origin: Some(PrimitiveRef { object, prim }),
            light: None,
        }
    }

    pub fn with_light(self, object: ObjectIdx, prim: PrimIdx) -> SelfToken {
        SelfToken {
            light: Some(PrimitiveRef { object, prim }),
            ..self
        }
    }

    #[inline]
    pub fn skips(&self, object: ObjectIdx, prim: PrimIdx) -> bool {
        self.origin == Some(PrimitiveRef { object, prim })
    }

    #[inline]
    pub fn skips_shadow(&self, object: ObjectIdx, prim: PrimIdx) -> bool {
        let candidate = Some(PrimitiveRef { object, prim });
        self.origin == candidate || self.light == candidate
    }

    /// Local queries stay inside one object, so only the primitive is compared.
    #[inline]
    pub fn skips_local(&self, prim: PrimIdx) -> bool {
        self.origin.is_some_and(|origin| origin.prim == prim)
    }
}

/// Ray origin, direction and inverse direction in the currently active coordinate space.
/// The direction is not renormalized after transforming, so distances along the ray
/// stay comparable between world space and object space.
#[derive(Copy, Clone, Debug)]
pub struct LocalRay {
    pub origin: WorldPoint,
    pub direction: WorldVector,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,
}

impl LocalRay {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> LocalRay {
        let inv_direction = direction.map(|x| if x == 0.0 { FloatType::INFINITY } else { 1.0 / x });
        LocalRay {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn transformed(&self, matrix: &WorldMatrix) -> LocalRay {
        LocalRay::new(
            matrix.transform_point(&self.origin),
            matrix.transform_vector(&self.direction),
        )
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }
}

/// Values that can be blended between motion keyframes.
pub trait Interpolate {
    fn interpolate(&self, other: &Self, factor: FloatType) -> Self;
}

impl Interpolate for WorldPoint {
    fn interpolate(&self, other: &Self, factor: FloatType) -> Self {
        self.coords.lerp(&other.coords, factor).into()
    }
}

/// Locates `time` between `step_count` evenly spaced keyframes covering [0, 1].
/// Returns index of the earlier keyframe and the blend factor towards the next one.
pub fn motion_step(time: FloatType, step_count: usize) -> (usize, FloatType) {
    debug_assert!(step_count >= 2);
    let max_step = (step_count - 1) as FloatType;
    let position = (time.clamp(0.0, 1.0) * max_step).min(max_step);
    let index = (position.floor() as usize).min(step_count - 2);
    (index, position - index as FloatType)
}

/// Shape keyframes evenly distributed over the shutter interval.
#[derive(Clone, Debug)]
pub struct MotionKeys<T>(Box<[T]>);

impl<T: Interpolate + Clone> MotionKeys<T> {
    /// Returns None if there are fewer than two keyframes.
    pub fn new(keys: impl Into<Box<[T]>>) -> Option<MotionKeys<T>> {
        let keys = keys.into();
        if keys.len() < 2 {
            None
        } else {
            Some(MotionKeys(keys))
        }
    }

    pub fn at(&self, time: FloatType) -> T {
        let (index, factor) = motion_step(time, self.0.len());
        self.0[index].interpolate(&self.0[index + 1], factor)
    }

    pub fn keys(&self) -> &[T] {
        &self.0
    }

    pub fn map<T2: Interpolate + Clone>(&self, f: impl FnMut(&T) -> T2) -> MotionKeys<T2> {
        MotionKeys(self.0.iter().map(f).collect())
    }
}

/// Sub-interval of the shutter during which a primitive exists.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeRange {
    pub start: FloatType,
    pub end: FloatType,
}

impl TimeRange {
    pub const FULL: TimeRange = TimeRange {
        start: 0.0,
        end: 1.0,
    };

    pub fn contains(&self, time: FloatType) -> bool {
        self.start <= time && time <= self.end
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use assert2::assert;
    use proptest::prelude::*;
    use test_case::test_case;

    /// Helper macro that creates a wrapper arnound a type that implemetns Deref and Arbitary
    macro_rules! arbitrary_wrapper {
        ( $wrapper_name:ident ( $type:ty ) -> $block:block ) => {
            #[derive(Copy, Clone, Debug)]
            pub struct $wrapper_name(pub $type);

            impl std::ops::Deref for $wrapper_name {
                type Target = $type;
                fn deref(&self) -> &$type {
                    &self.0
                }
            }

            impl Arbitrary for $wrapper_name {
                type Parameters = ();
                type Strategy = proptest::strategy::BoxedStrategy<Self>;
                fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
                    $block.prop_map(|x| $wrapper_name(x)).boxed()
                }
            }
        };
    }

    fn simple_float() -> BoxedStrategy<f32> {
        (-1_000_000i32..1_000_000i32)
            .prop_map(|n| n as f32 * 1e-4)
            .boxed()
    }

    arbitrary_wrapper! {
        NonzeroWorldVectorWrapper(WorldVector) -> {
            (simple_float(), simple_float(), simple_float())
                .prop_filter_map(
                    "vector is zero",
                    |coords| {
                        let vector = WorldVector::new(coords.0, coords.1, coords.2);
                        if vector.norm() < 1e-3 {
                            None
                        } else {
                            Some(vector)
                        }
                    })
        }
    }

    arbitrary_wrapper! {
        WorldPointWrapper(WorldPoint) -> {
            (simple_float(), simple_float(), simple_float())
                .prop_map(|coords| {
                    WorldPoint::new(coords.0, coords.1, coords.2)
                })
        }
    }

    #[test]
    fn zero_direction_is_invalid() {
        let ray = Ray::new(WorldPoint::origin(), WorldVector::zeros());
        assert!(!ray.is_valid());
    }

    #[test]
    fn inverted_interval_is_invalid() {
        let ray = Ray::new(WorldPoint::origin(), WorldVector::x()).with_range(2.0, 1.0);
        assert!(!ray.is_valid());
    }

    #[test]
    fn non_finite_origin_is_invalid() {
        let ray = Ray::new(WorldPoint::new(f32::NAN, 0.0, 0.0), WorldVector::x());
        assert!(!ray.is_valid());
    }

    #[test]
    fn default_ray_is_valid() {
        let ray = Ray::new(WorldPoint::new(1.0, 2.0, 3.0), WorldVector::new(0.0, 0.0, -4.0));
        assert!(ray.is_valid());
        assert!((ray.direction.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn inverse_direction_of_zero_is_infinite() {
        let ray = LocalRay::new(WorldPoint::origin(), WorldVector::new(0.0, -0.0, 2.0));
        assert!(ray.inv_direction.x == f32::INFINITY);
        assert!(ray.inv_direction.y == f32::INFINITY);
        assert!(ray.inv_direction.z == 0.5);
    }

    #[test_case(0.0, 3, 0, 0.0 ; "start")]
    #[test_case(0.25, 3, 0, 0.5 ; "first_half")]
    #[test_case(0.5, 3, 1, 0.0 ; "middle_key")]
    #[test_case(1.0, 3, 1, 1.0 ; "end")]
    #[test_case(7.0, 2, 0, 1.0 ; "clamped_above")]
    #[test_case(-1.0, 2, 0, 0.0 ; "clamped_below")]
    fn motion_step_cases(time: f32, steps: usize, index: usize, factor: f32) {
        let (i, f) = motion_step(time, steps);
        assert!(i == index);
        assert!((f - factor).abs() < 1e-6);
    }

    #[test]
    fn motion_keys_need_two_keys() {
        assert!(MotionKeys::new(vec![WorldPoint::origin()]).is_none());
        let keys = MotionKeys::new(vec![WorldPoint::origin(), WorldPoint::new(2.0, 0.0, 0.0)])
            .expect("two keys are enough");
        assert!(keys.at(0.5) == WorldPoint::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn self_token_matching() {
        let object = ObjectIdx::from_raw(1);
        let prim = PrimIdx::from_raw(7);
        let other = PrimIdx::from_raw(8);
        let token = SelfToken::from_origin(object, prim).with_light(object, other);

        assert!(token.skips(object, prim));
        assert!(!token.skips(object, other));
        assert!(token.skips_shadow(object, other));
        assert!(!token.skips_shadow(ObjectIdx::from_raw(2), other));
        assert!(token.skips_local(prim));
        assert!(!SelfToken::default().skips_local(prim));
    }
}
