use assert2::debug_assert;

use super::Features;
use crate::{
    geometry::{FloatType, LocalRay, Ray},
    scene::{ObjectData, ObjectIdx},
};

/// Coordinate space the traversal currently runs in.
/// Entering an instance produces a new frame, the previous one is kept on the traversal
/// stack and restored when the instance's subtree is done.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RayFrame {
    pub ray: LocalRay,
    /// Instance being traversed, None in world space or in a flattened object
    pub object: Option<ObjectIdx>,
}

impl RayFrame {
    pub fn world(ray: &Ray) -> RayFrame {
        RayFrame {
            ray: ray.local(),
            object: None,
        }
    }

    /// Frame of the given object's space at the ray's time.
    #[inline]
    pub fn enter<F: Features>(
        &self,
        object: &ObjectData,
        index: ObjectIdx,
        time: FloatType,
    ) -> RayFrame {
        debug_assert!(self.object.is_none(), "nested instances are not supported");
        debug_assert!(F::MOTION || !object.transform.is_motion());

        RayFrame {
            ray: self.ray.transformed(&object.transform.inverse_at(time)),
            object: Some(index),
        }
    }
}
