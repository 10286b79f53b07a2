use nalgebra::UnitQuaternion;

use super::{EPSILON, FloatType, Interpolate, MotionKeys, WorldMatrix, WorldVector};

/// Affine transform split into parts that interpolate well between motion keyframes.
/// Applied as scale first, then rotation, then translation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecomposedTransform {
    pub translation: WorldVector,
    pub rotation: UnitQuaternion<FloatType>,
    pub scale: WorldVector,
}

impl DecomposedTransform {
    pub fn new(
        translation: WorldVector,
        rotation: UnitQuaternion<FloatType>,
        scale: WorldVector,
    ) -> DecomposedTransform {
        DecomposedTransform {
            translation,
            rotation,
            scale,
        }
    }

    pub fn identity() -> DecomposedTransform {
        DecomposedTransform::new(
            WorldVector::zeros(),
            UnitQuaternion::identity(),
            WorldVector::repeat(1.0),
        )
    }

    pub fn from_translation(translation: WorldVector) -> DecomposedTransform {
        DecomposedTransform {
            translation,
            ..DecomposedTransform::identity()
        }
    }

    /// True if no scale component is zero or non-finite.
    pub fn is_invertible(&self) -> bool {
        self.scale.iter().all(|s| s.is_finite() && *s != 0.0)
            && self.translation.iter().all(|x| x.is_finite())
    }

    pub fn to_matrix(&self) -> WorldMatrix {
        WorldMatrix::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * WorldMatrix::new_nonuniform_scaling(&self.scale)
    }

    pub fn inverse_matrix(&self) -> WorldMatrix {
        WorldMatrix::new_nonuniform_scaling(&self.scale.map(|s| 1.0 / s))
            * self.rotation.inverse().to_homogeneous()
            * WorldMatrix::new_translation(&-self.translation)
    }
}

impl Interpolate for DecomposedTransform {
    fn interpolate(&self, other: &Self, factor: FloatType) -> Self {
        let rotation = self
            .rotation
            .try_slerp(&other.rotation, factor, EPSILON)
            .unwrap_or_else(|| self.rotation.nlerp(&other.rotation, factor));
        DecomposedTransform {
            translation: self.translation.lerp(&other.translation, factor),
            rotation,
            scale: self.scale.lerp(&other.scale, factor),
        }
    }
}

/// Object to world transform of a scene object.
#[derive(Clone, Debug)]
pub enum ObjectTransform {
    Static {
        transform: WorldMatrix,
        inverse: WorldMatrix,
    },
    Motion(MotionKeys<DecomposedTransform>),
}

impl ObjectTransform {
    pub fn identity() -> ObjectTransform {
        ObjectTransform::Static {
            transform: WorldMatrix::identity(),
            inverse: WorldMatrix::identity(),
        }
    }

    /// Returns None if the matrix is not invertible.
    pub fn new_static(transform: WorldMatrix) -> Option<ObjectTransform> {
        let inverse = transform.try_inverse()?;
        Some(ObjectTransform::Static { transform, inverse })
    }

    /// Returns None if there are fewer than two keyframes or some keyframe is not invertible.
    pub fn motion(keys: Vec<DecomposedTransform>) -> Option<ObjectTransform> {
        if !keys.iter().all(DecomposedTransform::is_invertible) {
            return None;
        }
        MotionKeys::new(keys).map(ObjectTransform::Motion)
    }

    pub fn is_motion(&self) -> bool {
        matches!(self, ObjectTransform::Motion(_))
    }

    /// Transform matrix, if it does not change over time
    pub fn static_matrix(&self) -> Option<&WorldMatrix> {
        match self {
            ObjectTransform::Static { transform, .. } => Some(transform),
            ObjectTransform::Motion(_) => None,
        }
    }

    pub fn at(&self, time: FloatType) -> WorldMatrix {
        match self {
            ObjectTransform::Static { transform, .. } => *transform,
            ObjectTransform::Motion(keys) => keys.at(time).to_matrix(),
        }
    }

    /// World to object matrix at the given time
    #[inline]
    pub fn inverse_at(&self, time: FloatType) -> WorldMatrix {
        match self {
            ObjectTransform::Static { inverse, .. } => *inverse,
            ObjectTransform::Motion(keys) => keys.at(time).inverse_matrix(),
        }
    }
}

impl Default for ObjectTransform {
    fn default() -> Self {
        ObjectTransform::identity()
    }
}
