/// Compile time selection of the primitive and transform kinds a traversal supports.
/// Disabled features cost nothing in the inner loops, their branches are removed when
/// the traversal is monomorphized.
pub trait Features {
    const HAIR: bool;
    const MOTION: bool;
    const POINTCLOUD: bool;
}

macro_rules! feature_markers {
    ( $( $(#[$meta:meta])* $name:ident => ($hair:literal, $motion:literal, $pointcloud:literal); )* ) => {
        $(
            $(#[$meta])*
            #[derive(Copy, Clone, Debug, Default)]
            pub struct $name;

            impl Features for $name {
                const HAIR: bool = $hair;
                const MOTION: bool = $motion;
                const POINTCLOUD: bool = $pointcloud;
            }
        )*
    };
}

feature_markers! {
    /// Static triangles only
    BasicFeatures => (false, false, false);
    HairFeatures => (true, false, false);
    MotionFeatures => (false, true, false);
    PointcloudFeatures => (false, false, true);
    HairMotionFeatures => (true, true, false);
    HairPointcloudFeatures => (true, false, true);
    MotionPointcloudFeatures => (false, true, true);
    AllFeatures => (true, true, true);
}

/// Features actually used by a scene, determined when the scene is built.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub hair: bool,
    pub motion: bool,
    pub pointcloud: bool,
}

impl FeatureSet {
    pub fn of<F: Features>() -> FeatureSet {
        FeatureSet {
            hair: F::HAIR,
            motion: F::MOTION,
            pointcloud: F::POINTCLOUD,
        }
    }
}

impl std::ops::BitOr for FeatureSet {
    type Output = FeatureSet;

    fn bitor(self, rhs: FeatureSet) -> FeatureSet {
        FeatureSet {
            hair: self.hair || rhs.hair,
            motion: self.motion || rhs.motion,
            pointcloud: self.pointcloud || rhs.pointcloud,
        }
    }
}

impl std::ops::BitOrAssign for FeatureSet {
    fn bitor_assign(&mut self, rhs: FeatureSet) {
        *self = *self | rhs;
    }
}

/// Calls `$body` with `$F` bound to the marker type matching the feature set.
macro_rules! with_features {
    ($features:expr, $F:ident => $body:expr) => {{
        use $crate::kernel::features::*;
        let features: FeatureSet = $features;
        match (features.hair, features.motion, features.pointcloud) {
            (false, false, false) => {
                type $F = BasicFeatures;
                $body
            }
            (true, false, false) => {
                type $F = HairFeatures;
                $body
            }
            (false, true, false) => {
                type $F = MotionFeatures;
                $body
            }
            (false, false, true) => {
                type $F = PointcloudFeatures;
                $body
            }
            (true, true, false) => {
                type $F = HairMotionFeatures;
                $body
            }
            (true, false, true) => {
                type $F = HairPointcloudFeatures;
                $body
            }
            (false, true, true) => {
                type $F = MotionPointcloudFeatures;
                $body
            }
            (true, true, true) => {
                type $F = AllFeatures;
                $body
            }
        }
    }};
}

pub(crate) use with_features;
