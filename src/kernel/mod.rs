//! BVH traversal kernel.
//!
//! All queries share one stack based traversal driver, specialized at compile time for the
//! scene's feature set and for the query policy that decides what happens on a primitive hit.

mod closest;
pub(crate) mod features;
mod frame;
mod local;
mod node_intersection;
mod primitive;
mod shadow_all;
mod stack;
mod traversal;
mod volume;

pub use features::{
    AllFeatures, BasicFeatures, FeatureSet, Features, HairFeatures, HairMotionFeatures,
    HairPointcloudFeatures, MotionFeatures, MotionPointcloudFeatures, PointcloudFeatures,
};
pub use local::LocalIntersection;
pub use shadow_all::ShadowAllResult;

use crate::{
    geometry::FloatType,
    scene::{ObjectIdx, PrimIdx, PrimitiveType},
};

/// Capacity of the traversal stack. Bounds BVH depth plus pending siblings.
pub const TRAVERSAL_STACK_SIZE: usize = 192;

/// Most intersections a transparent shadow query stores.
pub const SHADOW_RECORD_SIZE: usize = 8;

/// Most intersections a local query stores.
pub const LOCAL_MAX_HITS: usize = 4;

/// Transparent shadow throughput below which the ray counts as fully occluded.
pub const SHADOW_TRANSPARENCY_CUTOFF: FloatType = 1e-3;

/// A ray hit, with enough information to reconstruct the surface point later.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection {
    /// Distance along the ray, in units of the world space ray direction
    pub t: FloatType,
    /// Barycentric coordinates for triangles, along/across coordinates for curves
    pub u: FloatType,
    pub v: FloatType,
    pub prim: PrimIdx,
    /// Object the primitive was found through. For instances, the instance's object.
    pub object: ObjectIdx,
    pub kind: PrimitiveType,
}
