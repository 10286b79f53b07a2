//! Flattened, immutable scene representation consumed by the traversal kernel.

mod building;
mod statistics;
#[cfg(test)]
pub(crate) mod test_scenes;

use index_vec::IndexVec;

use crate::{
    geometry::{
        CurveSegment, CurveShape, MotionKeys, ObjectTransform, PointPrimitive, TimeRange,
        Triangle, WorldBox, WorldPoint,
    },
    kernel::FeatureSet,
    util::flag_set,
};

pub use building::{
    BuildSettings, Geometry, GeometryHandle, ObjectDesc, Placement, PrimitiveDesc, SceneBuilder,
    SceneError, Shape,
};
pub use statistics::SceneStatistics;

flag_set! {
    /// Ray types an object (or a subtree of the BVH) is visible to.
    pub struct Visibility {
        const CAMERA = 1 << 0;
        const DIFFUSE = 1 << 1;
        const GLOSSY = 1 << 2;
        const TRANSMIT = 1 << 3;
        const VOLUME_SCATTER = 1 << 4;
        /// Shadow ray that only asks whether anything is in the way
        const SHADOW_OPAQUE = 1 << 5;
        /// Shadow ray that passes through transparent surfaces
        const SHADOW_TRANSPARENT = 1 << 6;
        const SHADOW = (1 << 5) | (1 << 6);
        const ALL = (1 << 7) - 1;
    }
}

flag_set! {
    pub struct PrimitiveFlags {
        /// The primitive's material lets shadow rays through
        const TRANSPARENT_SHADOW = 1 << 0;
    }
}

flag_set! {
    pub struct ObjectFlags {
        const HAS_VOLUME = 1 << 0;
        /// Object transform is baked into the world space primitives
        const TRANSFORM_APPLIED = 1 << 1;
    }
}

/// Reference to a BVH child, either an inner node or a leaf.
/// Non-negative values address inner nodes, bit complemented (negative) values address leaves.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PackedNodeLink(i32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeLink {
    Inner(NodeIdx),
    Leaf(LeafIdx),
}

impl PackedNodeLink {
    pub const MAX_INDEX: u32 = i32::MAX as u32;

    pub fn new_inner(index: NodeIdx) -> Self {
        Self(index.raw() as i32)
    }

    pub fn new_leaf(index: LeafIdx) -> Self {
        Self(!(index.raw() as i32))
    }

    #[inline]
    pub fn decode(&self) -> NodeLink {
        if self.0 >= 0 {
            NodeLink::Inner(NodeIdx::from_raw_unchecked(self.0 as u32))
        } else {
            NodeLink::Leaf(LeafIdx::from_raw_unchecked(!self.0 as u32))
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Debug for PackedNodeLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLink")
            .field("0", &self.0)
            .field("<decoded>", &self.decode())
            .finish()
    }
}

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    MAX_INDEX = PackedNodeLink::MAX_INDEX as usize;
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    pub struct LeafIdx = u32;
    MAX_INDEX = PackedNodeLink::MAX_INDEX as usize;
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    /// Position in the leaf primitive slot arrays
    pub struct SlotIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    pub struct PrimIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    pub struct ObjectIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

/// Inner node with two children.
#[derive(Clone, Debug)]
pub struct BvhNode {
    /// Child bounds. Curves contribute only their center line, see `child_curve_padding`.
    pub child_bounds: [WorldBox; 2],
    pub child_links: [PackedNodeLink; 2],
    /// Union of visibility of everything below each child
    pub child_visibility: [Visibility; 2],
    /// Largest curve radius below each child, the hair node test grows the box by this much.
    pub child_curve_padding: [f32; 2],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotRange {
    pub first: SlotIdx,
    pub end: SlotIdx,
}

impl SlotRange {
    pub fn len(&self) -> usize {
        self.end.index() - self.first.index()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotIdx> {
        (self.first.index()..self.end.index()).map(SlotIdx::from_usize)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafRecord {
    /// Contiguous slots that all hold primitives of the same type
    Primitives {
        slots: SlotRange,
        kind: PrimitiveType,
    },
    /// Instance of an object whose geometry has its own BVH
    Instance { object: ObjectIdx },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Triangle,
    MotionTriangle,
    Curve(CurveShape),
    MotionCurve(CurveShape),
    Point,
    MotionPoint,
}

impl PrimitiveType {
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            PrimitiveType::MotionTriangle
                | PrimitiveType::MotionCurve(_)
                | PrimitiveType::MotionPoint
        )
    }

    pub fn is_curve(&self) -> bool {
        matches!(self, PrimitiveType::Curve(_) | PrimitiveType::MotionCurve(_))
    }

    pub fn is_point(&self) -> bool {
        matches!(self, PrimitiveType::Point | PrimitiveType::MotionPoint)
    }
}

/// Entry of a leaf's slot range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PrimSlot {
    pub prim: PrimIdx,
    /// Owning object. For geometry shared by instances this is the first instancing object,
    /// the traversal reports the instance it entered through instead.
    pub object: ObjectIdx,
}

#[derive(Clone, Debug)]
pub struct PrimitiveInfo {
    pub kind: PrimitiveType,
    /// Index into the array matching `kind`
    pub data: usize,
    pub flags: PrimitiveFlags,
    /// Fraction of light passing through a transparent shadowing curve
    pub shadow_transparency: f32,
    /// Part of the shutter interval where curves and points exist
    pub time_range: TimeRange,
}

#[derive(Clone, Debug)]
pub struct ObjectData {
    pub transform: ObjectTransform,
    /// Root of the BVH over this object's own primitives
    pub root: Option<PackedNodeLink>,
    pub flags: ObjectFlags,
    pub visibility: Visibility,
}

/// Read only scene buffers. Built once by `SceneBuilder`, safe to share between threads.
#[derive(Clone, Debug)]
pub struct SceneBuffer {
    pub(crate) root: Option<PackedNodeLink>,
    pub(crate) bounds: WorldBox,
    pub(crate) features: FeatureSet,

    pub(crate) nodes: IndexVec<NodeIdx, BvhNode>,
    pub(crate) leaves: IndexVec<LeafIdx, LeafRecord>,
    pub(crate) slots: IndexVec<SlotIdx, PrimSlot>,
    pub(crate) prims: IndexVec<PrimIdx, PrimitiveInfo>,
    pub(crate) objects: IndexVec<ObjectIdx, ObjectData>,

    pub(crate) triangles: Vec<Triangle<WorldPoint>>,
    pub(crate) motion_triangles: Vec<MotionKeys<Triangle<WorldPoint>>>,
    pub(crate) curves: Vec<CurveSegment>,
    pub(crate) motion_curves: Vec<MotionKeys<CurveSegment>>,
    pub(crate) points: Vec<PointPrimitive>,
    pub(crate) motion_points: Vec<MotionKeys<PointPrimitive>>,
}

impl SceneBuffer {
    /// Root of the top level BVH, None for an empty scene
    pub fn root(&self) -> Option<PackedNodeLink> {
        self.root
    }

    pub fn bounds(&self) -> &WorldBox {
        &self.bounds
    }

    /// Kernel features needed to trace this scene
    pub fn features(&self) -> FeatureSet {
        self.features
    }

    #[inline]
    pub fn node(&self, index: NodeIdx) -> &BvhNode {
        &self.nodes[index]
    }

    #[inline]
    pub fn leaf(&self, index: LeafIdx) -> &LeafRecord {
        &self.leaves[index]
    }

    #[inline]
    pub fn slot(&self, index: SlotIdx) -> PrimSlot {
        self.slots[index]
    }

    #[inline]
    pub fn prim(&self, index: PrimIdx) -> &PrimitiveInfo {
        &self.prims[index]
    }

    #[inline]
    pub fn object(&self, index: ObjectIdx) -> &ObjectData {
        &self.objects[index]
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn prim_count(&self) -> usize {
        self.prims.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }
}
