use bon::bon;
use index_vec::IndexVec;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;
use thiserror::Error;

use super::{
    BvhNode, LeafRecord, NodeIdx, ObjectData, ObjectFlags, ObjectIdx, PackedNodeLink, PrimSlot,
    PrimitiveFlags, PrimitiveInfo, PrimitiveType, SceneBuffer, SlotRange, Visibility,
};
use crate::{
    geometry::{
        CurveSegment, CurveShape, FloatType, MotionKeys, ObjectTransform, PointPrimitive,
        TimeRange, Triangle, WorldBox, WorldMatrix, WorldPoint,
    },
    kernel::FeatureSet,
};

index_vec::define_index_type! {
    /// Geometry registered with a `SceneBuilder`
    pub struct GeometryHandle = u32;
    IMPL_RAW_CONVERSIONS = true;
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("Unknown geometry handle {0:?}")]
    UnknownGeometry(GeometryHandle),

    #[error("Geometry has no primitives")]
    EmptyGeometry,

    #[error("Primitive {prim} has {found} motion keys, other motion primitives of the geometry have {expected}")]
    MismatchedMotionKeys {
        prim: usize,
        expected: usize,
        found: usize,
    },

    #[error("Motion primitive {prim} needs at least two keys")]
    TooFewMotionKeys { prim: usize },

    #[error("Object with motion transform can not be flattened")]
    MotionObjectFlattened,

    #[error("Primitive {prim} has non-finite vertex data or negative radius")]
    InvalidVertexData { prim: usize },

    #[error("Primitive {prim} has time range outside of [0, 1]")]
    InvalidTimeRange { prim: usize },
}

/// Shape of a single primitive, in object space.
#[derive(Clone, Debug)]
pub enum Shape {
    Triangle(Triangle<WorldPoint>),
    /// Vertex positions at evenly spaced times over the shutter interval
    MotionTriangle(Vec<Triangle<WorldPoint>>),
    Curve(CurveSegment, CurveShape),
    MotionCurve(Vec<CurveSegment>, CurveShape),
    Point(PointPrimitive),
    MotionPoint(Vec<PointPrimitive>),
}

impl Shape {
    pub fn kind(&self) -> PrimitiveType {
        match self {
            Shape::Triangle(_) => PrimitiveType::Triangle,
            Shape::MotionTriangle(_) => PrimitiveType::MotionTriangle,
            Shape::Curve(_, shape) => PrimitiveType::Curve(*shape),
            Shape::MotionCurve(_, shape) => PrimitiveType::MotionCurve(*shape),
            Shape::Point(_) => PrimitiveType::Point,
            Shape::MotionPoint(_) => PrimitiveType::MotionPoint,
        }
    }

    fn motion_key_count(&self) -> Option<usize> {
        match self {
            Shape::MotionTriangle(keys) => Some(keys.len()),
            Shape::MotionCurve(keys, _) => Some(keys.len()),
            Shape::MotionPoint(keys) => Some(keys.len()),
            _ => None,
        }
    }

    fn is_valid(&self) -> bool {
        fn finite<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> bool {
            points.into_iter().all(|p| p.iter().all(|x| x.is_finite()))
        }
        fn valid_radius(r: FloatType) -> bool {
            r.is_finite() && r >= 0.0
        }
        let curve = |c: &CurveSegment| finite(&c.keys) && c.radius.iter().all(|r| valid_radius(*r));
        let point = |p: &PointPrimitive| finite([&p.center]) && valid_radius(p.radius);

        match self {
            Shape::Triangle(t) => finite(t.iter()),
            Shape::MotionTriangle(keys) => keys.iter().all(|t| finite(t.iter())),
            Shape::Curve(c, _) => curve(c),
            Shape::MotionCurve(keys, _) => keys.iter().all(curve),
            Shape::Point(p) => point(p),
            Shape::MotionPoint(keys) => keys.iter().all(point),
        }
    }

    /// Bounds used in BVH nodes and the padding the hair node test adds to them.
    /// Curves are bounded by their center line and padded by their radius.
    fn bounds(&self) -> (WorldBox, FloatType) {
        match self {
            Shape::Triangle(t) => (t.bounds(), 0.0),
            Shape::MotionTriangle(keys) => (union_all(keys.iter().map(|t| t.bounds())), 0.0),
            Shape::Curve(c, _) => (c.center_line_bounds(), c.max_radius()),
            Shape::MotionCurve(keys, _) => (
                union_all(keys.iter().map(|c| c.center_line_bounds())),
                keys.iter()
                    .map(|c| c.max_radius())
                    .fold(0.0, FloatType::max),
            ),
            Shape::Point(p) => (p.bounds(), 0.0),
            Shape::MotionPoint(keys) => (union_all(keys.iter().map(|p| p.bounds())), 0.0),
        }
    }

    fn transformed(&self, matrix: &WorldMatrix) -> Shape {
        match self {
            Shape::Triangle(t) => Shape::Triangle(t.transformed(matrix)),
            Shape::MotionTriangle(keys) => {
                Shape::MotionTriangle(keys.iter().map(|t| t.transformed(matrix)).collect())
            }
            Shape::Curve(c, shape) => Shape::Curve(c.transformed(matrix), *shape),
            Shape::MotionCurve(keys, shape) => Shape::MotionCurve(
                keys.iter().map(|c| c.transformed(matrix)).collect(),
                *shape,
            ),
            Shape::Point(p) => Shape::Point(p.transformed(matrix)),
            Shape::MotionPoint(keys) => {
                Shape::MotionPoint(keys.iter().map(|p| p.transformed(matrix)).collect())
            }
        }
    }
}

fn union_all(boxes: impl Iterator<Item = WorldBox>) -> WorldBox {
    boxes.fold(WorldBox::empty(), |a, b| a.union(&b))
}

/// A primitive and its shading related flags.
#[derive(Clone, Debug)]
pub struct PrimitiveDesc {
    pub shape: Shape,
    pub flags: PrimitiveFlags,
    /// Used by transparent shadow rays passing through curves
    pub shadow_transparency: FloatType,
    pub time_range: TimeRange,
}

impl PrimitiveDesc {
    pub fn new(shape: Shape) -> PrimitiveDesc {
        PrimitiveDesc {
            shape,
            flags: PrimitiveFlags::EMPTY,
            shadow_transparency: 0.0,
            time_range: TimeRange::FULL,
        }
    }

    pub fn triangle(triangle: Triangle<WorldPoint>) -> PrimitiveDesc {
        Self::new(Shape::Triangle(triangle))
    }

    pub fn motion_triangle(keys: Vec<Triangle<WorldPoint>>) -> PrimitiveDesc {
        Self::new(Shape::MotionTriangle(keys))
    }

    pub fn curve(segment: CurveSegment, shape: CurveShape) -> PrimitiveDesc {
        Self::new(Shape::Curve(segment, shape))
    }

    pub fn motion_curve(keys: Vec<CurveSegment>, shape: CurveShape) -> PrimitiveDesc {
        Self::new(Shape::MotionCurve(keys, shape))
    }

    pub fn point(point: PointPrimitive) -> PrimitiveDesc {
        Self::new(Shape::Point(point))
    }

    pub fn motion_point(keys: Vec<PointPrimitive>) -> PrimitiveDesc {
        Self::new(Shape::MotionPoint(keys))
    }

    pub fn with_flags(self, flags: PrimitiveFlags) -> PrimitiveDesc {
        PrimitiveDesc { flags, ..self }
    }

    /// Clamped to [0, 1]
    pub fn with_shadow_transparency(self, shadow_transparency: FloatType) -> PrimitiveDesc {
        PrimitiveDesc {
            shadow_transparency: shadow_transparency.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn with_time_range(self, time_range: TimeRange) -> PrimitiveDesc {
        PrimitiveDesc { time_range, ..self }
    }
}

/// Primitives shared by all objects that place this geometry.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub prims: Vec<PrimitiveDesc>,
}

impl Geometry {
    pub fn new(prims: Vec<PrimitiveDesc>) -> Geometry {
        Geometry { prims }
    }

    pub fn from_triangles(triangles: impl IntoIterator<Item = Triangle<WorldPoint>>) -> Geometry {
        Geometry::new(triangles.into_iter().map(PrimitiveDesc::triangle).collect())
    }

    fn validate(&self) -> Result<(), SceneError> {
        if self.prims.is_empty() {
            return Err(SceneError::EmptyGeometry);
        }

        let mut motion_keys = None;
        for (prim, desc) in self.prims.iter().enumerate() {
            if !desc.shape.is_valid() {
                return Err(SceneError::InvalidVertexData { prim });
            }

            let range = desc.time_range;
            if !(0.0 <= range.start && range.start <= range.end && range.end <= 1.0) {
                return Err(SceneError::InvalidTimeRange { prim });
            }

            if let Some(found) = desc.shape.motion_key_count() {
                if found < 2 {
                    return Err(SceneError::TooFewMotionKeys { prim });
                }
                match motion_keys {
                    None => motion_keys = Some(found),
                    Some(expected) if expected != found => {
                        return Err(SceneError::MismatchedMotionKeys {
                            prim,
                            expected,
                            found,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    fn features(&self) -> FeatureSet {
        self.prims
            .iter()
            .map(|desc| {
                let kind = desc.shape.kind();
                FeatureSet {
                    hair: kind.is_curve(),
                    motion: kind.is_motion() || desc.time_range != TimeRange::FULL,
                    pointcloud: kind.is_point(),
                }
            })
            .fold(FeatureSet::default(), |a, b| a | b)
    }
}

/// How an object's geometry ends up in the scene.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    /// Primitives are transformed to world space and become part of the top level BVH
    #[default]
    Flattened,
    /// Geometry BVH is shared, the ray is transformed into object space during traversal
    Instanced,
}

#[derive(Clone, Debug)]
pub struct ObjectDesc {
    pub geometry: GeometryHandle,
    pub transform: ObjectTransform,
    pub placement: Placement,
    pub visibility: Visibility,
    pub has_volume: bool,
}

#[bon]
impl ObjectDesc {
    #[builder]
    pub fn new(
        geometry: GeometryHandle,
        #[builder(default)] transform: ObjectTransform,
        #[builder(default)] placement: Placement,
        #[builder(default = Visibility::ALL)] visibility: Visibility,
        #[builder(default)] has_volume: bool,
    ) -> Self {
        ObjectDesc {
            geometry,
            transform,
            placement,
            visibility,
            has_volume,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BuildSettings {
    /// Most primitives in one leaf
    pub max_leaf_size: usize,
    /// Number of times a motion transform is sampled to bound an instance
    pub motion_samples: usize,
}

#[bon]
impl BuildSettings {
    #[builder]
    pub fn new(
        #[builder(default = 4)] max_leaf_size: usize,
        #[builder(default = 16)] motion_samples: usize,
    ) -> Self {
        BuildSettings {
            max_leaf_size: max_leaf_size.max(1),
            motion_samples: motion_samples.max(2),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings::builder().build()
    }
}

/// Collects geometry and objects, then packs them into a `SceneBuffer`.
///
/// Uses a simple median split, the resulting trees are correct but not optimized for
/// traversal speed.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    settings: BuildSettings,
    geometries: IndexVec<GeometryHandle, Geometry>,
    objects: IndexVec<ObjectIdx, ObjectDesc>,
}

impl SceneBuilder {
    pub fn new() -> SceneBuilder {
        Self::default()
    }

    pub fn with_settings(settings: BuildSettings) -> SceneBuilder {
        SceneBuilder {
            settings,
            ..Self::default()
        }
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> Result<GeometryHandle, SceneError> {
        geometry.validate()?;
        Ok(self.geometries.push(geometry))
    }

    /// Places a geometry in the scene. Objects are numbered in the order they are added.
    pub fn add_object(&mut self, desc: ObjectDesc) -> Result<ObjectIdx, SceneError> {
        if desc.geometry.index() >= self.geometries.len() {
            return Err(SceneError::UnknownGeometry(desc.geometry));
        }
        if desc.placement == Placement::Flattened && desc.transform.is_motion() {
            return Err(SceneError::MotionObjectFlattened);
        }
        Ok(self.objects.push(desc))
    }

    #[tracing::instrument(skip(self), fields(geometries = self.geometries.len(), objects = self.objects.len()))]
    pub fn build(self) -> Result<SceneBuffer, SceneError> {
        let mut packer = Packer::new(&self.settings);
        let mut top_level = Vec::new();
        let mut instanced: IndexVec<GeometryHandle, Option<PackedGeometry>> =
            index_vec::index_vec![None; self.geometries.len()];
        let mut features = FeatureSet::default();

        for (object_index, desc) in self.objects.iter_enumerated() {
            let geometry = &self.geometries[desc.geometry];
            features |= geometry.features();

            let mut flags = ObjectFlags::EMPTY;
            if desc.has_volume {
                flags |= ObjectFlags::HAS_VOLUME;
            }

            let object = match desc.placement {
                Placement::Flattened => {
                    let matrix = desc
                        .transform
                        .static_matrix()
                        .ok_or(SceneError::MotionObjectFlattened)?;
                    let mut items = geometry
                        .prims
                        .iter()
                        .map(|prim| {
                            let shape = if *matrix == WorldMatrix::identity() {
                                prim.shape.clone()
                            } else {
                                prim.shape.transformed(matrix)
                            };
                            packer.add_prim(PrimitiveDesc { shape, ..prim.clone() }, object_index)
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    top_level.extend(items.iter().map(|item| BuildItem {
                        visibility: desc.visibility,
                        ..item.clone()
                    }));

                    ObjectData {
                        transform: ObjectTransform::identity(),
                        root: packer.build_bvh(&mut items),
                        flags: flags | ObjectFlags::TRANSFORM_APPLIED,
                        visibility: desc.visibility,
                    }
                }
                Placement::Instanced => {
                    features.motion |= desc.transform.is_motion();

                    let packed = match instanced[desc.geometry].clone() {
                        Some(packed) => packed,
                        None => {
                            let packed = packer.add_geometry(geometry, object_index)?;
                            instanced[desc.geometry] = Some(packed.clone());
                            packed
                        }
                    };

                    let bounds = instance_bounds(
                        &desc.transform,
                        &packed.bounds,
                        self.settings.motion_samples,
                    );
                    top_level.push(BuildItem {
                        centroid: bounds.center(),
                        bounds,
                        padding: 0.0,
                        visibility: desc.visibility,
                        content: ItemContent::Instance(object_index),
                    });

                    ObjectData {
                        transform: desc.transform.clone(),
                        root: Some(packed.root),
                        flags,
                        visibility: desc.visibility,
                    }
                }
            };

            packer.objects.push(object);
        }

        let bounds = top_level
            .iter()
            .fold(WorldBox::empty(), |b, item| b.union(&item.full_bounds()));
        let root = packer.build_bvh(&mut top_level);

        let scene = packer.finish(root, bounds, features);
        let statistics = scene.statistics();
        tracing::debug!(
            nodes = scene.node_count(),
            leaves = scene.leaf_count(),
            prims = scene.prim_count(),
            ?features,
            "built scene"
        );
        tracing::debug!(%statistics, "tree shape");

        Ok(scene)
    }
}

/// Bounds of an instance in world space. Motion transforms are sampled over the shutter
/// interval, the result is padded to cover the motion between samples.
fn instance_bounds(transform: &ObjectTransform, bounds: &WorldBox, samples: usize) -> WorldBox {
    if let Some(matrix) = transform.static_matrix() {
        return bounds.transformed(matrix);
    }

    let last = (samples - 1) as FloatType;
    let sampled = union_all(
        (0..samples).map(|i| bounds.transformed(&transform.at(i as FloatType / last))),
    );
    sampled.padded(sampled.size().norm() * 0.01)
}

#[derive(Clone, Debug)]
struct PackedGeometry {
    root: PackedNodeLink,
    bounds: WorldBox,
}

#[derive(Clone, Debug)]
enum ItemContent {
    Prim { slot: PrimSlot, kind: PrimitiveType },
    Instance(ObjectIdx),
}

/// Something to be placed in a BVH leaf.
#[derive(Clone, Debug)]
struct BuildItem {
    bounds: WorldBox,
    padding: FloatType,
    centroid: WorldPoint,
    visibility: Visibility,
    content: ItemContent,
}

impl BuildItem {
    fn full_bounds(&self) -> WorldBox {
        self.bounds.padded(self.padding)
    }

    fn prim_kind(&self) -> Option<PrimitiveType> {
        match self.content {
            ItemContent::Prim { kind, .. } => Some(kind),
            ItemContent::Instance(_) => None,
        }
    }
}

/// Summary of a subtree as stored in its parent node.
struct ChildSummary {
    bounds: WorldBox,
    padding: FloatType,
    visibility: Visibility,
}

impl ChildSummary {
    fn of(items: &[BuildItem]) -> ChildSummary {
        ChildSummary {
            bounds: items
                .iter()
                .fold(WorldBox::empty(), |b, item| b.union(&item.bounds)),
            padding: items
                .iter()
                .map(|item| item.padding)
                .fold(0.0, FloatType::max),
            visibility: items
                .iter()
                .fold(Visibility::EMPTY, |v, item| v | item.visibility),
        }
    }
}

/// Scene buffers being filled.
struct Packer<'a> {
    settings: &'a BuildSettings,

    nodes: IndexVec<NodeIdx, BvhNode>,
    leaves: IndexVec<super::LeafIdx, LeafRecord>,
    slots: IndexVec<super::SlotIdx, PrimSlot>,
    prims: IndexVec<super::PrimIdx, PrimitiveInfo>,
    objects: IndexVec<ObjectIdx, ObjectData>,

    triangles: Vec<Triangle<WorldPoint>>,
    motion_triangles: Vec<MotionKeys<Triangle<WorldPoint>>>,
    curves: Vec<CurveSegment>,
    motion_curves: Vec<MotionKeys<CurveSegment>>,
    points: Vec<PointPrimitive>,
    motion_points: Vec<MotionKeys<PointPrimitive>>,
}

fn push_index<T>(vec: &mut Vec<T>, value: T) -> usize {
    vec.push(value);
    vec.len() - 1
}

impl<'a> Packer<'a> {
    fn new(settings: &'a BuildSettings) -> Self {
        Packer {
            settings,
            nodes: IndexVec::new(),
            leaves: IndexVec::new(),
            slots: IndexVec::new(),
            prims: IndexVec::new(),
            objects: IndexVec::new(),
            triangles: Vec::new(),
            motion_triangles: Vec::new(),
            curves: Vec::new(),
            motion_curves: Vec::new(),
            points: Vec::new(),
            motion_points: Vec::new(),
        }
    }

    fn finish(self, root: Option<PackedNodeLink>, bounds: WorldBox, features: FeatureSet) -> SceneBuffer {
        SceneBuffer {
            root,
            bounds,
            features,
            nodes: self.nodes,
            leaves: self.leaves,
            slots: self.slots,
            prims: self.prims,
            objects: self.objects,
            triangles: self.triangles,
            motion_triangles: self.motion_triangles,
            curves: self.curves,
            motion_curves: self.motion_curves,
            points: self.points,
            motion_points: self.motion_points,
        }
    }

    /// Packs the primitives of an instanced geometry under its own BVH root.
    fn add_geometry(
        &mut self,
        geometry: &Geometry,
        owner: ObjectIdx,
    ) -> Result<PackedGeometry, SceneError> {
        let mut items = geometry
            .prims
            .iter()
            .map(|prim| self.add_prim(prim.clone(), owner))
            .collect::<Result<Vec<_>, _>>()?;
        let bounds = items
            .iter()
            .fold(WorldBox::empty(), |b, item| b.union(&item.full_bounds()));
        let root = self.build_bvh(&mut items).ok_or(SceneError::EmptyGeometry)?;
        Ok(PackedGeometry { root, bounds })
    }

    fn add_prim(&mut self, desc: PrimitiveDesc, object: ObjectIdx) -> Result<BuildItem, SceneError> {
        let prim_number = self.prims.len();
        let too_few_keys = || SceneError::TooFewMotionKeys { prim: prim_number };

        let kind = desc.shape.kind();
        let (bounds, padding) = desc.shape.bounds();
        let data = match desc.shape {
            Shape::Triangle(t) => push_index(&mut self.triangles, t),
            Shape::MotionTriangle(keys) => push_index(
                &mut self.motion_triangles,
                MotionKeys::new(keys).ok_or_else(too_few_keys)?,
            ),
            Shape::Curve(c, _) => push_index(&mut self.curves, c),
            Shape::MotionCurve(keys, _) => push_index(
                &mut self.motion_curves,
                MotionKeys::new(keys).ok_or_else(too_few_keys)?,
            ),
            Shape::Point(p) => push_index(&mut self.points, p),
            Shape::MotionPoint(keys) => push_index(
                &mut self.motion_points,
                MotionKeys::new(keys).ok_or_else(too_few_keys)?,
            ),
        };

        let prim = self.prims.push(PrimitiveInfo {
            kind,
            data,
            flags: desc.flags,
            shadow_transparency: desc.shadow_transparency,
            time_range: desc.time_range,
        });

        Ok(BuildItem {
            centroid: bounds.padded(padding).center(),
            bounds,
            padding,
            // Per object BVHs are only entered by queries that already checked visibility
            visibility: Visibility::ALL,
            content: ItemContent::Prim {
                slot: PrimSlot { prim, object },
                kind,
            },
        })
    }

    fn build_bvh(&mut self, items: &mut [BuildItem]) -> Option<PackedNodeLink> {
        if items.is_empty() {
            None
        } else {
            Some(self.build_recursive(items))
        }
    }

    fn build_recursive(&mut self, items: &mut [BuildItem]) -> PackedNodeLink {
        match self.try_build_leaf(items) {
            Some(leaf) => leaf,
            None => self.build_inner_node(items),
        }
    }

    fn try_build_leaf(&mut self, items: &[BuildItem]) -> Option<PackedNodeLink> {
        if let [item] = items {
            if let ItemContent::Instance(object) = item.content {
                let leaf = self.leaves.push(LeafRecord::Instance { object });
                return Some(PackedNodeLink::new_leaf(leaf));
            }
        }

        if items.len() > self.settings.max_leaf_size {
            return None;
        }
        let kind = items
            .iter()
            .map(BuildItem::prim_kind)
            .all_equal_value()
            .ok()??;

        let first = self.slots.next_idx();
        for item in items {
            if let ItemContent::Prim { slot, .. } = item.content {
                self.slots.push(slot);
            }
        }
        let slots = SlotRange {
            first,
            end: self.slots.next_idx(),
        };

        let leaf = self.leaves.push(LeafRecord::Primitives { slots, kind });
        Some(PackedNodeLink::new_leaf(leaf))
    }

    fn build_inner_node(&mut self, items: &mut [BuildItem]) -> PackedNodeLink {
        debug_assert!(items.len() >= 2);

        let axis = items
            .iter()
            .fold(WorldBox::empty(), |b, item| b.including(&item.centroid))
            .largest_axis();
        let mid = items.len() / 2;
        items.select_nth_unstable_by_key(mid, |item| OrderedFloat(item.centroid[axis]));
        let (left, right) = items.split_at_mut(mid);

        // Create placeholder node that will be overwritten later
        let node_index = self.nodes.push(placeholder_node());

        let summaries = [ChildSummary::of(left), ChildSummary::of(right)];
        let child_links = [self.build_recursive(left), self.build_recursive(right)];

        let [a, b] = summaries;
        self.nodes[node_index] = BvhNode {
            child_bounds: [a.bounds, b.bounds],
            child_links,
            child_visibility: [a.visibility, b.visibility],
            child_curve_padding: [a.padding, b.padding],
        };

        PackedNodeLink::new_inner(node_index)
    }
}

fn placeholder_node() -> BvhNode {
    let link = PackedNodeLink::new_inner(NodeIdx::from_raw(0));
    BvhNode {
        child_bounds: [WorldBox::empty(), WorldBox::empty()],
        child_links: [link, link],
        child_visibility: [Visibility::EMPTY; 2],
        child_curve_padding: [0.0; 2],
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geometry::{DecomposedTransform, WorldVector},
        scene::{NodeLink, test_scenes::quad},
    };
    use assert2::{assert, let_assert};

    fn triangle_at(x: f32) -> Triangle<WorldPoint> {
        Triangle::new(
            WorldPoint::new(x, 0.0, 0.0),
            WorldPoint::new(x + 1.0, 0.0, 0.0),
            WorldPoint::new(x, 1.0, 0.0),
        )
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let mut builder = SceneBuilder::new();
        let_assert!(Err(SceneError::EmptyGeometry) = builder.add_geometry(Geometry::default()));
    }

    #[test]
    fn unknown_geometry_is_rejected() {
        let mut builder = SceneBuilder::new();
        let handle = GeometryHandle::from_raw(3);
        let_assert!(
            Err(SceneError::UnknownGeometry(h)) =
                builder.add_object(ObjectDesc::builder().geometry(handle).build())
        );
        assert!(h == handle);
    }

    #[test]
    fn non_finite_vertices_are_rejected() {
        let mut builder = SceneBuilder::new();
        let mut bad = triangle_at(0.0);
        bad[1].y = f32::NAN;
        let geometry = Geometry::from_triangles([triangle_at(2.0), bad]);
        let_assert!(
            Err(SceneError::InvalidVertexData { prim: 1 }) = builder.add_geometry(geometry)
        );
    }

    #[test]
    fn negative_radius_is_rejected() {
        let mut builder = SceneBuilder::new();
        let geometry = Geometry::new(vec![PrimitiveDesc::point(PointPrimitive::new(
            WorldPoint::origin(),
            -1.0,
        ))]);
        let_assert!(
            Err(SceneError::InvalidVertexData { prim: 0 }) = builder.add_geometry(geometry)
        );
    }

    #[test]
    fn motion_key_counts_must_match() {
        let mut builder = SceneBuilder::new();
        let geometry = Geometry::new(vec![
            PrimitiveDesc::motion_triangle(vec![triangle_at(0.0), triangle_at(1.0)]),
            PrimitiveDesc::motion_triangle(vec![triangle_at(0.0), triangle_at(1.0), triangle_at(2.0)]),
        ]);
        let_assert!(
            Err(SceneError::MismatchedMotionKeys {
                prim: 1,
                expected: 2,
                found: 3
            }) = builder.add_geometry(geometry)
        );

        let geometry = Geometry::new(vec![PrimitiveDesc::motion_triangle(vec![triangle_at(0.0)])]);
        let_assert!(Err(SceneError::TooFewMotionKeys { prim: 0 }) = builder.add_geometry(geometry));
    }

    #[test]
    fn time_range_must_be_in_shutter() {
        let mut builder = SceneBuilder::new();
        let geometry = Geometry::new(vec![
            PrimitiveDesc::triangle(triangle_at(0.0)).with_time_range(TimeRange {
                start: 0.5,
                end: 0.25,
            }),
        ]);
        let_assert!(Err(SceneError::InvalidTimeRange { prim: 0 }) = builder.add_geometry(geometry));
    }

    #[test]
    fn motion_object_can_not_be_flattened() {
        let mut builder = SceneBuilder::new();
        let_assert!(Ok(geometry) = builder.add_geometry(Geometry::new(quad(0.0))));
        let_assert!(
            Some(transform) = ObjectTransform::motion(vec![
                DecomposedTransform::identity(),
                DecomposedTransform::from_translation(WorldVector::x()),
            ])
        );
        let_assert!(
            Err(SceneError::MotionObjectFlattened) = builder.add_object(
                ObjectDesc::builder()
                    .geometry(geometry)
                    .transform(transform)
                    .placement(Placement::Flattened)
                    .build()
            )
        );
    }

    #[test]
    fn leaves_hold_single_primitive_type() {
        let mut prims: Vec<_> = (0..6).map(|i| PrimitiveDesc::triangle(triangle_at(i as f32))).collect();
        prims.push(PrimitiveDesc::point(PointPrimitive::new(WorldPoint::new(2.5, 0.5, 0.0), 0.1)));

        let mut builder = SceneBuilder::new();
        let_assert!(Ok(geometry) = builder.add_geometry(Geometry::new(prims)));
        let_assert!(Ok(_) = builder.add_object(ObjectDesc::builder().geometry(geometry).build()));
        let_assert!(Ok(scene) = builder.build());

        for leaf in &scene.leaves {
            let_assert!(LeafRecord::Primitives { slots, kind } = leaf);
            assert!(!slots.is_empty());
            assert!(slots.len() <= 4);
            for slot in slots.iter() {
                assert!(scene.prim(scene.slot(slot).prim).kind == *kind);
            }
        }
    }

    #[test]
    fn flattened_object_bakes_transform() {
        let_assert!(
            Some(transform) = ObjectTransform::new_static(WorldMatrix::new_translation(
                &WorldVector::new(0.0, 0.0, 5.0)
            ))
        );
        let mut builder = SceneBuilder::new();
        let_assert!(Ok(geometry) = builder.add_geometry(Geometry::new(quad(0.0))));
        let_assert!(
            Ok(object) = builder.add_object(
                ObjectDesc::builder()
                    .geometry(geometry)
                    .transform(transform)
                    .build()
            )
        );
        let_assert!(Ok(scene) = builder.build());

        let data = scene.object(object);
        assert!(data.flags.contains(ObjectFlags::TRANSFORM_APPLIED));
        assert!(data.transform.static_matrix() == Some(&WorldMatrix::identity()));
        assert!(data.root.is_some());
        assert!((scene.bounds().min.z - 5.0).abs() < 1e-6);
        assert!(scene.triangles.iter().all(|t| t.iter().all(|p| p.z == 5.0)));
    }

    #[test]
    fn instances_share_geometry() {
        let mut builder = SceneBuilder::new();
        let_assert!(Ok(geometry) = builder.add_geometry(Geometry::new(quad(0.0))));
        for x in [0.0, 5.0, 10.0] {
            let_assert!(
                Some(transform) = ObjectTransform::new_static(WorldMatrix::new_translation(
                    &WorldVector::new(x, 0.0, 0.0)
                ))
            );
            let_assert!(
                Ok(_) = builder.add_object(
                    ObjectDesc::builder()
                        .geometry(geometry)
                        .transform(transform)
                        .placement(Placement::Instanced)
                        .build()
                )
            );
        }
        let_assert!(Ok(scene) = builder.build());

        assert!(scene.prim_count() == 2);
        let roots: Vec<_> = scene.objects.iter().map(|o| o.root).collect();
        assert!(roots.iter().all_equal());
        let instance_leaves = scene
            .leaves
            .iter()
            .filter(|l| matches!(l, LeafRecord::Instance { .. }))
            .count();
        assert!(instance_leaves == 3);
        assert!((scene.bounds().max.x - 11.0).abs() < 1e-6);
    }

    #[test]
    fn motion_instance_bounds_cover_path() {
        let_assert!(
            Some(transform) = ObjectTransform::motion(vec![
                DecomposedTransform::identity(),
                DecomposedTransform::from_translation(WorldVector::new(10.0, 0.0, 0.0)),
            ])
        );
        let bounds = WorldBox::new(WorldPoint::new(-1.0, -1.0, 0.0), WorldPoint::new(1.0, 1.0, 0.0));
        let moved = instance_bounds(&transform, &bounds, 16);
        assert!(moved.min.x <= -1.0);
        assert!(moved.max.x >= 11.0);
    }

    #[test]
    fn curve_padding_reaches_nodes() {
        let curve = |x: f32| {
            PrimitiveDesc::curve(
                CurveSegment::new(
                    [
                        WorldPoint::new(x, -1.0, 0.0),
                        WorldPoint::new(x, 0.0, 0.0),
                        WorldPoint::new(x, 1.0, 0.0),
                        WorldPoint::new(x, 2.0, 0.0),
                    ],
                    [0.25, 0.5],
                ),
                CurveShape::Thick,
            )
        };
        let settings = BuildSettings::builder().max_leaf_size(1).build();
        let mut builder = SceneBuilder::with_settings(settings);
        let_assert!(Ok(geometry) = builder.add_geometry(Geometry::new(vec![curve(0.0), curve(3.0)])));
        let_assert!(Ok(_) = builder.add_object(ObjectDesc::builder().geometry(geometry).build()));
        let_assert!(Ok(scene) = builder.build());

        assert!(scene.features().hair);
        let_assert!(Some(root) = scene.root());
        let_assert!(NodeLink::Inner(index) = root.decode());
        let node = scene.node(index);
        assert!(node.child_curve_padding == [0.5, 0.5]);
        // Center line only, the radius is carried by the padding
        assert!(node.child_bounds.iter().all(|b| b.max.z == 0.0));
    }
}
