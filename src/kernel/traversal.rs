use std::ops::ControlFlow;

use super::{
    Features, Intersection,
    features::with_features,
    frame::RayFrame,
    node_intersection::ChildVisit,
    primitive::intersect_leaf,
    stack::{StackEntry, TraversalStack},
};
use crate::{
    geometry::{FloatType, Ray, SelfToken},
    scene::{
        LeafRecord, NodeLink, ObjectData, ObjectIdx, PackedNodeLink, PrimIdx, SceneBuffer,
        Visibility,
    },
};

/// Decides what a traversal does with primitive hits and when it may stop.
pub(crate) trait TraversalPolicy {
    /// Ray visibility, tested against node children and objects
    fn visibility(&self) -> Visibility;

    /// Current far end of the search interval. Shrinks as closer hits are found,
    /// for queries that only care about the closest one.
    fn tmax(&self) -> FloatType;

    /// Whether primitives of this object (or the whole instance) are candidates at all.
    fn accepts_object(&self, object: &ObjectData) -> bool {
        object.visibility.intersects(self.visibility())
    }

    fn skips(&self, token: &SelfToken, object: ObjectIdx, prim: PrimIdx) -> bool {
        token.skips(object, prim)
    }

    /// Called for every primitive hit inside (tmin, tmax()). Break ends the traversal.
    fn record(&mut self, scene: &SceneBuffer, hit: Intersection) -> ControlFlow<()>;
}

/// Traverses the whole scene in world space. Invalid rays and empty scenes have no hits.
pub(crate) fn traverse_scene<P: TraversalPolicy>(scene: &SceneBuffer, ray: &Ray, policy: &mut P) {
    if !ray.is_valid() {
        return;
    }
    let Some(root) = scene.root() else {
        return;
    };
    traverse_from(scene, ray, root, RayFrame::world(ray), policy);
}

/// Selects the traversal specialized for the scene's features and runs it.
pub(crate) fn traverse_from<P: TraversalPolicy>(
    scene: &SceneBuffer,
    ray: &Ray,
    root: PackedNodeLink,
    frame: RayFrame,
    policy: &mut P,
) {
    with_features!(scene.features(), F => traverse::<F, P>(scene, ray, root, frame, policy))
}

fn traverse<F: Features, P: TraversalPolicy>(
    scene: &SceneBuffer,
    ray: &Ray,
    root: PackedNodeLink,
    mut frame: RayFrame,
    policy: &mut P,
) {
    let mut stack = TraversalStack::new();
    let mut current = Some(StackEntry::Node(root));

    while let Some(entry) = current.take().or_else(|| stack.pop()) {
        let link = match entry {
            StackEntry::Node(link) => link,
            StackEntry::InstanceExit(saved) => {
                frame = saved;
                continue;
            }
        };

        match link.decode() {
            NodeLink::Inner(index) => {
                let node = scene.node(index);
                let hit =
                    node.intersect::<F>(&frame.ray, ray.tmin, policy.tmax(), policy.visibility());
                match hit.visit(node) {
                    ChildVisit::None => {}
                    ChildVisit::One(child) => current = Some(StackEntry::Node(child)),
                    ChildVisit::Both { near, far } => {
                        stack.push(StackEntry::Node(far));
                        current = Some(StackEntry::Node(near));
                    }
                }
            }
            NodeLink::Leaf(index) => match *scene.leaf(index) {
                LeafRecord::Instance { object: object_index } => {
                    let object = scene.object(object_index);
                    if !policy.accepts_object(object) {
                        continue;
                    }
                    if let Some(object_root) = object.root {
                        stack.push(StackEntry::InstanceExit(frame));
                        frame = frame.enter::<F>(object, object_index, ray.time);
                        current = Some(StackEntry::Node(object_root));
                    }
                }
                LeafRecord::Primitives { slots, kind } => {
                    if intersect_leaf::<F, P>(scene, ray, &frame, slots, kind, policy).is_break() {
                        return;
                    }
                }
            },
        }
    }
}
