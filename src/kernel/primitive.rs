use std::ops::ControlFlow;

use super::{Features, Intersection, frame::RayFrame, traversal::TraversalPolicy};
use crate::{
    geometry::{CurveHit, FloatType, LocalRay, Ray},
    scene::{PrimitiveInfo, PrimitiveType, SceneBuffer, SlotRange},
};

/// Distance and surface coordinates of a primitive hit.
#[derive(Copy, Clone, Debug)]
struct PrimitiveHit {
    t: FloatType,
    u: FloatType,
    v: FloatType,
}

impl From<CurveHit> for PrimitiveHit {
    fn from(hit: CurveHit) -> Self {
        PrimitiveHit {
            t: hit.t,
            u: hit.u,
            v: hit.v,
        }
    }
}

/// Everything the per-primitive loop of one leaf needs.
struct LeafContext<'a> {
    scene: &'a SceneBuffer,
    ray: &'a Ray,
    frame: &'a RayFrame,
    slots: SlotRange,
    kind: PrimitiveType,
}

/// Tests all primitives of a leaf. The primitive type is resolved once per leaf,
/// types whose feature is disabled are skipped without testing.
#[inline]
pub(super) fn intersect_leaf<F: Features, P: TraversalPolicy>(
    scene: &SceneBuffer,
    ray: &Ray,
    frame: &RayFrame,
    slots: SlotRange,
    kind: PrimitiveType,
    policy: &mut P,
) -> ControlFlow<()> {
    let leaf = LeafContext {
        scene,
        ray,
        frame,
        slots,
        kind,
    };
    let time = ray.time;

    match kind {
        PrimitiveType::Triangle => leaf.test::<F, P, _>(policy, |info, local, tmin, tmax| {
            let (t, uv) = scene.triangles[info.data].intersect(local)?;
            in_range(t, tmin, tmax).then_some(PrimitiveHit { t, u: uv.u, v: uv.v })
        }),
        PrimitiveType::MotionTriangle if F::MOTION => {
            leaf.test::<F, P, _>(policy, |info, local, tmin, tmax| {
                let triangle = scene.motion_triangles[info.data].at(time);
                let (t, uv) = triangle.intersect(local)?;
                in_range(t, tmin, tmax).then_some(PrimitiveHit { t, u: uv.u, v: uv.v })
            })
        }
        PrimitiveType::Curve(shape) if F::HAIR => {
            leaf.test::<F, P, _>(policy, |info, local, tmin, tmax| {
                scene.curves[info.data]
                    .intersect(local, shape, tmin, tmax)
                    .map(PrimitiveHit::from)
            })
        }
        PrimitiveType::MotionCurve(shape) if F::HAIR && F::MOTION => {
            leaf.test::<F, P, _>(policy, |info, local, tmin, tmax| {
                scene.motion_curves[info.data]
                    .at(time)
                    .intersect(local, shape, tmin, tmax)
                    .map(PrimitiveHit::from)
            })
        }
        PrimitiveType::Point if F::POINTCLOUD => {
            leaf.test::<F, P, _>(policy, |info, local, tmin, tmax| {
                let t = scene.points[info.data].intersect(local, tmin, tmax)?;
                Some(PrimitiveHit { t, u: 0.0, v: 0.0 })
            })
        }
        PrimitiveType::MotionPoint if F::POINTCLOUD && F::MOTION => {
            leaf.test::<F, P, _>(policy, |info, local, tmin, tmax| {
                let t = scene.motion_points[info.data]
                    .at(time)
                    .intersect(local, tmin, tmax)?;
                Some(PrimitiveHit { t, u: 0.0, v: 0.0 })
            })
        }
        _ => ControlFlow::Continue(()),
    }
}

/// Triangle hits are accepted strictly inside the ray interval, same as the other shapes.
#[inline]
fn in_range(t: FloatType, tmin: FloatType, tmax: FloatType) -> bool {
    t > tmin && t < tmax
}

impl LeafContext<'_> {
    #[inline]
    fn test<F, P, I>(&self, policy: &mut P, intersect: I) -> ControlFlow<()>
    where
        F: Features,
        P: TraversalPolicy,
        I: Fn(&PrimitiveInfo, &LocalRay, FloatType, FloatType) -> Option<PrimitiveHit>,
    {
        for slot_index in self.slots.iter() {
            let slot = self.scene.slot(slot_index);
            let object_index = self.frame.object.unwrap_or(slot.object);

            if policy.skips(&self.ray.self_token, object_index, slot.prim) {
                continue;
            }
            // Instances were already accepted when entered
            if self.frame.object.is_none()
                && !policy.accepts_object(self.scene.object(object_index))
            {
                continue;
            }

            let info = self.scene.prim(slot.prim);
            // Scenes with restricted time ranges always have the motion feature
            if F::MOTION && !info.time_range.contains(self.ray.time) {
                continue;
            }

            if let Some(hit) = intersect(info, &self.frame.ray, self.ray.tmin, policy.tmax()) {
                policy.record(
                    self.scene,
                    Intersection {
                        t: hit.t,
                        u: hit.u,
                        v: hit.v,
                        prim: slot.prim,
                        object: object_index,
                        kind: self.kind,
                    },
                )?;
            }
        }

        ControlFlow::Continue(())
    }
}
