use std::ops::ControlFlow;

use arrayvec::ArrayVec;
use rand::Rng;

use super::{
    Intersection, LOCAL_MAX_HITS,
    frame::RayFrame,
    traversal::{TraversalPolicy, traverse_from},
};
use crate::{
    geometry::{FloatType, Ray, SelfToken},
    scene::{ObjectData, ObjectFlags, ObjectIdx, PrimIdx, SceneBuffer, Visibility},
};

/// Hits of a query restricted to a single object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalIntersection {
    /// Number of distinct hits found. Can be larger than `hits.len()`.
    pub num_hits: usize,
    pub hits: ArrayVec<Intersection, LOCAL_MAX_HITS>,
}

/// Number of most recent distinct hit distances remembered for skipping duplicates.
const RECENT_DISTANCES: usize = 16;

struct Local<'a, R> {
    object: ObjectIdx,
    tmax: FloatType,
    max_hits: usize,
    rng: Option<&'a mut R>,
    /// Distances of the latest distinct hits, oldest first
    recent: ArrayVec<FloatType, RECENT_DISTANCES>,
    result: LocalIntersection,
}

impl<R> Local<'_, R> {
    /// Remembers the distance, returns false if it was already seen.
    fn is_new_distance(&mut self, t: FloatType) -> bool {
        if self.recent.contains(&t) || self.result.hits.iter().any(|stored| stored.t == t) {
            return false;
        }
        if self.recent.is_full() {
            self.recent.remove(0);
        }
        self.recent.push(t);
        true
    }
}

impl<R: Rng> TraversalPolicy for Local<'_, R> {
    fn visibility(&self) -> Visibility {
        Visibility::ALL
    }

    fn tmax(&self) -> FloatType {
        self.tmax
    }

    fn accepts_object(&self, _object: &ObjectData) -> bool {
        true
    }

    fn skips(&self, token: &SelfToken, _object: ObjectIdx, prim: PrimIdx) -> bool {
        token.skips_local(prim)
    }

    fn record(&mut self, _scene: &SceneBuffer, hit: Intersection) -> ControlFlow<()> {
        if hit.object != self.object {
            return ControlFlow::Continue(());
        }

        if self.max_hits == 0 {
            // Occlusion test, any hit will do
            self.result.num_hits = 1;
            return ControlFlow::Break(());
        }

        // Shared edges and vertices report the same surface point twice
        if !self.is_new_distance(hit.t) {
            return ControlFlow::Continue(());
        }

        self.result.num_hits += 1;
        let hits = &mut self.result.hits;
        if hits.len() < self.max_hits {
            hits.push(hit);
        } else if let Some(rng) = self.rng.as_mut() {
            // Reservoir sampling, every hit ends up stored with equal probability
            let index = rng.random_range(0..self.result.num_hits);
            if index < self.max_hits {
                hits[index] = hit;
            }
        }

        ControlFlow::Continue(())
    }
}

impl SceneBuffer {
    /// Intersects only the primitives of one object.
    ///
    /// Records the first `max_hits` (at most `LOCAL_MAX_HITS`) distinct hits found, in traversal
    /// order, and counts all of them. With `max_hits == 0` this is an occlusion test that
    /// stops at the first hit and reports `num_hits == 1`.
    pub fn intersect_local(
        &self,
        ray: &Ray,
        object: ObjectIdx,
        max_hits: usize,
    ) -> LocalIntersection {
        self.run_local::<rand::rngs::SmallRng>(ray, object, max_hits, None)
    }

    /// Like `intersect_local`, but when more than `max_hits` hits are found the stored ones
    /// are a uniform random sample of all of them.
    pub fn intersect_local_sampled<R: Rng>(
        &self,
        ray: &Ray,
        object: ObjectIdx,
        max_hits: usize,
        rng: &mut R,
    ) -> LocalIntersection {
        self.run_local(ray, object, max_hits, Some(rng))
    }

    fn run_local<R: Rng>(
        &self,
        ray: &Ray,
        object: ObjectIdx,
        max_hits: usize,
        rng: Option<&mut R>,
    ) -> LocalIntersection {
        let mut policy = Local {
            object,
            tmax: ray.tmax,
            max_hits: max_hits.min(LOCAL_MAX_HITS),
            rng,
            recent: ArrayVec::new(),
            result: LocalIntersection::default(),
        };

        if !ray.is_valid() || object.index() >= self.object_count() {
            return policy.result;
        }
        let object_data = self.object(object);
        let Some(root) = object_data.root else {
            return policy.result;
        };

        let world = RayFrame::world(ray);
        let frame = if object_data.flags.contains(ObjectFlags::TRANSFORM_APPLIED) {
            world
        } else {
            RayFrame {
                ray: world
                    .ray
                    .transformed(&object_data.transform.inverse_at(ray.time)),
                object: Some(object),
            }
        };

        traverse_from(self, ray, root, frame, &mut policy);
        policy.result
    }
}
