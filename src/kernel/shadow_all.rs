use std::ops::ControlFlow;

use arrayvec::ArrayVec;
use ordered_float::OrderedFloat;

use super::{
    Intersection, SHADOW_RECORD_SIZE, SHADOW_TRANSPARENCY_CUTOFF,
    traversal::{TraversalPolicy, traverse_scene},
};
use crate::{
    geometry::{FloatType, Ray, SelfToken},
    scene::{ObjectIdx, PrimIdx, PrimitiveFlags, SceneBuffer, Visibility},
};

/// Outcome of a transparent shadow query.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowAllResult {
    /// An opaque surface blocks the ray, or curves absorbed almost all light
    pub occluded: bool,
    /// The nearest transparent hits, in no particular order
    pub hits: ArrayVec<Intersection, SHADOW_RECORD_SIZE>,
    /// Number of transparent hits found, may be larger than `hits.len()`
    pub num_hits: usize,
    /// Product of shadow transparencies of the curves passed through
    pub throughput: FloatType,
}

impl ShadowAllResult {
    fn new() -> ShadowAllResult {
        ShadowAllResult {
            occluded: false,
            hits: ArrayVec::new(),
            num_hits: 0,
            throughput: 1.0,
        }
    }

    /// Recorded hits ordered by distance
    pub fn sorted_hits(&self) -> ArrayVec<Intersection, SHADOW_RECORD_SIZE> {
        let mut hits = self.hits.clone();
        hits.sort_by_key(|hit| OrderedFloat(hit.t));
        hits
    }
}

struct ShadowAll {
    visibility: Visibility,
    tmax: FloatType,
    max_records: usize,
    result: ShadowAllResult,
}

impl ShadowAll {
    /// Stores the hit if there is space, otherwise replaces the farthest stored hit if the
    /// new one is closer.
    fn store(&mut self, hit: Intersection) {
        let hits = &mut self.result.hits;
        if hits.len() < self.max_records {
            hits.push(hit);
            return;
        }

        if let Some(farthest) = hits.iter_mut().max_by_key(|stored| OrderedFloat(stored.t)) {
            if hit.t < farthest.t {
                *farthest = hit;
            }
        }
    }
}

impl TraversalPolicy for ShadowAll {
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn tmax(&self) -> FloatType {
        self.tmax
    }

    fn skips(&self, token: &SelfToken, object: ObjectIdx, prim: PrimIdx) -> bool {
        token.skips_shadow(object, prim)
    }

    fn record(&mut self, scene: &SceneBuffer, hit: Intersection) -> ControlFlow<()> {
        let info = scene.prim(hit.prim);

        if !info.flags.contains(PrimitiveFlags::TRANSPARENT_SHADOW) {
            self.result.occluded = true;
            return ControlFlow::Break(());
        }

        if hit.kind.is_curve() {
            self.result.throughput *= info.shadow_transparency;
            if self.result.throughput < SHADOW_TRANSPARENCY_CUTOFF {
                self.result.occluded = true;
                return ControlFlow::Break(());
            }
            return ControlFlow::Continue(());
        }

        self.result.num_hits += 1;
        self.store(hit);
        ControlFlow::Continue(())
    }
}

impl SceneBuffer {
    /// Collects transparent surfaces along a shadow ray.
    ///
    /// Stops as soon as an opaque surface is found. Otherwise records up to
    /// `min(max_hits, SHADOW_RECORD_SIZE)` nearest transparent hits, while still counting
    /// all of them. Transparent curves are not recorded, they attenuate `throughput` instead.
    pub fn intersect_shadow_all(
        &self,
        ray: &Ray,
        visibility: Visibility,
        max_hits: usize,
    ) -> ShadowAllResult {
        let mut policy = ShadowAll {
            visibility,
            tmax: ray.tmax,
            max_records: max_hits.min(SHADOW_RECORD_SIZE),
            result: ShadowAllResult::new(),
        };
        traverse_scene(self, ray, &mut policy);
        policy.result
    }
}
