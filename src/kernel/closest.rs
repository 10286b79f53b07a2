use std::ops::ControlFlow;

use super::{
    Intersection,
    traversal::{TraversalPolicy, traverse_scene},
};
use crate::{
    geometry::{FloatType, Ray, SelfToken},
    scene::{ObjectIdx, PrimIdx, SceneBuffer, Visibility},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum HitMode {
    /// Keep the nearest hit
    Closest,
    /// Any hit answers the query, light primitive of the self token is skipped too
    OpaqueShadow,
}

struct ClosestHit {
    visibility: Visibility,
    mode: HitMode,
    tmax: FloatType,
    best: Option<Intersection>,
}

impl ClosestHit {
    fn new(ray: &Ray, visibility: Visibility, mode: HitMode) -> ClosestHit {
        ClosestHit {
            visibility,
            mode,
            tmax: ray.tmax,
            best: None,
        }
    }
}

impl TraversalPolicy for ClosestHit {
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn tmax(&self) -> FloatType {
        self.tmax
    }

    fn skips(&self, token: &SelfToken, object: ObjectIdx, prim: PrimIdx) -> bool {
        match self.mode {
            HitMode::Closest => token.skips(object, prim),
            HitMode::OpaqueShadow => token.skips_shadow(object, prim),
        }
    }

    fn record(&mut self, _scene: &SceneBuffer, hit: Intersection) -> ControlFlow<()> {
        if hit.t < self.tmax {
            self.tmax = hit.t;
            self.best = Some(hit);
        }

        match self.mode {
            HitMode::Closest => ControlFlow::Continue(()),
            HitMode::OpaqueShadow => ControlFlow::Break(()),
        }
    }
}

impl SceneBuffer {
    /// Finds the nearest intersection along the ray, among objects visible to `visibility`.
    pub fn intersect(&self, ray: &Ray, visibility: Visibility) -> Option<Intersection> {
        let mut policy = ClosestHit::new(ray, visibility, HitMode::Closest);
        traverse_scene(self, ray, &mut policy);
        policy.best
    }

    /// Returns true if anything visible to opaque shadow rays blocks the ray.
    ///
    /// Stops at the first hit found. Both the origin and the light primitive of the ray's
    /// self token are ignored.
    pub fn intersect_shadow(&self, ray: &Ray, visibility: Visibility) -> bool {
        let mut policy = ClosestHit::new(
            ray,
            visibility | Visibility::SHADOW_OPAQUE,
            HitMode::OpaqueShadow,
        );
        traverse_scene(self, ray, &mut policy);
        policy.best.is_some()
    }
}
