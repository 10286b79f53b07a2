use std::ops::ControlFlow;

use super::{
    Intersection,
    traversal::{TraversalPolicy, traverse_scene},
};
use crate::{
    geometry::{FloatType, Ray},
    scene::{ObjectData, ObjectFlags, SceneBuffer, Visibility},
};

fn is_volume(object: &ObjectData, visibility: Visibility) -> bool {
    object.flags.contains(ObjectFlags::HAS_VOLUME) && object.visibility.intersects(visibility)
}

/// Nearest hit on an object with a volume.
struct VolumeClosest {
    visibility: Visibility,
    tmax: FloatType,
    best: Option<Intersection>,
}

impl TraversalPolicy for VolumeClosest {
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn tmax(&self) -> FloatType {
        self.tmax
    }

    fn accepts_object(&self, object: &ObjectData) -> bool {
        is_volume(object, self.visibility)
    }

    fn record(&mut self, _scene: &SceneBuffer, hit: Intersection) -> ControlFlow<()> {
        if hit.t < self.tmax {
            self.tmax = hit.t;
            self.best = Some(hit);
        }
        ControlFlow::Continue(())
    }
}

/// Every hit on objects with a volume, up to a limit.
struct VolumeAll<'a> {
    visibility: Visibility,
    tmax: FloatType,
    hits: &'a mut Vec<Intersection>,
    max_hits: usize,
    num_hits: usize,
}

impl TraversalPolicy for VolumeAll<'_> {
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn tmax(&self) -> FloatType {
        self.tmax
    }

    fn accepts_object(&self, object: &ObjectData) -> bool {
        is_volume(object, self.visibility)
    }

    fn record(&mut self, _scene: &SceneBuffer, hit: Intersection) -> ControlFlow<()> {
        self.hits.push(hit);
        self.num_hits += 1;
        if self.num_hits >= self.max_hits {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

impl SceneBuffer {
    /// Nearest intersection with an object flagged `ObjectFlags::HAS_VOLUME`.
    pub fn intersect_volume(&self, ray: &Ray, visibility: Visibility) -> Option<Intersection> {
        let mut policy = VolumeClosest {
            visibility,
            tmax: ray.tmax,
            best: None,
        };
        traverse_scene(self, ray, &mut policy);
        policy.best
    }

    /// Appends intersections with volume objects to `hits`, in traversal order, until
    /// `max_hits` were found. Returns the number of appended hits.
    pub fn intersect_volume_all(
        &self,
        ray: &Ray,
        visibility: Visibility,
        hits: &mut Vec<Intersection>,
        max_hits: usize,
    ) -> usize {
        if max_hits == 0 {
            return 0;
        }
        let mut policy = VolumeAll {
            visibility,
            tmax: ray.tmax,
            hits,
            max_hits,
            num_hits: 0,
        };
        traverse_scene(self, ray, &mut policy);
        policy.num_hits
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geometry::{ObjectTransform, WorldMatrix, WorldPoint, WorldVector},
        scene::{Geometry, ObjectDesc, ObjectIdx, Placement, SceneBuilder, test_scenes::quad},
    };
    use assert2::{assert, let_assert};
    use test_case::test_case;

    /// Closed volume box around the origin behind an ordinary surface at z = 5.
    /// Returns the scene and the volume object's index.
    fn scene(placement: Placement) -> (SceneBuffer, ObjectIdx) {
        let mut builder = SceneBuilder::new();
        let_assert!(Ok(surface) = builder.add_geometry(Geometry::new(quad(5.0))));
        let mut faces = quad(-1.0);
        faces.extend(quad(1.0));
        let_assert!(Ok(volume) = builder.add_geometry(Geometry::new(faces)));

        let_assert!(Ok(_) = builder.add_object(ObjectDesc::builder().geometry(surface).build()));
        let_assert!(
            Some(transform) = ObjectTransform::new_static(WorldMatrix::new_translation(
                &WorldVector::new(0.0, 0.0, -2.0)
            ))
        );
        let_assert!(
            Ok(object) = builder.add_object(
                ObjectDesc::builder()
                    .geometry(volume)
                    .transform(transform)
                    .placement(placement)
                    .has_volume(true)
                    .build()
            )
        );
        let_assert!(Ok(scene) = builder.build());
        (scene, object)
    }

    fn ray_down_z() -> Ray {
        Ray::new(WorldPoint::new(0.1, 0.2, 10.0), WorldVector::new(0.0, 0.0, -1.0))
    }

    #[test_case(Placement::Flattened)]
    #[test_case(Placement::Instanced)]
    fn closest_volume_ignores_surfaces(placement: Placement) {
        let (scene, object) = scene(placement);

        let_assert!(Some(surface) = scene.intersect(&ray_down_z(), Visibility::ALL));
        assert!((surface.t - 5.0).abs() < 1e-5);

        let_assert!(Some(hit) = scene.intersect_volume(&ray_down_z(), Visibility::ALL));
        assert!(hit.object == object);
        assert!((hit.t - 11.0).abs() < 1e-5);
    }

    #[test_case(Placement::Flattened)]
    #[test_case(Placement::Instanced)]
    fn records_all_volume_boundaries(placement: Placement) {
        let (scene, object) = scene(placement);
        let mut hits = Vec::new();
        let count = scene.intersect_volume_all(&ray_down_z(), Visibility::ALL, &mut hits, 8);

        assert!(count == 2);
        assert!(hits.len() == 2);
        assert!(hits.iter().all(|h| h.object == object));
        let mut distances: Vec<f32> = hits.iter().map(|h| h.t).collect();
        distances.sort_by(f32::total_cmp);
        assert!((distances[0] - 11.0).abs() < 1e-5);
        assert!((distances[1] - 13.0).abs() < 1e-5);
    }

    #[test]
    fn stops_at_max_hits_and_appends() {
        let (scene, _) = scene(Placement::Flattened);
        let mut hits = vec![];
        let count = scene.intersect_volume_all(&ray_down_z(), Visibility::ALL, &mut hits, 1);
        assert!(count == 1);
        assert!(hits.len() == 1);

        let count = scene.intersect_volume_all(&ray_down_z(), Visibility::ALL, &mut hits, 0);
        assert!(count == 0);
        assert!(hits.len() == 1);
    }

    #[test]
    fn scene_without_volumes() {
        let scene = crate::scene::test_scenes::stacked_quads(3, Default::default());
        assert!(scene.intersect_volume(&ray_down_z(), Visibility::ALL).is_none());
        let mut hits = vec![];
        assert!(scene.intersect_volume_all(&ray_down_z(), Visibility::ALL, &mut hits, 4) == 0);
    }
}
