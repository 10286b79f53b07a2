//! Small scenes shared by tests across the crate.

use assert2::let_assert;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use super::{Geometry, ObjectDesc, PrimitiveDesc, PrimitiveFlags, SceneBuffer, SceneBuilder};
use crate::geometry::{
    CurveSegment, CurveShape, PointPrimitive, Ray, Triangle, WorldPoint, WorldVector,
};

/// Two triangles covering the square [-1, 1] x [-1, 1] at height `z`.
pub fn quad(z: f32) -> Vec<PrimitiveDesc> {
    let a = WorldPoint::new(-1.0, -1.0, z);
    let b = WorldPoint::new(1.0, -1.0, z);
    let c = WorldPoint::new(1.0, 1.0, z);
    let d = WorldPoint::new(-1.0, 1.0, z);
    vec![
        PrimitiveDesc::triangle(Triangle::new(a, b, c)),
        PrimitiveDesc::triangle(Triangle::new(a, c, d)),
    ]
}

/// Scene with a single flattened object at identity made of `prims`.
pub fn single_object(prims: Vec<PrimitiveDesc>) -> SceneBuffer {
    let mut builder = SceneBuilder::new();
    let_assert!(Ok(geometry) = builder.add_geometry(Geometry::new(prims)));
    let_assert!(Ok(_) = builder.add_object(ObjectDesc::builder().geometry(geometry).build()));
    let_assert!(Ok(scene) = builder.build());
    scene
}

pub fn single_triangle(triangle: Triangle<WorldPoint>) -> SceneBuffer {
    single_object(vec![PrimitiveDesc::triangle(triangle)])
}

/// Quads at z = 0, 1, ..., count - 1, all in object 0.
pub fn stacked_quads(count: usize, flags: PrimitiveFlags) -> SceneBuffer {
    single_object(
        (0..count)
            .flat_map(|z| quad(z as f32))
            .map(|prim| prim.with_flags(flags))
            .collect(),
    )
}

/// Triangles, curves and points, all inside x, y in [-2, 2] and z in [-0.5, 0.5].
pub fn mixed_geometry() -> Geometry {
    let mut prims = quad(0.0);
    prims.extend(quad(-0.5).into_iter().map(|prim| PrimitiveDesc {
        shape: match prim.shape {
            super::Shape::Triangle(t) => super::Shape::Triangle(t.map(|p| {
                WorldPoint::new(p.x * 2.0, p.y * 2.0, p.z)
            })),
            shape => shape,
        },
        ..prim
    }));

    for (i, shape) in [CurveShape::Thick, CurveShape::Ribbon].into_iter().enumerate() {
        let y = -1.5 + i as f32 * 3.0;
        prims.push(PrimitiveDesc::curve(
            CurveSegment::new(
                [
                    WorldPoint::new(-2.0, y, 0.2),
                    WorldPoint::new(-1.0, y, 0.3),
                    WorldPoint::new(1.0, y, 0.3),
                    WorldPoint::new(2.0, y, 0.2),
                ],
                [0.1, 0.15],
            ),
            shape,
        ));
    }

    for (x, y) in [(1.5, 0.0), (-1.5, 0.0), (0.0, 1.5)] {
        prims.push(PrimitiveDesc::point(PointPrimitive::new(
            WorldPoint::new(x, y, 0.25),
            0.25,
        )));
    }

    Geometry::new(prims)
}

/// Random triangles of moderate size inside the cube [-10, 10]^3.
pub fn random_triangle_list(count: usize, seed: u64) -> Vec<Triangle<WorldPoint>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let center = random_point(&mut rng, 10.0);
            Triangle::new(
                center + random_point(&mut rng, 1.5).coords,
                center + random_point(&mut rng, 1.5).coords,
                center + random_point(&mut rng, 1.5).coords,
            )
        })
        .collect()
}

pub fn triangle_soup(triangles: Vec<Triangle<WorldPoint>>) -> SceneBuffer {
    single_object(triangles.into_iter().map(PrimitiveDesc::triangle).collect())
}

pub fn random_triangles(count: usize, seed: u64) -> SceneBuffer {
    triangle_soup(random_triangle_list(count, seed))
}

/// Ray from outside the random triangle cube aimed at a point inside it.
pub fn random_ray(rng: &mut SmallRng) -> Ray {
    let origin = loop {
        let candidate = random_point(rng, 30.0);
        if candidate.coords.norm() > 20.0 {
            break candidate;
        }
    };
    let target = random_point(rng, 8.0);
    Ray::new(origin, target - origin)
}

fn random_point(rng: &mut SmallRng, extent: f32) -> WorldPoint {
    WorldPoint::from(WorldVector::from_fn(|_, _| {
        rng.random_range(-extent..extent)
    }))
}
