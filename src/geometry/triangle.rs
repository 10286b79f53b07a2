use std::ops::{Index, IndexMut, Mul, Sub};

use num_traits::One;

use super::{FloatType, Interpolate, WorldBox, WorldMatrix, WorldPoint, WorldVector};

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Point> {
        self.0.iter()
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> Triangle<Point2> {
        Triangle([f(&self[0]), f(&self[1]), f(&self[2])])
    }

    pub fn zip_map<Point2, Point3, F: FnMut(&Point, &Point2) -> Point3>(
        &self,
        rhs: &Triangle<Point2>,
        mut f: F,
    ) -> Triangle<Point3> {
        Triangle([
            f(&self.0[0], &rhs.0[0]),
            f(&self.0[1], &rhs.0[1]),
            f(&self.0[2], &rhs.0[2]),
        ])
    }
}

impl<Point: Default> Default for Triangle<Point> {
    fn default() -> Self {
        Triangle([Default::default(), Default::default(), Default::default()])
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<Point> IndexMut<usize> for Triangle<Point> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Triangle<WorldPoint> {
    /// Returns edge vectors, coming from self[0]
    pub fn edges(&self) -> [WorldVector; 2] {
        [self[1] - self[0], self[2] - self[0]]
    }

    /// Returns a normal vector of the triangle, not normalized.
    pub fn normal(&self) -> WorldVector {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }

    pub fn bounds(&self) -> WorldBox {
        self.iter()
            .fold(WorldBox::empty(), |b, p| b.including(p))
    }

    pub fn centroid(&self) -> WorldPoint {
        WorldPoint::from((self[0].coords + self[1].coords + self[2].coords) / 3.0)
    }

    pub fn transformed(&self, matrix: &WorldMatrix) -> Triangle<WorldPoint> {
        self.map(|p| matrix.transform_point(p))
    }
}

impl Interpolate for Triangle<WorldPoint> {
    fn interpolate(&self, other: &Self, factor: FloatType) -> Self {
        self.zip_map(other, |a, b| a.interpolate(b, factor))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates<T> {
    pub u: T,
    pub v: T,
}

impl<T> BarycentricCoordinates<T>
where
    T: One + Copy + Sub<Output = T>,
{
    pub fn interpolate<T2>(&self, a: &T2, b: &T2, c: &T2) -> T2
    where
        for<'a> &'a T2: Mul<T, Output = T2>,
        T2: std::ops::Add<Output = T2>,
    {
        let w = T::one() - self.u - self.v;
        a * w + b * self.u + c * self.v
    }

    pub fn interpolate_triangle<T2>(&self, triangle: &Triangle<T2>) -> T2
    where
        for<'a> &'a T2: Mul<T, Output = T2>,
        T2: std::ops::Add<Output = T2>,
    {
        self.interpolate(&triangle[0], &triangle[1], &triangle[2])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::test::WorldPointWrapper;
    use assert2::assert;
    use proptest::prop_assert;
    use test_strategy::proptest;

    fn triangle() -> Triangle<WorldPoint> {
        Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(2.0, 0.0, 0.0),
            WorldPoint::new(0.0, 2.0, 0.0),
        )
    }

    #[test]
    fn normal_follows_winding() {
        assert!(triangle().normal() == WorldVector::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn interpolation_endpoints() {
        let a = triangle();
        let b = a.map(|p| p + WorldVector::new(0.0, 0.0, 2.0));
        assert!(a.interpolate(&b, 0.0) == a);
        assert!(a.interpolate(&b, 1.0) == b);
        assert!(a.interpolate(&b, 0.5)[1] == WorldPoint::new(2.0, 0.0, 1.0));
    }

    #[proptest]
    fn barycentric_vertices(a: WorldPointWrapper, b: WorldPointWrapper, c: WorldPointWrapper) {
        let t = Triangle::new(*a, *b, *c);
        let t = t.map(|p| p.coords);
        let at_b = BarycentricCoordinates { u: 1.0f32, v: 0.0 }.interpolate_triangle(&t);
        let at_c = BarycentricCoordinates { u: 0.0f32, v: 1.0 }.interpolate_triangle(&t);
        prop_assert!(at_b == b.coords);
        prop_assert!(at_c == c.coords);
    }

    #[test]
    fn bounds_and_centroid() {
        let t = triangle();
        assert!(t.bounds() == WorldBox::new(WorldPoint::origin(), WorldPoint::new(2.0, 2.0, 0.0)));
        let c = t.centroid();
        assert!((c - WorldPoint::new(2.0 / 3.0, 2.0 / 3.0, 0.0)).norm() < 1e-6);
    }
}
