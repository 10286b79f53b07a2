use std::ops::Sub;

use itertools::Itertools as _;

use super::{FloatType, WorldBox, WorldMatrix, WorldPoint, WorldVector};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AABB<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> AABB<Point> {
    pub fn new(min: Point, max: Point) -> AABB<Point> {
        AABB { min, max }
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> AABB<Point2> {
        AABB {
            min: f(&self.min),
            max: f(&self.max),
        }
    }
}

impl<Point: Sub + Copy> AABB<Point> {
    pub fn size(&self) -> Point::Output {
        self.max - self.min
    }
}

impl<Point> From<[Point; 2]> for AABB<Point> {
    fn from(value: [Point; 2]) -> Self {
        let [min, max] = value;
        AABB { min, max }
    }
}

impl<Point> From<(Point, Point)> for AABB<Point> {
    fn from(value: (Point, Point)) -> Self {
        let (min, max) = value;
        AABB { min, max }
    }
}

impl WorldBox {
    /// Box containing nothing, neutral element of `union`.
    pub fn empty() -> WorldBox {
        AABB {
            min: WorldPoint::from(WorldVector::repeat(FloatType::INFINITY)),
            max: WorldPoint::from(WorldVector::repeat(FloatType::NEG_INFINITY)),
        }
    }

    /// Smallest box containing all points, None for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Option<WorldBox> {
        let mut points = points.into_iter().peekable();
        points.peek()?;
        Some(points.fold(WorldBox::empty(), |b, p| b.including(p)))
    }

    pub fn is_empty(&self) -> bool {
        self.min.iter().zip_eq(self.max.iter()).any(|(a, b)| a > b)
    }

    pub fn including(&self, p: &WorldPoint) -> WorldBox {
        AABB {
            min: self.min.inf(p),
            max: self.max.sup(p),
        }
    }

    pub fn union(&self, other: &WorldBox) -> WorldBox {
        AABB {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grows the box by `amount` in every direction.
    pub fn padded(&self, amount: FloatType) -> WorldBox {
        let pad = WorldVector::repeat(amount);
        AABB {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn center(&self) -> WorldPoint {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn largest_axis(&self) -> usize {
        self.size().imax()
    }

    pub fn corners(&self) -> impl Iterator<Item = WorldPoint> + '_ {
        (0..8).map(move |i| {
            WorldPoint::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Bounding box of this box after an affine transformation.
    pub fn transformed(&self, matrix: &WorldMatrix) -> WorldBox {
        if self.is_empty() {
            return self.clone();
        }
        self.corners()
            .map(|p| matrix.transform_point(&p))
            .fold(WorldBox::empty(), |b, p| b.including(&p))
    }
}
