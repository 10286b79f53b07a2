use super::Features;
use crate::{
    geometry::{FloatType, LocalRay, RayIntersectionExt as _},
    scene::{BvhNode, PackedNodeLink, Visibility},
};

/// Result of testing a ray against both children of a node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct NodeHit {
    /// Bit i is set iff child i overlaps the ray interval and is visible
    pub mask: u8,
    /// Entry distances of the children, meaningful only for set bits
    pub t: [FloatType; 2],
}

/// What the traversal should do next after a node test.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ChildVisit {
    None,
    One(PackedNodeLink),
    /// Descend into `near` now, push `far` for later
    Both {
        near: PackedNodeLink,
        far: PackedNodeLink,
    },
}

impl BvhNode {
    #[inline]
    pub(crate) fn intersect<F: Features>(
        &self,
        ray: &LocalRay,
        tmin: FloatType,
        tmax: FloatType,
        visibility: Visibility,
    ) -> NodeHit {
        let mut hit = NodeHit {
            mask: 0,
            t: [FloatType::INFINITY; 2],
        };

        for i in 0..2 {
            if !self.child_visibility[i].intersects(visibility) {
                continue;
            }

            let padding = self.child_curve_padding[i];
            let (t1, t2) = if F::HAIR && padding > 0.0 {
                self.child_bounds[i].padded(padding).intersect(ray)
            } else {
                self.child_bounds[i].intersect(ray)
            };

            let t1 = t1.max(tmin);
            let t2 = t2.min(tmax);
            if t1 <= t2 {
                hit.mask |= 1 << i;
                hit.t[i] = t1;
            }
        }

        hit
    }
}

impl NodeHit {
    /// Orders the hit children. Exact ties visit child 0 first.
    #[inline]
    pub(crate) fn visit(&self, node: &BvhNode) -> ChildVisit {
        match self.mask {
            0 => ChildVisit::None,
            1 => ChildVisit::One(node.child_links[0]),
            2 => ChildVisit::One(node.child_links[1]),
            _ => {
                if self.t[1] < self.t[0] {
                    ChildVisit::Both {
                        near: node.child_links[1],
                        far: node.child_links[0],
                    }
                } else {
                    ChildVisit::Both {
                        near: node.child_links[0],
                        far: node.child_links[1],
                    }
                }
            }
        }
    }
}
