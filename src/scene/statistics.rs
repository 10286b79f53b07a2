use std::fmt::{Display, Write as _};

use super::{LeafRecord, NodeLink, PackedNodeLink, SceneBuffer};
use crate::{geometry::WorldBox, util::Stats};

/// Shape of the packed trees, for logging and debugging.
#[derive(Clone, Debug)]
pub struct SceneStatistics {
    /// Depth of leaves reachable from the top level root, not descending into instances
    pub depth: Stats,
    /// Number of primitives in primitive leaves
    pub leaf_fill: Stats,
    pub node_count: usize,
    pub leaf_count: usize,
    pub instance_count: usize,
    pub prim_count: usize,
    pub object_count: usize,
}

impl Display for SceneStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} leaves ({} instances), {} primitives, {} objects; depth {}; leaf fill {}",
            self.node_count,
            self.leaf_count,
            self.instance_count,
            self.prim_count,
            self.object_count,
            self.depth,
            self.leaf_fill,
        )
    }
}

impl SceneBuffer {
    pub fn statistics(&self) -> SceneStatistics {
        let depth = self
            .root
            .map(|root| self.depth_statistics_recursive(root))
            .unwrap_or_default();

        let leaf_fill = self
            .leaves
            .iter()
            .filter_map(|leaf| match leaf {
                LeafRecord::Primitives { slots, .. } => Some(slots.len()),
                LeafRecord::Instance { .. } => None,
            })
            .collect();

        SceneStatistics {
            depth,
            leaf_fill,
            node_count: self.node_count(),
            leaf_count: self.leaf_count(),
            instance_count: self
                .leaves
                .iter()
                .filter(|leaf| matches!(leaf, LeafRecord::Instance { .. }))
                .count(),
            prim_count: self.prim_count(),
            object_count: self.object_count(),
        }
    }

    fn depth_statistics_recursive(&self, link: PackedNodeLink) -> Stats {
        let NodeLink::Inner(index) = link.decode() else {
            return Stats::single(1);
        };

        let [a, b] = &self.node(index).child_links;
        self.depth_statistics_recursive(*a)
            .merge(&self.depth_statistics_recursive(*b))
            .offset(1)
    }

    /// Human readable dump of the top level tree, one line per node.
    pub fn dump_tree(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.dump_recursive(&mut out, 0, root, &self.bounds);
        }
        out
    }

    fn dump_recursive(
        &self,
        out: &mut String,
        indent: usize,
        link: PackedNodeLink,
        enclosing_box: &WorldBox,
    ) {
        let pad = "  ".repeat(indent);
        // Writing to a String can't fail
        let _ = match link.decode() {
            NodeLink::Inner(index) => writeln!(
                out,
                "{pad}- I{}: {:?}-{:?}",
                index.index(),
                enclosing_box.min,
                enclosing_box.max
            ),
            NodeLink::Leaf(index) => match self.leaf(index) {
                LeafRecord::Primitives { slots, kind } => writeln!(
                    out,
                    "{pad}- L{}: {} x {:?}, {:?}-{:?}",
                    index.index(),
                    slots.len(),
                    kind,
                    enclosing_box.min,
                    enclosing_box.max
                ),
                LeafRecord::Instance { object } => writeln!(
                    out,
                    "{pad}- L{}: instance of object {}, {:?}-{:?}",
                    index.index(),
                    object.index(),
                    enclosing_box.min,
                    enclosing_box.max
                ),
            },
        };

        if let NodeLink::Inner(index) = link.decode() {
            let node = self.node(index);
            for (child_link, child_box) in node.child_links.iter().zip(&node.child_bounds) {
                self.dump_recursive(out, indent + 1, *child_link, child_box);
            }
        }
    }
}
