//! A loose octree over world-space bounding boxes.
//!
//! Every node carries the spatial octant it was partitioned into (`aabb`)
//! and the union of all entry boxes reachable through it (`loose_aabb`).
//! Entries are routed to the child whose octant overlaps them the most, so
//! a box straddling an octant boundary still lives in exactly one leaf; the
//! loose box is what traversal tests against.
//!
//! Nodes live in an arena and reference each other by [`NodeId`], which
//! keeps the rebuild-on-reset contract trivial and traversal an explicit
//! index stack.

use nalgebra::Point3;

use crate::geometry::Aabb;

/// A leaf splits once it holds this many entries, unless it is already at
/// [`MAX_HEIGHT`].
pub const LEAF_CAPACITY: usize = 512;
pub const MAX_HEIGHT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub aabb: Aabb,
    pub id: u32,
}

#[derive(Debug)]
pub enum NodeKind {
    Leaf { entries: Vec<Entry> },
    Internal { children: [NodeId; 8] },
}

#[derive(Debug)]
pub struct Node {
    /// The spatial octant this node partitions.
    pub aabb: Aabb,
    /// Union of all entry boxes in this subtree; never clamped to the octant.
    pub loose_aabb: Aabb,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub struct Octree {
    nodes: Vec<Node>,
    root: NodeId,
}

/// Build statistics, logged after every rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub leaf_nodes: usize,
    pub max_height: u32,
    pub max_leaf_entries: usize,
    pub total_entries: usize,
}

impl Octree {
    pub fn new() -> Octree {
        let mut tree = Octree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.reset(Aabb::degenerate(Point3::origin()));
        tree
    }

    /// Drops every node and restarts with a single empty leaf spanning
    /// `root_aabb`.
    pub fn reset(&mut self, root_aabb: Aabb) {
        self.nodes.clear();
        self.nodes.push(Node {
            aabb: root_aabb,
            loose_aabb: root_aabb,
            kind: NodeKind::Leaf {
                entries: Vec::new(),
            },
        });
        self.root = NodeId(0);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Inserts one entry per `(aabb, id)` pair.
    pub fn add(&mut self, aabbs: &[Aabb], ids: &[u32]) {
        for (aabb, &id) in aabbs.iter().zip(ids.iter()) {
            self.insert(Entry { aabb: *aabb, id });
        }
    }

    fn insert(&mut self, entry: Entry) {
        let (mut id, mut height) = self.descend_while_union(&entry.aabb);

        loop {
            let split = match &mut self.nodes[id.0].kind {
                NodeKind::Leaf { entries } => {
                    if entries.len() < LEAF_CAPACITY || height >= MAX_HEIGHT {
                        entries.push(entry);
                        return;
                    }
                    true
                }
                NodeKind::Internal { .. } => false,
            };

            if split {
                self.split(id);
            }

            let children = match &self.nodes[id.0].kind {
                NodeKind::Internal { children } => *children,
                NodeKind::Leaf { .. } => return,
            };
            let choice = self.choose_child(&children, &entry.aabb);
            let child = &mut self.nodes[children[choice].0];
            child.loose_aabb.grow(&entry.aabb);
            id = children[choice];
            height += 1;
        }
    }

    /// Walks from the root to the leaf the box routes to, growing every
    /// visited non-root loose box along the way.
    fn descend_while_union(&mut self, aabb: &Aabb) -> (NodeId, u32) {
        let mut id = self.root;
        let mut height = 0;
        loop {
            if id != self.root {
                self.nodes[id.0].loose_aabb.grow(aabb);
            }
            let children = match &self.nodes[id.0].kind {
                NodeKind::Leaf { .. } => return (id, height),
                NodeKind::Internal { children } => *children,
            };
            id = children[self.choose_child(&children, aabb)];
            height += 1;
        }
    }

    /// The child octant with the largest intersection volume; ties and
    /// all-disjoint boxes go to the lowest index.
    fn choose_child(&self, children: &[NodeId; 8], aabb: &Aabb) -> usize {
        let mut best = 0;
        let mut best_volume = 0.0f32;
        for (i, child) in children.iter().enumerate() {
            let volume = self.nodes[child.0].aabb.intersection_volume(aabb);
            if volume > best_volume {
                best_volume = volume;
                best = i;
            }
        }
        best
    }

    /// Replaces a full leaf with an internal node over eight fresh leaves and
    /// redistributes its entries among them.
    fn split(&mut self, id: NodeId) {
        let aabb = self.nodes[id.0].aabb;
        let entries = match &mut self.nodes[id.0].kind {
            NodeKind::Leaf { entries } => std::mem::take(entries),
            NodeKind::Internal { .. } => return,
        };

        let mid = aabb.center();
        let mut children = [NodeId(0); 8];
        for (i, child) in children.iter_mut().enumerate() {
            let octant = aabb.octant(&mid, i as u8);
            *child = NodeId(self.nodes.len());
            self.nodes.push(Node {
                aabb: octant,
                loose_aabb: octant,
                kind: NodeKind::Leaf {
                    entries: Vec::new(),
                },
            });
        }

        for entry in entries {
            let choice = self.choose_child(&children, &entry.aabb);
            let child = &mut self.nodes[children[choice].0];
            child.loose_aabb.grow(&entry.aabb);
            match &mut child.kind {
                NodeKind::Leaf { entries } => entries.push(entry),
                NodeKind::Internal { .. } => {}
            }
        }

        self.nodes[id.0].kind = NodeKind::Internal { children };
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            leaf_nodes: 0,
            max_height: 0,
            max_leaf_entries: 0,
            total_entries: 0,
        };
        let mut stack = vec![(self.root, 0u32)];
        while let Some((id, height)) = stack.pop() {
            match &self.node(id).kind {
                NodeKind::Leaf { entries } => {
                    summary.leaf_nodes += 1;
                    summary.max_height = summary.max_height.max(height);
                    summary.max_leaf_entries = summary.max_leaf_entries.max(entries.len());
                    summary.total_entries += entries.len();
                }
                NodeKind::Internal { children } => {
                    stack.extend(children.iter().map(|&c| (c, height + 1)));
                }
            }
        }
        summary
    }
}

impl Default for Octree {
    fn default() -> Octree {
        Octree::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(x: f32, y: f32, z: f32) -> Aabb {
        Aabb::new(Point3::new(x, y, z), Point3::new(x + 1.0, y + 1.0, z + 1.0))
    }

    /// A 9³ grid of unit boxes: enough to force splits past the capacity.
    fn grid() -> (Vec<Aabb>, Vec<u32>) {
        let mut aabbs = Vec::new();
        for x in 0..9 {
            for y in 0..9 {
                for z in 0..9 {
                    aabbs.push(unit_box(x as f32, y as f32, z as f32));
                }
            }
        }
        let ids = (0..aabbs.len() as u32).collect();
        (aabbs, ids)
    }

    fn build(aabbs: &[Aabb], ids: &[u32]) -> Octree {
        let mut root = Aabb::empty();
        for aabb in aabbs {
            root.grow(aabb);
        }
        let mut tree = Octree::new();
        tree.reset(root);
        tree.add(aabbs, ids);
        tree
    }

    #[test]
    fn every_id_lives_in_exactly_one_leaf() {
        let (aabbs, ids) = grid();
        let tree = build(&aabbs, &ids);

        let mut seen = vec![0u32; ids.len()];
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            match &tree.node(id).kind {
                NodeKind::Leaf { entries } => {
                    for entry in entries {
                        seen[entry.id as usize] += 1;
                    }
                }
                NodeKind::Internal { children } => stack.extend(children.iter().copied()),
            }
        }
        assert!(seen.iter().all(|&count| count == 1));

        let summary = tree.summary();
        assert_eq!(summary.total_entries, ids.len());
        assert!(summary.max_height >= 1, "9^3 boxes must split the root");
        assert!(summary.max_height <= MAX_HEIGHT);
    }

    #[test]
    fn root_loose_aabb_is_the_union_of_all_entries() {
        let (aabbs, ids) = grid();
        let tree = build(&aabbs, &ids);

        let mut union = Aabb::empty();
        for aabb in &aabbs {
            union.grow(aabb);
        }
        assert_eq!(tree.node(tree.root()).loose_aabb, union);
    }

    #[test]
    fn loose_aabbs_contain_all_descendants() {
        let (aabbs, ids) = grid();
        let tree = build(&aabbs, &ids);

        // Collect each subtree's entries and check containment at its top.
        fn check(tree: &Octree, id: NodeId) -> Vec<Aabb> {
            let node = tree.node(id);
            let mut boxes = Vec::new();
            match &node.kind {
                NodeKind::Leaf { entries } => {
                    boxes.extend(entries.iter().map(|e| e.aabb));
                }
                NodeKind::Internal { children } => {
                    for &child in children {
                        boxes.extend(check(tree, child));
                    }
                }
            }
            for aabb in &boxes {
                assert!(node.loose_aabb.contains(aabb));
            }
            boxes
        }
        assert_eq!(check(&tree, tree.root()).len(), aabbs.len());
    }

    #[test]
    fn small_sets_stay_in_the_root_leaf() {
        let aabbs = vec![unit_box(0.0, 0.0, 0.0), unit_box(2.0, 0.0, 0.0)];
        let tree = build(&aabbs, &[0, 1]);

        let summary = tree.summary();
        assert_eq!(summary.leaf_nodes, 1);
        assert_eq!(summary.max_height, 0);
        assert_eq!(summary.total_entries, 2);
    }

    #[test]
    fn reset_drops_previous_entries() {
        let (aabbs, ids) = grid();
        let mut tree = build(&aabbs, &ids);

        tree.reset(unit_box(0.0, 0.0, 0.0));
        let summary = tree.summary();
        assert_eq!(summary.leaf_nodes, 1);
        assert_eq!(summary.total_entries, 0);
    }
}
