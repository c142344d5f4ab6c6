//! Merkle layer trees
//!
//! Each layer tree authenticates 2^h one-time public keys under a single
//! root. `LayerTree` keeps every node (fast auth paths, O(2^h) memory);
//! `treehash` streams the leaves and keeps only O(h) nodes.

use crate::hash::{hash_parts, Node, D_LEAF, D_NODE, N};
use crate::wots::OtsAddress;

/// Identifies one tree inside the hypertree
#[derive(Debug, Clone, Copy)]
pub struct TreeContext<'a> {
    pub key_id: &'a [u8; 16],
    pub layer: u32,
    pub tree: u64,
}

impl TreeContext<'_> {
    pub fn ots_address(&self, leaf: u32) -> OtsAddress {
        OtsAddress { layer: self.layer, tree: self.tree, leaf }
    }

    /// Leaf node committing to a one-time public key
    pub fn leaf(&self, leaf: u32, ots_public: &Node) -> Node {
        let addr = self.ots_address(leaf).to_bytes();
        hash_parts(&[&[D_LEAF], self.key_id, &addr, ots_public])
    }

    /// Interior node at `level` (leaves are level 0)
    pub fn parent(&self, level: u32, index: u64, left: &Node, right: &Node) -> Node {
        hash_parts(&[
            &[D_NODE],
            self.key_id,
            &self.layer.to_be_bytes(),
            &self.tree.to_be_bytes(),
            &level.to_be_bytes(),
            &index.to_be_bytes(),
            left,
            right,
        ])
    }

    /// Walk an authentication path from a leaf to the root
    pub fn root_from_path(&self, leaf: u32, leaf_node: Node, auth_path: &[Node]) -> Node {
        let mut node = leaf_node;
        for (level, sibling) in auth_path.iter().enumerate() {
            let index = (leaf as u64) >> level;
            let parent_level = level as u32 + 1;
            node = if index % 2 == 0 {
                self.parent(parent_level, index >> 1, &node, sibling)
            } else {
                self.parent(parent_level, index >> 1, sibling, &node)
            };
        }
        node
    }
}

/// A fully materialized layer tree
#[derive(Debug, Clone)]
pub struct LayerTree {
    levels: Vec<Vec<Node>>,
}

impl LayerTree {
    pub fn build(ctx: &TreeContext<'_>, height: u32, leaf_fn: impl Fn(u32) -> Node) -> Self {
        let leaves: Vec<Node> = (0..1u32 << height).map(&leaf_fn).collect();
        let mut levels = Vec::with_capacity(height as usize + 1);
        levels.push(leaves);

        for level in 1..=height {
            let below = &levels[level as usize - 1];
            let row: Vec<Node> = below
                .chunks_exact(2)
                .enumerate()
                .map(|(i, pair)| ctx.parent(level, i as u64, &pair[0], &pair[1]))
                .collect();
            levels.push(row);
        }

        Self { levels }
    }

    pub fn height(&self) -> u32 {
        self.levels.len() as u32 - 1
    }

    pub fn root(&self) -> Node {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn auth_path(&self, leaf: u32) -> Vec<Node> {
        (0..self.height() as usize)
            .map(|level| self.levels[level][((leaf as usize) >> level) ^ 1])
            .collect()
    }
}

/// Streaming root and auth path computation in O(height) memory
pub fn treehash(ctx: &TreeContext<'_>, height: u32, target: u32, leaf_fn: impl Fn(u32) -> Node) -> (Node, Vec<Node>) {
    let mut auth = vec![[0u8; N]; height as usize];
    let mut stack: Vec<(u32, u64, Node)> = Vec::with_capacity(height as usize + 1);

    for leaf in 0..1u32 << height {
        let (mut level, mut index, mut value) = (0u32, leaf as u64, leaf_fn(leaf));
        loop {
            if level < height && index == ((target as u64) >> level) ^ 1 {
                auth[level as usize] = value;
            }
            match stack.last() {
                Some(&(top_level, _, _)) if top_level == level => {
                    let (_, _, left) = stack.pop().unwrap_or((0, 0, [0u8; N]));
                    value = ctx.parent(level + 1, index >> 1, &left, &value);
                    index >>= 1;
                    level += 1;
                }
                _ => {
                    stack.push((level, index, value));
                    break;
                }
            }
        }
    }

    let root = stack.pop().map(|(_, _, node)| node).unwrap_or([0u8; N]);
    (root, auth)
}
