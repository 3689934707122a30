//! Huffman tree construction over an index-based node arena.
//!
//! The tree lives only for the duration of one encode or decode call. Nodes
//! refer to their children by index into the arena.

use super::FrequencyTable;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Index of a node in the arena.
pub type NodeId = usize;

/// One tree node. Leaves carry a symbol, internal nodes carry two children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub frequency: u64,
    pub symbol: Option<u8>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl Node {
    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Per-symbol bit codes, indexed by byte value. Absent symbols have no bits.
pub type CodeTable = Vec<Vec<bool>>;

/// A Huffman tree built deterministically from a frequency table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Build the tree, or `None` if every frequency is zero.
    ///
    /// Nodes leave the min-heap by ascending frequency, then ascending symbol
    /// (internal nodes rank as symbol -1, before every leaf), then creation
    /// order. The same table therefore always yields the same shape.
    pub fn build(frequencies: &FrequencyTable) -> Option<Self> {
        let mut nodes = Vec::with_capacity(2 * frequencies.len());
        let mut heap = BinaryHeap::new();

        for (symbol, &frequency) in frequencies.iter().enumerate() {
            if frequency == 0 {
                continue;
            }
            let id = nodes.len();
            nodes.push(Node {
                frequency: u64::from(frequency),
                symbol: Some(symbol as u8),
                left: None,
                right: None,
            });
            heap.push(Reverse((u64::from(frequency), symbol as i32, id)));
        }

        while heap.len() > 1 {
            let Reverse((left_freq, _, left)) = heap.pop()?;
            let Reverse((right_freq, _, right)) = heap.pop()?;

            let id = nodes.len();
            let frequency = left_freq + right_freq;
            nodes.push(Node {
                frequency,
                symbol: None,
                left: Some(left),
                right: Some(right),
            });
            heap.push(Reverse((frequency, -1, id)));
        }

        let Reverse((_, _, root)) = heap.pop()?;
        Some(Self { nodes, root })
    }

    /// The root node's id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is a single leaf (one distinct symbol).
    pub fn is_single_leaf(&self) -> bool {
        self.node(self.root).is_leaf()
    }

    /// Derive bit codes: `false` for a left branch, `true` for a right one.
    ///
    /// A single-leaf tree has no branches; its symbol gets the code `0`.
    pub fn code_table(&self) -> CodeTable {
        let mut table = vec![Vec::new(); 256];
        let mut stack = vec![(self.root, Vec::new())];

        while let Some((id, prefix)) = stack.pop() {
            let node = self.node(id);
            if let Some(symbol) = node.symbol {
                table[usize::from(symbol)] = if prefix.is_empty() {
                    vec![false]
                } else {
                    prefix
                };
                continue;
            }

            if let Some(right) = node.right {
                let mut bits = prefix.clone();
                bits.push(true);
                stack.push((right, bits));
            }
            if let Some(left) = node.left {
                let mut bits = prefix;
                bits.push(false);
                stack.push((left, bits));
            }
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_from(pairs: &[(u8, u32)]) -> FrequencyTable {
        let mut table = [0u32; 256];
        for &(symbol, frequency) in pairs {
            table[usize::from(symbol)] = frequency;
        }
        table
    }

    fn is_prefix_free(codes: &CodeTable) -> bool {
        let present: Vec<&Vec<bool>> = codes.iter().filter(|c| !c.is_empty()).collect();
        for (i, a) in present.iter().enumerate() {
            for (j, b) in present.iter().enumerate() {
                if i != j && b.starts_with(a) {
                    return false;
                }
            }
        }
        true
    }

    #[test]
    fn test_empty_table() {
        assert!(Tree::build(&[0u32; 256]).is_none());
    }

    #[test]
    fn test_single_symbol() {
        let tree = Tree::build(&table_from(&[(b'A', 4)])).unwrap();
        assert!(tree.is_single_leaf());
        assert_eq!(tree.node_count(), 1);

        let codes = tree.code_table();
        assert_eq!(codes[usize::from(b'A')], vec![false]);
        assert_eq!(codes.iter().filter(|c| !c.is_empty()).count(), 1);
    }

    #[test]
    fn test_two_symbols() {
        let tree = Tree::build(&table_from(&[(b'a', 3), (b'b', 1)])).unwrap();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.node(tree.root()).frequency, 4);

        // Lower frequency leaves the heap first and becomes the left child
        let codes = tree.code_table();
        assert_eq!(codes[usize::from(b'b')], vec![false]);
        assert_eq!(codes[usize::from(b'a')], vec![true]);
    }

    #[test]
    fn test_ties_broken_by_symbol() {
        let tree = Tree::build(&table_from(&[(b'z', 1), (b'a', 1)])).unwrap();
        let codes = tree.code_table();
        assert_eq!(codes[usize::from(b'a')], vec![false]);
        assert_eq!(codes[usize::from(b'z')], vec![true]);
    }

    #[test]
    fn test_known_shape() {
        // a:5 b:2 c:1 d:1
        //   c+d -> n(2); b(2) vs n(2): internal ranks first -> n left, b right
        //   n+b -> m(4); m(4) vs a(5): m left, a right
        let tree = Tree::build(&table_from(&[(b'a', 5), (b'b', 2), (b'c', 1), (b'd', 1)]))
            .unwrap();
        let codes = tree.code_table();
        assert_eq!(codes[usize::from(b'a')], vec![true]);
        assert_eq!(codes[usize::from(b'b')], vec![false, true]);
        assert_eq!(codes[usize::from(b'c')], vec![false, false, false]);
        assert_eq!(codes[usize::from(b'd')], vec![false, false, true]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut table = [0u32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = (i as u32 % 7) * 3 + (i as u32 % 2);
        }

        let first = Tree::build(&table).unwrap();
        let second = Tree::build(&table).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.code_table(), second.code_table());
    }

    #[test]
    fn test_codes_are_prefix_free() {
        let mut table = [0u32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = (i as u32 * 37) % 101;
        }
        let codes = Tree::build(&table).unwrap().code_table();
        assert!(is_prefix_free(&codes));

        for (symbol, &frequency) in table.iter().enumerate() {
            assert_eq!(codes[symbol].is_empty(), frequency == 0);
        }
    }
}
