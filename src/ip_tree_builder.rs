//! Search Tree Construction
//!
//! Builds the binary search tree over IPv4 prefixes and serializes it as
//! fixed-width node records following the MMDB specification.
//!
//! Nodes live in a single arena and are emitted in arena order, so the tree
//! bytes are a pure function of the inserted prefix set. Each child slot is
//! either another node, a data-section offset, or empty; empty slots
//! serialize as the record value `node_count`, the marker conformant readers
//! treat as "not found". Data slots serialize as
//! `data_offset + node_count + 16`, the 16 covering the marker between tree
//! and data section.

use crate::error::{BuildError, Result};
use crate::types::RecordSize;

/// Arena-based search tree builder
pub struct IpTreeBuilder {
    record_size: RecordSize,
    nodes: Vec<Node>,
}

/// A node in the tree
#[derive(Debug, Clone)]
struct Node {
    /// Left child (bit 0)
    left: NodePointer,
    /// Right child (bit 1)
    right: NodePointer,
}

/// Child slot of a node
///
/// `Data` tracks the prefix length that produced it so overlapping inserts
/// resolve by longest prefix. The length never reaches the serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodePointer {
    /// Another node, by arena index
    Node(u32),
    /// Data-section offset plus originating prefix length
    Data(u32, u8),
    /// No data below this edge
    Empty,
}

impl IpTreeBuilder {
    /// Create a builder with an empty root node
    pub fn new(record_size: RecordSize) -> Self {
        Self {
            record_size,
            nodes: vec![Node::new_empty()],
        }
    }

    /// Number of nodes currently in the arena
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Insert a CIDR with its data-section offset
    ///
    /// Descends `prefix_len` bits of `network` MSB-first, allocating nodes
    /// along the path. Equal prefixes: the later insert wins. A prefix
    /// through an existing data edge splits it; a prefix over an existing
    /// subtree backfills only the slots it is more specific than.
    pub fn insert(&mut self, network: u32, prefix_len: u8, data_offset: u32) -> Result<()> {
        if prefix_len > 32 {
            return Err(BuildError::Input(format!(
                "prefix length {} exceeds 32",
                prefix_len
            )));
        }

        if prefix_len == 0 {
            // A default route attaches at the root: fill every open slot
            // under it. On an otherwise empty tree this yields the
            // degenerate single-node tree with both records pointing at
            // the payload.
            self.backfill_less_specific(0, data_offset, 0);
            return Ok(());
        }

        let mut node_id = 0u32;

        for depth in 0..prefix_len {
            let bit = ((network >> (31 - depth)) & 1) as u8;

            let child = {
                let node = &self.nodes[node_id as usize];
                if bit == 0 {
                    node.left
                } else {
                    node.right
                }
            };

            if depth + 1 == prefix_len {
                match child {
                    NodePointer::Empty => {
                        self.set_child(node_id, bit, NodePointer::Data(data_offset, prefix_len));
                    }
                    NodePointer::Data(_, existing_len) => {
                        if prefix_len >= existing_len {
                            self.set_child(
                                node_id,
                                bit,
                                NodePointer::Data(data_offset, prefix_len),
                            );
                        }
                    }
                    NodePointer::Node(child_id) => {
                        // More specific prefixes already live below; fill
                        // the gaps they left.
                        self.backfill_less_specific(child_id, data_offset, prefix_len);
                    }
                }
                return Ok(());
            }

            match child {
                NodePointer::Empty => {
                    let new_id = self.allocate_node();
                    self.set_child(node_id, bit, NodePointer::Node(new_id));
                    node_id = new_id;
                }
                NodePointer::Node(child_id) => {
                    node_id = child_id;
                }
                NodePointer::Data(existing_offset, existing_len) => {
                    // A less specific prefix covers this path. Split the
                    // data edge into a node that preserves it on both
                    // sides, then keep descending.
                    let new_id = self.allocate_node();
                    self.nodes[new_id as usize].left =
                        NodePointer::Data(existing_offset, existing_len);
                    self.nodes[new_id as usize].right =
                        NodePointer::Data(existing_offset, existing_len);
                    self.set_child(node_id, bit, NodePointer::Node(new_id));
                    node_id = new_id;
                }
            }
        }

        Ok(())
    }

    fn set_child(&mut self, node_id: u32, bit: u8, pointer: NodePointer) {
        let node = &mut self.nodes[node_id as usize];
        if bit == 0 {
            node.left = pointer;
        } else {
            node.right = pointer;
        }
    }

    fn allocate_node(&mut self) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Node::new_empty());
        id
    }

    /// Fill a subtree's open slots with a less specific prefix's data
    ///
    /// Empty slots take the new data; existing data survives unless the
    /// new prefix is longer; nodes recurse.
    fn backfill_less_specific(&mut self, node_id: u32, data_offset: u32, prefix_len: u8) {
        let (left, right) = {
            let node = &self.nodes[node_id as usize];
            (node.left, node.right)
        };

        for (bit, child) in [(0u8, left), (1u8, right)] {
            match child {
                NodePointer::Empty => {
                    self.set_child(node_id, bit, NodePointer::Data(data_offset, prefix_len));
                }
                NodePointer::Data(_, existing_len) => {
                    if prefix_len > existing_len {
                        self.set_child(node_id, bit, NodePointer::Data(data_offset, prefix_len));
                    }
                }
                NodePointer::Node(child_id) => {
                    self.backfill_less_specific(child_id, data_offset, prefix_len);
                }
            }
        }
    }

    /// Serialize the tree in arena order
    ///
    /// Returns the node records and the node count.
    pub fn build(&self) -> Result<(Vec<u8>, u32)> {
        let node_count = self.nodes.len() as u32;
        let node_size = self.record_size.node_bytes();
        let mut tree = Vec::with_capacity(node_count as usize * node_size);

        for node in &self.nodes {
            let left = self.record_value(node.left, node_count)?;
            let right = self.record_value(node.right, node_count)?;
            match self.record_size {
                RecordSize::Bits24 => write_24bit_node(&mut tree, left, right),
                RecordSize::Bits28 => write_28bit_node(&mut tree, left, right),
            }
        }

        Ok((tree, node_count))
    }

    /// Convert a child slot to its serialized record value
    fn record_value(&self, pointer: NodePointer, node_count: u32) -> Result<u32> {
        let value = match pointer {
            NodePointer::Empty => node_count,
            NodePointer::Node(id) => id,
            NodePointer::Data(offset, _) => node_count
                .checked_add(16)
                .and_then(|base| base.checked_add(offset))
                .ok_or_else(|| {
                    BuildError::Encoding(format!(
                        "data pointer {} + node count {} exceeds u32",
                        offset, node_count
                    ))
                })?,
        };

        if value as u64 > self.record_size.max_record_value() {
            return Err(BuildError::Encoding(format!(
                "record value {} exceeds {}-bit records",
                value,
                self.record_size.bits()
            )));
        }
        Ok(value)
    }
}

impl Node {
    fn new_empty() -> Self {
        Self {
            left: NodePointer::Empty,
            right: NodePointer::Empty,
        }
    }
}

/// 24-bit records: two big-endian 3-byte values, 6 bytes per node
fn write_24bit_node(tree: &mut Vec<u8>, left: u32, right: u32) {
    tree.extend_from_slice(&left.to_be_bytes()[1..]);
    tree.extend_from_slice(&right.to_be_bytes()[1..]);
}

/// 28-bit records: 7 bytes per node
///
/// Bytes 0-2 hold the left record's low 24 bits and bytes 4-6 the right's;
/// byte 3 packs the two high nibbles, left in the upper half.
fn write_28bit_node(tree: &mut Vec<u8>, left: u32, right: u32) {
    tree.extend_from_slice(&left.to_be_bytes()[1..]);
    tree.push((((left >> 24) & 0x0F) as u8) << 4 | ((right >> 24) & 0x0F) as u8);
    tree.extend_from_slice(&right.to_be_bytes()[1..]);
}
