//! Static B-tree over the data pages of one SSTable.
//!
//! Built during SSTable assembly by inserting each sealed page's
//! `(max key, page offset)` pair. Inserts arrive in strictly ascending
//! key order, so every split happens at the right edge and the finished
//! tree is balanced without any rebalancing machinery. The tree is never
//! mutated after construction; it exists only to be serialised.
//!
//! Serialisation is post-order: all children of a node are written before
//! the node itself, and the node records the exact file offset at which
//! each child block was written. The root therefore lands in the file's
//! last 4096-byte block.

use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;

use crate::format::PAGE_SIZE;
use crate::{Error, Result};

struct Node {
    leaf: bool,
    keys: Vec<i64>,
    /// Leaf only: data-page offset per key.
    page_offsets: Vec<i64>,
    /// Internal only: keys.len() + 1 children.
    children: Vec<Box<Node>>,
}

impl Node {
    fn new(leaf: bool) -> Self {
        Self {
            leaf,
            keys: Vec::new(),
            page_offsets: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// The in-memory tree under construction.
pub(crate) struct BTree {
    degree: usize,
    root: Option<Box<Node>>,
}

impl BTree {
    pub(crate) fn new(degree: usize) -> Self {
        assert!(degree >= 2, "b-tree minimum degree must be at least 2");
        Self { degree, root: None }
    }

    /// Inserts one `(page max key, page offset)` pair. Keys must arrive
    /// strictly ascending.
    pub(crate) fn insert(&mut self, key: i64, page_offset: i64) {
        let t = self.degree;
        match self.root.take() {
            None => {
                let mut leaf = Box::new(Node::new(true));
                leaf.keys.push(key);
                leaf.page_offsets.push(page_offset);
                self.root = Some(leaf);
            }
            Some(mut root) => {
                if root.keys.len() == 2 * t - 1 {
                    let mut new_root = Box::new(Node::new(false));
                    new_root.children.push(root);
                    split_child(&mut new_root, 0, t);
                    root = new_root;
                }
                insert_non_full(&mut root, key, page_offset, t);
                self.root = Some(root);
            }
        }
    }

    /// Writes the tree in post-order starting at file offset
    /// `start_offset`, one 4096-byte block per node. Returns the number of
    /// blocks written; the last block is the root.
    pub(crate) fn write_post_order<W: Write>(&self, w: &mut W, start_offset: u64) -> Result<usize> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| Error::Corrupt("cannot serialise an empty b-tree".into()))?;
        let mut next_offset = start_offset;
        write_node(root, w, &mut next_offset)?;
        Ok(((next_offset - start_offset) / PAGE_SIZE as u64) as usize)
    }
}

/// Classical split of the full child at `parent.children[i]`.
///
/// For an internal child the median key moves up to the parent; for a
/// leaf the median stays in the left half (leaves carry the actual page
/// pointers) and the parent receives a copy.
fn split_child(parent: &mut Node, i: usize, t: usize) {
    let child = &mut parent.children[i];
    let mut right = Box::new(Node::new(child.leaf));

    let median = if child.leaf {
        right.keys = child.keys.split_off(t);
        right.page_offsets = child.page_offsets.split_off(t);
        *child.keys.last().expect("full leaf has t keys after split")
    } else {
        right.keys = child.keys.split_off(t);
        right.children = child.children.split_off(t);
        child.keys.pop().expect("full internal node has t keys after split")
    };

    parent.keys.insert(i, median);
    parent.children.insert(i + 1, right);
}

fn insert_non_full(node: &mut Node, key: i64, page_offset: i64, t: usize) {
    if node.leaf {
        let pos = node.keys.partition_point(|&k| k < key);
        node.keys.insert(pos, key);
        node.page_offsets.insert(pos, page_offset);
        return;
    }

    let mut i = node.keys.partition_point(|&k| k < key);
    if node.children[i].keys.len() == 2 * t - 1 {
        split_child(node, i, t);
        if key > node.keys[i] {
            i += 1;
        }
    }
    insert_non_full(&mut node.children[i], key, page_offset, t);
}

/// Post-order emission. Children are written first so their offsets are
/// known when the parent block is laid out; returns this node's offset.
fn write_node<W: Write>(node: &Node, w: &mut W, next_offset: &mut u64) -> Result<u64> {
    let child_offsets: Vec<i64> = if node.leaf {
        node.page_offsets.clone()
    } else {
        let mut offsets = Vec::with_capacity(node.children.len());
        for child in &node.children {
            offsets.push(write_node(child, w, next_offset)? as i64);
        }
        offsets
    };

    let my_offset = *next_offset;
    let block = serialize_block(&node.keys, &child_offsets);
    w.write_all(block.as_slice())?;
    *next_offset += PAGE_SIZE as u64;
    Ok(my_offset)
}

/// Packs one node into a 4096-byte block:
/// keyCount | childCount | (childOffset, key) pairs | trailing offset.
fn serialize_block(keys: &[i64], offsets: &[i64]) -> Box<[u8; PAGE_SIZE]> {
    debug_assert!(offsets.len() == keys.len() || offsets.len() == keys.len() + 1);
    debug_assert!(8 + offsets.len() * 8 + keys.len() * 8 <= PAGE_SIZE);

    let mut buf = Box::new([0u8; PAGE_SIZE]);
    LittleEndian::write_i32(&mut buf[0..4], keys.len() as i32);
    LittleEndian::write_i32(&mut buf[4..8], offsets.len() as i32);

    let mut pos = 8;
    for (i, &key) in keys.iter().enumerate() {
        LittleEndian::write_i64(&mut buf[pos..pos + 8], offsets[i]);
        LittleEndian::write_i64(&mut buf[pos + 8..pos + 16], key);
        pos += 16;
    }
    if offsets.len() > keys.len() {
        LittleEndian::write_i64(&mut buf[pos..pos + 8], offsets[keys.len()]);
    }
    buf
}

/// Read-side view over a serialised node block.
pub(crate) struct NodeView<'a> {
    buf: &'a [u8],
    key_count: usize,
    child_count: usize,
}

impl<'a> NodeView<'a> {
    pub(crate) fn parse(buf: &'a [u8]) -> Result<Self> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        let key_count = LittleEndian::read_i32(&buf[0..4]);
        let child_count = LittleEndian::read_i32(&buf[4..8]);

        if key_count <= 0 {
            return Err(Error::Corrupt(format!(
                "invalid b-tree node key count {}",
                key_count
            )));
        }
        if child_count <= 0 || !(child_count == key_count || child_count == key_count + 1) {
            return Err(Error::Corrupt(format!(
                "invalid b-tree node child count {} for {} keys",
                child_count, key_count
            )));
        }
        if 8 + child_count as usize * 8 + key_count as usize * 8 > PAGE_SIZE {
            return Err(Error::Corrupt(format!(
                "b-tree node overflows its block ({} keys, {} children)",
                key_count, child_count
            )));
        }

        Ok(Self {
            buf,
            key_count: key_count as usize,
            child_count: child_count as usize,
        })
    }

    pub(crate) fn key_count(&self) -> usize {
        self.key_count
    }

    /// The `(childOffset, key)` pair at position `i`.
    pub(crate) fn entry(&self, i: usize) -> (i64, i64) {
        let pos = 8 + i * 16;
        let offset = LittleEndian::read_i64(&self.buf[pos..pos + 8]);
        let key = LittleEndian::read_i64(&self.buf[pos + 8..pos + 16]);
        (offset, key)
    }

    /// The child offset following all keys, present on internal nodes.
    pub(crate) fn trailing_offset(&self) -> Option<i64> {
        (self.child_count > self.key_count).then(|| {
            let pos = 8 + self.key_count * 16;
            LittleEndian::read_i64(&self.buf[pos..pos + 8])
        })
    }
}
