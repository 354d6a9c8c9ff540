// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Rope-backed immutable byte strings.
//!
//! A rope is a leaf over a shared chunk (with offset and weight) or an
//! internal node concatenating two subropes. Chunks own the actual byte
//! buffers and are shared between leaves; `Rc` carries the reference
//! counts that govern chunk and node lifetime independently of the GC.
//!
//! Concatenation is O(1) and sharing, slicing shares chunks where it
//! can, and `flatten` collapses a composite rope into a single leaf over
//! a fresh chunk so that repeated whole-string reads are O(1).

#[cfg(test)]
mod rope_test;

use std::rc::Rc;

/// A byte buffer shared by rope leaves.
#[derive(Debug)]
pub struct Chunk {
    buf: Box<[u8]>,
}

impl Chunk {
    /// Create a chunk owning a copy of `bytes`.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self { buf: bytes.into() }
    }

    /// The chunk's bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Length of the chunk in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the chunk is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[derive(Debug)]
enum RopeNode {
    /// A window into a shared chunk.
    Leaf {
        chunk: Rc<Chunk>,
        offset: usize,
        weight: usize,
    },
    /// Concatenation of two subropes; weight is the sum of both sides.
    Node {
        left: Rope,
        right: Rope,
        weight: usize,
    },
}

/// An immutable byte sequence represented as a shared DAG of chunks and
/// concat/slice nodes. Cloning is O(1).
#[derive(Clone, Debug)]
pub struct Rope(Rc<RopeNode>);

impl Rope {
    /// Create a rope over a fresh chunk holding a copy of `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let chunk = Rc::new(Chunk::new(bytes));
        let weight = chunk.len();
        Self(Rc::new(RopeNode::Leaf {
            chunk,
            offset: 0,
            weight,
        }))
    }

    fn leaf(chunk: Rc<Chunk>, offset: usize, weight: usize) -> Self {
        Self(Rc::new(RopeNode::Leaf {
            chunk,
            offset,
            weight,
        }))
    }

    /// Number of visible bytes.
    #[inline]
    #[must_use]
    pub fn weight(&self) -> usize {
        match &*self.0 {
            RopeNode::Leaf { weight, .. } | RopeNode::Node { weight, .. } => *weight,
        }
    }

    /// Concatenate two ropes without copying.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        if self.weight() == 0 {
            return other.clone();
        }
        if other.weight() == 0 {
            return self.clone();
        }
        let weight = self.weight() + other.weight();
        Self(Rc::new(RopeNode::Node {
            left: self.clone(),
            right: other.clone(),
            weight,
        }))
    }

    /// The subrope covering the byte range `[i, j)`.
    ///
    /// The full range returns the rope itself (shared). Slicing a leaf
    /// shares its chunk with an adjusted window; slicing across an
    /// internal node recurses into the side(s) containing the range.
    ///
    /// # Panics
    ///
    /// Panics if `i > j` or `j > weight`. Callers validate user-supplied
    /// ranges before slicing.
    #[must_use]
    pub fn slice(&self, i: usize, j: usize) -> Self {
        assert!(i <= j && j <= self.weight(), "rope slice out of range");

        if i == 0 && j == self.weight() {
            return self.clone();
        }

        match &*self.0 {
            RopeNode::Leaf { chunk, offset, .. } => {
                Self::leaf(Rc::clone(chunk), offset + i, j - i)
            }
            RopeNode::Node { left, right, .. } => {
                let lw = left.weight();
                if j <= lw {
                    left.slice(i, j)
                } else if lw <= i {
                    right.slice(i - lw, j - lw)
                } else {
                    left.slice(i, lw).concat(&right.slice(0, j - lw))
                }
            }
        }
    }

    /// The byte at index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= weight`. Callers validate user-supplied indices.
    #[must_use]
    pub fn at(&self, i: usize) -> u8 {
        assert!(i < self.weight(), "rope index out of range");

        let mut rope = self;
        let mut i = i;
        loop {
            match &*rope.0 {
                RopeNode::Leaf { chunk, offset, .. } => return chunk.bytes()[offset + i],
                RopeNode::Node { left, right, .. } => {
                    let lw = left.weight();
                    if i < lw {
                        rope = left;
                    } else {
                        i -= lw;
                        rope = right;
                    }
                }
            }
        }
    }

    /// Collect the visible bytes without restructuring the rope.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.weight());
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<u8>) {
        match &*self.0 {
            RopeNode::Leaf {
                chunk,
                offset,
                weight,
            } => out.extend_from_slice(&chunk.bytes()[*offset..offset + weight]),
            RopeNode::Node { left, right, .. } => {
                left.collect_into(out);
                right.collect_into(out);
            }
        }
    }

    /// Whether this rope is a single leaf covering its whole chunk, so
    /// the chunk buffer can be handed out without copying.
    #[must_use]
    pub fn full_chunk(&self) -> Option<&Rc<Chunk>> {
        match &*self.0 {
            RopeNode::Leaf {
                chunk,
                offset: 0,
                weight,
            } if *weight == chunk.len() => Some(chunk),
            _ => None,
        }
    }

    /// Collapse into a single leaf over a fresh chunk.
    ///
    /// Returns the rope itself when it already covers a whole chunk.
    /// Callers that cache the result (the string object does) make every
    /// subsequent whole-string read O(1).
    #[must_use]
    pub fn flatten(&self) -> Self {
        if self.full_chunk().is_some() {
            return self.clone();
        }
        Self::from_bytes(&self.to_bytes())
    }
}
