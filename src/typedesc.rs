// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Finalized type descriptions.
//!
//! A [`TypeTree`] is a flattened depth-first array of [`TypeDesc`] nodes
//! describing one value. Offsets to descendant fields are positive integers
//! relative to the current node; it is not possible to jump back. Two kinds
//! of relative index appear:
//!
//! 1. Indices into the same flattened array, found in `mlookup` and `miter`
//!    of Struct nodes.
//! 2. Indices into a node's out-of-line `members` tree, used by Union
//!    choices and by the StructA/UnionA element type.
//!
//! Storage cells (see [`crate::storage`]) parallel the flattened array one
//! to one, so the same relative indices address both trees.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::typecode::TypeCode;
use crate::value::MutValue;

/// Describes a single field, leaf or otherwise, in a nested structure.
#[derive(Debug, Clone)]
pub struct TypeDesc {
    pub(crate) code: TypeCode,

    /// Type ID string (Struct/Union/Any only).
    pub(crate) id: String,

    /// Structural fingerprint aggregating `code`, `id`, and each child's
    /// `(name, hash)`.
    pub(crate) hash: u64,

    /// Node distance back to the enclosing Struct, 0 at a tree root.
    pub(crate) parent_index: usize,

    /// All reachable descendants of a Struct (`"fld.sub.leaf"` -> relative
    /// index in the same array), or the immediate choices of a Union
    /// (name -> index in `members`).
    pub(crate) mlookup: FxHashMap<String, usize>,

    /// Immediate child iteration: `(name, relative index)` in order.
    pub(crate) miter: Vec<(String, usize)>,

    /// Out-of-line subtree(s): the concatenated choices of a Union, or the
    /// single element type of a StructA/UnionA.
    pub(crate) members: Option<Arc<TypeTree>>,
}

impl TypeDesc {
    /// Number of nodes describing this node, inclusive. Always >= 1.
    pub fn size(&self) -> usize {
        1 + if self.members.is_some() {
            0
        } else {
            self.mlookup.len()
        }
    }

    pub fn code(&self) -> TypeCode {
        self.code
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Immediate children as `(name, relative index)` pairs.
    pub fn children(&self) -> &[(String, usize)] {
        &self.miter
    }

    pub(crate) fn members(&self) -> Option<&Arc<TypeTree>> {
        self.members.as_ref()
    }
}

/// A finalized, immutable, flattened type description array.
#[derive(Debug)]
pub struct TypeTree {
    pub(crate) nodes: Vec<TypeDesc>,
}

impl TypeTree {
    pub(crate) fn node(&self, index: usize) -> &TypeDesc {
        &self.nodes[index]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Shared handle to one node of a finalized type description.
///
/// Cheap to clone; the underlying tree is immutable and may be read from
/// any number of threads. Equality is structural (fingerprint-based), so
/// types built independently but identically compare equal.
#[derive(Debug, Clone)]
pub struct Type {
    pub(crate) tree: Arc<TypeTree>,
    pub(crate) root: usize,
}

impl Type {
    pub(crate) fn new(tree: Arc<TypeTree>, root: usize) -> Type {
        Type { tree, root }
    }

    fn node(&self) -> &TypeDesc {
        self.tree.node(self.root)
    }

    pub fn code(&self) -> TypeCode {
        self.node().code
    }

    pub fn id(&self) -> &str {
        &self.node().id
    }

    /// Structural fingerprint of this type.
    pub fn hash(&self) -> u64 {
        self.node().hash
    }

    /// Total description nodes in this subtree.
    pub fn size(&self) -> usize {
        self.node().size()
    }

    /// Allocate fresh storage conforming to this type and return a mutable
    /// value rooted at it.
    pub fn create(&self) -> MutValue {
        MutValue::build(self)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Type {}
