// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptions on the wire.
//!
//! A transmitted type is preceded by a control byte: `0xff` for no type,
//! `0xfd` for a full description introducing a fresh 16-bit cache tag,
//! `0xfe` for a tag referencing a previously cached description, or any
//! other value starting an embedded untagged description. The
//! per-connection [`TypeStore`] resolves tags on receive and remembers
//! which structural hashes have already been assigned a tag on send.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::builder::{compile, Member};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::typecode::TypeCode;
use crate::typedesc::{Type, TypeTree};
use crate::wire::{DecodeBuf, EncodeBuf};

/// No type follows.
pub(crate) const CTRL_NULL: u8 = 0xff;
/// A full description follows, preceded by a fresh cache tag.
pub(crate) const CTRL_FULL_WITH_TAG: u8 = 0xfd;
/// Only a cache tag follows.
pub(crate) const CTRL_ONLY_TAG: u8 = 0xfe;

/// Per-connection cache mapping 16-bit tags to type descriptions.
///
/// Owned by the transport layer; lives as long as its connection.
pub struct TypeStore {
    by_tag: FxHashMap<u16, Type>,
    by_hash: FxHashMap<u64, u16>,
    next_tag: u16,
    limits: Limits,
}

impl TypeStore {
    pub fn new() -> TypeStore {
        TypeStore::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> TypeStore {
        TypeStore {
            by_tag: FxHashMap::default(),
            by_hash: FxHashMap::default(),
            next_tag: 0,
            limits,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Number of cached descriptions (receive side).
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    fn cache(&mut self, tag: u16, ty: Type) {
        // a reused tag silently replaces the old entry
        self.by_tag.insert(tag, ty);
    }

    fn resolve(&self, tag: u16) -> Result<Type> {
        self.by_tag
            .get(&tag)
            .cloned()
            .ok_or_else(|| Error::bad_wire(format!("unresolved type tag {tag}")))
    }

    fn tag_for(&mut self, hash: u64) -> (u16, bool) {
        if let Some(tag) = self.by_hash.get(&hash) {
            return (*tag, false);
        }
        let tag = self.next_tag;
        self.next_tag = self.next_tag.wrapping_add(1);
        self.by_hash.insert(hash, tag);
        (tag, true)
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        TypeStore::new()
    }
}

/// Serialize one description node, depth first.
pub(crate) fn write_type_desc(buf: &mut EncodeBuf, tree: &TypeTree, index: usize) {
    let node = tree.node(index);
    let code = node.code();
    buf.write_u8(code as u8);
    match code {
        TypeCode::Struct => {
            buf.write_str(node.id());
            buf.write_size(node.children().len());
            for (name, rel) in node.children() {
                buf.write_str(name);
                write_type_desc(buf, tree, index + rel);
            }
        }
        TypeCode::Union => {
            let members = node.members().expect("union carries members");
            buf.write_str(node.id());
            buf.write_size(node.children().len());
            for (name, start) in node.children() {
                buf.write_str(name);
                write_type_desc(buf, members, *start);
            }
        }
        TypeCode::Any => {
            buf.write_str(node.id());
        }
        TypeCode::StructA | TypeCode::UnionA => {
            let members = node.members().expect("array carries element type");
            write_type_desc(buf, members, 0);
        }
        _ => {}
    }
}

/// Serialize a type with cache negotiation: the first transmission on a
/// connection emits the full description under a fresh tag, subsequent
/// transmissions emit only the tag.
pub fn to_wire_type(buf: &mut EncodeBuf, ty: &Type, store: &mut TypeStore) {
    let (tag, fresh) = store.tag_for(ty.hash());
    if fresh {
        debug!(tag, hash = ty.hash(), "introducing type on connection");
        buf.write_u8(CTRL_FULL_WITH_TAG);
        buf.write_u16(tag);
        write_type_desc(buf, &ty.tree, ty.root);
    } else {
        trace!(tag, "reusing cached type tag");
        buf.write_u8(CTRL_ONLY_TAG);
        buf.write_u16(tag);
    }
}

/// Parse one embedded description node into builder form.
fn read_member(buf: &mut DecodeBuf<'_>, limits: &Limits, depth: usize) -> Result<Member> {
    if depth > limits.max_type_depth {
        return Err(Error::bad_wire(format!(
            "type nesting exceeds {} levels",
            limits.max_type_depth
        )));
    }
    let raw = buf.read_u8()?;
    let code = TypeCode::from_u8(raw)
        .ok_or_else(|| Error::bad_wire(format!("unknown type code {raw:#04x}")))?;

    let mut member = Member::new(code, "");
    match code {
        TypeCode::Struct | TypeCode::Union => {
            member.id = buf.read_str(limits.max_string_bytes)?;
            let count = buf.read_size()?;
            // every member needs at least a name byte and a code byte
            if count > buf.remaining() {
                return Err(Error::bad_wire(format!(
                    "member count {count} runs past the end of the buffer"
                )));
            }
            for _ in 0..count {
                let name = buf.read_str(limits.max_string_bytes)?;
                let mut child = read_member(buf, limits, depth + 1)?;
                child.name = name;
                member.children.push(child);
            }
        }
        TypeCode::Any => {
            member.id = buf.read_str(limits.max_string_bytes)?;
        }
        TypeCode::StructA | TypeCode::UnionA => {
            let element = read_member(buf, limits, depth + 1)?;
            let want = if code == TypeCode::StructA {
                TypeCode::Struct
            } else {
                TypeCode::Union
            };
            if element.code != want {
                return Err(Error::bad_wire(format!(
                    "array of {want} carries a {} element",
                    element.code
                )));
            }
            member.id = element.id;
            member.children = element.children;
        }
        _ => {}
    }
    Ok(member)
}

/// Parse an embedded description starting at the current position and
/// finalize it.
pub(crate) fn read_type_desc(buf: &mut DecodeBuf<'_>, limits: &Limits) -> Result<Type> {
    let root = read_member(buf, limits, 0)?;
    compile(root.code, &root.id, &root.children)
        .map_err(|e| Error::bad_wire(format!("unusable wire type: {e}")))
}

/// Decode an embedded description, or `None` for the Null control byte.
/// Used where a type appears without cache negotiation (Any fields).
pub(crate) fn read_type_optional(buf: &mut DecodeBuf<'_>, limits: &Limits) -> Result<Option<Type>> {
    if buf.peek_u8()? == CTRL_NULL {
        buf.read_u8()?;
        return Ok(None);
    }
    Ok(Some(read_type_desc(buf, limits)?))
}

/// Decode a control-byte-prefixed type, consulting and updating the cache.
/// Returns `None` for the Null control byte.
pub(crate) fn read_type(buf: &mut DecodeBuf<'_>, store: &mut TypeStore) -> Result<Option<Type>> {
    let limits = store.limits();
    match buf.peek_u8()? {
        CTRL_NULL => {
            buf.read_u8()?;
            Ok(None)
        }
        CTRL_ONLY_TAG => {
            buf.read_u8()?;
            let tag = buf.read_u16()?;
            trace!(tag, "resolving cached type tag");
            Ok(Some(store.resolve(tag)?))
        }
        CTRL_FULL_WITH_TAG => {
            buf.read_u8()?;
            let tag = buf.read_u16()?;
            let ty = read_type_desc(buf, &limits)?;
            debug!(tag, hash = ty.hash(), "caching type from wire");
            store.cache(tag, ty.clone());
            Ok(Some(ty))
        }
        _ => Ok(Some(read_type_desc(buf, &limits)?)),
    }
}
