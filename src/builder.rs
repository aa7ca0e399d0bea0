// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent construction of type descriptions.
//!
//! [`Member`]s compose into a [`TypeDef`], which finalizes into an
//! immutable [`Type`] in a single walk: relative indices are assigned in
//! insertion order, `miter` and the transitively-dotted `mlookup` are
//! filled, `parent_index` is set so subtraction yields the enclosing
//! Struct, and structural hashes are computed bottom-up.
//!
//! ```rust
//! use rpva_data::{members as m, TypeCode, TypeDef};
//!
//! let def = TypeDef::compound(TypeCode::Struct, "point_t", vec![
//!     m::float64("x"),
//!     m::float64("y"),
//! ]);
//! let ty = def.build()?;
//! assert_eq!(ty.size(), 3);
//! # Ok::<(), rpva_data::Error>(())
//! ```

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHasher};

use crate::error::{Error, Result};
use crate::typecode::TypeCode;
use crate::typedesc::{Type, TypeDesc, TypeTree};
use crate::value::MutValue;

/// Definition of one member of a Struct or Union.
#[derive(Debug, Clone)]
pub struct Member {
    pub code: TypeCode,
    pub name: String,
    pub id: String,
    pub children: Vec<Member>,
}

impl Member {
    /// Member without type ID or children.
    pub fn new(code: TypeCode, name: impl Into<String>) -> Member {
        Member {
            code,
            name: name.into(),
            id: String::new(),
            children: Vec::new(),
        }
    }

    /// Set the type ID (Struct/Union/Any and their array forms).
    pub fn with_id(mut self, id: impl Into<String>) -> Member {
        self.id = id.into();
        self
    }

    /// Set the child members (compound codes only).
    pub fn with_children(mut self, children: Vec<Member>) -> Member {
        self.children = children;
        self
    }

    /// Append one child member.
    pub fn add_child(&mut self, member: Member) {
        self.children.push(member);
    }
}

/// Shorthand constructors, one per [`TypeCode`].
///
/// `m::int32("blah")` is equivalent to `Member::new(TypeCode::Int32, "blah")`.
pub mod members {
    use super::Member;
    use crate::typecode::TypeCode;

    macro_rules! leaf_members {
        ($($fn_name:ident => $code:ident),+ $(,)?) => {
            $(
                pub fn $fn_name(name: impl Into<String>) -> Member {
                    Member::new(TypeCode::$code, name)
                }
            )+
        };
    }

    leaf_members! {
        boolean => Bool,
        int8 => Int8,
        int16 => Int16,
        int32 => Int32,
        int64 => Int64,
        uint8 => UInt8,
        uint16 => UInt16,
        uint32 => UInt32,
        uint64 => UInt64,
        float32 => Float32,
        float64 => Float64,
        string => String,
        any => Any,
        boolean_a => BoolA,
        int8_a => Int8A,
        int16_a => Int16A,
        int32_a => Int32A,
        int64_a => Int64A,
        uint8_a => UInt8A,
        uint16_a => UInt16A,
        uint32_a => UInt32A,
        uint64_a => UInt64A,
        float32_a => Float32A,
        float64_a => Float64A,
        string_a => StringA,
        any_a => AnyA,
    }

    macro_rules! compound_members {
        ($($fn_name:ident => $code:ident),+ $(,)?) => {
            $(
                pub fn $fn_name(
                    name: impl Into<String>,
                    id: impl Into<String>,
                    children: Vec<Member>,
                ) -> Member {
                    Member::new(TypeCode::$code, name)
                        .with_id(id)
                        .with_children(children)
                }
            )+
        };
    }

    compound_members! {
        struct_ => Struct,
        union_ => Union,
        struct_a => StructA,
        union_a => UnionA,
    }
}

/// Define a new type, from scratch or by appending to an existing
/// definition.
#[derive(Debug, Clone)]
pub struct TypeDef {
    code: TypeCode,
    id: String,
    children: Vec<Member>,
}

impl TypeDef {
    /// Definition of a single non-compound field.
    pub fn new(code: TypeCode) -> TypeDef {
        TypeDef {
            code,
            id: String::new(),
            children: Vec::new(),
        }
    }

    /// Definition with id and children; `code` must be a compound form.
    pub fn compound(code: TypeCode, id: impl Into<String>, children: Vec<Member>) -> TypeDef {
        TypeDef {
            code,
            id: id.into(),
            children,
        }
    }

    /// Append additional children. Only meaningful for Struct/Union.
    pub fn extend(&mut self, children: impl IntoIterator<Item = Member>) -> &mut TypeDef {
        self.children.extend(children);
        self
    }

    pub fn push(&mut self, member: Member) -> &mut TypeDef {
        self.children.push(member);
        self
    }

    /// Finalize into an immutable [`Type`].
    pub fn build(&self) -> Result<Type> {
        compile(self.code, &self.id, &self.children)
    }

    /// Finalize and instantiate in one step.
    pub fn create(&self) -> Result<MutValue> {
        Ok(self.build()?.create())
    }
}

/// Finalize a definition into a flattened [`TypeTree`] rooted at node 0.
pub(crate) fn compile(code: TypeCode, id: &str, children: &[Member]) -> Result<Type> {
    let mut nodes = Vec::new();
    append_node(&mut nodes, code, id, children)?;
    Ok(Type::new(Arc::new(TypeTree { nodes }), 0))
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidType(msg.into())
}

fn check_member_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(invalid(format!("bad member name {name:?}")));
    }
    Ok(())
}

fn mix_hash<'a>(
    code: TypeCode,
    id: &str,
    children: impl Iterator<Item = (&'a str, u64)>,
) -> u64 {
    let mut h = FxHasher::default();
    (code as u8).hash(&mut h);
    id.hash(&mut h);
    for (name, child_hash) in children {
        name.hash(&mut h);
        child_hash.hash(&mut h);
    }
    h.finish()
}

/// Append the subtree for one definition node, returning its index.
fn append_node(
    out: &mut Vec<TypeDesc>,
    code: TypeCode,
    id: &str,
    children: &[Member],
) -> Result<usize> {
    use TypeCode::*;

    if code == Null {
        return Err(invalid("null is not a field type"));
    }
    if !children.is_empty() && !matches!(code, Struct | Union | StructA | UnionA) {
        return Err(invalid(format!("{code} cannot have members")));
    }
    if !id.is_empty() && !matches!(code, Struct | Union | Any | StructA | UnionA) {
        return Err(invalid(format!("{code} cannot carry a type id")));
    }

    match code {
        Struct => {
            let index = out.len();
            out.push(blank(code, id));
            for m in children {
                check_member_name(&m.name)?;
                if out[index].mlookup.contains_key(&m.name) {
                    return Err(invalid(format!("duplicate member {:?}", m.name)));
                }
                let rel = out.len() - index;
                let child = append_node(out, m.code, &m.id, &m.children)?;
                debug_assert_eq!(child, index + rel);
                out[child].parent_index = rel;
                let dotted: Vec<(std::string::String, usize)> = if m.code == Struct {
                    out[child]
                        .mlookup
                        .iter()
                        .map(|(path, sub)| (format!("{}.{path}", m.name), rel + sub))
                        .collect()
                } else {
                    Vec::new()
                };
                out[index].miter.push((m.name.clone(), rel));
                out[index].mlookup.insert(m.name.clone(), rel);
                for (path, sub) in dotted {
                    out[index].mlookup.insert(path, sub);
                }
            }
            out[index].hash = {
                let pairs: Vec<(&str, u64)> = out[index]
                    .miter
                    .iter()
                    .map(|(name, rel)| (name.as_str(), out[index + rel].hash))
                    .collect();
                mix_hash(code, id, pairs.into_iter())
            };
            Ok(index)
        }
        Union => {
            let mut mnodes = Vec::new();
            let mut mlookup = FxHashMap::default();
            let mut miter = Vec::new();
            for m in children {
                check_member_name(&m.name)?;
                if mlookup.contains_key(&m.name) {
                    return Err(invalid(format!("duplicate choice {:?}", m.name)));
                }
                let start = mnodes.len();
                append_node(&mut mnodes, m.code, &m.id, &m.children)?;
                mlookup.insert(m.name.clone(), start);
                miter.push((m.name.clone(), start));
            }
            let hash = mix_hash(
                code,
                id,
                miter
                    .iter()
                    .map(|(name, start)| (name.as_str(), mnodes[*start].hash)),
            );
            let index = out.len();
            out.push(TypeDesc {
                code,
                id: id.to_owned(),
                hash,
                parent_index: 0,
                mlookup,
                miter,
                members: Some(Arc::new(TypeTree { nodes: mnodes })),
            });
            Ok(index)
        }
        StructA | UnionA => {
            let elem_code = if code == StructA { Struct } else { Union };
            let mut mnodes = Vec::new();
            append_node(&mut mnodes, elem_code, id, children)?;
            let hash = mix_hash(code, "", std::iter::once(("", mnodes[0].hash)));
            let index = out.len();
            out.push(TypeDesc {
                code,
                id: std::string::String::new(),
                hash,
                parent_index: 0,
                mlookup: FxHashMap::default(),
                miter: Vec::new(),
                members: Some(Arc::new(TypeTree { nodes: mnodes })),
            });
            Ok(index)
        }
        _ => {
            let index = out.len();
            let mut node = blank(code, id);
            node.hash = mix_hash(code, id, std::iter::empty());
            out.push(node);
            Ok(index)
        }
    }
}

fn blank(code: TypeCode, id: &str) -> TypeDesc {
    TypeDesc {
        code,
        id: id.to_owned(),
        hash: 0,
        parent_index: 0,
        mlookup: FxHashMap::default(),
        miter: Vec::new(),
        members: None,
    }
}
