// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Values on the wire.
//!
//! The full form serializes every leaf cell in depth-first order,
//! independent of marks. The delta form is preceded by a [`BitMask`]; a
//! set bit covers that cell and, for a compound, its entire subtree.
//!
//! Decoding is a single linear pass. On any failure the output value is
//! left empty; partially-populated state is never visible.

use std::sync::Arc;

use tracing::debug;

use crate::array::{ErasedArray, SharedArray};
use crate::bitmask::BitMask;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::storage::{FieldStorage, Node, StorageTop, StoreVal, TreeView};
use crate::typecode::{StoreKind, TypeCode};
use crate::typedesc::{TypeDesc, TypeTree};
use crate::value::{MutValue, Value};
use crate::wire::typecodec::{
    read_type, read_type_optional, to_wire_type, write_type_desc, CTRL_NULL,
};
use crate::wire::{DecodeBuf, EncodeBuf, TypeStore};

// ---------------------------------------------------------------------
// serialization
// ---------------------------------------------------------------------

/// Serialize every leaf of a frozen value, independent of marks.
pub fn to_wire_full(buf: &mut EncodeBuf, value: &Value) -> Result<()> {
    value.view(|view| match view {
        None => Err(Error::BadOutput("empty value")),
        Some(view) => write_cells(buf, view),
    })
}

/// Serialize a [`BitMask`] and the covered leaves. The mask defaults to
/// the value's own marks.
pub fn to_wire_valid(buf: &mut EncodeBuf, value: &Value, mask: Option<&BitMask>) -> Result<()> {
    value.view(|view| {
        let Some(view) = view else {
            return Err(Error::BadOutput("empty value"));
        };
        let count = view.node().size();
        let own;
        let mask = match mask {
            Some(m) => m,
            None => {
                own = mask_from_marks(view);
                &own
            }
        };
        mask.write(buf);
        let mut i = 0;
        while i < count {
            if mask.get(i) {
                let sub = view.descend(view.index + i);
                write_cells(buf, sub)?;
                i += sub.node().size();
            } else {
                i += 1;
            }
        }
        Ok(())
    })
}

/// Serialize a type (with cache negotiation) followed by the full value.
pub fn to_wire_type_value(buf: &mut EncodeBuf, value: &Value, store: &mut TypeStore) -> Result<()> {
    let ty = value.value_type().ok_or(Error::BadOutput("empty value"))?;
    to_wire_type(buf, &ty, store);
    to_wire_full(buf, value)
}

fn mask_from_marks(view: TreeView<'_, Value>) -> BitMask {
    let count = view.node().size();
    let base = view.index - view.root;
    let mut mask = BitMask::new(count);
    for i in 0..count {
        if view.cells[base + i].valid {
            mask.set(i, true);
        }
    }
    mask
}

fn write_cells(buf: &mut EncodeBuf, view: TreeView<'_, Value>) -> Result<()> {
    let node = view.node();
    if node.code() == TypeCode::Struct {
        for (_, rel) in node.children() {
            write_cells(buf, view.descend(view.index + rel))?;
        }
        return Ok(());
    }
    write_leaf(buf, view)
}

fn write_sized_uint(buf: &mut EncodeBuf, value: u64, size: usize) {
    match size {
        1 => buf.write_u8(value as u8),
        2 => buf.write_u16(value as u16),
        4 => buf.write_u32(value as u32),
        _ => buf.write_u64(value),
    }
}

fn write_leaf(buf: &mut EncodeBuf, view: TreeView<'_, Value>) -> Result<()> {
    let node = view.node();
    let code = node.code();
    match &view.cell().store {
        StoreVal::Bool(v) => buf.write_u8(*v as u8),
        StoreVal::Int(v) => write_sized_uint(buf, *v as u64, code.size()),
        StoreVal::UInt(v) => write_sized_uint(buf, *v, code.size()),
        StoreVal::Real(v) => {
            if code.size() == 4 {
                buf.write_f32(*v as f32);
            } else {
                buf.write_f64(*v);
            }
        }
        StoreVal::Str(s) => buf.write_str(s),
        StoreVal::Array(arr) => write_array(buf, node, arr)?,
        StoreVal::Compound(nested) => match code {
            TypeCode::Union => write_union(buf, node, nested)?,
            _ => write_any(buf, nested)?,
        },
        StoreVal::Null => return Err(Error::BadOutput("field without storage")),
    }
    Ok(())
}

fn write_union(buf: &mut EncodeBuf, node: &TypeDesc, nested: &Value) -> Result<()> {
    nested.view(|v| match v {
        None => {
            buf.write_size(0);
            Ok(())
        }
        Some(v) => {
            let selector = node
                .children()
                .iter()
                .position(|(_, start)| *start == v.index)
                .ok_or(Error::BadOutput("union selection does not name a choice"))?;
            buf.write_size(selector + 1);
            write_cells(buf, v)
        }
    })
}

fn write_any(buf: &mut EncodeBuf, nested: &Value) -> Result<()> {
    nested.view(|v| match v {
        None => {
            buf.write_u8(CTRL_NULL);
            Ok(())
        }
        Some(v) => {
            write_type_desc(buf, v.descs.as_ref(), v.index);
            write_cells(buf, v)
        }
    })
}

fn write_array(buf: &mut EncodeBuf, node: &TypeDesc, arr: &ErasedArray) -> Result<()> {
    let code = node.code();

    macro_rules! scalar_elems {
        ($a:expr, $width:expr) => {{
            buf.write_size($a.len());
            for v in $a {
                write_sized_uint(buf, *v as u64, $width);
            }
            Ok(())
        }};
    }

    use ErasedArray as A;
    match (code, arr) {
        (_, A::Empty) => {
            buf.write_size(0);
            Ok(())
        }
        (TypeCode::BoolA, A::Bool(a)) => {
            buf.write_size(a.len());
            for v in a {
                buf.write_u8(*v as u8);
            }
            Ok(())
        }
        (TypeCode::Int8A, A::Int8(a)) => scalar_elems!(a, 1),
        (TypeCode::Int16A, A::Int16(a)) => scalar_elems!(a, 2),
        (TypeCode::Int32A, A::Int32(a)) => scalar_elems!(a, 4),
        (TypeCode::Int64A, A::Int64(a)) => scalar_elems!(a, 8),
        (TypeCode::UInt8A, A::UInt8(a)) => scalar_elems!(a, 1),
        (TypeCode::UInt16A, A::UInt16(a)) => scalar_elems!(a, 2),
        (TypeCode::UInt32A, A::UInt32(a)) => scalar_elems!(a, 4),
        (TypeCode::UInt64A, A::UInt64(a)) => scalar_elems!(a, 8),
        (TypeCode::Float32A, A::Float32(a)) => {
            buf.write_size(a.len());
            for v in a {
                buf.write_f32(*v);
            }
            Ok(())
        }
        (TypeCode::Float64A, A::Float64(a)) => {
            buf.write_size(a.len());
            for v in a {
                buf.write_f64(*v);
            }
            Ok(())
        }
        (TypeCode::StringA, A::String(a)) => {
            buf.write_size(a.len());
            for v in a {
                buf.write_str(v);
            }
            Ok(())
        }
        (TypeCode::StructA | TypeCode::UnionA, A::Value(a)) => {
            buf.write_size(a.len());
            for element in a {
                element.view(|v| match v {
                    None => Err(Error::BadOutput("unset element in structured array")),
                    Some(v) => write_cells(buf, v),
                })?;
            }
            Ok(())
        }
        (TypeCode::AnyA, A::Value(a)) => {
            buf.write_size(a.len());
            for element in a {
                write_any(buf, element)?;
            }
            Ok(())
        }
        _ => Err(Error::BadOutput("array does not match its field type")),
    }
}

// ---------------------------------------------------------------------
// deserialization
// ---------------------------------------------------------------------

/// Decode a type and instantiate a fresh mutable value of that type.
pub fn from_wire_type(buf: &mut DecodeBuf<'_>, store: &mut TypeStore, value: &mut MutValue) -> Result<()> {
    *value = MutValue::empty();
    if let Some(ty) = read_type(buf, store)? {
        *value = ty.create();
    }
    Ok(())
}

/// Decode every leaf into a value of known type.
pub fn from_wire_full(buf: &mut DecodeBuf<'_>, store: &TypeStore, value: &mut MutValue) -> Result<()> {
    let limits = store.limits();
    let result = decode_full(buf, &limits, value);
    if let Err(e) = &result {
        debug!(error = %e, "discarding partially decoded value");
        *value = MutValue::empty();
    }
    result
}

/// Decode a [`BitMask`] and overlay the covered leaves onto a value of
/// known type, raising their marks.
pub fn from_wire_valid(buf: &mut DecodeBuf<'_>, store: &TypeStore, value: &mut MutValue) -> Result<()> {
    let limits = store.limits();
    let result = decode_valid(buf, &limits, value);
    if let Err(e) = &result {
        debug!(error = %e, "discarding partially decoded delta");
        *value = MutValue::empty();
    }
    result
}

/// Decode a type (with cache negotiation) followed by the full value.
pub fn from_wire_type_value(
    buf: &mut DecodeBuf<'_>,
    store: &mut TypeStore,
    value: &mut MutValue,
) -> Result<()> {
    from_wire_type(buf, store, value)?;
    if value.is_empty() {
        return Ok(());
    }
    from_wire_full(buf, store, value)
}

fn decode_full(buf: &mut DecodeBuf<'_>, limits: &Limits, value: &MutValue) -> Result<()> {
    let Some((top, index)) = &value.inner else {
        return Err(Error::NoField);
    };
    let mut guard = top.borrow_mut();
    let guard = &mut *guard;
    let descs = guard.descs.clone();
    read_cells(buf, limits, &descs, guard.root, &mut guard.cells, *index)
}

fn decode_valid(buf: &mut DecodeBuf<'_>, limits: &Limits, value: &MutValue) -> Result<()> {
    let Some((top, index)) = &value.inner else {
        return Err(Error::NoField);
    };
    let mut guard = top.borrow_mut();
    let guard = &mut *guard;
    let descs = guard.descs.clone();
    let count = descs.node(*index).size();
    let mask = BitMask::read(buf, count)?;
    let mut i = 0;
    while i < count {
        if mask.get(i) {
            let sub = *index + i;
            read_cells(buf, limits, &descs, guard.root, &mut guard.cells, sub)?;
            i += descs.node(sub).size();
        } else {
            i += 1;
        }
    }
    Ok(())
}

fn read_cells(
    buf: &mut DecodeBuf<'_>,
    limits: &Limits,
    descs: &Arc<TypeTree>,
    root: usize,
    cells: &mut [FieldStorage<MutValue>],
    index: usize,
) -> Result<()> {
    let node = descs.node(index);
    if node.code() == TypeCode::Struct {
        cells[index - root].valid = true;
        for (_, rel) in node.children() {
            read_cells(buf, limits, descs, root, cells, index + rel)?;
        }
        return Ok(());
    }
    read_leaf(buf, limits, node, &mut cells[index - root])
}

fn read_sized_int(buf: &mut DecodeBuf<'_>, size: usize) -> Result<i64> {
    Ok(match size {
        1 => buf.read_u8()? as i8 as i64,
        2 => buf.read_i16()? as i64,
        4 => buf.read_i32()? as i64,
        _ => buf.read_i64()?,
    })
}

fn read_sized_uint(buf: &mut DecodeBuf<'_>, size: usize) -> Result<u64> {
    Ok(match size {
        1 => buf.read_u8()? as u64,
        2 => buf.read_u16()? as u64,
        4 => buf.read_u32()? as u64,
        _ => buf.read_u64()?,
    })
}

fn read_leaf(
    buf: &mut DecodeBuf<'_>,
    limits: &Limits,
    node: &TypeDesc,
    cell: &mut FieldStorage<MutValue>,
) -> Result<()> {
    let code = node.code();
    cell.store = match code.store_kind() {
        StoreKind::Bool => StoreVal::Bool(buf.read_u8()? != 0),
        StoreKind::Integer => StoreVal::Int(read_sized_int(buf, code.size())?),
        StoreKind::UInteger => StoreVal::UInt(read_sized_uint(buf, code.size())?),
        StoreKind::Real => StoreVal::Real(if code.size() == 4 {
            buf.read_f32()? as f64
        } else {
            buf.read_f64()?
        }),
        StoreKind::String => StoreVal::Str(buf.read_str(limits.max_string_bytes)?),
        StoreKind::Array => StoreVal::Array(read_array(buf, limits, node)?),
        StoreKind::Compound => StoreVal::Compound(read_compound(buf, limits, node)?),
        StoreKind::Null => return Err(Error::bad_wire("field without wire form")),
    };
    cell.valid = true;
    Ok(())
}

/// Build a fresh mutable value of the subtree at `root` and fill it from
/// the buffer.
fn decode_tree(
    buf: &mut DecodeBuf<'_>,
    limits: &Limits,
    descs: Arc<TypeTree>,
    root: usize,
) -> Result<MutValue> {
    let mut top = StorageTop::alloc(descs.clone(), root);
    read_cells(buf, limits, &descs, root, &mut top.cells, root)?;
    Ok(MutValue::from_top(top))
}

fn read_compound(buf: &mut DecodeBuf<'_>, limits: &Limits, node: &TypeDesc) -> Result<MutValue> {
    match node.code() {
        TypeCode::Union => {
            let selector = buf.read_size()?;
            if selector == 0 {
                return Ok(MutValue::empty());
            }
            let Some((_, start)) = node.children().get(selector - 1) else {
                return Err(Error::bad_wire(format!(
                    "union selector {selector} out of range"
                )));
            };
            let members = node
                .members()
                .ok_or_else(|| Error::bad_wire("union without alternatives"))?
                .clone();
            decode_tree(buf, limits, members, *start)
        }
        TypeCode::Any => match read_type_optional(buf, limits)? {
            None => Ok(MutValue::empty()),
            Some(ty) => decode_tree(buf, limits, ty.tree, ty.root),
        },
        _ => Err(Error::bad_wire("compound storage on a non-compound field")),
    }
}

/// Freeze a freshly decoded element; its storage is necessarily unique.
fn freeze_element(element: MutValue) -> Result<Value> {
    element
        .freeze()
        .map_err(|_| Error::bad_wire("decoded element not uniquely owned"))
}

fn read_array(buf: &mut DecodeBuf<'_>, limits: &Limits, node: &TypeDesc) -> Result<ErasedArray> {
    let code = node.code();
    let len = buf.read_size()?;
    if len > limits.max_array_elements {
        return Err(Error::bad_wire(format!(
            "array of {len} elements exceeds the {} element limit",
            limits.max_array_elements
        )));
    }
    if len == 0 {
        return Ok(ErasedArray::Empty);
    }

    // a declared size running past the end of the buffer fails before
    // anything is allocated
    let min_bytes = if code.kind() == crate::typecode::Kind::Compound {
        len
    } else {
        code.size().saturating_mul(len)
    };
    if min_bytes > buf.remaining() {
        return Err(Error::bad_wire(format!(
            "array size {len} runs past the end of the buffer"
        )));
    }

    macro_rules! read_int_elems {
        ($read:ident, $ty:ty) => {{
            let mut out: Vec<$ty> = Vec::with_capacity(len);
            for _ in 0..len {
                out.push($read(buf, code.size())? as $ty);
            }
            Ok(out.into())
        }};
    }

    match code {
        TypeCode::BoolA => {
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(buf.read_u8()? != 0);
            }
            Ok(out.into())
        }
        TypeCode::Int8A => read_int_elems!(read_sized_int, i8),
        TypeCode::Int16A => read_int_elems!(read_sized_int, i16),
        TypeCode::Int32A => read_int_elems!(read_sized_int, i32),
        TypeCode::Int64A => read_int_elems!(read_sized_int, i64),
        TypeCode::UInt8A => read_int_elems!(read_sized_uint, u8),
        TypeCode::UInt16A => read_int_elems!(read_sized_uint, u16),
        TypeCode::UInt32A => read_int_elems!(read_sized_uint, u32),
        TypeCode::UInt64A => read_int_elems!(read_sized_uint, u64),
        TypeCode::Float32A => {
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(buf.read_f32()?);
            }
            Ok(out.into())
        }
        TypeCode::Float64A => {
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(buf.read_f64()?);
            }
            Ok(out.into())
        }
        TypeCode::StringA => {
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(buf.read_str(limits.max_string_bytes)?);
            }
            Ok(out.into())
        }
        TypeCode::StructA | TypeCode::UnionA => {
            let members = node
                .members()
                .ok_or_else(|| Error::bad_wire("structured array without element type"))?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                let element = decode_tree(buf, limits, members.clone(), 0)?;
                out.push(freeze_element(element)?);
            }
            Ok(ErasedArray::Value(SharedArray::from(out)))
        }
        TypeCode::AnyA => {
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                match read_type_optional(buf, limits)? {
                    None => out.push(Value::empty()),
                    Some(ty) => {
                        let element = decode_tree(buf, limits, ty.tree, ty.root)?;
                        out.push(freeze_element(element)?);
                    }
                }
            }
            Ok(ErasedArray::Value(SharedArray::from(out)))
        }
        _ => Err(Error::bad_wire("array storage on a non-array field")),
    }
}
