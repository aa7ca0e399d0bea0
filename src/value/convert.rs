// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Leaf I/O and the conversion matrix.
//!
//! [`Datum`] is the generic leaf passed through `copy_in`/`copy_out`.
//! Conversions are C-style: numeric kinds cast into one another, numerics
//! format to and parse from base-10 strings, and Bool maps to the literals
//! `"true"`/`"false"` only. Array and Compound assignments are checked
//! against the description, not converted.

use crate::array::{ArrayElement, ErasedArray, SharedArray};
use crate::error::{Error, Result};
use crate::storage::{FieldStorage, Node, StoreVal, TreeView};
use crate::typecode::{StoreKind, TypeCode};
use crate::typedesc::TypeDesc;
use crate::value::{MutValue, Value};

/// A generic leaf value, tagged with its storage kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Real(f64),
    Str(String),
    Compound(Value),
    Array(ErasedArray),
}

impl Datum {
    pub fn kind(&self) -> StoreKind {
        match self {
            Datum::Bool(_) => StoreKind::Bool,
            Datum::Int(_) => StoreKind::Integer,
            Datum::UInt(_) => StoreKind::UInteger,
            Datum::Real(_) => StoreKind::Real,
            Datum::Str(_) => StoreKind::String,
            Datum::Compound(_) => StoreKind::Compound,
            Datum::Array(_) => StoreKind::Array,
        }
    }
}

macro_rules! impl_from_datum_prim {
    ($($ty:ty => $arm:ident as $kind:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Datum {
                fn from(v: $ty) -> Datum {
                    Datum::$arm(v as _)
                }
            }

            impl FromDatum for $ty {
                const KIND: StoreKind = StoreKind::$kind;
                fn from_datum(d: Datum) -> Result<$ty> {
                    match d {
                        Datum::$arm(v) => Ok(v as $ty),
                        _ => Err(Error::NoConvert),
                    }
                }
            }
        )+
    };
}

impl_from_datum_prim! {
    i8 => Int as Integer,
    i16 => Int as Integer,
    i32 => Int as Integer,
    i64 => Int as Integer,
    u8 => UInt as UInteger,
    u16 => UInt as UInteger,
    u32 => UInt as UInteger,
    u64 => UInt as UInteger,
    f32 => Real as Real,
    f64 => Real as Real,
}

impl From<bool> for Datum {
    fn from(v: bool) -> Datum {
        Datum::Bool(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Datum {
        Datum::Str(v.to_owned())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Datum {
        Datum::Str(v)
    }
}

impl From<Value> for Datum {
    fn from(v: Value) -> Datum {
        Datum::Compound(v)
    }
}

impl From<ErasedArray> for Datum {
    fn from(v: ErasedArray) -> Datum {
        Datum::Array(v)
    }
}

impl<T: ArrayElement> From<SharedArray<T>> for Datum {
    fn from(v: SharedArray<T>) -> Datum {
        Datum::Array(v.into())
    }
}

impl<T: ArrayElement> From<Vec<T>> for Datum {
    fn from(v: Vec<T>) -> Datum {
        Datum::Array(v.into())
    }
}

/// Extraction of a concrete type from a [`Datum`] produced by `copy_out`.
pub trait FromDatum: Sized {
    /// Storage kind to request from `copy_out`.
    const KIND: StoreKind;
    fn from_datum(d: Datum) -> Result<Self>;
}

impl FromDatum for bool {
    const KIND: StoreKind = StoreKind::Bool;
    fn from_datum(d: Datum) -> Result<bool> {
        match d {
            Datum::Bool(v) => Ok(v),
            _ => Err(Error::NoConvert),
        }
    }
}

impl FromDatum for String {
    const KIND: StoreKind = StoreKind::String;
    fn from_datum(d: Datum) -> Result<String> {
        match d {
            Datum::Str(v) => Ok(v),
            _ => Err(Error::NoConvert),
        }
    }
}

impl FromDatum for Value {
    const KIND: StoreKind = StoreKind::Compound;
    fn from_datum(d: Datum) -> Result<Value> {
        match d {
            Datum::Compound(v) => Ok(v),
            _ => Err(Error::NoConvert),
        }
    }
}

impl FromDatum for ErasedArray {
    const KIND: StoreKind = StoreKind::Array;
    fn from_datum(d: Datum) -> Result<ErasedArray> {
        match d {
            Datum::Array(v) => Ok(v),
            _ => Err(Error::NoConvert),
        }
    }
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.trim().parse().map_err(|_| Error::NoConvert)
}

fn format_real(v: f64) -> String {
    format!("{v}")
}

/// Extract the cell under `view` as the requested storage kind.
pub(crate) fn copy_out_view<N: Node>(view: TreeView<'_, N>, kind: StoreKind) -> Result<Datum> {
    match &view.cell().store {
        StoreVal::Int(v) => copy_out_int(*v, kind),
        StoreVal::UInt(v) => copy_out_uint(*v, kind),
        StoreVal::Real(v) => copy_out_real(*v, kind),
        StoreVal::Bool(v) => copy_out_bool(*v, kind),
        StoreVal::Str(s) => copy_out_str(s, kind),
        StoreVal::Array(a) => match kind {
            StoreKind::Array => Ok(Datum::Array(a.clone())),
            _ => Err(Error::NoConvert),
        },
        StoreVal::Compound(nested) => {
            if kind == StoreKind::Compound {
                return nested
                    .as_frozen()
                    .map(Datum::Compound)
                    .ok_or(Error::NoConvert);
            }
            // automagic deref into the stored value
            nested.view(|inner| match inner {
                None => Err(Error::NoConvert),
                Some(inner) => copy_out_view(inner, kind),
            })
        }
        StoreVal::Null => Err(Error::NoConvert),
    }
}

fn copy_out_int(v: i64, kind: StoreKind) -> Result<Datum> {
    Ok(match kind {
        StoreKind::Integer => Datum::Int(v),
        StoreKind::UInteger => Datum::UInt(v as u64),
        StoreKind::Real => Datum::Real(v as f64),
        StoreKind::Bool => Datum::Bool(v != 0),
        StoreKind::String => Datum::Str(v.to_string()),
        _ => return Err(Error::NoConvert),
    })
}

fn copy_out_uint(v: u64, kind: StoreKind) -> Result<Datum> {
    Ok(match kind {
        StoreKind::Integer => Datum::Int(v as i64),
        StoreKind::UInteger => Datum::UInt(v),
        StoreKind::Real => Datum::Real(v as f64),
        StoreKind::Bool => Datum::Bool(v != 0),
        StoreKind::String => Datum::Str(v.to_string()),
        _ => return Err(Error::NoConvert),
    })
}

fn copy_out_real(v: f64, kind: StoreKind) -> Result<Datum> {
    Ok(match kind {
        StoreKind::Integer => Datum::Int(v as i64),
        StoreKind::UInteger => Datum::UInt(v as u64),
        StoreKind::Real => Datum::Real(v),
        StoreKind::Bool => Datum::Bool(v != 0.0),
        StoreKind::String => Datum::Str(format_real(v)),
        _ => return Err(Error::NoConvert),
    })
}

fn copy_out_bool(v: bool, kind: StoreKind) -> Result<Datum> {
    Ok(match kind {
        StoreKind::Bool => Datum::Bool(v),
        StoreKind::Integer => Datum::Int(v as i64),
        StoreKind::UInteger => Datum::UInt(v as u64),
        StoreKind::Real => Datum::Real(if v { 1.0 } else { 0.0 }),
        StoreKind::String => Datum::Str(if v { "true" } else { "false" }.to_owned()),
        _ => return Err(Error::NoConvert),
    })
}

fn copy_out_str(s: &str, kind: StoreKind) -> Result<Datum> {
    Ok(match kind {
        StoreKind::String => Datum::Str(s.to_owned()),
        StoreKind::Integer => Datum::Int(parse_num(s)?),
        StoreKind::UInteger => Datum::UInt(parse_num(s)?),
        StoreKind::Real => Datum::Real(parse_num(s)?),
        StoreKind::Bool => match s {
            "true" => Datum::Bool(true),
            "false" => Datum::Bool(false),
            _ => return Err(Error::NoConvert),
        },
        _ => return Err(Error::NoConvert),
    })
}

/// Store a datum into a mutable cell, converting per the matrix, and set
/// the valid mark on success.
pub(crate) fn copy_in_cell(
    node: &TypeDesc,
    cell: &mut FieldStorage<MutValue>,
    datum: Datum,
) -> Result<()> {
    match &mut cell.store {
        StoreVal::Int(dst) => {
            *dst = match datum {
                Datum::Int(v) => v,
                Datum::UInt(v) => v as i64,
                Datum::Real(v) => v as i64,
                Datum::Bool(v) => v as i64,
                Datum::Str(s) => parse_num(&s)?,
                _ => return Err(Error::NoConvert),
            };
        }
        StoreVal::UInt(dst) => {
            *dst = match datum {
                Datum::Int(v) => v as u64,
                Datum::UInt(v) => v,
                Datum::Real(v) => v as u64,
                Datum::Bool(v) => v as u64,
                Datum::Str(s) => parse_num(&s)?,
                _ => return Err(Error::NoConvert),
            };
        }
        StoreVal::Real(dst) => {
            *dst = match datum {
                Datum::Int(v) => v as f64,
                Datum::UInt(v) => v as f64,
                Datum::Real(v) => v,
                Datum::Bool(v) => v as i64 as f64,
                Datum::Str(s) => parse_num(&s)?,
                _ => return Err(Error::NoConvert),
            };
        }
        StoreVal::Bool(dst) => {
            *dst = match datum {
                Datum::Bool(v) => v,
                Datum::Int(v) => v != 0,
                Datum::UInt(v) => v != 0,
                Datum::Real(v) => v != 0.0,
                Datum::Str(s) => match s.as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(Error::NoConvert),
                },
                _ => return Err(Error::NoConvert),
            };
        }
        StoreVal::Str(dst) => {
            *dst = match datum {
                Datum::Str(s) => s,
                Datum::Int(v) => v.to_string(),
                Datum::UInt(v) => v.to_string(),
                Datum::Real(v) => format_real(v),
                Datum::Bool(v) => (if v { "true" } else { "false" }).to_owned(),
                _ => return Err(Error::NoConvert),
            };
        }
        StoreVal::Array(dst) => {
            let Datum::Array(src) = datum else {
                return Err(Error::NoConvert);
            };
            *dst = check_array(node, src)?;
        }
        StoreVal::Compound(dst) => {
            let Datum::Compound(src) = datum else {
                return Err(Error::NoConvert);
            };
            if node.code() != TypeCode::Any {
                // Union shape changes go through `->choice` selection only
                return Err(Error::NoConvert);
            }
            *dst = src.thaw();
        }
        StoreVal::Null => return Err(Error::NoConvert),
    }
    cell.valid = true;
    Ok(())
}

/// Validate an array assignment against the destination description.
fn check_array(node: &TypeDesc, src: ErasedArray) -> Result<ErasedArray> {
    if src.is_empty() {
        // assignment from untyped or empty clears the field
        return Ok(ErasedArray::Empty);
    }
    match &src {
        ErasedArray::Value(elements) => {
            let members = match node.code() {
                TypeCode::StructA | TypeCode::UnionA => node.members(),
                TypeCode::AnyA => None,
                _ => return Err(Error::NoConvert),
            };
            if let Some(members) = members {
                let want = members.node(0).hash();
                for element in elements {
                    let ok = element.view(|v| match v {
                        None => true, // unset slots are checked at serialization
                        Some(v) => v.node().hash() == want,
                    });
                    if !ok {
                        return Err(Error::NoConvert);
                    }
                }
            }
            Ok(src)
        }
        _ => {
            if src.array_code() == Some(node.code()) {
                Ok(src)
            } else {
                Err(Error::NoConvert)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{members as m, TypeDef};
    use crate::typecode::TypeCode;

    fn leaf(code: TypeCode) -> MutValue {
        TypeDef::new(code).create().expect("create leaf")
    }

    #[test]
    fn numeric_casts() {
        let mut v = leaf(TypeCode::Int32);
        v.copy_in(Datum::Real(4.7)).expect("real into int");
        assert_eq!(v.get::<i32>("").expect("get"), 4);
        v.copy_in(Datum::UInt(9)).expect("uint into int");
        assert_eq!(v.get::<i64>("").expect("get"), 9);
        assert_eq!(v.get::<f64>("").expect("get as real"), 9.0);
        assert_eq!(v.get::<u32>("").expect("get as uint"), 9);
    }

    #[test]
    fn string_parses_and_formats() {
        let mut v = leaf(TypeCode::String);
        v.set("", -5i32).expect("int into string");
        assert_eq!(v.get::<String>("").expect("get"), "-5");
        assert_eq!(v.get::<i32>("").expect("parse back"), -5);

        v.set("", "abc").expect("set text");
        assert_eq!(v.get::<i32>(""), Err(Error::NoConvert));

        let mut n = leaf(TypeCode::Int64);
        n.set("", "-17").expect("parse into int");
        assert_eq!(n.get::<i64>("").expect("get"), -17);
        assert_eq!(n.set("", "4.2"), Err(Error::NoConvert));
    }

    #[test]
    fn bool_literals_only() {
        let mut v = leaf(TypeCode::Bool);
        v.set("", "true").expect("literal true");
        assert!(v.get::<bool>("").expect("get"));
        v.set("", "false").expect("literal false");
        assert!(!v.get::<bool>("").expect("get"));
        // historical typo is not accepted
        assert_eq!(v.set("", "flase"), Err(Error::NoConvert));
        assert_eq!(v.set("", "TRUE"), Err(Error::NoConvert));

        let mut s = leaf(TypeCode::String);
        s.set("", true).expect("bool into string");
        assert_eq!(s.get::<String>("").expect("get"), "true");
    }

    #[test]
    fn scalar_array_element_type_enforced() {
        let mut v = leaf(TypeCode::Int32A);
        v.set("", vec![1i32, 2, 3]).expect("matching element type");
        assert_eq!(
            v.get::<ErasedArray>("").expect("get").len(),
            3
        );
        assert_eq!(v.set("", vec![1i64, 2]), Err(Error::NoConvert));
        v.set("", ErasedArray::Empty).expect("clear");
        assert!(v.get::<ErasedArray>("").expect("get").is_empty());
    }

    #[test]
    fn any_accepts_compound() {
        let mut v = leaf(TypeCode::Any);
        let inner = {
            let mut x = leaf(TypeCode::UInt64);
            x.set("", 42u64).expect("set");
            x.freeze().expect("freeze")
        };
        v.set("", inner).expect("assign any");
        // scalar read dereferences into the stored value
        assert_eq!(v.get::<u64>("").expect("deref"), 42);
    }

    #[test]
    fn union_rejects_direct_compound() {
        let mut v = TypeDef::compound(
            TypeCode::Struct,
            "",
            vec![m::union_("u", "", vec![m::int32("i")])],
        )
        .create()
        .expect("create");
        let other = leaf(TypeCode::Int32).freeze().expect("freeze");
        assert_eq!(v.set("u", other), Err(Error::NoConvert));
    }

    #[test]
    fn struct_cell_converts_nothing() {
        let mut v = TypeDef::compound(TypeCode::Struct, "", vec![m::int32("x")])
            .create()
            .expect("create");
        assert_eq!(v.copy_in(Datum::Int(1)), Err(Error::NoConvert));
        assert_eq!(v.copy_out(StoreKind::Integer), Err(Error::NoConvert));
    }
}
