// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Human-readable rendering for logs and tests.
//!
//! Values render as `TypeCode [id] name = value` with Struct bodies inside
//! `{ ... }`, arrays in `[ ... ]`, selected unions prefixed `.choice`, and
//! strings C-escaped. Advisory only; not a parseable interchange format.

use std::fmt;

use crate::array::ErasedArray;
use crate::storage::{Node, StoreVal, TreeView};
use crate::typecode::TypeCode;
use crate::value::{MutValue, Value};

/// C-escape a string for display.
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || (c as u32) == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn indent(f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        f.write_str("    ")?;
    }
    Ok(())
}

fn fmt_nested<N: Node>(
    f: &mut fmt::Formatter<'_>,
    nested: &N,
    member: &str,
    level: usize,
) -> fmt::Result {
    nested.view(|view| match view {
        None => {
            indent(f, level)?;
            writeln!(f, "null")
        }
        Some(view) => fmt_view(f, view, member, level),
    })
}

pub(crate) fn fmt_view<N: Node>(
    f: &mut fmt::Formatter<'_>,
    view: TreeView<'_, N>,
    member: &str,
    level: usize,
) -> fmt::Result {
    let node = view.node();
    indent(f, level)?;
    write!(f, "{}", node.code())?;
    if !node.id().is_empty() {
        write!(f, " \"{}\"", node.id())?;
    }
    if !member.is_empty() && node.code() != TypeCode::Struct {
        write!(f, " {member}")?;
    }

    match &view.cell().store {
        StoreVal::Null => {
            if node.code() == TypeCode::Struct {
                writeln!(f, " {{")?;
                for (name, rel) in node.children() {
                    fmt_view(f, view.descend(view.index + rel), name, level + 1)?;
                }
                indent(f, level)?;
                f.write_str("}")?;
                if !member.is_empty() {
                    write!(f, " {member}")?;
                }
                writeln!(f)
            } else {
                writeln!(f)
            }
        }
        StoreVal::Bool(v) => writeln!(f, " = {v}"),
        StoreVal::Int(v) => writeln!(f, " = {v}"),
        StoreVal::UInt(v) => writeln!(f, " = {v}"),
        StoreVal::Real(v) => writeln!(f, " = {v}"),
        StoreVal::Str(s) => writeln!(f, " = \"{}\"", escape(s)),
        StoreVal::Compound(nested) => {
            if node.code() == TypeCode::Union {
                if let Some(choice) = nested.view(|n| {
                    let n = n?;
                    node.children()
                        .iter()
                        .find(|(_, start)| *start == n.index)
                        .map(|(name, _)| name.clone())
                }) {
                    write!(f, ".{choice}")?;
                }
            }
            writeln!(f)?;
            fmt_nested(f, nested, "", level + 1)
        }
        StoreVal::Array(arr) => fmt_array(f, arr, level),
    }
}

fn fmt_array(f: &mut fmt::Formatter<'_>, arr: &ErasedArray, level: usize) -> fmt::Result {
    use ErasedArray::*;

    macro_rules! scalar_list {
        ($a:expr) => {{
            f.write_str(" = [")?;
            for (i, v) in $a.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{v}")?;
            }
            writeln!(f, "]")
        }};
    }

    match arr {
        Empty => writeln!(f, " = []"),
        Bool(a) => scalar_list!(a),
        Int8(a) => scalar_list!(a),
        Int16(a) => scalar_list!(a),
        Int32(a) => scalar_list!(a),
        Int64(a) => scalar_list!(a),
        UInt8(a) => scalar_list!(a),
        UInt16(a) => scalar_list!(a),
        UInt32(a) => scalar_list!(a),
        UInt64(a) => scalar_list!(a),
        Float32(a) => scalar_list!(a),
        Float64(a) => scalar_list!(a),
        String(a) => {
            f.write_str(" = [")?;
            for (i, v) in a.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "\"{}\"", escape(v))?;
            }
            writeln!(f, "]")
        }
        Value(a) => {
            writeln!(f, " [")?;
            for v in a {
                fmt_nested(f, v, "", level + 1)?;
            }
            indent(f, level)?;
            writeln!(f, "]")
        }
    }
}

macro_rules! impl_display {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.view(|view| match view {
                    None => writeln!(f, "null"),
                    Some(view) => fmt_view(f, view, "", 0),
                })
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }
    };
}

impl_display!(Value);
impl_display!(MutValue);

#[cfg(test)]
mod tests {
    use crate::builder::{members as m, TypeDef};
    use crate::typecode::TypeCode;

    #[test]
    fn renders_struct_body() {
        let mut v = TypeDef::compound(
            TypeCode::Struct,
            "sample_t",
            vec![m::int32("value"), m::string("label")],
        )
        .create()
        .expect("create");
        v.set("value", 42i32).expect("set");
        v.set("label", "say \"hi\"\n").expect("set");

        let text = v.to_string();
        assert!(text.starts_with("struct \"sample_t\" {"), "got: {text}");
        assert!(text.contains("int32_t value = 42"), "got: {text}");
        assert!(
            text.contains("string label = \"say \\\"hi\\\"\\n\""),
            "got: {text}"
        );
        assert!(text.trim_end().ends_with('}'), "got: {text}");
    }

    #[test]
    fn renders_union_selection_and_arrays() {
        let mut v = TypeDef::compound(
            TypeCode::Struct,
            "",
            vec![
                m::union_("choice", "", vec![m::int32("i"), m::string("s")]),
                m::int32_a("data"),
            ],
        )
        .create()
        .expect("create");
        v.set("choice->s", "hi").expect("select");
        v.set("data", vec![1i32, 2, 3]).expect("array");

        let text = v.to_string();
        assert!(text.contains("union choice.s"), "got: {text}");
        assert!(text.contains("string = \"hi\""), "got: {text}");
        assert!(text.contains("int32_t[] data = [1, 2, 3]"), "got: {text}");
    }

    #[test]
    fn empty_handle_prints_null() {
        let v = crate::value::Value::empty();
        assert_eq!(v.to_string(), "null\n");
    }
}
