// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Path navigation.
//!
//! The path grammar, applied against the type description:
//!
//! - in a Struct, an identifier `[A-Za-z0-9_.]+` looked up in `mlookup`
//!   (dotted paths resolve transitively in one step);
//! - in a Union or Any, `->`; a Union then reads a choice name, which a
//!   mutable view selects and a frozen view merely verifies;
//! - in an array of Struct/Union/Any, `[N]` dereferences the N-th element
//!   (frozen views only; element construction goes through
//!   `alloc_member`);
//! - `<` ascends to the enclosing Struct.
//!
//! Any syntax error or missing name yields the empty handle, which ignores
//! the rest of the path.

use std::sync::Arc;

use crate::storage::StoreVal;
use crate::typecode::TypeCode;
use crate::typedesc::TypeTree;
use crate::value::{MutValue, Value};

/// Split an identifier at the first structural separator.
fn ident_end(path: &str, extra_dot: bool) -> usize {
    path.bytes()
        .position(|b| b == b'[' || b == b'-' || b == b'<' || (extra_dot && b == b'.'))
        .unwrap_or(path.len())
}

/// Parse `[N]` starting at `path`; returns `(index, consumed)`.
fn parse_index(path: &str) -> Option<(usize, usize)> {
    let rest = path.strip_prefix('[')?;
    let close = rest.find(']')?;
    let n: usize = rest[..close].parse().ok()?;
    Some((n, close + 2))
}

impl Value {
    /// Descend into a sub-structure. Returns the empty handle when the
    /// path does not resolve.
    pub fn at(&self, path: &str) -> Value {
        let mut cur = self.clone();
        let mut pos = 0;

        while pos < path.len() {
            let Some((top, index)) = cur.inner.clone() else {
                return Value::empty();
            };
            let descs = top.descs.clone();
            let node = descs.node(index);
            let rest = &path[pos..];

            if rest.starts_with('<') {
                let back = node.parent_index;
                if back == 0 || index < top.root + back {
                    return Value::empty();
                }
                cur = Value {
                    inner: Some((top, index - back)),
                };
                pos += 1;
                continue;
            }

            match node.code() {
                TypeCode::Struct => {
                    let rest = rest.strip_prefix('.').unwrap_or(rest);
                    pos = path.len() - rest.len();
                    let end = ident_end(rest, false);
                    match node.mlookup.get(&rest[..end]) {
                        Some(rel) => {
                            cur = Value {
                                inner: Some((top, index + rel)),
                            };
                            pos += end;
                        }
                        None => return Value::empty(),
                    }
                }
                TypeCode::Union | TypeCode::Any => {
                    let Some(rest) = rest.strip_prefix("->") else {
                        return Value::empty();
                    };
                    pos += 2;
                    let StoreVal::Compound(nested) = &top.cells[index - top.root].store else {
                        return Value::empty();
                    };
                    if node.code() == TypeCode::Any {
                        cur = nested.clone();
                        continue;
                    }
                    let end = ident_end(rest, true);
                    let Some(choice) = node.mlookup.get(&rest[..end]) else {
                        return Value::empty();
                    };
                    // traversing a frozen view cannot select; the choice
                    // must already match
                    let selected = nested
                        .inner
                        .as_ref()
                        .is_some_and(|(ntop, nidx)| {
                            *nidx == *choice && nested_is_choice(node.members(), &ntop.descs, *nidx)
                        });
                    if !selected {
                        return Value::empty();
                    }
                    cur = nested.clone();
                    pos += end;
                }
                code if code.is_array() && code.kind() == crate::typecode::Kind::Compound => {
                    let Some((n, used)) = parse_index(rest) else {
                        return Value::empty();
                    };
                    let StoreVal::Array(arr) = &top.cells[index - top.root].store else {
                        return Value::empty();
                    };
                    let Some(elements) = arr.values() else {
                        return Value::empty();
                    };
                    let Some(element) = elements.as_slice().get(n) else {
                        return Value::empty();
                    };
                    cur = element.clone();
                    pos += used;
                    // allow "a[1]name" and "a[1].name"
                    if path[pos..].starts_with('.') {
                        pos += 1;
                    }
                }
                _ => return Value::empty(),
            }
        }
        cur
    }
}

impl MutValue {
    /// Descend into a sub-structure, selecting Union choices along the
    /// way. Returns the empty handle when the path does not resolve.
    ///
    /// Elements of compound arrays are frozen; indexing `[N]` through a
    /// mutable view yields the empty handle.
    pub fn at(&self, path: &str) -> MutValue {
        let mut cur = self.clone();
        let mut pos = 0;

        while pos < path.len() {
            let Some((top, index)) = cur.inner.clone() else {
                return MutValue::empty();
            };
            let (descs, root) = {
                let g = top.borrow();
                (g.descs.clone(), g.root)
            };
            let node = descs.node(index);
            let rest = &path[pos..];

            if rest.starts_with('<') {
                let back = node.parent_index;
                if back == 0 || index < root + back {
                    return MutValue::empty();
                }
                cur = MutValue {
                    inner: Some((top, index - back)),
                };
                pos += 1;
                continue;
            }

            match node.code() {
                TypeCode::Struct => {
                    let rest = rest.strip_prefix('.').unwrap_or(rest);
                    pos = path.len() - rest.len();
                    let end = ident_end(rest, false);
                    match node.mlookup.get(&rest[..end]) {
                        Some(rel) => {
                            cur = MutValue {
                                inner: Some((top, index + rel)),
                            };
                            pos += end;
                        }
                        None => return MutValue::empty(),
                    }
                }
                TypeCode::Union | TypeCode::Any => {
                    let Some(rest) = rest.strip_prefix("->") else {
                        return MutValue::empty();
                    };
                    pos += 2;
                    if node.code() == TypeCode::Any {
                        let nested = {
                            let g = top.borrow();
                            match &g.cells[index - root].store {
                                StoreVal::Compound(n) => n.clone(),
                                _ => return MutValue::empty(),
                            }
                        };
                        cur = nested;
                        continue;
                    }
                    let end = ident_end(rest, true);
                    let Some(&choice) = node.mlookup.get(&rest[..end]) else {
                        return MutValue::empty();
                    };
                    let Some(members) = node.members() else {
                        return MutValue::empty();
                    };
                    cur = select_choice(&top, index - root, members.clone(), choice);
                    pos += end;
                }
                code if code.is_array() && code.kind() == crate::typecode::Kind::Compound => {
                    return MutValue::empty();
                }
                _ => return MutValue::empty(),
            }
        }
        cur
    }
}

/// Select a Union alternative, reusing the nested value when the choice
/// already matches and allocating a fresh one otherwise. Selection marks
/// the cell.
fn select_choice(
    top: &crate::value::MutTop,
    cell_index: usize,
    members: Arc<TypeTree>,
    choice: usize,
) -> MutValue {
    {
        let g = top.borrow();
        if let StoreVal::Compound(nested) = &g.cells[cell_index].store {
            if let Some((ntop, nidx)) = &nested.inner {
                let same = *nidx == choice && {
                    let ng = ntop.borrow();
                    nested_is_choice(Some(&members), &ng.descs, choice)
                };
                if same {
                    return nested.clone();
                }
            }
        }
    }
    let fresh = MutValue::alloc_at(members, choice);
    let mut g = top.borrow_mut();
    g.cells[cell_index].store = StoreVal::Compound(fresh.clone());
    g.cells[cell_index].valid = true;
    fresh
}

/// A nested value is the selected alternative when its description array
/// is the union's members tree (or is structurally identical at the
/// choice node, for values received over the wire).
fn nested_is_choice(members: Option<&Arc<TypeTree>>, tree: &Arc<TypeTree>, index: usize) -> bool {
    members.is_some_and(|m| {
        Arc::ptr_eq(m, tree)
            || (index < m.len()
                && index < tree.len()
                && m.node(index).hash() == tree.node(index).hash())
    })
}

#[cfg(test)]
mod tests {
    use crate::builder::{members as m, TypeDef};
    use crate::error::Error;
    use crate::typecode::TypeCode;
    use crate::value::{MutValue, Value};

    fn nested() -> MutValue {
        TypeDef::compound(
            TypeCode::Struct,
            "top_t",
            vec![
                m::int32("value"),
                m::struct_(
                    "alarm",
                    "alarm_t",
                    vec![m::int32("severity"), m::string("message")],
                ),
                m::union_("choice", "", vec![m::int32("i"), m::string("s")]),
                m::any("blob"),
            ],
        )
        .create()
        .expect("create")
    }

    #[test]
    fn dotted_lookup_resolves_transitively() {
        let mut v = nested();
        v.set("alarm.severity", 3i32).expect("set");
        assert_eq!(v.get::<i32>("alarm.severity").expect("get"), 3);
        assert_eq!(v.at("alarm").get::<i32>("severity").expect("get"), 3);
    }

    #[test]
    fn ascend_returns_to_enclosing_struct() {
        let v = nested();
        let severity = v.at("alarm.severity");
        assert_eq!(severity.at("<").type_code(), TypeCode::Struct);
        assert_eq!(severity.at("<").id().expect("id"), "alarm_t");
        assert_eq!(severity.at("<<").id().expect("id"), "top_t");
        assert!(severity.at("<<<").is_empty());
        assert_eq!(severity.at("<message").type_code(), TypeCode::String);
    }

    #[test]
    fn union_selection_allocates_and_reuses() {
        let mut v = nested();
        v.set("choice->s", "hi").expect("select and set");
        assert_eq!(selection_of(&v, "choice"), Some("s".to_owned()));
        assert_eq!(v.get::<String>("choice->s").expect("get"), "hi");
        // same choice reuses storage
        v.set("choice->s", "again").expect("reuse");
        assert_eq!(v.get::<String>("choice->s").expect("get"), "again");
        // switching re-constructs the nested value
        v.set("choice->i", 5i32).expect("switch");
        assert_eq!(selection_of(&v, "choice"), Some("i".to_owned()));
        assert_eq!(v.get::<i32>("choice->i").expect("get"), 5);
    }

    #[test]
    fn frozen_union_verifies_but_never_selects() {
        let mut v = nested();
        v.set("choice->s", "hi").expect("select");
        let frozen = v.freeze().expect("freeze");
        assert_eq!(frozen.get::<String>("choice->s").expect("get"), "hi");
        assert!(frozen.at("choice->i").is_empty());
        assert_eq!(frozen.get::<String>("choice->i"), Err(Error::NoField));
    }

    #[test]
    fn any_dereferences_stored_value() {
        let mut v = nested();
        let inner = {
            let mut x = TypeDef::new(TypeCode::UInt32).create().expect("create");
            x.set("", 7u32).expect("set");
            x.freeze().expect("freeze")
        };
        v.set("blob", inner).expect("assign");
        assert_eq!(v.get::<u32>("blob->").expect("deref"), 7);
        // unset Any dereferences to the empty handle
        let w = nested();
        assert!(w.at("blob->").is_empty());
    }

    #[test]
    fn syntax_errors_are_silent() {
        let v = nested();
        assert!(v.at("choice.s").is_empty()); // missing ->
        assert!(v.at("value->x").is_empty()); // scalar has no members
        assert!(v.at("alarm.bogus").is_empty());
        assert!(v.at("[0]").is_empty());
    }

    #[test]
    fn compound_array_indexing_on_frozen_views() {
        let mut v = TypeDef::compound(
            TypeCode::Struct,
            "",
            vec![m::struct_a("points", "point_t", vec![m::float64("x")])],
        )
        .create()
        .expect("create");

        let mut elements = Vec::new();
        {
            let arr = v.at("points");
            for x in [1.0f64, 2.0] {
                let mut e = arr.alloc_member().expect("alloc");
                e.set("x", x).expect("set");
                elements.push(e.freeze().expect("freeze element"));
            }
        }
        v.set("points", elements).expect("assign array");

        let frozen = v.freeze().expect("freeze");
        assert_eq!(frozen.get::<f64>("points[1]x").expect("get"), 2.0);
        assert_eq!(frozen.get::<f64>("points[1].x").expect("get"), 2.0);
        assert!(frozen.at("points[2]").is_empty());
    }

    fn selection_of(v: &MutValue, path: &str) -> Option<String> {
        v.at(path).selection()
    }

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn frozen_values_are_shareable() {
        assert_send_sync::<Value>();
    }
}
