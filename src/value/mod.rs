// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value handles.
//!
//! A value handle pairs shared ownership of a [`StorageTop`] with the index
//! of one node inside it. Sub-views returned by navigation alias the same
//! storage, so the storage lives as long as any handle into it.
//!
//! Two roles:
//!
//! - [`MutValue`] is the single-owner builder view. It is deliberately not
//!   `Send`: concurrent mutation of one value is a defect, and the type
//!   system enforces it.
//! - [`Value`] is the frozen, read-only view, safe to share across threads.
//!
//! [`MutValue::freeze`] moves a uniquely-owned builder into the frozen
//! form; [`Value::thaw`] goes back, transferring when unique and cloning
//! otherwise.
//!
//! The *empty* handle references no storage. Navigating through it stays
//! empty and silent; reading or writing through it fails with
//! [`Error::NoField`].

mod convert;
mod display;
mod traverse;

pub use convert::{Datum, FromDatum};

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::{copy_subtree, FieldStorage, Node, StorageTop, StoreVal, TreeView};
use crate::typecode::{StoreKind, TypeCode};
use crate::typedesc::Type;

pub(crate) type MutTop = Rc<RefCell<StorageTop<MutValue>>>;

/// Mutable reference into a structure field.
#[derive(Clone, Default)]
pub struct MutValue {
    pub(crate) inner: Option<(MutTop, usize)>,
}

/// Immutable reference into a frozen structure field.
#[derive(Clone, Default)]
pub struct Value {
    pub(crate) inner: Option<(Arc<StorageTop<Value>>, usize)>,
}

impl Node for MutValue {
    fn empty() -> Self {
        MutValue::default()
    }

    fn view<R>(&self, f: impl FnOnce(Option<TreeView<'_, Self>>) -> R) -> R {
        match &self.inner {
            None => f(None),
            Some((top, index)) => {
                let guard = top.borrow();
                f(Some(TreeView {
                    descs: &guard.descs,
                    root: guard.root,
                    cells: &guard.cells,
                    index: *index,
                }))
            }
        }
    }

    fn as_frozen(&self) -> Option<Value> {
        None
    }
}

impl Node for Value {
    fn empty() -> Self {
        Value::default()
    }

    fn view<R>(&self, f: impl FnOnce(Option<TreeView<'_, Self>>) -> R) -> R {
        match &self.inner {
            None => f(None),
            Some((top, index)) => f(Some(TreeView {
                descs: &top.descs,
                root: top.root,
                cells: &top.cells,
                index: *index,
            })),
        }
    }

    fn as_frozen(&self) -> Option<Value> {
        Some(self.clone())
    }
}

macro_rules! impl_common_readers {
    ($ty:ident) => {
        impl $ty {
            /// The empty handle.
            pub fn empty() -> $ty {
                <$ty as Node>::empty()
            }

            /// Does this handle reference any storage?
            pub fn is_empty(&self) -> bool {
                self.inner.is_none()
            }

            /// Type of the referenced field, or Null for the empty handle.
            pub fn type_code(&self) -> TypeCode {
                self.view(|v| v.map_or(TypeCode::Null, |v| v.node().code()))
            }

            /// Storage category of the referenced field.
            pub fn store_kind(&self) -> StoreKind {
                self.view(|v| v.map_or(StoreKind::Null, |v| v.cell().store.kind()))
            }

            /// Type ID string (Struct/Union/Any only; empty otherwise).
            pub fn id(&self) -> Result<String> {
                self.view(|v| match v {
                    None => Err(Error::NoField),
                    Some(v) => Ok(v.node().id().to_owned()),
                })
            }

            /// Test a prefix of the type ID string.
            pub fn id_starts_with(&self, prefix: &str) -> bool {
                self.view(|v| v.is_some_and(|v| v.node().id().starts_with(prefix)))
            }

            /// The type rooted at this handle's node.
            pub fn value_type(&self) -> Option<Type> {
                self.view(|v| v.map(|v| Type::new(v.descs.clone(), v.index)))
            }

            /// Test whether this field is marked, optionally looking at
            /// ancestors and/or descendants.
            pub fn is_marked(&self, parents: bool, children: bool) -> bool {
                self.view(|v| {
                    let Some(v) = v else { return false };
                    if v.cell().valid {
                        return true;
                    }
                    if parents
                        && v.ancestors()
                            .into_iter()
                            .any(|a| v.cells[a - v.root].valid)
                    {
                        return true;
                    }
                    if children {
                        let base = v.index - v.root;
                        let count = v.node().size();
                        return v.cells[base..base + count].iter().any(|c| c.valid);
                    }
                    false
                })
            }

            /// For a selected Union field, the name of the chosen
            /// alternative.
            pub fn selection(&self) -> Option<String> {
                self.view(|v| {
                    let v = v?;
                    let node = v.node();
                    if node.code() != TypeCode::Union {
                        return None;
                    }
                    let StoreVal::Compound(nested) = &v.cell().store else {
                        return None;
                    };
                    let choice = nested.view(|n| n.map(|n| n.index))?;
                    node.children()
                        .iter()
                        .find(|(_, start)| *start == choice)
                        .map(|(name, _)| name.clone())
                })
            }

            /// Allocate new storage of the same shape and deep-copy every
            /// valid leaf, marks included.
            pub fn clone_value(&self) -> MutValue {
                <Self as Node>::deep_copy(self, true)
            }

            /// Allocate new storage of the same shape with all marks clear.
            pub fn clone_empty(&self) -> MutValue {
                self.view(|v| match v {
                    None => MutValue::empty(),
                    Some(v) => {
                        MutValue::from_top(StorageTop::alloc(v.descs.clone(), v.index))
                    }
                })
            }

            /// Read the leaf through the conversion matrix, after
            /// navigating `path` (`""` reads this handle itself).
            pub fn get<T: FromDatum>(&self, path: &str) -> Result<T> {
                let target = self.at(path);
                T::from_datum(target.copy_out(T::KIND)?)
            }

            /// Extract the leaf as the requested storage kind.
            pub fn copy_out(&self, kind: StoreKind) -> Result<Datum> {
                self.view(|v| match v {
                    None => Err(Error::NoField),
                    Some(v) => convert::copy_out_view(v, kind),
                })
            }
        }
    };
}

impl_common_readers!(MutValue);
impl_common_readers!(Value);

impl MutValue {
    /// Allocate storage for a type; used by [`Type::create`].
    pub(crate) fn build(ty: &Type) -> MutValue {
        MutValue::from_top(StorageTop::alloc(ty.tree.clone(), ty.root))
    }

    pub(crate) fn from_top(top: StorageTop<MutValue>) -> MutValue {
        let index = top.root;
        MutValue {
            inner: Some((Rc::new(RefCell::new(top)), index)),
        }
    }

    /// Write the leaf through the conversion matrix after navigating
    /// `path`, marking the cell on success.
    pub fn set<T: Into<Datum>>(&mut self, path: &str, value: T) -> Result<()> {
        let mut target = self.at(path);
        target.copy_in(value.into())
    }

    /// Store a generic leaf datum into this field, marking it on success.
    pub fn copy_in(&mut self, datum: Datum) -> Result<()> {
        let Some((top, index)) = &self.inner else {
            return Err(Error::NoField);
        };
        let mut guard = top.borrow_mut();
        let guard = &mut *guard;
        let cell_index = *index - guard.root;
        let node = guard.descs.node(*index);
        convert::copy_in_cell(node, &mut guard.cells[cell_index], datum)
    }

    /// Mark this field, optionally propagating to ancestors and/or
    /// descendants.
    pub fn mark(&mut self, parents: bool, children: bool) {
        self.set_marks(true, parents, children);
    }

    /// Remove marks from this field, optionally propagating.
    pub fn unmark(&mut self, parents: bool, children: bool) {
        self.set_marks(false, parents, children);
    }

    fn set_marks(&mut self, value: bool, parents: bool, children: bool) {
        let Some((top, index)) = &self.inner else {
            return;
        };
        let ancestors = self.view(|v| v.map(|v| v.ancestors()).unwrap_or_default());
        let mut guard = top.borrow_mut();
        let guard = &mut *guard;
        let base = *index - guard.root;
        let count = guard.descs.node(*index).size();
        guard.cells[base].valid = value;
        if children {
            for cell in &mut guard.cells[base..base + count] {
                cell.valid = value;
            }
        }
        if parents {
            for a in ancestors {
                guard.cells[a - guard.root].valid = value;
            }
        }
    }

    /// Exchange this mutable handle for an immutable one.
    ///
    /// This handle must be the only reference to the underlying storage;
    /// [`Error::NotUnique`] otherwise. Nested values selected into Union
    /// and Any fields are frozen along with the tree.
    pub fn freeze(self) -> Result<Value> {
        let Some((top, index)) = self.inner else {
            return Ok(Value::empty());
        };
        let top = Rc::try_unwrap(top)
            .map_err(|_| Error::NotUnique)?
            .into_inner();
        Ok(Value {
            inner: Some((Arc::new(freeze_top(top)?), index)),
        })
    }

    /// Copy valid leaves from a structurally matching value, setting marks
    /// on the destination.
    pub fn assign(&mut self, other: &Value) -> Result<()> {
        let Some((top, index)) = self.inner.clone() else {
            return Err(Error::NoField);
        };
        let Some((otop, oindex)) = &other.inner else {
            return Err(Error::NoField);
        };
        let descs = top.borrow().descs.clone();
        let dst_node = descs.node(index);
        let src_node = otop.descs.node(*oindex);

        if dst_node.hash() != src_node.hash() {
            // conversion fallback for simple scalar leaves
            let src_kind = other.store_kind();
            if dst_node.size() == 1
                && !matches!(src_kind, StoreKind::Null | StoreKind::Compound)
            {
                let datum = other.copy_out(src_kind).map_err(|_| Error::TypeMismatch)?;
                return self.copy_in(datum).map_err(|_| Error::TypeMismatch);
            }
            return Err(Error::TypeMismatch);
        }

        let src_view = TreeView {
            descs: &otop.descs,
            root: otop.root,
            cells: &otop.cells,
            index: *oindex,
        };
        let copied = copy_subtree(src_view, true);
        let mut guard = top.borrow_mut();
        let base = index - guard.root;
        for (i, cell) in copied.cells.into_iter().enumerate() {
            if cell.valid {
                guard.cells[base + i] = cell;
            }
        }
        Ok(())
    }

    /// Allocate a fresh mutable element for an array of Struct or Union.
    pub fn alloc_member(&self) -> Result<MutValue> {
        self.view(|v| {
            let v = v.ok_or(Error::NoField)?;
            let node = v.node();
            if !matches!(node.code(), TypeCode::StructA | TypeCode::UnionA) {
                return Err(Error::NoConvert);
            }
            let members = node.members().ok_or(Error::NoConvert)?;
            Ok(MutValue::from_top(StorageTop::alloc(members.clone(), 0)))
        })
    }

    /// Allocate a fresh mutable value of one Union alternative without
    /// selecting it; used internally by navigation.
    pub(crate) fn alloc_at(tree: Arc<crate::typedesc::TypeTree>, index: usize) -> MutValue {
        MutValue::from_top(StorageTop::alloc(tree, index))
    }
}

impl Value {
    /// Exchange this immutable handle for a mutable one: a transfer when
    /// this is the only reference, a deep clone otherwise.
    pub fn thaw(self) -> MutValue {
        let Some((top, index)) = self.inner else {
            return MutValue::empty();
        };
        match Arc::try_unwrap(top) {
            Ok(top) => MutValue {
                inner: Some((Rc::new(RefCell::new(thaw_top(top))), index)),
            },
            Err(top) => {
                let restored = Value {
                    inner: Some((top, index)),
                };
                restored.deep_copy(false)
            }
        }
    }
}

fn freeze_top(top: StorageTop<MutValue>) -> Result<StorageTop<Value>> {
    let mut cells = Vec::with_capacity(top.cells.len());
    for cell in top.cells {
        let store = match cell.store {
            StoreVal::Null => StoreVal::Null,
            StoreVal::Bool(v) => StoreVal::Bool(v),
            StoreVal::Int(v) => StoreVal::Int(v),
            StoreVal::UInt(v) => StoreVal::UInt(v),
            StoreVal::Real(v) => StoreVal::Real(v),
            StoreVal::Str(s) => StoreVal::Str(s),
            StoreVal::Compound(nested) => StoreVal::Compound(nested.freeze()?),
            StoreVal::Array(a) => StoreVal::Array(a),
        };
        cells.push(FieldStorage {
            store,
            valid: cell.valid,
        });
    }
    Ok(StorageTop {
        descs: top.descs,
        root: top.root,
        cells,
    })
}

fn thaw_top(top: StorageTop<Value>) -> StorageTop<MutValue> {
    let mut cells = Vec::with_capacity(top.cells.len());
    for cell in top.cells {
        let store = match cell.store {
            StoreVal::Null => StoreVal::Null,
            StoreVal::Bool(v) => StoreVal::Bool(v),
            StoreVal::Int(v) => StoreVal::Int(v),
            StoreVal::UInt(v) => StoreVal::UInt(v),
            StoreVal::Real(v) => StoreVal::Real(v),
            StoreVal::Str(s) => StoreVal::Str(s),
            StoreVal::Compound(nested) => StoreVal::Compound(nested.thaw()),
            StoreVal::Array(a) => StoreVal::Array(a),
        };
        cells.push(FieldStorage {
            store,
            valid: cell.valid,
        });
    }
    StorageTop {
        descs: top.descs,
        root: top.root,
        cells,
    }
}

pub(crate) fn eq_views<A: Node, B: Node>(a: TreeView<'_, A>, b: TreeView<'_, B>) -> bool {
    let an = a.node();
    let bn = b.node();
    if an.hash() != bn.hash() {
        return false;
    }
    let count = an.size();
    let (abase, bbase) = (a.index - a.root, b.index - b.root);
    for i in 0..count {
        if !eq_stores(&a.cells[abase + i].store, &b.cells[bbase + i].store) {
            return false;
        }
    }
    true
}

fn eq_stores<A: Node, B: Node>(a: &StoreVal<A>, b: &StoreVal<B>) -> bool {
    match (a, b) {
        (StoreVal::Null, StoreVal::Null) => true,
        (StoreVal::Bool(x), StoreVal::Bool(y)) => x == y,
        (StoreVal::Int(x), StoreVal::Int(y)) => x == y,
        (StoreVal::UInt(x), StoreVal::UInt(y)) => x == y,
        (StoreVal::Real(x), StoreVal::Real(y)) => x == y,
        (StoreVal::Str(x), StoreVal::Str(y)) => x == y,
        (StoreVal::Array(x), StoreVal::Array(y)) => x == y,
        (StoreVal::Compound(x), StoreVal::Compound(y)) => x.view(|xv| {
            y.view(|yv| match (xv, yv) {
                (None, None) => true,
                (Some(xv), Some(yv)) => eq_views(xv, yv),
                _ => false,
            })
        }),
        _ => false,
    }
}

macro_rules! impl_eq {
    ($lhs:ident, $rhs:ident) => {
        impl PartialEq<$rhs> for $lhs {
            fn eq(&self, other: &$rhs) -> bool {
                self.view(|a| {
                    other.view(|b| match (a, b) {
                        (None, None) => true,
                        (Some(a), Some(b)) => eq_views(a, b),
                        _ => false,
                    })
                })
            }
        }
    };
}

impl_eq!(Value, Value);
impl_eq!(MutValue, MutValue);
impl_eq!(Value, MutValue);
impl_eq!(MutValue, Value);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{members as m, TypeDef};
    use crate::typecode::TypeCode;

    fn two_field() -> MutValue {
        TypeDef::compound(
            TypeCode::Struct,
            "",
            vec![m::int32("value"), m::string("label")],
        )
        .create()
        .expect("create")
    }

    #[test]
    fn build_and_read_back() {
        let mut v = two_field();
        v.set("value", 42i32).expect("set value");
        v.set("label", "hello").expect("set label");
        assert_eq!(v.get::<i32>("value").expect("get value"), 42);
        assert_eq!(v.get::<String>("label").expect("get label"), "hello");
    }

    #[test]
    fn empty_handle_is_silent() {
        let v = two_field();
        let missing = v.at("nonexistent");
        assert!(missing.is_empty());
        assert!(missing.at("deeper.path").is_empty());
        assert_eq!(missing.get::<i32>(""), Err(Error::NoField));
        let mut missing = v.at("nonexistent");
        assert_eq!(missing.copy_in(Datum::Int(1)), Err(Error::NoField));
    }

    #[test]
    fn freeze_requires_unique_ownership() {
        let v = two_field();
        let alias = v.at("value");
        let v = match v.freeze() {
            Err(Error::NotUnique) => {
                drop(alias);
                two_field()
            }
            other => panic!("freeze with live alias: {:?}", other.map(|_| ())),
        };
        let frozen = v.freeze().expect("freeze unique");
        assert_eq!(frozen.type_code(), TypeCode::Struct);
    }

    #[test]
    fn thaw_shared_clones() {
        let mut v = two_field();
        v.set("value", 7i32).expect("set");
        let frozen = v.freeze().expect("freeze");
        let other = frozen.clone();
        let mut thawed = frozen.thaw(); // shared -> clone
        thawed.set("value", 8i32).expect("set thawed");
        assert_eq!(other.get::<i32>("value").expect("get"), 7);
        assert_eq!(thawed.get::<i32>("value").expect("get"), 8);
    }

    #[test]
    fn marks_propagate() {
        let mut v = TypeDef::compound(
            TypeCode::Struct,
            "",
            vec![m::struct_("a", "", vec![m::int32("b")])],
        )
        .create()
        .expect("create");
        assert!(!v.is_marked(false, true));
        v.set("a.b", 1i32).expect("set");
        assert!(v.is_marked(false, true));
        assert!(v.at("a.b").is_marked(false, false));
        assert!(!v.is_marked(false, false));
        assert!(v.at("a.b").is_marked(true, false) || v.at("a.b").is_marked(false, false));
        let mut leaf = v.at("a.b");
        leaf.unmark(false, true);
        assert!(!v.is_marked(false, true));
    }

    #[test]
    fn clone_value_copies_valid_leaves() {
        let mut v = two_field();
        v.set("value", 5i32).expect("set");
        let copy = v.clone_value();
        assert_eq!(copy.get::<i32>("value").expect("get"), 5);
        assert!(copy.at("value").is_marked(false, false));
        assert!(!copy.at("label").is_marked(false, false));
        let empty = v.clone_empty();
        assert!(!empty.is_marked(false, true));
        assert_eq!(empty.get::<i32>("value").expect("get"), 0);
    }

    #[test]
    fn assign_matching_shape() {
        let mut src = two_field();
        src.set("value", 13i32).expect("set");
        let src = src.freeze().expect("freeze");
        let mut dst = two_field();
        dst.assign(&src).expect("assign");
        assert_eq!(dst.get::<i32>("value").expect("get"), 13);
        assert!(dst.at("value").is_marked(false, false));
        assert!(!dst.at("label").is_marked(false, false));
    }

    #[test]
    fn assign_incompatible_fails() {
        let src = TypeDef::compound(TypeCode::Struct, "", vec![m::int32("other")])
            .create()
            .expect("create")
            .freeze()
            .expect("freeze");
        let mut dst = two_field();
        assert_eq!(dst.assign(&src), Err(Error::TypeMismatch));
    }

    #[test]
    fn assign_scalar_converts() {
        let src = {
            let mut v = TypeDef::new(TypeCode::Int32).create().expect("create");
            v.copy_in(Datum::Int(-3)).expect("copy_in");
            v.freeze().expect("freeze")
        };
        let mut dst = TypeDef::new(TypeCode::Float64).create().expect("create");
        dst.assign(&src).expect("assign converts");
        assert_eq!(dst.get::<f64>("").expect("get"), -3.0);
    }

    #[test]
    fn equality_ignores_marks() {
        let mut a = two_field();
        a.set("value", 1i32).expect("set");
        let mut b = two_field();
        b.set("value", 1i32).expect("set");
        b.set("label", "").expect("set label");
        assert_eq!(a, b); // same stores, different marks
        b.set("label", "x").expect("set label");
        assert_ne!(a, b);
    }
}
