// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rpva-data — dynamic structured values for PV Access style networks
//!
//! The data core of a network data-access stack: self-describing
//! hierarchical values which clients and servers construct, inspect,
//! mutate, and exchange on the wire.
//!
//! ## Quick Start
//!
//! ```rust
//! use rpva_data::{members as m, ByteOrder, EncodeBuf, TypeCode, TypeDef};
//!
//! // describe a type at runtime
//! let def = TypeDef::compound(TypeCode::Struct, "reading_t", vec![
//!     m::float64("temperature"),
//!     m::string("units"),
//! ]);
//!
//! // instantiate and fill a value
//! let mut value = def.create()?;
//! value.set("temperature", 23.5f64)?;
//! value.set("units", "C")?;
//! assert_eq!(value.get::<f64>("temperature")?, 23.5);
//!
//! // freeze into a shareable snapshot and serialize it
//! let snapshot = value.freeze()?;
//! let mut buf = EncodeBuf::new(ByteOrder::Big);
//! rpva_data::to_wire_full(&mut buf, &snapshot)?;
//! # Ok::<(), rpva_data::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                     transport / server layers                    |
//! |         (connections, channels, subscriptions; not here)         |
//! +------------------------------------------------------------------+
//! |  wire codec   | type descriptions with per-connection TypeStore  |
//! |               | values, full and delta-with-bitmask              |
//! +------------------------------------------------------------------+
//! |  value layer  | MutValue (builder) <-> Value (frozen, shareable) |
//! |               | navigation, conversion matrix, change marks      |
//! +------------------------------------------------------------------+
//! |  description  | TypeCode -> TypeDesc tree -> Type                |
//! |  + storage    | flattened depth-first cells, shared arrays       |
//! +------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeDef`] / [`Member`] | Fluent runtime construction of type descriptions |
//! | [`Type`] | Finalized, immutable, structurally hashed description |
//! | [`MutValue`] | Single-owner builder view of a value tree |
//! | [`Value`] | Frozen view, `Send + Sync`, cheap to alias |
//! | [`TypeStore`] | Per-connection cache avoiding type retransmission |
//! | [`BitMask`] | Addresses changed cells in delta payloads |
//!
//! Both value views navigate with [`MutValue::at`]/[`Value::at`] using
//! dotted member paths, `->` for union and any fields, `[N]` for elements
//! of structured arrays, and `<` to step back out.

pub mod array;
mod bitmask;
mod builder;
mod error;
mod limits;
/// Normative type definitions (NTScalar and friends).
pub mod nt;
mod storage;
mod typecode;
mod typedesc;
mod value;
mod wire;

pub use array::{ArrayElement, ErasedArray, SharedArray};
pub use bitmask::BitMask;
pub use builder::{members, Member, TypeDef};
pub use error::{Error, Result};
pub use limits::Limits;
pub use typecode::{Kind, StoreKind, TypeCode};
pub use typedesc::{Type, TypeDesc};
pub use value::{Datum, FromDatum, MutValue, Value};
pub use wire::{
    from_wire_full, from_wire_type, from_wire_type_value, from_wire_valid, to_wire_full,
    to_wire_type, to_wire_type_value, to_wire_valid, ByteOrder, DecodeBuf, EncodeBuf, TypeStore,
};
