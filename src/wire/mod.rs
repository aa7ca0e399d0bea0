// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire codec.
//!
//! Serializes type descriptions (with per-connection tag caching through a
//! [`TypeStore`]) and values (full and delta-with-bitmask forms) in either
//! byte order. Decoding never panics on malformed input: failures surface
//! as [`crate::Error::BadWire`] and leave the output value empty.

mod buf;
pub(crate) mod typecodec;
mod valuecodec;

pub use buf::{ByteOrder, DecodeBuf, EncodeBuf};
pub use typecodec::{to_wire_type, TypeStore};
pub use valuecodec::{
    from_wire_full, from_wire_type, from_wire_type_value, from_wire_valid, to_wire_full,
    to_wire_type_value, to_wire_valid,
};
