// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type codes for self-describing values.
//!
//! A [`TypeCode`] is a single byte identifying a field's type on the wire
//! and in a type-description tree. The encoding packs the [`Kind`] into the
//! top three bits, an array flag at `0x08`, an unsigned flag at `0x04`, and
//! the width order (`size == 1 << order`) into the low two bits.

use std::fmt;

/// Groups of related types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    Bool = 0x00,
    Integer = 0x20,
    Real = 0x40,
    String = 0x60,
    Compound = 0x80,
    Null = 0xe0,
}

/// Storage category backing a cell for a given [`TypeCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// No associated storage (Struct nodes).
    Null,
    Bool,
    /// Signed integers, widened to `i64`.
    Integer,
    /// Unsigned integers, widened to `u64`.
    UInteger,
    /// `f32` and `f64`, widened to `f64`.
    Real,
    /// Owned UTF-8.
    String,
    /// A nested value (Union, Any).
    Compound,
    /// A type-erased shared array.
    Array,
}

/// A particular field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    Bool = 0x00,
    BoolA = 0x08,
    Int8 = 0x20,
    Int16 = 0x21,
    Int32 = 0x22,
    Int64 = 0x23,
    UInt8 = 0x24,
    UInt16 = 0x25,
    UInt32 = 0x26,
    UInt64 = 0x27,
    Int8A = 0x28,
    Int16A = 0x29,
    Int32A = 0x2a,
    Int64A = 0x2b,
    UInt8A = 0x2c,
    UInt16A = 0x2d,
    UInt32A = 0x2e,
    UInt64A = 0x2f,
    Float32 = 0x42,
    Float64 = 0x43,
    Float32A = 0x4a,
    Float64A = 0x4b,
    String = 0x60,
    StringA = 0x68,
    Struct = 0x80,
    Union = 0x81,
    Any = 0x82,
    StructA = 0x88,
    UnionA = 0x89,
    AnyA = 0x8a,
    // 0xfd..0xfe are wire control bytes, not types
    Null = 0xff,
}

impl TypeCode {
    /// Decode a raw wire byte. Returns `None` for bytes that do not name a
    /// type (including the wire control bytes).
    pub fn from_u8(b: u8) -> Option<TypeCode> {
        use TypeCode::*;
        Some(match b {
            0x00 => Bool,
            0x08 => BoolA,
            0x20 => Int8,
            0x21 => Int16,
            0x22 => Int32,
            0x23 => Int64,
            0x24 => UInt8,
            0x25 => UInt16,
            0x26 => UInt32,
            0x27 => UInt64,
            0x28 => Int8A,
            0x29 => Int16A,
            0x2a => Int32A,
            0x2b => Int64A,
            0x2c => UInt8A,
            0x2d => UInt16A,
            0x2e => UInt32A,
            0x2f => UInt64A,
            0x42 => Float32,
            0x43 => Float64,
            0x4a => Float32A,
            0x4b => Float64A,
            0x60 => String,
            0x68 => StringA,
            0x80 => Struct,
            0x81 => Union,
            0x82 => Any,
            0x88 => StructA,
            0x89 => UnionA,
            0x8a => AnyA,
            0xff => Null,
            _ => return None,
        })
    }

    /// Group this code belongs to.
    pub fn kind(self) -> Kind {
        match self as u8 & 0xe0 {
            0x00 => Kind::Bool,
            0x20 => Kind::Integer,
            0x40 => Kind::Real,
            0x60 => Kind::String,
            0x80 => Kind::Compound,
            _ => Kind::Null,
        }
    }

    /// Width order; `size() == 1 << order()`.
    pub fn order(self) -> u8 {
        self as u8 & 3
    }

    /// Size in bytes for the simple kinds (Bool, Integer, Real).
    pub fn size(self) -> usize {
        1usize << self.order()
    }

    /// For Integer kind.
    pub fn is_unsigned(self) -> bool {
        self as u8 & 0x04 != 0
    }

    /// For all kinds.
    pub fn is_array(self) -> bool {
        self != TypeCode::Null && self as u8 & 0x08 != 0
    }

    /// The array type with this element type, if one exists.
    pub fn array_of(self) -> Option<TypeCode> {
        TypeCode::from_u8(self as u8 | 0x08).filter(|c| c.is_array())
    }

    /// The element type of this array type.
    pub fn scalar_of(self) -> Option<TypeCode> {
        if self.is_array() {
            TypeCode::from_u8(self as u8 & !0x08)
        } else {
            Some(self)
        }
    }

    /// Storage category used by cells of this type.
    pub fn store_kind(self) -> StoreKind {
        if self == TypeCode::Null {
            StoreKind::Null
        } else if self.is_array() {
            StoreKind::Array
        } else {
            match self.kind() {
                Kind::Bool => StoreKind::Bool,
                Kind::Integer if self.is_unsigned() => StoreKind::UInteger,
                Kind::Integer => StoreKind::Integer,
                Kind::Real => StoreKind::Real,
                Kind::String => StoreKind::String,
                Kind::Compound if self == TypeCode::Struct => StoreKind::Null,
                Kind::Compound => StoreKind::Compound,
                Kind::Null => StoreKind::Null,
            }
        }
    }

    /// Display name, e.g. `"int32_t"` or `"string[]"`.
    pub fn name(self) -> &'static str {
        use TypeCode::*;
        match self {
            Bool => "bool",
            BoolA => "bool[]",
            Int8 => "int8_t",
            Int16 => "int16_t",
            Int32 => "int32_t",
            Int64 => "int64_t",
            UInt8 => "uint8_t",
            UInt16 => "uint16_t",
            UInt32 => "uint32_t",
            UInt64 => "uint64_t",
            Int8A => "int8_t[]",
            Int16A => "int16_t[]",
            Int32A => "int32_t[]",
            Int64A => "int64_t[]",
            UInt8A => "uint8_t[]",
            UInt16A => "uint16_t[]",
            UInt32A => "uint32_t[]",
            UInt64A => "uint64_t[]",
            Float32 => "float",
            Float64 => "double",
            Float32A => "float[]",
            Float64A => "double[]",
            String => "string",
            StringA => "string[]",
            Struct => "struct",
            Union => "union",
            Any => "any",
            StructA => "struct[]",
            UnionA => "union[]",
            AnyA => "any[]",
            Null => "null",
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_bits() {
        assert_eq!(TypeCode::Bool.kind(), Kind::Bool);
        assert_eq!(TypeCode::Int32.kind(), Kind::Integer);
        assert_eq!(TypeCode::UInt64A.kind(), Kind::Integer);
        assert_eq!(TypeCode::Float64.kind(), Kind::Real);
        assert_eq!(TypeCode::StringA.kind(), Kind::String);
        assert_eq!(TypeCode::Union.kind(), Kind::Compound);
        assert_eq!(TypeCode::Null.kind(), Kind::Null);
    }

    #[test]
    fn width_and_sign() {
        assert_eq!(TypeCode::Int8.size(), 1);
        assert_eq!(TypeCode::Int16.size(), 2);
        assert_eq!(TypeCode::UInt32.size(), 4);
        assert_eq!(TypeCode::Int64.size(), 8);
        assert_eq!(TypeCode::Float64.size(), 8);
        assert!(TypeCode::UInt16.is_unsigned());
        assert!(!TypeCode::Int16.is_unsigned());
    }

    #[test]
    fn array_flag_round_trip() {
        assert_eq!(TypeCode::Int32.array_of(), Some(TypeCode::Int32A));
        assert_eq!(TypeCode::Int32A.scalar_of(), Some(TypeCode::Int32));
        assert_eq!(TypeCode::Struct.array_of(), Some(TypeCode::StructA));
        assert!(TypeCode::Int32A.is_array());
        assert!(!TypeCode::Int32.is_array());
        assert!(!TypeCode::Null.is_array());
    }

    #[test]
    fn byte_round_trip() {
        for b in 0..=255u8 {
            if let Some(c) = TypeCode::from_u8(b) {
                assert_eq!(c as u8, b);
            }
        }
        assert_eq!(TypeCode::from_u8(0x2a), Some(TypeCode::Int32A));
        assert_eq!(TypeCode::from_u8(0xfd), None);
        assert_eq!(TypeCode::from_u8(0xfe), None);
    }

    #[test]
    fn store_kinds() {
        assert_eq!(TypeCode::Struct.store_kind(), StoreKind::Null);
        assert_eq!(TypeCode::Union.store_kind(), StoreKind::Compound);
        assert_eq!(TypeCode::Any.store_kind(), StoreKind::Compound);
        assert_eq!(TypeCode::StructA.store_kind(), StoreKind::Array);
        assert_eq!(TypeCode::Int32.store_kind(), StoreKind::Integer);
        assert_eq!(TypeCode::UInt8.store_kind(), StoreKind::UInteger);
        assert_eq!(TypeCode::Bool.store_kind(), StoreKind::Bool);
        assert_eq!(TypeCode::Float32.store_kind(), StoreKind::Real);
        assert_eq!(TypeCode::String.store_kind(), StoreKind::String);
    }
}
