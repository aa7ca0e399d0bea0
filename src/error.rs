// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.

use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while defining types, accessing values, and moving them
/// over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Navigation reached an empty value, or a path named a member that
    /// does not exist.
    #[error("no such field")]
    NoField,

    /// Leaf I/O or array assignment between incompatible storage kinds.
    #[error("no conversion defined")]
    NoConvert,

    /// Assignment between structurally incompatible values.
    #[error("incompatible value types")]
    TypeMismatch,

    /// Freeze attempted while other handles still reference the storage.
    #[error("value storage is not uniquely owned")]
    NotUnique,

    /// Truncated buffer, unknown type code, bad selector, unresolved cache
    /// tag, or a declared size running past the end of the buffer.
    #[error("malformed wire data: {0}")]
    BadWire(String),

    /// The serializer was handed a value it cannot represent.
    #[error("cannot serialize: {0}")]
    BadOutput(&'static str),

    /// A type definition that cannot be finalized.
    #[error("invalid type definition: {0}")]
    InvalidType(String),
}

impl Error {
    pub(crate) fn bad_wire(reason: impl Into<String>) -> Self {
        Error::BadWire(reason.into())
    }
}
