// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Byte-exact wire vectors for wire-format compliance verification.
//
// Each test encodes a known deterministic value, compares against the
// expected bytes inline, and verifies that decode -> re-encode is
// byte-identical to the original.

use rpva_data::{
    from_wire_full, members as m, to_wire_full, ByteOrder, DecodeBuf, EncodeBuf, Type, TypeCode,
    TypeDef, TypeStore, Value,
};

fn encode_full(value: &Value, order: ByteOrder) -> Vec<u8> {
    let mut buf = EncodeBuf::new(order);
    to_wire_full(&mut buf, value).expect("encode");
    buf.into_bytes()
}

/// Decode `bytes` into a fresh value of `ty`, re-encode, and require
/// byte-identical output.
fn assert_reencode_identity(ty: &Type, bytes: &[u8], order: ByteOrder) {
    let store = TypeStore::new();
    let mut out = ty.create();
    let mut dec = DecodeBuf::new(bytes, order);
    from_wire_full(&mut dec, &store, &mut out).expect("decode");
    assert!(dec.is_eof(), "decoder must consume the whole vector");
    let frozen = out.freeze().expect("freeze decoded");
    assert_eq!(encode_full(&frozen, order), bytes, "re-encode differs");
}

#[test]
fn scalar_widths_big_endian() {
    let ty = TypeDef::compound(
        TypeCode::Struct,
        "",
        vec![
            m::boolean("b"),
            m::int8("i8"),
            m::int16("i16"),
            m::uint32("u32"),
            m::int64("i64"),
        ],
    )
    .build()
    .expect("build");

    let mut v = ty.create();
    v.set("b", true).expect("set");
    v.set("i8", -2i8).expect("set");
    v.set("i16", -3i16).expect("set");
    v.set("u32", 0x01020304u32).expect("set");
    v.set("i64", 1i64).expect("set");
    let v = v.freeze().expect("freeze");

    let bytes = encode_full(&v, ByteOrder::Big);
    assert_eq!(
        bytes,
        vec![
            1, // bool
            0xfe, // -2
            0xff, 0xfd, // -3
            1, 2, 3, 4, // u32
            0, 0, 0, 0, 0, 0, 0, 1, // i64
        ]
    );
    assert_reencode_identity(&ty, &bytes, ByteOrder::Big);
}

#[test]
fn scalar_widths_little_endian() {
    let ty = TypeDef::compound(
        TypeCode::Struct,
        "",
        vec![m::uint32("u32"), m::float64("f64")],
    )
    .build()
    .expect("build");

    let mut v = ty.create();
    v.set("u32", 0x01020304u32).expect("set");
    v.set("f64", 1.0f64).expect("set");
    let v = v.freeze().expect("freeze");

    let bytes = encode_full(&v, ByteOrder::Little);
    assert_eq!(
        bytes,
        vec![
            4, 3, 2, 1, // u32 LE
            0, 0, 0, 0, 0, 0, 0xf0, 0x3f, // 1.0f64 LE
        ]
    );
    assert_reencode_identity(&ty, &bytes, ByteOrder::Little);
}

#[test]
fn strings_and_string_arrays() {
    let ty = TypeDef::compound(
        TypeCode::Struct,
        "",
        vec![m::string("s"), m::string_a("sa")],
    )
    .build()
    .expect("build");

    let mut v = ty.create();
    v.set("s", "hi").expect("set");
    v.set("sa", vec!["a".to_owned(), "bc".to_owned()]).expect("set");
    let v = v.freeze().expect("freeze");

    let bytes = encode_full(&v, ByteOrder::Big);
    assert_eq!(
        bytes,
        vec![
            2, b'h', b'i', // "hi"
            2, // two elements
            1, b'a', // "a"
            2, b'b', b'c', // "bc"
        ]
    );
    assert_reencode_identity(&ty, &bytes, ByteOrder::Big);
}

#[test]
fn scalar_array_elements_use_natural_width() {
    let ty = TypeDef::compound(TypeCode::Struct, "", vec![m::int16_a("d")])
        .build()
        .expect("build");

    let mut v = ty.create();
    v.set("d", vec![1i16, -1]).expect("set");
    let v = v.freeze().expect("freeze");

    let bytes = encode_full(&v, ByteOrder::Big);
    assert_eq!(bytes, vec![2, 0, 1, 0xff, 0xff]);
    assert_reencode_identity(&ty, &bytes, ByteOrder::Big);

    let le = encode_full(&v, ByteOrder::Little);
    assert_eq!(le, vec![2, 1, 0, 0xff, 0xff]);
}

#[test]
fn union_selector_and_payload() {
    let ty = TypeDef::compound(
        TypeCode::Struct,
        "",
        vec![m::union_(
            "choice",
            "",
            vec![m::int32("i"), m::string("s")],
        )],
    )
    .build()
    .expect("build");

    // unselected serializes as selector 0
    let empty = ty.create().freeze().expect("freeze");
    assert_eq!(encode_full(&empty, ByteOrder::Big), vec![0]);

    let mut v = ty.create();
    v.set("choice->i", 6i32).expect("select");
    let v = v.freeze().expect("freeze");
    let bytes = encode_full(&v, ByteOrder::Big);
    assert_eq!(bytes, vec![1, 0, 0, 0, 6]);
    assert_reencode_identity(&ty, &bytes, ByteOrder::Big);
}

#[test]
fn any_carries_embedded_type_or_null() {
    let ty = TypeDef::compound(TypeCode::Struct, "", vec![m::any("blob")])
        .build()
        .expect("build");

    // absent nested value is the null control byte
    let empty = ty.create().freeze().expect("freeze");
    assert_eq!(encode_full(&empty, ByteOrder::Big), vec![0xff]);

    let mut v = ty.create();
    let inner = {
        let mut b = TypeDef::new(TypeCode::Int32).create().expect("create");
        b.set("", 8i32).expect("set");
        b.freeze().expect("freeze")
    };
    v.set("blob", inner).expect("assign");
    let v = v.freeze().expect("freeze");

    let bytes = encode_full(&v, ByteOrder::Big);
    // embedded int32 type code, then the value
    assert_eq!(bytes, vec![0x22, 0, 0, 0, 8]);
    assert_reencode_identity(&ty, &bytes, ByteOrder::Big);
}

#[test]
fn embedded_type_description_layout() {
    // struct "" { int32 a } as an Any payload: code, id, count, name, child
    let ty = TypeDef::compound(TypeCode::Struct, "", vec![m::any("blob")])
        .build()
        .expect("build");

    let mut v = ty.create();
    let inner = {
        let mut b = TypeDef::compound(TypeCode::Struct, "", vec![m::int32("a")])
            .create()
            .expect("create");
        b.set("a", 1i32).expect("set");
        b.freeze().expect("freeze")
    };
    v.set("blob", inner).expect("assign");
    let v = v.freeze().expect("freeze");

    let bytes = encode_full(&v, ByteOrder::Big);
    assert_eq!(
        bytes,
        vec![
            0x80, // struct
            0,    // empty id
            1,    // one member
            1, b'a', // member name
            0x22, // int32
            0, 0, 0, 1, // the value
        ]
    );
    assert_reencode_identity(&ty, &bytes, ByteOrder::Big);
}

#[test]
fn delta_with_explicit_mask() {
    use rpva_data::{to_wire_valid, BitMask};

    let ty = TypeDef::compound(
        TypeCode::Struct,
        "",
        vec![m::int32("a"), m::int32("b")],
    )
    .build()
    .expect("build");

    let mut v = ty.create();
    v.set("a", 1i32).expect("set");
    v.set("b", 2i32).expect("set");
    let v = v.freeze().expect("freeze");

    // an explicit mask overrides the marks: send only "b"
    let mut mask = BitMask::new(3);
    mask.set(2, true);
    let mut buf = EncodeBuf::new(ByteOrder::Big);
    to_wire_valid(&mut buf, &v, Some(&mask)).expect("encode");
    assert_eq!(buf.as_slice(), &[3, 0b100, 0, 0, 0, 2]);
}

#[test]
fn root_struct_mask_bit_covers_whole_subtree() {
    use rpva_data::{from_wire_valid, to_wire_valid, BitMask};

    let ty = TypeDef::compound(
        TypeCode::Struct,
        "",
        vec![m::int32("a"), m::string("b")],
    )
    .build()
    .expect("build");

    let mut v = ty.create();
    v.set("a", 3i32).expect("set");
    v.set("b", "x").expect("set");
    let v = v.freeze().expect("freeze");

    let mut mask = BitMask::new(3);
    mask.set(0, true); // the root bit alone
    let mut buf = EncodeBuf::new(ByteOrder::Big);
    to_wire_valid(&mut buf, &v, Some(&mask)).expect("encode");
    assert_eq!(buf.as_slice(), &[3, 0b001, 0, 0, 0, 3, 1, b'x']);

    let store = TypeStore::new();
    let mut out = ty.create();
    let mut dec = DecodeBuf::new(buf.as_slice(), ByteOrder::Big);
    from_wire_valid(&mut dec, &store, &mut out).expect("decode");
    assert_eq!(out.get::<i32>("a").expect("a"), 3);
    assert_eq!(out.get::<String>("b").expect("b"), "x");
}
