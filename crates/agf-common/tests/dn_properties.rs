//! Property-based tests for the DN wire form.

use agf_common::dn::{I24_MAX, I24_MIN, U24_MAX};
use agf_common::{
    BoolDn, ChannelType, DnValue, FloatDn, RawDn, SignedDn, StatusDn, UnsignedDn, UnsignedKind,
};
use proptest::prelude::*;

fn unsigned_kind() -> impl Strategy<Value = UnsignedKind> {
    prop_oneof![
        Just(UnsignedKind::UnsignedInt),
        Just(UnsignedKind::Digital),
        Just(UnsignedKind::Time),
    ]
}

fn bool_dn() -> impl Strategy<Value = BoolDn> {
    any::<bool>().prop_flat_map(|v| {
        prop_oneof![
            Just(BoolDn::B8(v)),
            Just(BoolDn::B16(v)),
            Just(BoolDn::B32(v)),
            Just(BoolDn::B64(v)),
        ]
    })
}

fn signed_dn() -> impl Strategy<Value = SignedDn> {
    prop_oneof![
        any::<i8>().prop_map(SignedDn::I8),
        any::<i16>().prop_map(SignedDn::I16),
        (I24_MIN..=I24_MAX).prop_map(SignedDn::I24),
        any::<i32>().prop_map(SignedDn::I32),
        any::<i64>().prop_map(SignedDn::I64),
    ]
}

fn unsigned_dn() -> impl Strategy<Value = UnsignedDn> {
    prop_oneof![
        any::<u8>().prop_map(UnsignedDn::U8),
        any::<u16>().prop_map(UnsignedDn::U16),
        (0..=U24_MAX).prop_map(UnsignedDn::U24),
        any::<u32>().prop_map(UnsignedDn::U32),
        any::<u64>().prop_map(UnsignedDn::U64),
    ]
}

fn status_dn() -> impl Strategy<Value = StatusDn> {
    prop_oneof![
        any::<i8>().prop_map(StatusDn::S8),
        any::<i16>().prop_map(StatusDn::S16),
        any::<i32>().prop_map(StatusDn::S32),
        any::<i64>().prop_map(StatusDn::S64),
    ]
}

fn float_dn() -> impl Strategy<Value = FloatDn> {
    prop_oneof![
        (-1.0e30f32..1.0e30f32).prop_map(FloatDn::F32),
        (-1.0e300f64..1.0e300f64).prop_map(FloatDn::F64),
    ]
}

fn dn_value() -> impl Strategy<Value = DnValue> {
    prop_oneof![
        "[ -~]{0,24}".prop_map(DnValue::Ascii),
        bool_dn().prop_map(DnValue::Boolean),
        signed_dn().prop_map(DnValue::SignedInt),
        (unsigned_kind(), unsigned_dn()).prop_map(|(k, u)| DnValue::Unsigned(k, u)),
        float_dn().prop_map(DnValue::Float),
        status_dn().prop_map(DnValue::Status),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Every type and width decodes back to the value that was encoded.
    #[test]
    fn dn_survives_wire_form(value in dn_value()) {
        let raw = value.encode();
        prop_assert_eq!(raw.width, value.width());
        prop_assert_eq!(ChannelType::from_code(raw.type_code), Some(value.channel_type()));
        let decoded = DnValue::decode(&raw).unwrap();
        prop_assert_eq!(decoded, value);
    }

    /// Widths outside the supported set are rejected for numeric types.
    #[test]
    fn unsupported_width_rejected(
        type_code in 2u8..=8,
        width in any::<u8>().prop_filter("unsupported width", |w| ![8, 16, 24, 32, 64].contains(w)),
    ) {
        let raw = RawDn { type_code, width, payload: vec![0; 8] };
        prop_assert!(DnValue::decode(&raw).is_err());
    }
}

#[test]
fn boundary_values_decode_exactly() {
    let cases = [
        DnValue::SignedInt(SignedDn::I8(i8::MIN)),
        DnValue::SignedInt(SignedDn::I24(I24_MIN)),
        DnValue::SignedInt(SignedDn::I24(I24_MAX)),
        DnValue::SignedInt(SignedDn::I64(i64::MAX)),
        DnValue::Unsigned(UnsignedKind::UnsignedInt, UnsignedDn::U24(U24_MAX)),
        DnValue::Unsigned(UnsignedKind::Time, UnsignedDn::U64(u64::MAX)),
        DnValue::Status(StatusDn::S64(i64::MIN)),
        DnValue::Float(FloatDn::F32(f32::MAX)),
        DnValue::Float(FloatDn::F64(f64::MIN_POSITIVE)),
    ];
    for value in cases {
        assert_eq!(DnValue::decode(&value.encode()).unwrap(), value);
    }
    assert_eq!(
        DnValue::Unsigned(UnsignedKind::Digital, UnsignedDn::U64(u64::MAX)).display(),
        "18446744073709551615"
    );
}
