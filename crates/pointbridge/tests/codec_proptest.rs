use chrono::DateTime;
use pointbridge::codec::{decode, encode};
use pointbridge::{DoubleBitPos, PointValue, TypeKind};
use proptest::prelude::*;

/// Every value the codec can carry in both directions
fn representable_value() -> impl Strategy<Value = PointValue> {
    prop_oneof![
        any::<f32>()
            .prop_filter("finite", |v| v.is_finite())
            .prop_map(PointValue::Float32),
        any::<f64>()
            .prop_filter("finite", |v| v.is_finite())
            .prop_map(PointValue::Float64),
        any::<i8>().prop_map(PointValue::Int8),
        any::<u8>().prop_map(PointValue::Int8U),
        any::<i16>().prop_map(PointValue::Int16),
        any::<u16>().prop_map(PointValue::Int16U),
        any::<i32>().prop_map(PointValue::Int32),
        any::<u32>().prop_map(PointValue::Int32U),
        any::<i64>().prop_map(PointValue::Int64),
        prop_oneof![Just(DoubleBitPos::OFF), Just(DoubleBitPos::ON)]
            .prop_map(PointValue::DoubleBitPos),
        (-8_000_000_000_000i64..8_000_000_000_000i64).prop_map(|ms| {
            PointValue::Timestamp(DateTime::from_timestamp_millis(ms).unwrap())
        }),
    ]
}

proptest! {
    #[test]
    fn test_decode_inverts_encode(value in representable_value()) {
        let kind = value.kind();
        let text = encode(&kind, &value).unwrap();
        prop_assert_eq!(decode(&kind, &text).unwrap(), value);
    }

    #[test]
    fn test_decode_never_panics(kind_idx in 0usize..12, text in ".*") {
        let kinds = [
            TypeKind::Float32, TypeKind::Float64, TypeKind::Int8, TypeKind::Int8U,
            TypeKind::Int16, TypeKind::Int16U, TypeKind::Int32, TypeKind::Int32U,
            TypeKind::Int64, TypeKind::DoubleBitPos, TypeKind::Timestamp, TypeKind::Quality,
        ];
        let _ = decode(&kinds[kind_idx], &text);
    }
}

#[test]
fn test_bad_double_bit_pos_is_lossy() {
    let kind = TypeKind::DoubleBitPos;
    let text = encode(&kind, &PointValue::DoubleBitPos(DoubleBitPos::BAD)).unwrap();
    assert_eq!(
        decode(&kind, &text).unwrap(),
        PointValue::DoubleBitPos(DoubleBitPos::OFF)
    );
}
