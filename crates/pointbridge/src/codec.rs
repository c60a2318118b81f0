use crate::error::{BridgeError, Result};
use crate::types::{DoubleBitPos, PointValue, TypeKind, Validity};
use chrono::DateTime;
use std::str::FromStr;

/// Convert store text into a typed value of the declared kind
///
/// Every store→model conversion goes through here; there is no per-point
/// special casing.
pub fn decode(kind: &TypeKind, text: &str) -> Result<PointValue> {
    let value = match kind {
        TypeKind::Float32 => PointValue::Float32(parse_num(kind, text)?),
        TypeKind::Float64 => PointValue::Float64(parse_num(kind, text)?),
        TypeKind::Int8 => PointValue::Int8(parse_num(kind, text)?),
        TypeKind::Int8U => PointValue::Int8U(parse_num(kind, text)?),
        TypeKind::Int16 => PointValue::Int16(parse_num(kind, text)?),
        TypeKind::Int16U => PointValue::Int16U(parse_num(kind, text)?),
        TypeKind::Int32 => PointValue::Int32(parse_num(kind, text)?),
        TypeKind::Int32U => PointValue::Int32U(parse_num(kind, text)?),
        TypeKind::Int64 => PointValue::Int64(parse_num(kind, text)?),
        TypeKind::DoubleBitPos => PointValue::DoubleBitPos(match text {
            "0" => DoubleBitPos::OFF,
            "1" => DoubleBitPos::ON,
            _ => DoubleBitPos::BAD,
        }),
        TypeKind::Timestamp => {
            let millis: i64 = parse_num(kind, text)?;
            let time = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                BridgeError::mismatch(kind, format!("timestamp {} out of range", millis))
            })?;
            PointValue::Timestamp(time)
        }
        TypeKind::Quality => PointValue::Quality(match text {
            "1" => Validity::Good,
            _ => Validity::Invalid,
        }),
        TypeKind::Unsupported(_) => {
            return Err(BridgeError::mismatch(kind, "no store conversion for this type"));
        }
    };
    Ok(value)
}

/// Convert a typed model value into store text
///
/// The value must match the declared kind. Quality has no model→store form.
pub fn encode(kind: &TypeKind, value: &PointValue) -> Result<String> {
    if value.kind() != *kind {
        return Err(BridgeError::mismatch(
            kind,
            format!("model delivered a {} value", value.kind()),
        ));
    }

    let text = match value {
        PointValue::Float32(v) => v.to_string(),
        PointValue::Float64(v) => v.to_string(),
        PointValue::Int8(v) => v.to_string(),
        PointValue::Int8U(v) => v.to_string(),
        PointValue::Int16(v) => v.to_string(),
        PointValue::Int16U(v) => v.to_string(),
        PointValue::Int32(v) => v.to_string(),
        PointValue::Int32U(v) => v.to_string(),
        PointValue::Int64(v) => v.to_string(),
        // OFF wins over ON when both bits are set
        PointValue::DoubleBitPos(pos) => {
            if pos.off_bit() {
                "0".to_string()
            } else if pos.on_bit() {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        PointValue::Timestamp(time) => time.timestamp_millis().to_string(),
        PointValue::Quality(_) => {
            return Err(BridgeError::mismatch(kind, "quality is not written back"));
        }
    };
    Ok(text)
}

/// Numeric text tolerates surrounding whitespace; enumerations do not
fn parse_num<T: FromStr>(kind: &TypeKind, text: &str) -> Result<T> {
    text.trim()
        .parse::<T>()
        .map_err(|_| BridgeError::mismatch(kind, format!("cannot parse '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_decode_numbers() {
        assert_eq!(
            decode(&TypeKind::Float32, "12.5").unwrap(),
            PointValue::Float32(12.5)
        );
        assert_eq!(
            decode(&TypeKind::Float64, "0.1").unwrap(),
            PointValue::Float64(0.1)
        );
        assert_eq!(decode(&TypeKind::Int8, "-128").unwrap(), PointValue::Int8(-128));
        assert_eq!(decode(&TypeKind::Int8U, "255").unwrap(), PointValue::Int8U(255));
        assert_eq!(
            decode(&TypeKind::Int32U, "4294967295").unwrap(),
            PointValue::Int32U(u32::MAX)
        );
        assert_eq!(
            decode(&TypeKind::Int64, " 42 ").unwrap(),
            PointValue::Int64(42)
        );
    }

    #[test]
    fn test_decode_out_of_range_is_mismatch() {
        assert!(matches!(
            decode(&TypeKind::Int8, "128"),
            Err(BridgeError::TypeMismatch { .. })
        ));
        assert!(decode(&TypeKind::Int8U, "-1").is_err());
        assert!(decode(&TypeKind::Int16U, "65536").is_err());
        assert!(decode(&TypeKind::Int32, "abc").is_err());
        assert!(decode(&TypeKind::Float32, "").is_err());
    }

    #[test]
    fn test_decode_double_bit_pos() {
        assert_eq!(
            decode(&TypeKind::DoubleBitPos, "0").unwrap(),
            PointValue::DoubleBitPos(DoubleBitPos::OFF)
        );
        assert_eq!(
            decode(&TypeKind::DoubleBitPos, "1").unwrap(),
            PointValue::DoubleBitPos(DoubleBitPos::ON)
        );
        assert_eq!(
            decode(&TypeKind::DoubleBitPos, "2").unwrap(),
            PointValue::DoubleBitPos(DoubleBitPos::BAD)
        );
        assert_eq!(
            decode(&TypeKind::DoubleBitPos, " 1").unwrap(),
            PointValue::DoubleBitPos(DoubleBitPos::BAD)
        );
    }

    #[test]
    fn test_encode_double_bit_pos_precedence() {
        let kind = TypeKind::DoubleBitPos;
        let enc = |b: u8| encode(&kind, &PointValue::DoubleBitPos(DoubleBitPos(b))).unwrap();
        assert_eq!(enc(0xC0), "0");
        assert_eq!(enc(0x80), "1");
        assert_eq!(enc(0x40), "0");
        assert_eq!(enc(0x00), "0");
    }

    #[test]
    fn test_timestamp() {
        let kind = TypeKind::Timestamp;
        let value = decode(&kind, "1500000000123").unwrap();
        let expected = Utc.timestamp_millis_opt(1_500_000_000_123).unwrap();
        assert_eq!(value, PointValue::Timestamp(expected));
        assert_eq!(encode(&kind, &value).unwrap(), "1500000000123");
    }

    #[test]
    fn test_quality_is_store_to_model_only() {
        let kind = TypeKind::Quality;
        assert_eq!(
            decode(&kind, "1").unwrap(),
            PointValue::Quality(Validity::Good)
        );
        assert_eq!(
            decode(&kind, "0").unwrap(),
            PointValue::Quality(Validity::Invalid)
        );
        assert_eq!(
            decode(&kind, "1 ").unwrap(),
            PointValue::Quality(Validity::Invalid)
        );
        assert!(encode(&kind, &PointValue::Quality(Validity::Good)).is_err());
    }

    #[test]
    fn test_unsupported_kind() {
        let kind = TypeKind::Unsupported("BOOLEAN".to_string());
        assert!(matches!(
            decode(&kind, "1"),
            Err(BridgeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_mismatched_value() {
        assert!(encode(&TypeKind::Int16, &PointValue::Float32(1.0)).is_err());
        assert_eq!(
            encode(&TypeKind::Int16, &PointValue::Int16(-7)).unwrap(),
            "-7"
        );
    }
}
