use crate::error::BridgeError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Separator marking a grouped-record ("hash") address: `container/field`
pub const FIELD_SEPARATOR: char = '/';

/// Functional constraint of an IEC 61850 data attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fc {
    St,
    Mx,
    Sp,
    Sv,
    Cf,
    Dc,
    Sg,
    Se,
    Sr,
    Or,
    Bl,
    Ex,
    Co,
}

impl Fc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fc::St => "ST",
            Fc::Mx => "MX",
            Fc::Sp => "SP",
            Fc::Sv => "SV",
            Fc::Cf => "CF",
            Fc::Dc => "DC",
            Fc::Sg => "SG",
            Fc::Se => "SE",
            Fc::Sr => "SR",
            Fc::Or => "OR",
            Fc::Bl => "BL",
            Fc::Ex => "EX",
            Fc::Co => "CO",
        }
    }
}

impl fmt::Display for Fc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Fc {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fc = match s.to_ascii_uppercase().as_str() {
            "ST" => Fc::St,
            "MX" => Fc::Mx,
            "SP" => Fc::Sp,
            "SV" => Fc::Sv,
            "CF" => Fc::Cf,
            "DC" => Fc::Dc,
            "SG" => Fc::Sg,
            "SE" => Fc::Se,
            "SR" => Fc::Sr,
            "OR" => Fc::Or,
            "BL" => Fc::Bl,
            "EX" => Fc::Ex,
            "CO" => Fc::Co,
            _ => {
                return Err(BridgeError::Resolution(format!(
                    "unknown functional constraint '{}'",
                    s
                )));
            }
        };
        Ok(fc)
    }
}

/// Identity of a model attribute: object reference plus functional constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeKey {
    pub reference: String,
    pub fc: Fc,
}

impl AttributeKey {
    pub fn new(reference: impl Into<String>, fc: Fc) -> Self {
        Self {
            reference: reference.into(),
            fc,
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.reference, self.fc)
    }
}

/// Store-side location of a point
///
/// A scalar key, or a field inside a grouped record. Which one is decided
/// once, at parse time, by the presence of [`FIELD_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreAddress {
    Key(String),
    Field { container: String, field: String },
}

impl StoreAddress {
    pub fn parse(s: &str) -> Result<Self, BridgeError> {
        if s.is_empty() {
            return Err(BridgeError::Resolution("empty store address".to_string()));
        }

        match s.split_once(FIELD_SEPARATOR) {
            None => Ok(StoreAddress::Key(s.to_string())),
            Some((container, field)) => {
                if container.is_empty() || field.is_empty() {
                    return Err(BridgeError::Resolution(format!(
                        "malformed record address '{}'",
                        s
                    )));
                }
                Ok(StoreAddress::Field {
                    container: container.to_string(),
                    field: field.to_string(),
                })
            }
        }
    }

    pub fn field(container: impl Into<String>, field: impl Into<String>) -> Self {
        StoreAddress::Field {
            container: container.into(),
            field: field.into(),
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, StoreAddress::Field { .. })
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreAddress::Key(key) => f.write_str(key),
            StoreAddress::Field { container, field } => {
                write!(f, "{}{}{}", container, FIELD_SEPARATOR, field)
            }
        }
    }
}

/// Closed set of value representations the codec understands
///
/// Declared model types outside this set are carried as `Unsupported` so the
/// entry still exists; the codec rejects them on every conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Float32,
    Float64,
    Int8,
    Int8U,
    Int16,
    Int16U,
    Int32,
    Int32U,
    Int64,
    DoubleBitPos,
    Timestamp,
    Quality,
    Unsupported(String),
}

impl TypeKind {
    /// Map a declared basic type name (as the model reports it) to a kind
    pub fn from_declared(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "FLOAT32" => TypeKind::Float32,
            "FLOAT64" => TypeKind::Float64,
            "INT8" => TypeKind::Int8,
            "INT8U" => TypeKind::Int8U,
            "INT16" => TypeKind::Int16,
            "INT16U" => TypeKind::Int16U,
            "INT32" => TypeKind::Int32,
            "INT32U" => TypeKind::Int32U,
            "INT64" => TypeKind::Int64,
            "DBPOS" => TypeKind::DoubleBitPos,
            "TIMESTAMP" => TypeKind::Timestamp,
            "QUALITY" => TypeKind::Quality,
            _ => TypeKind::Unsupported(name.to_string()),
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Float32 => "FLOAT32",
            TypeKind::Float64 => "FLOAT64",
            TypeKind::Int8 => "INT8",
            TypeKind::Int8U => "INT8U",
            TypeKind::Int16 => "INT16",
            TypeKind::Int16U => "INT16U",
            TypeKind::Int32 => "INT32",
            TypeKind::Int32U => "INT32U",
            TypeKind::Int64 => "INT64",
            TypeKind::DoubleBitPos => "Dbpos",
            TypeKind::Timestamp => "Timestamp",
            TypeKind::Quality => "Quality",
            TypeKind::Unsupported(name) => return write!(f, "unsupported({})", name),
        };
        f.write_str(name)
    }
}

/// Two-bit double point status, held in the top bits of one byte
///
/// Layout: `0x00` intermediate, `0x40` off, `0x80` on, `0xC0` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoubleBitPos(pub u8);

impl DoubleBitPos {
    pub const INTERMEDIATE: DoubleBitPos = DoubleBitPos(0x00);
    pub const OFF: DoubleBitPos = DoubleBitPos(0x40);
    pub const ON: DoubleBitPos = DoubleBitPos(0x80);
    pub const BAD: DoubleBitPos = DoubleBitPos(0xC0);

    pub fn off_bit(&self) -> bool {
        self.0 & Self::OFF.0 == Self::OFF.0
    }

    pub fn on_bit(&self) -> bool {
        self.0 & Self::ON.0 == Self::ON.0
    }
}

/// Validity part of an IEC 61850 quality attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Validity {
    Good,
    Invalid,
}

/// A typed value as held by the model
#[derive(Debug, Clone, PartialEq)]
pub enum PointValue {
    Float32(f32),
    Float64(f64),
    Int8(i8),
    Int8U(u8),
    Int16(i16),
    Int16U(u16),
    Int32(i32),
    Int32U(u32),
    Int64(i64),
    DoubleBitPos(DoubleBitPos),
    Timestamp(DateTime<Utc>),
    Quality(Validity),
}

impl PointValue {
    pub fn kind(&self) -> TypeKind {
        match self {
            PointValue::Float32(_) => TypeKind::Float32,
            PointValue::Float64(_) => TypeKind::Float64,
            PointValue::Int8(_) => TypeKind::Int8,
            PointValue::Int8U(_) => TypeKind::Int8U,
            PointValue::Int16(_) => TypeKind::Int16,
            PointValue::Int16U(_) => TypeKind::Int16U,
            PointValue::Int32(_) => TypeKind::Int32,
            PointValue::Int32U(_) => TypeKind::Int32U,
            PointValue::Int64(_) => TypeKind::Int64,
            PointValue::DoubleBitPos(_) => TypeKind::DoubleBitPos,
            PointValue::Timestamp(_) => TypeKind::Timestamp,
            PointValue::Quality(_) => TypeKind::Quality,
        }
    }
}
