//! The wirepack value model.

use std::fmt;

use uuid::Uuid;

/// A value carried by the wire format.
///
/// The primitive variants map one-to-one onto MessagePack types; the
/// remaining variants are native kinds carried in extension frames so that
/// any MessagePack reader can still parse the primitive subset.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Signed integer. Non-negative values encode through the unsigned
    /// forms on the wire; see `codec::encode`.
    Int(i64),
    /// Unsigned integer, needed for the range above `i64::MAX`.
    UInt(u64),
    /// Always encoded as a 64-bit IEEE-754 double, never narrowed.
    Float(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    /// Ordered key/value pairs. Keys may be any value kind; insertion
    /// order is preserved on decode but ignored by equality.
    Map(Vec<(Value, Value)>),
    // Extension kinds
    Timestamp(Timestamp),
    Date(Date),
    Time(Time),
    Duration(Duration),
    /// Arbitrary-precision decimal, carried as lossless decimal text.
    Decimal(String),
    Uuid(Uuid),
    Enum(EnumMember),
    Record(Record),
    /// Named-tuple-like record: same shape as `Record`, distinct wire tag.
    NamedTuple(Record),
    /// Unordered collection; equality ignores element order.
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    Tuple(Vec<Value>),
    /// User-registered custom type. Encoding requires a registry entry
    /// for `qualifier`.
    Custom(Custom),
}

impl Value {
    /// Returns the value as a string reference, if it is a `Str` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it is an integer that fits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bin(_) => "bin",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Timestamp(_) => "timestamp",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Duration(_) => "duration",
            Self::Decimal(_) => "decimal",
            Self::Uuid(_) => "uuid",
            Self::Enum(_) => "enum",
            Self::Record(_) => "record",
            Self::NamedTuple(_) => "named tuple",
            Self::Set(_) => "set",
            Self::FrozenSet(_) => "frozen set",
            Self::Tuple(_) => "tuple",
            Self::Custom(_) => "custom",
        }
    }
}

// -- Extension payload structures --

/// An instant: seconds since the Unix epoch plus nanoseconds within the
/// second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

/// A calendar date in the proleptic Gregorian calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

/// A time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanos: u32,
}

/// A signed span of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: u32,
}

/// An enumeration member: the enum's type name plus the member name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub type_name: String,
    pub member: String,
}

/// A structured record: type qualifier plus ordered named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub qualifier: String,
    pub fields: Vec<(String, Value)>,
}

/// A value of a user-registered custom type. The inner payload is whatever
/// shape the registered encode/decode pair works with.
#[derive(Debug, Clone, PartialEq)]
pub struct Custom {
    pub qualifier: String,
    pub payload: Box<Value>,
}

// -- Equality --
//
// Structural, with three deliberate deviations: a non-negative `Int` equals
// the same magnitude `UInt` (the wire cannot tell them apart), and map,
// set and frozen-set comparison ignores order.

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Int(a), Self::UInt(b)) | (Self::UInt(b), Self::Int(a)) => {
                *a >= 0 && *a as u64 == *b
            }
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bin(a), Self::Bin(b)) => a == b,
            (Self::Array(a), Self::Array(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => unordered_pairs_eq(a, b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            (Self::NamedTuple(a), Self::NamedTuple(b)) => a == b,
            (Self::Set(a), Self::Set(b)) | (Self::FrozenSet(a), Self::FrozenSet(b)) => {
                unordered_eq(a, b)
            }
            (Self::Custom(a), Self::Custom(b)) => a == b,
            _ => false,
        }
    }
}

/// Multiset equality over key/value pairs.
fn unordered_pairs_eq(a: &[(Value, Value)], b: &[(Value, Value)]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    for pair in a {
        let Some(i) = b
            .iter()
            .enumerate()
            .position(|(i, other)| !used[i] && pair == other)
        else {
            return false;
        };
        used[i] = true;
    }
    true
}

/// Multiset equality over elements.
fn unordered_eq(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    for item in a {
        let Some(i) = b
            .iter()
            .enumerate()
            .position(|(i, other)| !used[i] && item == other)
        else {
            return false;
        };
        used[i] = true;
    }
    true
}

// -- Convenience conversions --

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bin(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(pairs: Vec<(Value, Value)>) -> Self {
        Self::Map(pairs)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Self::Record(r)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bin(b) => write!(f, "<{} bytes>", b.len()),
            Self::Array(items) | Self::Tuple(items) => write_items(f, "[", items, "]"),
            Self::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Timestamp(t) => write!(f, "timestamp({}.{:09})", t.seconds, t.nanos),
            Self::Date(d) => write!(f, "{:04}-{:02}-{:02}", d.year, d.month, d.day),
            Self::Time(t) => write!(f, "{:02}:{:02}:{:02}.{:09}", t.hour, t.minute, t.second, t.nanos),
            Self::Duration(d) => write!(f, "duration({}s {}ns)", d.seconds, d.nanos),
            Self::Decimal(s) => write!(f, "decimal({s})"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Enum(e) => write!(f, "{}.{}", e.type_name, e.member),
            Self::Record(r) => write!(f, "{}{{{} fields}}", r.qualifier, r.fields.len()),
            Self::NamedTuple(r) => write!(f, "{}({} fields)", r.qualifier, r.fields.len()),
            Self::Set(items) => write_items(f, "{", items, "}"),
            Self::FrozenSet(items) => write_items(f, "frozenset{", items, "}"),
            Self::Custom(c) => write!(f, "{}({})", c.qualifier, c.payload),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_uint_cross_equality() {
        assert_eq!(Value::Int(5), Value::UInt(5));
        assert_eq!(Value::UInt(5), Value::Int(5));
        assert_ne!(Value::Int(-1), Value::UInt(u64::MAX));
        assert_ne!(Value::Int(-5), Value::UInt(5));
    }

    #[test]
    fn map_equality_ignores_order() {
        let a = Value::Map(vec![
            ("a".into(), Value::Int(1)),
            ("b".into(), Value::Int(2)),
        ]);
        let b = Value::Map(vec![
            ("b".into(), Value::Int(2)),
            ("a".into(), Value::Int(1)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn map_equality_respects_multiplicity() {
        let a = Value::Map(vec![
            ("a".into(), Value::Int(1)),
            ("a".into(), Value::Int(1)),
        ]);
        let b = Value::Map(vec![
            ("a".into(), Value::Int(1)),
            ("b".into(), Value::Int(2)),
        ]);
        assert_ne!(a, b);
    }

    #[test]
    fn set_equality_ignores_order() {
        let a = Value::Set(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let b = Value::Set(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert_eq!(a, b);
        // A plain array is order-sensitive.
        let c = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let d = Value::Array(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(c, d);
    }
}
