//! Encoding: `Value` → bytes.

use bytes::{BufMut, BytesMut};

use super::marker;
use crate::error::PackError;
use crate::registry;
use crate::types::{tag, Value};

/// Appends one self-delimiting frame for `value` to the buffer.
///
/// Prior buffer contents are never read, so repeated calls build a valid
/// multi-frame stream.
pub fn encode_value(buf: &mut BytesMut, value: &Value) -> Result<(), PackError> {
    match value {
        Value::Nil => buf.put_u8(marker::NIL),
        Value::Bool(b) => buf.put_u8(if *b { marker::TRUE } else { marker::FALSE }),
        Value::Int(i) => encode_int(buf, *i),
        Value::UInt(u) => encode_uint(buf, *u),
        Value::Float(f) => encode_float(buf, *f),
        Value::Str(s) => encode_str(buf, s)?,
        Value::Bin(b) => encode_bin(buf, b)?,
        Value::Array(items) => encode_array(buf, items)?,
        Value::Map(pairs) => encode_map(buf, pairs)?,
        Value::Timestamp(t) => encode_ext(
            buf,
            tag::TIMESTAMP,
            &Value::Array(vec![Value::Int(t.seconds), Value::UInt(u64::from(t.nanos))]),
        )?,
        Value::Date(d) => encode_ext(
            buf,
            tag::DATE,
            &Value::Array(vec![
                Value::Int(i64::from(d.year)),
                Value::UInt(u64::from(d.month)),
                Value::UInt(u64::from(d.day)),
            ]),
        )?,
        Value::Time(t) => encode_ext(
            buf,
            tag::TIME,
            &Value::Array(vec![
                Value::UInt(u64::from(t.hour)),
                Value::UInt(u64::from(t.minute)),
                Value::UInt(u64::from(t.second)),
                Value::UInt(u64::from(t.nanos)),
            ]),
        )?,
        Value::Duration(d) => encode_ext(
            buf,
            tag::DURATION,
            &Value::Array(vec![Value::Int(d.seconds), Value::UInt(u64::from(d.nanos))]),
        )?,
        Value::Decimal(s) => encode_ext(buf, tag::DECIMAL, &Value::Str(s.clone()))?,
        Value::Uuid(u) => encode_ext(buf, tag::UUID, &Value::Bin(u.as_bytes().to_vec()))?,
        Value::Enum(e) => encode_ext(
            buf,
            tag::ENUM,
            &Value::Array(vec![
                Value::Str(e.type_name.clone()),
                Value::Str(e.member.clone()),
            ]),
        )?,
        Value::Record(r) => encode_ext(buf, tag::RECORD, &record_payload(r))?,
        Value::NamedTuple(r) => encode_ext(buf, tag::NAMED_TUPLE, &record_payload(r))?,
        Value::Set(items) => encode_ext(buf, tag::SET, &Value::Array(items.clone()))?,
        Value::FrozenSet(items) => encode_ext(buf, tag::FROZEN_SET, &Value::Array(items.clone()))?,
        Value::Tuple(items) => encode_ext(buf, tag::TUPLE, &Value::Array(items.clone()))?,
        Value::Custom(c) => {
            let encode_fn = registry::resolve_encoder(&c.qualifier)?;
            let fields = encode_fn(&c.payload)?;
            encode_ext(
                buf,
                tag::CUSTOM,
                &Value::Array(vec![Value::Str(c.qualifier.clone()), fields]),
            )?;
        }
    }
    Ok(())
}

/// Encodes a signed integer in the smallest exactly-representing form.
///
/// The deterministic width rule: non-negative values always take the
/// unsigned ladder (positive fixint, uint 8/16/32/64); negative values take
/// the signed ladder (negative fixint, int 8/16/32/64).
pub fn encode_int(buf: &mut BytesMut, value: i64) {
    if value >= 0 {
        encode_uint(buf, value as u64);
    } else if value >= -32 {
        // NEGATIVE_FIXINT: single byte 0xE0..=0xFF
        buf.put_u8(value as u8);
    } else if value >= i64::from(i8::MIN) {
        buf.put_u8(marker::INT_8);
        buf.put_i8(value as i8);
    } else if value >= i64::from(i16::MIN) {
        buf.put_u8(marker::INT_16);
        buf.put_i16(value as i16);
    } else if value >= i64::from(i32::MIN) {
        buf.put_u8(marker::INT_32);
        buf.put_i32(value as i32);
    } else {
        buf.put_u8(marker::INT_64);
        buf.put_i64(value);
    }
}

/// Encodes an unsigned integer in the smallest exactly-representing form.
pub fn encode_uint(buf: &mut BytesMut, value: u64) {
    if value <= 0x7F {
        // POSITIVE_FIXINT: single byte
        buf.put_u8(value as u8);
    } else if value <= u64::from(u8::MAX) {
        buf.put_u8(marker::UINT_8);
        buf.put_u8(value as u8);
    } else if value <= u64::from(u16::MAX) {
        buf.put_u8(marker::UINT_16);
        buf.put_u16(value as u16);
    } else if value <= u64::from(u32::MAX) {
        buf.put_u8(marker::UINT_32);
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(marker::UINT_64);
        buf.put_u64(value);
    }
}

pub fn encode_float(buf: &mut BytesMut, value: f64) {
    buf.put_u8(marker::FLOAT_64);
    buf.put_f64(value);
}

/// Encodes a string (size = UTF-8 byte length, not char count).
pub fn encode_str(buf: &mut BytesMut, value: &str) -> Result<(), PackError> {
    encode_str_header(buf, value.len())?;
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn encode_str_header(buf: &mut BytesMut, len: usize) -> Result<(), PackError> {
    if len <= 31 {
        buf.put_u8(marker::FIXSTR_BITS | len as u8);
    } else if len <= 255 {
        buf.put_u8(marker::STR_8);
        buf.put_u8(len as u8);
    } else if len <= 65535 {
        buf.put_u8(marker::STR_16);
        buf.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(marker::STR_32);
        buf.put_u32(len as u32);
    } else {
        return Err(PackError::Oversized { kind: "str", len });
    }
    Ok(())
}

pub fn encode_bin(buf: &mut BytesMut, value: &[u8]) -> Result<(), PackError> {
    encode_bin_header(buf, value.len())?;
    buf.put_slice(value);
    Ok(())
}

fn encode_bin_header(buf: &mut BytesMut, len: usize) -> Result<(), PackError> {
    if len <= 255 {
        buf.put_u8(marker::BIN_8);
        buf.put_u8(len as u8);
    } else if len <= 65535 {
        buf.put_u8(marker::BIN_16);
        buf.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(marker::BIN_32);
        buf.put_u32(len as u32);
    } else {
        return Err(PackError::Oversized { kind: "bin", len });
    }
    Ok(())
}

fn encode_array(buf: &mut BytesMut, items: &[Value]) -> Result<(), PackError> {
    let len = items.len();
    if len <= 15 {
        buf.put_u8(marker::FIXARRAY_NIBBLE | len as u8);
    } else if len <= 65535 {
        buf.put_u8(marker::ARRAY_16);
        buf.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(marker::ARRAY_32);
        buf.put_u32(len as u32);
    } else {
        return Err(PackError::Oversized { kind: "array", len });
    }
    for item in items {
        encode_value(buf, item)?;
    }
    Ok(())
}

fn encode_map(buf: &mut BytesMut, pairs: &[(Value, Value)]) -> Result<(), PackError> {
    let len = pairs.len();
    if len <= 15 {
        buf.put_u8(marker::FIXMAP_NIBBLE | len as u8);
    } else if len <= 65535 {
        buf.put_u8(marker::MAP_16);
        buf.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(marker::MAP_32);
        buf.put_u32(len as u32);
    } else {
        return Err(PackError::Oversized { kind: "map", len });
    }
    for (key, value) in pairs {
        encode_value(buf, key)?;
        encode_value(buf, value)?;
    }
    Ok(())
}

/// Encodes an extension frame: the payload value is framed into a scratch
/// buffer first so the length class can be chosen from its exact byte size.
fn encode_ext(buf: &mut BytesMut, tag_byte: i8, payload: &Value) -> Result<(), PackError> {
    let mut body = BytesMut::new();
    encode_value(&mut body, payload)?;
    let len = body.len();
    match len {
        1 => buf.put_u8(marker::FIXEXT_1),
        2 => buf.put_u8(marker::FIXEXT_2),
        4 => buf.put_u8(marker::FIXEXT_4),
        8 => buf.put_u8(marker::FIXEXT_8),
        16 => buf.put_u8(marker::FIXEXT_16),
        _ if len <= 255 => {
            buf.put_u8(marker::EXT_8);
            buf.put_u8(len as u8);
        }
        _ if len <= 65535 => {
            buf.put_u8(marker::EXT_16);
            buf.put_u16(len as u16);
        }
        _ if len <= u32::MAX as usize => {
            buf.put_u8(marker::EXT_32);
            buf.put_u32(len as u32);
        }
        _ => return Err(PackError::Oversized { kind: "extension payload", len }),
    }
    buf.put_i8(tag_byte);
    buf.put_slice(&body);
    Ok(())
}

fn record_payload(r: &crate::types::Record) -> Value {
    let fields = r
        .fields
        .iter()
        .map(|(name, value)| (Value::Str(name.clone()), value.clone()))
        .collect();
    Value::Array(vec![Value::Str(r.qualifier.clone()), Value::Map(fields)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn packed(value: &Value) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_value(&mut buf, value).expect("encode failed");
        buf
    }

    #[test]
    fn encode_nil_marker() {
        assert_eq!(&packed(&Value::Nil)[..], &[0xC0]);
    }

    #[test]
    fn encode_booleans() {
        assert_eq!(&packed(&Value::Bool(true))[..], &[0xC3]);
        assert_eq!(&packed(&Value::Bool(false))[..], &[0xC2]);
    }

    #[test]
    fn encode_positive_fixint() {
        assert_eq!(&packed(&Value::Int(0))[..], &[0x00]);
        assert_eq!(&packed(&Value::Int(1))[..], &[0x01]);
        // 127 must be exactly one byte.
        assert_eq!(&packed(&Value::Int(127))[..], &[0x7F]);
    }

    #[test]
    fn encode_negative_fixint() {
        assert_eq!(&packed(&Value::Int(-1))[..], &[0xFF]);
        assert_eq!(&packed(&Value::Int(-32))[..], &[0xE0]);
    }

    #[test]
    fn encode_uint8_boundary() {
        // 128 escalates to uint8, never stays fixint.
        assert_eq!(&packed(&Value::Int(128))[..], &[marker::UINT_8, 0x80]);
        assert_eq!(&packed(&Value::Int(255))[..], &[marker::UINT_8, 0xFF]);
    }

    #[test]
    fn encode_uint_ladder() {
        assert_eq!(&packed(&Value::Int(256))[..], &[marker::UINT_16, 0x01, 0x00]);
        assert_eq!(
            &packed(&Value::Int(65536))[..],
            &[marker::UINT_32, 0x00, 0x01, 0x00, 0x00]
        );
        let v = u64::from(u32::MAX) + 1;
        let expected = v.to_be_bytes();
        let buf = packed(&Value::UInt(v));
        assert_eq!(buf[0], marker::UINT_64);
        assert_eq!(&buf[1..], &expected);
    }

    #[test]
    fn encode_uint64_max() {
        let buf = packed(&Value::UInt(u64::MAX));
        assert_eq!(buf[0], marker::UINT_64);
        assert_eq!(&buf[1..], &[0xFF; 8]);
    }

    #[test]
    fn encode_int_ladder() {
        assert_eq!(&packed(&Value::Int(-33))[..], &[marker::INT_8, (-33i8) as u8]);
        assert_eq!(&packed(&Value::Int(-128))[..], &[marker::INT_8, 0x80]);
        let expected = (-129i16).to_be_bytes();
        assert_eq!(
            &packed(&Value::Int(-129))[..],
            &[marker::INT_16, expected[0], expected[1]]
        );
        let expected = (-32769i32).to_be_bytes();
        assert_eq!(
            &packed(&Value::Int(-32769))[..],
            &[marker::INT_32, expected[0], expected[1], expected[2], expected[3]]
        );
        let v = i64::from(i32::MIN) - 1;
        let expected = v.to_be_bytes();
        let buf = packed(&Value::Int(v));
        assert_eq!(buf[0], marker::INT_64);
        assert_eq!(&buf[1..], &expected);
    }

    #[test]
    fn encode_float64() {
        let buf = packed(&Value::Float(1.23));
        assert_eq!(buf[0], marker::FLOAT_64);
        assert_eq!(&buf[1..], &1.23f64.to_be_bytes());
    }

    #[test]
    fn encode_fixstr() {
        assert_eq!(&packed(&Value::Str(String::new()))[..], &[0xA0]);
        assert_eq!(&packed(&"A".into())[..], &[0xA1, 0x41]);
        let s = "a".repeat(31);
        let buf = packed(&Value::Str(s));
        assert_eq!(buf[0], 0xBF);
        assert_eq!(buf.len(), 32);
    }

    #[test]
    fn encode_str8() {
        let s = "a".repeat(32);
        let buf = packed(&Value::Str(s.clone()));
        assert_eq!(buf[0], marker::STR_8);
        assert_eq!(buf[1], 32);
        assert_eq!(&buf[2..], s.as_bytes());
    }

    #[test]
    fn encode_bin8() {
        assert_eq!(
            &packed(&Value::Bin(vec![0xDE, 0xAD]))[..],
            &[marker::BIN_8, 0x02, 0xDE, 0xAD]
        );
    }

    #[test]
    fn encode_fixarray() {
        assert_eq!(&packed(&Value::Array(vec![]))[..], &[0x90]);
        let items = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        assert_eq!(&packed(&Value::Array(items))[..], &[0x93, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn encode_array16() {
        let items: Vec<Value> = (0..16i64).map(Value::Int).collect();
        let buf = packed(&Value::Array(items));
        assert_eq!(&buf[..3], &[marker::ARRAY_16, 0x00, 0x10]);
    }

    #[test]
    fn encode_fixmap() {
        assert_eq!(&packed(&Value::Map(vec![]))[..], &[0x80]);
        let pairs = vec![("a".into(), Value::Int(1))];
        assert_eq!(&packed(&Value::Map(pairs))[..], &[0x81, 0xA1, 0x61, 0x01]);
    }

    #[test]
    fn encode_timestamp_ext_frame() {
        // Payload [0, 0] is a 3-byte frame: 0x92 0x00 0x00 → ext8.
        let buf = packed(&Value::Timestamp(Timestamp { seconds: 0, nanos: 0 }));
        assert_eq!(
            &buf[..],
            &[marker::EXT_8, 0x03, tag::TIMESTAMP as u8, 0x92, 0x00, 0x00]
        );
    }

    #[test]
    fn encode_decimal_fixext() {
        // "1" encodes as 0xA1 0x31: a 2-byte payload → fixext2.
        let buf = packed(&Value::Decimal("1".into()));
        assert_eq!(&buf[..], &[marker::FIXEXT_2, tag::DECIMAL as u8, 0xA1, 0x31]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_length_rejected() {
        // Lengths past u32::MAX have no length class; the header writers
        // must fail instead of emitting a wrapped, corrupt length.
        let len = u32::MAX as usize + 1;
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_str_header(&mut buf, len),
            Err(PackError::Oversized { kind: "str", .. })
        ));
        assert!(matches!(
            encode_bin_header(&mut buf, len),
            Err(PackError::Oversized { kind: "bin", .. })
        ));
    }

    #[test]
    fn compact_against_json_text() {
        let map = Value::Map(vec![
            ("name".into(), "Ana".into()),
            ("age".into(), Value::Int(30)),
            ("active".into(), Value::Bool(true)),
        ]);
        let packed_len = packed(&map).len();
        let json_len = r#"{"name":"Ana","age":30,"active":true}"#.len();
        // Regression threshold: at least 30% smaller than the JSON text.
        assert!(
            packed_len * 10 <= json_len * 7,
            "packed {packed_len} bytes vs json {json_len} bytes"
        );
    }
}
