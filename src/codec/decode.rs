//! Decoding: bytes → `Value`.
//!
//! Every declared length is validated against the remaining input before
//! the corresponding payload read, so the decoder never reads past the end
//! of the buffer, even speculatively.

use super::marker;
use crate::error::PackError;
use crate::registry;
use crate::types::{tag, Custom, Date, Duration, EnumMember, Record, Time, Timestamp, Value};

/// Decodes exactly one frame starting at `offset`.
///
/// Returns the reconstructed value and the number of bytes consumed; never
/// reads past `offset + consumed`.
pub fn decode_value(buf: &[u8], offset: usize) -> Result<(Value, usize), PackError> {
    let mut cursor = Cursor { data: buf, pos: offset };
    let value = read_value(&mut cursor)?;
    Ok((value, cursor.pos - offset))
}

/// Byte cursor with checked reads. All failures carry the absolute offset
/// at which the shortfall was detected.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PackError> {
        if self.remaining() < n {
            return Err(PackError::Truncated {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, PackError> {
        Ok(self.take(1)?[0])
    }

    fn take_i8(&mut self) -> Result<i8, PackError> {
        Ok(self.take(1)?[0] as i8)
    }

    fn take_u16(&mut self) -> Result<u16, PackError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn take_u32(&mut self) -> Result<u32, PackError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_u64(&mut self) -> Result<u64, PackError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn take_i16(&mut self) -> Result<i16, PackError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn take_i32(&mut self) -> Result<i32, PackError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_i64(&mut self) -> Result<i64, PackError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn take_f64(&mut self) -> Result<f64, PackError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }
}

fn read_value(cur: &mut Cursor<'_>) -> Result<Value, PackError> {
    let marker_offset = cur.pos;
    let m = cur.take_u8()?;
    match m {
        // POSITIVE_FIXINT
        0x00..=0x7F => Ok(Value::Int(i64::from(m))),

        // FIXMAP / FIXARRAY
        0x80..=0x8F => read_map(cur, usize::from(m & 0x0F)),
        0x90..=0x9F => read_array(cur, usize::from(m & 0x0F)),

        // FIXSTR
        0xA0..=0xBF => read_str(cur, usize::from(m & 0x1F)),

        marker::NIL => Ok(Value::Nil),
        marker::FALSE => Ok(Value::Bool(false)),
        marker::TRUE => Ok(Value::Bool(true)),

        // Binary
        marker::BIN_8 => {
            let len = usize::from(cur.take_u8()?);
            read_bin(cur, len)
        }
        marker::BIN_16 => {
            let len = usize::from(cur.take_u16()?);
            read_bin(cur, len)
        }
        marker::BIN_32 => {
            let len = cur.take_u32()? as usize;
            read_bin(cur, len)
        }

        // Extension, length-prefixed
        marker::EXT_8 => {
            let len = usize::from(cur.take_u8()?);
            read_ext(cur, len)
        }
        marker::EXT_16 => {
            let len = usize::from(cur.take_u16()?);
            read_ext(cur, len)
        }
        marker::EXT_32 => {
            let len = cur.take_u32()? as usize;
            read_ext(cur, len)
        }

        marker::FLOAT_64 => Ok(Value::Float(cur.take_f64()?)),

        // Unsigned integers. Values that fit i64 come back as Int so the
        // common case round-trips through the signed variant; only the
        // range above i64::MAX stays UInt.
        marker::UINT_8 => Ok(Value::Int(i64::from(cur.take_u8()?))),
        marker::UINT_16 => Ok(Value::Int(i64::from(cur.take_u16()?))),
        marker::UINT_32 => Ok(Value::Int(i64::from(cur.take_u32()?))),
        marker::UINT_64 => {
            let v = cur.take_u64()?;
            match i64::try_from(v) {
                Ok(i) => Ok(Value::Int(i)),
                Err(_) => Ok(Value::UInt(v)),
            }
        }

        // Signed integers
        marker::INT_8 => Ok(Value::Int(i64::from(cur.take_i8()?))),
        marker::INT_16 => Ok(Value::Int(i64::from(cur.take_i16()?))),
        marker::INT_32 => Ok(Value::Int(i64::from(cur.take_i32()?))),
        marker::INT_64 => Ok(Value::Int(cur.take_i64()?)),

        // Extension, fixed payload sizes
        marker::FIXEXT_1 => read_ext(cur, 1),
        marker::FIXEXT_2 => read_ext(cur, 2),
        marker::FIXEXT_4 => read_ext(cur, 4),
        marker::FIXEXT_8 => read_ext(cur, 8),
        marker::FIXEXT_16 => read_ext(cur, 16),

        // String, length-prefixed
        marker::STR_8 => {
            let len = usize::from(cur.take_u8()?);
            read_str(cur, len)
        }
        marker::STR_16 => {
            let len = usize::from(cur.take_u16()?);
            read_str(cur, len)
        }
        marker::STR_32 => {
            let len = cur.take_u32()? as usize;
            read_str(cur, len)
        }

        marker::ARRAY_16 => {
            let len = usize::from(cur.take_u16()?);
            read_array(cur, len)
        }
        marker::ARRAY_32 => {
            let len = cur.take_u32()? as usize;
            read_array(cur, len)
        }
        marker::MAP_16 => {
            let len = usize::from(cur.take_u16()?);
            read_map(cur, len)
        }
        marker::MAP_32 => {
            let len = cur.take_u32()? as usize;
            read_map(cur, len)
        }

        // NEGATIVE_FIXINT
        0xE0..=0xFF => Ok(Value::Int(i64::from(m as i8))),

        // 0xC1 (never used) and 0xCA (float32, outside this grammar)
        _ => Err(PackError::UnknownMarker {
            marker: m,
            offset: marker_offset,
        }),
    }
}

fn read_bin(cur: &mut Cursor<'_>, len: usize) -> Result<Value, PackError> {
    Ok(Value::Bin(cur.take(len)?.to_vec()))
}

fn read_str(cur: &mut Cursor<'_>, len: usize) -> Result<Value, PackError> {
    let offset = cur.pos;
    let bytes = cur.take(len)?;
    let s = std::str::from_utf8(bytes).map_err(|_| PackError::MalformedUtf8 { offset })?;
    Ok(Value::Str(s.to_owned()))
}

fn read_array(cur: &mut Cursor<'_>, len: usize) -> Result<Value, PackError> {
    // Each element is at least one byte, so a count beyond the remaining
    // input cannot be honored; capping the preallocation keeps a hostile
    // header from forcing a huge allocation before the read fails.
    let mut items = Vec::with_capacity(len.min(cur.remaining()));
    for _ in 0..len {
        items.push(read_value(cur)?);
    }
    Ok(Value::Array(items))
}

fn read_map(cur: &mut Cursor<'_>, len: usize) -> Result<Value, PackError> {
    let mut pairs = Vec::with_capacity(len.min(cur.remaining() / 2));
    for _ in 0..len {
        let key = read_value(cur)?;
        let value = read_value(cur)?;
        pairs.push((key, value));
    }
    Ok(Value::Map(pairs))
}

/// Reads the tag byte and exactly `len` payload bytes, then decodes the
/// payload as one nested frame and dispatches on the tag.
fn read_ext(cur: &mut Cursor<'_>, len: usize) -> Result<Value, PackError> {
    let tag_byte = cur.take_i8()?;
    let payload = cur.take(len)?;
    // The declared payload is fully present from here on, so an inner frame
    // running off its end means a bad length, not short input. Keeping the
    // truncation class for complete frames would make streaming readers
    // wait for bytes that are never coming.
    let (inner, consumed) = decode_value(payload, 0).map_err(|e| match e {
        PackError::Truncated { .. } => PackError::MalformedExtension {
            tag: tag_byte,
            reason: format!("inner frame runs past the declared {len}-byte payload"),
        },
        other => other,
    })?;
    if consumed != len {
        return Err(PackError::MalformedExtension {
            tag: tag_byte,
            reason: format!("payload declares {len} bytes but frame ends at {consumed}"),
        });
    }
    build_extension(tag_byte, inner)
}

fn build_extension(tag_byte: i8, payload: Value) -> Result<Value, PackError> {
    let malformed = |reason: String| PackError::MalformedExtension {
        tag: tag_byte,
        reason,
    };
    match tag_byte {
        tag::TIMESTAMP => {
            let [seconds, nanos] = fixed_array::<2>(payload).map_err(&malformed)?;
            Ok(Value::Timestamp(Timestamp {
                seconds: as_int(seconds).map_err(&malformed)?,
                nanos: as_u32(nanos).map_err(&malformed)?,
            }))
        }
        tag::DATE => {
            let [year, month, day] = fixed_array::<3>(payload).map_err(&malformed)?;
            let year = as_int(year).map_err(&malformed)?;
            let year = i32::try_from(year).map_err(|_| malformed(format!("year {year} out of range")))?;
            Ok(Value::Date(Date {
                year,
                month: as_u8(month).map_err(&malformed)?,
                day: as_u8(day).map_err(&malformed)?,
            }))
        }
        tag::TIME => {
            let [hour, minute, second, nanos] = fixed_array::<4>(payload).map_err(&malformed)?;
            Ok(Value::Time(Time {
                hour: as_u8(hour).map_err(&malformed)?,
                minute: as_u8(minute).map_err(&malformed)?,
                second: as_u8(second).map_err(&malformed)?,
                nanos: as_u32(nanos).map_err(&malformed)?,
            }))
        }
        tag::DURATION => {
            let [seconds, nanos] = fixed_array::<2>(payload).map_err(&malformed)?;
            Ok(Value::Duration(Duration {
                seconds: as_int(seconds).map_err(&malformed)?,
                nanos: as_u32(nanos).map_err(&malformed)?,
            }))
        }
        tag::DECIMAL => Ok(Value::Decimal(as_str(payload).map_err(&malformed)?)),
        tag::UUID => {
            let bytes = match payload {
                Value::Bin(b) => b,
                other => return Err(malformed(format!("expected bin, got {}", other.kind()))),
            };
            let uuid = uuid::Uuid::from_slice(&bytes)
                .map_err(|_| malformed(format!("expected 16 bytes, got {}", bytes.len())))?;
            Ok(Value::Uuid(uuid))
        }
        tag::ENUM => {
            let [type_name, member] = fixed_array::<2>(payload).map_err(&malformed)?;
            Ok(Value::Enum(EnumMember {
                type_name: as_str(type_name).map_err(&malformed)?,
                member: as_str(member).map_err(&malformed)?,
            }))
        }
        tag::RECORD => Ok(Value::Record(record_from(payload).map_err(&malformed)?)),
        tag::NAMED_TUPLE => Ok(Value::NamedTuple(record_from(payload).map_err(&malformed)?)),
        tag::SET => Ok(Value::Set(as_array(payload).map_err(&malformed)?)),
        tag::FROZEN_SET => Ok(Value::FrozenSet(as_array(payload).map_err(&malformed)?)),
        tag::TUPLE => Ok(Value::Tuple(as_array(payload).map_err(&malformed)?)),
        tag::CUSTOM => {
            let [qualifier, fields] = fixed_array::<2>(payload).map_err(&malformed)?;
            let qualifier = as_str(qualifier).map_err(&malformed)?;
            let decode_fn = registry::resolve_decoder(&qualifier)?;
            let payload = decode_fn(fields)?;
            Ok(Value::Custom(Custom {
                qualifier,
                payload: Box::new(payload),
            }))
        }
        _ => Err(PackError::UnknownExtension(format!("tag {tag_byte}"))),
    }
}

// -- Payload shape helpers --

fn fixed_array<const N: usize>(v: Value) -> Result<[Value; N], String> {
    match v {
        Value::Array(items) => {
            let len = items.len();
            items
                .try_into()
                .map_err(|_| format!("expected {N}-element array, got {len}"))
        }
        other => Err(format!("expected array, got {}", other.kind())),
    }
}

fn as_array(v: Value) -> Result<Vec<Value>, String> {
    match v {
        Value::Array(items) => Ok(items),
        other => Err(format!("expected array, got {}", other.kind())),
    }
}

fn as_str(v: Value) -> Result<String, String> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(format!("expected str, got {}", other.kind())),
    }
}

fn as_int(v: Value) -> Result<i64, String> {
    let kind = v.kind();
    v.as_int().ok_or_else(|| format!("expected int, got {kind}"))
}

fn as_u32(v: Value) -> Result<u32, String> {
    let i = as_int(v)?;
    u32::try_from(i).map_err(|_| format!("value {i} out of u32 range"))
}

fn as_u8(v: Value) -> Result<u8, String> {
    let i = as_int(v)?;
    u8::try_from(i).map_err(|_| format!("value {i} out of u8 range"))
}

fn record_from(v: Value) -> Result<Record, String> {
    let [qualifier, fields] = fixed_array::<2>(v)?;
    let qualifier = as_str(qualifier)?;
    let pairs = match fields {
        Value::Map(pairs) => pairs,
        other => return Err(format!("expected field map, got {}", other.kind())),
    };
    let fields = pairs
        .into_iter()
        .map(|(k, v)| Ok((as_str(k)?, v)))
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Record { qualifier, fields })
}
