//! Writes value frames to a byte sink.

use std::io::Write;

use bytes::BytesMut;

use crate::codec::encode_value;
use crate::error::PackError;
use crate::types::Value;

/// Writes frames back-to-back to a `Write` sink.
///
/// Each frame is encoded into a scratch buffer first, so a failing encode
/// (for example an unregistered custom type) writes nothing to the sink.
/// Frames already written before a failure stay written; callers needing
/// all-or-nothing semantics should pack into memory and flush themselves.
pub struct StreamWriter<W> {
    sink: W,
    buf: BytesMut,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buf: BytesMut::new(),
        }
    }

    /// Encodes one value and writes its frame through to the sink.
    pub fn write_value(&mut self, value: &Value) -> Result<(), PackError> {
        self.buf.clear();
        encode_value(&mut self.buf, value)?;
        self.sink.write_all(&self.buf)?;
        Ok(())
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<(), PackError> {
        self.sink.flush()?;
        Ok(())
    }

    /// Consumes the writer, returning the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Packs a single value to a sink.
pub fn pack_to<W: Write>(value: &Value, sink: &mut W) -> Result<(), PackError> {
    StreamWriter::new(sink).write_value(value)
}

/// Packs each value of a sequence to a sink, frames back-to-back.
///
/// The sequence is iterated exactly once.
pub fn pack_stream<'a, W, I>(values: I, sink: &mut W) -> Result<(), PackError>
where
    W: Write,
    I: IntoIterator<Item = &'a Value>,
{
    let mut writer = StreamWriter::new(sink);
    for value in values {
        writer.write_value(value)?;
    }
    writer.flush()
}

/// Packs a sequence into an in-memory buffer.
pub fn pack_many<'a, I>(values: I) -> Result<Vec<u8>, PackError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out = Vec::new();
    pack_stream(values, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_to_writes_one_frame() {
        let mut out = Vec::new();
        pack_to(&Value::Int(1), &mut out).unwrap();
        assert_eq!(out, vec![0x01]);
    }

    #[test]
    fn pack_stream_concatenates_frames() {
        let values = [Value::Int(1), Value::Str("ab".into()), Value::Nil];
        let mut out = Vec::new();
        pack_stream(values.iter(), &mut out).unwrap();
        assert_eq!(out, vec![0x01, 0xA2, 0x61, 0x62, 0xC0]);
    }

    #[test]
    fn pack_many_matches_pack_stream() {
        let values = [Value::Bool(true), Value::Int(-1)];
        let mut streamed = Vec::new();
        pack_stream(values.iter(), &mut streamed).unwrap();
        assert_eq!(pack_many(values.iter()).unwrap(), streamed);
    }

    #[test]
    fn failed_element_writes_nothing_for_that_frame() {
        let _guard = crate::registry::test_support::lock();
        let values = [
            Value::Int(7),
            Value::Custom(crate::types::Custom {
                qualifier: "test.NeverRegistered".into(),
                payload: Box::new(Value::Nil),
            }),
        ];
        let mut out = Vec::new();
        let err = pack_stream(values.iter(), &mut out).unwrap_err();
        assert!(matches!(err, PackError::UnregisteredType(_)));
        // The first frame was flushed before the failure; the failing
        // frame left no partial bytes behind.
        assert_eq!(out, vec![0x07]);
    }
}
