//! Reads value frames from a byte source, one frame per pull.

use std::io::Read;

use bytes::{Buf, BytesMut};

use crate::codec::decode_value;
use crate::error::PackError;
use crate::types::Value;

/// Bytes pulled from the source per refill.
const READ_CHUNK: usize = 8 * 1024;

/// Incrementally decodes frames from a `Read` source.
///
/// The internal buffer holds at most the frame in progress plus one read
/// chunk; the whole source is never required to fit in memory. A trailing
/// partial frame surfaces as [`PackError::Truncated`] on the pull that
/// reaches it, not eagerly.
pub struct StreamReader<R> {
    source: R,
    buf: BytesMut,
    eof: bool,
}

impl<R: Read> StreamReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: BytesMut::new(),
            eof: false,
        }
    }

    /// Pulls and decodes the next frame.
    ///
    /// Returns `Ok(None)` at a clean end of input (no buffered bytes left).
    pub fn read_value(&mut self) -> Result<Option<Value>, PackError> {
        loop {
            if !self.buf.is_empty() {
                match decode_value(&self.buf, 0) {
                    Ok((value, consumed)) => {
                        self.buf.advance(consumed);
                        tracing::trace!(consumed, kind = value.kind(), "decoded stream frame");
                        return Ok(Some(value));
                    }
                    // Not enough buffered yet: refill unless the source is
                    // already exhausted, in which case the partial frame is
                    // a real error.
                    Err(e @ PackError::Truncated { .. }) => {
                        if self.eof {
                            return Err(e);
                        }
                    }
                    Err(e) => return Err(e),
                }
            } else if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<(), PackError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.source.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }
}

/// Unpacks a single value from a source. An empty source is an error.
pub fn unpack_from<R: Read>(source: R) -> Result<Value, PackError> {
    match StreamReader::new(source).read_value()? {
        Some(value) => Ok(value),
        None => Err(PackError::Truncated {
            offset: 0,
            needed: 1,
            remaining: 0,
        }),
    }
}

/// Lazily unpacks every frame from a source.
///
/// The returned iterator pulls one frame per step and is fused after the
/// first error. It is not restartable once the source is consumed.
pub fn unpack_stream<R: Read>(source: R) -> StreamIter<R> {
    StreamIter {
        reader: StreamReader::new(source),
        done: false,
    }
}

/// Iterator over frames pulled from a `Read` source.
pub struct StreamIter<R> {
    reader: StreamReader<R>,
    done: bool,
}

impl<R: Read> Iterator for StreamIter<R> {
    type Item = Result<Value, PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_value() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Lazily unpacks every frame from an in-memory buffer.
///
/// Unlike [`unpack_stream`], the buffer can be iterated again from the
/// start by calling this a second time.
pub fn iter_unpack(data: &[u8]) -> IterUnpack<'_> {
    IterUnpack {
        data,
        pos: 0,
        done: false,
    }
}

/// Iterator over frames in an in-memory buffer.
pub struct IterUnpack<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl Iterator for IterUnpack<'_> {
    type Item = Result<Value, PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos == self.data.len() {
            return None;
        }
        match decode_value(self.data, self.pos) {
            Ok((value, consumed)) => {
                self.pos += consumed;
                Some(Ok(value))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Eagerly unpacks every frame in a buffer.
pub fn unpack_many(data: &[u8]) -> Result<Vec<Value>, PackError> {
    iter_unpack(data).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::writer::{pack_many, pack_stream};
    use std::io::Cursor;

    fn sample_values() -> Vec<Value> {
        vec![
            Value::Int(1),
            Value::Str("two".into()),
            Value::Array(vec![Value::Bool(true), Value::Nil]),
            Value::Map(vec![("k".into(), Value::Float(0.5))]),
        ]
    }

    #[test]
    fn stream_round_trip() {
        let values = sample_values();
        let mut bytes = Vec::new();
        pack_stream(values.iter(), &mut bytes).unwrap();

        let decoded: Vec<Value> = unpack_stream(Cursor::new(bytes))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn frames_self_delimit() {
        // iter_unpack over a ++ b yields [decode(a), decode(b)].
        let a = crate::pack(&Value::Str("first".into())).unwrap();
        let b = crate::pack(&Value::Int(200)).unwrap();
        let joined: Vec<u8> = [a, b].concat();

        let decoded: Vec<Value> = iter_unpack(&joined).collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded, vec![Value::Str("first".into()), Value::Int(200)]);
    }

    #[test]
    fn iter_unpack_is_restartable_over_buffer() {
        let bytes = pack_many([Value::Int(1), Value::Int(2)].iter()).unwrap();
        let first: Vec<Value> = iter_unpack(&bytes).map(Result::unwrap).collect();
        let second: Vec<Value> = iter_unpack(&bytes).map(Result::unwrap).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn unpack_many_round_trip() {
        let values = sample_values();
        let bytes = pack_many(values.iter()).unwrap();
        assert_eq!(unpack_many(&bytes).unwrap(), values);
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert_eq!(unpack_stream(Cursor::new(Vec::new())).count(), 0);
        assert!(unpack_many(&[]).unwrap().is_empty());
    }

    #[test]
    fn unpack_from_empty_source_is_truncated() {
        assert!(matches!(
            unpack_from(Cursor::new(Vec::new())),
            Err(PackError::Truncated { .. })
        ));
    }

    #[test]
    fn trailing_partial_frame_surfaces_lazily() {
        let mut bytes = crate::pack(&Value::Int(5)).unwrap();
        // str8 header promising 4 bytes, body cut short.
        bytes.extend_from_slice(&[0xD9, 0x04, 0x61]);

        let mut iter = unpack_stream(Cursor::new(bytes));
        assert_eq!(iter.next().unwrap().unwrap(), Value::Int(5));
        assert!(matches!(
            iter.next().unwrap(),
            Err(PackError::Truncated { .. })
        ));
        // Fused after the error.
        assert!(iter.next().is_none());
    }

    #[test]
    fn malformed_extension_frame_fails_on_its_pull() {
        // A complete ext8 frame whose inner fixstr(5) overruns the declared
        // 2-byte payload, followed by plenty of valid frames. The reader
        // must fail this frame immediately instead of treating it as a
        // prefix and buffering the rest of the source waiting for more.
        let mut bytes = vec![0xC7, 0x02, crate::tag::TUPLE as u8, 0xA5, 0x61];
        bytes.extend(std::iter::repeat(0x01).take(1000));

        let mut reader = StreamReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_value(),
            Err(PackError::MalformedExtension { .. })
        ));
    }

    #[test]
    fn frame_larger_than_read_chunk() {
        let big = Value::Bin(vec![0x5A; 3 * READ_CHUNK]);
        let mut bytes = Vec::new();
        pack_stream([big.clone()].iter(), &mut bytes).unwrap();

        let mut reader = StreamReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_value().unwrap(), Some(big));
        assert_eq!(reader.read_value().unwrap(), None);
    }

    #[test]
    fn reader_yields_frames_one_at_a_time() {
        let values = sample_values();
        let bytes = pack_many(values.iter()).unwrap();
        let mut reader = StreamReader::new(Cursor::new(bytes));
        for expected in &values {
            assert_eq!(reader.read_value().unwrap().as_ref(), Some(expected));
        }
        assert_eq!(reader.read_value().unwrap(), None);
    }
}
