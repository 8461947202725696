//! Error types for encoding and decoding.

/// Errors that can occur during pack/unpack operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// Encoding a custom value whose qualifier has no registry entry.
    #[error("unregistered type: {0}")]
    UnregisteredType(String),

    /// A declared length or fixed-width payload extends past the end of
    /// the input buffer.
    #[error("truncated input at offset {offset}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A marker byte outside the recognized grammar.
    #[error("unknown marker 0x{marker:02X} at offset {offset}")]
    UnknownMarker { marker: u8, offset: usize },

    /// A string frame whose payload is not valid UTF-8.
    #[error("malformed UTF-8 in string at offset {offset}")]
    MalformedUtf8 { offset: usize },

    /// An extension frame whose payload has the wrong shape for its tag.
    #[error("malformed extension payload for tag {tag}: {reason}")]
    MalformedExtension { tag: i8, reason: String },

    /// An extension tag or custom-type qualifier with no registered decoder.
    #[error("unknown extension: {0}")]
    UnknownExtension(String),

    /// A payload length or element count too large for any 32-bit length
    /// class on the wire.
    #[error("{kind} length {len} exceeds the 32-bit wire limit")]
    Oversized { kind: &'static str, len: usize },

    /// `unpack` was given a buffer with bytes left over after the first frame.
    #[error("trailing bytes: {remaining} bytes remain after first frame")]
    TrailingBytes { remaining: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
