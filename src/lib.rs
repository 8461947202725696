//! wirepack — compact self-describing binary serialization.
//!
//! The wire format is MessagePack: any MessagePack reader can parse the
//! primitive subset (integers, floats, strings, binary, arrays, maps),
//! while a fixed scheme of extension tags carries richer native kinds
//! (timestamps, dates, decimals, UUIDs, enums, records, sets, tuples and
//! user-registered custom types) losslessly through the same byte stream.
//! Decoding is bounds-checked throughout and never executes code embedded
//! in the data.
//!
//! # Architecture
//!
//! - **`types`** — the closed [`Value`] model and extension tag constants
//! - **`codec`** — single-frame encoding and decoding
//! - **`registry`** — process-wide custom-type registry
//! - **`stream`** — back-to-back multi-frame streaming over `Read`/`Write`
//! - **`error`** — the [`PackError`] taxonomy
//!
//! # Examples
//!
//! ```
//! use wirepack::{pack, unpack, Value};
//!
//! let value = Value::Map(vec![
//!     ("name".into(), "Ana".into()),
//!     ("age".into(), Value::Int(30)),
//! ]);
//! let bytes = pack(&value)?;
//! assert_eq!(unpack(&bytes)?, value);
//! # Ok::<(), wirepack::PackError>(())
//! ```

pub mod codec;
pub mod error;
pub mod registry;
pub mod stream;
pub mod types;

pub use error::PackError;
pub use registry::{clear_registry, register};
pub use stream::{
    iter_unpack, pack_many, pack_stream, pack_to, unpack_from, unpack_many, unpack_stream,
    IterUnpack, StreamIter, StreamReader, StreamWriter,
};
pub use types::{tag, Custom, Date, Duration, EnumMember, Record, Time, Timestamp, Value};

use bytes::BytesMut;

/// Serializes a value into a single self-delimiting frame.
pub fn pack(value: &Value) -> Result<Vec<u8>, PackError> {
    let mut buf = BytesMut::new();
    codec::encode_value(&mut buf, value)?;
    Ok(buf.to_vec())
}

/// Deserializes a single value from a buffer.
///
/// The buffer must contain exactly one frame; leftover bytes fail with
/// [`PackError::TrailingBytes`]. Use [`unpack_many`] or [`iter_unpack`]
/// for multi-frame buffers.
pub fn unpack(data: &[u8]) -> Result<Value, PackError> {
    let (value, consumed) = codec::decode_value(data, 0)?;
    if consumed < data.len() {
        return Err(PackError::TrailingBytes {
            remaining: data.len() - consumed,
        });
    }
    Ok(value)
}
