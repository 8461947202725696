//! Binary encoding and decoding of single frames.
//!
//! The wire format is MessagePack: big-endian byte ordering, a leading
//! marker byte per frame, and payload sizes fully determined by the marker
//! plus any length bytes. Frames are self-delimiting, which is what makes
//! the back-to-back streaming in [`crate::stream`] possible.

pub mod decode;
pub mod encode;
pub mod marker;

pub use decode::decode_value;
pub use encode::encode_value;
