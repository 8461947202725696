//! Multi-object streaming over byte sinks and sources.
//!
//! Frames are self-delimiting, so a stream is nothing more than frames
//! written back-to-back with no separator or envelope. The read path pulls
//! and decodes one frame at a time and never needs the whole source in
//! memory.

pub mod reader;
pub mod writer;

pub use reader::{iter_unpack, unpack_from, unpack_many, unpack_stream, IterUnpack, StreamIter, StreamReader};
pub use writer::{pack_many, pack_stream, pack_to, StreamWriter};
