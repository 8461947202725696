//! MessagePack marker byte constants.

// Nil
pub const NIL: u8 = 0xC0;

// Boolean
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

// POSITIVE_FIXINT: 0x00..=0x7F (value = marker)
// NEGATIVE_FIXINT: 0xE0..=0xFF (-32..-1)

// Unsigned integers
pub const UINT_8: u8 = 0xCC;
pub const UINT_16: u8 = 0xCD;
pub const UINT_32: u8 = 0xCE;
pub const UINT_64: u8 = 0xCF;

// Signed integers
pub const INT_8: u8 = 0xD0;
pub const INT_16: u8 = 0xD1;
pub const INT_32: u8 = 0xD2;
pub const INT_64: u8 = 0xD3;

// Float (IEEE 754 double-precision, big-endian)
pub const FLOAT_64: u8 = 0xCB;

// String
// FIXSTR: 0xA0..=0xBF (low 5 bits = byte length 0..31)
pub const STR_8: u8 = 0xD9;
pub const STR_16: u8 = 0xDA;
pub const STR_32: u8 = 0xDB;

// Binary
pub const BIN_8: u8 = 0xC4;
pub const BIN_16: u8 = 0xC5;
pub const BIN_32: u8 = 0xC6;

// Array
// FIXARRAY: 0x90..=0x9F (low nibble = element count 0..15)
pub const ARRAY_16: u8 = 0xDC;
pub const ARRAY_32: u8 = 0xDD;

// Map
// FIXMAP: 0x80..=0x8F (low nibble = pair count 0..15)
pub const MAP_16: u8 = 0xDE;
pub const MAP_32: u8 = 0xDF;

// Extension: fixed payload sizes 1/2/4/8/16, then length-prefixed forms.
pub const FIXEXT_1: u8 = 0xD4;
pub const FIXEXT_2: u8 = 0xD5;
pub const FIXEXT_4: u8 = 0xD6;
pub const FIXEXT_8: u8 = 0xD7;
pub const FIXEXT_16: u8 = 0xD8;
pub const EXT_8: u8 = 0xC7;
pub const EXT_16: u8 = 0xC8;
pub const EXT_32: u8 = 0xC9;

// High-nibble masks for fix types.
pub const FIXMAP_NIBBLE: u8 = 0x80;
pub const FIXARRAY_NIBBLE: u8 = 0x90;
pub const FIXSTR_BITS: u8 = 0xA0;
