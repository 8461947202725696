//! Value model and extension tag assignments.

mod value;

pub use value::{Custom, Date, Duration, EnumMember, Record, Time, Timestamp, Value};

/// Extension tag bytes for the built-in native kinds, plus the single
/// shared tag for the user range.
///
/// Tags 0x01..=0x1F are reserved for built-ins. User-registered types all
/// share tag `CUSTOM`; the type qualifier travels inside the payload, so
/// independently registered types cannot collide on a tag byte.
pub mod tag {
    pub const TIMESTAMP: i8 = 0x01;
    pub const DATE: i8 = 0x02;
    pub const TIME: i8 = 0x03;
    pub const DURATION: i8 = 0x04;
    pub const DECIMAL: i8 = 0x05;
    pub const UUID: i8 = 0x06;
    pub const ENUM: i8 = 0x07;
    pub const RECORD: i8 = 0x08;
    pub const NAMED_TUPLE: i8 = 0x09;
    pub const SET: i8 = 0x0A;
    pub const FROZEN_SET: i8 = 0x0B;
    pub const TUPLE: i8 = 0x0C;
    pub const CUSTOM: i8 = 0x20;
}
