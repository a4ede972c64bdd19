//! Flat field stream used as the wire form of every message.
//!
//! A frame is an ordered sequence of fields with no self-describing
//! markers: the decoder must read exactly the fields the encoder wrote,
//! in the same order.
//!
//! | field | encoding |
//! |---|---|
//! | `u8`, `bool` | 1 byte (bool: 1 = true) |
//! | `u16`, `i32`, `u32`, `i64` | fixed width, little-endian |
//! | text | `i32` byte length + UTF-8 |
//! | blob | `i32` byte length + raw bytes |
//! | uuid, node id | 16 raw bytes |

pub mod reader;
pub mod writer;

pub use reader::FieldReader;
pub use writer::FieldWriter;
