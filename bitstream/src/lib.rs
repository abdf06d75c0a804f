//! Bit-level message primitives for the qsnap client protocol.
//!
//! This crate provides [`BitReader`] and [`BitWriter`] for the bit-packed
//! server-to-client message stream: single bits, fixed-width integers,
//! bytes, shorts, longs, raw floats, zero-terminated strings and raw spans.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads are checked against the declared message size.
//! - **No domain knowledge** - This crate knows nothing about entities, snapshots, or game state.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bit(true);
//! writer.write_bits(42, 7).unwrap();
//! writer.write_i32(-5);
//!
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert!(reader.read_bit().unwrap());
//! assert_eq!(reader.read_bits(7).unwrap(), 42);
//! assert_eq!(reader.read_i32().unwrap(), -5);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::{BitReader, MAX_READ_BITS};
pub use writer::BitWriter;
