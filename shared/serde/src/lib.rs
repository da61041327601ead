//! # Realm Serde
//! Byte-level wire codec and quantization primitives shared between the
//! realm server crates.

mod bit_pack;
mod error;
mod reader;
mod writer;

pub use bit_pack::{pack_float, pack_vec3, unpack_float, unpack_vec3, QuantizeError};
pub use error::SerdeErr;
pub use reader::ByteReader;
pub use writer::ByteWriter;

/// Maximum safe payload size for a single datagram, in bytes.
pub const MTU_SIZE_BYTES: usize = 1400;
