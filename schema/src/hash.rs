//! Deterministic field table hashing.

use blake3::Hasher;

use crate::{FieldCodec, NetFields};

/// Computes a deterministic fingerprint of a field table.
///
/// Encoder and decoder must agree on the table; comparing fingerprints is the
/// only way to check that, since the wire does not describe itself.
#[must_use]
pub fn net_fields_hash(table: &NetFields) -> u64 {
    let mut hasher = Hasher::new();
    write_u32(&mut hasher, table.len() as u32);

    for field in table {
        write_u32(&mut hasher, field.name.len() as u32);
        hasher.update(field.name.as_bytes());
        write_codec(&mut hasher, field.codec);
    }

    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

fn write_codec(hasher: &mut Hasher, codec: FieldCodec) {
    match codec {
        FieldCodec::UInt { bits } => {
            write_u8(hasher, 1);
            write_u8(hasher, bits);
        }
        FieldCodec::SInt { bits } => {
            write_u8(hasher, 2);
            write_u8(hasher, bits);
        }
        FieldCodec::Float => {
            write_u8(hasher, 3);
        }
        FieldCodec::Angle { bits } => {
            write_u8(hasher, 4);
            write_u8(hasher, bits);
        }
    }
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
