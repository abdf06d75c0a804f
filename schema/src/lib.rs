//! Declarative field tables for the qsnap delta codec.
//!
//! This crate defines how entity and player state is laid out for delta
//! compression:
//! - Field codecs (fixed-width integers, floats, quantized angles)
//! - Ordered, validated field tables ([`NetFields`])
//! - Deterministic table fingerprints
//! - The stock entity and player tables
//!
//! # Design Principles
//!
//! - **One table, one routine** - The codec walks a table; no per-field code.
//! - **Explicit tables** - No reflection on arbitrary Rust types.
//! - **Deterministic hashing** - A table's fingerprint is stable given the same definition.

mod error;
mod field;
mod hash;
mod standard;
mod table;

pub use error::{SchemaError, SchemaResult};
pub use field::{FieldCodec, FieldDef, MAX_ANGLE_BITS, MAX_INT_BITS};
pub use hash::net_fields_hash;
pub use standard::{entity_fields, player_fields, COMMAND_TIME_FIELD};
pub use table::{NetFields, NetFieldsBuilder, MAX_FIELDS};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = FieldCodec::float();
        let _ = FieldDef::new("x", FieldCodec::uint(1));
        let _ = NetFields::builder();
        let _: SchemaResult<()> = Ok(());
        let _ = MAX_FIELDS;
    }

    #[test]
    fn stock_fingerprints_differ() {
        assert_ne!(
            net_fields_hash(&entity_fields()),
            net_fields_hash(&player_fields())
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn table_json_roundtrip() {
        let table = NetFields::builder()
            .field("a", FieldCodec::uint(8))
            .field("yaw", FieldCodec::angle(16))
            .field("x", FieldCodec::float())
            .build()
            .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"kind\":\"angle\""));
        let back: NetFields = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn table_json_is_validated() {
        let json = r#"[{"name":"a","codec":{"kind":"uint","bits":0}}]"#;
        assert!(serde_json::from_str::<NetFields>(json).is_err());
    }
}
