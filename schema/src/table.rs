//! Field tables and validation.

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::field::{FieldCodec, FieldDef, MAX_ANGLE_BITS, MAX_INT_BITS};

/// Most fields a table may declare; the change count is sent as one byte.
pub const MAX_FIELDS: usize = 255;

/// An ordered, validated list of fields.
///
/// Field order is the wire order of the change mask and of the values.
/// Both ends must use identical tables; nothing on the wire checks this.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<FieldDef>", into = "Vec<FieldDef>")
)]
pub struct NetFields {
    fields: Vec<FieldDef>,
}

impl NetFields {
    /// Creates a table from fields after validation.
    pub fn new(fields: Vec<FieldDef>) -> SchemaResult<Self> {
        let table = Self { fields };
        table.validate()?;
        Ok(table)
    }

    /// Creates a table builder.
    #[must_use]
    pub fn builder() -> NetFieldsBuilder {
        NetFieldsBuilder { fields: Vec::new() }
    }

    /// Validates table invariants.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.fields.len() > MAX_FIELDS {
            return Err(SchemaError::TooManyFields {
                count: self.fields.len(),
                max: MAX_FIELDS,
            });
        }
        let mut names = HashSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName { index });
            }
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateFieldName {
                    name: field.name.clone(),
                });
            }
            validate_field(field)?;
        }
        Ok(())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the table declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FieldDef> {
        self.fields.get(index)
    }

    /// Returns the position of the field named `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Iterates over the fields in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldDef> {
        self.fields.iter()
    }

    /// Returns the fields as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Upper bound on the encoded size of one delta record, in bits.
    #[must_use]
    pub fn max_delta_bits(&self) -> usize {
        // remove + changed + count byte + mask
        let header = 2 + 8 + self.fields.len();
        header
            + self
                .fields
                .iter()
                .map(|f| f.codec.max_wire_bits())
                .sum::<usize>()
    }
}

impl<'a> IntoIterator for &'a NetFields {
    type Item = &'a FieldDef;
    type IntoIter = std::slice::Iter<'a, FieldDef>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl TryFrom<Vec<FieldDef>> for NetFields {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldDef>) -> SchemaResult<Self> {
        Self::new(fields)
    }
}

impl From<NetFields> for Vec<FieldDef> {
    fn from(table: NetFields) -> Self {
        table.fields
    }
}

/// Builder for `NetFields`.
#[derive(Debug, Default)]
pub struct NetFieldsBuilder {
    fields: Vec<FieldDef>,
}

impl NetFieldsBuilder {
    /// Appends a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, codec: FieldCodec) -> Self {
        self.fields.push(FieldDef::new(name, codec));
        self
    }

    /// Builds the table after validation.
    pub fn build(self) -> SchemaResult<NetFields> {
        NetFields::new(self.fields)
    }
}

fn validate_field(field: &FieldDef) -> SchemaResult<()> {
    match field.codec {
        FieldCodec::UInt { bits } | FieldCodec::SInt { bits } => {
            if bits == 0 || bits > MAX_INT_BITS {
                return Err(SchemaError::InvalidBitWidth {
                    name: field.name.clone(),
                    bits,
                });
            }
        }
        FieldCodec::Angle { bits } => {
            if bits == 0 || bits > MAX_ANGLE_BITS {
                return Err(SchemaError::InvalidAngleBits {
                    name: field.name.clone(),
                    bits,
                });
            }
        }
        FieldCodec::Float => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_roundtrip() {
        let table = NetFields::builder()
            .field("time", FieldCodec::sint(32))
            .field("origin[0]", FieldCodec::float())
            .build()
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of("origin[0]"), Some(1));
        assert_eq!(table.index_of("missing"), None);
        assert_eq!(table.get(0).unwrap().name, "time");
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = NetFields::builder()
            .field("a", FieldCodec::uint(8))
            .field("a", FieldCodec::float())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFieldName { .. }));
    }

    #[test]
    fn rejects_empty_name() {
        let err = NetFields::builder()
            .field("", FieldCodec::uint(8))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::EmptyFieldName { index: 0 });
    }

    #[test]
    fn rejects_invalid_bit_width() {
        let zero = NetFields::builder().field("a", FieldCodec::uint(0)).build();
        assert!(matches!(zero, Err(SchemaError::InvalidBitWidth { bits: 0, .. })));

        let wide = NetFields::builder().field("a", FieldCodec::sint(33)).build();
        assert!(matches!(wide, Err(SchemaError::InvalidBitWidth { bits: 33, .. })));
    }

    #[test]
    fn rejects_invalid_angle_bits() {
        let err = NetFields::builder()
            .field("yaw", FieldCodec::angle(17))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAngleBits { bits: 17, .. }));
    }

    #[test]
    fn rejects_too_many_fields() {
        let fields = (0..=MAX_FIELDS)
            .map(|i| FieldDef::new(format!("f{i}"), FieldCodec::uint(1)))
            .collect();
        let err = NetFields::new(fields).unwrap_err();
        assert!(matches!(err, SchemaError::TooManyFields { count: 256, .. }));
    }

    #[test]
    fn empty_table_is_valid() {
        let table = NetFields::new(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.max_delta_bits(), 10);
    }

    #[test]
    fn max_delta_bits_counts_values() {
        let table = NetFields::builder()
            .field("a", FieldCodec::uint(8))
            .field("b", FieldCodec::float())
            .build()
            .unwrap();
        assert_eq!(table.max_delta_bits(), 2 + 8 + 2 + 9 + 34);
    }

    fn codec_strategy() -> impl proptest::strategy::Strategy<Value = FieldCodec> {
        use proptest::prelude::*;
        prop_oneof![
            (0u8..40).prop_map(FieldCodec::uint),
            (0u8..40).prop_map(FieldCodec::sint),
            Just(FieldCodec::float()),
            (0u8..20).prop_map(FieldCodec::angle),
        ]
    }

    proptest::proptest! {
        #[test]
        fn validation_matches_bit_limits(codecs in proptest::collection::vec(codec_strategy(), 0..32)) {
            let in_range = codecs.iter().all(|codec| match *codec {
                FieldCodec::UInt { bits } | FieldCodec::SInt { bits } => (1..=MAX_INT_BITS).contains(&bits),
                FieldCodec::Angle { bits } => (1..=MAX_ANGLE_BITS).contains(&bits),
                FieldCodec::Float => true,
            });
            let fields = codecs
                .iter()
                .enumerate()
                .map(|(i, codec)| FieldDef::new(format!("f{i}"), *codec))
                .collect();
            proptest::prop_assert_eq!(NetFields::new(fields).is_ok(), in_range);
        }
    }
}

