//! Field codec definitions.

/// Widest integer a field may carry.
pub const MAX_INT_BITS: u8 = 32;

/// Widest quantized angle a field may carry.
pub const MAX_ANGLE_BITS: u8 = 16;

/// The encoding for a field (representation only).
///
/// Every codec stores its value as one raw 32-bit word. Floats and angles
/// store IEEE-754 bits; integers store their two's complement pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum FieldCodec {
    /// Unsigned integer with fixed bit width.
    #[cfg_attr(feature = "serde", serde(rename = "uint"))]
    UInt { bits: u8 },

    /// Signed integer with fixed bit width.
    #[cfg_attr(feature = "serde", serde(rename = "sint"))]
    SInt { bits: u8 },

    /// Float, sent as a small biased integer when integral.
    Float,

    /// Angle in degrees quantized to `bits` with wraparound.
    Angle { bits: u8 },
}

impl FieldCodec {
    /// Creates an unsigned integer field codec.
    #[must_use]
    pub const fn uint(bits: u8) -> Self {
        Self::UInt { bits }
    }

    /// Creates a signed integer field codec.
    #[must_use]
    pub const fn sint(bits: u8) -> Self {
        Self::SInt { bits }
    }

    /// Creates a float field codec.
    #[must_use]
    pub const fn float() -> Self {
        Self::Float
    }

    /// Creates a quantized angle field codec.
    #[must_use]
    pub const fn angle(bits: u8) -> Self {
        Self::Angle { bits }
    }

    /// Returns the maximum number of bits one value can occupy on the wire,
    /// including its zero flag.
    #[must_use]
    pub const fn max_wire_bits(self) -> usize {
        match self {
            Self::UInt { bits } | Self::SInt { bits } | Self::Angle { bits } => 1 + bits as usize,
            Self::Float => 2 + 32,
        }
    }
}

/// Field definition within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    pub name: String,
    pub codec: FieldCodec,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, codec: FieldCodec) -> Self {
        Self {
            name: name.into(),
            codec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_codec_constructors() {
        assert_eq!(FieldCodec::uint(8), FieldCodec::UInt { bits: 8 });
        assert_eq!(FieldCodec::sint(16), FieldCodec::SInt { bits: 16 });
        assert_eq!(FieldCodec::float(), FieldCodec::Float);
        assert_eq!(FieldCodec::angle(8), FieldCodec::Angle { bits: 8 });
    }

    #[test]
    fn max_wire_bits() {
        assert_eq!(FieldCodec::uint(10).max_wire_bits(), 11);
        assert_eq!(FieldCodec::float().max_wire_bits(), 34);
    }

    #[test]
    fn field_def_new() {
        let field = FieldDef::new("eType", FieldCodec::uint(8));
        assert_eq!(field.name, "eType");
        assert_eq!(field.codec, FieldCodec::UInt { bits: 8 });
    }
}
