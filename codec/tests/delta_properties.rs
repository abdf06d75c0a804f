use bitstream::{BitReader, BitWriter};
use codec::{
    angle_from_quantized, decode_entity_delta, decode_player_delta, encode_entity_delta,
    encode_player_delta, EntityDelta, EntityNumber, EntityState, FieldBlock, PlayerState,
};
use proptest::prelude::*;
use schema::{FieldCodec, NetFields};

fn codec_strategy() -> impl Strategy<Value = FieldCodec> {
    prop_oneof![
        (1u8..=32).prop_map(FieldCodec::uint),
        (1u8..=32).prop_map(FieldCodec::sint),
        Just(FieldCodec::float()),
        (1u8..=16).prop_map(FieldCodec::angle),
    ]
}

/// A raw word the codec can carry exactly.
fn word_strategy(codec: FieldCodec) -> BoxedStrategy<u32> {
    match codec {
        FieldCodec::UInt { bits } if bits < 32 => (0u32..(1u32 << bits)).boxed(),
        FieldCodec::UInt { .. } => any::<u32>().boxed(),
        FieldCodec::SInt { bits } if bits < 32 => {
            let half = 1i32 << (bits - 1);
            ((-half)..half).prop_map(|v| v as u32).boxed()
        }
        FieldCodec::SInt { .. } => any::<u32>().boxed(),
        FieldCodec::Float => prop_oneof![
            (-4096i32..4096).prop_map(|v| (v as f32).to_bits()),
            any::<u32>(),
        ]
        .boxed(),
        FieldCodec::Angle { bits } => (0u32..(1u32 << bits))
            .prop_map(move |q| angle_from_quantized(q, bits).to_bits())
            .boxed(),
    }
}

fn block_strategy(codecs: &[FieldCodec]) -> impl Strategy<Value = FieldBlock> {
    codecs
        .iter()
        .map(|c| prop_oneof![1 => Just(0u32), 3 => word_strategy(*c)])
        .collect::<Vec<_>>()
        .prop_map(FieldBlock::from_words)
}

/// A field table with a base block and a target block over it.
fn case_strategy() -> impl Strategy<Value = (NetFields, FieldBlock, FieldBlock)> {
    proptest::collection::vec(codec_strategy(), 1..24).prop_flat_map(|codecs| {
        let mut builder = NetFields::builder();
        for (i, codec) in codecs.iter().enumerate() {
            builder = builder.field(format!("f{i}"), *codec);
        }
        let fields = builder.build().unwrap();
        (
            Just(fields),
            block_strategy(&codecs),
            block_strategy(&codecs),
        )
    })
}

proptest! {
    #[test]
    fn entity_delta_roundtrip((fields, base, target) in case_strategy(), number in 0u16..1023) {
        let number = EntityNumber::new(number);
        let from = EntityState { number, fields: base };
        let to = EntityState { number, fields: target };

        let mut writer = BitWriter::new();
        encode_entity_delta(&fields, &from, Some(&to), true, &mut writer).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let read = reader.read_bits(EntityNumber::BITS).unwrap();
        prop_assert_eq!(u32::from(number.raw()), read);
        let decoded = decode_entity_delta(&fields, &from, number, &mut reader).unwrap();
        prop_assert_eq!(decoded, EntityDelta::Present(to));
    }

    #[test]
    fn player_delta_roundtrip((fields, base, target) in case_strategy(), use_base in any::<bool>()) {
        let from = PlayerState { client_num: 0, fields: base };
        let to = PlayerState { client_num: 3, fields: target };
        let from = use_base.then_some(&from);

        let mut writer = BitWriter::new();
        encode_player_delta(&fields, from, &to, &mut writer).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let decoded = decode_player_delta(&fields, from, 3, &mut reader).unwrap();
        prop_assert_eq!(decoded, to);
    }

    #[test]
    fn unchanged_decodes_to_base((fields, base, _) in case_strategy()) {
        let number = EntityNumber::new(7);
        let from = EntityState { number, fields: base };

        let mut writer = BitWriter::new();
        encode_entity_delta(&fields, &from, Some(&from), true, &mut writer).unwrap();
        // number, remove bit, changed bit
        prop_assert_eq!(writer.bits_written(), 12);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        reader.read_bits(EntityNumber::BITS).unwrap();
        let decoded = decode_entity_delta(&fields, &from, number, &mut reader).unwrap();
        prop_assert_eq!(decoded, EntityDelta::Present(from));
    }

    #[test]
    fn unchanged_from_zero((fields, _, _) in case_strategy()) {
        let zero = EntityState::zeroed(EntityNumber::new(1), fields.len());
        let mut writer = BitWriter::new();
        encode_entity_delta(&fields, &zero, Some(&zero), false, &mut writer).unwrap();
        prop_assert_eq!(writer.bits_written(), 0);
    }
}
