//! Voice packet framing.
//!
//! Frames are queued opaque; decoding audio belongs to the sound layer.

use bitstream::{BitReader, BitWriter};
use tracing::debug;
use wire::protocol::{MAX_CLIENTS, VOIP_FLAGCNT};

use crate::error::CodecResult;

/// One voice packet addressed to the local client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoipPacket {
    pub sender: u8,
    pub generation: u8,
    pub sequence: i32,
    pub flags: u8,
    pub frames: Vec<Vec<u8>>,
}

/// Reads a voice command body.
///
/// Returns `None` when the packet is dropped. Packets with a negative header
/// field stop without reading a payload. Packets that are too large, from an
/// unknown sender or from one of `ignored` skip exactly `packet_size` bytes.
pub fn decode_voip(
    reader: &mut BitReader<'_>,
    limits: &wire::Limits,
    ignored: &[Option<u8>],
) -> CodecResult<Option<VoipPacket>> {
    let sender = reader.read_i16()?;
    let generation = reader.read_u8()?;
    let sequence = reader.read_i32()?;
    let frame_count = reader.read_u8()?;
    let packet_size = reader.read_i16()?;
    let flags = reader.read_bits(VOIP_FLAGCNT)? as u8;

    let (Ok(sender), Ok(packet_size)) = (u16::try_from(sender), usize::try_from(packet_size)) else {
        debug!("malformed voip header");
        return Ok(None);
    };
    if sequence < 0 {
        debug!("malformed voip header");
        return Ok(None);
    }

    if packet_size > limits.max_voip_packet_bytes {
        debug!(packet_size, "voip packet too large");
        reader.skip_bytes(packet_size)?;
        return Ok(None);
    }
    let sender = match u8::try_from(sender) {
        Ok(s) if usize::from(s) < MAX_CLIENTS && !ignored.contains(&Some(s)) => s,
        _ => {
            debug!(sender, "ignoring voip packet");
            reader.skip_bytes(packet_size)?;
            return Ok(None);
        }
    };

    let mut frames = Vec::with_capacity(usize::from(frame_count));
    for _ in 0..frame_count {
        let len = reader.read_u8()?;
        frames.push(reader.read_bytes(usize::from(len))?);
    }
    Ok(Some(VoipPacket {
        sender,
        generation,
        sequence,
        flags,
        frames,
    }))
}

/// Writes a voice command body, tag excluded.
pub fn encode_voip(packet: &VoipPacket, writer: &mut BitWriter) -> CodecResult<()> {
    let packet_size: usize = packet.frames.iter().map(|f| 1 + f.len().min(255)).sum();
    writer.write_i16(i16::from(packet.sender));
    writer.write_u8(packet.generation);
    writer.write_i32(packet.sequence);
    writer.write_u8(packet.frames.len().min(255) as u8);
    writer.write_i16(packet_size.min(i16::MAX as usize) as i16);
    writer.write_bits(u32::from(packet.flags), VOIP_FLAGCNT)?;
    for frame in packet.frames.iter().take(255) {
        let len = frame.len().min(255);
        writer.write_u8(len as u8);
        writer.write_data(&frame[..len]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(sender: u8, frames: Vec<Vec<u8>>) -> VoipPacket {
        VoipPacket {
            sender,
            generation: 2,
            sequence: 40,
            flags: 1,
            frames,
        }
    }

    #[test]
    fn accepted_packet() {
        let sent = packet(5, vec![vec![1, 2, 3], vec![4]]);
        let mut writer = BitWriter::new();
        encode_voip(&sent, &mut writer).unwrap();
        writer.write_u8(0xEE);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let got = decode_voip(&mut reader, &wire::Limits::for_testing(), &[]).unwrap();
        assert_eq!(got, Some(sent));
        assert_eq!(reader.read_u8().unwrap(), 0xEE);
    }

    #[test]
    fn own_voice_is_skipped_exactly() {
        let sent = packet(5, vec![vec![9; 10]]);
        let mut writer = BitWriter::new();
        encode_voip(&sent, &mut writer).unwrap();
        writer.write_u8(0xEE);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let got = decode_voip(&mut reader, &wire::Limits::for_testing(), &[Some(5)]).unwrap();
        assert_eq!(got, None);
        assert_eq!(reader.read_u8().unwrap(), 0xEE);
    }

    #[test]
    fn oversized_packet_is_skipped() {
        let sent = packet(1, vec![vec![0; 100]]);
        let mut writer = BitWriter::new();
        encode_voip(&sent, &mut writer).unwrap();
        writer.write_u8(0xEE);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let got = decode_voip(&mut reader, &wire::Limits::for_testing(), &[]).unwrap();
        assert_eq!(got, None);
        assert_eq!(reader.read_u8().unwrap(), 0xEE);
    }

    #[test]
    fn negative_sender_reads_no_payload() {
        let mut writer = BitWriter::new();
        writer.write_i16(-1);
        writer.write_u8(0);
        writer.write_i32(0);
        writer.write_u8(1);
        writer.write_i16(4);
        writer.write_bits(0, VOIP_FLAGCNT).unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(
            decode_voip(&mut reader, &wire::Limits::for_testing(), &[]).unwrap(),
            None
        );
        assert_eq!(reader.bit_position(), 16 + 8 + 32 + 8 + 16 + 2);
    }
}
