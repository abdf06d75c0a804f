//! Recorded demo streams.
//!
//! A demo is a sequence of records, each a little-endian `i32` message
//! sequence, a little-endian `i32` length and that many message bytes. A
//! record with sequence and length both `-1` ends the stream.

use anyhow::{bail, Context, Result};

/// One recorded server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoMessage {
    pub sequence: i32,
    pub data: Vec<u8>,
}

const END_MARKER: i32 = -1;

/// Parses a demo stream. A stream that ends without the end marker is
/// accepted as long as it ends on a record boundary.
pub fn read_demo(bytes: &[u8], max_message_bytes: usize) -> Result<Vec<DemoMessage>> {
    let mut messages = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let sequence = read_i32_le(bytes, offset).context("record sequence")?;
        let len = read_i32_le(bytes, offset + 4).context("record length")?;
        offset += 8;
        if sequence == END_MARKER && len == END_MARKER {
            break;
        }
        let Ok(len) = usize::try_from(len) else {
            bail!("negative length {len} in record {}", messages.len());
        };
        if len > max_message_bytes {
            bail!("record {} is {len} bytes, limit {max_message_bytes}", messages.len());
        }
        let Some(data) = bytes.get(offset..offset + len) else {
            bail!("record {} truncated", messages.len());
        };
        messages.push(DemoMessage {
            sequence,
            data: data.to_vec(),
        });
        offset += len;
    }
    Ok(messages)
}

/// Serializes messages as a demo stream, end marker included.
#[must_use]
pub fn write_demo(messages: &[DemoMessage]) -> Vec<u8> {
    let mut out = Vec::with_capacity(messages.iter().map(|m| m.data.len() + 8).sum::<usize>() + 8);
    for message in messages {
        out.extend_from_slice(&message.sequence.to_le_bytes());
        out.extend_from_slice(&(message.data.len() as i32).to_le_bytes());
        out.extend_from_slice(&message.data);
    }
    out.extend_from_slice(&END_MARKER.to_le_bytes());
    out.extend_from_slice(&END_MARKER.to_le_bytes());
    out
}

fn read_i32_le(bytes: &[u8], offset: usize) -> Result<i32> {
    let Some(raw) = bytes.get(offset..offset + 4) else {
        bail!("unexpected end of demo at byte {offset}");
    };
    let mut buf = [0u8; 4];
    buf.copy_from_slice(raw);
    Ok(i32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DemoMessage> {
        vec![
            DemoMessage {
                sequence: 1,
                data: vec![0, 0, 0, 0, 8],
            },
            DemoMessage {
                sequence: 2,
                data: vec![],
            },
        ]
    }

    #[test]
    fn write_then_read() {
        let bytes = write_demo(&sample());
        assert_eq!(bytes.len(), 8 + 5 + 8 + 8);
        assert_eq!(read_demo(&bytes, 16).unwrap(), sample());
    }

    #[test]
    fn missing_end_marker_is_accepted() {
        let mut bytes = write_demo(&sample());
        bytes.truncate(bytes.len() - 8);
        assert_eq!(read_demo(&bytes, 16).unwrap(), sample());
    }

    #[test]
    fn truncated_record_fails() {
        let mut bytes = write_demo(&sample());
        bytes.truncate(10);
        assert!(read_demo(&bytes, 16).is_err());
    }

    #[test]
    fn oversized_record_fails() {
        let bytes = write_demo(&sample());
        let err = read_demo(&bytes, 4).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }
}
