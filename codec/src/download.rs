//! File download chunk framing.
//!
//! The client only frames and queues chunks here; writing them to disk and
//! acknowledging blocks is the download layer's job.

use std::collections::VecDeque;

use bitstream::{BitReader, BitWriter};
use tracing::debug;
use wire::protocol::MAX_MSGLEN;

use crate::error::{CodecError, CodecResult};

/// One received download block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadChunk {
    pub block: u16,
    /// Empty for the final block.
    pub data: Vec<u8>,
}

/// Progress of the current download.
#[derive(Debug, Default)]
pub struct DownloadState {
    /// Block the client expects next.
    pub expected_block: u32,
    /// Total size announced with block 0.
    pub size: Option<i32>,
    /// Bytes received so far.
    pub count: usize,
    /// Set once the zero-length final block has been received.
    pub complete: bool,
    chunks: VecDeque<DownloadChunk>,
}

impl DownloadState {
    /// Drains queued chunks in arrival order.
    pub fn take_chunks(&mut self) -> Vec<DownloadChunk> {
        self.chunks.drain(..).collect()
    }

    /// Number of chunks waiting to be taken.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.chunks.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Reads a download command body.
///
/// A negative total size on block 0 means the server refused the file; its
/// reason string follows and the refusal is fatal. Blocks other than the
/// expected one are read and dropped.
pub fn decode_download(
    state: &mut DownloadState,
    reader: &mut BitReader<'_>,
    limits: &wire::Limits,
) -> CodecResult<()> {
    let block = reader.read_i16()? as u16;

    if block == 0 && state.expected_block == 0 {
        let size = reader.read_i32()?;
        state.size = Some(size);
        if size < 0 {
            let reason = reader.read_string(limits.max_string_chars)?;
            return Err(CodecError::DownloadRefused { reason });
        }
    }

    let size = reader.read_i16()?;
    let len = usize::try_from(size)
        .ok()
        .filter(|len| *len <= MAX_MSGLEN)
        .ok_or(CodecError::DownloadChunkSize {
            size: i32::from(size),
            max: MAX_MSGLEN,
        })?;
    let data = reader.read_bytes(len)?;

    if (state.expected_block & 0xFFFF) as u16 != block {
        debug!(
            expected = state.expected_block,
            got = block,
            "dropping out of order download block"
        );
        return Ok(());
    }

    state.expected_block += 1;
    state.count += len;
    if len == 0 {
        state.complete = true;
        debug!(bytes = state.count, "download complete");
    }
    state.chunks.push_back(DownloadChunk { block, data });
    Ok(())
}

/// Writes a download command body, tag excluded.
///
/// `total_size` is only written for block 0.
pub fn encode_download(block: u16, total_size: Option<i32>, data: &[u8], writer: &mut BitWriter) {
    writer.write_i16(block as i16);
    if block == 0 {
        writer.write_i32(total_size.unwrap_or(0));
    }
    writer.write_i16(data.len().min(MAX_MSGLEN) as i16);
    writer.write_data(&data[..data.len().min(MAX_MSGLEN)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(state: &mut DownloadState, bytes: &[u8]) -> CodecResult<()> {
        let mut reader = BitReader::new(bytes);
        decode_download(state, &mut reader, &wire::Limits::for_testing())
    }

    #[test]
    fn blocks_in_order() {
        let mut state = DownloadState::default();
        let mut writer = BitWriter::new();
        encode_download(0, Some(5), b"abc", &mut writer);
        encode_download(1, None, b"de", &mut writer);
        encode_download(2, None, b"", &mut writer);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for _ in 0..3 {
            decode_download(&mut state, &mut reader, &wire::Limits::for_testing()).unwrap();
        }
        assert!(reader.is_empty());
        assert_eq!(state.size, Some(5));
        assert_eq!(state.count, 5);
        assert!(state.complete);
        let chunks = state.take_chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].data, b"de");
        assert_eq!(state.pending(), 0);
    }

    #[test]
    fn unexpected_block_dropped() {
        let mut state = DownloadState::default();
        let mut writer = BitWriter::new();
        encode_download(3, None, b"zz", &mut writer);
        // block 3 is not 0, so no size field precedes the chunk
        decode(&mut state, &writer.finish()).unwrap();
        assert_eq!(state.pending(), 0);
        assert_eq!(state.expected_block, 0);
    }

    #[test]
    fn refusal_is_fatal() {
        let mut writer = BitWriter::new();
        writer.write_i16(0);
        writer.write_i32(-1);
        writer.write_string("file not found");
        let err = decode(&mut DownloadState::default(), &writer.finish()).unwrap_err();
        assert_eq!(
            err,
            CodecError::DownloadRefused {
                reason: "file not found".into()
            }
        );
    }

    #[test]
    fn negative_chunk_size_is_fatal() {
        let mut writer = BitWriter::new();
        writer.write_i16(0);
        writer.write_i32(10);
        writer.write_i16(-4);
        let err = decode(&mut DownloadState::default(), &writer.finish()).unwrap_err();
        assert!(matches!(err, CodecError::DownloadChunkSize { size: -4, .. }));
    }
}
