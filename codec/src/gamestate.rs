//! Config strings and gamestate bootstrap.

use bitstream::{BitReader, BitWriter};
use tracing::debug;
use wire::protocol::{CS_SYSTEMINFO, MAX_CLIENTS, MAX_SPLITVIEW};
use wire::{DecodeError, ServerCommand};

use crate::error::{CodecError, CodecResult};
use crate::limits::ClientLimits;

/// All config strings packed into one bounded buffer.
///
/// Every slot is an offset into `data`. Offset 0 points at the leading NUL
/// and stands for the empty string, so `data_count` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    offsets: Vec<usize>,
    data: Vec<u8>,
    max_chars: usize,
}

impl GameState {
    /// Creates an empty game state with `slots` config strings and a buffer
    /// of `max_chars` bytes.
    #[must_use]
    pub fn new(slots: usize, max_chars: usize) -> Self {
        Self {
            offsets: vec![0; slots],
            data: vec![0],
            max_chars,
        }
    }

    /// Creates an empty game state sized by `limits`.
    #[must_use]
    pub fn with_limits(limits: &ClientLimits) -> Self {
        Self::new(limits.max_configstrings, limits.max_gamestate_chars)
    }

    /// Number of config string slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Bytes in use, including the shared leading NUL.
    #[must_use]
    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    /// Returns config string `index`, empty if never set.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        let start = *self.offsets.get(index)?;
        let tail = self.data.get(start..)?;
        let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
        std::str::from_utf8(&tail[..end]).ok()
    }

    /// Appends config string `index` to the buffer.
    ///
    /// Used while a gamestate is being read; earlier text for the same slot
    /// stays in the buffer until the next [`replace`](Self::replace).
    pub fn set(&mut self, index: usize, value: &str) -> CodecResult<()> {
        self.check_index(index)?;
        let bytes = value.as_bytes();
        let needed = bytes.len() + 1 + self.data.len();
        if needed > self.max_chars {
            return Err(CodecError::GamestateOverflow {
                needed,
                limit: self.max_chars,
            });
        }
        self.offsets[index] = self.data.len();
        self.data.extend_from_slice(bytes);
        self.data.push(0);
        Ok(())
    }

    /// Replaces one config string, repacking the buffer.
    ///
    /// Returns `false` if the value was already current.
    pub fn replace(&mut self, index: usize, value: &str) -> CodecResult<bool> {
        self.check_index(index)?;
        if self.get(index) == Some(value) {
            return Ok(false);
        }

        let old: Vec<String> = (0..self.len())
            .map(|i| self.get(i).unwrap_or_default().to_owned())
            .collect();
        let mut rebuilt = Self::new(self.len(), self.max_chars);
        for (i, text) in old.iter().enumerate() {
            let text = if i == index { value } else { text.as_str() };
            if !text.is_empty() {
                rebuilt.set(i, text)?;
            }
        }
        *self = rebuilt;
        Ok(true)
    }

    /// Iterates over non-empty config strings in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        (0..self.len()).filter_map(move |i| {
            if self.offsets[i] == 0 {
                return None;
            }
            self.get(i).map(|s| (i, s))
        })
    }

    /// Returns `sv_serverid` from the system info string, 0 if missing.
    #[must_use]
    pub fn server_id(&self) -> i32 {
        self.get(CS_SYSTEMINFO)
            .and_then(|info| info_value_for_key(info, "sv_serverid"))
            .map_or(0, parse_leading_int)
    }

    fn check_index(&self, index: usize) -> CodecResult<()> {
        if index >= self.len() {
            return Err(CodecError::ConfigStringIndex {
                index: i32::try_from(index).unwrap_or(i32::MAX),
                max: self.len(),
            });
        }
        Ok(())
    }
}

/// Looks up `key` in a `\key\value\key\value` info string.
///
/// Keys compare ASCII case-insensitively.
#[must_use]
pub fn info_value_for_key<'a>(info: &'a str, key: &str) -> Option<&'a str> {
    let mut parts = info.strip_prefix('\\').unwrap_or(info).split('\\');
    while let Some(name) = parts.next() {
        let value = parts.next().unwrap_or_default();
        if name.eq_ignore_ascii_case(key) {
            return Some(value);
        }
    }
    None
}

/// Parses an optional sign and leading digits, stopping at the first other byte.
fn parse_leading_int(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, d| acc.wrapping_mul(10).wrapping_add(i32::from(d - b'0')));
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Result of reading a gamestate command.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    /// Reliable server command sequence the gamestate was sent at.
    pub server_command_sequence: i32,
    pub game_state: GameState,
    /// Server client numbers for each split view.
    pub client_nums: [Option<u8>; MAX_SPLITVIEW],
}

/// Reads a gamestate command body.
///
/// Config strings follow until an `Eof` tag; any other tag is fatal. The
/// trailer names the local client number of each split view.
pub fn decode_gamestate(
    reader: &mut BitReader<'_>,
    wire_limits: &wire::Limits,
    limits: &ClientLimits,
) -> CodecResult<Bootstrap> {
    let server_command_sequence = reader.read_i32()?;
    let mut game_state = GameState::with_limits(limits);

    loop {
        let tag = reader.read_u8()?;
        match ServerCommand::from_raw(tag) {
            Some(ServerCommand::Eof) => break,
            Some(ServerCommand::ConfigString) => {
                let index = read_config_index(reader, limits)?;
                let value = reader.read_string(wire_limits.max_big_string_chars)?;
                game_state.set(index, &value)?;
            }
            _ => return Err(DecodeError::UnknownCommand { tag }.into()),
        }
    }

    let mut client_nums = [None; MAX_SPLITVIEW];
    for slot in &mut client_nums {
        let raw = reader.read_i32()?;
        *slot = u8::try_from(raw)
            .ok()
            .filter(|n| usize::from(*n) < MAX_CLIENTS);
    }

    debug!(
        sequence = server_command_sequence,
        configstrings = game_state.iter().count(),
        data_count = game_state.data_count(),
        "gamestate"
    );
    Ok(Bootstrap {
        server_command_sequence,
        game_state,
        client_nums,
    })
}

/// Reads a config string index and checks it against the slot count.
pub(crate) fn read_config_index(
    reader: &mut BitReader<'_>,
    limits: &ClientLimits,
) -> CodecResult<usize> {
    let index = reader.read_i16()?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < limits.max_configstrings)
        .ok_or(CodecError::ConfigStringIndex {
            index: i32::from(index),
            max: limits.max_configstrings,
        })
}

/// Writes a gamestate command body, tag excluded.
pub fn encode_gamestate(
    server_command_sequence: i32,
    game_state: &GameState,
    client_nums: &[Option<u8>; MAX_SPLITVIEW],
    writer: &mut BitWriter,
) -> CodecResult<()> {
    writer.write_i32(server_command_sequence);
    for (index, value) in game_state.iter() {
        let index = i16::try_from(index).map_err(|_| CodecError::ConfigStringIndex {
            index: i32::try_from(index).unwrap_or(i32::MAX),
            max: game_state.len(),
        })?;
        writer.write_u8(ServerCommand::ConfigString.raw());
        writer.write_i16(index);
        writer.write_string(value);
    }
    writer.write_u8(ServerCommand::Eof.raw());
    for slot in client_nums {
        writer.write_i32(slot.map_or(-1, i32::from));
    }
    Ok(())
}
