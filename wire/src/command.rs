//! Server-to-client command tags.

/// First byte of every record in a server message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerCommand {
    Bad = 0,
    Nop = 1,
    Gamestate = 2,
    ConfigString = 3,
    Baseline = 4,
    ReliableCommand = 5,
    Download = 6,
    Snapshot = 7,
    Eof = 8,
    Voip = 9,
}

impl ServerCommand {
    /// Parses a command byte.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Bad),
            1 => Some(Self::Nop),
            2 => Some(Self::Gamestate),
            3 => Some(Self::ConfigString),
            4 => Some(Self::Baseline),
            5 => Some(Self::ReliableCommand),
            6 => Some(Self::Download),
            7 => Some(Self::Snapshot),
            8 => Some(Self::Eof),
            9 => Some(Self::Voip),
            _ => None,
        }
    }

    /// Returns the raw command byte.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Returns the diagnostic name used in message traces.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bad => "svc_bad",
            Self::Nop => "svc_nop",
            Self::Gamestate => "svc_gamestate",
            Self::ConfigString => "svc_configstring",
            Self::Baseline => "svc_baseline",
            Self::ReliableCommand => "svc_serverCommand",
            Self::Download => "svc_download",
            Self::Snapshot => "svc_snapshot",
            Self::Eof => "svc_EOF",
            Self::Voip => "svc_voip",
        }
    }
}
