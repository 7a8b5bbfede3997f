//! AIS radio channels: the A/B designator of a sentence and VHF channel numbers.

/// Radio channel designator carried in VDM/VDO sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    #[default]
    A,
    B,
}

impl Channel {
    /// `2`, `b`, `B`, `+`, `H` and `h` mean channel B; anything else channel A.
    pub fn from_designator(c: u8) -> Self {
        match c {
            b'2' | b'b' | b'B' | b'+' | b'H' | b'h' => Channel::B,
            _ => Channel::A,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Channel::A => 'A',
            Channel::B => 'B',
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Frequency in Hz of a channel number as used in channel management messages.
///
/// The thousands digit selects simplex/duplex operation (ITU-R M.1084 Annex 4): 1 keeps the
/// ship frequency, 2 adds the 4.6 MHz duplex offset. Channels in the simplex-only band ignore it.
/// Unknown channels map to 0.
pub fn channel_to_frequency(channel: u16) -> u32 {
    let c = u32::from(channel % 1000);
    let duplex = channel / 1000;

    let ship = match c {
        1..=28 => 156_050_000 + (c - 1) * 50_000,
        60..=88 => 156_025_000 + (c - 60) * 50_000,
        260..=287 => 156_037_500 + (c - 260) * 50_000,
        201..=228 => 156_062_500 + (c - 201) * 50_000,
        _ => return 0,
    };

    if (156_375_000..=156_887_500).contains(&ship) {
        return ship;
    }
    match duplex {
        1 => ship,
        2 => ship + 4_600_000,
        _ => 0,
    }
}
