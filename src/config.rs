//! Runtime knobs for the codec, the sentence layer and the byte-stream decoder.

/// Decode/encode options of [`crate::Codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    /// Reject payloads whose length is not a multiple of 8 bits.
    pub strict_byte_alignment: bool,
    /// Fail the decode when a spare field (`= K`) does not hold its constant.
    pub check_fixed_values: bool,
    /// Keep scaled fields as raw integers so that re-encoding is bit-exact.
    pub float_without_conversion: bool,
    /// Strip trailing spaces from strings as well as `@` padding.
    pub drop_space: bool,
    /// Accept binary acknowledge entries shorter than 32 bits.
    pub accept_short_ack: bool,
    /// Accept ship static data down to 420 bits.
    pub accept_short_ship_static_data: bool,
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict_byte_alignment(mut self, on: bool) -> Self {
        self.strict_byte_alignment = on;
        self
    }

    pub fn check_fixed_values(mut self, on: bool) -> Self {
        self.check_fixed_values = on;
        self
    }

    pub fn float_without_conversion(mut self, on: bool) -> Self {
        self.float_without_conversion = on;
        self
    }

    pub fn drop_space(mut self, on: bool) -> Self {
        self.drop_space = on;
        self
    }

    pub fn accept_short_ack(mut self, on: bool) -> Self {
        self.accept_short_ack = on;
        self
    }

    pub fn accept_short_ship_static_data(mut self, on: bool) -> Self {
        self.accept_short_ship_static_data = on;
        self
    }

    /// Minimum payload length accepted for a struct or message, overriding its fixed width.
    pub fn min_length_override(&self, name: &str) -> Option<usize> {
        match name {
            "BinaryAcknowledgeData" if self.accept_short_ack => Some(1),
            "ShipStaticData" if self.accept_short_ship_static_data => Some(420),
            _ => None,
        }
    }
}

/// Options of [`crate::NmeaCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NmeaConfig {
    /// Longest sentence produced by the encoder; 0 never splits.
    pub max_line_length: usize,
    /// Add an `n:` line count to the TAG-block of the first sentence of a group.
    pub add_line_count: bool,
    pub codec: CodecConfig,
}

impl Default for NmeaConfig {
    fn default() -> Self {
        NmeaConfig {
            max_line_length: 82,
            add_line_count: true,
            codec: CodecConfig::default(),
        }
    }
}

impl NmeaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_line_length(mut self, n: usize) -> Self {
        self.max_line_length = n;
        self
    }

    pub fn add_line_count(mut self, on: bool) -> Self {
        self.add_line_count = on;
        self
    }

    pub fn codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }
}

/// Options of [`crate::StreamDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamConfig {
    /// Accept sentences and TAG-blocks whatever their checksum.
    pub ignore_checksum: bool,
    pub codec: CodecConfig,
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_checksum(mut self, on: bool) -> Self {
        self.ignore_checksum = on;
        self
    }

    pub fn codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }
}
