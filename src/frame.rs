//! Sentence-level codec: VDM/VDO lines in, reassembled and decoded packets out, and back.

use crate::assembler::Assembler;
use crate::channel::Channel;
use crate::codec::Codec;
use crate::config::NmeaConfig;
use crate::message::Message;
use crate::sentence::{armor, checksum, parse_sentence, NmeaError, VdmSentence};
use crate::tagblock::TagBlock;
use tracing::{debug, trace};

/// Sentence overhead besides the payload: `!`, `AIVDM,x,y,z,c,`, `,f`, `*CC` and CR/LF.
const SENTENCE_OVERHEAD: usize = 22;

/// A payload with its sentence metadata, either reassembled from sentences or to be encoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VdmPacket {
    pub channel: Channel,
    pub talker_id: String,
    /// `VDM` or `VDO`.
    pub message_type: String,
    /// Payload bits, one per byte.
    pub payload: Vec<u8>,
    /// Decoded message; `None` when the codec refused the payload.
    pub message: Option<Message>,
    pub tag_block: TagBlock,
}

impl VdmPacket {
    /// Packet to encode from a message, as `!AIVDM` on channel A.
    pub fn from_message(message: Message) -> Self {
        VdmPacket {
            talker_id: "AI".to_string(),
            message_type: "VDM".to_string(),
            message: Some(message),
            ..VdmPacket::default()
        }
    }
}

#[derive(Debug)]
pub struct NmeaCodec {
    pub config: NmeaConfig,
    codec: Codec,
    assembler: Assembler,
    seq: u32,
}

impl Default for NmeaCodec {
    fn default() -> Self {
        NmeaCodec::new(NmeaConfig::default())
    }
}

impl NmeaCodec {
    pub fn new(config: NmeaConfig) -> Self {
        NmeaCodec {
            codec: Codec::new(config.codec),
            config,
            assembler: Assembler::new(),
            seq: 0,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Fragments waiting in the reassembler.
    pub fn buffered_messages(&self) -> usize {
        self.assembler.buffered_messages()
    }

    /// Parse one sentence line.
    ///
    /// `Ok(None)` when the sentence was buffered or dropped by the reassembler,
    /// `Ok(Some(_))` once a payload is complete.
    pub fn parse_sentence(&mut self, line: &str) -> Result<Option<VdmPacket>, NmeaError> {
        let sentence = parse_sentence(line)?;
        Ok(self.parse_vdm(sentence))
    }

    /// Feed an already parsed sentence.
    pub fn parse_vdm(&mut self, sentence: VdmSentence) -> Option<VdmPacket> {
        let mut packet = self.assembler.process(sentence)?;
        match self.codec.decode_packet(&packet.payload) {
            Ok(message) => packet.message = Some(message),
            Err(e) => trace!(error = %e, bits = packet.payload.len(), "reassembled payload not decoded"),
        }
        Some(packet)
    }

    /// Encode a packet into checksummed sentence lines, without line terminators.
    ///
    /// Raw `payload` bits take precedence; otherwise `message` is encoded first.
    pub fn encode_sentence(&mut self, packet: &VdmPacket) -> Result<Vec<String>, NmeaError> {
        let encoded;
        let bits = if !packet.payload.is_empty() {
            &packet.payload
        } else if let Some(message) = &packet.message {
            encoded = self.codec.encode_packet(message)?;
            &encoded
        } else {
            return Err(NmeaError::NothingToEncode);
        };

        let (text, fill) = armor(bits);
        let capacity = self.config.max_line_length.saturating_sub(SENTENCE_OVERHEAD).max(1);
        let prefix = format!("{}{}", packet.talker_id, packet.message_type);
        let channel = packet.channel.as_char();

        let mut lines = Vec::new();
        if self.config.max_line_length == 0 || text.len() <= capacity {
            let body = format!("{},1,1,,{},{},{}", prefix, channel, text, fill);
            lines.push(self.finish(&packet.tag_block, 1, 1, body));
        } else {
            let chunks: Vec<&[u8]> = text.as_bytes().chunks(capacity).collect();
            let count = chunks.len();
            for (i, chunk) in chunks.iter().enumerate() {
                let last_fill = if i + 1 == count { fill } else { 0 };
                let body = format!(
                    "{},{},{},{},{},{},{}",
                    prefix,
                    count,
                    i + 1,
                    self.seq,
                    channel,
                    String::from_utf8_lossy(chunk),
                    last_fill
                );
                lines.push(self.finish(&packet.tag_block, i + 1, count, body));
            }
            self.seq = (self.seq + 1) % 10;
        }
        debug!(sentences = lines.len(), bits = bits.len(), "packet encoded");
        Ok(lines)
    }

    fn finish(&self, tag_block: &TagBlock, index: usize, count: usize, body: String) -> String {
        let tags = tag_block.encode(index, count, self.seq, self.config.add_line_count);
        format!("{}!{}*{:02X}", tags, body, checksum(body.as_bytes()))
    }
}
