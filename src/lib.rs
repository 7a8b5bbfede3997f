//! # aisdsl — AIS message codec driven by a layout DSL
//!
//! AIS (ITU-R M.1371-5) message layouts are written in a small DSL, parsed with a PEST
//! grammar and interpreted by one generic walker that encodes and decodes payload bits.
//! On top sits the NMEA 0183 layer: VDM/VDO sentences, TAG-blocks, fragment reassembly
//! and an incremental byte-stream decoder.
//!
//! ## DSL structure
//!
//! - **Structs**: reusable groups of fields; `tracked` structs carry a valid flag,
//!   `optional` structs may be cut off by the end of the payload
//! - **Messages**: `message Name(id, ...) max BITS { ... }`
//!
//! ## Field types
//!
//! - `uint(n)`, `int(n)`, `bool`
//! - `scaled(n, tenths|fine|coarse)` fixed-point values decoded to `f64`
//! - `string(n)`; `string(*)` / `bits(*)` take the remaining payload
//! - Struct references and `[Struct; n]` arrays of tracked structs
//! - `= K` (encoded as K, checked on decode on request), `if flag @ bit` / `if !flag @ bit`
//!
//! ## Example DSL
//!
//! ```text
//! struct Header {
//!     message_id: uint(6);
//!     repeat_indicator: uint(2);
//!     user_id: uint(30);
//! }
//!
//! message SafetyBroadcastMessage(14) max 1008 {
//!     header: Header;
//!     spare: uint(2) = 0;
//!     text: string(*);
//! }
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use aisdsl::{NmeaCodec, NmeaConfig};
//!
//! let mut nmea = NmeaCodec::new(NmeaConfig::default());
//! if let Ok(Some(packet)) = nmea.parse_sentence("!AIVDM,1,1,,B,10bb7q@P0lPGHlVMhbl0Qgw>2>`<,0*7F") {
//!     println!("{:?}", packet.message);
//! }
//! ```

pub mod assembler;
pub mod ast;
pub mod bits;
pub mod channel;
pub mod codec;
pub mod config;
pub mod dump;
pub mod frame;
pub mod lint;
pub mod message;
pub mod parser;
pub mod schema;
pub mod sentence;
pub mod stream;
pub mod tagblock;
pub mod value;

pub use ast::{Protocol, ResolvedProtocol};
pub use channel::{channel_to_frequency, Channel};
pub use codec::{Codec, CodecError};
pub use config::{CodecConfig, NmeaConfig, StreamConfig};
pub use frame::{NmeaCodec, VdmPacket};
pub use message::{Header, Message};
pub use parser::parse;
pub use schema::{schema, MessageKind};
pub use sentence::{parse_sentence, NmeaError, VdmSentence};
pub use stream::{AisParsed, NmeaParsed, StreamDecoder, StreamHandler};
pub use tagblock::TagBlock;
pub use value::{Record, Value};
