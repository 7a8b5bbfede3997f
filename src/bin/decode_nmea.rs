//! Decode AIS messages from an NMEA log or feed and print per-kind statistics.
//!
//! Usage:
//!   decode_nmea [OPTIONS] [FILE]
//!   decode_nmea < feed.nmea
//!
//! Options:
//!   --stream, -s       Use the byte-stream decoder instead of line-by-line parsing
//!   --verbose, -v      Print a full dump of every decoded message
//!   --dump[=PATH]      Write one summary line per message to PATH (or stdout)
//!   --check-fixed      Reject messages whose spare fields are not zero
//!
//! Log level is taken from RUST_LOG (e.g. `RUST_LOG=aisdsl=debug`).

use aisdsl::dump::{message_summary_line, message_to_dump};
use aisdsl::{
    AisParsed, CodecConfig, Message, MessageKind, NmeaCodec, NmeaConfig, NmeaParsed, StreamConfig,
    StreamDecoder, StreamHandler,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Stats {
    sentences: u64,
    malformed: u64,
    packets: u64,
    undecoded: u64,
    by_kind: BTreeMap<&'static str, u64>,
}

struct Printer {
    verbose: bool,
    dump: Option<Box<dyn Write>>,
    stats: Stats,
}

impl Printer {
    fn message(&mut self, message: &Message) -> io::Result<()> {
        *self.stats.by_kind.entry(message.kind.name()).or_default() += 1;
        if self.verbose {
            println!("{}", message_to_dump(message));
        }
        if let Some(w) = self.dump.as_mut() {
            writeln!(w, "{}", message_summary_line(message))?;
        }
        Ok(())
    }
}

impl StreamHandler for Printer {
    type Error = io::Error;

    fn nmea(&mut self, _parsed: NmeaParsed<'_>) -> io::Result<()> {
        self.stats.sentences += 1;
        Ok(())
    }

    fn encapsulated(&mut self, _parsed: NmeaParsed<'_>) -> io::Result<()> {
        self.stats.sentences += 1;
        Ok(())
    }

    fn ais(&mut self, _parsed: NmeaParsed<'_>, ais: AisParsed<'_>) -> io::Result<()> {
        self.stats.packets += 1;
        self.message(&ais.message)
    }
}

fn run_lines(input: Box<dyn Read>, config: NmeaConfig, printer: &mut Printer) -> anyhow::Result<()> {
    let mut nmea = NmeaCodec::new(config);
    for line in BufReader::new(input).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        printer.stats.sentences += 1;
        match nmea.parse_sentence(&line) {
            Ok(None) => {}
            Ok(Some(packet)) => {
                printer.stats.packets += 1;
                match &packet.message {
                    Some(m) => printer.message(m)?,
                    None => printer.stats.undecoded += 1,
                }
            }
            Err(e) => {
                printer.stats.malformed += 1;
                tracing::debug!(error = %e, line = %line, "sentence rejected");
            }
        }
    }
    eprintln!("still buffered: {} fragment(s)", nmea.buffered_messages());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut flag = |names: &[&str]| match args.iter().position(|a| names.contains(&a.as_str())) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    };
    let stream = flag(&["--stream", "-s"]);
    let verbose = flag(&["--verbose", "-v"]);
    let check_fixed = flag(&["--check-fixed"]);
    let dump_path: Option<PathBuf> = args
        .iter()
        .position(|a| a.starts_with("--dump"))
        .and_then(|pos| {
            let arg = args.remove(pos);
            if arg == "--dump" {
                Some(PathBuf::from("-"))
            } else {
                arg.strip_prefix("--dump=").map(PathBuf::from)
            }
        });

    let input: Box<dyn Read> = match args.first().map(String::as_str) {
        None | Some("-") => Box::new(io::stdin()),
        Some(path) => Box::new(File::open(path)?),
    };
    let dump: Option<Box<dyn Write>> = match dump_path {
        None => None,
        Some(p) if p.as_os_str() == "-" => Some(Box::new(io::stdout())),
        Some(p) => Some(Box::new(File::create(p)?)),
    };

    let codec = CodecConfig::new().check_fixed_values(check_fixed);
    let mut printer = Printer {
        verbose,
        dump,
        stats: Stats::default(),
    };

    if stream {
        let mut decoder = StreamDecoder::new(StreamConfig::new().codec(codec), printer);
        let mut input = input;
        io::copy(&mut input, &mut decoder)?;
        printer = decoder.into_handler();
    } else {
        run_lines(input, NmeaConfig::new().codec(codec), &mut printer)?;
    }

    if let Some(w) = printer.dump.as_mut() {
        w.flush()?;
    }
    let s = &printer.stats;
    eprintln!(
        "sentences: {}, malformed: {}, packets: {}, undecoded: {}",
        s.sentences, s.malformed, s.packets, s.undecoded
    );
    for kind in MessageKind::ALL {
        if let Some(n) = s.by_kind.get(kind.name()) {
            eprintln!("  {:<36} {}", kind.name(), n);
        }
    }
    Ok(())
}
