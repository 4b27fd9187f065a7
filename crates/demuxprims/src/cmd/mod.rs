use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use demuxprims_dispatch::{Dispatcher, DrainStats, ParserConfig};
use demuxprims_frame::{FrameCandidate, HeaderCodec};
use demuxprims_protocols::ParsingOptions;

use crate::exit::{dispatch_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub mod checksum;
pub mod envinfo;
pub mod header;
pub mod parse;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse capture files, one source per file.
    Parse(ParseArgs),
    /// Parse a live byte stream from stdin.
    Stream(StreamArgs),
    /// Decode a frame preamble given as hex.
    Header(HeaderArgs),
    /// Compute the CRC-CCITT of hex input and check its trailer.
    Checksum(ChecksumArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print registered frame types and the effective parser configuration.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Parse(args) => parse::run(args, format),
        Command::Stream(args) => stream::run(args, format),
        Command::Header(args) => header::run(args, format),
        Command::Checksum(args) => checksum::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

/// Frame header layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    /// IEEE 1344 style, 6-byte preamble.
    A,
    /// PDCstream style, 4-byte preamble with 0xAA sync.
    B,
}

/// Options shared by commands that run a dispatcher.
#[derive(Args, Debug)]
pub struct DispatchArgs {
    /// Frame header layout.
    #[arg(long, short = 'p', value_enum, default_value = "a")]
    pub protocol: Protocol,
    /// Read the protocol B word count from one byte (older encoders).
    #[arg(long)]
    pub legacy_word_count: bool,
    /// Failed attempts per source before leftover bytes are discarded.
    #[arg(long, value_name = "N")]
    pub reuse_limit: Option<u32>,
    /// JSON parser configuration file.
    #[arg(long, value_name = "FILE", env = "DEMUXPRIMS_CONFIG")]
    pub config: Option<PathBuf>,
}

impl DispatchArgs {
    /// Load the config file, if any, and apply flag overrides.
    pub fn parser_config(&self) -> CliResult<ParserConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
                ParserConfig::from_json(&text)
                    .map_err(|err| dispatch_error(&format!("config {}", path.display()), err))?
            }
            None => ParserConfig::default(),
        };
        if let Some(limit) = self.reuse_limit {
            config.unparsed_data_reuse_limit = limit;
        }
        Ok(config)
    }

    pub fn parsing_options(&self) -> ParsingOptions {
        ParsingOptions {
            legacy_word_count: self.legacy_word_count,
        }
    }
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Capture files. Each file is treated as one source.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
    #[command(flatten)]
    pub dispatch: DispatchArgs,
    /// Split files into images of N bytes, interleaved across sources.
    #[arg(long, value_name = "N")]
    pub chunk: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,
    /// Source identifier for stdin bytes.
    #[arg(long, default_value = "stdin")]
    pub source: String,
    /// Bytes requested per stdin read.
    #[arg(long, value_name = "BYTES", default_value_t = 4096)]
    pub read_size: usize,
    /// Milliseconds between drains.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub interval_ms: u64,
}

#[derive(Args, Debug)]
pub struct HeaderArgs {
    /// Frame bytes as hex, optionally 0x-prefixed. Whitespace is ignored.
    pub hex: String,
    #[arg(long, short = 'p', value_enum, default_value = "a")]
    pub protocol: Protocol,
    #[arg(long)]
    pub legacy_word_count: bool,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Bytes as hex; the last two are treated as the big-endian trailer.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct EnvinfoArgs {
    /// Configuration and protocol to resolve, as the dispatching commands would.
    #[command(flatten)]
    pub dispatch: DispatchArgs,
}

/// Build a dispatcher and register `candidates`.
pub fn start_dispatcher<C: HeaderCodec>(
    codec: C,
    candidates: &[FrameCandidate<C::Id>],
    config: ParserConfig,
) -> CliResult<Dispatcher<C>> {
    let dispatcher =
        Dispatcher::new(codec, config).map_err(|err| dispatch_error("invalid configuration", err))?;
    let registered = dispatcher
        .start(candidates)
        .map_err(|err| dispatch_error("frame type discovery failed", err))?;
    if registered == 0 {
        return Err(CliError::new(
            crate::exit::INTERNAL,
            "no frame types registered",
        ));
    }
    Ok(dispatcher)
}

/// Exit code for a finished run: anything dropped or left over is invalid data.
pub fn exit_code(stats: &DrainStats, held_bytes: usize) -> i32 {
    if stats.is_lossless() && held_bytes == 0 {
        SUCCESS
    } else {
        DATA_INVALID
    }
}

pub fn decode_hex(input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("expected an even, non-zero number of hex digits, got {}", digits.len()),
        ));
    }
    let mut out = vec![0u8; digits.len() / 2];
    faster_hex::hex_decode(digits.as_bytes(), &mut out)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))?;
    Ok(out)
}
