use demuxprims_frame::{crc_ccitt, CHECKSUM_SIZE};
use serde::Serialize;

use crate::cmd::{decode_hex, ChecksumArgs};
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize, Debug, PartialEq, Eq)]
struct ChecksumOutput {
    length: usize,
    /// CRC over every byte but the trailer.
    computed: String,
    /// CRC over all input bytes.
    full: String,
    received: Option<String>,
    valid: Option<bool>,
}

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = decode_hex(&args.hex)?;
    let out = compute(&bytes);

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("  Length:    {}", out.length);
            println!("  Computed:  {}", out.computed);
            println!("  Received:  {}", out.received.as_deref().unwrap_or("-"));
            println!(
                "  Valid:     {}",
                out.valid.map_or("-".to_string(), |valid| valid.to_string())
            );
            println!("  Full CRC:  {}", out.full);
        }
        OutputFormat::Raw => println!("{}", out.full),
    }

    Ok(match out.valid {
        Some(false) => DATA_INVALID,
        _ => SUCCESS,
    })
}

fn compute(bytes: &[u8]) -> ChecksumOutput {
    let full = format!("0x{:04X}", crc_ccitt(bytes));
    if bytes.len() < CHECKSUM_SIZE {
        return ChecksumOutput {
            length: bytes.len(),
            computed: full.clone(),
            full,
            received: None,
            valid: None,
        };
    }

    let split = bytes.len() - CHECKSUM_SIZE;
    let computed = crc_ccitt(&bytes[..split]);
    let received = u16::from_be_bytes([bytes[split], bytes[split + 1]]);
    ChecksumOutput {
        length: bytes.len(),
        computed: format!("0x{computed:04X}"),
        full,
        received: Some(format!("0x{received:04X}")),
        valid: Some(computed == received),
    }
}
