use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use demuxprims_frame::checksum_is_valid;
use demuxprims_protocols::{ieee1344, pdcstream};
use serde_json::{json, Value};

use crate::cmd::{decode_hex, HeaderArgs, Protocol};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: HeaderArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = decode_hex(&args.hex)?;
    let fields = match args.protocol {
        Protocol::A => ieee1344_fields(&bytes)?,
        Protocol::B => pdcstream_fields(
            &bytes,
            pdcstream::ParsingOptions {
                legacy_word_count: args.legacy_word_count,
            },
        )?,
    };
    print_fields(&fields, format);
    Ok(SUCCESS)
}

fn ieee1344_fields(bytes: &[u8]) -> CliResult<Vec<(&'static str, Value)>> {
    let header = ieee1344::CommonFrameHeader::decode(bytes, 0)
        .map_err(|err| frame_error("decode header", err))?;
    let length = header.frame_length();
    Ok(vec![
        ("protocol", json!("ieee1344")),
        ("frame_type", json!(header.frame_type().to_string())),
        ("sample_count", json!(header.sample_count())),
        ("first_frame", json!(header.is_first_frame())),
        ("last_frame", json!(header.is_last_frame())),
        ("fragment", json!(header.fragment_state().as_str())),
        ("frame_length", json!(length)),
        ("data_length", json!(header.data_length())),
        ("second_of_century", json!(header.second_of_century())),
        ("timestamp", json!(header.timestamp().to_string())),
        ("checksum_valid", checksum_field(bytes, length)),
    ])
}

fn pdcstream_fields(
    bytes: &[u8],
    options: pdcstream::ParsingOptions,
) -> CliResult<Vec<(&'static str, Value)>> {
    let header = pdcstream::CommonFrameHeader::decode(bytes, 0, options)
        .map_err(|err| frame_error("decode header", err))?;
    let length = header.frame_length();
    Ok(vec![
        ("protocol", json!("pdcstream")),
        ("packet_number", json!(header.packet_number())),
        ("kind", json!(header.kind().as_str())),
        ("word_count", json!(header.word_count())),
        ("frame_length", json!(length)),
        (
            "timestamp",
            json!(header.timestamp().map(|ts| ts.to_string())),
        ),
        ("time_tag_epoch", json!(header.time_tag_epoch())),
        ("checksum_valid", checksum_field(bytes, length)),
    ])
}

/// `null` unless the whole frame is present.
fn checksum_field(bytes: &[u8], length: usize) -> Value {
    if bytes.len() >= length {
        json!(checksum_is_valid(bytes, 0, length))
    } else {
        Value::Null
    }
}

fn print_fields(fields: &[(&'static str, Value)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let object: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect();
            println!("{}", Value::Object(object));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in fields {
                table.add_row(vec![name.to_string(), display_value(value)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (name, value) in fields {
                println!("  {:<18} {}", name, display_value(value));
            }
        }
        OutputFormat::Raw => {
            if let Some((_, value)) = fields.get(1) {
                println!("{}", display_value(value));
            }
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
