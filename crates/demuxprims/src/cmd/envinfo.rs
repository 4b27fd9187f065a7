use std::collections::BTreeMap;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use demuxprims_dispatch::ParserConfig;
use demuxprims_frame::{FrameCandidate, HeaderCodec};
use demuxprims_protocols::{ieee1344, pdcstream, Ieee1344Codec, ParsingOptions, PdcStreamCodec};
use demuxprims_registry::{FrameTypeRegistry, RegistryConfig};
use serde::Serialize;

use crate::cmd::{DispatchArgs, EnvinfoArgs, Protocol};
use crate::exit::{dispatch_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

const REPORTED_ENV: &[&str] = &["DEMUXPRIMS_CONFIG", "RUST_LOG"];

#[derive(Serialize, Debug)]
struct FrameTypeInfo {
    identifier: String,
    candidate: &'static str,
}

#[derive(Serialize, Debug)]
struct ProtocolInfo {
    flag: &'static str,
    name: &'static str,
    preamble_length: usize,
    selected: bool,
    frame_types: Vec<FrameTypeInfo>,
}

#[derive(Serialize, Debug)]
struct EnvInfoOutput {
    version: &'static str,
    target: &'static str,
    features: Vec<&'static str>,
    config_file: Option<String>,
    parser_config: ParserConfig,
    parsing_options: ParsingOptions,
    protocols: Vec<ProtocolInfo>,
    environment: BTreeMap<&'static str, Option<String>>,
}

pub fn run(args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let output = collect(&args.dispatch)?;
    print_envinfo(&output, format);
    Ok(SUCCESS)
}

/// Resolve the effective configuration and register every protocol with it.
fn collect(dispatch: &DispatchArgs) -> CliResult<EnvInfoOutput> {
    let parser_config = dispatch.parser_config()?;
    let options = dispatch.parsing_options();
    let registry_config = parser_config.registry_config();

    let protocols = vec![
        describe(
            "a",
            &Ieee1344Codec,
            &ieee1344::candidates(),
            &registry_config,
            dispatch.protocol == Protocol::A,
        )?,
        describe(
            "b",
            &PdcStreamCodec::new(options),
            &pdcstream::candidates(options),
            &registry_config,
            dispatch.protocol == Protocol::B,
        )?,
    ];

    let environment = REPORTED_ENV
        .iter()
        .map(|&name| (name, std::env::var(name).ok()))
        .collect();

    Ok(EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION"),
        target: option_env!("DEMUXPRIMS_BUILD_TARGET").unwrap_or("unknown"),
        features: active_features(),
        config_file: dispatch
            .config
            .as_ref()
            .map(|path| path.display().to_string()),
        parser_config,
        parsing_options: options,
        protocols,
        environment,
    })
}

fn describe<C: HeaderCodec>(
    flag: &'static str,
    codec: &C,
    candidates: &[FrameCandidate<C::Id>],
    config: &RegistryConfig,
    selected: bool,
) -> CliResult<ProtocolInfo> {
    let mut registry = FrameTypeRegistry::with_config(config.clone());
    registry.start(candidates).map_err(|err| {
        dispatch_error(&format!("{} frame type discovery failed", codec.name()), err.into())
    })?;

    let frame_types = registry
        .identifiers()
        .iter()
        .filter_map(|identifier| registry.descriptor(identifier))
        .map(|descriptor| FrameTypeInfo {
            identifier: descriptor.identifier().to_string(),
            candidate: descriptor.name(),
        })
        .collect();

    Ok(ProtocolInfo {
        flag,
        name: codec.name(),
        preamble_length: codec.preamble_len(),
        selected,
        frame_types,
    })
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            let config = &output.parser_config;
            println!("demuxprims {} ({})\n", output.version, output.target);
            println!("  Features:      {}", output.features.join(", "));
            println!(
                "  Config file:   {}",
                output.config_file.as_deref().unwrap_or("(none)")
            );
            println!("  Reuse limit:   {}", config.unparsed_data_reuse_limit);
            println!(
                "  Lookup:        {}",
                if config.optimize_parsing { "hashed" } else { "linear" }
            );
            println!("  Discovery:     {:?}", config.discovery_policy);
            println!(
                "  Batch cap:     {}",
                config
                    .max_batch_size
                    .map_or_else(|| "(none)".to_string(), |cap| cap.to_string())
            );
            println!(
                "  Legacy words:  {}\n",
                output.parsing_options.legacy_word_count
            );

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PROTOCOL", "PREAMBLE", "IDENTIFIER", "CANDIDATE"]);
            for protocol in &output.protocols {
                let marker = if protocol.selected { "*" } else { "" };
                for frame_type in &protocol.frame_types {
                    table.add_row(vec![
                        format!("{} ({}){marker}", protocol.name, protocol.flag),
                        protocol.preamble_length.to_string(),
                        frame_type.identifier.clone(),
                        frame_type.candidate.to_string(),
                    ]);
                }
            }
            println!("{table}");

            println!("\n  Environment:");
            for (name, value) in &output.environment {
                println!("    {:<20} {}", name, value.as_deref().unwrap_or("(not set)"));
            }
        }
        OutputFormat::Raw => {
            for protocol in &output.protocols {
                for frame_type in &protocol.frame_types {
                    println!(
                        "{}\t{}\t{}",
                        protocol.name, frame_type.identifier, frame_type.candidate
                    );
                }
            }
        }
    }
}

fn active_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }
    features
}
