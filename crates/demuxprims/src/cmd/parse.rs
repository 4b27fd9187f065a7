use std::path::PathBuf;

use bytes::Bytes;
use demuxprims_dispatch::Dispatcher;
use demuxprims_frame::{HeaderCodec, SourceId};
use demuxprims_protocols::{ieee1344, pdcstream, Ieee1344Codec, PdcStreamCodec};

use crate::cmd::{exit_code, start_dispatcher, ParseArgs, Protocol};
use crate::exit::{dispatch_error, io_error, CliError, CliResult, USAGE};
use crate::output::{print_summary, OutcomePrinter, OutputFormat};

pub fn run(args: ParseArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.dispatch.parser_config()?;
    let sources = read_sources(&args.files)?;
    let images = interleave(&sources, args.chunk)?;
    let source_ids: Vec<SourceId> = sources.into_iter().map(|(source, _)| source).collect();

    match args.dispatch.protocol {
        Protocol::A => {
            let dispatcher = start_dispatcher(Ieee1344Codec, &ieee1344::candidates(), config)?;
            parse_with(&dispatcher, images, &source_ids, format)
        }
        Protocol::B => {
            let options = args.dispatch.parsing_options();
            let dispatcher = start_dispatcher(
                PdcStreamCodec::new(options),
                &pdcstream::candidates(options),
                config,
            )?;
            parse_with(&dispatcher, images, &source_ids, format)
        }
    }
}

fn parse_with<C: HeaderCodec>(
    dispatcher: &Dispatcher<C>,
    images: Vec<(SourceId, Bytes)>,
    sources: &[SourceId],
    format: OutputFormat,
) -> CliResult<i32> {
    for (source, bytes) in images {
        dispatcher
            .enqueue(source, bytes)
            .map_err(|err| dispatch_error("enqueue failed", err))?;
    }

    let mut printer = OutcomePrinter::new(format);
    let stats = dispatcher
        .drain_all(&mut printer)
        .map_err(|err| dispatch_error("parse failed", err))?;
    printer.flush();

    let held_bytes: usize = sources
        .iter()
        .map(|source| dispatcher.pending_tail_len(source))
        .sum();
    if held_bytes > 0 {
        tracing::warn!(held_bytes, "input ended inside a frame");
    }

    print_summary(&stats, held_bytes, format);
    Ok(exit_code(&stats, held_bytes))
}

fn read_sources(files: &[PathBuf]) -> CliResult<Vec<(SourceId, Bytes)>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path)
            .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
        if bytes.is_empty() {
            tracing::warn!(path = %path.display(), "skipping empty file");
            continue;
        }
        sources.push((SourceId::from(path.display().to_string()), Bytes::from(bytes)));
    }
    Ok(sources)
}

/// Cut each source into `chunk`-byte images and order them round-robin.
///
/// Without a chunk size every source becomes a single image.
fn interleave(
    sources: &[(SourceId, Bytes)],
    chunk: Option<usize>,
) -> CliResult<Vec<(SourceId, Bytes)>> {
    let Some(chunk) = chunk else {
        return Ok(sources.to_vec());
    };
    if chunk == 0 {
        return Err(CliError::new(USAGE, "--chunk must be greater than zero"));
    }

    let rounds = sources
        .iter()
        .map(|(_, bytes)| bytes.len().div_ceil(chunk))
        .max()
        .unwrap_or(0);

    let mut images = Vec::new();
    for round in 0..rounds {
        let start = round * chunk;
        for (source, bytes) in sources {
            if start < bytes.len() {
                let end = (start + chunk).min(bytes.len());
                images.push((source.clone(), bytes.slice(start..end)));
            }
        }
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, bytes: &'static [u8]) -> (SourceId, Bytes) {
        (SourceId::from(name), Bytes::from_static(bytes))
    }

    #[test]
    fn interleave_round_robins_chunks() {
        let sources = vec![source("a", b"aaaaa"), source("b", b"bb")];
        let images = interleave(&sources, Some(2)).unwrap();

        let layout: Vec<(&str, &[u8])> = images
            .iter()
            .map(|(source, bytes)| (source.as_str(), bytes.as_ref()))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("a", &b"aa"[..]),
                ("b", &b"bb"[..]),
                ("a", &b"aa"[..]),
                ("a", &b"a"[..]),
            ]
        );
    }

    #[test]
    fn interleave_without_chunk_keeps_files_whole() {
        let sources = vec![source("a", b"abc")];
        let images = interleave(&sources, None).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].1.len(), 3);
    }

    #[test]
    fn zero_chunk_is_usage_error() {
        let sources = vec![source("a", b"abc")];
        assert_eq!(interleave(&sources, Some(0)).unwrap_err().code, USAGE);
    }
}
