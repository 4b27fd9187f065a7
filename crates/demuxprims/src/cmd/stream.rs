use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use demuxprims_dispatch::{Dispatcher, DrainStats};
use demuxprims_frame::{HeaderCodec, SourceId};
use demuxprims_protocols::{ieee1344, pdcstream, Ieee1344Codec, PdcStreamCodec};

use crate::cmd::{exit_code, start_dispatcher, Protocol, StreamArgs};
use crate::exit::{dispatch_error, io_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::{print_summary, OutcomePrinter, OutputFormat};

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    if args.read_size == 0 {
        return Err(CliError::new(USAGE, "--read-size must be greater than zero"));
    }
    let config = args.dispatch.parser_config()?;

    match args.dispatch.protocol {
        Protocol::A => {
            let dispatcher = start_dispatcher(Ieee1344Codec, &ieee1344::candidates(), config)?;
            stream_with(dispatcher, &args, format)
        }
        Protocol::B => {
            let options = args.dispatch.parsing_options();
            let dispatcher = start_dispatcher(
                PdcStreamCodec::new(options),
                &pdcstream::candidates(options),
                config,
            )?;
            stream_with(dispatcher, &args, format)
        }
    }
}

fn stream_with<C>(
    dispatcher: Dispatcher<C>,
    args: &StreamArgs,
    format: OutputFormat,
) -> CliResult<i32>
where
    C: HeaderCodec + 'static,
{
    let dispatcher = Arc::new(dispatcher);
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let source = SourceId::from(args.source.as_str());
    let reader = spawn_reader(Arc::clone(&dispatcher), source.clone(), args.read_size)?;
    let interval = Duration::from_millis(args.interval_ms);

    let mut printer = OutcomePrinter::new(format);
    let mut stats = DrainStats::default();
    let mut finished = false;

    while running.load(Ordering::SeqCst) {
        finished = reader.is_finished();
        stats += dispatcher
            .drain(&mut printer)
            .map_err(|err| dispatch_error("parse failed", err))?;
        printer.flush();

        if finished && dispatcher.queued_len() == 0 {
            break;
        }
        if !finished {
            thread::sleep(interval);
        }
    }

    if finished {
        let read = reader
            .join()
            .map_err(|_| CliError::new(INTERNAL, "stdin reader panicked"))?
            .map_err(|err| io_error("read stdin", err))?;
        tracing::debug!(bytes = read, "stdin closed");
    } else {
        tracing::info!("interrupted");
    }

    let held_bytes = dispatcher.pending_tail_len(&source);
    print_summary(&stats, held_bytes, format);
    Ok(exit_code(&stats, held_bytes))
}

fn spawn_reader<C>(
    dispatcher: Arc<Dispatcher<C>>,
    source: SourceId,
    read_size: usize,
) -> CliResult<JoinHandle<io::Result<u64>>>
where
    C: HeaderCodec + 'static,
{
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = vec![0u8; read_size];
            let mut total = 0u64;
            loop {
                let n = match stdin.read(&mut buf) {
                    Ok(0) => return Ok(total),
                    Ok(n) => n,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                };
                total += n as u64;
                dispatcher
                    .enqueue(source.clone(), Bytes::copy_from_slice(&buf[..n]))
                    .map_err(io::Error::other)?;
            }
        })
        .map_err(|err| io_error("spawn stdin reader", err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
