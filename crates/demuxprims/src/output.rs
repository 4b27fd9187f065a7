use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use demuxprims_dispatch::{DrainStats, OutcomeKind, OutcomeSink, ParseOutcome};
use demuxprims_frame::{BoxedFrame, FrameIdentifier};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Debug)]
pub struct FrameRecord {
    identifier: Option<String>,
    length: usize,
    timestamp: Option<String>,
    fragment: &'static str,
}

impl FrameRecord {
    fn from_frame<I: FrameIdentifier>(frame: &BoxedFrame<I>) -> Self {
        Self {
            identifier: frame.identifier().map(|id| id.to_string()),
            length: frame.frame_length(),
            timestamp: frame.timestamp().map(|ts| ts.to_string()),
            fragment: frame.fragment_state().as_str(),
        }
    }
}

/// Flat view of one outcome for printing.
#[derive(Serialize, Debug)]
pub struct OutcomeRecord {
    record: &'static str,
    source: String,
    outcome: OutcomeKind,
    identifier: Option<String>,
    /// Decoded, retained or discarded byte count depending on `outcome`.
    bytes: usize,
    attempt: Option<u32>,
    frames: Vec<FrameRecord>,
}

impl OutcomeRecord {
    pub fn from_outcome<I: FrameIdentifier>(outcome: &ParseOutcome<I>) -> Self {
        let frames: Vec<FrameRecord> = outcome
            .frames()
            .iter()
            .map(FrameRecord::from_frame)
            .collect();
        let (bytes, attempt) = match outcome {
            ParseOutcome::Parsed { .. } => (frames.iter().map(|frame| frame.length).sum(), None),
            ParseOutcome::UnknownType { discarded, .. }
            | ParseOutcome::Discarded { discarded, .. } => (*discarded, None),
            ParseOutcome::Reused {
                retained, attempt, ..
            } => (*retained, Some(*attempt)),
        };
        Self {
            record: "outcome",
            source: outcome.source().to_string(),
            outcome: outcome.kind(),
            identifier: outcome.identifier().map(|id| id.to_string()),
            bytes,
            attempt,
            frames,
        }
    }

    fn detail(&self) -> String {
        match self.outcome {
            OutcomeKind::Parsed => format!("{} frame(s)", self.frames.len()),
            OutcomeKind::Reused => format!(
                "kept {} bytes (attempt {})",
                self.bytes,
                self.attempt.unwrap_or_default()
            ),
            OutcomeKind::UnknownType | OutcomeKind::Discarded => {
                format!("dropped {} bytes", self.bytes)
            }
        }
    }
}

/// Prints outcomes as they are delivered.
///
/// Table output is buffered until [`OutcomePrinter::flush`].
pub struct OutcomePrinter {
    format: OutputFormat,
    rows: Vec<Vec<String>>,
}

impl OutcomePrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            rows: Vec::new(),
        }
    }

    pub fn print(&mut self, record: &OutcomeRecord) {
        match self.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            ),
            OutputFormat::Table => self.push_rows(record),
            OutputFormat::Pretty => {
                println!(
                    "{} {} {} {}",
                    record.source,
                    record.outcome,
                    record.identifier.as_deref().unwrap_or("-"),
                    record.detail()
                );
                for frame in &record.frames {
                    println!(
                        "    {} length={} time={} fragment={}",
                        frame.identifier.as_deref().unwrap_or("-"),
                        frame.length,
                        frame.timestamp.as_deref().unwrap_or("-"),
                        frame.fragment
                    );
                }
            }
            OutputFormat::Raw => {
                for frame in &record.frames {
                    println!(
                        "{}\t{}\t{}",
                        record.source,
                        frame.identifier.as_deref().unwrap_or("-"),
                        frame.length
                    );
                }
            }
        }
    }

    /// Print buffered table rows, if any.
    pub fn flush(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["SOURCE", "OUTCOME", "IDENTIFIER", "LENGTH", "TIME", "DETAIL"]);
        for row in self.rows.drain(..) {
            table.add_row(row);
        }
        println!("{table}");
    }

    fn push_rows(&mut self, record: &OutcomeRecord) {
        if record.frames.is_empty() {
            self.rows.push(vec![
                record.source.clone(),
                record.outcome.to_string(),
                record.identifier.clone().unwrap_or_else(|| "-".to_string()),
                record.bytes.to_string(),
                "-".to_string(),
                record.detail(),
            ]);
            return;
        }
        for frame in &record.frames {
            self.rows.push(vec![
                record.source.clone(),
                record.outcome.to_string(),
                frame.identifier.clone().unwrap_or_else(|| "-".to_string()),
                frame.length.to_string(),
                frame.timestamp.clone().unwrap_or_else(|| "-".to_string()),
                frame.fragment.to_string(),
            ]);
        }
    }
}

impl<I: FrameIdentifier> OutcomeSink<I> for OutcomePrinter {
    fn deliver(&mut self, outcome: ParseOutcome<I>) {
        let record = OutcomeRecord::from_outcome(&outcome);
        self.print(&record);
    }
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    record: &'static str,
    #[serde(flatten)]
    stats: &'a DrainStats,
    held_bytes: usize,
}

pub fn print_summary(stats: &DrainStats, held_bytes: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SummaryRecord {
                record: "summary",
                stats,
                held_bytes,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "IMAGES", "FRAMES", "REUSED", "DISCARDED", "UNKNOWN", "DROPPED", "HELD",
                ])
                .add_row(vec![
                    stats.images.to_string(),
                    stats.frames.to_string(),
                    stats.reused.to_string(),
                    stats.discarded.to_string(),
                    stats.unknown.to_string(),
                    stats.discarded_bytes.to_string(),
                    held_bytes.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "images={} frames={} reused={} discarded={} unknown={} dropped_bytes={} held_bytes={}",
            stats.images,
            stats.frames,
            stats.reused,
            stats.discarded,
            stats.unknown,
            stats.discarded_bytes,
            held_bytes
        ),
        OutputFormat::Raw => {}
    }
}
