use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Crates whose events follow `--log-level`.
const DEMUX_TARGETS: &[&str] = &[
    "demuxprims",
    "demuxprims_frame",
    "demuxprims_protocols",
    "demuxprims_registry",
    "demuxprims_dispatch",
];

/// Ceiling for events from every other crate.
const DEPENDENCY_CEILING: LevelFilter = LevelFilter::WARN;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    /// Includes one event per decoded frame.
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Per-crate filter: demuxprims crates at this level, others at most `warn`.
    pub fn targets(self) -> Targets {
        let level = self.as_filter();
        Targets::new()
            .with_targets(DEMUX_TARGETS.iter().map(|&target| (target, level)))
            .with_default(level.min(DEPENDENCY_CEILING))
    }
}

/// Install the stderr subscriber. Later calls are ignored.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);
    let registry = tracing_subscriber::registry();

    match format {
        LogFormat::Text => {
            let _ = registry.with(layer.with_filter(level.targets())).try_init();
        }
        LogFormat::Json => {
            let _ = registry
                .with(layer.json().with_filter(level.targets()))
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn demux_crates_follow_requested_level() {
        let targets = LogLevel::Trace.targets();
        assert!(targets.would_enable("demuxprims_dispatch::parse", &Level::TRACE));
        assert!(targets.would_enable("demuxprims::cmd::stream", &Level::DEBUG));
        assert!(!targets.would_enable("ctrlc", &Level::INFO));
        assert!(targets.would_enable("ctrlc", &Level::WARN));
    }

    #[test]
    fn dependencies_never_exceed_requested_level() {
        let targets = LogLevel::Error.targets();
        assert!(targets.would_enable("demuxprims_registry::registry", &Level::ERROR));
        assert!(!targets.would_enable("demuxprims_registry::registry", &Level::WARN));
        assert!(!targets.would_enable("ctrlc", &Level::WARN));
    }
}
