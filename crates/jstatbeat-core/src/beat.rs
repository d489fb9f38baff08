//! Session orchestration: discovery, sampling, and per-line processing.
//!
//! [`JstatBeat`] follows the beat lifecycle: `setup()` resolves the target
//! once, `run()` drives one sampling session into a sink, and a
//! [`StopHandle`] ends the session from another thread.

use tracing::{debug, info, warn};

use crate::collector::{
    DiscoveryError, EventMapper, OutputParser, ParsedLine, ProcessDiscovery, ResolvedProcess,
    SamplingError, SamplingSupervisor, SessionEnd, StopHandle,
};
use crate::config::{ConfigError, TargetSpec, ToolSettings};
use crate::sink::EventSink;

/// Error type for the beat lifecycle.
#[derive(Debug)]
pub enum BeatError {
    Config(ConfigError),
    Discovery(DiscoveryError),
    Sampling(SamplingError),
    /// The event destination could not be opened.
    Output(std::io::Error),
    /// `run()` was called before a successful `setup()`.
    NotSetUp,
}

impl std::fmt::Display for BeatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BeatError::Config(e) => write!(f, "configuration error: {}", e),
            BeatError::Discovery(e) => write!(f, "discovery failed: {}", e),
            BeatError::Sampling(e) => write!(f, "sampling failed: {}", e),
            BeatError::Output(e) => write!(f, "cannot open event output: {}", e),
            BeatError::NotSetUp => write!(f, "target process not resolved; call setup() first"),
        }
    }
}

impl std::error::Error for BeatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BeatError::Config(e) => Some(e),
            BeatError::Discovery(e) => Some(e),
            BeatError::Sampling(e) => Some(e),
            BeatError::Output(e) => Some(e),
            BeatError::NotSetUp => None,
        }
    }
}

impl From<ConfigError> for BeatError {
    fn from(e: ConfigError) -> Self {
        BeatError::Config(e)
    }
}

impl From<DiscoveryError> for BeatError {
    fn from(e: DiscoveryError) -> Self {
        BeatError::Discovery(e)
    }
}

impl From<SamplingError> for BeatError {
    fn from(e: SamplingError) -> Self {
        BeatError::Sampling(e)
    }
}

/// Counters for one sampling session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub lines_read: u64,
    pub headers_seen: u64,
    pub events_published: u64,
    /// Lines dropped because no header had been seen, blank ones included.
    pub lines_before_header: u64,
    /// Blank lines after a header.
    pub blank_lines: u64,
    /// Values that failed to parse (or were missing) and became `0.0`.
    pub malformed_values: u64,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} lines, {} headers, {} events, {} before header, {} blank, {} malformed values",
            self.lines_read,
            self.headers_seen,
            self.events_published,
            self.lines_before_header,
            self.blank_lines,
            self.malformed_values
        )
    }
}

/// Parser → mapper → sink, one line at a time.
pub struct Pipeline<S: EventSink> {
    parser: OutputParser,
    mapper: EventMapper,
    sink: S,
    stats: SessionStats,
}

impl<S: EventSink> Pipeline<S> {
    pub fn new(sink: S) -> Self {
        Self {
            parser: OutputParser::new(),
            mapper: EventMapper::new(),
            sink,
            stats: SessionStats::default(),
        }
    }

    /// Processes one output line; publishes at most one event.
    pub fn handle_line(&mut self, line: &str) {
        self.stats.lines_read += 1;

        let event = match self.parser.feed(line) {
            ParsedLine::Header(_) => {
                self.stats.headers_seen += 1;
                None
            }
            ParsedLine::Sample(sample) => Some(self.mapper.map_sample(&sample)),
            ParsedLine::BeforeHeader => {
                self.stats.lines_before_header += 1;
                None
            }
            ParsedLine::Blank => {
                self.stats.blank_lines += 1;
                None
            }
        };

        if let Some(event) = event {
            self.sink.publish(event);
            self.stats.events_published += 1;
        }
        self.stats.malformed_values = self.mapper.malformed_values();
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn into_parts(self) -> (S, SessionStats) {
        (self.sink, self.stats)
    }
}

/// Outcome of [`JstatBeat::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub end: SessionEnd,
    pub stats: SessionStats,
}

/// GC sampling beat for one named JVM.
pub struct JstatBeat {
    target: TargetSpec,
    discovery: ProcessDiscovery,
    supervisor: SamplingSupervisor,
    process: Option<ResolvedProcess>,
}

impl JstatBeat {
    pub fn new(target: TargetSpec, tools: ToolSettings) -> Self {
        Self {
            target,
            discovery: ProcessDiscovery::new(tools.listing),
            supervisor: SamplingSupervisor::new(tools.sampling),
            process: None,
        }
    }

    /// Resolved process, once `setup()` has succeeded.
    pub fn process(&self) -> Option<&ResolvedProcess> {
        self.process.as_ref()
    }

    /// Resolves the target process. Failure is fatal to the run.
    pub fn setup(&mut self) -> Result<&ResolvedProcess, BeatError> {
        let process = self.discovery.resolve(self.target.name())?;
        Ok(&*self.process.insert(process))
    }

    /// Handle for stopping a running session from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.supervisor.stop_handle()
    }

    pub fn stop(&self) {
        self.supervisor.stop();
    }

    /// Runs one sampling session, publishing every mapped sample to `sink`.
    pub fn run<S: EventSink>(&self, sink: S) -> Result<SessionReport, BeatError> {
        let process = self.process.as_ref().ok_or(BeatError::NotSetUp)?;
        let mut pipeline = Pipeline::new(sink);

        let end = self
            .supervisor
            .run(process, self.target.interval(), |line| {
                pipeline.handle_line(line)
            })?;

        let (_, stats) = pipeline.into_parts();
        if stats.lines_before_header > 0 {
            warn!(
                "{} lines arrived before any header and were dropped",
                stats.lines_before_header
            );
        }
        debug!("Session ended: {:?}", end);
        info!("Session for '{}' finished: {}", self.target.name(), stats);

        Ok(SessionReport { end, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ToolCommand;
    use crate::event::SchemaVersion;
    use crate::sink::MemorySink;

    fn feed(lines: &[&str]) -> (MemorySink, SessionStats) {
        let mut pipeline = Pipeline::new(MemorySink::new());
        for line in lines {
            pipeline.handle_line(line);
        }
        pipeline.into_parts()
    }

    #[test]
    fn test_pipeline_maps_samples() {
        let (sink, stats) = feed(&[
            "Timestamp   S0C   S1C",
            "   12.3   100.0   200.0",
            "   13.3   101.0   201.0",
        ]);

        assert_eq!(sink.events.len(), 2);
        assert_eq!(sink.events[0].field("Timestamp"), Some(12.3));
        assert_eq!(sink.events[0].field("S0C"), Some(100.0));
        assert_eq!(sink.events[1].field("S1C"), Some(201.0));
        assert_eq!(stats.headers_seen, 1);
        assert_eq!(stats.events_published, 2);
        assert_eq!(stats.lines_read, 3);
    }

    #[test]
    fn test_pipeline_pre_header_lines_produce_nothing() {
        let (sink, stats) = feed(&["   12.3   100.0   200.0", "   13.3   101.0   201.0"]);
        assert!(sink.events.is_empty());
        assert_eq!(stats.lines_before_header, 2);
    }

    #[test]
    fn test_pipeline_blank_lines_before_header_count_as_dropped() {
        let (sink, stats) = feed(&[
            "",
            "   ",
            "Timestamp   S0C   S1C",
            "",
            "   1.0   2.0   3.0",
        ]);
        assert_eq!(sink.events.len(), 1);
        assert_eq!(stats.lines_before_header, 2);
        assert_eq!(stats.blank_lines, 1);
        assert_eq!(stats.lines_read, 5);
    }

    #[test]
    fn test_pipeline_malformed_value_keeps_session() {
        let (sink, stats) = feed(&[
            "Timestamp   S0C   S1C",
            "   12.3   NaNgarbage   200.0",
            "   13.3   101.0   201.0",
        ]);

        assert_eq!(sink.events.len(), 2);
        assert_eq!(sink.events[0].field("S0C"), Some(0.0));
        assert_eq!(sink.events[1].field("S0C"), Some(101.0));
        assert_eq!(stats.malformed_values, 1);
    }

    #[test]
    fn test_pipeline_schema_switch() {
        let (sink, stats) = feed(&[
            "Timestamp   S0C   PC",
            "   1.0   2.0   3.0",
            "",
            "Timestamp   S0C   CCSC",
            "   2.0   2.0   4.0",
        ]);

        assert_eq!(sink.events[0].kind, SchemaVersion::LegacyGC);
        assert_eq!(sink.events[0].field("PC"), Some(3.0));
        assert_eq!(sink.events[1].kind, SchemaVersion::ModernGC);
        assert_eq!(sink.events[1].field("CCSC"), Some(4.0));
        assert_eq!(sink.events[1].field("PC"), None);
        assert_eq!(stats.headers_seen, 2);
        assert_eq!(stats.blank_lines, 1);
    }

    #[test]
    fn test_run_before_setup() {
        let target = TargetSpec::new("MyApp", "1000").unwrap();
        let beat = JstatBeat::new(target, ToolSettings::default());
        assert!(matches!(
            beat.run(MemorySink::new()),
            Err(BeatError::NotSetUp)
        ));
    }

    #[cfg(unix)]
    fn fake_tools(jps: &str, jstat: &str) -> ToolSettings {
        ToolSettings {
            listing: ToolCommand::new("sh").args(["-c", jps, "jps"]),
            sampling: ToolCommand::new("sh").args(["-c", jstat, "jstat"]),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_setup_and_run_end_to_end() {
        let jstat = r#"
            [ "$1 $2 $3 $4" = "-gc -t 1234 1000" ] || exit 3
            echo "   0.5  1.0  1.0"
            echo "Timestamp        S0C    S1C    CCSC   "
            echo "           11.8  512.0  256.0  470.6"
            echo "           12.8  512.0  bogus  470.6"
        "#;
        let tools = fake_tools("printf '1234 MyApp\\n5678 Other\\n'", jstat);
        let target = TargetSpec::new("MyApp", "1000").unwrap();
        let mut beat = JstatBeat::new(target, tools);

        assert_eq!(beat.setup().unwrap().identifier(), "1234");

        let report = beat.run(MemorySink::new()).unwrap();
        assert_eq!(report.end, SessionEnd::StreamEnded);
        assert_eq!(report.stats.lines_read, 4);
        assert_eq!(report.stats.lines_before_header, 1);
        assert_eq!(report.stats.events_published, 2);
        assert_eq!(report.stats.malformed_values, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_publishes_into_sink() {
        let jstat = "printf 'Timestamp  S0C  S1C\\n   1.0  2.0  3.0\\n'";
        let tools = fake_tools("printf '7 App\\n'", jstat);
        let mut beat = JstatBeat::new(TargetSpec::new("App", "50").unwrap(), tools);
        beat.setup().unwrap();

        let mut sink = MemorySink::new();
        beat.run(&mut sink).unwrap();
        assert_eq!(sink.events.len(), 1);
        assert_eq!(sink.events[0].field("S1C"), Some(3.0));
    }

    #[cfg(unix)]
    #[test]
    fn test_setup_process_not_found() {
        let tools = fake_tools("printf '1234 MyApp\\n'", "true");
        let mut beat = JstatBeat::new(TargetSpec::new("NoSuchApp", "1000").unwrap(), tools);
        let err = beat.setup().unwrap_err();
        assert!(matches!(
            err,
            BeatError::Discovery(DiscoveryError::ProcessNotFound(_))
        ));
        assert!(beat.process().is_none());
    }

    struct CountingSink(u64);

    impl EventSink for CountingSink {
        fn publish(&mut self, _event: crate::event::MetricEvent) {
            self.0 += 1;
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_from_other_thread() {
        let tools = fake_tools(
            "printf '1 App\\n'",
            "echo 'Timestamp  S0C  S1C'; exec yes '   1.0  2.0  3.0'",
        );
        let mut beat = JstatBeat::new(TargetSpec::new("App", "1000").unwrap(), tools);
        beat.setup().unwrap();

        let handle = beat.stop_handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(100));
            handle.stop();
        });

        let report = beat.run(CountingSink(0)).unwrap();
        stopper.join().unwrap();

        assert_eq!(report.end, SessionEnd::Stopped);
        assert!(report.stats.events_published > 0);
        assert_eq!(report.stats.headers_seen, 1);
    }
}
