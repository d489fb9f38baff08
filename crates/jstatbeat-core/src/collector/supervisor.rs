//! Runs `jstat -gc -t <pid> <interval>` and streams its output.
//!
//! The supervisor owns the child for one session through a [`ChildGuard`],
//! so it is terminated on every exit path: stream end, stop request, or a
//! read error. Stopping only flips a flag that the loop checks before each
//! read; a blocked read is not interrupted.

use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::collector::ToolCommand;
use crate::collector::child::ChildGuard;
use crate::collector::discovery::ResolvedProcess;

/// `jstat` option selecting the garbage-collected heap report.
pub const GC_REPORT_OPTION: &str = "-gc";

/// `jstat` option prefixing each row with the JVM uptime.
pub const TIMESTAMP_OPTION: &str = "-t";

/// Error type for a sampling session.
#[derive(Debug)]
pub enum SamplingError {
    /// The sampling tool could not be started or its stdout was unavailable.
    ToolLaunch { program: String, source: io::Error },
    /// Reading the tool output failed mid-session.
    Stream(io::Error),
}

impl std::fmt::Display for SamplingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingError::ToolLaunch { program, source } => {
                write!(f, "failed to launch {}: {}", program, source)
            }
            SamplingError::Stream(e) => write!(f, "error reading sampling output: {}", e),
        }
    }
}

impl std::error::Error for SamplingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SamplingError::ToolLaunch { source, .. } => Some(source),
            SamplingError::Stream(e) => Some(e),
        }
    }
}

/// Why a session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The tool closed its output (target JVM exited, or the tool died).
    StreamEnded,
    /// A stop was requested.
    Stopped,
}

/// Cloneable handle that asks a running session to stop.
///
/// Safe to call from any thread, any number of times.
#[derive(Debug, Clone)]
pub struct StopHandle {
    alive: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        !self.alive.load(Ordering::SeqCst)
    }
}

/// Lazy sequence of output lines.
///
/// Invalid UTF-8 is replaced rather than treated as an error, and trailing
/// `\n`/`\r\n` is stripped.
pub struct LineStream<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
        }
    }
}

impl<R: BufRead> Iterator for LineStream<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Spawns and supervises the sampling tool.
pub struct SamplingSupervisor {
    tool: ToolCommand,
    alive: Arc<AtomicBool>,
}

impl SamplingSupervisor {
    pub fn new(tool: ToolCommand) -> Self {
        Self {
            tool,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns a handle for stopping this supervisor from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            alive: Arc::clone(&self.alive),
        }
    }

    /// Flips the liveness flag; the loop exits before its next read.
    pub fn stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Runs one sampling session, delivering each output line to `on_line`.
    ///
    /// Returns once the output ends or a stop was requested. A stop issued
    /// before `run` makes it return immediately after spawning the tool.
    pub fn run<F>(
        &self,
        process: &ResolvedProcess,
        interval: &str,
        mut on_line: F,
    ) -> Result<SessionEnd, SamplingError>
    where
        F: FnMut(&str),
    {
        let args = [
            GC_REPORT_OPTION,
            TIMESTAMP_OPTION,
            process.identifier(),
            interval,
        ];
        let launch_error = |source: io::Error| SamplingError::ToolLaunch {
            program: self.tool.program().to_string(),
            source,
        };

        let child = self.tool.spawn_piped(&args).map_err(launch_error)?;
        let mut guard = ChildGuard::new(self.tool.program(), child);
        let stdout = guard
            .take_stdout()
            .ok_or_else(|| launch_error(io::Error::other("stdout not captured")))?;

        info!(
            "Sampling pid {} every {}ms with {} (child pid {})",
            process,
            interval,
            self.tool,
            guard.id().unwrap_or_default()
        );

        let mut lines = LineStream::new(BufReader::new(stdout));
        let end = loop {
            if !self.is_alive() {
                break SessionEnd::Stopped;
            }
            match lines.next() {
                Some(Ok(line)) => on_line(&line),
                Some(Err(e)) => {
                    guard.terminate();
                    return Err(SamplingError::Stream(e));
                }
                None => break SessionEnd::StreamEnded,
            }
        };

        debug!("Sampling loop finished: {:?}", end);
        guard.terminate();
        Ok(end)
    }
}
