//! Resolves a JVM name to a process id using `jps`.

use std::io::{self, BufRead, BufReader};

use tracing::{debug, error, info, warn};

use crate::collector::ToolCommand;
use crate::collector::supervisor::LineStream;

/// Error type for process discovery. Every variant is fatal to the run.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The listing tool could not be started or its stdout was unavailable.
    ToolLaunch { program: String, source: io::Error },
    /// No listed process carries the target name.
    ProcessNotFound(String),
    /// Reading the listing output failed.
    Read(io::Error),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::ToolLaunch { program, source } => {
                write!(f, "failed to launch {}: {}", program, source)
            }
            DiscoveryError::ProcessNotFound(name) => write!(f, "No target process: {}", name),
            DiscoveryError::Read(e) => write!(f, "failed to read process list: {}", e),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::ToolLaunch { source, .. } => Some(source),
            DiscoveryError::Read(e) => Some(e),
            DiscoveryError::ProcessNotFound(_) => None,
        }
    }
}

/// Process identifier produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProcess {
    identifier: String,
}

impl ResolvedProcess {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl std::fmt::Display for ResolvedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// Returns the identifier of the first `"<id> <name>"` line whose name
/// equals `name` exactly.
///
/// Lines are split on single spaces; anything that does not split into
/// exactly two tokens (e.g. `"1234 -- process information unavailable"`)
/// is ignored. Invalid UTF-8 is decoded lossily, so a foreign entry with
/// an odd jar path never hides the target.
pub fn find_identifier<R: BufRead>(reader: R, name: &str) -> io::Result<Option<String>> {
    for line in LineStream::new(reader) {
        let line = line?;
        let items: Vec<&str> = line.split(' ').collect();
        if items.len() == 2 && items[1] == name {
            return Ok(Some(items[0].to_string()));
        }
    }
    Ok(None)
}

/// Runs the listing tool once to resolve the target process.
pub struct ProcessDiscovery {
    tool: ToolCommand,
}

impl ProcessDiscovery {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }

    /// Resolves `name` to a process identifier.
    ///
    /// Waits for the listing tool to exit after scanning its output.
    pub fn resolve(&self, name: &str) -> Result<ResolvedProcess, DiscoveryError> {
        debug!("Running {} to find '{}'", self.tool, name);

        let mut child = self
            .tool
            .spawn_piped(&[])
            .map_err(|source| DiscoveryError::ToolLaunch {
                program: self.tool.program().to_string(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            if let Err(e) = child.kill() {
                error!("Error killing {} process: {}", self.tool.program(), e);
            }
            if let Err(e) = child.wait() {
                error!("Error reaping {} process: {}", self.tool.program(), e);
            }
            return Err(DiscoveryError::ToolLaunch {
                program: self.tool.program().to_string(),
                source: io::Error::other("stdout not captured"),
            });
        };

        let found = find_identifier(BufReader::new(stdout), name);

        // stdout is closed at this point, so the tool cannot block on a full pipe.
        match child.wait() {
            Ok(status) if !status.success() => {
                debug!("{} exited with {}", self.tool.program(), status)
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to wait for {}: {}", self.tool.program(), e),
        }

        match found.map_err(DiscoveryError::Read)? {
            Some(identifier) => {
                info!("Found target process '{}' with pid {}", name, identifier);
                Ok(ResolvedProcess::new(identifier))
            }
            None => Err(DiscoveryError::ProcessNotFound(name.to_string())),
        }
    }
}
