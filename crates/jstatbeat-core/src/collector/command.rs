//! Launch description for the external JDK tools.
//!
//! A `ToolCommand` is a program plus leading arguments. Components append
//! their own operation arguments (`-gc -t <pid> <interval>` for `jstat`),
//! which lets tests substitute a shell script for the real tool:
//!
//! ```
//! use jstatbeat_core::collector::ToolCommand;
//!
//! let fake_jps = ToolCommand::new("sh").args(["-c", "echo '1234 MyApp'", "jps"]);
//! assert_eq!(fake_jps.program(), "sh");
//! ```

use std::io;
use std::process::{Child, Command, Stdio};

/// Program and leading arguments for an external tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one leading argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends leading arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawns the tool with `extra` appended to the leading arguments.
    ///
    /// Stdout is piped, stdin is closed, stderr is shared with this process.
    pub(crate) fn spawn_piped(&self, extra: &[&str]) -> io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
