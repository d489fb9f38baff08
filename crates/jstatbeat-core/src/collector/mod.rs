//! JVM garbage-collection sampling via the JDK command-line tools.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  pid   ┌────────────────────┐  lines  ┌──────────────┐
//! │ ProcessDiscovery │ ─────► │ SamplingSupervisor │ ──────► │ OutputParser │
//! │   (jps, once)    │        │  (jstat -gc -t)    │         │ header/data  │
//! └──────────────────┘        └─────────┬──────────┘         └──────┬───────┘
//!                                       │ ChildGuard                │ Sample
//!                                       ▼                           ▼
//!                              kill + reap on exit          ┌──────────────┐
//!                                                           │ EventMapper  │ ──► EventSink
//!                                                           └──────────────┘
//! ```
//!
//! Both external tools are launched through a [`ToolCommand`], so tests can
//! substitute shell scripts for `jps` and `jstat`.
//!
//! # Usage
//!
//! ```ignore
//! use jstatbeat_core::collector::{ProcessDiscovery, SamplingSupervisor, ToolCommand};
//!
//! let process = ProcessDiscovery::new(ToolCommand::new("jps")).resolve("MyApp")?;
//! let supervisor = SamplingSupervisor::new(ToolCommand::new("jstat"));
//! supervisor.run(&process, "5000", |line| println!("{line}"))?;
//! ```

mod child;
mod command;
pub mod discovery;
pub mod mapper;
pub mod parser;
pub mod supervisor;

pub use child::ChildGuard;
pub use command::ToolCommand;
pub use discovery::{DiscoveryError, ProcessDiscovery, ResolvedProcess};
pub use mapper::EventMapper;
pub use parser::{OutputParser, ParsedLine, ParserState, SampleHeader};
pub use supervisor::{SamplingError, SamplingSupervisor, SessionEnd, StopHandle};
