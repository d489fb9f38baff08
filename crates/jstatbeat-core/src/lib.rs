//! jstatbeat-core — JVM garbage-collection sampling library.
//!
//! Provides:
//! - `collector` — process discovery, `jstat` supervision, output parsing
//!   and event mapping
//! - `event` — the metric event model
//! - `sink` — event publishing (JSON lines, in-memory)
//! - `beat` — session orchestration and statistics
//! - `config` — target and tool settings
//! - `util` — helper utilities

pub mod beat;
pub mod collector;
pub mod config;
pub mod event;
pub mod sink;
pub mod util;
