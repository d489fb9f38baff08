//! Metric event model produced from `jstat -gc` samples.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Column that only appears in the modern `jstat -gc` layout
/// (compressed class space capacity, JDK 8+).
pub const MODERN_SCHEMA_MARKER: &str = "CCSC";

/// Generation of the `jstat -gc` column layout that produced a header.
///
/// Only tags the emitted events; the column set always comes from the
/// header that was actually observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SchemaVersion {
    /// Permanent-generation layout (JDK 5 to 7).
    #[serde(rename = "java5")]
    LegacyGC,
    /// Metaspace layout with compressed class space columns (JDK 8+).
    #[serde(rename = "java8")]
    ModernGC,
}

impl SchemaVersion {
    /// Detects the schema from a raw header line.
    pub fn detect(header_line: &str) -> Self {
        if header_line.contains(MODERN_SCHEMA_MARKER) {
            SchemaVersion::ModernGC
        } else {
            SchemaVersion::LegacyGC
        }
    }

    /// Tag written into the `type` field of published events.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::LegacyGC => "java5",
            SchemaVersion::ModernGC => "java8",
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sampled data line, keyed by column label.
///
/// `timestamp` is the collector's capture time. The tool's own uptime
/// column, when present, is an ordinary entry in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEvent {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SchemaVersion,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl MetricEvent {
    /// Returns the value recorded for a column label.
    pub fn field(&self, label: &str) -> Option<f64> {
        self.fields.get(label).copied()
    }
}
