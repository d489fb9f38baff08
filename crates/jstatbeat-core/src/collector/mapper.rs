//! Maps a decoded sample into a [`MetricEvent`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::collector::parser::{Sample, SampleHeader};
use crate::event::{MetricEvent, SchemaVersion};

/// Builds events from header + data tokens.
///
/// Label `i` of the header takes data token `i + 1`: the data split carries a
/// leading empty token from the tool's right-justified columns. Empty labels
/// are skipped. A token that does not parse as `f64`, or is missing, becomes
/// `0.0` with a warning; it never aborts the event.
#[derive(Debug, Default)]
pub struct EventMapper {
    malformed_values: u64,
}

impl EventMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values replaced with `0.0` so far.
    pub fn malformed_values(&self) -> u64 {
        self.malformed_values
    }

    /// Maps a parser sample, stamped with the current time.
    pub fn map_sample(&mut self, sample: &Sample<'_>) -> MetricEvent {
        self.map(sample.header, sample.version, &sample.tokens)
    }

    /// Maps data tokens under `header`, stamped with the current time.
    pub fn map(
        &mut self,
        header: &SampleHeader,
        version: SchemaVersion,
        tokens: &[&str],
    ) -> MetricEvent {
        self.map_at(header, version, tokens, Utc::now())
    }

    /// Same as [`EventMapper::map`] with an explicit capture time.
    pub fn map_at(
        &mut self,
        header: &SampleHeader,
        version: SchemaVersion,
        tokens: &[&str],
        timestamp: DateTime<Utc>,
    ) -> MetricEvent {
        let mut fields = BTreeMap::new();

        for (i, label) in header.labels().iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            let value = match tokens.get(i + 1) {
                Some(token) => self.to_float(label, token),
                None => {
                    warn!("Missing value for column {}. Using 0", label);
                    self.malformed_values += 1;
                    0.0
                }
            };
            fields.insert(label.clone(), value);
        }

        MetricEvent {
            timestamp,
            kind: version,
            fields,
        }
    }

    fn to_float(&mut self, label: &str, token: &str) -> f64 {
        match token.parse::<f64>() {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Cannot parse {:?} as float for column {}: {}. Using 0",
                    token, label, e
                );
                self.malformed_values += 1;
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::parser::{OutputParser, ParsedLine, split_blanks};

    fn header(labels: &[&str]) -> SampleHeader {
        SampleHeader::from_tokens(labels)
    }

    #[test]
    fn test_alignment_skips_leading_token() {
        let mut mapper = EventMapper::new();
        let event = mapper.map(
            &header(&["Timestamp", "S0C", "S1C"]),
            SchemaVersion::LegacyGC,
            &["", "12.3", "100.0", "200.0"],
        );

        assert_eq!(event.fields.len(), 3);
        assert_eq!(event.field("Timestamp"), Some(12.3));
        assert_eq!(event.field("S0C"), Some(100.0));
        assert_eq!(event.field("S1C"), Some(200.0));
        assert_eq!(event.kind, SchemaVersion::LegacyGC);
        assert_eq!(mapper.malformed_values(), 0);
    }

    #[test]
    fn test_empty_labels_contribute_no_field() {
        let mut mapper = EventMapper::new();
        let event = mapper.map(
            &header(&["Timestamp", "", "S1C", ""]),
            SchemaVersion::ModernGC,
            &["", "1.0", "2.0", "3.0", "4.0"],
        );

        assert_eq!(event.fields.len(), 2);
        assert_eq!(event.field("Timestamp"), Some(1.0));
        assert_eq!(event.field("S1C"), Some(3.0));
    }

    #[test]
    fn test_malformed_token_becomes_zero() {
        let mut mapper = EventMapper::new();
        let event = mapper.map(
            &header(&["Timestamp", "S0C", "S1C"]),
            SchemaVersion::LegacyGC,
            &["", "12.3", "NaNgarbage", "200.0"],
        );

        assert_eq!(event.field("S0C"), Some(0.0));
        assert_eq!(event.field("S1C"), Some(200.0));
        assert_eq!(mapper.malformed_values(), 1);
    }

    #[test]
    fn test_missing_tokens_become_zero() {
        let mut mapper = EventMapper::new();
        let event = mapper.map(
            &header(&["Timestamp", "S0C", "S1C"]),
            SchemaVersion::LegacyGC,
            &["", "12.3"],
        );

        assert_eq!(event.field("Timestamp"), Some(12.3));
        assert_eq!(event.field("S0C"), Some(0.0));
        assert_eq!(event.field("S1C"), Some(0.0));
        assert_eq!(mapper.malformed_values(), 2);
    }

    #[test]
    fn test_timestamp_is_capture_time() {
        let mut mapper = EventMapper::new();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = mapper.map_at(
            &header(&["Timestamp", "S0C", "S1C"]),
            SchemaVersion::LegacyGC,
            &["", "12.3", "100.0", "200.0"],
            at,
        );

        assert_eq!(event.timestamp, at);
        // The tool's uptime column is kept as a plain field.
        assert_eq!(event.field("Timestamp"), Some(12.3));
    }

    #[test]
    fn test_map_parser_sample() {
        let mut parser = OutputParser::new();
        let mut mapper = EventMapper::new();
        parser.feed("Timestamp        S0C    S1C    CCSC   ");

        let line = "           11.8  512.0  512.0  470.6";
        assert_eq!(split_blanks(line)[0], "");
        let event = match parser.feed(line) {
            ParsedLine::Sample(sample) => mapper.map_sample(&sample),
            other => panic!("expected sample, got {:?}", other),
        };

        assert_eq!(event.kind, SchemaVersion::ModernGC);
        assert_eq!(event.field("Timestamp"), Some(11.8));
        assert_eq!(event.field("CCSC"), Some(470.6));
        assert_eq!(event.fields.len(), 4);
    }
}
