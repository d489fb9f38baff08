//! Line decoder for `jstat -gc -t` output.
//!
//! `jstat` prints a header line naming the columns, followed by data rows
//! with right-justified numbers:
//!
//! ```text
//! Timestamp        S0C    S1C    S0U    S1U      EC       EU    ...
//!           11.8  512.0  512.0    0.0   32.0   4416.0   1353.9  ...
//! ```
//!
//! Because data rows are left-padded, splitting them on whitespace yields one
//! leading empty token that the header split does not have. Header label `i`
//! therefore lines up with data token `i + 1`. The decoder keeps that offset
//! as is; see [`crate::collector::mapper`].
//!
//! Instead of pulling in a regex engine for `\s+`, [`split_blanks`] splits on
//! runs of ASCII whitespace and keeps empty leading/trailing tokens.

use tracing::{debug, info};

use crate::event::SchemaVersion;

/// First label of every `jstat -t` header line.
pub const HEADER_FIRST_LABEL: &str = "Timestamp";

/// Splits on runs of ASCII whitespace, keeping an empty token for a leading
/// or trailing run.
///
/// `"  12.3  100.0"` splits into `["", "12.3", "100.0"]`, while
/// `"Timestamp  S0C"` splits into `["Timestamp", "S0C"]`.
pub fn split_blanks(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_blank = false;

    for (i, c) in line.char_indices() {
        if c.is_ascii_whitespace() {
            if !in_blank {
                tokens.push(&line[start..i]);
                in_blank = true;
            }
        } else if in_blank {
            start = i;
            in_blank = false;
        }
    }

    if in_blank {
        tokens.push("");
    } else {
        tokens.push(&line[start..]);
    }
    tokens
}

/// Classification of a single output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Column header; more than two tokens, first one is `Timestamp`.
    Header,
    /// A sample row.
    Data,
    /// Empty or whitespace-only.
    Blank,
}

/// Classifies a line from its whitespace split.
pub fn classify(tokens: &[&str]) -> LineClass {
    if tokens.iter().all(|t| t.is_empty()) {
        LineClass::Blank
    } else if tokens.len() > 2 && tokens[0] == HEADER_FIRST_LABEL {
        LineClass::Header
    } else {
        LineClass::Data
    }
}

/// Ordered column labels from the most recent header line.
///
/// Labels may be empty (e.g. from trailing whitespace); those positions
/// contribute no field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleHeader {
    labels: Vec<String>,
}

impl SampleHeader {
    pub fn from_tokens(tokens: &[&str]) -> Self {
        Self {
            labels: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of non-empty labels, i.e. fields per event.
    pub fn field_count(&self) -> usize {
        self.labels.iter().filter(|l| !l.is_empty()).count()
    }
}

/// Decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingHeader,
    Sampling,
}

/// A data line paired with the header it belongs to.
#[derive(Debug)]
pub struct Sample<'a> {
    pub header: &'a SampleHeader,
    pub version: SchemaVersion,
    /// Whitespace split of the data line, leading empty token included.
    pub tokens: Vec<&'a str>,
}

/// Outcome of feeding one line.
#[derive(Debug)]
pub enum ParsedLine<'a> {
    /// A header was recorded; no event for this line.
    Header(SchemaVersion),
    /// A data line ready for mapping.
    Sample(Sample<'a>),
    /// A line arrived before any header and was dropped.
    BeforeHeader,
    /// Blank line after a header, ignored.
    Blank,
}

struct ActiveHeader {
    header: SampleHeader,
    version: SchemaVersion,
}

/// Stateful header/data decoder.
///
/// Starts in [`ParserState::AwaitingHeader`]; the first header moves it to
/// [`ParserState::Sampling`], where it stays. Each later header replaces the
/// active one.
#[derive(Default)]
pub struct OutputParser {
    active: Option<ActiveHeader>,
    lines_before_header: u64,
}

impl OutputParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParserState {
        if self.active.is_some() {
            ParserState::Sampling
        } else {
            ParserState::AwaitingHeader
        }
    }

    /// Active header and schema, if one has been seen.
    pub fn header(&self) -> Option<(&SampleHeader, SchemaVersion)> {
        self.active.as_ref().map(|a| (&a.header, a.version))
    }

    /// Lines dropped because no header had been seen yet, blank ones included.
    pub fn lines_before_header(&self) -> u64 {
        self.lines_before_header
    }

    /// Feeds one line (without its newline).
    pub fn feed<'a>(&'a mut self, line: &'a str) -> ParsedLine<'a> {
        let tokens = split_blanks(line);

        match classify(&tokens) {
            LineClass::Blank if self.active.is_some() => ParsedLine::Blank,
            LineClass::Header => {
                let version = SchemaVersion::detect(line);
                let header = SampleHeader::from_tokens(&tokens);

                match &self.active {
                    None => info!(
                        "Detected {} header with {} columns",
                        version,
                        header.field_count()
                    ),
                    Some(prev) if prev.header != header => debug!(
                        "Header changed: {} columns, schema {}",
                        header.field_count(),
                        version
                    ),
                    Some(_) => {}
                }

                self.active = Some(ActiveHeader { header, version });
                ParsedLine::Header(version)
            }
            LineClass::Blank | LineClass::Data => match &self.active {
                Some(active) => ParsedLine::Sample(Sample {
                    header: &active.header,
                    version: active.version,
                    tokens,
                }),
                None => {
                    self.lines_before_header += 1;
                    debug!("Dropping line before header: {:?}", line);
                    ParsedLine::BeforeHeader
                }
            },
        }
    }
}
