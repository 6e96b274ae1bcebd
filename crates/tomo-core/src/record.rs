//! Measurement records and their wire encoding
//!
//! One record per sensed electrode per excitation pair. The wire format is
//! a single ASCII line of four comma-separated decimal integers,
//! `<source>,<sink>,<sense>,<value>\n`, which is what the collection
//! endpoint ingests as CSV.

use core::fmt;
use core::fmt::Write as _;

use heapless::String;

/// Upper bound on an encoded line; four decimal fields plus separators.
pub const MAX_LINE_LEN: usize = 24;

/// A single raw acquisition: the excitation pair, the sensed electrode,
/// and the unprocessed converter reading. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub source: usize,
    pub sink: usize,
    pub sense: usize,
    pub value: u16,
}

impl Sample {
    /// Encode the record as its newline-terminated wire line.
    pub fn to_line(&self) -> String<MAX_LINE_LEN> {
        let mut line = String::new();
        // In-range fields always fit MAX_LINE_LEN; a truncated line is
        // only possible for electrode indices no real array can have.
        let _ = write!(line, "{self}\n");
        line
    }

    /// Decode a wire line back into a record.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let mut fields = line.split(',');
        let source = fields.next()?.parse().ok()?;
        let sink = fields.next()?.parse().ok()?;
        let sense = fields.next()?.parse().ok()?;
        let value = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            source,
            sink,
            sense,
            value,
        })
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.source, self.sink, self.sense, self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let sample = Sample {
            source: 0,
            sink: 1,
            sense: 2,
            value: 137,
        };
        assert_eq!(sample.to_line().as_str(), "0,1,2,137\n");
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let sample = Sample {
            source: 3,
            sink: 14,
            sense: 9,
            value: 4095,
        };
        let line = sample.to_line();
        assert_eq!(Sample::from_line(&line), Some(sample));
    }

    #[test]
    fn test_widest_fields_fit_the_line_buffer() {
        let sample = Sample {
            source: 14,
            sink: 15,
            sense: 13,
            value: 4095,
        };
        let line = sample.to_line();
        assert!(line.ends_with('\n'), "line must be newline-terminated");
        assert!(line.len() <= MAX_LINE_LEN);
    }

    #[test]
    fn test_from_line_rejects_malformed_input() {
        assert_eq!(Sample::from_line("0,1,2\n"), None);
        assert_eq!(Sample::from_line("0,1,2,3,4\n"), None);
        assert_eq!(Sample::from_line("0,1,two,3\n"), None);
        assert_eq!(Sample::from_line(""), None);
    }
}
