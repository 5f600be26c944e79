use crate::record_processor::dialect::{Dialect, Framing};
use once_cell::sync::Lazy;
use regex::Regex;

static VALUES_PAYLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bvalues\s*\((.*)\)\s*;?\s*$").expect("valid VALUES pattern")
});

/// One logical record and the physical line it ended on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRecord {
    pub text: String,
    pub line_number: u64,
}

/// A buffer that never reached its terminator before input ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedRecord {
    pub text: String,
    pub first_line: u64,
}

/// Rebuilds logical records from physical lines.
///
/// Lines are trimmed; blank and noise lines are dropped. In terminated framing
/// each kept line is appended with one separating space until a line ends with
/// the terminator.
pub struct StatementReassembler {
    dialect: Dialect,
    buffer: String,
    buffer_start: u64,
    line_number: u64,
}

impl StatementReassembler {
    pub fn new(dialect: &Dialect) -> Self {
        Self {
            dialect: dialect.clone(),
            buffer: String::new(),
            buffer_start: 0,
            line_number: 0,
        }
    }

    /// Feeds one physical line; returns a record when it completes one.
    pub fn push_line(&mut self, line: &str) -> Option<LogicalRecord> {
        self.line_number += 1;
        let trimmed = line.trim();

        if self.dialect.is_noise(trimmed) {
            return None;
        }

        match self.dialect.framing {
            Framing::Line => Some(LogicalRecord {
                text: trimmed.to_string(),
                line_number: self.line_number,
            }),
            Framing::Terminated(terminator) => {
                if self.buffer.is_empty() {
                    self.buffer_start = self.line_number;
                }
                self.buffer.push_str(trimmed);
                self.buffer.push(' ');

                if trimmed.ends_with(terminator) {
                    Some(LogicalRecord {
                        text: std::mem::take(&mut self.buffer),
                        line_number: self.line_number,
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Ends the stream, handing back any unterminated buffer.
    pub fn finish(&mut self) -> Option<TruncatedRecord> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(TruncatedRecord {
            text: std::mem::take(&mut self.buffer),
            first_line: self.buffer_start,
        })
    }

    pub fn lines_seen(&self) -> u64 {
        self.line_number
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Adapts a line iterator into an iterator of logical records.
///
/// A trailing unterminated buffer is dropped; call [`Records::truncated`]
/// afterwards to find out whether that happened.
pub struct Records<I> {
    lines: I,
    reassembler: StatementReassembler,
    truncated: Option<TruncatedRecord>,
}

impl<I, S> Iterator for Records<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = LogicalRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if let Some(record) = self.reassembler.push_line(line.as_ref()) {
                return Some(record);
            }
        }
        if self.truncated.is_none() {
            self.truncated = self.reassembler.finish();
        }
        None
    }
}

impl<I> Records<I> {
    pub fn truncated(&self) -> Option<&TruncatedRecord> {
        self.truncated.as_ref()
    }
}

pub fn records<I, S>(lines: I, dialect: &Dialect) -> Records<I::IntoIter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Records {
        lines: lines.into_iter(),
        reassembler: StatementReassembler::new(dialect),
        truncated: None,
    }
}

/// The tuple payload of an `INSERT ... VALUES (...)` statement.
pub fn extract_values_payload(statement: &str) -> Option<&str> {
    VALUES_PAYLOAD
        .captures(statement)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn looks_like_insert(statement: &str) -> bool {
    statement.to_ascii_lowercase().contains("insert into")
}
