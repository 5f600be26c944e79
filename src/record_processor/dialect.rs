/// How physical lines are grouped into logical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Lines accumulate until one ends with the terminator character.
    Terminated(char),
    /// Every line is one record.
    Line,
}

/// What an unparseable token in a numeric position becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFallback {
    /// Keep the original text.
    String,
    /// Null at or after the schema's `numeric_null_from` column, text before it.
    NullFromThreshold,
}

/// Quoting, separator, nesting and literal rules of one input format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub name: &'static str,
    pub quote: char,
    /// Drop quote characters while tokenizing instead of leaving them to the coercer.
    pub resolve_quotes: bool,
    pub separator: char,
    pub nesting: Option<(char, char)>,
    pub framing: Framing,
    pub noise_prefixes: Vec<String>,
    pub null_literal: String,
    /// Function name of the recognised date constructor, e.g. `TO_DATE`.
    pub date_constructor: Option<String>,
    /// Recognise `DD.MM.YYYY[ HH:MM:SS]` in temporal columns.
    pub dotted_dates: bool,
    pub numeric_fallback: NumericFallback,
    pub has_header: bool,
}

impl Dialect {
    /// `INSERT INTO t (...) VALUES ('a', 1, TO_DATE('...', '...'));` statements.
    pub fn sql_tuple() -> Self {
        Self {
            name: "sql",
            quote: '\'',
            resolve_quotes: false,
            separator: ',',
            nesting: Some(('(', ')')),
            framing: Framing::Terminated(';'),
            noise_prefixes: ["REM", "SET", "PROMPT", "--"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            null_literal: "NULL".to_string(),
            date_constructor: Some("TO_DATE".to_string()),
            dotted_dates: false,
            numeric_fallback: NumericFallback::NullFromThreshold,
            has_header: false,
        }
    }

    /// One record per line, double-quote escaping, header line first.
    pub fn delimited(separator: char) -> Self {
        Self {
            name: "delimited",
            quote: '"',
            resolve_quotes: true,
            separator,
            nesting: None,
            framing: Framing::Line,
            noise_prefixes: Vec::new(),
            null_literal: "NULL".to_string(),
            date_constructor: None,
            dotted_dates: true,
            numeric_fallback: NumericFallback::String,
            has_header: true,
        }
    }

    pub fn with_noise_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.noise_prefixes = prefixes;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    /// Whether a trimmed line carries no record content.
    pub fn is_noise(&self, trimmed: &str) -> bool {
        trimmed.is_empty()
            || self
                .noise_prefixes
                .iter()
                .any(|prefix| trimmed.starts_with(prefix.as_str()))
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::sql_tuple()
    }
}
