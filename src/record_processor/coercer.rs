//! Turns raw tokens into bind values.
//!
//! Coercion is an ordered decision table: each step either claims the token or
//! passes. The first claiming step wins and the last step claims everything,
//! so coercion never fails. Reordering the steps changes results for
//! ambiguous tokens: a quoted SQL numeral must stay a string. Delimited tokens
//! arrive with quotes already resolved, so `"42"` there is a number.

use crate::record_processor::dialect::{Dialect, NumericFallback};
use crate::record_processor::schema::ColumnSchema;
use crate::record_processor::tokenizer::{tokenize, Token};
use crate::record_processor::value::{Number, Row, Value, TEMPORAL_FORMAT};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DAY_FIRST_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})(?:\s+(\d{1,2}:\d{2}(?::\d{2})?))?$")
        .expect("valid day-first date pattern")
});

static YEAR_FIRST_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})\.(\d{1,2})\.(\d{1,2})(?:\s+(\d{1,2}:\d{2}(?::\d{2})?))?$")
        .expect("valid year-first date pattern")
});

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%y %H:%M:%S",
];

const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%m/%d/%Y", "%d-%b-%Y", "%d-%b-%y", "%Y%m%d",
];

/// Everything a coercion step may look at.
#[derive(Debug, Clone, Copy)]
pub struct CoercionInput<'a> {
    pub token: &'a str,
    pub column: usize,
    pub schema: &'a ColumnSchema,
    pub dialect: &'a Dialect,
}

pub type CoercionStep = fn(&CoercionInput<'_>) -> Option<Value>;

pub const DECISION_TABLE: [(&str, CoercionStep); 6] = [
    ("null", null_literal as CoercionStep),
    ("quoted", quoted_string as CoercionStep),
    ("date_constructor", date_constructor as CoercionStep),
    ("dotted_date", dotted_date as CoercionStep),
    ("numeric", numeric as CoercionStep),
    ("text", text as CoercionStep),
];

/// Returns the name of the step that claimed the token together with its value.
pub fn decide(
    token: &str,
    column: usize,
    schema: &ColumnSchema,
    dialect: &Dialect,
) -> (&'static str, Value) {
    let input = CoercionInput {
        token: token.trim(),
        column,
        schema,
        dialect,
    };

    for (name, step) in DECISION_TABLE.iter() {
        if let Some(value) = step(&input) {
            return (*name, value);
        }
    }

    ("text", Value::String(input.token.to_string()))
}

pub fn coerce(token: &str, column: usize, schema: &ColumnSchema, dialect: &Dialect) -> Value {
    decide(token, column, schema, dialect).1
}

pub fn coerce_row(tokens: &[Token<'_>], schema: &ColumnSchema, dialect: &Dialect) -> Row {
    tokens
        .iter()
        .map(|token| coerce(token.as_str(), token.column, schema, dialect))
        .collect()
}

fn null_literal(input: &CoercionInput<'_>) -> Option<Value> {
    if input.token.is_empty() || input.token.eq_ignore_ascii_case(&input.dialect.null_literal) {
        Some(Value::Null)
    } else {
        None
    }
}

fn quoted_string(input: &CoercionInput<'_>) -> Option<Value> {
    if input.dialect.resolve_quotes {
        return None;
    }
    unquote(input.token, input.dialect.quote).map(Value::String)
}

fn date_constructor(input: &CoercionInput<'_>) -> Option<Value> {
    let name = input.dialect.date_constructor.as_deref()?;
    let args = constructor_arguments(input.token, name)?;

    let parsed = {
        let tokens = tokenize(args, input.dialect);
        let literal = tokens
            .first()
            .and_then(|t| unquote(t.text.trim(), input.dialect.quote));
        let mask = tokens
            .get(1)
            .and_then(|t| unquote(t.text.trim(), input.dialect.quote));
        literal.and_then(|literal| parse_temporal(&literal, mask.as_deref()))
    };

    Some(match parsed {
        Some(ts) => Value::Temporal(ts),
        None => Value::RawLiteral(input.token.to_string()),
    })
}

fn dotted_date(input: &CoercionInput<'_>) -> Option<Value> {
    if !input.dialect.dotted_dates || !input.schema.is_temporal(input.column) {
        return None;
    }
    reorder_dotted_date(input.token)
        .and_then(|canonical| NaiveDateTime::parse_from_str(&canonical, TEMPORAL_FORMAT).ok())
        .map(Value::Temporal)
}

fn numeric(input: &CoercionInput<'_>) -> Option<Value> {
    if let Some(number) = parse_number(input.token) {
        return Some(Value::Number(number));
    }
    match input.dialect.numeric_fallback {
        NumericFallback::NullFromThreshold
            if input.schema.nulls_unparseable_numeric(input.column) =>
        {
            Some(Value::Null)
        }
        _ => None,
    }
}

fn text(input: &CoercionInput<'_>) -> Option<Value> {
    Some(Value::String(input.token.to_string()))
}

/// Strips the enclosing quote characters and collapses doubled quotes.
pub fn unquote(token: &str, quote: char) -> Option<String> {
    let inner = token.strip_prefix(quote)?.strip_suffix(quote)?;
    let doubled: String = [quote, quote].iter().collect();
    Some(inner.replace(&doubled, &quote.to_string()))
}

/// Argument list of `NAME(...)`, matched case-insensitively.
fn constructor_arguments<'a>(token: &'a str, name: &str) -> Option<&'a str> {
    let head = token.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    token[name.len()..]
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Finite decimal or hexadecimal literal.
pub fn parse_number(token: &str) -> Option<Number> {
    if token.is_empty() {
        return None;
    }
    if let Ok(i) = token.parse::<i64>() {
        return Some(Number::Integer(i));
    }
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).ok().map(Number::Integer);
    }
    match token.parse::<f64>() {
        Ok(d) if d.is_finite() => Some(Number::Decimal(d)),
        _ => None,
    }
}

/// `DD.MM.YYYY[ HH:MM[:SS]]` or `YYYY.MM.DD[ ...]` to `YYYY-MM-DD HH:MM:SS`.
pub fn reorder_dotted_date(token: &str) -> Option<String> {
    let (year, month, day, time) = if let Some(caps) = DAY_FIRST_DATE.captures(token) {
        (caps[3].to_string(), caps[2].to_string(), caps[1].to_string(), caps.get(4))
    } else {
        let caps = YEAR_FIRST_DATE.captures(token)?;
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string(), caps.get(4))
    };

    let time = match time.map(|m| m.as_str()) {
        Some(t) if t.matches(':').count() == 1 => format!("{}:00", t),
        Some(t) => t.to_string(),
        None => "00:00:00".to_string(),
    };

    Some(format!("{}-{:0>2}-{:0>2} {}", year, month, day, time))
}

/// Parses a date literal, honouring an Oracle format mask when one is given.
pub fn parse_temporal(literal: &str, mask: Option<&str>) -> Option<NaiveDateTime> {
    let literal = literal.trim();
    if let Some(mask) = mask {
        let parsed = oracle_mask_to_chrono(mask).and_then(|f| parse_with_layout(literal, &f));
        if let Some(ts) = parsed {
            if !uses_rr_year(mask) {
                return Some(ts);
            }
            let year = rr_year(ts.year().rem_euclid(100), Utc::now().year());
            if let Some(ts) = ts.with_year(year) {
                return Some(ts);
            }
        }
    }
    DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(literal, layout).ok())
        .or_else(|| {
            DATE_LAYOUTS.iter().find_map(|layout| {
                NaiveDate::parse_from_str(literal, layout)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
        })
}

fn parse_with_layout(literal: &str, layout: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(literal, layout).ok().or_else(|| {
        NaiveDate::parse_from_str(literal, layout)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

fn uses_rr_year(mask: &str) -> bool {
    let upper = mask.to_ascii_uppercase();
    upper.contains("RR") && !upper.contains("RRRR")
}

/// Oracle `RR` century: two-digit years land in the current century, or the
/// adjacent one when the year and the current year sit on opposite halves.
pub fn rr_year(two_digit: i32, current_year: i32) -> i32 {
    let century = current_year.div_euclid(100) * 100;
    let current = current_year.rem_euclid(100);
    match (two_digit < 50, current < 50) {
        (true, true) | (false, false) => century + two_digit,
        (false, true) => century - 100 + two_digit,
        (true, false) => century + 100 + two_digit,
    }
}

/// Translates an Oracle datetime format mask into a chrono layout.
pub fn oracle_mask_to_chrono(mask: &str) -> Option<String> {
    const ELEMENTS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("RRRR", "%Y"),
        ("HH24", "%H"),
        ("HH12", "%I"),
        ("MONTH", "%B"),
        ("MON", "%b"),
        ("MM", "%m"),
        ("MI", "%M"),
        ("SS", "%S"),
        ("DD", "%d"),
        ("HH", "%I"),
        ("YY", "%y"),
        ("RR", "%y"),
        ("AM", "%p"),
        ("PM", "%p"),
    ];

    let upper = mask.trim().to_ascii_uppercase();
    let mut rest = upper.as_str();
    let mut layout = String::with_capacity(mask.len() * 2);

    'scan: while let Some(c) = rest.chars().next() {
        for (element, spec) in ELEMENTS {
            if let Some(tail) = rest.strip_prefix(element) {
                layout.push_str(spec);
                rest = tail;
                continue 'scan;
            }
        }
        match c {
            '-' | '/' | '.' | ':' | ' ' | ',' => layout.push(c),
            'T' => layout.push('T'),
            _ => return None,
        }
        rest = &rest[c.len_utf8()..];
    }

    Some(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(
            ["ID", "NAME", "CREATED_DATE", "AMOUNT", "FEE", "LOAD_TIME"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
        .unwrap()
        .with_numeric_null_from(Some(3))
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> Value {
        Value::Temporal(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap(),
        )
    }

    #[test]
    fn test_null_literal_and_empty() {
        let sql = Dialect::sql_tuple();
        assert_eq!(coerce("NULL", 1, &schema(), &sql), Value::Null);
        assert_eq!(coerce(" null ", 1, &schema(), &sql), Value::Null);
        assert_eq!(coerce("", 1, &schema(), &sql), Value::Null);
        assert_eq!(coerce("'NULL'", 1, &schema(), &sql), Value::from("NULL"));
    }

    #[test]
    fn test_quoted_string_collapses_escapes() {
        let sql = Dialect::sql_tuple();
        assert_eq!(
            coerce("'it''s a test'", 1, &schema(), &sql),
            Value::from("it's a test")
        );
    }

    #[test]
    fn test_resolved_delimited_tokens_are_typed() {
        let csv = Dialect::delimited(';');
        let tokens = tokenize("\"42\";\"12.5\";\"18.05.2024\"", &csv);
        let schema = ColumnSchema::new(vec![
            "ID".to_string(),
            "AMOUNT".to_string(),
            "CREATED_DATE".to_string(),
        ])
        .unwrap();

        assert_eq!(
            coerce_row(&tokens, &schema, &csv),
            vec![Value::from(42i64), Value::from(12.5), ts(2024, 5, 18, 0, 0, 0)]
        );
        assert_eq!(
            coerce_row(&tokenize("ab\"c;d\"e", &csv), &schema, &csv),
            vec![Value::from("abc;de")]
        );
    }

    #[test]
    fn test_quoted_numeral_stays_string() {
        let sql = Dialect::sql_tuple();
        let (step, value) = decide("'42'", 4, &schema(), &sql);
        assert_eq!(step, "quoted");
        assert_eq!(value, Value::from("42"));
    }

    #[test]
    fn test_numeric_threshold_boundary() {
        let sql = Dialect::sql_tuple();
        // column 3 is exactly the threshold, column 2 just below it
        assert_eq!(coerce("N/A", 3, &schema(), &sql), Value::Null);
        assert_eq!(coerce("N/A", 2, &schema(), &sql), Value::from("N/A"));
        assert_eq!(coerce("12.5", 3, &schema(), &sql), Value::from(12.5));
        assert_eq!(coerce("7", 0, &schema(), &sql), Value::from(7i64));
    }

    #[test]
    fn test_delimited_never_nulls_unparseable_numeric() {
        let csv = Dialect::delimited(';');
        assert_eq!(coerce("N/A", 4, &schema(), &csv), Value::from("N/A"));
    }

    #[test]
    fn test_non_finite_numbers_are_not_numeric() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("1e400"), None);
        assert_eq!(parse_number("0x1F"), Some(Number::Integer(31)));
        assert_eq!(parse_number("-3.5e2"), Some(Number::Decimal(-350.0)));
        assert_eq!(parse_number("12abc"), None);
    }

    #[test]
    fn test_to_date_with_oracle_mask() {
        let sql = Dialect::sql_tuple();
        assert_eq!(
            coerce(
                "to_date('2020-03-04 05:06:07','YYYY-MM-DD HH24:MI:SS')",
                2,
                &schema(),
                &sql
            ),
            ts(2020, 3, 4, 5, 6, 7)
        );
        assert_eq!(
            coerce("TO_DATE('18-MAY-24','DD-MON-RR')", 2, &schema(), &sql),
            ts(2024, 5, 18, 0, 0, 0)
        );
    }

    #[test]
    fn test_rr_year_follows_current_half_century() {
        assert_eq!(rr_year(24, 2026), 2024);
        assert_eq!(rr_year(60, 2026), 1960);
        assert_eq!(rr_year(10, 2070), 2110);
        assert_eq!(rr_year(80, 2070), 2080);
        assert_eq!(rr_year(0, 2000), 2000);
        assert_eq!(rr_year(99, 2049), 1999);
    }

    #[test]
    fn test_rr_mask_applies_century_rule() {
        let expected = rr_year(60, Utc::now().year());
        let parsed = parse_temporal("18-MAY-60", Some("DD-MON-RR")).unwrap();
        assert_eq!(parsed.year(), expected);
        // RRRR is a plain four-digit year.
        let parsed = parse_temporal("18-MAY-1960", Some("DD-MON-RRRR")).unwrap();
        assert_eq!(parsed.year(), 1960);
    }

    #[test]
    fn test_to_date_without_mask_uses_common_layouts() {
        let sql = Dialect::sql_tuple();
        assert_eq!(
            coerce("TO_DATE('2021-12-31')", 2, &schema(), &sql),
            ts(2021, 12, 31, 0, 0, 0)
        );
    }

    #[test]
    fn test_malformed_to_date_passes_through_raw() {
        let sql = Dialect::sql_tuple();
        let token = "TO_DATE('not a date','YYYY-MM-DD')";
        let (step, value) = decide(token, 4, &schema(), &sql);
        assert_eq!(step, "date_constructor");
        assert_eq!(value, Value::RawLiteral(token.to_string()));
    }

    #[test]
    fn test_dotted_dates_in_temporal_columns() {
        let csv = Dialect::delimited(';');
        assert_eq!(
            coerce("2024.05.18 14:30:00", 2, &schema(), &csv),
            ts(2024, 5, 18, 14, 30, 0)
        );
        assert_eq!(
            coerce("2024.05.18", 5, &schema(), &csv),
            ts(2024, 5, 18, 0, 0, 0)
        );
        assert_eq!(
            coerce("18.05.2024 09:15", 2, &schema(), &csv),
            ts(2024, 5, 18, 9, 15, 0)
        );
        assert_eq!(coerce("1.2.2023", 2, &schema(), &csv), ts(2023, 2, 1, 0, 0, 0));
    }

    #[test]
    fn test_dotted_date_ignored_outside_temporal_columns() {
        let csv = Dialect::delimited(';');
        assert_eq!(
            coerce("18.05.2024", 1, &schema(), &csv),
            Value::from("18.05.2024")
        );
    }

    #[test]
    fn test_invalid_dotted_date_falls_through() {
        let csv = Dialect::delimited(';');
        assert_eq!(
            coerce("31.02.2024", 2, &schema(), &csv),
            Value::from("31.02.2024")
        );
    }

    #[test]
    fn test_decision_table_order() {
        let names: Vec<&str> = DECISION_TABLE.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["null", "quoted", "date_constructor", "dotted_date", "numeric", "text"]
        );
    }

    #[test]
    fn test_mask_translation() {
        assert_eq!(
            oracle_mask_to_chrono("DD.MM.YYYY HH24:MI:SS").as_deref(),
            Some("%d.%m.%Y %H:%M:%S")
        );
        assert_eq!(oracle_mask_to_chrono("FMDD").as_deref(), None);
    }
}
