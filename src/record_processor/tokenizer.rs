//! Splits a record payload into value tokens.
//!
//! One pass, left to right, tracking whether a quoted literal is open and how
//! deep inside nested brackets the cursor is. Doubled quote characters are an
//! escaped quote and never toggle the quote state.
//!
//! SQL tuple tokens are slices of the input with quotes kept; the coercer
//! resolves them. Dialects with `resolve_quotes` drop quote characters while
//! splitting and emit one literal quote for each doubled quote inside a quoted
//! section, so `ab"c;d"e` becomes `abc;de`.

use crate::record_processor::dialect::Dialect;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: Cow<'a, str>,
    pub column: usize,
}

impl Token<'_> {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

pub fn tokenize<'a>(payload: &'a str, dialect: &Dialect) -> Vec<Token<'a>> {
    let mut tokens = Vec::new();
    if payload.is_empty() {
        return tokens;
    }

    let mut in_quotes = false;
    let mut depth: i32 = 0;
    let mut start = 0;
    // Owned copy of the current token once a quote has been resolved in it.
    let mut resolved: Option<String> = None;
    let mut chars = payload.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == dialect.quote {
            let doubled = matches!(chars.peek(), Some(&(_, next)) if next == dialect.quote);
            if dialect.resolve_quotes {
                let buf = resolved.get_or_insert_with(|| payload[start..i].to_string());
                if in_quotes && doubled {
                    chars.next();
                    buf.push(c);
                } else {
                    in_quotes = !in_quotes;
                }
            } else if doubled {
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
            continue;
        }

        if !in_quotes {
            if let Some((open, close)) = dialect.nesting {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                }
            }
            if c == dialect.separator && depth == 0 {
                let column = tokens.len();
                tokens.push(finish_token(payload, start, i, resolved.take(), column));
                start = i + c.len_utf8();
                continue;
            }
        }

        if let Some(buf) = resolved.as_mut() {
            buf.push(c);
        }
    }

    let column = tokens.len();
    tokens.push(finish_token(payload, start, payload.len(), resolved, column));
    tokens
}

fn finish_token<'a>(
    payload: &'a str,
    start: usize,
    end: usize,
    resolved: Option<String>,
    column: usize,
) -> Token<'a> {
    let text = match resolved {
        Some(owned) => Cow::Owned(owned),
        None => Cow::Borrowed(&payload[start..end]),
    };
    Token { text, column }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(payload: &str, dialect: &Dialect) -> Vec<String> {
        tokenize(payload, dialect)
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_sql_quotes_and_nesting_protect_commas() {
        let dialect = Dialect::sql_tuple();
        assert_eq!(
            texts("a,'b,c',(d,e),NULL,5", &dialect),
            vec!["a", "'b,c'", "(d,e)", "NULL", "5"]
        );
    }

    #[test]
    fn test_sql_escaped_quote_stays_inside_literal() {
        let dialect = Dialect::sql_tuple();
        assert_eq!(
            texts("'it''s, fine',2", &dialect),
            vec!["'it''s, fine'", "2"]
        );
        assert_eq!(texts("'',''''", &dialect), vec!["''", "''''"]);
    }

    #[test]
    fn test_sql_parens_inside_quotes_do_not_nest() {
        let dialect = Dialect::sql_tuple();
        assert_eq!(
            texts("'(',to_date('01-01-2020','DD-MM-YYYY'),3", &dialect),
            vec!["'('", "to_date('01-01-2020','DD-MM-YYYY')", "3"]
        );
    }

    #[test]
    fn test_trailing_separator_yields_empty_token() {
        let dialect = Dialect::sql_tuple();
        assert_eq!(texts("1,", &dialect), vec!["1", ""]);
        assert_eq!(texts(",", &dialect), vec!["", ""]);
        assert!(tokenize("", &dialect).is_empty());
    }

    #[test]
    fn test_delimited_separator_and_quotes() {
        let dialect = Dialect::delimited(';');
        assert_eq!(
            texts("1;\"a;b\";\"say \"\"hi\"\"\";(x;y)", &dialect),
            vec!["1", "a;b", "say \"hi\"", "(x", "y)"]
        );
    }

    #[test]
    fn test_delimited_quotes_resolved_mid_field() {
        let dialect = Dialect::delimited(';');
        assert_eq!(texts("1;ab\"c;d\"e;x", &dialect), vec!["1", "abc;de", "x"]);
        assert_eq!(texts("\"\";\"42\"", &dialect), vec!["", "42"]);
    }

    #[test]
    fn test_unquoted_delimited_tokens_borrow_input() {
        let dialect = Dialect::delimited(';');
        let tokens = tokenize("plain;\"quoted\"", &dialect);
        assert!(matches!(tokens[0].text, Cow::Borrowed("plain")));
        assert!(matches!(tokens[1].text, Cow::Owned(_)));
    }

    #[test]
    fn test_columns_are_positional() {
        let dialect = Dialect::delimited(',');
        let tokens = tokenize("x,,z", &dialect);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], Token { text: "".into(), column: 1 });
        assert_eq!(tokens[2].column, 2);
    }

    #[test]
    fn test_multibyte_content() {
        let dialect = Dialect::delimited(';');
        assert_eq!(texts("ö;'ü';ß", &dialect), vec!["ö", "'ü'", "ß"]);
    }
}
