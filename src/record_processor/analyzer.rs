use crate::record_processor::coercer::unquote;
use crate::record_processor::dialect::Dialect;
use crate::record_processor::reader::{count_lines, get_file_size, LineStreamReader};
use crate::record_processor::schema::ColumnSchema;
use crate::record_processor::tokenizer::tokenize;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMetadata {
    pub file_size_bytes: u64,
    pub total_lines: Option<u64>,
    pub header: Option<Vec<String>>,
}

/// Size, optional line count and (for headed dialects) the header columns.
pub async fn analyze_input(
    path: impl AsRef<Path>,
    dialect: &Dialect,
    count: bool,
) -> Result<InputMetadata> {
    let path = path.as_ref();
    let file_size_bytes = get_file_size(path).await?;

    let total_lines = if count {
        Some(count_lines(path).await?)
    } else {
        None
    };

    let header = if dialect.has_header {
        let mut reader = LineStreamReader::open(path).await?;
        let mut header = None;
        while let Some(line) = reader.next_line().await? {
            if !dialect.is_noise(line.trim()) {
                header = Some(header_columns(&line, dialect));
                break;
            }
        }
        header
    } else {
        None
    };

    Ok(InputMetadata {
        file_size_bytes,
        total_lines,
        header,
    })
}

/// Column names declared by a header line.
pub fn header_columns(line: &str, dialect: &Dialect) -> Vec<String> {
    tokenize(line.trim(), dialect)
        .iter()
        .map(|token| {
            let text = token.text.trim();
            unquote(text, dialect.quote).unwrap_or_else(|| text.to_string())
        })
        .collect()
}

/// Compares a header against the configured schema; mismatches are warnings only.
pub fn check_header(header: &[String], schema: &ColumnSchema) -> bool {
    if header.len() != schema.arity() {
        tracing::warn!(
            header_columns = header.len(),
            expected_columns = schema.arity(),
            header = ?header,
            "Header column count does not match the configured schema"
        );
        return false;
    }

    for (index, (found, expected)) in header.iter().zip(schema.columns()).enumerate() {
        if !found.eq_ignore_ascii_case(expected) {
            tracing::debug!(
                position = index + 1,
                found = %found,
                expected = %expected,
                "Header column name differs from schema"
            );
        }
    }
    true
}
