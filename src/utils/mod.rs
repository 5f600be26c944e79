pub mod config;
pub mod errors;

pub use config::{
    parse_column_list, AppConfig, DialectKind, LoadJobConfig, LoggingConfig, DEFAULT_BATCH_SIZE,
};
pub use errors::{LoaderError, Result, SkipReason};

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
