pub mod analyzer;
pub mod coercer;
pub mod dialect;
pub mod reader;
pub mod reassembler;
pub mod rejects;
pub mod schema;
pub mod tokenizer;
pub mod value;

pub use analyzer::{analyze_input, check_header, header_columns, InputMetadata};
pub use coercer::{coerce, coerce_row, decide, DECISION_TABLE};
pub use dialect::{Dialect, Framing, NumericFallback};
pub use reader::{count_lines, file_exists, get_file_size, LineStreamReader};
pub use reassembler::{
    extract_values_payload, looks_like_insert, records, LogicalRecord, StatementReassembler,
    TruncatedRecord,
};
pub use rejects::RejectWriter;
pub use schema::ColumnSchema;
pub use tokenizer::{tokenize, Token};
pub use value::{describe_bindings, Number, Row, Value};
