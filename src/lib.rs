pub mod load;
pub mod pipeline;
pub mod record_processor;
pub mod sink;
pub mod utils;

pub use load::{BatchAccumulator, RunStats, RunSummary};
pub use pipeline::{load_file, PipelineDriver};
pub use record_processor::{ColumnSchema, Dialect, LineStreamReader, Row, Value};
pub use sink::{BulkSink, MemorySink, SqliteSink};
pub use utils::{AppConfig, LoadJobConfig, LoaderError, Result};
