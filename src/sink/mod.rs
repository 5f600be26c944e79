//! Destinations that accept committed batches of typed rows.
//!
//! A flush is `execute_many` followed by `commit`; on any error the caller
//! issues `rollback` and treats the whole batch as failed.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

use crate::record_processor::{ColumnSchema, Row};
use crate::utils::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BulkSink: Send {
    /// Binds every row of the batch inside the current transaction.
    async fn execute_many(&mut self, schema: &ColumnSchema, rows: &[Row]) -> Result<usize>;

    /// Makes the rows bound since the last commit durable.
    async fn commit(&mut self) -> Result<()>;

    /// Discards the rows bound since the last commit.
    async fn rollback(&mut self) -> Result<()>;

    fn describe(&self) -> String;
}

#[async_trait]
impl<S: BulkSink + ?Sized> BulkSink for Box<S> {
    async fn execute_many(&mut self, schema: &ColumnSchema, rows: &[Row]) -> Result<usize> {
        (**self).execute_many(schema, rows).await
    }

    async fn commit(&mut self) -> Result<()> {
        (**self).commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        (**self).rollback().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
