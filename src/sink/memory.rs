use crate::record_processor::{ColumnSchema, Row};
use crate::sink::BulkSink;
use crate::utils::{LoaderError, Result};
use async_trait::async_trait;

/// Keeps committed rows in memory. Backs dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pending: Vec<Row>,
    committed: Vec<Row>,
    keep_rows: bool,
    committed_count: usize,
    commits: usize,
    rollbacks: usize,
    batches_seen: usize,
    fail_on_batch: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            keep_rows: true,
            ..Default::default()
        }
    }

    /// Counts rows without retaining them.
    pub fn counting() -> Self {
        Self::default()
    }

    /// Fails the `n`th call to `execute_many` (1-based).
    pub fn failing_on_batch(mut self, n: usize) -> Self {
        self.fail_on_batch = Some(n);
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.committed
    }

    pub fn committed_count(&self) -> usize {
        self.committed_count
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }
}

#[async_trait]
impl BulkSink for MemorySink {
    async fn execute_many(&mut self, schema: &ColumnSchema, rows: &[Row]) -> Result<usize> {
        self.batches_seen += 1;
        if self.fail_on_batch == Some(self.batches_seen) {
            return Err(LoaderError::SinkError(format!(
                "injected failure on batch {}",
                self.batches_seen
            )));
        }

        if let Some(bad) = rows.iter().position(|row| row.len() != schema.arity()) {
            return Err(LoaderError::SinkError(format!(
                "row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                schema.arity()
            )));
        }

        self.pending.extend_from_slice(rows);
        Ok(rows.len())
    }

    async fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        self.committed_count += self.pending.len();
        if self.keep_rows {
            self.committed.append(&mut self.pending);
        } else {
            self.pending.clear();
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        self.pending.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        if self.keep_rows {
            "memory".to_string()
        } else {
            "memory (dry run)".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_processor::Value;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(vec!["A".to_string(), "B".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_rows_visible_only_after_commit() {
        let mut sink = MemorySink::new();
        let rows = vec![vec![Value::from(1i64), Value::Null]];

        sink.execute_many(&schema(), &rows).await.unwrap();
        assert!(sink.rows().is_empty());
        sink.commit().await.unwrap();
        assert_eq!(sink.rows(), rows.as_slice());
        assert_eq!(sink.commits(), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_pending() {
        let mut sink = MemorySink::new();
        let rows = vec![vec![Value::from("x"), Value::from("y")]];

        sink.execute_many(&schema(), &rows).await.unwrap();
        sink.rollback().await.unwrap();
        sink.commit().await.unwrap();
        assert_eq!(sink.committed_count(), 0);
        assert_eq!(sink.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mut sink = MemorySink::new().failing_on_batch(2);
        let rows = vec![vec![Value::Null, Value::Null]];

        assert!(sink.execute_many(&schema(), &rows).await.is_ok());
        assert!(sink.execute_many(&schema(), &rows).await.is_err());
    }

    #[tokio::test]
    async fn test_counting_sink_drops_rows() {
        let mut sink = MemorySink::counting();
        let rows = vec![vec![Value::Null, Value::Null]; 3];

        sink.execute_many(&schema(), &rows).await.unwrap();
        sink.commit().await.unwrap();
        assert_eq!(sink.committed_count(), 3);
        assert!(sink.rows().is_empty());
    }
}
