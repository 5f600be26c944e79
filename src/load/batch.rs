use crate::record_processor::{describe_bindings, ColumnSchema, Row};
use crate::sink::BulkSink;
use crate::utils::{LoaderError, Result};
use std::sync::Arc;

/// Number of leading columns included in a failed batch's sample.
pub const SAMPLE_COLUMNS: usize = 10;

/// Collects arity-checked rows until the threshold is reached.
pub struct BatchAccumulator {
    schema: Arc<ColumnSchema>,
    threshold: usize,
    rows: Vec<Row>,
    skipped: u64,
}

impl BatchAccumulator {
    pub fn new(schema: Arc<ColumnSchema>, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            schema,
            threshold,
            rows: Vec::with_capacity(threshold.min(64 * 1024)),
            skipped: 0,
        }
    }

    /// Appends the row if its length matches the schema. Never fails.
    pub fn admit(&mut self, row: Row) -> bool {
        if row.len() != self.schema.arity() {
            self.skipped += 1;
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn should_flush(&self) -> bool {
        self.rows.len() >= self.threshold
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Sends the batch to the sink and commits it.
    ///
    /// On failure the sink is rolled back and the rows stay in the batch.
    pub async fn flush<S: BulkSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize> {
        if self.rows.is_empty() {
            return Ok(0);
        }

        let outcome = match sink.execute_many(&self.schema, &self.rows).await {
            Ok(_) => sink.commit().await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                let committed = self.rows.len();
                self.rows.clear();
                Ok(committed)
            }
            Err(e) => {
                if let Err(rollback_err) = sink.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback after failed batch also failed");
                }
                Err(self.failure(e))
            }
        }
    }

    fn failure(&self, source: LoaderError) -> LoaderError {
        let first = &self.rows[0];
        let mut sample = describe_bindings(self.schema.columns(), first, SAMPLE_COLUMNS);
        if let Some(bad) = self
            .rows
            .iter()
            .position(|row| row.len() != self.schema.arity())
        {
            sample.push_str(&format!(
                " [row {} has {} values]",
                bad,
                self.rows[bad].len()
            ));
        }

        tracing::error!(
            rows = self.rows.len(),
            expected_columns = self.schema.arity(),
            sample = %sample,
            error = %source,
            "Batch failed to commit"
        );

        LoaderError::BatchCommitFailed {
            rows: self.rows.len(),
            expected_columns: self.schema.arity(),
            sample,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_processor::Value;
    use crate::sink::MemorySink;

    fn schema() -> Arc<ColumnSchema> {
        Arc::new(ColumnSchema::new(vec!["ID".to_string(), "NAME".to_string()]).unwrap())
    }

    fn row(id: i64) -> Row {
        vec![Value::from(id), Value::from("n")]
    }

    #[test]
    fn test_admit_rejects_wrong_arity() {
        let mut batch = BatchAccumulator::new(schema(), 10);
        assert!(batch.admit(row(1)));
        assert!(!batch.admit(vec![Value::Null]));
        assert!(!batch.admit(vec![Value::Null, Value::Null, Value::Null]));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.skipped(), 2);
    }

    #[test]
    fn test_should_flush_at_threshold() {
        let mut batch = BatchAccumulator::new(schema(), 3);
        batch.admit(row(1));
        batch.admit(row(2));
        assert!(!batch.should_flush());
        batch.admit(row(3));
        assert!(batch.should_flush());
    }

    #[tokio::test]
    async fn test_flush_commits_and_clears() {
        let mut batch = BatchAccumulator::new(schema(), 2);
        let mut sink = MemorySink::new();
        batch.admit(row(1));
        batch.admit(row(2));

        assert_eq!(batch.flush(&mut sink).await.unwrap(), 2);
        assert!(batch.is_empty());
        assert_eq!(sink.rows().len(), 2);
        assert_eq!(sink.commits(), 1);
    }

    #[tokio::test]
    async fn test_flush_empty_batch_skips_sink() {
        let mut batch = BatchAccumulator::new(schema(), 2);
        let mut sink = MemorySink::new();
        assert_eq!(batch.flush(&mut sink).await.unwrap(), 0);
        assert_eq!(sink.commits(), 0);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_rows_and_rolls_back() {
        let mut batch = BatchAccumulator::new(schema(), 2);
        let mut sink = MemorySink::new().failing_on_batch(1);
        batch.admit(row(7));

        let err = batch.flush(&mut sink).await.unwrap_err();
        match err {
            LoaderError::BatchCommitFailed {
                rows,
                expected_columns,
                sample,
                ..
            } => {
                assert_eq!(rows, 1);
                assert_eq!(expected_columns, 2);
                assert_eq!(sample, "ID = 7 (integer), NAME = n (string)");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(batch.len(), 1);
        assert_eq!(sink.rollbacks(), 1);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn test_retry_after_failed_flush_commits_once() {
        let mut batch = BatchAccumulator::new(schema(), 3);
        let mut sink = MemorySink::new().failing_on_batch(1);
        batch.admit(row(1));
        batch.admit(row(2));

        assert!(batch.flush(&mut sink).await.is_err());
        assert_eq!(batch.len(), 2);
        assert_eq!(sink.committed_count(), 0);

        assert_eq!(batch.flush(&mut sink).await.unwrap(), 2);
        assert_eq!(sink.committed_count(), 2);
        assert_eq!(sink.commits(), 1);
        assert!(batch.is_empty());
    }
}
