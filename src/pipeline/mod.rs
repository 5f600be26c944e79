//! Drives one load from a line source to a bulk sink.
//!
//! Lines are read strictly in order and every flush is awaited before the
//! next line is read, so at most one batch of rows is held in memory.

use crate::load::{BatchAccumulator, ProgressTracker, RunStats, RunSummary};
use crate::record_processor::{
    check_header, coerce_row, extract_values_payload, header_columns, looks_like_insert, tokenize,
    ColumnSchema, Framing, LineStreamReader, LogicalRecord, RejectWriter, StatementReassembler,
};
use crate::sink::BulkSink;
use crate::utils::{preview, LoadJobConfig, LoaderError, Result, SkipReason};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::Instrument;

const PREVIEW_CHARS: usize = 100;
const LOGGED_RECORDS: u64 = 3;

pub struct PipelineDriver<S> {
    job: LoadJobConfig,
    schema: Arc<ColumnSchema>,
    sink: S,
    total_lines: Option<u64>,
}

/// Mutable state of a single run.
struct RunState {
    stats: RunStats,
    batch: BatchAccumulator,
    reassembler: StatementReassembler,
    progress: ProgressTracker,
    rejects: Option<RejectWriter>,
    header_pending: bool,
    logged_rejects: usize,
}

impl<S: BulkSink> PipelineDriver<S> {
    pub fn new(job: LoadJobConfig, schema: ColumnSchema, sink: S) -> Self {
        Self {
            job,
            schema: Arc::new(schema),
            sink,
            total_lines: None,
        }
    }

    /// Known line count of the input, enabling percent and ETA in progress logs.
    pub fn with_total_lines(mut self, total_lines: Option<u64>) -> Self {
        self.total_lines = total_lines;
        self
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub async fn run_file(&mut self, path: impl AsRef<Path>) -> Result<RunSummary> {
        let reader = LineStreamReader::open(path).await?;
        self.run(reader).await
    }

    /// Loads every record of `reader`.
    ///
    /// A failed flush stops the run; the returned [`LoaderError::Aborted`]
    /// carries the counters accumulated up to that point.
    pub async fn run<R>(&mut self, mut reader: LineStreamReader<R>) -> Result<RunSummary>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let rejects = match &self.job.rejects_output {
            Some(path) => {
                let mut writer = RejectWriter::new(path);
                writer.initialize()?;
                Some(writer)
            }
            None => None,
        };

        let mut state = RunState {
            stats: RunStats::new(),
            batch: BatchAccumulator::new(self.schema.clone(), self.job.batch_size),
            reassembler: StatementReassembler::new(&self.job.dialect),
            progress: ProgressTracker::new(self.total_lines, self.job.progress_interval),
            rejects,
            header_pending: self.job.dialect.has_header,
            logged_rejects: 0,
        };

        let span = tracing::info_span!("load", run_id = %state.stats.run_id);
        tracing::info!(
            parent: &span,
            sink = %self.sink.describe(),
            dialect = self.job.dialect.name,
            columns = self.schema.arity(),
            batch_size = state.batch.threshold(),
            "Starting load"
        );

        let outcome = self
            .process(&mut reader, &mut state)
            .instrument(span.clone())
            .await;

        let rejects_written = match state.rejects.take() {
            Some(writer) => Some(writer.finish()),
            None => None,
        };

        let summary = state.stats.snapshot();
        if let Err(source) = outcome {
            let _enter = span.enter();
            tracing::error!(
                rows_inserted = summary.rows_inserted,
                rows_pending = state.batch.len(),
                error = %source,
                "Load aborted"
            );
            return Err(LoaderError::Aborted {
                summary: Box::new(summary),
                source: Box::new(source),
            });
        }

        if let Some(written) = rejects_written {
            let written = written?;
            if written > 0 {
                tracing::info!(rejects = written, "Wrote rejected records");
            }
        }

        summary.log();
        Ok(summary)
    }

    async fn process<R>(
        &mut self,
        reader: &mut LineStreamReader<R>,
        state: &mut RunState,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        while let Some(line) = reader.next_line().await? {
            state.stats.lines_read = reader.lines_read();

            if let Some(record) = state.reassembler.push_line(&line) {
                self.handle_record(record, state)?;
                if state.batch.should_flush() {
                    self.flush(state).await?;
                    continue;
                }
            }

            if !state.batch.is_empty() {
                state.progress.maybe_report(&state.stats);
            }
        }

        if let Some(truncated) = state.reassembler.finish() {
            state.stats.truncated_records += 1;
            self.skip(state, truncated.first_line, SkipReason::Truncated, &truncated.text)?;
        }

        if !state.batch.is_empty() {
            self.flush(state).await?;
        }
        Ok(())
    }

    fn handle_record(&self, record: LogicalRecord, state: &mut RunState) -> Result<()> {
        let dialect = &self.job.dialect;

        if state.header_pending {
            state.header_pending = false;
            let header = header_columns(&record.text, dialect);
            check_header(&header, &self.schema);
            tracing::debug!(line = record.line_number, header = ?header, "Read header");
            return Ok(());
        }

        let payload = match dialect.framing {
            Framing::Line => record.text.as_str(),
            Framing::Terminated(_) => match extract_values_payload(&record.text) {
                Some(payload) => payload,
                None if looks_like_insert(&record.text) => {
                    return self.skip(
                        state,
                        record.line_number,
                        SkipReason::UnparseableStatement,
                        &record.text,
                    );
                }
                None => {
                    state.stats.statements_ignored += 1;
                    tracing::debug!(
                        line = record.line_number,
                        statement = %preview(&record.text, PREVIEW_CHARS),
                        "Ignoring non-INSERT statement"
                    );
                    return Ok(());
                }
            },
        };

        let tokens = tokenize(payload, dialect);
        state.stats.records_parsed += 1;
        if tokens.len() != self.schema.arity() {
            let reason = SkipReason::ArityMismatch {
                expected: self.schema.arity(),
                got: tokens.len(),
            };
            return self.skip(state, record.line_number, reason, &record.text);
        }

        let row = coerce_row(&tokens, &self.schema, dialect);
        if state.stats.records_parsed <= LOGGED_RECORDS {
            tracing::debug!(
                line = record.line_number,
                values = row.len(),
                record = %preview(&record.text, PREVIEW_CHARS),
                "Parsed record"
            );
        }

        if !state.batch.admit(row) {
            state.stats.rows_skipped += 1;
        }
        Ok(())
    }

    fn skip(&self, state: &mut RunState, line: u64, reason: SkipReason, text: &str) -> Result<()> {
        state.stats.rows_skipped += 1;

        if state.logged_rejects < self.job.max_logged_rejects {
            state.logged_rejects += 1;
            tracing::warn!(
                line = line,
                reason = %reason,
                preview = %preview(text, PREVIEW_CHARS),
                "Skipping record"
            );
        }

        if let Some(writer) = state.rejects.as_mut() {
            writer.write_reject(line, reason, text)?;
        }
        Ok(())
    }

    async fn flush(&mut self, state: &mut RunState) -> Result<()> {
        let committed = state.batch.flush(&mut self.sink).await?;
        state.stats.rows_inserted += committed as u64;
        state.stats.batches_committed += 1;

        tracing::debug!(
            batch = state.stats.batches_committed,
            rows = committed,
            "Committed batch"
        );
        state.progress.report(&state.stats);
        Ok(())
    }
}

/// Opens `path` and loads it into `sink`, handing the sink back with the summary.
pub async fn load_file<S: BulkSink>(
    path: impl AsRef<Path>,
    job: LoadJobConfig,
    schema: ColumnSchema,
    sink: S,
) -> Result<(RunSummary, S)> {
    let mut driver = PipelineDriver::new(job, schema, sink);
    let summary = driver.run_file(path).await?;
    Ok((summary, driver.into_sink()))
}
