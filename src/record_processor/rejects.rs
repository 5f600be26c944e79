use crate::utils::{preview, LoaderError, Result, SkipReason};
use csv::Writer;
use std::fs::File;
use std::path::{Path, PathBuf};

const REJECT_HEADERS: [&str; 3] = ["line", "reason", "preview"];
const PREVIEW_CHARS: usize = 200;

/// Writes every skipped record to a CSV file for later inspection.
pub struct RejectWriter {
    path: PathBuf,
    writer: Option<Writer<File>>,
    rows_written: usize,
}

impl RejectWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            rows_written: 0,
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        let mut writer = Writer::from_writer(file);
        writer.write_record(REJECT_HEADERS)?;
        self.writer = Some(writer);
        Ok(())
    }

    pub fn write_reject(&mut self, line: u64, reason: SkipReason, text: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            LoaderError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Reject writer not initialized",
            ))
        })?;

        writer.write_record([
            line.to_string(),
            reason.to_string(),
            preview(text, PREVIEW_CHARS),
        ])?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(self.rows_written)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
