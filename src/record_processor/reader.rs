use crate::utils::{LoaderError, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const READ_BUFFER_BYTES: usize = 256 * 1024;

/// Line source that treats `\n` and `\r\n` alike and never fails on bad UTF-8.
pub struct LineStreamReader<R> {
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
}

impl LineStreamReader<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !file_exists(path) {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }
        let file = File::open(path).await?;
        Ok(Self::new(BufReader::with_capacity(READ_BUFFER_BYTES, file)))
    }
}

impl<R: AsyncBufRead + Unpin> LineStreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(1024),
            lines_read: 0,
        }
    }

    /// Next line without its line ending, or `None` at end of input.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        self.lines_read += 1;
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

/// Number of lines in a file, for progress percentages.
pub async fn count_lines(path: impl AsRef<Path>) -> Result<u64> {
    let mut reader = LineStreamReader::open(path).await?;
    while reader.next_line().await?.is_some() {}
    Ok(reader.lines_read())
}

pub async fn get_file_size(path: impl AsRef<Path>) -> Result<u64> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(metadata.len())
}

pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}
