use crate::record_processor::{ColumnSchema, Dialect};
use crate::utils::errors::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 50_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub target: TargetConfig,
    pub schema: SchemaConfig,
    pub load: LoadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Sql,
    Delimited,
}

impl std::str::FromStr for DialectKind {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sql" | "insert" => Ok(DialectKind::Sql),
            "delimited" | "csv" => Ok(DialectKind::Delimited),
            other => Err(LoaderError::ConfigError(format!("unknown dialect '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: Option<PathBuf>,
    pub dialect: DialectKind,
    /// Field separator for the delimited dialect.
    pub delimiter: char,
    /// Overrides the dialect's noise line prefixes.
    pub noise_prefixes: Option<Vec<String>>,
    /// Count input lines up front so progress can report a percentage.
    pub count_lines: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            dialect: DialectKind::Sql,
            delimiter: ';',
            noise_prefixes: None,
            count_lines: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub database: PathBuf,
    pub table: String,
    pub create_table: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("./data/export.db"),
            table: "EXPORT_TABLE".to_string(),
            create_table: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub columns: Vec<String>,
    /// File with column names, separated by commas or newlines.
    pub columns_file: Option<PathBuf>,
    pub numeric_null_from: Option<usize>,
    pub temporal_markers: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            columns_file: None,
            numeric_null_from: None,
            temporal_markers: vec!["DATE".to_string(), "TIME".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub batch_size: usize,
    pub progress_interval_seconds: u64,
    pub max_logged_rejects: usize,
    pub rejects_output: Option<PathBuf>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval_seconds: 5,
            max_logged_rejects: 5,
            rejects_output: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoaderError::ConfigError(format!("{}: {}", path, e)))?;
        toml::from_str(&content).map_err(|e| LoaderError::ConfigError(e.to_string()))
    }

    /// Reads `path` when it exists, defaults otherwise. A file that exists but
    /// does not parse is an error.
    pub fn load_if_present(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn dialect(&self) -> Dialect {
        let dialect = match self.source.dialect {
            DialectKind::Sql => Dialect::sql_tuple(),
            DialectKind::Delimited => Dialect::delimited(self.source.delimiter),
        };
        match &self.source.noise_prefixes {
            Some(prefixes) => dialect.with_noise_prefixes(prefixes.clone()),
            None => dialect,
        }
    }

    /// Builds the column schema from the inline list or the columns file.
    pub fn column_schema(&self) -> Result<ColumnSchema> {
        let names = if !self.schema.columns.is_empty() {
            self.schema.columns.clone()
        } else if let Some(file) = &self.schema.columns_file {
            let content = std::fs::read_to_string(file)
                .map_err(|_| LoaderError::FileNotFound(file.display().to_string()))?;
            parse_column_list(&content)
        } else {
            return Err(LoaderError::InvalidSchema(
                "no columns configured (set schema.columns or schema.columns_file)".to_string(),
            ));
        };

        Ok(ColumnSchema::new(names)?
            .with_numeric_null_from(self.schema.numeric_null_from)
            .with_temporal_markers(self.schema.temporal_markers.clone()))
    }

    pub fn job_config(&self) -> Result<LoadJobConfig> {
        if self.load.batch_size == 0 {
            return Err(LoaderError::ConfigError("batch_size must be at least 1".to_string()));
        }
        Ok(LoadJobConfig {
            dialect: self.dialect(),
            batch_size: self.load.batch_size,
            progress_interval: Duration::from_secs(self.load.progress_interval_seconds),
            max_logged_rejects: self.load.max_logged_rejects,
            rejects_output: self.load.rejects_output.clone(),
        })
    }
}

/// Splits a column list on commas and newlines, dropping blanks and quotes.
pub fn parse_column_list(content: &str) -> Vec<String> {
    content
        .split(|c| c == ',' || c == '\n')
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Settings for one pipeline run, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct LoadJobConfig {
    pub dialect: Dialect,
    pub batch_size: usize,
    pub progress_interval: Duration,
    pub max_logged_rejects: usize,
    pub rejects_output: Option<PathBuf>,
}

impl LoadJobConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: Duration::from_secs(5),
            max_logged_rejects: 5,
            rejects_output: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}
