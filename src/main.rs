use clap::Parser;
use dump_loader::record_processor::analyze_input;
use dump_loader::utils::{AppConfig, DialectKind, LoggingConfig};
use dump_loader::{BulkSink, LoaderError, MemorySink, PipelineDriver, RunSummary, SqliteSink};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "dump-loader", version, about = "Bulk-load INSERT dumps and delimited exports into SQLite")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Input file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Target SQLite database
    #[arg(long)]
    database: Option<PathBuf>,

    /// Target table
    #[arg(long)]
    table: Option<String>,

    /// Input syntax: sql or delimited
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// Field separator for delimited input
    #[arg(long)]
    delimiter: Option<char>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Comma-separated column names
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    #[arg(long)]
    columns_file: Option<PathBuf>,

    /// First column whose unparseable numbers become NULL (SQL dialect)
    #[arg(long)]
    numeric_null_from: Option<usize>,

    /// Create the target table if it does not exist
    #[arg(long)]
    create_table: bool,

    /// Write skipped records to this CSV file
    #[arg(long)]
    rejects: Option<PathBuf>,

    /// Parse and count without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.source.path = Some(input.clone());
        }
        if let Some(dialect) = self.dialect {
            config.source.dialect = dialect;
        }
        if let Some(delimiter) = self.delimiter {
            config.source.delimiter = delimiter;
        }
        if let Some(database) = &self.database {
            config.target.database = database.clone();
        }
        if let Some(table) = &self.table {
            config.target.table = table.clone();
        }
        if self.create_table {
            config.target.create_table = true;
        }
        if let Some(batch_size) = self.batch_size {
            config.load.batch_size = batch_size;
        }
        if let Some(columns) = &self.columns {
            config.schema.columns = columns.clone();
        }
        if let Some(file) = &self.columns_file {
            config.schema.columns_file = Some(file.clone());
            if self.columns.is_none() {
                config.schema.columns.clear();
            }
        }
        if self.numeric_null_from.is_some() {
            config.schema.numeric_null_from = self.numeric_null_from;
        }
        if let Some(rejects) = &self.rejects {
            config.load.rejects_output = Some(rejects.clone());
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let directive = format!("dump_loader={}", logging.level);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_exists = std::path::Path::new(&cli.config).exists();
    let mut config = AppConfig::load_if_present(&cli.config)?;
    cli.apply(&mut config);
    init_logging(&config.logging)?;

    if config_exists {
        tracing::info!(config = %cli.config, "Loaded configuration");
    }

    let input = config
        .source
        .path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no input file given (use --input or [source].path)"))?;
    let schema = config.column_schema()?;
    let job = config.job_config()?;

    let metadata = analyze_input(&input, &job.dialect, config.source.count_lines).await?;
    tracing::info!(
        input = %input.display(),
        size_bytes = metadata.file_size_bytes,
        total_lines = ?metadata.total_lines,
        "Analyzed input"
    );

    let sink: Box<dyn BulkSink> = if cli.dry_run {
        Box::new(MemorySink::counting())
    } else {
        Box::new(SqliteSink::open(
            &config.target.database,
            &config.target.table,
            config.target.create_table,
        )?)
    };

    let mut driver = PipelineDriver::new(job, schema, sink).with_total_lines(metadata.total_lines);

    match driver.run_file(&input).await {
        Ok(summary) => {
            print_summary(&summary, cli.json)?;
            Ok(())
        }
        Err(LoaderError::Aborted { summary, source }) => {
            print_summary(&summary, cli.json)?;
            Err(anyhow::Error::new(*source).context(format!(
                "load aborted after {} rows inserted",
                summary.rows_inserted
            )))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "Inserted {} rows in {} batches ({} skipped, {} truncated, {} statements ignored) from {} lines in {:.2}s ({:.0} rows/s)",
            summary.rows_inserted,
            summary.batches_committed,
            summary.rows_skipped,
            summary.truncated_records,
            summary.statements_ignored,
            summary.lines_read,
            summary.elapsed_seconds,
            summary.rows_per_second
        );
    }
    Ok(())
}
