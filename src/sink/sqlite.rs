use crate::record_processor::value::TEMPORAL_FORMAT;
use crate::record_processor::{ColumnSchema, Number, Row, Value};
use crate::sink::BulkSink;
use crate::utils::Result;
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::fmt;
use std::path::{Path, PathBuf};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::String(s) | Value::RawLiteral(s) => {
                ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))
            }
            Value::Number(Number::Integer(i)) => ToSqlOutput::Owned((*i).into()),
            Value::Number(Number::Decimal(d)) => ToSqlOutput::Owned((*d).into()),
            Value::Temporal(ts) => ToSqlOutput::Owned(rusqlite::types::Value::Text(
                ts.format(TEMPORAL_FORMAT).to_string(),
            )),
        })
    }
}

/// Double-quotes an identifier, quoting each part of a dotted name separately.
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// `INSERT INTO "T" ("A", "B") VALUES (?1, ?2)`
pub fn insert_statement(table: &str, schema: &ColumnSchema) -> String {
    let columns = schema
        .columns()
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=schema.arity())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns,
        placeholders
    )
}

fn create_statement(table: &str, schema: &ColumnSchema) -> String {
    let columns = schema
        .columns()
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table),
        columns
    )
}

/// Inserts batches into one SQLite table, one transaction per batch.
pub struct SqliteSink {
    conn: Connection,
    location: String,
    table: String,
    create_table: bool,
    prepared_for: Option<Vec<String>>,
    insert_sql: String,
}

impl fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSink")
            .field("location", &self.location)
            .field("table", &self.table)
            .field("create_table", &self.create_table)
            .finish()
    }
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>, table: &str, create_table: bool) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self::from_connection(
            conn,
            path.display().to_string(),
            table,
            create_table,
        ))
    }

    pub fn open_in_memory(table: &str, create_table: bool) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(
            conn,
            ":memory:".to_string(),
            table,
            create_table,
        ))
    }

    fn from_connection(conn: Connection, location: String, table: &str, create_table: bool) -> Self {
        Self {
            conn,
            location,
            table: table.to_string(),
            create_table,
            prepared_for: None,
            insert_sql: String::new(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn row_count(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn prepare_for(&mut self, schema: &ColumnSchema) -> Result<()> {
        if self.prepared_for.as_deref() == Some(schema.columns()) {
            return Ok(());
        }
        if self.create_table {
            self.conn
                .execute_batch(&create_statement(&self.table, schema))?;
            tracing::debug!(table = %self.table, columns = schema.arity(), "Ensured target table");
        }
        self.insert_sql = insert_statement(&self.table, schema);
        self.prepared_for = Some(schema.columns().to_vec());
        Ok(())
    }
}

#[async_trait]
impl BulkSink for SqliteSink {
    async fn execute_many(&mut self, schema: &ColumnSchema, rows: &[Row]) -> Result<usize> {
        self.prepare_for(schema)?;
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }

        let mut stmt = self.conn.prepare_cached(&self.insert_sql)?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
        Ok(rows.len())
    }

    async fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{} table {}", self.location, self.table)
    }
}
