use dump_loader::record_processor::Dialect;
use dump_loader::utils::LoadJobConfig;
use dump_loader::{load_file, ColumnSchema, SqliteSink};
use std::io::Write;

#[tokio::test]
async fn test_sql_dump_into_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("export.sql");
    let db = dir.path().join("out").join("export.db");

    let mut file = std::fs::File::create(&dump).unwrap();
    write!(
        file,
        "REM INSERTING into EXPORT_TABLE\n\
         SET DEFINE OFF;\n\
         Insert into EXPORT_TABLE (ID,NAME,CREATED_DATE) values (1,'O''Brien',\n\
         to_date('18-MAY-24','DD-MON-RR'));\n\
         Insert into EXPORT_TABLE (ID,NAME,CREATED_DATE) values (2,'second',NULL);\n\
         Insert into EXPORT_TABLE (ID,NAME,CREATED_DATE) values (3,'third',to_date('garbage','DD-MON-RR'));\n\
         COMMIT;\n"
    )
    .unwrap();

    let schema = ColumnSchema::new(vec![
        "ID".to_string(),
        "NAME".to_string(),
        "CREATED_DATE".to_string(),
    ])
    .unwrap();
    let sink = SqliteSink::open(&db, "EXPORT_TABLE", true).unwrap();
    let job = LoadJobConfig::new(Dialect::sql_tuple()).with_batch_size(2);

    let (summary, sink) = load_file(&dump, job, schema, sink).await.unwrap();
    assert_eq!(summary.rows_inserted, 3);
    assert_eq!(summary.batches_committed, 2);
    assert_eq!(summary.statements_ignored, 1);
    assert_eq!(sink.row_count().unwrap(), 3);

    let (name, created): (String, String) = sink
        .connection()
        .query_row(
            "SELECT NAME, CREATED_DATE FROM EXPORT_TABLE WHERE ID = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "O'Brien");
    assert_eq!(created, "2024-05-18 00:00:00");

    let raw: String = sink
        .connection()
        .query_row(
            "SELECT CREATED_DATE FROM EXPORT_TABLE WHERE ID = 3",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(raw, "to_date('garbage','DD-MON-RR')");

    let missing: Option<String> = sink
        .connection()
        .query_row(
            "SELECT CREATED_DATE FROM EXPORT_TABLE WHERE ID = 2",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_failed_batch_is_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("export.sql");
    let db = dir.path().join("export.db");

    std::fs::write(
        &dump,
        "Insert into T (ID,NAME) values (1,'a');\nInsert into T (ID,NAME) values (2,'b');\n",
    )
    .unwrap();

    // Table exists with a stricter column set so the insert fails.
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE \"T\" (\"ID\" INTEGER NOT NULL)")
            .unwrap();
    }

    let schema = ColumnSchema::new(vec!["ID".to_string(), "NAME".to_string()]).unwrap();
    let sink = SqliteSink::open(&db, "T", false).unwrap();
    let job = LoadJobConfig::new(Dialect::sql_tuple());

    let err = load_file(&dump, job, schema, sink).await.unwrap_err();
    let summary = err.summary().unwrap();
    assert_eq!(summary.rows_inserted, 0);
    assert_eq!(summary.records_parsed, 2);

    let conn = rusqlite::Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM T", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
