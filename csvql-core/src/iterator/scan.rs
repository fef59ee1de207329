use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use csv::{ErrorKind, Reader, ReaderBuilder, StringRecord};

use crate::catalog::TableSchema;
use crate::error::EngineError;
use crate::iterator::Row;
use crate::types::{converters_for, Converter};

/// Default batch size (spec §5's streaming backpressure buffer, §4.3 point 5).
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// The Scan iterator (spec §4.3): opens one CSV file, validates its header
/// against the declared schema, and yields typed rows, dropping any row that
/// fails conversion or has the wrong arity rather than erroring the stream.
pub struct ScanIterator {
    reader: Option<Reader<File>>,
    converters: Vec<Converter>,
    batch_size: usize,
    buffer: VecDeque<Row>,
    dropped: u64,
    table_label: String,
    /// A genuine I/O error hit while reading the file (distinct from a
    /// per-row conversion/arity failure, which is silently dropped). Set at
    /// most once; yielded exactly once as the final `next()` item, then the
    /// scan is exhausted.
    error: Option<EngineError>,
}

impl ScanIterator {
    /// Opens the table's CSV file and validates its header. Everything that
    /// can fail happens here, eagerly, per spec §4.3 points 1-2 — the
    /// iterator itself never fails once constructed.
    pub fn new(
        db: &str,
        table: &str,
        schema: &TableSchema,
        batch_size: usize,
    ) -> Result<Self, EngineError> {
        Self::open(&schema.csv_path, schema, db, table, batch_size)
    }

    fn open(
        path: &Path,
        schema: &TableSchema,
        db: &str,
        table: &str,
        batch_size: usize,
    ) -> Result<Self, EngineError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|_| EngineError::data_access("table not found"))?;

        let mut header = StringRecord::new();
        let has_header_row = reader
            .read_record(&mut header)
            .map_err(|_| EngineError::data_access("header mismatch"))?;
        if !has_header_row {
            return Err(EngineError::data_access("header mismatch"));
        }
        validate_header(&header, schema)?;

        let converters = converters_for(&schema.column_types())?;

        Ok(ScanIterator {
            reader: Some(reader),
            converters,
            batch_size,
            buffer: VecDeque::new(),
            dropped: 0,
            table_label: format!("{db}.{table}"),
            error: None,
        })
    }

    fn refill(&mut self) {
        let Some(reader) = self.reader.as_mut() else {
            return;
        };

        let mut record = StringRecord::new();
        let mut read_any = false;
        for _ in 0..self.batch_size {
            match reader.read_record(&mut record) {
                Ok(true) => {
                    read_any = true;
                    if record.len() != self.converters.len() {
                        self.dropped += 1;
                        continue;
                    }
                    match convert_record(&record, &self.converters) {
                        Ok(row) => self.buffer.push_back(row),
                        Err(_) => self.dropped += 1,
                    }
                }
                Ok(false) => break,
                // `UnequalLengths` is the `csv` crate's own detection of a
                // row whose arity doesn't match — the row-drop case from
                // spec §4.3 point 4, not a genuine I/O failure.
                Err(e) if matches!(e.kind(), ErrorKind::UnequalLengths { .. }) => {
                    read_any = true;
                    self.dropped += 1;
                }
                Err(e) => {
                    // A real CSV I/O error (malformed framing, bad UTF-8,
                    // a failed read from disk): abort the stream instead of
                    // silently dropping, per spec §4.9 point 5 / §7.
                    self.error = Some(EngineError::data_access(format!(
                        "{}: I/O error reading row: {e}",
                        self.table_label
                    )));
                    break;
                }
            }
        }

        if self.dropped > 0 {
            log::debug!("{}: {} row(s) dropped so far", self.table_label, self.dropped);
        }

        if self.error.is_some() || !read_any {
            self.close();
        }
    }

    /// Releases the file handle. Idempotent (spec §4.3 point 6).
    pub fn close(&mut self) {
        if self.reader.take().is_some() && self.dropped > 0 {
            log::info!(
                "{}: scan closed, {} row(s) dropped total",
                self.table_label,
                self.dropped
            );
        }
    }
}

fn validate_header(header: &StringRecord, schema: &TableSchema) -> Result<(), EngineError> {
    if header.len() != schema.columns.len() {
        return Err(EngineError::data_access("header mismatch"));
    }
    for (cell, col) in header.iter().zip(schema.columns.iter()) {
        if !cell.eq_ignore_ascii_case(&col.name) {
            return Err(EngineError::data_access("header mismatch"));
        }
    }
    Ok(())
}

fn convert_record(record: &StringRecord, converters: &[Converter]) -> Result<Row, EngineError> {
    record
        .iter()
        .zip(converters.iter())
        .map(|(cell, conv)| conv.convert(cell))
        .collect()
}

impl Iterator for ScanIterator {
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Result<Row, EngineError>> {
        if self.buffer.is_empty() && self.error.is_none() {
            self.refill();
        }
        if let Some(row) = self.buffer.pop_front() {
            return Some(Ok(row));
        }
        self.error.take().map(Err)
    }
}

impl Drop for ScanIterator {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDef;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        write_csv_bytes(dir, name, contents.as_bytes())
    }

    fn write_csv_bytes(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    fn schema(path: std::path::PathBuf) -> TableSchema {
        TableSchema {
            columns: vec![
                ColumnDef {
                    name: "id".into(),
                    declared_type: "INTEGER".into(),
                },
                ColumnDef {
                    name: "name".into(),
                    declared_type: "VARCHAR".into(),
                },
            ],
            csv_path: path,
        }
    }

    #[test]
    fn reads_and_converts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "id,name\n1,alice\n2,bob\n");
        let schema = schema(path);
        let mut scan = ScanIterator::new("db", "t", &schema, DEFAULT_BATCH_SIZE).unwrap();

        let rows: Vec<_> = (&mut scan).map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn drops_malformed_rows_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "id,name\n1,alice\nnotanumber,bob\n3,carol\n");
        let schema = schema(path);
        let mut scan = ScanIterator::new("db", "t", &schema, DEFAULT_BATCH_SIZE).unwrap();

        let rows: Vec<_> = (&mut scan).map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(scan.dropped, 1);
    }

    #[test]
    fn drops_rows_with_wrong_arity_without_error() {
        let dir = tempfile::tempdir().unwrap();
        // A row with an extra field is the `csv` crate's own `UnequalLengths`
        // detection — the arity-mismatch row-drop case, not a genuine I/O
        // failure.
        let path = write_csv(&dir, "t.csv", "id,name\n1,alice\n2,bob,extra\n3,carol\n");
        let schema = schema(path);
        let mut scan = ScanIterator::new("db", "t", &schema, DEFAULT_BATCH_SIZE).unwrap();

        let rows: Vec<_> = (&mut scan).map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(scan.dropped, 1);
    }

    #[test]
    fn genuine_io_error_surfaces_as_a_trailing_err_item() {
        let dir = tempfile::tempdir().unwrap();
        // Invalid UTF-8 in a data row is a genuine parse failure (not an
        // arity mismatch): the `csv` crate reports it as `ErrorKind::Utf8`,
        // which must abort the stream rather than silently drop the row.
        let mut body = b"id,name\n1,alice\n2,".to_vec();
        body.extend_from_slice(&[0xFF, 0xFE]);
        body.push(b'\n');
        let path = write_csv_bytes(&dir, "t.csv", &body);
        let schema = schema(path);
        let mut scan = ScanIterator::new("db", "t", &schema, DEFAULT_BATCH_SIZE).unwrap();

        let items: Vec<_> = (&mut scan).collect();
        assert!(items[0].is_ok());
        assert!(items.last().unwrap().is_err());
        assert!(!items.last().unwrap().as_ref().unwrap_err().is_validation());
    }

    #[test]
    fn header_mismatch_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "id,wrong\n1,alice\n");
        let schema = schema(path);
        let err = ScanIterator::new("db", "t", &schema, DEFAULT_BATCH_SIZE).unwrap_err();
        assert!(!err.is_validation());
    }

    #[test]
    fn missing_file_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path().join("missing.csv"));
        assert!(ScanIterator::new("db", "t", &schema, DEFAULT_BATCH_SIZE).is_err());
    }
}
