//! Query engine facade (spec §4.8): the single entry point the HTTP layer
//! and any other caller drive. Validation happens eagerly; everything else
//! about the returned row stream is lazy except the Scan's file-open and
//! header check, which happen at construction time (spec §4.3 points 1-2).

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::{EngineError, EngineResult};
use crate::iterator::RowIter;
use crate::plan;
use crate::sql::{extract_table_name, parse_and_validate};

pub struct Engine {
    catalog: Arc<Catalog>,
}

impl Engine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Engine { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Validates `sql` against `db` and, if accepted, returns a streaming
    /// row iterator already positioned at the first row (spec §4.8).
    pub fn execute(&self, db: &str, sql: &str) -> EngineResult<RowIter> {
        if !self.catalog.has_database(db) {
            return Err(EngineError::validation(format!("unknown database: {db}")));
        }

        let table_name = extract_table_name(sql, db)?;
        let schema = self.catalog.schema_of(db, &table_name)?;
        let descriptor = parse_and_validate(sql, db, &table_name, schema)?;
        let built = plan::build(&descriptor, db, schema);
        plan::execute(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDef;
    use crate::catalog::TableSchema;
    use std::fs::File;
    use std::io::Write;

    fn catalog_with_one_table(dir: &tempfile::TempDir) -> Catalog {
        let path = dir.path().join("t.csv");
        File::create(&path).unwrap().write_all(b"id,name\n1,alice\n2,bob\n").unwrap();
        let schema = TableSchema {
            columns: vec![
                ColumnDef { name: "id".into(), declared_type: "INTEGER".into() },
                ColumnDef { name: "name".into(), declared_type: "VARCHAR".into() },
            ],
            csv_path: path,
        };
        let mut catalog = Catalog::new();
        catalog.add_database("db", vec![("t".to_string(), schema)]);
        catalog
    }

    #[test]
    fn executes_a_simple_select() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(Arc::new(catalog_with_one_table(&dir)));
        let rows: Vec<_> = engine.execute("db", "SELECT * FROM t").unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn rejects_unknown_database() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(Arc::new(catalog_with_one_table(&dir)));
        let err = engine.execute("nope", "SELECT * FROM t").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_unknown_table() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(Arc::new(catalog_with_one_table(&dir)));
        let err = engine.execute("db", "SELECT * FROM nope").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn filters_rows_with_where_clause() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(Arc::new(catalog_with_one_table(&dir)));
        let rows: Vec<_> = engine
            .execute("db", "SELECT name FROM t WHERE id = 2")
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows.len(), 1);
    }
}
