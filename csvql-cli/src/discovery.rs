//! Filesystem catalog discovery (SPEC_FULL.md's concretization of spec.md
//! §1's "filesystem discovery" external capability): `<data-root>/<db>/` is
//! a database, `<data-root>/<db>/<table>.csv` a table, and since a bare CSV
//! carries no type information, a sidecar `<table>.schema.json` (an
//! ordered array of `{"name", "type"}` objects) supplies the declared
//! column schema. A discovered `.csv` with no matching sidecar is a
//! startup-time error, not a per-request one.

use std::fs;
use std::path::Path;

use csvql_core::{Catalog, ColumnDef, TableSchema};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SchemaColumn {
    name: String,
    #[serde(rename = "type")]
    declared_type: String,
}

pub fn discover_catalog(data_root: &Path) -> std::io::Result<Catalog> {
    let mut catalog = Catalog::new();

    for entry in fs::read_dir(data_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let db_name = entry.file_name().to_string_lossy().into_owned();
        let tables = discover_tables(&entry.path())?;
        catalog.add_database(db_name, tables);
    }

    Ok(catalog)
}

fn discover_tables(db_dir: &Path) -> std::io::Result<Vec<(String, TableSchema)>> {
    let mut tables = Vec::new();

    for entry in fs::read_dir(db_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }

        let table_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let schema_path = path.with_extension("schema.json");
        if !schema_path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("missing schema sidecar for {}: {}", path.display(), schema_path.display()),
            ));
        }

        let raw = fs::read_to_string(&schema_path)?;
        let columns: Vec<SchemaColumn> = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let schema = TableSchema {
            columns: columns
                .into_iter()
                .map(|c| ColumnDef { name: c.name, declared_type: c.declared_type })
                .collect(),
            csv_path: path,
        };
        tables.push((table_name, schema));
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn discovers_databases_tables_and_schemas() {
        let root = tempfile::tempdir().unwrap();
        let db_dir = root.path().join("shop");
        fs::create_dir(&db_dir).unwrap();

        let csv_path = db_dir.join("orders.csv");
        File::create(&csv_path).unwrap().write_all(b"id,total\n1,9.5\n").unwrap();
        let schema_path = db_dir.join("orders.schema.json");
        File::create(&schema_path)
            .unwrap()
            .write_all(br#"[{"name":"id","type":"INTEGER"},{"name":"total","type":"FLOAT"}]"#)
            .unwrap();

        let catalog = discover_catalog(root.path()).unwrap();
        assert!(catalog.has_database("shop"));
        let schema = catalog.schema_of("shop", "orders").unwrap();
        assert_eq!(schema.columns.len(), 2);
    }

    #[test]
    fn missing_sidecar_is_a_startup_error() {
        let root = tempfile::tempdir().unwrap();
        let db_dir = root.path().join("shop");
        fs::create_dir(&db_dir).unwrap();
        File::create(db_dir.join("orders.csv")).unwrap();

        assert!(discover_catalog(root.path()).is_err());
    }
}
