//! Metadata catalog (spec §4.2): the read-only, load-once map of databases,
//! tables and their declared column schemas.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::EngineError;

/// One column's declared name and type, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: String,
}

/// A table's schema plus where its backing CSV file lives on disk.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
    pub csv_path: PathBuf,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_types(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.declared_type.clone()).collect()
    }

    /// Case-insensitive column lookup, returning its position in schema order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

struct Table {
    /// Original-cased table name, for diagnostics.
    name: String,
    schema: TableSchema,
}

struct Database {
    /// Original-cased database name, for diagnostics.
    name: String,
    tables: HashMap<String, Table>,
}

/// The loaded-at-startup, read-only-thereafter metadata catalog (spec §4.2,
/// §5 lifecycle). Construction is left to callers (`csvql-cli`'s filesystem
/// discovery); this type only exposes lookups.
pub struct Catalog {
    databases: HashMap<String, Database>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            databases: HashMap::new(),
        }
    }

    /// Registers a database and its tables. Used by catalog builders; not
    /// part of the request-time surface.
    pub fn add_database(&mut self, name: impl Into<String>, tables: Vec<(String, TableSchema)>) {
        let name = name.into();
        let mut table_map = HashMap::with_capacity(tables.len());
        for (table_name, schema) in tables {
            table_map.insert(
                table_name.to_ascii_lowercase(),
                Table {
                    name: table_name,
                    schema,
                },
            );
        }
        self.databases.insert(
            name.to_ascii_lowercase(),
            Database {
                name,
                tables: table_map,
            },
        );
    }

    pub fn list_databases(&self) -> Vec<String> {
        self.databases.values().map(|d| d.name.clone()).collect()
    }

    pub fn has_database(&self, db: &str) -> bool {
        self.databases.contains_key(&db.to_ascii_lowercase())
    }

    pub fn list_tables(&self, db: &str) -> Result<Vec<String>, EngineError> {
        self.databases
            .get(&db.to_ascii_lowercase())
            .map(|d| d.tables.values().map(|t| t.name.clone()).collect())
            .ok_or_else(|| EngineError::validation(format!("unknown database: {db}")))
    }

    pub fn schema_of(&self, db: &str, table: &str) -> Result<&TableSchema, EngineError> {
        let database = self
            .databases
            .get(&db.to_ascii_lowercase())
            .ok_or_else(|| EngineError::validation(format!("unknown database: {db}")))?;
        database
            .tables
            .get(&table.to_ascii_lowercase())
            .map(|t| &t.schema)
            .ok_or_else(|| EngineError::validation(format!("no such table: {db}.{table}")))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
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
            csv_path: PathBuf::from("/tmp/does-not-matter.csv"),
        }
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut cat = Catalog::new();
        cat.add_database("Shop", vec![("Orders".into(), schema())]);

        assert!(cat.has_database("shop"));
        assert!(cat.schema_of("SHOP", "orders").is_ok());
        assert_eq!(cat.schema_of("shop", "Orders").unwrap().columns.len(), 2);
    }

    #[test]
    fn unknown_database_and_table() {
        let mut cat = Catalog::new();
        cat.add_database("shop", vec![("orders".into(), schema())]);

        assert!(cat.schema_of("nope", "orders").is_err());
        assert!(cat.schema_of("shop", "nope").is_err());
    }

    #[test]
    fn column_index_of_is_case_insensitive() {
        let s = schema();
        assert_eq!(s.index_of("ID"), Some(0));
        assert_eq!(s.index_of("name"), Some(1));
        assert_eq!(s.index_of("missing"), None);
    }
}
