//! The restricted SQL-over-CSV query engine: type registry, metadata
//! catalog, the Scan/Filter/Project streaming pipeline, the SQL validator
//! and predicate compiler, the plan builder, and the query engine facade.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod iterator;
pub mod plan;
pub mod sql;
pub mod types;

pub use catalog::{Catalog, ColumnDef, TableSchema};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use iterator::Row;
pub use types::CellValue;
