//! The Scan → Filter → Project streaming pipeline (spec §4.3-4.5).
//!
//! Every stage is a plain `Iterator<Item = Row>`; there is no shared
//! "iterator" trait beyond that one from `std` — matching the original's
//! pull-based, zero-buffering generator chain without inventing an
//! inheritance hierarchy for it.

pub mod filter;
pub mod project;
pub mod scan;

use crate::error::EngineError;
use crate::types::CellValue;

/// One typed, converted row, in scan column order (or reordered by Project).
pub type Row = Vec<CellValue>;

/// A boxed, owned row iterator. `Send` so it can cross the
/// `spawn_blocking` boundary in `csvql-server`. Each item is fallible: a
/// genuine I/O error reading the CSV file (as opposed to a single malformed
/// row, which is silently dropped per spec §4.3 point 4) surfaces as one
/// trailing `Err(DataAccessError)` item, after which the iterator is
/// exhausted (spec §4.9 point 5, §7).
pub type RowIter = Box<dyn Iterator<Item = Result<Row, EngineError>> + Send>;

pub use filter::FilterIterator;
pub use project::ProjectIterator;
pub use scan::ScanIterator;
