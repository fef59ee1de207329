//! A PEP-249-shaped synchronous client driver for csvql, grounded in
//! `original_source/dbapi2/src/dbcsv/connection.py`.

pub mod connection;
pub mod dsn;
pub mod error;

pub use connection::{Connection, Cursor, Row};
pub use dsn::Dsn;
pub use error::ClientError;
