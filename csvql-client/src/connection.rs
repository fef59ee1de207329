//! `Connection`/`Cursor` (spec §1, §8), grounded in
//! `original_source/dbapi2/src/dbcsv/connection.py`: a synchronous,
//! PEP-249-shaped driver. `reqwest`'s `blocking` client keeps the cursor API
//! synchronous, matching the original's `requests`-based transport and
//! requiring no async executor from callers.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::dsn::{self, Dsn};
use crate::error::ClientError;

pub struct Connection {
    client: Client,
    dsn: Dsn,
    token: String,
}

impl Connection {
    /// `connect(dsn, username, password)`: POSTs to `/auth/connect` and
    /// stores the bearer token for subsequent cursors.
    pub fn connect(dsn_str: &str, username: &str, password: &str) -> Result<Self, ClientError> {
        let dsn = dsn::parse(dsn_str)?;
        let client = Client::new();

        let response = client
            .post(format!("{}/auth/connect", dsn.base_url))
            .form(&[("username", username), ("password", password), ("db", dsn.db.as_str())])
            .send()?;

        let token = extract_token(response)?;
        Ok(Connection { client, dsn, token })
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor { conn: self, pending: VecDeque::new(), lines: None, done: false }
    }

    /// `refresh(principal) -> token` from the client side: re-issues the
    /// held bearer token before it expires.
    pub fn refresh(&mut self) -> Result<(), ClientError> {
        let response = self
            .client
            .post(format!("{}/auth/refresh", self.dsn.base_url))
            .bearer_auth(&self.token)
            .send()?;
        self.token = extract_token(response)?;
        Ok(())
    }
}

fn extract_token(response: Response) -> Result<String, ClientError> {
    let status = response.status();
    if status.is_success() {
        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
        }
        let body: TokenResponse = response.json()?;
        Ok(body.access_token)
    } else {
        Err(classify_error(status, response))
    }
}

fn classify_error(status: StatusCode, response: Response) -> ClientError {
    let detail = response
        .json::<serde_json::Map<String, Value>>()
        .ok()
        .and_then(|m| m.get("detail").and_then(|v| v.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    if status.is_client_error() {
        ClientError::ProgrammingError(detail)
    } else {
        ClientError::DatabaseError(detail)
    }
}

#[derive(Serialize)]
struct SqlRequest<'a> {
    sql: &'a str,
    db: &'a str,
}

/// One row's cells, generically as parsed JSON values (the client has no
/// declared-type registry of its own — that lives server-side).
pub type Row = Vec<Value>;

pub struct Cursor<'a> {
    conn: &'a Connection,
    pending: VecDeque<Row>,
    lines: Option<std::io::Lines<BufReader<Response>>>,
    done: bool,
}

impl<'a> Cursor<'a> {
    /// Sends the query and prepares the NDJSON stream for consumption.
    /// Mirrors the original's `_make_row_generator`: results are not
    /// materialized eagerly.
    pub fn execute(&mut self, sql: &str) -> Result<(), ClientError> {
        let response = self
            .conn
            .client
            .post(format!("{}/query/sql", self.conn.dsn.base_url))
            .bearer_auth(&self.conn.token)
            .json(&SqlRequest { sql, db: &self.conn.dsn.db })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_error(status, response));
        }

        self.lines = Some(BufReader::new(response).lines());
        self.pending.clear();
        self.done = false;
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>, ClientError> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if self.done {
                return Ok(None);
            }
            let Some(lines) = self.lines.as_mut() else {
                return Ok(None);
            };
            match lines.next() {
                None => self.done = true,
                Some(Err(e)) => return Err(ClientError::DatabaseError(e.to_string())),
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.pending.extend(parse_line(&line)?);
                }
            }
        }
    }

    pub fn fetch_one(&mut self) -> Result<Option<Row>, ClientError> {
        self.next_row()
    }

    pub fn fetch_many(&mut self, n: usize) -> Result<Vec<Row>, ClientError> {
        let mut rows = Vec::with_capacity(n);
        for _ in 0..n {
            match self.next_row()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    pub fn fetch_all(&mut self) -> Result<Vec<Row>, ClientError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = Result<Row, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

/// Each NDJSON line is either a "batch" (array of row-arrays) or a "single
/// row" (flat array); both shapes are accepted (spec §6).
fn parse_line(line: &str) -> Result<Vec<Row>, ClientError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ClientError::Protocol(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(ClientError::Protocol("expected a JSON array".to_string())),
    };

    let is_batch = matches!(items.first(), Some(Value::Array(_)));
    if is_batch {
        items
            .into_iter()
            .map(|item| match item {
                Value::Array(row) => Ok(row),
                _ => Err(ClientError::Protocol("mixed batch/row shapes on one line".to_string())),
            })
            .collect()
    } else {
        Ok(vec![items])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_row_line() {
        let rows = parse_line("[1, \"alice\", true]").unwrap();
        assert_eq!(rows, vec![vec![Value::from(1), Value::from("alice"), Value::from(true)]]);
    }

    #[test]
    fn parses_a_batch_line() {
        let rows = parse_line("[[1, \"a\"], [2, \"b\"]]").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn rejects_non_array_lines() {
        assert!(parse_line("\"not an array\"").is_err());
    }
}
