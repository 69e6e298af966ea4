//! In-memory client shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use polyqb::{Dialect, GenericClient, OrmResult, Row, Value};

/// Records every statement and answers with canned rows.
pub struct MockClient {
    dialect: Dialect,
    rows: Vec<Row>,
    affected: u64,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockClient {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            rows: Vec::new(),
            affected: 0,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Answer queries with `rows`, all sharing `columns`.
    pub fn with_rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        self.rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        self
    }

    pub fn with_affected(mut self, n: u64) -> Self {
        self.affected = n;
        self
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn last_sql(&self) -> String {
        self.statements()
            .last()
            .map(|(sql, _)| sql.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }
}

impl GenericClient for MockClient {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.record(sql, params);
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.record(sql, params);
        Ok(self.affected)
    }
}
