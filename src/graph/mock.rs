//! Recording executor for unit tests.
//!
//! Captures every Cypher statement with its parameters and replays queued
//! result sets in order. Once the queue is empty, queries return no rows.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::{CypherExecutor, Transaction};

/// A captured query.
#[derive(Debug, Clone)]
pub struct Call {
    pub cypher: String,
    pub params: Params,
}

#[derive(Default)]
pub struct MockExecutor {
    calls: Mutex<Vec<Call>>,
    responses: Mutex<VecDeque<Result<Vec<Row>, String>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a result set for the next unanswered query.
    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        self.push_rows(rows);
        self
    }

    /// Queues a query failure for the next unanswered query.
    pub fn with_error(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.responses.lock().unwrap().push_back(Ok(rows));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Call {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no query was executed")
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, cypher: &str, params: Params) -> Result<Vec<Row>, AppError> {
        self.calls.lock().unwrap().push(Call {
            cypher: cypher.to_string(),
            params,
        });
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(AppError::Query {
                message,
                query: cypher.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl CypherExecutor for MockExecutor {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let rows = self.record(cypher, params)?;
        Ok(Box::pin(futures::stream::iter(rows.into_iter().map(Ok))))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.record(cypher, params).map(|_| ())
    }
}

#[async_trait]
impl Transaction for MockExecutor {
    async fn commit(self) -> Result<(), AppError> {
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        Ok(())
    }
}
