//! Trailing window of recent queries and how many of them found nothing.

use crate::document::{Document, DocumentId, DocumentStatus};
use crate::error::Result;
use crate::search_server::{ExecutionPolicy, SearchServer};
use std::collections::VecDeque;

/// One day of requests at one request per minute.
pub const REQUEST_WINDOW: usize = 1440;

#[derive(Debug, Clone)]
struct QueryResult {
    raw_query: String,
    result_count: usize,
}

#[derive(Debug)]
pub struct RequestQueue {
    requests: VecDeque<QueryResult>,
    no_result_requests: usize,
    window: usize,
}

impl Default for RequestQueue {
    fn default() -> Self { Self::with_window(REQUEST_WINDOW) }
}

impl RequestQueue {
    pub fn new() -> Self { Self::default() }

    pub fn with_window(window: usize) -> Self {
        assert!(window > 0, "request window must be positive");
        Self { requests: VecDeque::with_capacity(window + 1), no_result_requests: 0, window }
    }

    /// Run an `Actual`-status query against `server` and record it.
    pub fn add_find_request(&mut self, server: &SearchServer, raw_query: &str) -> Result<Vec<Document>> {
        self.add_find_request_by_status(server, raw_query, DocumentStatus::Actual)
    }

    pub fn add_find_request_by_status(
        &mut self,
        server: &SearchServer,
        raw_query: &str,
        status: DocumentStatus,
    ) -> Result<Vec<Document>> {
        self.add_find_request_with(server, raw_query, move |_, document_status, _| document_status == status)
    }

    pub fn add_find_request_with<P>(&mut self, server: &SearchServer, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        self.add_find_request_with_policy(server, ExecutionPolicy::Sequential, raw_query, predicate)
    }

    /// Queries that fail to parse are not recorded.
    pub fn add_find_request_with_policy<P>(
        &mut self,
        server: &SearchServer,
        policy: ExecutionPolicy,
        raw_query: &str,
        predicate: P,
    ) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        let result = server.find_top_documents_with_policy(policy, raw_query, predicate)?;
        self.record(raw_query, result.len());
        Ok(result)
    }

    pub fn no_result_requests(&self) -> usize { self.no_result_requests }

    pub fn len(&self) -> usize { self.requests.len() }

    pub fn is_empty(&self) -> bool { self.requests.is_empty() }

    /// Most recent query text, if any.
    pub fn last_query(&self) -> Option<&str> {
        self.requests.back().map(|r| r.raw_query.as_str())
    }

    fn record(&mut self, raw_query: &str, result_count: usize) {
        if result_count == 0 {
            self.no_result_requests += 1;
        }
        self.requests.push_back(QueryResult { raw_query: raw_query.to_string(), result_count });
        if self.requests.len() > self.window {
            if let Some(evicted) = self.requests.pop_front() {
                if evicted.result_count == 0 {
                    self.no_result_requests -= 1;
                }
                tracing::trace!(query = %evicted.raw_query, "request evicted from window");
            }
        }
    }
}
