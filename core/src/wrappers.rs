//! Log-and-continue helpers for batch front ends.
//!
//! Each helper calls into [`SearchServer`], reports failures through
//! `tracing` instead of returning them, and logs how long the call took.

use crate::document::{Document, DocumentId, DocumentStatus};
use crate::search_server::{ExecutionPolicy, SearchServer};
use std::fmt;
use std::time::Instant;

/// Outcome of matching one query against one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub document_id: DocumentId,
    pub words: Vec<String>,
    pub status: DocumentStatus,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ document_id = {}, status = {}, words =", self.document_id, self.status)?;
        for word in &self.words {
            write!(f, " {word}")?;
        }
        write!(f, "}}")
    }
}

/// Returns whether the document was added.
pub fn add_document(
    server: &mut SearchServer,
    document_id: DocumentId,
    document: &str,
    status: DocumentStatus,
    ratings: &[i32],
) -> bool {
    match server.add_document(document_id, document, status, ratings) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(document_id, error = %err, "error adding document");
            false
        }
    }
}

/// Top documents with `status` for `raw_query`; an invalid query yields no documents.
pub fn find_top_documents(
    server: &SearchServer,
    policy: ExecutionPolicy,
    raw_query: &str,
    status: DocumentStatus,
) -> Vec<Document> {
    let start = Instant::now();
    let result = server.find_top_documents_with_policy(policy, raw_query, |_, document_status, _| {
        document_status == status
    });
    let took_ms = start.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(documents) => {
            tracing::info!(query = raw_query, hits = documents.len(), ?policy, took_ms, "search finished");
            documents
        }
        Err(err) => {
            tracing::warn!(query = raw_query, error = %err, took_ms, "search error");
            Vec::new()
        }
    }
}

/// Match `query` against every live document, stopping at the first error.
pub fn match_documents(server: &SearchServer, query: &str) -> Vec<MatchResult> {
    let start = Instant::now();
    let mut results = Vec::with_capacity(server.get_document_count());
    for document_id in server {
        match server.match_document(query, document_id) {
            Ok((words, status)) => results.push(MatchResult {
                document_id,
                words: words.into_iter().map(str::to_string).collect(),
                status,
            }),
            Err(err) => {
                tracing::warn!(query, error = %err, "error matching documents");
                break;
            }
        }
    }
    let took_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(query, matched = results.len(), took_ms, "matching finished");
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_document_reports_failure() {
        let mut server = SearchServer::default();
        assert!(add_document(&mut server, 1, "cat", DocumentStatus::Actual, &[1]));
        assert!(!add_document(&mut server, 1, "dog", DocumentStatus::Actual, &[1]));
        assert!(!add_document(&mut server, -1, "dog", DocumentStatus::Actual, &[1]));
        assert!(!add_document(&mut server, 3, "d\x12og", DocumentStatus::Actual, &[1]));
        assert_eq!(server.get_document_count(), 1);
    }

    #[test]
    fn invalid_query_yields_nothing() {
        let mut server = SearchServer::default();
        server.add_document(1, "cat", DocumentStatus::Actual, &[1]).unwrap();
        server.add_document(2, "cat", DocumentStatus::Banned, &[1]).unwrap();
        assert!(find_top_documents(&server, ExecutionPolicy::Sequential, "cat -", DocumentStatus::Actual).is_empty());
        let actual = find_top_documents(&server, ExecutionPolicy::Parallel, "cat", DocumentStatus::Actual);
        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].id, 1);
        let banned = find_top_documents(&server, ExecutionPolicy::Sequential, "cat", DocumentStatus::Banned);
        assert_eq!(banned[0].id, 2);
    }

    #[test]
    fn match_documents_covers_every_document() {
        let mut server = SearchServer::new("and").unwrap();
        server.add_document(2, "fluffy cat", DocumentStatus::Actual, &[1]).unwrap();
        server.add_document(1, "white dog and collar", DocumentStatus::Banned, &[1]).unwrap();
        let results = match_documents(&server, "dog cat");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, 1);
        assert_eq!(results[0].words, vec!["dog"]);
        assert_eq!(results[0].status, DocumentStatus::Banned);
        assert_eq!(results[1].words, vec!["cat"]);
        assert!(match_documents(&server, "--dog").is_empty());
    }

    #[test]
    fn match_result_display() {
        let result = MatchResult { document_id: 4, words: vec!["cat".into(), "tail".into()], status: DocumentStatus::Actual };
        assert_eq!(result.to_string(), "{ document_id = 4, status = actual, words = cat tail}");
    }
}
