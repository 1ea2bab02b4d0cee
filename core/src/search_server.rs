//! In-memory TF-IDF index over a word→document and a document→word map.
//!
//! Both maps are keyed by the same interned spelling and are only ever
//! mutated together, inside `add_document` and `remove_document*`, so the
//! forward index is always the exact transpose of the inverted index.

use crate::concurrent_map::{ConcurrentMap, DEFAULT_BUCKET_COUNT};
use crate::document::{compute_average_rating, Document, DocumentData, DocumentId, DocumentStatus};
use crate::error::{Result, SearchError};
use crate::tokenizer::{is_valid_word, split_into_non_empty_words, split_into_words};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{btree_set, BTreeMap, BTreeSet};
use std::iter::Copied;
use std::sync::Arc;

pub const MAX_RESULT_DOCUMENT_COUNT: usize = 5;
/// Relevances closer than this are ranked by rating instead.
pub const RELEVANCE_EPSILON: f64 = 1e-6;

/// Selects the sequential or the rayon-backed variant of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPolicy {
    #[default]
    Sequential,
    Parallel,
}

pub type WordFrequencies = BTreeMap<Arc<str>, f64>;

static EMPTY_WORD_FREQUENCIES: WordFrequencies = BTreeMap::new();

struct QueryWord<'q> {
    data: &'q str,
    is_minus: bool,
    is_stop: bool,
}

#[derive(Debug, Default)]
struct Query<'q> {
    plus_words: BTreeSet<&'q str>,
    minus_words: BTreeSet<&'q str>,
}

#[derive(Debug, Clone)]
pub struct SearchServer {
    stop_words: BTreeSet<String>,
    /// Interned spellings. Never shrinks, even after the last document using a
    /// word is removed.
    words: BTreeSet<Arc<str>>,
    word_to_document_freqs: BTreeMap<Arc<str>, BTreeMap<DocumentId, f64>>,
    document_to_word_freqs: BTreeMap<DocumentId, WordFrequencies>,
    documents: BTreeMap<DocumentId, DocumentData>,
    document_ids: BTreeSet<DocumentId>,
    bucket_count: usize,
}

impl Default for SearchServer {
    fn default() -> Self {
        Self {
            stop_words: BTreeSet::new(),
            words: BTreeSet::new(),
            word_to_document_freqs: BTreeMap::new(),
            document_to_word_freqs: BTreeMap::new(),
            documents: BTreeMap::new(),
            document_ids: BTreeSet::new(),
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

impl SearchServer {
    /// Build a server whose stop words are the space-separated words of `stop_words_text`.
    pub fn new(stop_words_text: &str) -> Result<Self> {
        Self::with_stop_words(split_into_words(stop_words_text))
    }

    /// Build a server from any collection of stop words. Empty entries are
    /// ignored, words with control characters are rejected.
    pub fn with_stop_words<I, S>(stop_words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut server = Self::default();
        server.stop_words = make_unique_non_empty_strings(stop_words)?;
        Ok(server)
    }

    /// Number of shards used by the parallel relevance accumulator.
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        assert!(bucket_count > 0, "bucket count must be positive");
        self.bucket_count = bucket_count;
        self
    }

    /// Add more stop words. Documents already indexed are left as they are.
    pub fn set_stop_words(&mut self, text: &str) -> Result<()> {
        let extra = make_unique_non_empty_strings(split_into_words(text))?;
        self.stop_words.extend(extra);
        Ok(())
    }

    pub fn get_document_count(&self) -> usize { self.documents.len() }

    /// Live document ids in ascending order.
    pub fn iter(&self) -> Copied<btree_set::Iter<'_, DocumentId>> {
        self.document_ids.iter().copied()
    }

    /// Distinct spellings seen so far, including ones no live document uses.
    pub fn interned_word_count(&self) -> usize { self.words.len() }

    pub fn get_word_frequencies(&self, document_id: DocumentId) -> &WordFrequencies {
        self.document_to_word_freqs
            .get(&document_id)
            .unwrap_or(&EMPTY_WORD_FREQUENCIES)
    }

    pub fn add_document(
        &mut self,
        document_id: DocumentId,
        document: &str,
        status: DocumentStatus,
        ratings: &[i32],
    ) -> Result<()> {
        if document_id < 0 || self.documents.contains_key(&document_id) {
            return Err(SearchError::InvalidDocumentId(document_id));
        }
        let words = self.split_into_words_no_stop(document)?;
        let inv_word_count = 1.0 / words.len() as f64;

        let mut word_freqs = WordFrequencies::new();
        for word in &words {
            let word = self.intern(word);
            *self
                .word_to_document_freqs
                .entry(Arc::clone(&word))
                .or_default()
                .entry(document_id)
                .or_insert(0.0) += inv_word_count;
            *word_freqs.entry(word).or_insert(0.0) += inv_word_count;
        }
        let distinct_words = word_freqs.len();
        self.document_to_word_freqs.insert(document_id, word_freqs);

        let rating = compute_average_rating(ratings);
        self.documents.insert(document_id, DocumentData { rating, status });
        self.document_ids.insert(document_id);
        tracing::debug!(document_id, words = words.len(), distinct_words, rating, %status, "document added");
        Ok(())
    }

    pub fn remove_document(&mut self, document_id: DocumentId) {
        self.remove_document_with_policy(ExecutionPolicy::Sequential, document_id)
    }

    /// Removing an id that is not live does nothing. Both policies only touch
    /// the posting lists of the document's own words.
    pub fn remove_document_with_policy(&mut self, policy: ExecutionPolicy, document_id: DocumentId) {
        if !self.document_ids.remove(&document_id) {
            return;
        }
        self.documents.remove(&document_id);
        let word_freqs = self
            .document_to_word_freqs
            .remove(&document_id)
            .unwrap_or_default();

        match policy {
            ExecutionPolicy::Sequential => {
                for word in word_freqs.keys() {
                    if let Some(docs) = self.word_to_document_freqs.get_mut(word) {
                        docs.remove(&document_id);
                    }
                }
            }
            ExecutionPolicy::Parallel => {
                // Detach the document's own posting maps so each worker owns one.
                let mut postings: Vec<(Arc<str>, BTreeMap<DocumentId, f64>)> = word_freqs
                    .keys()
                    .filter_map(|word| self.word_to_document_freqs.remove_entry(word))
                    .collect();
                postings.par_iter_mut().for_each(|(_, docs)| {
                    docs.remove(&document_id);
                });
                self.word_to_document_freqs
                    .extend(postings.into_iter().filter(|(_, docs)| !docs.is_empty()));
            }
        }

        for word in word_freqs.keys() {
            if self.word_to_document_freqs.get(word).is_some_and(|docs| docs.is_empty()) {
                self.word_to_document_freqs.remove(word);
            }
        }
        tracing::debug!(document_id, words = word_freqs.len(), ?policy, "document removed");
    }

    /// Top documents with status `Actual`.
    pub fn find_top_documents(&self, raw_query: &str) -> Result<Vec<Document>> {
        self.find_top_documents_by_status(raw_query, DocumentStatus::Actual)
    }

    pub fn find_top_documents_by_status(&self, raw_query: &str, status: DocumentStatus) -> Result<Vec<Document>> {
        self.find_top_documents_with(raw_query, move |_, document_status, _| document_status == status)
    }

    pub fn find_top_documents_with<P>(&self, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        self.find_top_documents_with_policy(ExecutionPolicy::Sequential, raw_query, predicate)
    }

    /// Rank documents against `raw_query`, keeping those accepted by
    /// `predicate(id, status, rating)`. At most [`MAX_RESULT_DOCUMENT_COUNT`]
    /// results, ordered by relevance then rating; the order does not depend on
    /// `policy`.
    pub fn find_top_documents_with_policy<P>(
        &self,
        policy: ExecutionPolicy,
        raw_query: &str,
        predicate: P,
    ) -> Result<Vec<Document>>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        let query = self.parse_query(raw_query)?;
        let mut matched_documents = match policy {
            ExecutionPolicy::Sequential => self.find_all_documents(&query, &predicate),
            ExecutionPolicy::Parallel => self.find_all_documents_par(&query, &predicate),
        };
        match policy {
            ExecutionPolicy::Sequential => matched_documents.sort_by(compare_by_key),
            ExecutionPolicy::Parallel => matched_documents.par_sort_by(compare_by_key),
        }
        Ok(select_top_documents(matched_documents))
    }

    pub fn match_document(&self, raw_query: &str, document_id: DocumentId) -> Result<(Vec<&str>, DocumentStatus)> {
        self.match_document_with_policy(ExecutionPolicy::Sequential, raw_query, document_id)
    }

    /// Plus-words of `raw_query` found in the document, in lexicographic order.
    /// Empty when any minus-word occurs in it.
    pub fn match_document_with_policy(
        &self,
        policy: ExecutionPolicy,
        raw_query: &str,
        document_id: DocumentId,
    ) -> Result<(Vec<&str>, DocumentStatus)> {
        let status = match self.documents.get(&document_id) {
            Some(data) => data.status,
            None => return Err(SearchError::OutOfRange(document_id)),
        };
        let query = self.parse_query(raw_query)?;
        let word_freqs = self.get_word_frequencies(document_id);

        let has_minus_word = match policy {
            ExecutionPolicy::Sequential => query.minus_words.iter().any(|word| word_freqs.contains_key(*word)),
            ExecutionPolicy::Parallel => query.minus_words.par_iter().any(|word| word_freqs.contains_key(*word)),
        };
        if has_minus_word {
            return Ok((Vec::new(), status));
        }

        let matched_words: Vec<&str> = match policy {
            ExecutionPolicy::Sequential => query
                .plus_words
                .iter()
                .filter_map(|word| interned_key(word_freqs, word))
                .collect(),
            ExecutionPolicy::Parallel => query
                .plus_words
                .par_iter()
                .filter_map(|word| interned_key(word_freqs, word))
                .collect(),
        };
        Ok((matched_words, status))
    }

    fn intern(&mut self, word: &str) -> Arc<str> {
        if let Some(existing) = self.words.get(word) {
            return Arc::clone(existing);
        }
        let word: Arc<str> = Arc::from(word);
        self.words.insert(Arc::clone(&word));
        word
    }

    fn is_stop_word(&self, word: &str) -> bool { self.stop_words.contains(word) }

    /// Validate every word before dropping stop words and empty slices.
    fn split_into_words_no_stop<'t>(&self, text: &'t str) -> Result<Vec<&'t str>> {
        let mut words = Vec::new();
        for word in split_into_non_empty_words(text) {
            if !is_valid_word(word) {
                return Err(SearchError::InvalidWord(word.to_string()));
            }
            if !self.is_stop_word(word) {
                words.push(word);
            }
        }
        Ok(words)
    }

    fn parse_query_word<'q>(&self, text: &'q str) -> Result<QueryWord<'q>> {
        let (data, is_minus) = match text.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        if data.is_empty() || data.starts_with('-') || !is_valid_word(data) {
            return Err(SearchError::InvalidQuery(text.to_string()));
        }
        Ok(QueryWord { data, is_minus, is_stop: self.is_stop_word(data) })
    }

    fn parse_query<'q>(&self, text: &'q str) -> Result<Query<'q>> {
        let mut query = Query::default();
        for word in split_into_words(text) {
            let query_word = self.parse_query_word(word)?;
            if query_word.is_stop {
                continue;
            }
            if query_word.is_minus {
                query.minus_words.insert(query_word.data);
            } else {
                query.plus_words.insert(query_word.data);
            }
        }
        Ok(query)
    }

    fn compute_word_inverse_document_freq(&self, documents_with_word: usize) -> f64 {
        (self.get_document_count() as f64 / documents_with_word as f64).ln()
    }

    fn find_all_documents<P>(&self, query: &Query<'_>, predicate: &P) -> Vec<Document>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool,
    {
        let mut document_to_relevance: BTreeMap<DocumentId, f64> = BTreeMap::new();
        for &word in &query.plus_words {
            let Some(docs) = self.word_to_document_freqs.get(word) else { continue };
            let inverse_document_freq = self.compute_word_inverse_document_freq(docs.len());
            for (&document_id, &term_freq) in docs {
                let data = &self.documents[&document_id];
                if predicate(document_id, data.status, data.rating) {
                    *document_to_relevance.entry(document_id).or_insert(0.0) += term_freq * inverse_document_freq;
                }
            }
        }

        for &word in &query.minus_words {
            let Some(docs) = self.word_to_document_freqs.get(word) else { continue };
            for document_id in docs.keys() {
                document_to_relevance.remove(document_id);
            }
        }

        document_to_relevance
            .into_iter()
            .map(|(document_id, relevance)| Document::new(document_id, relevance, self.documents[&document_id].rating))
            .collect()
    }

    fn find_all_documents_par<P>(&self, query: &Query<'_>, predicate: &P) -> Vec<Document>
    where
        P: Fn(DocumentId, DocumentStatus, i32) -> bool + Sync,
    {
        let document_to_relevance_mt: ConcurrentMap<DocumentId, f64> = ConcurrentMap::new(self.bucket_count);
        query.plus_words.par_iter().for_each(|&word| {
            let Some(docs) = self.word_to_document_freqs.get(word) else { return };
            let inverse_document_freq = self.compute_word_inverse_document_freq(docs.len());
            for (&document_id, &term_freq) in docs {
                let data = &self.documents[&document_id];
                if predicate(document_id, data.status, data.rating) {
                    *document_to_relevance_mt.access(document_id) += term_freq * inverse_document_freq;
                }
            }
        });

        // Erasing from the merged map is not shard-safe any more: one lock per minus-word.
        let document_to_relevance = Mutex::new(document_to_relevance_mt.build_ordinary_map());
        query.minus_words.par_iter().for_each(|&word| {
            if let Some(docs) = self.word_to_document_freqs.get(word) {
                let mut relevance = document_to_relevance.lock();
                for document_id in docs.keys() {
                    relevance.remove(document_id);
                }
            }
        });

        document_to_relevance
            .into_inner()
            .into_par_iter()
            .map(|(document_id, relevance)| Document::new(document_id, relevance, self.documents[&document_id].rating))
            .collect()
    }
}

impl<'a> IntoIterator for &'a SearchServer {
    type Item = DocumentId;
    type IntoIter = Copied<btree_set::Iter<'a, DocumentId>>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

fn make_unique_non_empty_strings<I, S>(strings: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut non_empty = BTreeSet::new();
    for word in strings {
        let word = word.as_ref();
        if !is_valid_word(word) {
            return Err(SearchError::InvalidWord(word.to_string()));
        }
        if !word.is_empty() {
            non_empty.insert(word.to_string());
        }
    }
    Ok(non_empty)
}

fn interned_key<'a>(word_freqs: &'a WordFrequencies, word: &str) -> Option<&'a str> {
    word_freqs.get_key_value(word).map(|(key, _)| &**key)
}

/// Total order: relevance descending, rating descending, id ascending.
fn compare_by_key(lhs: &Document, rhs: &Document) -> Ordering {
    rhs.relevance
        .total_cmp(&lhs.relevance)
        .then_with(|| rhs.rating.cmp(&lhs.rating))
        .then_with(|| lhs.id.cmp(&rhs.id))
}

/// Relevance descending; near-equal relevances fall back to rating descending.
/// Not transitive, so it must never be handed to a sort.
fn compare_documents(lhs: &Document, rhs: &Document) -> Ordering {
    if (lhs.relevance - rhs.relevance).abs() < RELEVANCE_EPSILON {
        rhs.rating.cmp(&lhs.rating)
    } else {
        rhs.relevance.total_cmp(&lhs.relevance)
    }
}

/// Picks the first [`MAX_RESULT_DOCUMENT_COUNT`] documents under
/// `compare_documents` by insertion into a short list. `sorted` must be
/// ordered by `compare_by_key`, which lets the scan stop once the remaining
/// documents are an epsilon or more below everything kept.
fn select_top_documents(sorted: Vec<Document>) -> Vec<Document> {
    let mut top: Vec<Document> = Vec::with_capacity(MAX_RESULT_DOCUMENT_COUNT + 1);
    for document in sorted {
        if top.len() == MAX_RESULT_DOCUMENT_COUNT
            && top.iter().all(|kept| kept.relevance - document.relevance >= RELEVANCE_EPSILON)
        {
            break;
        }
        let position = top
            .iter()
            .position(|kept| compare_documents(&document, kept) == Ordering::Less)
            .unwrap_or(top.len());
        if position < MAX_RESULT_DOCUMENT_COUNT {
            top.insert(position, document);
            top.truncate(MAX_RESULT_DOCUMENT_COUNT);
        }
    }
    top
}
