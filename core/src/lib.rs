pub mod concurrent_map;
pub mod document;
pub mod error;
pub mod request_queue;
pub mod search_server;
pub mod tokenizer;
pub mod wrappers;

pub use concurrent_map::{ConcurrentMap, DEFAULT_BUCKET_COUNT};
pub use document::{Document, DocumentId, DocumentStatus};
pub use error::{Result, SearchError};
pub use request_queue::{RequestQueue, REQUEST_WINDOW};
pub use search_server::{ExecutionPolicy, SearchServer, WordFrequencies, MAX_RESULT_DOCUMENT_COUNT, RELEVANCE_EPSILON};
