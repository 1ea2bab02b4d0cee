use crate::document::DocumentId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Negative id, or an id that is already live.
    #[error("invalid document id {0}")]
    InvalidDocumentId(DocumentId),

    /// Word containing a control character (document text or stop words).
    #[error("invalid word {0:?}: contains control characters")]
    InvalidWord(String),

    /// Malformed query token: empty, lone '-', "--word" or control characters.
    #[error("invalid query word {0:?}")]
    InvalidQuery(String),

    #[error("document {0} is not in the index")]
    OutOfRange(DocumentId),
}

impl SearchError {
    /// Everything except an unknown document id is a bad argument.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, SearchError::OutOfRange(_))
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
