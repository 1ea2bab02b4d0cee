use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type DocumentId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Actual,
    Irrelevant,
    Banned,
    Removed,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentStatus::Actual => "actual",
            DocumentStatus::Irrelevant => "irrelevant",
            DocumentStatus::Banned => "banned",
            DocumentStatus::Removed => "removed",
        };
        f.write_str(name)
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "actual" => Ok(DocumentStatus::Actual),
            "irrelevant" => Ok(DocumentStatus::Irrelevant),
            "banned" => Ok(DocumentStatus::Banned),
            "removed" => Ok(DocumentStatus::Removed),
            other => Err(format!("unknown document status '{other}'")),
        }
    }
}

/// One ranked hit returned by a top-documents query.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub relevance: f64,
    pub rating: i32,
}

impl Document {
    pub fn new(id: DocumentId, relevance: f64, rating: i32) -> Self {
        Self { id, relevance, rating }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ document_id = {}, relevance = {}, rating = {} }}",
            self.id, self.relevance, self.rating
        )
    }
}

/// Per-document metadata kept next to the indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentData {
    pub rating: i32,
    pub status: DocumentStatus,
}

/// Truncating integer mean. An empty slice rates 0.
pub fn compute_average_rating(ratings: &[i32]) -> i32 {
    if ratings.is_empty() {
        return 0;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    (sum / ratings.len() as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rating_truncates_toward_zero() {
        assert_eq!(compute_average_rating(&[7, 2, 7]), 5);
        assert_eq!(compute_average_rating(&[-7, -2]), -4);
        assert_eq!(compute_average_rating(&[1, 2]), 1);
    }

    #[test]
    fn average_rating_of_nothing_is_zero() {
        assert_eq!(compute_average_rating(&[]), 0);
    }

    #[test]
    fn average_rating_does_not_overflow() {
        assert_eq!(compute_average_rating(&[i32::MAX, i32::MAX]), i32::MAX);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("BANNED".parse::<DocumentStatus>().unwrap(), DocumentStatus::Banned);
        assert_eq!("actual".parse::<DocumentStatus>().unwrap(), DocumentStatus::Actual);
        assert!("deleted".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn document_display() {
        let doc = Document::new(3, 0.5, 7);
        assert_eq!(doc.to_string(), "{ document_id = 3, relevance = 0.5, rating = 7 }");
    }
}
