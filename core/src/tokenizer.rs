//! Word splitting and validation shared by document indexing and query parsing.

/// Split text on single spaces. Consecutive spaces produce empty slices and an
/// empty input yields one empty slice; callers decide what an empty word means.
pub fn split_into_words(text: &str) -> Vec<&str> {
    text.split(' ').collect()
}

/// Like [`split_into_words`] but without the empty slices.
pub fn split_into_non_empty_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|word| !word.is_empty())
}

/// A word is valid when it holds no ASCII control characters (below 0x20).
pub fn is_valid_word(word: &str) -> bool {
    !word.bytes().any(|b| b < b' ')
}
