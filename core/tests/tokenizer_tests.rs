use sift_core::tokenizer::{is_valid_word, split_into_non_empty_words, split_into_words};

#[test]
fn it_keeps_punctuation_and_case() {
    let words = split_into_words("Fluffy cat, well-groomed!");
    assert_eq!(words, vec!["Fluffy", "cat,", "well-groomed!"]);
}

#[test]
fn it_skips_empty_words_when_asked() {
    let words: Vec<&str> = split_into_non_empty_words("  big   dog ").collect();
    assert_eq!(words, vec!["big", "dog"]);
}

#[test]
fn it_accepts_non_ascii_words() {
    assert!(is_valid_word("café"));
    assert!(is_valid_word("пушистый"));
    assert!(!is_valid_word("line\nbreak"));
}
