// src/segmentation/unicode.rs

use unicode_segmentation::UnicodeSegmentation;

pub struct SentenceSegmenter;

impl SentenceSegmenter {
    /// UAX#29 sentence pieces of `text` (works for all languages).
    ///
    /// Trailing whitespace stays attached to each piece, so the pieces
    /// concatenate back to `text`.
    pub fn split_bounds(text: &str) -> Vec<&str> {
        text.split_sentence_bounds().collect()
    }
}
