// src/overlap.rs

/// Strategy for carrying trailing context from one piece into the next.
///
/// The carried tail never starts mid-word when a word boundary exists inside
/// the budget, and the joiner placed between tail and body counts against the
/// budget, so an overlapped piece is at most `body + overlap_chars` long.
#[derive(Debug, Clone, Copy)]
pub struct OverlapStrategy {
    overlap_chars: usize,
    joiner: &'static str,
}

impl OverlapStrategy {
    pub fn new(overlap_chars: usize, joiner: &'static str) -> Self {
        Self {
            overlap_chars,
            joiner,
        }
    }

    /// Overlap between parent pieces, joined with a blank line.
    pub fn for_parents(overlap_chars: usize) -> Self {
        Self::new(overlap_chars, "\n\n")
    }

    /// Overlap between child pieces, joined with a space.
    pub fn for_children(overlap_chars: usize) -> Self {
        Self::new(overlap_chars, " ")
    }

    /// Prepend the tail of `previous` to `body`.
    ///
    /// Returns the composed text and the number of characters it has in front
    /// of `body`; zero when nothing was carried.
    pub fn prepend(&self, previous: &str, body: &str) -> (String, usize) {
        let tail = self.tail(previous);
        if tail.is_empty() {
            return (body.to_string(), 0);
        }
        let prefix_chars = tail.chars().count() + self.joiner.chars().count();
        (format!("{tail}{}{body}", self.joiner), prefix_chars)
    }

    /// Trailing context of `text` that fits the budget.
    pub fn tail<'a>(&self, text: &'a str) -> &'a str {
        let budget = self.overlap_chars.saturating_sub(self.joiner.chars().count());
        let text = text.trim_end();
        if budget == 0 || text.is_empty() {
            return "";
        }

        let total = text.chars().count();
        if total <= budget {
            return text.trim_start();
        }

        let start = byte_offset(text, total - budget);
        let candidate = &text[start..];

        let cut_mid_word = text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_whitespace());
        if !cut_mid_word {
            return candidate.trim_start();
        }

        // Skip the partial word when a later boundary exists.
        match candidate.find(char::is_whitespace) {
            Some(boundary) => candidate[boundary..].trim_start(),
            None => candidate,
        }
    }
}

/// Byte offset after the first `chars` characters of `text`.
pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}
