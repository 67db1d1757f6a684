//! Estimates how long a post takes to read from the word count of its body.

use serde::Serialize;
use std::fmt;

/// The assumed reading speed when none is configured.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// A reading-time estimate. `text` is the presentational form (e.g.
/// `3 min read`); `minutes` is the number it is derived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadingTime {
    pub text: String,
    pub minutes: u64,
    pub words: u64,
}

impl ReadingTime {
    /// Estimates the reading time of `body` at `words_per_minute`. A speed of
    /// zero is treated as one word per minute.
    pub fn estimate(body: &str, words_per_minute: u32) -> ReadingTime {
        let words = count_words(body);
        let minutes = minutes(words, u64::from(words_per_minute.max(1)));
        ReadingTime {
            text: format!("{} min read", minutes),
            minutes,
            words,
        }
    }
}

impl fmt::Display for ReadingTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Counts whitespace-separated words. Each CJK ideograph, kana or hangul
/// syllable counts as a word on its own since those scripts don't separate
/// words with spaces.
pub fn count_words(text: &str) -> u64 {
    let mut words = 0;
    let mut in_word = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_word = false;
        } else if is_cjk(c) {
            words += 1;
            in_word = false;
        } else if !in_word {
            words += 1;
            in_word = true;
        }
    }
    words
}

// Any partial minute counts as a whole one.
fn minutes(words: u64, words_per_minute: u64) -> u64 {
    (words + words_per_minute - 1) / words_per_minute
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'     // hiragana, katakana
        | '\u{3400}'..='\u{4dbf}'   // CJK extension A
        | '\u{4e00}'..='\u{9fff}'   // CJK unified ideographs
        | '\u{ac00}'..='\u{d7af}'   // hangul syllables
        | '\u{f900}'..='\u{faff}'   // CJK compatibility ideographs
    )
}
