//! Normalized edit-distance scoring.
//!
//! The collection store registers a [`Similarity`] implementation as the SQL
//! function `levenshtein(a, b)`, so fuzzy filters run per-row inside the
//! database instead of pulling whole tables into memory.

use std::panic::RefUnwindSafe;

/// A string similarity scorer.
///
/// Scores are in `[0.0, 1.0]`: identical inputs score `1.0`, completely
/// dissimilar inputs trend toward `0.0`. Inputs are expected to already be
/// normalized (see [`crate::normalize_name`]).
///
/// The `Send + Sync + RefUnwindSafe` bounds are what SQLite scalar function
/// registration requires of anything captured by the callback.
pub trait Similarity: Send + Sync + RefUnwindSafe + 'static {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Levenshtein distance scaled by the longer input's length.
///
/// `score = (max_len - distance) / max_len`, counted in chars. Two empty
/// strings score `1.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        let max_len = a.chars().count().max(b.chars().count());
        if max_len == 0 {
            return 1.0;
        }
        let distance = levenshtein_distance(a, b);
        (max_len - distance) as f64 / max_len as f64
    }
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync + RefUnwindSafe + 'static,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Calculate the Levenshtein (edit) distance between two strings.
///
/// Returns the minimum number of single-character insertions, deletions or
/// substitutions required to turn `a` into `b`.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();

    if a_chars.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a_chars.len();
    }

    // Two rows instead of the full matrix
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

#[cfg(test)]
#[path = "tests/similarity_tests.rs"]
mod tests;
