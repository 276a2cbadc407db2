//! Token windows: decoded chunks with their token spans.

use std::ops::Range;

/// A chunk of text decoded from a contiguous range of token ids.
///
/// ## Token Offsets
///
/// `start` and `end` index the token sequence of the source text, not bytes
/// or characters. Adjacent windows overlap by the configured number of
/// tokens:
///
/// ```text
/// Tokens:   t0 t1 t2 t3 t4 t5 t6 t7
/// Window 0: [t0 .. t4)
/// Window 1:       [t2 .. t6)   <- overlap of 2 tokens (t2, t3)
/// Window 2:             [t4 .. t8)
/// ```
///
/// ```rust
/// use tokslab::TokenWindow;
///
/// let window = TokenWindow::new("hello", 4, 6, 1);
/// assert_eq!(window.token_len(), 2);
/// assert_eq!(window.span(), 4..6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWindow {
    /// The decoded text.
    pub text: String,
    /// Index of the first token (inclusive).
    pub start: usize,
    /// Index past the last token (exclusive).
    pub end: usize,
    /// Zero-based index of this window in the sequence.
    pub index: usize,
}

impl TokenWindow {
    /// Create a new window.
    #[must_use]
    pub fn new(text: impl Into<String>, start: usize, end: usize, index: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            index,
        }
    }

    /// Number of tokens covered.
    #[must_use]
    pub fn token_len(&self) -> usize {
        self.end - self.start
    }

    /// The token span of this window.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl std::fmt::Display for TokenWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TokenWindow {{ index: {}, tokens: {}..{}, len: {} }}",
            self.index,
            self.start,
            self.end,
            self.text.len()
        )
    }
}

/// Iterator over window spans for a token sequence of length `len`.
///
/// Produced by [`window_spans`].
#[derive(Debug, Clone)]
pub struct WindowSpans {
    len: usize,
    size: usize,
    step: usize,
    start: usize,
    done: bool,
}

impl Iterator for WindowSpans {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.start >= self.len {
            return None;
        }
        let start = self.start;
        let end = start.saturating_add(self.size).min(self.len);
        // Once a window reaches the end, any later start would only repeat
        // a suffix of it.
        self.done = end == self.len;
        self.start = start.saturating_add(self.step);
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.done {
            0
        } else {
            chunk_count(self.len.saturating_sub(self.start), self.size, self.step)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowSpans {}

/// Window spans over `len` tokens with `size`-token windows sharing
/// `overlap` tokens.
///
/// Returns `None` when the arithmetic cannot make progress
/// (`size == 0` or `overlap >= size`).
///
/// ```rust
/// use tokslab::window_spans;
///
/// let spans: Vec<_> = window_spans(1024, 512, 100).unwrap().collect();
/// assert_eq!(spans, vec![0..512, 412..924, 824..1024]);
///
/// let spans: Vec<_> = window_spans(25, 10, 0).unwrap().collect();
/// assert_eq!(spans, vec![0..10, 10..20, 20..25]);
///
/// assert!(window_spans(10, 5, 5).is_none());
/// ```
#[must_use]
pub fn window_spans(len: usize, size: usize, overlap: usize) -> Option<WindowSpans> {
    if size == 0 || overlap >= size {
        return None;
    }
    Some(WindowSpans {
        len,
        size,
        step: size - overlap,
        start: 0,
        done: false,
    })
}

/// Number of windows over `len` tokens: `0` for an empty sequence, otherwise
/// `ceil((len - overlap) / step)` and never less than one.
pub(crate) fn chunk_count(len: usize, size: usize, step: usize) -> usize {
    debug_assert!(step > 0 && step <= size);
    if len == 0 {
        return 0;
    }
    if len <= size {
        return 1;
    }
    1 + (len - size).div_ceil(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_windows_over_1024_tokens() {
        let spans: Vec<_> = window_spans(1024, 512, 100).unwrap().collect();
        let starts: Vec<_> = spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 412, 824]);
        assert_eq!(spans.last().unwrap().len(), 200);
    }

    #[test]
    fn test_no_overlap() {
        let sizes: Vec<_> = window_spans(25, 10, 0).unwrap().map(|s| s.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(window_spans(0, 10, 2).unwrap().count(), 0);
    }

    #[test]
    fn test_short_sequence() {
        let spans: Vec<_> = window_spans(3, 10, 2).unwrap().collect();
        assert_eq!(spans, vec![0..3]);
    }

    #[test]
    fn test_stops_at_first_window_reaching_end() {
        let spans: Vec<_> = window_spans(10, 8, 6).unwrap().collect();
        assert_eq!(spans, vec![0..8, 2..10]);

        let spans: Vec<_> = window_spans(25, 10, 2).unwrap().collect();
        assert_eq!(spans, vec![0..10, 8..18, 16..25]);
    }

    #[test]
    fn test_count_matches_closed_form() {
        for len in 1..60_usize {
            for size in 1..12_usize {
                for overlap in 0..size {
                    let step = size - overlap;
                    let expected = (len.saturating_sub(overlap)).div_ceil(step).max(1);
                    let actual = window_spans(len, size, overlap).unwrap().count();
                    assert_eq!(actual, expected, "len={len} size={size} overlap={overlap}");
                }
            }
        }
    }

    #[test]
    fn test_exact_size_hint() {
        for len in 0..40 {
            let spans = window_spans(len, 7, 3).unwrap();
            let hint = spans.len();
            assert_eq!(hint, spans.count(), "len = {len}");
        }
    }

    #[test]
    fn test_degenerate_arithmetic_rejected() {
        assert!(window_spans(10, 0, 0).is_none());
        assert!(window_spans(10, 4, 4).is_none());
        assert!(window_spans(10, 4, 9).is_none());
    }

    #[test]
    fn test_token_len() {
        let window = TokenWindow::new("abc", 3, 7, 0);
        assert_eq!(window.token_len(), 4);
        assert_eq!(
            window.to_string(),
            "TokenWindow { index: 0, tokens: 3..7, len: 3 }"
        );
    }
}
