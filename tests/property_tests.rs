//! Property-based tests for token-window splitting.
//!
//! These tests verify the window arithmetic with a tokenizer that maps each
//! `char` to one token, so token counts can be checked exactly:
//! - Count: `ceil((N - overlap) / (size - overlap))` chunks, 0 for N = 0
//! - Bounds: every chunk re-encodes to at most `size` tokens
//! - Overlap: full adjacent chunks share exactly `overlap` tokens
//! - Coverage: the last chunk ends at token N

use std::sync::Arc;

use proptest::prelude::*;
use tokslab::{
    split_documents, ChunkConfig, Error, ErrorKind, Result, SpecialTokens, TextSplitter, TextUnit,
    TokenSplitter, Tokenizer,
};

// =============================================================================
// Test Tokenizer
// =============================================================================

/// One token per `char`; encode/decode round-trip for any text.
struct Chars;

impl Tokenizer for Chars {
    fn encode(&self, text: &str, _: &SpecialTokens, _: &SpecialTokens) -> Result<Vec<u32>> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        ids.iter()
            .map(|&id| char::from_u32(id).ok_or_else(|| Error::Tokenizer(format!("bad id {id}"))))
            .collect()
    }
}

fn splitter(size: usize, overlap: usize) -> TokenSplitter {
    TokenSplitter::with_tokenizer(ChunkConfig::new(size, overlap), Arc::new(Chars)).unwrap()
}

fn token_len(text: &str) -> usize {
    text.chars().count()
}

// =============================================================================
// Generators
// =============================================================================

/// Text of 0..300 chars, mixing ASCII and multi-byte characters.
fn arbitrary_text() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z 日本語é.]{0,300}").unwrap()
}

/// A valid (size, overlap) pair.
fn window_config() -> impl Strategy<Value = (usize, usize)> {
    (1usize..64).prop_flat_map(|size| (Just(size), 0..size))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn chunk_count_matches_formula(text in arbitrary_text(), (size, overlap) in window_config()) {
        let chunks = splitter(size, overlap).split_text(&text).unwrap();
        let n = token_len(&text);
        let expected = if n == 0 {
            0
        } else {
            n.saturating_sub(overlap).div_ceil(size - overlap).max(1)
        };
        prop_assert_eq!(chunks.len(), expected);
    }

    #[test]
    fn chunks_fit_in_size(text in arbitrary_text(), (size, overlap) in window_config()) {
        for chunk in splitter(size, overlap).split_text(&text).unwrap() {
            prop_assert!(token_len(&chunk) <= size);
            prop_assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn full_neighbours_share_overlap(text in arbitrary_text(), (size, overlap) in window_config()) {
        let windows = splitter(size, overlap).split_windows(&text).unwrap();
        for pair in windows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert_eq!(b.start, a.start + size - overlap);
            if a.token_len() == size {
                let tail: String = a.text.chars().skip(size - overlap).collect();
                let head: String = b.text.chars().take(overlap).collect();
                prop_assert_eq!(tail, head);
            }
        }
    }

    #[test]
    fn last_chunk_reaches_end(text in arbitrary_text(), (size, overlap) in window_config()) {
        let windows = splitter(size, overlap).split_windows(&text).unwrap();
        let n = token_len(&text);
        match windows.last() {
            Some(last) => {
                prop_assert_eq!(last.end, n);
                prop_assert!(text.ends_with(&last.text));
            }
            None => prop_assert_eq!(n, 0),
        }
    }

    #[test]
    fn zero_overlap_reassembles(text in arbitrary_text(), size in 1usize..64) {
        let chunks = splitter(size, 0).split_text(&text).unwrap();
        prop_assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn overlap_not_below_size_rejected(size in 1usize..64, extra in 0usize..8) {
        let err = TokenSplitter::with_tokenizer(ChunkConfig::new(size, size + extra), Arc::new(Chars))
            .unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

// =============================================================================
// Worked Examples
// =============================================================================

#[test]
fn offsets_for_1024_tokens() {
    let text = "x".repeat(1024);
    let windows = splitter(512, 100).split_windows(&text).unwrap();

    let starts: Vec<_> = windows.iter().map(|w| w.start).collect();
    assert_eq!(starts, vec![0, 412, 824]);
    assert_eq!(windows[2].span(), 824..1024);
    assert_eq!(windows[2].token_len(), 200);
}

#[test]
fn sizes_for_25_tokens_without_overlap() {
    let text: String = ('a'..='y').collect();
    let chunks = splitter(10, 0).split_text(&text).unwrap();

    let sizes: Vec<_> = chunks.iter().map(|c| token_len(c)).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(chunks[0], "abcdefghij");
    assert_eq!(chunks[1], "klmnopqrst");
    assert_eq!(chunks[2], "uvwxy");
}

#[test]
fn empty_input_produces_empty_output() {
    assert!(splitter(10, 3).split_text("").unwrap().is_empty());
}

#[test]
fn splitting_is_deterministic() {
    let text = "The quick brown fox jumps over the lazy dog. Pack my box.";
    let s = splitter(12, 4);
    assert_eq!(s.split_text(text).unwrap(), s.split_text(text).unwrap());
}

#[test]
fn batch_preserves_order_and_metadata() {
    let units: Vec<_> = (1..=3_i64)
        .map(|page| {
            TextUnit::new("x".repeat(page as usize * 7))
                .with_metadata("page", page)
                .with_metadata("total_pages", 3_i64)
        })
        .collect();

    let out = split_documents(&splitter(5, 1), &units).unwrap();

    // 7, 14, 21 tokens at step 4 -> 2, 4, 5 chunks.
    let pages: Vec<_> = out
        .iter()
        .map(|u| u.metadata.get("page").and_then(|v| v.as_int()).unwrap())
        .collect();
    assert_eq!(pages, [vec![1; 2], vec![2; 4], vec![3; 5]].concat());
    assert!(out.iter().all(|u| u.metadata.len() == 2));
}
