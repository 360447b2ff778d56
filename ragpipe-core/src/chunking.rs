//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] - sliding character window with exact overlap and an
//!   optional whitespace lookback
//! - [`RecursiveChunker`] - splits hierarchically by paragraphs, sentences, then words
//!
//! Sizes, offsets and overlaps are counted in characters, so a chunk boundary
//! never falls inside a UTF-8 code point.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks, in document order.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Selects which [`Chunker`] the service builds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// [`FixedSizeChunker`] with hard cuts.
    #[default]
    Fixed,
    /// [`RecursiveChunker`].
    Recursive,
}

impl ChunkingStrategy {
    /// Build the chunker for this strategy using the sizes in `config`.
    pub fn build(self, config: &RagConfig) -> Result<Arc<dyn Chunker>> {
        Ok(match self {
            Self::Fixed => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
            Self::Recursive => {
                Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?)
            }
        })
    }
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "recursive" => Ok(Self::Recursive),
            other => Err(RagError::Config(format!("unknown chunking strategy '{other}'"))),
        }
    }
}

fn check_window(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::Chunking("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::Chunking(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

fn chunks_from_ranges(document: &Document, chars: &[char], ranges: Vec<Range<usize>>) -> Vec<Chunk> {
    ranges
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let text: String = chars[range.clone()].iter().collect();
            Chunk::from_document(document, i, range.start, text)
        })
        .collect()
}

/// Splits text into fixed-size windows with an exact overlap.
///
/// Windows advance by `chunk_size - chunk_overlap` characters and stop as soon
/// as one reaches the end of the text, so a document of `N > chunk_size`
/// characters yields `ceil((N - overlap) / (chunk_size - overlap))` chunks.
///
/// By default the cut is hard and may split a word. With
/// [`with_boundary_lookback`](Self::with_boundary_lookback) a window may end up
/// to `n` characters early, just after whitespace. The overlap stays exact; only
/// chunk lengths and the chunk count change.
///
/// # Example
///
/// ```rust
/// use ragpipe_core::{Chunker, Document, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(10, 2).unwrap();
/// let chunks = chunker.chunk(&Document::new("doc", "abcdefghijklmnop"));
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[1].text, "ijklmnop");
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    boundary_lookback: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Chunking`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        check_window(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap, boundary_lookback: 0 })
    }

    /// Allow each cut to move back up to `lookback` characters to a whitespace boundary.
    pub fn with_boundary_lookback(mut self, lookback: usize) -> Self {
        self.boundary_lookback = lookback;
        self
    }

    fn windows(&self, chars: &[char]) -> Vec<Range<usize>> {
        let total = chars.len();
        let mut ranges = Vec::new();
        let mut start = 0;

        while start < total {
            let mut end = (start + self.chunk_size).min(total);
            if end < total && self.boundary_lookback > 0 {
                end = snap_to_whitespace(chars, start + self.chunk_overlap, end, self.boundary_lookback);
            }
            ranges.push(start..end);
            if end >= total {
                break;
            }
            start = end - self.chunk_overlap;
        }

        ranges
    }
}

/// Move `end` back to just after a whitespace character, looking at most
/// `lookback` characters back and never to or below `floor`.
fn snap_to_whitespace(chars: &[char], floor: usize, end: usize, lookback: usize) -> usize {
    if chars[end].is_whitespace() {
        return end;
    }
    let lowest = end.saturating_sub(lookback).max(floor + 1);
    (lowest..end).rev().find(|&p| chars[p - 1].is_whitespace()).unwrap_or(end)
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = document.text.chars().collect();
        let ranges = self.windows(&chars);
        chunks_from_ranges(document, &chars, ranges)
    }
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// Segments at one level are merged while they fit in `chunk_size`. A segment
/// that is still too long is split at the next level, and text with no usable
/// separator falls back to fixed windows. Each new chunk starts with up to
/// `chunk_overlap` characters of the preceding text, beginning at a word start,
/// when that still fits.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

/// Separator levels, coarsest first.
const SEPARATOR_LEVELS: &[&[&str]] = &[&["\n\n"], &[". ", "! ", "? "], &[" "]];

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Chunking`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        check_window(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    fn split(&self, chars: &[char], range: Range<usize>, levels: &[&[&str]]) -> Vec<Range<usize>> {
        if range.len() <= self.chunk_size {
            return vec![range];
        }
        let Some((separators, remaining)) = levels.split_first() else {
            return self.fixed_windows(range);
        };

        let segments = split_keeping_separators(chars, range.clone(), separators);
        if segments.len() <= 1 {
            return self.split(chars, range, remaining);
        }

        let mut out = Vec::new();
        let mut current: Option<Range<usize>> = None;

        for segment in segments {
            current = Some(match current.take() {
                None => segment,
                Some(cur) if segment.end - cur.start <= self.chunk_size => cur.start..segment.end,
                Some(cur) => {
                    let floor = cur.start + 1;
                    out.extend(self.split(chars, cur, remaining));
                    let start = overlap_start(chars, floor, segment.start, self.chunk_overlap);
                    if segment.end - start <= self.chunk_size { start..segment.end } else { segment }
                }
            });
        }

        if let Some(cur) = current {
            out.extend(self.split(chars, cur, remaining));
        }
        out
    }

    fn fixed_windows(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = range.start;
        loop {
            let end = (start + self.chunk_size).min(range.end);
            ranges.push(start..end);
            if end >= range.end {
                break;
            }
            start = end - self.chunk_overlap;
        }
        ranges
    }
}

/// Split `range` after every occurrence of any separator, keeping the
/// separator attached to the preceding segment.
fn split_keeping_separators(
    chars: &[char],
    range: Range<usize>,
    separators: &[&str],
) -> Vec<Range<usize>> {
    let patterns: Vec<Vec<char>> = separators.iter().map(|s| s.chars().collect()).collect();
    let mut segments = Vec::new();
    let mut start = range.start;
    let mut i = range.start;

    while i < range.end {
        let hit = patterns
            .iter()
            .find(|p| i + p.len() <= range.end && chars[i..i + p.len()] == p[..]);
        match hit {
            Some(p) => {
                i += p.len();
                segments.push(start..i);
                start = i;
            }
            None => i += 1,
        }
    }

    if start < range.end {
        segments.push(start..range.end);
    }
    segments
}

/// Start of the overlap carried into a chunk beginning at `segment_start`.
///
/// Looks back at most `overlap` characters (never below `floor`) and moves
/// forward to the first word start so the overlap does not begin mid-word.
fn overlap_start(chars: &[char], floor: usize, segment_start: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return segment_start;
    }
    let candidate = segment_start.saturating_sub(overlap).max(floor).min(segment_start);
    if candidate == 0 || chars[candidate - 1].is_whitespace() {
        return candidate;
    }
    (candidate..segment_start)
        .find(|&p| chars[p].is_whitespace())
        .map_or(segment_start, |p| p + 1)
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = document.text.chars().collect();
        let ranges = self.split(&chars, 0..chars.len(), SEPARATOR_LEVELS);
        chunks_from_ranges(document, &chars, ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("doc", text)
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(FixedSizeChunker::new(10, 2).unwrap().chunk(&doc("")).is_empty());
        assert!(RecursiveChunker::new(10, 2).unwrap().chunk(&doc("")).is_empty());
    }

    #[test]
    fn rejects_invalid_windows() {
        assert!(FixedSizeChunker::new(0, 0).is_err());
        assert!(FixedSizeChunker::new(5, 5).is_err());
        assert!(RecursiveChunker::new(5, 7).is_err());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = FixedSizeChunker::new(100, 10).unwrap().chunk(&doc("hello world"));
        assert_eq!(texts(&chunks), vec!["hello world"]);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].id, "doc_0");
    }

    #[test]
    fn hard_cut_windows_overlap_exactly() {
        let chunks = FixedSizeChunker::new(5, 2).unwrap().chunk(&doc("abcdefghijkl"));
        assert_eq!(texts(&chunks), vec!["abcde", "defgh", "ghijk", "jkl"]);
        assert_eq!(chunks.iter().map(|c| c.offset).collect::<Vec<_>>(), vec![0, 3, 6, 9]);
    }

    #[test]
    fn tail_is_not_emitted_twice() {
        // The third window already reaches the end; no trailing "j" chunk.
        let chunks = FixedSizeChunker::new(4, 1).unwrap().chunk(&doc("abcdefghij"));
        assert_eq!(texts(&chunks), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = FixedSizeChunker::new(3, 1).unwrap().chunk(&doc("héllo wörld"));
        for chunk in &chunks {
            assert!(chunk.char_len() <= 3);
        }
        assert_eq!(chunks[0].text, "hél");
    }

    #[test]
    fn lookback_moves_cut_to_whitespace() {
        let chunker = FixedSizeChunker::new(12, 0).unwrap().with_boundary_lookback(6);
        let chunks = chunker.chunk(&doc("alpha beta gamma delta"));
        assert_eq!(chunks[0].text, "alpha beta ");
        assert_eq!(chunks[1].offset, 11);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, "alpha beta gamma delta");
    }

    #[test]
    fn lookback_falls_back_to_hard_cut() {
        let chunker = FixedSizeChunker::new(4, 0).unwrap().with_boundary_lookback(2);
        let chunks = chunker.chunk(&doc("abcdefgh"));
        assert_eq!(texts(&chunks), vec!["abcd", "efgh"]);
    }

    #[test]
    fn chunks_inherit_document_metadata() {
        let mut document = doc("some text that is long enough");
        document.metadata.insert("source".into(), "unit".into());
        let chunks = FixedSizeChunker::new(10, 0).unwrap().chunk(&document);
        assert!(chunks.iter().all(|c| c.metadata.get("source").map(String::as_str) == Some("unit")));
        assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i && c.document_id == "doc"));
    }

    #[test]
    fn recursive_prefers_paragraphs() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = RecursiveChunker::new(25, 0).unwrap().chunk(&doc(text));
        assert_eq!(texts(&chunks), vec!["First paragraph here.\n\n", "Second paragraph here."]);
    }

    #[test]
    fn recursive_falls_back_to_sentences_and_words() {
        let text = "One two three. Four five six. Seven eight nine ten eleven twelve.";
        let chunks = RecursiveChunker::new(20, 0).unwrap().chunk(&doc(text));
        assert!(chunks.iter().all(|c| c.char_len() <= 20));
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
        assert_eq!(chunks[0].text, "One two three. ");
    }

    #[test]
    fn recursive_overlap_starts_at_word() {
        let text = "aaaa bbbb cccc dddd eeee ffff";
        let chunks = RecursiveChunker::new(10, 5).unwrap().chunk(&doc(text));
        assert!(chunks.iter().all(|c| c.char_len() <= 10));
        for pair in chunks.windows(2) {
            assert!(pair[1].offset <= pair[0].offset + pair[0].char_len());
            assert!(pair[1].offset == 0 || text.as_bytes()[pair[1].offset - 1] == b' ');
        }
    }

    #[test]
    fn recursive_handles_unbroken_text() {
        let text = "x".repeat(25);
        let chunks = RecursiveChunker::new(10, 2).unwrap().chunk(&doc(&text));
        assert_eq!(chunks.iter().map(|c| c.offset).collect::<Vec<_>>(), vec![0, 8, 16]);
    }

    #[test]
    fn strategy_parses_and_builds() {
        let config = RagConfig::default();
        assert_eq!("Recursive".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::Recursive);
        assert!("sliding".parse::<ChunkingStrategy>().is_err());
        let chunker = ChunkingStrategy::Fixed.build(&config).unwrap();
        assert_eq!(chunker.chunk(&doc(&"z".repeat(900))).len(), 2);
    }
}
