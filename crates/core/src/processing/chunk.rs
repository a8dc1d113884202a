//! Splitting extracted text into embedding-sized chunks.

use unicode_segmentation::UnicodeSegmentation;

use super::error::ProcessingError;

/// Splits text into bounded-size segments.
pub trait Chunker: Send + Sync {
    /// Chunk `text`, in document order.
    fn chunk(&self, text: &str) -> Result<Vec<String>, ProcessingError>;
}

/// Packs whole sentences into chunks of at most `max_chars` characters.
///
/// The last `overlap_sentences` sentences of a chunk are repeated at the
/// start of the next one when they fit. Sentences longer than `max_chars`
/// are split, preferring whitespace.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    max_chars: usize,
    overlap_sentences: usize,
}

impl SentenceChunker {
    /// Default chunk size in characters.
    pub const DEFAULT_MAX_CHARS: usize = 1000;

    /// Create a chunker. `max_chars` is clamped to at least 1.
    #[must_use]
    pub fn new(max_chars: usize, overlap_sentences: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            overlap_sentences,
        }
    }

    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut out = Vec::new();
        for sentence in text.split_sentence_bounds() {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            if sentence.chars().count() <= self.max_chars {
                out.push(sentence);
            } else {
                out.extend(split_long(sentence, self.max_chars));
            }
        }
        out
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_CHARS, 1)
    }
}

/// Split an overlong sentence into pieces of at most `max_chars` characters.
fn split_long(sentence: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = sentence;
    while rest.chars().count() > max_chars {
        // Byte offset just past the `max_chars`-th character.
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let window = &rest[..limit];
        let cut = match window.rfind(char::is_whitespace) {
            Some(i) if i > 0 => i,
            _ => limit,
        };
        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

fn joined_len(parts: &[&str]) -> usize {
    let chars: usize = parts.iter().map(|p| p.chars().count()).sum();
    chars + parts.len().saturating_sub(1)
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Result<Vec<String>, ProcessingError> {
        let sentences = self.sentences(text);
        if sentences.is_empty() {
            return Err(ProcessingError::EmptyDocument);
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for sentence in sentences {
            let sentence_len = sentence.chars().count();
            if !current.is_empty() && joined_len(&current) + 1 + sentence_len > self.max_chars {
                chunks.push(current.join(" "));

                let keep = self.overlap_sentences.min(current.len());
                let mut carried = current.split_off(current.len() - keep);
                while !carried.is_empty() && joined_len(&carried) + 1 + sentence_len > self.max_chars
                {
                    carried.remove(0);
                }
                current = carried;
            }
            current.push(sentence);
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        Ok(chunks)
    }
}
