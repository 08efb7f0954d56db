//! Recursive separator-based chunking with bounded overlap.
//!
//! Text is first cut into pieces no longer than the chunk size, trying each
//! separator from coarsest to finest and falling back to single characters.
//! Separators stay attached to the end of the piece they close, so pieces tile
//! the document exactly. Pieces are then merged greedily into chunks; when a
//! chunk is full, the next one restarts from as many trailing pieces of the
//! previous chunk as fit inside the overlap budget.

use crate::error::ConfigError;
use crate::models::{Chunk, ChunkingConfig, Document};

/// Splits documents into overlapping chunks of at most `chunk_size` characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a chunker, rejecting `overlap >= chunk_size` and empty separator lists.
    pub fn new(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            chunk_size: config.chunk_size as usize,
            overlap: config.chunk_overlap as usize,
            separators: config.separators.clone(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily iterate over the document's chunks. Each call starts over.
    pub fn chunks<'a>(&self, document: &'a Document) -> Chunks<'a> {
        let mut pieces = Vec::new();
        self.split_pieces(&document.content, 0, &self.separators, &mut pieces);
        Chunks {
            document,
            pieces,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            window_start: 0,
            next_piece: 0,
            window_chars: 0,
            fresh: false,
            emitted: 0,
        }
    }

    /// Chunk a document eagerly.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.chunks(document).collect()
    }

    fn split_pieces(&self, text: &str, base: usize, separators: &[String], out: &mut Vec<Piece>) {
        if text.is_empty() {
            return;
        }

        let chars = text.chars().count();
        if chars <= self.chunk_size {
            out.push(Piece {
                start: base,
                end: base + text.len(),
                chars,
            });
            return;
        }

        let mut remaining = separators;
        let mut separator = None;
        while let Some((first, rest)) = remaining.split_first() {
            remaining = rest;
            if first.is_empty() || text.contains(first.as_str()) {
                separator = Some(first.as_str());
                break;
            }
        }

        match separator {
            Some(sep) if !sep.is_empty() => {
                let mut offset = 0;
                for part in text.split_inclusive(sep) {
                    self.split_pieces(part, base + offset, remaining, out);
                    offset += part.len();
                }
            }
            // Character level: the empty separator, or nothing else matched.
            _ => {
                for (i, c) in text.char_indices() {
                    out.push(Piece {
                        start: base + i,
                        end: base + i + c.len_utf8(),
                        chars: 1,
                    });
                }
            }
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size as usize,
            overlap: config.chunk_overlap as usize,
            separators: config.separators,
        }
    }
}

/// A byte range of the document that is never cut further.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

/// Iterator returned by [`TextChunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    document: &'a Document,
    pieces: Vec<Piece>,
    chunk_size: usize,
    overlap: usize,
    /// The pending chunk is `pieces[window_start..next_piece]`.
    window_start: usize,
    next_piece: usize,
    window_chars: usize,
    /// Whether the window holds a piece no emitted chunk has covered yet.
    fresh: bool,
    emitted: u32,
}

impl Chunks<'_> {
    fn emit(&mut self) -> Chunk {
        let start = self.pieces[self.window_start].start;
        let end = self.pieces[self.next_piece - 1].end;
        let chunk = Chunk::from_document(self.document, self.emitted, start, end);
        self.emitted += 1;
        self.fresh = false;
        chunk
    }

    /// Drop leading pieces until the window fits the overlap budget and
    /// leaves room for `incoming` more characters.
    fn shrink_for(&mut self, incoming: usize) {
        while self.window_start < self.next_piece
            && (self.window_chars > self.overlap
                || self.window_chars + incoming > self.chunk_size)
        {
            self.window_chars -= self.pieces[self.window_start].chars;
            self.window_start += 1;
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        while let Some(piece) = self.pieces.get(self.next_piece).copied() {
            let window_open = self.window_start < self.next_piece;
            if window_open && self.window_chars + piece.chars > self.chunk_size {
                let ready = if self.fresh { Some(self.emit()) } else { None };
                self.shrink_for(piece.chars);
                if ready.is_some() {
                    return ready;
                }
                continue;
            }

            self.window_chars += piece.chars;
            self.next_piece += 1;
            self.fresh = true;
        }

        if self.fresh { Some(self.emit()) } else { None }
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
