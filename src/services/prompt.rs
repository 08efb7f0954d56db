//! Prompt assembly from ranked chunks.

use crate::models::ScoredChunk;

pub const DEFAULT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end.\n\
If the context does not contain the answer, say that you don't know instead of making one up.\n\
Keep the answer as short as possible.";

pub const DEFAULT_DELIMITER: &str = "-----";

/// Renders the instruction preamble, the chunk texts and the question into a
/// single prompt.
///
/// Output depends only on the inputs. Chunks are copied verbatim in ranked
/// order; the only truncation is the optional character budget, which drops
/// whole chunks that no longer fit.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    preamble: String,
    delimiter: String,
    max_context_chars: Option<usize>,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            max_context_chars: None,
        }
    }
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_max_context_chars(mut self, max: Option<usize>) -> Self {
        self.max_context_chars = max;
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The chunks that make it into the prompt.
    pub fn select<'a>(&self, chunks: &'a [ScoredChunk]) -> &'a [ScoredChunk] {
        let Some(budget) = self.max_context_chars else {
            return chunks;
        };

        let mut used = 0;
        let mut taken = 0;
        for scored in chunks {
            let len = scored.chunk.char_len();
            if used + len > budget {
                break;
            }
            used += len;
            taken += 1;
        }
        &chunks[..taken]
    }

    pub fn assemble(&self, question: &str, chunks: &[ScoredChunk]) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.preamble);
        prompt.push_str("\n\n");

        for scored in self.select(chunks) {
            prompt.push_str(&self.delimiter);
            prompt.push('\n');
            prompt.push_str(&scored.chunk.content);
            prompt.push('\n');
        }
        prompt.push_str(&self.delimiter);
        prompt.push_str("\n\n");

        prompt.push_str("Question: ");
        prompt.push_str(question);
        prompt.push_str("\nHelpful Answer:");
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn scored(index: u32, content: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: Chunk::generate_id("doc", index),
                document_id: "doc".to_string(),
                source: "doc.txt".to_string(),
                chunk_index: index,
                start_offset: 0,
                end_offset: content.len() as u64,
                content: content.to_string(),
            },
            score,
        }
    }

    #[test]
    fn test_prompt_layout() {
        let chunks = vec![scored(0, "The sky is blue. ", 0.9), scored(1, "The grass is green.", 0.1)];
        let prompt = ContextAssembler::new().assemble("What color is the sky?", &chunks);

        assert!(prompt.starts_with(DEFAULT_PREAMBLE));
        let sky = prompt.find("The sky is blue. ").unwrap();
        let grass = prompt.find("The grass is green.").unwrap();
        let question = prompt.find("Question: What color is the sky?").unwrap();
        assert!(sky < grass && grass < question);
        assert_eq!(prompt.matches(DEFAULT_DELIMITER).count(), 3);
        assert!(prompt.ends_with("Helpful Answer:"));
    }

    #[test]
    fn test_deterministic() {
        let chunks = vec![scored(0, "a", 1.0), scored(1, "b", 0.5)];
        let assembler = ContextAssembler::new();
        assert_eq!(assembler.assemble("q", &chunks), assembler.assemble("q", &chunks));
    }

    #[test]
    fn test_no_chunks_still_asks_question() {
        let prompt = ContextAssembler::new().assemble("anything?", &[]);
        assert!(prompt.contains("Question: anything?"));
        assert_eq!(prompt.matches(DEFAULT_DELIMITER).count(), 1);
    }

    #[test]
    fn test_budget_keeps_whole_chunks_in_rank_order() {
        let chunks = vec![
            scored(0, "0123456789", 0.9),
            scored(1, "abcdefghij", 0.8),
            scored(2, "xyz", 0.7),
        ];
        let assembler = ContextAssembler::new().with_max_context_chars(Some(15));
        let selected = assembler.select(&chunks);
        assert_eq!(selected.len(), 1);

        let prompt = assembler.assemble("q", &chunks);
        assert!(prompt.contains("0123456789"));
        assert!(!prompt.contains("abcdefghij"));
        // Stops at the first chunk that does not fit, even if a later one would.
        assert!(!prompt.contains("xyz"));
    }

    #[test]
    fn test_custom_delimiter_and_preamble() {
        let chunks = vec![scored(0, "text", 1.0)];
        let prompt = ContextAssembler::new()
            .with_preamble("Answer briefly.")
            .with_delimiter("###")
            .assemble("why?", &chunks);
        assert_eq!(prompt, "Answer briefly.\n\n###\ntext\n###\n\nQuestion: why?\nHelpful Answer:");
    }
}
