use serde::{Deserialize, Serialize};

/// Text resolved from a source, ready to be chunked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source: String,
    pub content: String,
    pub checksum: String,
    pub loaded_at: String,
}

/// A contiguous piece of a document. Offsets are byte positions into the
/// document text, so `&document.content[start_offset..end_offset] == content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub source: String,
    pub chunk_index: u32,
    pub start_offset: u64,
    pub end_offset: u64,
    pub content: String,
}

impl Document {
    pub fn generate_id(source: &str) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(source.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(source: impl Into<String>, content: String) -> Self {
        let source = source.into();
        let id = Self::generate_id(&source);
        let checksum = crate::utils::calculate_checksum(&content);
        Self {
            id,
            source,
            content,
            checksum,
            loaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Chunk {
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(document: &Document, chunk_index: u32, start: usize, end: usize) -> Self {
        Self {
            id: Self::generate_id(&document.id, chunk_index),
            document_id: document.id.clone(),
            source: document.source.clone(),
            chunk_index,
            start_offset: start as u64,
            end_offset: end as u64,
            content: document.content[start..end].to_string(),
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_generate_id() {
        let id = Document::generate_id("/path/to/file.txt");
        assert_eq!(id.len(), 32);
        assert_eq!(id, Document::generate_id("/path/to/file.txt"));
    }

    #[test]
    fn test_chunk_generate_id() {
        let id = Chunk::generate_id("abc123", 5);
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
        assert_eq!(id, Chunk::generate_id("abc123", 5));
        assert_ne!(id, Chunk::generate_id("abc123", 6));
    }

    #[test]
    fn test_chunk_from_document_slices_content() {
        let doc = Document::new("memo.txt", "héllo wörld".to_string());
        let chunk = Chunk::from_document(&doc, 0, 0, "héllo".len());
        assert_eq!(chunk.content, "héllo");
        assert_eq!(chunk.char_len(), 5);
        assert_eq!(chunk.source, "memo.txt");
        assert_eq!(chunk.document_id, doc.id);
    }
}
