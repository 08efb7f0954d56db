//! Utility modules.

pub mod file;
pub mod retry;
pub mod vector;

pub use file::{calculate_checksum, has_pdf_magic, is_binary_extension, looks_binary};
pub use retry::{RetryPolicy, Retryable};
pub use vector::{cosine_similarity, decode_vector, encode_vector};
