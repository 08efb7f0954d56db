use console::style;
use std::fmt::Write as FmtWrite;

use crate::models::{Chunk, OutputFormat, RetrievalResults};
use crate::services::{Answer, CollectionInfo, IngestOutcome, IngestReport};

pub trait Formatter {
    fn format_retrieval(&self, results: &RetrievalResults) -> String;
    fn format_ingest_report(&self, report: &IngestReport) -> String;
    fn format_chunk_preview(&self, source: &str, chunks: &[Chunk]) -> String;
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String;
    fn format_collections(&self, collections: &[CollectionInfo]) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub ollama_url: String,
    pub ollama_reachable: bool,
    pub embedding_model: String,
    pub chat_model: String,
    pub store_path: String,
    pub store_ok: bool,
    pub default_collection: String,
    pub collections: Vec<CollectionInfo>,
}

fn preview(content: &str, max_chars: usize) -> String {
    let head: String = content.chars().take(max_chars).collect();
    if content.chars().count() > max_chars {
        format!("{}...", head)
    } else {
        head
    }
}

fn dimension_label(dimension: Option<usize>) -> String {
    dimension.map_or_else(|| "-".to_string(), |d| d.to_string())
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_retrieval(&self, results: &RetrievalResults) -> String {
        if results.is_empty() {
            return format!(
                "No chunks found in '{}' for: {}\n",
                results.collection, results.query
            );
        }

        let mut output = String::new();
        writeln!(output, "{} \"{}\"", style("Results for").bold(), results.query).unwrap();
        writeln!(
            output,
            "{} chunks from '{}' in {}ms\n",
            results.len(),
            results.collection,
            results.duration_ms
        )
        .unwrap();

        for (i, scored) in results.results.iter().enumerate() {
            writeln!(
                output,
                "{}. [Score: {}]",
                i + 1,
                style(format!("{:.3}", scored.score)).cyan()
            )
            .unwrap();
            writeln!(
                output,
                "   Source: {} (chunk {}, bytes {}..{})",
                scored.chunk.source,
                scored.chunk.chunk_index,
                scored.chunk.start_offset,
                scored.chunk.end_offset
            )
            .unwrap();
            writeln!(output, "   ---").unwrap();
            for line in preview(&scored.chunk.content, 200).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        if let Some(ref prompt) = results.prompt {
            writeln!(output, "{}", style("Prompt").bold()).unwrap();
            writeln!(output, "------").unwrap();
            writeln!(output, "{}", prompt).unwrap();
        }

        output
    }

    fn format_ingest_report(&self, report: &IngestReport) -> String {
        let mut output = String::new();
        let title = match report.outcome {
            IngestOutcome::Ingested => "Ingestion Complete",
            IngestOutcome::Skipped => "Ingestion Skipped (collection already populated)",
        };
        writeln!(output, "{}", style(title).bold().green()).unwrap();
        writeln!(output, "{}", "-".repeat(title.chars().count())).unwrap();
        writeln!(output, "Collection: {}", report.collection).unwrap();
        writeln!(output, "Source:     {}", report.source).unwrap();
        writeln!(output, "Policy:     {}", report.policy).unwrap();
        writeln!(output, "Chunks:     {}", report.chunk_count).unwrap();
        writeln!(output, "Dimension:  {}", dimension_label(report.dimension)).unwrap();
        writeln!(output, "Duration:   {}ms", report.duration_ms).unwrap();
        output
    }

    fn format_chunk_preview(&self, source: &str, chunks: &[Chunk]) -> String {
        let mut output = String::new();
        writeln!(output, "{} {} chunks from {}", style("Dry run:").bold(), chunks.len(), source)
            .unwrap();
        for chunk in chunks {
            writeln!(
                output,
                "\n[{}] bytes {}..{} ({} chars)",
                chunk.chunk_index,
                chunk.start_offset,
                chunk.end_offset,
                chunk.char_len()
            )
            .unwrap();
            writeln!(output, "{:?}", chunk.content).unwrap();
        }
        output
    }

    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        let mut output = String::new();
        writeln!(output, "{}", answer.answer).unwrap();

        if show_sources && !answer.sources.is_empty() {
            writeln!(output, "\n{}", style("Sources").dim()).unwrap();
            for (i, scored) in answer.sources.iter().enumerate() {
                writeln!(
                    output,
                    "  {}. [{:.3}] {}",
                    i + 1,
                    scored.score,
                    preview(&scored.chunk.content, 120).replace('\n', " ")
                )
                .unwrap();
            }
        }
        output
    }

    fn format_collections(&self, collections: &[CollectionInfo]) -> String {
        if collections.is_empty() {
            return "No collections found.\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "Collections").unwrap();
        writeln!(output, "-----------").unwrap();
        for c in collections {
            writeln!(
                output,
                "  {} ({} chunks, dimension {}, created {})",
                style(&c.name).bold(),
                c.chunk_count,
                dimension_label(c.dimension),
                c.created_at
            )
            .unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let ollama = if status.ollama_reachable {
            style("[CONNECTED]").green()
        } else {
            style("[DISCONNECTED]").red()
        };
        writeln!(output, "Ollama:        {} {}", status.ollama_url, ollama).unwrap();
        writeln!(output, "  Embedding:   {}", status.embedding_model).unwrap();
        writeln!(output, "  Chat:        {}", status.chat_model).unwrap();
        writeln!(output).unwrap();

        let store = if status.store_ok {
            style("[OK]").green()
        } else {
            style("[UNAVAILABLE]").red()
        };
        writeln!(output, "Vector Store:  {} {}", status.store_path, store).unwrap();
        writeln!(output, "  Default:     {}", status.default_collection).unwrap();
        for c in &status.collections {
            writeln!(output, "  - {} ({} chunks)", c.name, c.chunk_count).unwrap();
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}\n", style("Error:").red().bold(), error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: serde::Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut text = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        text.push('\n');
        text
    }
}

impl Formatter for JsonFormatter {
    fn format_retrieval(&self, results: &RetrievalResults) -> String {
        self.render(results)
    }

    fn format_ingest_report(&self, report: &IngestReport) -> String {
        self.render(report)
    }

    fn format_chunk_preview(&self, source: &str, chunks: &[Chunk]) -> String {
        self.render(&serde_json::json!({
            "source": source,
            "chunk_count": chunks.len(),
            "chunks": chunks,
        }))
    }

    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        if show_sources {
            return self.render(answer);
        }
        self.render(&serde_json::json!({
            "question": answer.question,
            "answer": answer.answer,
        }))
    }

    fn format_collections(&self, collections: &[CollectionInfo]) -> String {
        self.render(&serde_json::json!({ "collections": collections }))
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(&serde_json::json!({
            "ollama": {
                "url": status.ollama_url,
                "reachable": status.ollama_reachable,
                "embedding_model": status.embedding_model,
                "chat_model": status.chat_model,
            },
            "store": {
                "path": status.store_path,
                "ok": status.store_ok,
                "default_collection": status.default_collection,
                "collections": status.collections,
            }
        }))
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"message": message}))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({"error": error}))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_retrieval(&self, results: &RetrievalResults) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "## Retrieval Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", results.query).unwrap();
        writeln!(
            output,
            "{} chunks from `{}` in {}ms\n",
            results.len(),
            results.collection,
            results.duration_ms
        )
        .unwrap();

        for (i, scored) in results.results.iter().enumerate() {
            writeln!(output, "### {}. Score: {:.3}\n", i + 1, scored.score).unwrap();
            writeln!(
                output,
                "**Source:** `{}` (chunk {})\n",
                scored.chunk.source, scored.chunk.chunk_index
            )
            .unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", scored.chunk.content).unwrap();
            writeln!(output, "```\n").unwrap();
        }

        if let Some(ref prompt) = results.prompt {
            writeln!(output, "### Prompt\n").unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", prompt).unwrap();
            writeln!(output, "```").unwrap();
        }

        output
    }

    fn format_ingest_report(&self, report: &IngestReport) -> String {
        let mut output = String::new();
        let title = match report.outcome {
            IngestOutcome::Ingested => "Ingestion Complete",
            IngestOutcome::Skipped => "Ingestion Skipped",
        };
        writeln!(output, "## {}\n", title).unwrap();
        writeln!(output, "| Field | Value |").unwrap();
        writeln!(output, "|-------|-------|").unwrap();
        writeln!(output, "| Collection | `{}` |", report.collection).unwrap();
        writeln!(output, "| Source | `{}` |", report.source).unwrap();
        writeln!(output, "| Policy | {} |", report.policy).unwrap();
        writeln!(output, "| Chunks | {} |", report.chunk_count).unwrap();
        writeln!(output, "| Dimension | {} |", dimension_label(report.dimension)).unwrap();
        writeln!(output, "| Duration | {}ms |", report.duration_ms).unwrap();
        output
    }

    fn format_chunk_preview(&self, source: &str, chunks: &[Chunk]) -> String {
        let mut output = String::new();
        writeln!(output, "## Chunk Preview\n").unwrap();
        writeln!(output, "**Source:** `{}` ({} chunks)\n", source, chunks.len()).unwrap();
        for chunk in chunks {
            writeln!(
                output,
                "### Chunk {} (bytes {}..{})\n",
                chunk.chunk_index, chunk.start_offset, chunk.end_offset
            )
            .unwrap();
            writeln!(output, "```\n{}\n```\n", chunk.content).unwrap();
        }
        output
    }

    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        let mut output = String::new();
        writeln!(output, "**Q:** {}\n", answer.question).unwrap();
        writeln!(output, "**A:** {}\n", answer.answer).unwrap();

        if show_sources && !answer.sources.is_empty() {
            writeln!(output, "#### Sources\n").unwrap();
            for (i, scored) in answer.sources.iter().enumerate() {
                writeln!(
                    output,
                    "{}. `{:.3}` {}",
                    i + 1,
                    scored.score,
                    preview(&scored.chunk.content, 120).replace('\n', " ")
                )
                .unwrap();
            }
        }
        output
    }

    fn format_collections(&self, collections: &[CollectionInfo]) -> String {
        if collections.is_empty() {
            return "## Collections\n\n*No collections found.*\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "## Collections\n").unwrap();
        writeln!(output, "| Name | Chunks | Dimension | Created |").unwrap();
        writeln!(output, "|------|--------|-----------|---------|").unwrap();
        for c in collections {
            writeln!(
                output,
                "| `{}` | {} | {} | {} |",
                c.name,
                c.chunk_count,
                dimension_label(c.dimension),
                c.created_at
            )
            .unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        let ollama = if status.ollama_reachable { "✅" } else { "❌" };
        writeln!(output, "### Ollama {}\n", ollama).unwrap();
        writeln!(output, "- **URL:** `{}`", status.ollama_url).unwrap();
        writeln!(output, "- **Embedding:** {}", status.embedding_model).unwrap();
        writeln!(output, "- **Chat:** {}\n", status.chat_model).unwrap();

        let store = if status.store_ok { "✅" } else { "❌" };
        writeln!(output, "### Vector Store {}\n", store).unwrap();
        writeln!(output, "- **Path:** `{}`", status.store_path).unwrap();
        writeln!(output, "- **Default collection:** {}", status.default_collection).unwrap();
        for c in &status.collections {
            writeln!(output, "- `{}`: {} chunks", c.name, c.chunk_count).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngestPolicy, ScoredChunk};

    fn results(with_prompt: bool) -> RetrievalResults {
        let chunk = Chunk {
            id: Chunk::generate_id("doc", 0),
            document_id: "doc".to_string(),
            source: "sky.txt".to_string(),
            chunk_index: 0,
            start_offset: 0,
            end_offset: 17,
            content: "The sky is blue. ".to_string(),
        };
        RetrievalResults {
            query: "What color is the sky?".to_string(),
            collection: "default".to_string(),
            results: vec![ScoredChunk { chunk, score: 0.987 }],
            duration_ms: 3,
            prompt: with_prompt.then(|| "PROMPT TEXT".to_string()),
        }
    }

    fn report() -> IngestReport {
        IngestReport {
            collection: "default".to_string(),
            source: "sky.txt".to_string(),
            policy: IngestPolicy::ReuseIfPresent,
            outcome: IngestOutcome::Skipped,
            chunk_count: 2,
            dimension: Some(384),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_text_retrieval() {
        console::set_colors_enabled(false);
        let out = TextFormatter.format_retrieval(&results(true));
        assert!(out.contains("What color is the sky?"));
        assert!(out.contains("0.987"));
        assert!(out.contains("The sky is blue."));
        assert!(out.contains("PROMPT TEXT"));
    }

    #[test]
    fn test_empty_retrieval() {
        let mut empty = results(false);
        empty.results.clear();
        assert!(TextFormatter.format_retrieval(&empty).starts_with("No chunks found"));
        assert!(MarkdownFormatter.format_retrieval(&empty).contains("No results found"));
    }

    #[test]
    fn test_json_retrieval_roundtrips() {
        let out = JsonFormatter::new(false).format_retrieval(&results(false));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["results"][0]["chunk"]["content"], "The sky is blue. ");
        assert!(value.get("prompt").is_none());
    }

    #[test]
    fn test_ingest_report_formats() {
        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(true).format_ingest_report(&report())).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["policy"], "reuse");

        let md = MarkdownFormatter.format_ingest_report(&report());
        assert!(md.contains("## Ingestion Skipped"));
        assert!(md.contains("| Dimension | 384 |"));
    }

    #[test]
    fn test_answer_hides_sources_unless_asked() {
        let answer = Answer {
            question: "What color is the sky?".to_string(),
            answer: "Blue.".to_string(),
            prompt: "p".to_string(),
            sources: results(false).results,
        };
        console::set_colors_enabled(false);
        assert_eq!(TextFormatter.format_answer(&answer, false), "Blue.\n");
        assert!(TextFormatter.format_answer(&answer, true).contains("The sky is blue."));

        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(false).format_answer(&answer, false)).unwrap();
        assert!(json.get("sources").is_none());
    }

    #[test]
    fn test_collections_table() {
        let collections = vec![CollectionInfo {
            name: "books".to_string(),
            dimension: None,
            chunk_count: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }];
        let md = MarkdownFormatter.format_collections(&collections);
        assert!(md.contains("| `books` | 0 | - |"));
        assert_eq!(
            TextFormatter.format_collections(&[]),
            "No collections found.\n"
        );
    }
}
