use std::fmt::Write as FmtWrite;

use console::style;

use crate::models::{McqAnswer, OutputFormat, RetrievedContext};
use crate::services::{BatchAnswer, IndexHandle, IndexStatus};

pub trait Formatter {
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_index_built(&self, handle: &IndexHandle, duration_ms: u64) -> String;
    fn format_index_info(&self, info: &IndexInfo) -> String;
    fn format_mcq(&self, answer: &McqAnswer) -> String;
    fn format_batch(&self, answers: &[BatchAnswer]) -> String;
    fn format_short(&self, answer: &str) -> String;
    fn format_context(&self, context: &RetrievedContext) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_reachable: bool,
    pub vector_store_driver: String,
    pub vector_store_location: String,
    pub vector_store_connected: bool,
    pub vector_store_points: u64,
    pub collection: String,
    pub oracle_model: String,
    pub oracle_url: String,
    pub oracle_reachable: bool,
    pub service_url: String,
    pub service_reachable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexInfo {
    pub collection: String,
    pub driver: String,
    pub exists: bool,
    /// False for a collection left behind by an unfinished build.
    pub complete: bool,
    pub points: u64,
    pub dimension: Option<u64>,
    pub embedding_model: Option<String>,
    pub source_checksum: Option<String>,
    /// None when the source file can't be read.
    pub source_current: Option<bool>,
}

fn flag(ok: bool, yes: &str, no: &str) -> String {
    if ok {
        style(format!("[{}]", yes)).green().to_string()
    } else {
        style(format!("[{}]", no)).red().to_string()
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        writeln!(
            output,
            "Embedding:     {} {}",
            status.embedding_provider,
            flag(status.embedding_reachable, "READY", "UNAVAILABLE")
        )
        .unwrap();
        writeln!(output, "  Model:       {}", status.embedding_model).unwrap();
        writeln!(output).unwrap();

        writeln!(
            output,
            "Vector Store:  {} {}",
            status.vector_store_driver,
            flag(status.vector_store_connected, "CONNECTED", "DISCONNECTED")
        )
        .unwrap();
        writeln!(output, "  Location:    {}", status.vector_store_location).unwrap();
        writeln!(output, "  Collection:  {}", status.collection).unwrap();
        if status.vector_store_connected {
            writeln!(output, "  Points:      {}", status.vector_store_points).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(
            output,
            "Oracle:        {} {}",
            status.oracle_model,
            flag(status.oracle_reachable, "READY", "UNAVAILABLE")
        )
        .unwrap();
        writeln!(output, "  URL:         {}", status.oracle_url).unwrap();
        writeln!(output).unwrap();

        writeln!(
            output,
            "Quiz Service:  {} {}",
            status.service_url,
            flag(status.service_reachable, "RUNNING", "STOPPED")
        )
        .unwrap();

        output
    }

    fn format_index_built(&self, handle: &IndexHandle, duration_ms: u64) -> String {
        let mut output = String::new();
        match handle.status {
            IndexStatus::Built { chunks } => {
                writeln!(output, "Index Built").unwrap();
                writeln!(output, "-----------").unwrap();
                writeln!(output, "Collection: {}", handle.collection).unwrap();
                writeln!(output, "Model:      {}", handle.embedding_model).unwrap();
                writeln!(output, "Chunks:     {}", chunks).unwrap();
                writeln!(output, "Duration:   {}ms", duration_ms).unwrap();
            }
            IndexStatus::Reused { points, stale } => {
                writeln!(output, "Index Reused").unwrap();
                writeln!(output, "------------").unwrap();
                writeln!(output, "Collection: {}", handle.collection).unwrap();
                writeln!(output, "Model:      {}", handle.embedding_model).unwrap();
                writeln!(output, "Points:     {}", points).unwrap();
                if stale {
                    writeln!(
                        output,
                        "{}",
                        style("Source document changed since the index was built. Run `tqa index rebuild` to re-ingest.")
                            .yellow()
                    )
                    .unwrap();
                }
            }
        }
        output
    }

    fn format_index_info(&self, info: &IndexInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Index").unwrap();
        writeln!(output, "-----").unwrap();
        writeln!(output, "Collection: {}", info.collection).unwrap();
        writeln!(output, "Driver:     {}", info.driver).unwrap();
        if !info.exists {
            writeln!(output, "State:      {}", style("not built").yellow()).unwrap();
            return output;
        }
        if !info.complete {
            writeln!(
                output,
                "State:      {}",
                style("incomplete (rebuilt on next start)").yellow()
            )
            .unwrap();
        }
        writeln!(output, "Points:     {}", info.points).unwrap();
        if let Some(ref model) = info.embedding_model {
            writeln!(output, "Model:      {}", model).unwrap();
        }
        if let Some(dimension) = info.dimension {
            writeln!(output, "Dimension:  {}", dimension).unwrap();
        }
        if let Some(ref checksum) = info.source_checksum {
            let short: String = checksum.chars().take(12).collect();
            writeln!(output, "Source:     {}", short).unwrap();
        }
        match info.source_current {
            Some(true) => writeln!(output, "Freshness:  {}", style("current").green()).unwrap(),
            Some(false) => writeln!(output, "Freshness:  {}", style("stale").yellow()).unwrap(),
            None => {}
        }
        output
    }

    fn format_mcq(&self, answer: &McqAnswer) -> String {
        format!("{}\n", answer)
    }

    fn format_batch(&self, answers: &[BatchAnswer]) -> String {
        let mut output = String::new();
        for answer in answers {
            writeln!(output, "{}", answer).unwrap();
        }
        output
    }

    fn format_short(&self, answer: &str) -> String {
        format!("{}\n", answer)
    }

    fn format_context(&self, context: &RetrievedContext) -> String {
        if context.is_empty() {
            return "No matching passages.\n".to_string();
        }

        let mut output = String::new();
        for (i, result) in context.results.iter().enumerate() {
            writeln!(
                output,
                "{}. {}",
                i + 1,
                style(format!("[Score: {:.3}]", result.score)).dim()
            )
            .unwrap();
            let preview: String = result.content.chars().take(200).collect();
            let preview = if result.content.chars().count() > 200 {
                format!("{}...", preview)
            } else {
                preview
            };
            for line in preview.lines() {
                writeln!(output, "   {}", line).unwrap();
            }
        }
        writeln!(output).unwrap();
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

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)) + "\n"
    }
}

impl Formatter for JsonFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(&serde_json::json!({
            "embedding": {
                "provider": status.embedding_provider,
                "model": status.embedding_model,
                "reachable": status.embedding_reachable,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "location": status.vector_store_location,
                "connected": status.vector_store_connected,
                "collection": status.collection,
                "points": status.vector_store_points,
            },
            "oracle": {
                "model": status.oracle_model,
                "url": status.oracle_url,
                "reachable": status.oracle_reachable,
            },
            "service": {
                "url": status.service_url,
                "reachable": status.service_reachable,
            }
        }))
    }

    fn format_index_built(&self, handle: &IndexHandle, duration_ms: u64) -> String {
        let mut json = serde_json::to_value(handle).unwrap_or_default();
        if let Some(map) = json.as_object_mut() {
            map.insert("duration_ms".to_string(), duration_ms.into());
        }
        self.render(&json)
    }

    fn format_index_info(&self, info: &IndexInfo) -> String {
        self.render(&serde_json::json!({
            "collection": info.collection,
            "driver": info.driver,
            "exists": info.exists,
            "complete": info.complete,
            "points": info.points,
            "dimension": info.dimension,
            "embedding_model": info.embedding_model,
            "source_checksum": info.source_checksum,
            "source_current": info.source_current,
        }))
    }

    fn format_mcq(&self, answer: &McqAnswer) -> String {
        self.render(&serde_json::json!({
            "answer": answer.to_string(),
            "parsed": answer.is_parsed(),
        }))
    }

    fn format_batch(&self, answers: &[BatchAnswer]) -> String {
        self.render(&serde_json::json!({ "answers": answers }))
    }

    fn format_short(&self, answer: &str) -> String {
        self.render(&serde_json::json!({ "answer": answer }))
    }

    fn format_context(&self, context: &RetrievedContext) -> String {
        self.render(&serde_json::to_value(context).unwrap_or_default())
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        self.render(&serde_json::json!({ "error": error }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::BatchOutcome;

    fn batch() -> Vec<BatchAnswer> {
        vec![
            BatchAnswer {
                number: "1".to_string(),
                outcome: BatchOutcome::Answered {
                    answer: McqAnswer::Parsed('B'),
                },
            },
            BatchAnswer {
                number: String::new(),
                outcome: BatchOutcome::Failed {
                    message: "bad block".to_string(),
                },
            },
        ]
    }

    #[test]
    fn test_text_batch_lines() {
        let output = TextFormatter.format_batch(&batch());
        assert_eq!(output, "1. B\nbad block\n");
    }

    #[test]
    fn test_json_mcq() {
        let output = JsonFormatter::new(false).format_mcq(&McqAnswer::Parsed('C'));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["answer"], "C");
        assert_eq!(value["parsed"], true);

        let output = JsonFormatter::new(false).format_mcq(&McqAnswer::Unparsed("maybe".into()));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["parsed"], false);
    }

    #[test]
    fn test_json_index_built_flattens_status() {
        let handle = IndexHandle {
            collection: "bio".to_string(),
            embedding_model: "m".to_string(),
            status: IndexStatus::Built { chunks: 7 },
        };
        let output = JsonFormatter::new(true).format_index_built(&handle, 12);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["status"], "built");
        assert_eq!(value["chunks"], 7);
        assert_eq!(value["duration_ms"], 12);
    }

    #[test]
    fn test_text_index_info_not_built() {
        let info = IndexInfo {
            collection: "bio".to_string(),
            driver: "sqlite".to_string(),
            ..Default::default()
        };
        let output = TextFormatter.format_index_info(&info);
        assert!(output.contains("Collection: bio"));
        assert!(output.contains("not built"));
        assert!(!output.contains("Points"));
    }

    #[test]
    fn test_index_info_flags_unfinished_build() {
        let info = IndexInfo {
            collection: "bio".to_string(),
            driver: "sqlite".to_string(),
            exists: true,
            complete: false,
            points: 2,
            ..Default::default()
        };
        assert!(TextFormatter.format_index_info(&info).contains("incomplete"));

        let value: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(false).format_index_info(&info))
                .unwrap();
        assert_eq!(value["complete"], false);
    }
}
