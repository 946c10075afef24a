//! Plain S-P-O triple extraction

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use kgx_core::{Chunk, ChunkFailure, ExtractedItems, ExtractionMode, FailureReason, Triple};
use kgx_llm::ModelClient;

use crate::prompt::PromptBuilder;
use crate::response;
use crate::{ChunkExtraction, Extractor};

/// Extracts untyped (subject, predicate, object) triples from chunks
pub struct TripleExtractor {
    client: Arc<dyn ModelClient>,
    prompts: PromptBuilder,
}

impl TripleExtractor {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            prompts: PromptBuilder::triples(),
        }
    }
}

#[async_trait]
impl Extractor for TripleExtractor {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Triples
    }

    async fn extract(&self, chunk: &Chunk) -> ChunkExtraction {
        let user_prompt = self.prompts.user_prompt(&chunk.text);

        let raw = match self
            .client
            .complete(self.prompts.system_prompt(), &user_prompt)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(chunk = chunk.index, error = %e, "model call failed");
                return ChunkExtraction::failed(
                    self.mode(),
                    ChunkFailure {
                        chunk_index: chunk.index,
                        reason: FailureReason::ModelCall,
                        detail: e.to_string(),
                    },
                );
            }
        };

        let records = match response::parse_triple_records(&raw, chunk.index) {
            Ok(records) => records,
            Err(failure) => {
                warn!(chunk = chunk.index, detail = %failure.detail, "unparseable model output");
                return ChunkExtraction::failed(self.mode(), failure);
            }
        };

        let mut triples = Vec::new();
        let mut failures = Vec::new();
        for record in &records {
            match coerce_triple(record, chunk.index) {
                Ok(triple) => triples.push(triple),
                Err(detail) => failures.push(ChunkFailure {
                    chunk_index: chunk.index,
                    reason: FailureReason::Validation,
                    detail,
                }),
            }
        }

        debug!(
            chunk = chunk.index,
            extracted = triples.len(),
            rejected = failures.len(),
            "chunk extraction complete"
        );

        ChunkExtraction {
            items: ExtractedItems::Triples(triples),
            failures,
        }
    }
}

/// Coerce one JSON record into a triple
///
/// All three positions must be non-empty strings after trimming. The
/// predicate is lowercased here so downstream grouping never depends on
/// the model honoring the casing rule.
fn coerce_triple(record: &Value, chunk_index: usize) -> Result<Triple, String> {
    let obj = record
        .as_object()
        .ok_or_else(|| format!("record is not an object: {record}"))?;

    let field = |key: &str| -> Result<String, String> {
        let text = obj
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("missing or non-string \"{key}\": {record}"))?
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(format!("empty \"{key}\": {record}"));
        }
        Ok(text)
    };

    let mut triple = Triple::new(
        field("subject")?,
        field("predicate")?.to_lowercase(),
        field("object")?,
    )
    .with_source_chunk(chunk_index);

    if let Some(confidence) = obj.get("confidence").and_then(Value::as_f64) {
        triple = triple.with_confidence(confidence as f32);
    }

    Ok(triple)
}
