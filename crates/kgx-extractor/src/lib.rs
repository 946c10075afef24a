//! KGX Extractor - Chunking and LLM-driven knowledge extraction
//!
//! This crate owns the per-chunk extraction path:
//! - Word-based overlapping chunking (`chunker`)
//! - Prompt assembly per extraction mode (`prompt`)
//! - Tolerant parsing of raw model output (`response`)
//! - The triples and JSON-LD extraction variants (`triples`, `jsonld`)
//! - Normalization and deduplication of results (`normalize`)
//!
//! Extractors never abort the run: model and parse problems come back
//! as recorded failures on the affected chunk, and validation drops are
//! reported item by item.

use std::sync::Arc;

use async_trait::async_trait;

use kgx_core::{
    Chunk, ChunkFailure, ExtractedItems, ExtractionConfig, ExtractionMode, FailureReason,
    KgxError, Result,
};
use kgx_llm::ModelClient;
use kgx_ontology::Ontology;

pub mod chunker;
pub mod jsonld;
pub mod normalize;
pub mod prompt;
pub mod response;
pub mod triples;

pub use chunker::Chunker;
pub use jsonld::JsonLdExtractor;
pub use normalize::{normalize_items, normalize_text, NormalizeReport};
pub use prompt::PromptBuilder;
pub use triples::TripleExtractor;

/// What one chunk produced: items plus any recorded failures
#[derive(Debug)]
pub struct ChunkExtraction {
    pub items: ExtractedItems,
    pub failures: Vec<ChunkFailure>,
}

impl ChunkExtraction {
    /// An extraction that produced nothing because the chunk failed
    pub fn failed(mode: ExtractionMode, failure: ChunkFailure) -> Self {
        Self {
            items: ExtractedItems::empty(mode),
            failures: vec![failure],
        }
    }

    /// Whether the chunk as a whole failed (model call or parse stage).
    /// Validation drops of individual items do not fail the chunk.
    pub fn chunk_failed(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f.reason, FailureReason::ModelCall | FailureReason::Parse))
    }
}

/// One extraction strategy, applied chunk by chunk
#[async_trait]
pub trait Extractor: Send + Sync {
    /// The mode this extractor implements
    fn mode(&self) -> ExtractionMode;

    /// Extract items from one chunk. Infallible by contract: problems
    /// are recorded in the returned failures.
    async fn extract(&self, chunk: &Chunk) -> ChunkExtraction;
}

/// Create the extractor for the configured mode
///
/// JSON-LD mode requires a loaded ontology; asking for it without one
/// is a configuration error.
pub fn extractor_for_mode(
    config: &ExtractionConfig,
    client: Arc<dyn ModelClient>,
    ontology: Option<Arc<Ontology>>,
) -> Result<Box<dyn Extractor>> {
    match config.mode {
        ExtractionMode::Triples => Ok(Box::new(TripleExtractor::new(client))),
        ExtractionMode::JsonLd => {
            let ontology = ontology.ok_or_else(|| {
                KgxError::Config("jsonld extraction mode requires an ontology".to_string())
            })?;
            Ok(Box::new(JsonLdExtractor::new(
                client,
                ontology,
                config.enable_validation,
            )))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use kgx_core::{KgxError, Result};
    use kgx_llm::ModelClient;

    /// Scripted model client: returns queued responses in order
    pub struct MockModelClient {
        responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    }

    impl MockModelClient {
        pub fn with_responses(responses: Vec<std::result::Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for MockModelClient {
        async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
            let next = self
                .responses
                .lock()
                .expect("mock lock")
                .pop_front()
                .expect("mock exhausted");
            next.map_err(KgxError::ModelCall)
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::MockModelClient;

    #[test]
    fn test_factory_triples_mode() {
        let client = Arc::new(MockModelClient::with_responses(Vec::new()));
        let config = ExtractionConfig::default();
        let extractor = extractor_for_mode(&config, client, None).unwrap();
        assert_eq!(extractor.mode(), ExtractionMode::Triples);
    }

    #[test]
    fn test_factory_jsonld_without_ontology_is_config_error() {
        let client = Arc::new(MockModelClient::with_responses(Vec::new()));
        let config = ExtractionConfig {
            mode: ExtractionMode::JsonLd,
            ..Default::default()
        };
        assert!(matches!(
            extractor_for_mode(&config, client, None),
            Err(KgxError::Config(_))
        ));
    }

    #[test]
    fn test_chunk_failed_distinguishes_validation() {
        let soft = ChunkExtraction {
            items: ExtractedItems::Triples(Vec::new()),
            failures: vec![ChunkFailure {
                chunk_index: 0,
                reason: FailureReason::Validation,
                detail: "dropped".to_string(),
            }],
        };
        assert!(!soft.chunk_failed());

        let hard = ChunkExtraction::failed(
            ExtractionMode::Triples,
            ChunkFailure {
                chunk_index: 0,
                reason: FailureReason::Parse,
                detail: "bad".to_string(),
            },
        );
        assert!(hard.chunk_failed());
    }
}
