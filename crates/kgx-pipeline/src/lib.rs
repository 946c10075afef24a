//! KGX Pipeline - End-to-end extraction orchestration
//!
//! Wires the stages together: document parsing, chunking, per-chunk
//! extraction, normalization, and result aggregation. Construction does
//! the fatal pre-flight work (config validation, ontology load, model
//! client build); after that a run never aborts — chunk-level problems
//! are recorded and the outcome reports partial results.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use kgx_core::{
    ChunkFailure, ExtractedItems, ExtractionMode, ExtractionResult, FailureReason, KgxError,
    PipelineConfig, PipelineOutcome, Result, Statistics,
};
use kgx_extractor::{extractor_for_mode, normalize_items, Chunker, Extractor};
use kgx_llm::{create_model_client, ModelClient};
use kgx_ontology::Ontology;
use kgx_parser::parse_file;

/// Cooperative cancellation handle, checked between chunks
///
/// Cancellation never interrupts an in-flight model call; the current
/// chunk finishes and the remaining ones are recorded as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The configured extraction pipeline
pub struct Pipeline {
    config: PipelineConfig,
    chunker: Chunker,
    extractor: Box<dyn Extractor>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("chunker", &self.chunker)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline from config, constructing the model client from
    /// the configured provider. Fails fast on invalid config, a missing
    /// or unparseable ontology, or a missing API key.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let client: Arc<dyn ModelClient> = Arc::from(create_model_client(&config.llm)?);
        Self::with_client(config, client)
    }

    /// Build a pipeline around an existing model client
    pub fn with_client(config: PipelineConfig, client: Arc<dyn ModelClient>) -> Result<Self> {
        config.validate()?;

        let ontology = match config.extraction.mode {
            ExtractionMode::JsonLd => {
                let path = config.extraction.ontology_path.as_ref().ok_or_else(|| {
                    KgxError::Config("jsonld extraction mode requires ontology_path".to_string())
                })?;
                let ontology =
                    Ontology::load(path).map_err(|e| KgxError::OntologyLoad(e.to_string()))?;
                info!(
                    classes = ontology.class_count(),
                    properties = ontology.property_count(),
                    "ontology loaded"
                );
                Some(Arc::new(ontology))
            }
            ExtractionMode::Triples => None,
        };

        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let extractor = extractor_for_mode(&config.extraction, client, ontology)?;

        Ok(Self {
            config,
            chunker,
            extractor,
        })
    }

    pub fn mode(&self) -> ExtractionMode {
        self.extractor.mode()
    }

    /// Run extraction over raw text
    pub async fn process_text(&self, text: &str) -> PipelineOutcome {
        self.process_text_cancellable(text, &CancelFlag::new())
            .await
    }

    /// Run extraction over raw text with a cancellation handle
    pub async fn process_text_cancellable(
        &self,
        text: &str,
        cancel: &CancelFlag,
    ) -> PipelineOutcome {
        let chunks = self.chunker.split(text);
        let total_chunks = chunks.len();
        info!(total_chunks, mode = %self.mode(), "starting extraction run");

        let mut items = ExtractedItems::empty(self.mode());
        let mut failures: Vec<ChunkFailure> = Vec::new();
        let mut failed_chunks = 0;

        for chunk in &chunks {
            if cancel.is_cancelled() {
                failed_chunks += 1;
                failures.push(ChunkFailure::new(
                    chunk.index,
                    FailureReason::Cancelled,
                    "run cancelled before this chunk",
                ));
                continue;
            }

            let extraction = self.extractor.extract(chunk).await;
            if extraction.chunk_failed() {
                failed_chunks += 1;
            }
            failures.extend(extraction.failures);
            items.append(extraction.items);
        }

        let raw_items = items.len();

        let (items, duplicates_removed, conflicts) = if self.config.extraction.enable_normalization
        {
            let report = normalize_items(items);
            (report.items, report.duplicates_removed, report.conflicts)
        } else {
            (items, 0, Vec::new())
        };

        let statistics = Statistics {
            total_chunks,
            processed_chunks: total_chunks - failed_chunks,
            failed_chunks,
            raw_items,
            unique_items: items.len(),
            duplicates_removed,
            failures,
            conflicts,
        };

        info!(
            processed = statistics.processed_chunks,
            failed = statistics.failed_chunks,
            unique_items = statistics.unique_items,
            duplicates_removed = statistics.duplicates_removed,
            "extraction run complete"
        );

        let result = ExtractionResult::new(self.mode(), items, statistics);

        if total_chunks > 0 && failed_chunks == total_chunks {
            warn!(total_chunks, "every chunk failed");
            return PipelineOutcome::failed_with(result, "all chunks failed");
        }
        PipelineOutcome::ok(result)
    }

    /// Parse a document file and run extraction over its text content.
    /// `pages` selects 1-based PDF pages; `None` takes the whole file.
    pub async fn process_file(&self, path: &Path, pages: Option<&[usize]>) -> PipelineOutcome {
        self.process_file_cancellable(path, pages, &CancelFlag::new())
            .await
    }

    pub async fn process_file_cancellable(
        &self,
        path: &Path,
        pages: Option<&[usize]>,
        cancel: &CancelFlag,
    ) -> PipelineOutcome {
        let document = match parse_file(path, pages) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "document parsing failed");
                return PipelineOutcome::failed(KgxError::Document(e.to_string()).to_string());
            }
        };

        info!(
            path = %path.display(),
            file_type = %document.file_type,
            words = document.word_count(),
            "document parsed"
        );

        self.process_text_cancellable(&document.content, cancel)
            .await
    }
}
