//! KGX Core - Domain models, errors, and configuration
//!
//! This crate defines the shared types used throughout the KGX extraction
//! pipeline:
//! - Chunk, Triple, Entity, and Relation records
//! - Extraction results and run statistics
//! - Common error taxonomy
//! - Configuration management

pub mod config;

pub use config::{
    ChunkingConfig, ConfigError, ExtractionConfig, ExtractionMode, LlmConfig, LoggingConfig,
    ModelProvider, PipelineConfig,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for KGX operations
#[derive(Error, Debug)]
pub enum KgxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ontology load error: {0}")]
    OntologyLoad(String),

    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("Unparseable model output for chunk {chunk_index}: {excerpt}")]
    Parse { chunk_index: usize, excerpt: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document parsing error: {0}")]
    Document(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for KgxError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KgxError>;

// ============================================================================
// Chunks
// ============================================================================

/// An ordered, possibly overlapping segment of source text sized for the
/// model's input limits. Immutable once produced by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based sequence index
    pub index: usize,

    /// Word offset of the first word in the source text
    pub start_word: usize,

    /// Word offset one past the last word
    pub end_word: usize,

    /// Raw chunk text
    pub text: String,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.end_word - self.start_word
    }
}

// ============================================================================
// Extracted Items
// ============================================================================

/// A (subject, predicate, object) fact record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,

    /// Model-reported confidence, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Index of the chunk this triple was extracted from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_chunk: Option<usize>,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            confidence: None,
            source_chunk: None,
        }
    }

    pub fn with_source_chunk(mut self, index: usize) -> Self {
        self.source_chunk = Some(index);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// An ontology-typed entity extracted in JSON-LD mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier (from `@id`)
    pub id: String,

    /// Ontology class name (from `@type`)
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Literal property values. BTreeMap keeps serialized output stable.
    pub properties: BTreeMap<String, serde_json::Value>,

    /// Set when the entity failed validation but was kept
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flagged: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_chunk: Option<usize>,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            properties: BTreeMap::new(),
            flagged: false,
            source_chunk: None,
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// Object position of a relation: another entity or a literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationObject {
    EntityRef { id: String },
    Literal(serde_json::Value),
}

/// A typed edge between an entity and an entity or literal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    /// Subject entity id
    pub subject: String,

    /// Ontology property name
    pub property: String,

    pub object: RelationObject,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_chunk: Option<usize>,
}

/// Items extracted by one run or one chunk, depending on mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedItems {
    Triples(Vec<Triple>),
    Graph {
        entities: Vec<Entity>,
        relations: Vec<Relation>,
    },
}

impl ExtractedItems {
    /// Empty item set for the given mode
    pub fn empty(mode: ExtractionMode) -> Self {
        match mode {
            ExtractionMode::Triples => Self::Triples(Vec::new()),
            ExtractionMode::JsonLd => Self::Graph {
                entities: Vec::new(),
                relations: Vec::new(),
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Triples(t) => t.len(),
            Self::Graph {
                entities, relations, ..
            } => entities.len() + relations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append another item set of the same mode. Mismatched modes cannot
    /// occur within one run; the mismatched side is ignored.
    pub fn append(&mut self, other: ExtractedItems) {
        match (self, other) {
            (Self::Triples(a), Self::Triples(b)) => a.extend(b),
            (
                Self::Graph {
                    entities: ea,
                    relations: ra,
                },
                Self::Graph {
                    entities: eb,
                    relations: rb,
                },
            ) => {
                ea.extend(eb);
                ra.extend(rb);
            }
            _ => {}
        }
    }
}

// ============================================================================
// Failures and Statistics
// ============================================================================

/// Reason code for a recorded soft failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ModelCall,
    Parse,
    Validation,
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelCall => write!(f, "model_call"),
            Self::Parse => write!(f, "parse"),
            Self::Validation => write!(f, "validation"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A per-chunk or per-item soft failure, recorded rather than raised
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_index: usize,
    pub reason: FailureReason,
    pub detail: String,
}

impl ChunkFailure {
    pub fn new(chunk_index: usize, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            chunk_index,
            reason,
            detail: detail.into(),
        }
    }
}

/// A property value conflict noted during entity deduplication.
/// The first-seen value is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyConflict {
    pub entity_id: String,
    pub property: String,
    pub kept: serde_json::Value,
    pub discarded: serde_json::Value,
}

/// Summary counters for one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Chunks produced by the chunker
    pub total_chunks: usize,

    /// Chunks that yielded a usable payload
    pub processed_chunks: usize,

    /// Chunks that failed at the model-call or parse stage
    pub failed_chunks: usize,

    /// Item count before normalization/deduplication
    pub raw_items: usize,

    /// Item count in the final result
    pub unique_items: usize,

    pub duplicates_removed: usize,

    /// Accumulated soft failures, in chunk order
    pub failures: Vec<ChunkFailure>,

    /// Property conflicts found while merging duplicate entities
    pub conflicts: Vec<PropertyConflict>,
}

// ============================================================================
// Results
// ============================================================================

/// Aggregate result of one `process_text`/`process_pdf` call.
/// Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub run_id: Uuid,
    pub mode: ExtractionMode,
    pub items: ExtractedItems,
    pub statistics: Statistics,
    pub created_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn new(mode: ExtractionMode, items: ExtractedItems, statistics: Statistics) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            items,
            statistics,
            created_at: Utc::now(),
        }
    }
}

/// Tri-state outcome: success flag, optional result, optional fatal error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub result: Option<ExtractionResult>,
    pub error: Option<String>,
}

impl PipelineOutcome {
    pub fn ok(result: ExtractionResult) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Failure with partial statistics attached (e.g. every chunk failed)
    pub fn failed_with(result: ExtractionResult, error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Some(result),
            error: Some(error.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_builder() {
        let triple = Triple::new("marie curie", "discovered", "radium")
            .with_source_chunk(3)
            .with_confidence(0.9);

        assert_eq!(triple.subject, "marie curie");
        assert_eq!(triple.source_chunk, Some(3));
        assert_eq!(triple.confidence, Some(0.9));
    }

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("e1", "Scientist").with_property("name", "Marie Curie");

        assert_eq!(entity.entity_type, "Scientist");
        assert_eq!(
            entity.properties.get("name"),
            Some(&serde_json::json!("Marie Curie"))
        );
        assert!(!entity.flagged);
    }

    #[test]
    fn test_items_append_same_mode() {
        let mut items = ExtractedItems::Triples(vec![Triple::new("a", "b", "c")]);
        items.append(ExtractedItems::Triples(vec![Triple::new("d", "e", "f")]));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_empty_items_for_mode() {
        assert!(ExtractedItems::empty(ExtractionMode::Triples).is_empty());
        assert!(ExtractedItems::empty(ExtractionMode::JsonLd).is_empty());
    }

    #[test]
    fn test_outcome_states() {
        let result = ExtractionResult::new(
            ExtractionMode::Triples,
            ExtractedItems::Triples(Vec::new()),
            Statistics::default(),
        );

        let ok = PipelineOutcome::ok(result);
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = PipelineOutcome::failed("ontology missing");
        assert!(!failed.success);
        assert!(failed.result.is_none());
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::ModelCall.to_string(), "model_call");
        assert_eq!(FailureReason::Parse.to_string(), "parse");
    }

    #[test]
    fn test_entity_serde_type_field() {
        let entity = Entity::new("e1", "Person");
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "Person");
        // flagged=false is omitted
        assert!(json.get("flagged").is_none());
    }
}
