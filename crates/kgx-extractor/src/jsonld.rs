//! Ontology-guided JSON-LD extraction

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use kgx_core::{
    Chunk, ChunkFailure, Entity, ExtractedItems, ExtractionMode, FailureReason, Relation,
    RelationObject,
};
use kgx_llm::ModelClient;
use kgx_ontology::{Ontology, PropertyObject, PropertyRange};

use crate::prompt::PromptBuilder;
use crate::response;
use crate::{ChunkExtraction, Extractor};

/// Extracts typed entities and relations constrained by an ontology
pub struct JsonLdExtractor {
    client: Arc<dyn ModelClient>,
    prompts: PromptBuilder,
    ontology: Arc<Ontology>,
    enable_validation: bool,
}

impl JsonLdExtractor {
    pub fn new(client: Arc<dyn ModelClient>, ontology: Arc<Ontology>, enable_validation: bool) -> Self {
        let prompts = PromptBuilder::jsonld(&ontology.summary());
        Self {
            client,
            prompts,
            ontology,
            enable_validation,
        }
    }
}

#[async_trait]
impl Extractor for JsonLdExtractor {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::JsonLd
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

        let nodes = match response::parse_graph_nodes(&raw, chunk.index) {
            Ok(nodes) => nodes,
            Err(failure) => {
                warn!(chunk = chunk.index, detail = %failure.detail, "unparseable model output");
                return ChunkExtraction::failed(self.mode(), failure);
            }
        };

        let mut failures = Vec::new();
        let mut entities = Vec::new();
        let mut relations = Vec::new();

        for node in &nodes {
            match parse_node(node, chunk.index) {
                Ok((entity, edges)) => {
                    entities.push(entity);
                    relations.extend(edges);
                }
                Err(detail) => failures.push(ChunkFailure {
                    chunk_index: chunk.index,
                    reason: FailureReason::Validation,
                    detail,
                }),
            }
        }

        if self.enable_validation {
            (entities, relations) =
                self.validate(entities, relations, chunk.index, &mut failures);
        } else {
            // keep everything, but mark entities the ontology does not know
            for entity in &mut entities {
                if !self.ontology.is_valid_type(&entity.entity_type) {
                    entity.flagged = true;
                }
            }
        }

        debug!(
            chunk = chunk.index,
            entities = entities.len(),
            relations = relations.len(),
            rejected = failures.len(),
            "chunk extraction complete"
        );

        ChunkExtraction {
            items: ExtractedItems::Graph {
                entities,
                relations,
            },
            failures,
        }
    }
}

impl JsonLdExtractor {
    /// Apply ontology validation: unknown-type entities are dropped along
    /// with their relations, undeclared or incompatible properties are
    /// dropped from the surviving entities. Every drop is reported.
    fn validate(
        &self,
        entities: Vec<Entity>,
        relations: Vec<Relation>,
        chunk_index: usize,
        failures: &mut Vec<ChunkFailure>,
    ) -> (Vec<Entity>, Vec<Relation>) {
        let mut report = |detail: String| {
            failures.push(ChunkFailure {
                chunk_index,
                reason: FailureReason::Validation,
                detail,
            });
        };

        let mut kept_entities = Vec::new();
        for mut entity in entities {
            if !self.ontology.is_valid_type(&entity.entity_type) {
                report(format!(
                    "unknown type \"{}\" for entity \"{}\"",
                    entity.entity_type, entity.id
                ));
                continue;
            }

            let mut bad_properties = Vec::new();
            for name in entity.properties.keys() {
                if !self
                    .ontology
                    .is_valid_property(name, &entity.entity_type, PropertyObject::Literal)
                {
                    bad_properties.push(name.clone());
                }
            }
            for name in bad_properties {
                report(format!(
                    "property \"{}\" not valid for type \"{}\" on entity \"{}\"",
                    name, entity.entity_type, entity.id
                ));
                entity.properties.remove(&name);
            }

            kept_entities.push(entity);
        }

        let types_by_id: HashMap<&str, &str> = kept_entities
            .iter()
            .map(|e| (e.id.as_str(), e.entity_type.as_str()))
            .collect();

        let mut kept_relations = Vec::new();
        for relation in relations {
            let Some(subject_type) = types_by_id.get(relation.subject.as_str()) else {
                report(format!(
                    "relation \"{}\" from dropped or unknown entity \"{}\"",
                    relation.property, relation.subject
                ));
                continue;
            };

            let valid = match &relation.object {
                RelationObject::EntityRef { id } => match types_by_id.get(id.as_str()) {
                    Some(object_type) => self.ontology.is_valid_property(
                        &relation.property,
                        subject_type,
                        PropertyObject::Entity(object_type),
                    ),
                    // target outside this chunk: check what we can without
                    // its type
                    None => self.declared_object_property(&relation.property, subject_type),
                },
                RelationObject::Literal(_) => self.ontology.is_valid_property(
                    &relation.property,
                    subject_type,
                    PropertyObject::Literal,
                ),
            };

            if valid {
                kept_relations.push(relation);
            } else {
                report(format!(
                    "relation \"{}\" invalid for subject \"{}\" ({})",
                    relation.property, relation.subject, subject_type
                ));
            }
        }

        (kept_entities, kept_relations)
    }

    /// Domain-only check for relations whose object type cannot be
    /// resolved within the chunk
    fn declared_object_property(&self, name: &str, subject_type: &str) -> bool {
        let Some(prop) = self.ontology.property(name) else {
            return false;
        };
        if matches!(prop.range, Some(PropertyRange::Datatype(_))) {
            return false;
        }
        match &prop.domain {
            Some(domain) => self.ontology.is_subclass_or_self(subject_type, domain),
            None => true,
        }
    }
}

/// Parse one `@graph` node into an entity and its outgoing relations
///
/// Values shaped `{"@id": ...}` become entity-reference relations, plain
/// values become literal properties. Array values are unpacked
/// element-wise the same way.
fn parse_node(node: &Value, chunk_index: usize) -> Result<(Entity, Vec<Relation>), String> {
    let obj = node
        .as_object()
        .ok_or_else(|| format!("graph node is not an object: {node}"))?;

    let id = obj
        .get("@id")
        .or_else(|| obj.get("id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("graph node missing @id: {node}"))?;

    let entity_type = node_type(obj).ok_or_else(|| format!("graph node missing @type: {node}"))?;

    let mut entity = Entity::new(id, entity_type);
    entity.source_chunk = Some(chunk_index);
    let mut relations = Vec::new();

    for (key, value) in obj {
        if key.starts_with('@') || key == "id" || key == "type" {
            continue;
        }
        match value {
            Value::Array(items) => {
                let mut literals = Vec::new();
                for item in items {
                    match entity_ref(item) {
                        Some(target) => relations.push(edge(id, key, target, chunk_index)),
                        None => literals.push(item.clone()),
                    }
                }
                if !literals.is_empty() {
                    entity.properties.insert(key.clone(), Value::Array(literals));
                }
            }
            other => match entity_ref(other) {
                Some(target) => relations.push(edge(id, key, target, chunk_index)),
                None => {
                    entity.properties.insert(key.clone(), other.clone());
                }
            },
        }
    }

    Ok((entity, relations))
}

fn node_type(obj: &serde_json::Map<String, Value>) -> Option<String> {
    let value = obj.get("@type").or_else(|| obj.get("type"))?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        _ => None,
    }
}

fn entity_ref(value: &Value) -> Option<&str> {
    value.as_object()?.get("@id")?.as_str()
}

fn edge(subject: &str, property: &str, target: &str, chunk_index: usize) -> Relation {
    Relation {
        subject: subject.to_string(),
        property: property.to_string(),
        object: RelationObject::EntityRef {
            id: target.to_string(),
        },
        source_chunk: Some(chunk_index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModelClient;

    const FIXTURE: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
         xmlns:owl="http://www.w3.org/2002/07/owl#"
         xml:base="http://example.org/onto">
  <owl:Class rdf:about="http://example.org/onto#Person"/>
  <owl:Class rdf:about="http://example.org/onto#Scientist">
    <rdfs:subClassOf rdf:resource="http://example.org/onto#Person"/>
  </owl:Class>
  <owl:Class rdf:about="http://example.org/onto#ChemicalElement"/>
  <owl:ObjectProperty rdf:about="http://example.org/onto#discovered">
    <rdfs:domain rdf:resource="http://example.org/onto#Scientist"/>
    <rdfs:range rdf:resource="http://example.org/onto#ChemicalElement"/>
  </owl:ObjectProperty>
  <owl:DatatypeProperty rdf:about="http://example.org/onto#hasName">
    <rdfs:domain rdf:resource="http://example.org/onto#Person"/>
    <rdfs:range rdf:resource="http://www.w3.org/2001/XMLSchema#string"/>
  </owl:DatatypeProperty>
</rdf:RDF>"#;

    fn ontology() -> Arc<Ontology> {
        Arc::new(Ontology::from_rdf_xml(FIXTURE).unwrap())
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            index: 0,
            start_word: 0,
            end_word: text.split_whitespace().count(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_extracts_entities_and_relations() {
        let raw = r#"{"@graph":[
            {"@id":"curie","@type":"Scientist","hasName":"marie curie","discovered":{"@id":"polonium"}},
            {"@id":"polonium","@type":"ChemicalElement","hasName":"polonium"}
        ]}"#;
        let client = Arc::new(MockModelClient::with_responses(vec![Ok(raw.to_string())]));
        let extractor = JsonLdExtractor::new(client, ontology(), true);

        let result = extractor.extract(&chunk("text")).await;
        assert!(result.failures.is_empty(), "{:?}", result.failures);
        match result.items {
            ExtractedItems::Graph {
                entities,
                relations,
            } => {
                assert_eq!(entities.len(), 2);
                assert_eq!(entities[0].id, "curie");
                assert_eq!(entities[0].entity_type, "Scientist");
                assert_eq!(entities[0].properties["hasName"], "marie curie");
                assert_eq!(relations.len(), 1);
                assert_eq!(relations[0].property, "discovered");
                assert_eq!(
                    relations[0].object,
                    RelationObject::EntityRef {
                        id: "polonium".to_string()
                    }
                );
            }
            _ => panic!("expected graph"),
        }
    }

    #[tokio::test]
    async fn test_unknown_type_dropped_and_reported() {
        let raw = r#"{"@graph":[
            {"@id":"x","@type":"Spaceship","hasName":"x"},
            {"@id":"curie","@type":"Scientist","hasName":"marie curie"}
        ]}"#;
        let client = Arc::new(MockModelClient::with_responses(vec![Ok(raw.to_string())]));
        let extractor = JsonLdExtractor::new(client, ontology(), true);

        let result = extractor.extract(&chunk("text")).await;
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].detail.contains("Spaceship"));
        assert!(!result.chunk_failed());
    }

    #[tokio::test]
    async fn test_unknown_type_flagged_when_validation_disabled() {
        let raw = r#"{"@graph":[{"@id":"x","@type":"Spaceship"}]}"#;
        let client = Arc::new(MockModelClient::with_responses(vec![Ok(raw.to_string())]));
        let extractor = JsonLdExtractor::new(client, ontology(), false);

        let result = extractor.extract(&chunk("text")).await;
        assert!(result.failures.is_empty());
        match result.items {
            ExtractedItems::Graph { entities, .. } => {
                assert_eq!(entities.len(), 1);
                assert!(entities[0].flagged);
            }
            _ => panic!("expected graph"),
        }
    }

    #[tokio::test]
    async fn test_invalid_relation_dropped_and_reported() {
        // discovered has domain Scientist; ChemicalElement is not one
        let raw = r#"{"@graph":[
            {"@id":"polonium","@type":"ChemicalElement","discovered":{"@id":"curie"}},
            {"@id":"curie","@type":"Scientist"}
        ]}"#;
        let client = Arc::new(MockModelClient::with_responses(vec![Ok(raw.to_string())]));
        let extractor = JsonLdExtractor::new(client, ontology(), true);

        let result = extractor.extract(&chunk("text")).await;
        match result.items {
            ExtractedItems::Graph {
                entities,
                relations,
            } => {
                assert_eq!(entities.len(), 2);
                assert!(relations.is_empty());
            }
            _ => panic!("expected graph"),
        }
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].detail.contains("discovered"));
    }

    #[tokio::test]
    async fn test_node_missing_id_reported() {
        let raw = r#"{"@graph":[{"@type":"Scientist","hasName":"nobody"}]}"#;
        let client = Arc::new(MockModelClient::with_responses(vec![Ok(raw.to_string())]));
        let extractor = JsonLdExtractor::new(client, ontology(), true);

        let result = extractor.extract(&chunk("text")).await;
        assert!(result.items.is_empty());
        assert_eq!(result.failures[0].reason, FailureReason::Validation);
    }

    #[tokio::test]
    async fn test_subclass_satisfies_domain() {
        // hasName domain is Person; Scientist inherits it
        let raw = r#"{"@graph":[{"@id":"curie","@type":"Scientist","hasName":"marie curie"}]}"#;
        let client = Arc::new(MockModelClient::with_responses(vec![Ok(raw.to_string())]));
        let extractor = JsonLdExtractor::new(client, ontology(), true);

        let result = extractor.extract(&chunk("text")).await;
        assert!(result.failures.is_empty());
        assert_eq!(result.items.len(), 1);
    }

    #[test]
    fn test_parse_node_array_values() {
        let node: Value = serde_json::from_str(
            r#"{"@id":"curie","@type":"Scientist",
                "discovered":[{"@id":"polonium"},{"@id":"radium"}],
                "alias":["m. curie","madame curie"]}"#,
        )
        .unwrap();
        let (entity, relations) = parse_node(&node, 2).unwrap();
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[1].source_chunk, Some(2));
        assert_eq!(
            entity.properties["alias"],
            serde_json::json!(["m. curie", "madame curie"])
        );
    }
}
