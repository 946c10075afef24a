//! Normalization and deduplication of extracted items
//!
//! Text normalization is trim + lowercase + whitespace collapse.
//! Deduplication keys on the normalized form and keeps the first
//! occurrence, so output order follows first appearance in chunk order
//! and the whole pass is deterministic and idempotent.

use std::collections::HashSet;

use serde_json::Value;

use kgx_core::{Entity, ExtractedItems, PropertyConflict, Relation, RelationObject, Triple};

/// Trim, lowercase, and collapse internal whitespace runs to one space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Result of a normalization pass over one run's items
#[derive(Debug)]
pub struct NormalizeReport {
    pub items: ExtractedItems,
    pub duplicates_removed: usize,
    pub conflicts: Vec<PropertyConflict>,
}

/// Normalize and deduplicate a full item set
pub fn normalize_items(items: ExtractedItems) -> NormalizeReport {
    match items {
        ExtractedItems::Triples(triples) => {
            let (unique, removed) = dedup_triples(triples);
            NormalizeReport {
                items: ExtractedItems::Triples(unique),
                duplicates_removed: removed,
                conflicts: Vec::new(),
            }
        }
        ExtractedItems::Graph {
            entities,
            relations,
        } => {
            let (entities, conflicts, entities_removed) = merge_entities(entities);
            let (relations, relations_removed) = dedup_relations(relations);
            NormalizeReport {
                items: ExtractedItems::Graph {
                    entities,
                    relations,
                },
                duplicates_removed: entities_removed + relations_removed,
                conflicts,
            }
        }
    }
}

/// Normalize triples and drop duplicates, first occurrence wins
///
/// The kept triple is stored in normalized form. Confidence and source
/// chunk of the first occurrence are retained.
pub fn dedup_triples(triples: Vec<Triple>) -> (Vec<Triple>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut removed = 0;

    for triple in triples {
        let subject = normalize_text(&triple.subject);
        let predicate = normalize_text(&triple.predicate);
        let object = normalize_text(&triple.object);

        let key = format!("{subject}\u{1f}{predicate}\u{1f}{object}");
        if seen.insert(key) {
            unique.push(Triple {
                subject,
                predicate,
                object,
                confidence: triple.confidence,
                source_chunk: triple.source_chunk,
            });
        } else {
            removed += 1;
        }
    }

    (unique, removed)
}

/// Merge entities that share a normalized id
///
/// The first occurrence fixes the id spelling, type, and any contested
/// property value; later occurrences contribute only properties the
/// first did not set. Contested values are recorded as conflicts.
pub fn merge_entities(entities: Vec<Entity>) -> (Vec<Entity>, Vec<PropertyConflict>, usize) {
    let mut order: Vec<String> = Vec::new();
    let mut merged: std::collections::HashMap<String, Entity> = std::collections::HashMap::new();
    let mut conflicts = Vec::new();
    let mut removed = 0;

    for entity in entities {
        let key = normalize_text(&entity.id);
        match merged.get_mut(&key) {
            None => {
                order.push(key.clone());
                merged.insert(key, entity);
            }
            Some(existing) => {
                removed += 1;
                existing.flagged |= entity.flagged;
                for (name, value) in entity.properties {
                    match existing.properties.get(&name) {
                        None => {
                            existing.properties.insert(name, value);
                        }
                        Some(kept) if *kept == value => {}
                        Some(kept) => conflicts.push(PropertyConflict {
                            entity_id: existing.id.clone(),
                            property: name,
                            kept: kept.clone(),
                            discarded: value,
                        }),
                    }
                }
            }
        }
    }

    let entities = order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect();
    (entities, conflicts, removed)
}

/// Drop duplicate relations, first occurrence wins
pub fn dedup_relations(relations: Vec<Relation>) -> (Vec<Relation>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut removed = 0;

    for relation in relations {
        let object_key = match &relation.object {
            RelationObject::EntityRef { id } => format!("ref\u{1f}{}", normalize_text(id)),
            RelationObject::Literal(value) => format!("lit\u{1f}{}", literal_key(value)),
        };
        let key = format!(
            "{}\u{1f}{}\u{1f}{object_key}",
            normalize_text(&relation.subject),
            normalize_text(&relation.property)
        );
        if seen.insert(key) {
            unique.push(relation);
        } else {
            removed += 1;
        }
    }

    (unique, removed)
}

fn literal_key(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_text(s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Marie   Curie \n"), "marie curie");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("  \t "), "");
    }

    #[test]
    fn test_dedup_triples_case_and_whitespace_insensitive() {
        let triples = vec![
            Triple::new("Marie Curie", "discovered", "Polonium").with_source_chunk(0),
            Triple::new("marie  curie", "Discovered", "polonium").with_source_chunk(1),
            Triple::new("marie curie", "discovered", "radium").with_source_chunk(1),
        ];

        let (unique, removed) = dedup_triples(triples);
        assert_eq!(unique.len(), 2);
        assert_eq!(removed, 1);
        // first occurrence wins, stored normalized
        assert_eq!(unique[0].subject, "marie curie");
        assert_eq!(unique[0].source_chunk, Some(0));
        assert_eq!(unique[1].object, "radium");
    }

    #[test]
    fn test_dedup_triples_idempotent() {
        let triples = vec![
            Triple::new("a", "b", "c"),
            Triple::new("A", "b", "c"),
            Triple::new("d", "e", "f"),
        ];
        let (once, _) = dedup_triples(triples);
        let (twice, removed) = dedup_triples(once.clone());
        assert_eq!(removed, 0);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.subject, b.subject);
            assert_eq!(a.predicate, b.predicate);
            assert_eq!(a.object, b.object);
        }
    }

    #[test]
    fn test_merge_entities_first_seen_wins() {
        let entities = vec![
            Entity::new("curie", "Scientist").with_property("hasName", "marie curie"),
            Entity::new("Curie", "Scientist")
                .with_property("hasName", "madame curie")
                .with_property("bornIn", "warsaw"),
        ];

        let (merged, conflicts, removed) = merge_entities(entities);
        assert_eq!(merged.len(), 1);
        assert_eq!(removed, 1);
        assert_eq!(merged[0].id, "curie");
        // contested value keeps the first, records the conflict
        assert_eq!(merged[0].properties["hasName"], "marie curie");
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].property, "hasName");
        assert_eq!(conflicts[0].discarded, json!("madame curie"));
        // non-contested property is adopted
        assert_eq!(merged[0].properties["bornIn"], "warsaw");
    }

    #[test]
    fn test_merge_entities_preserves_first_seen_order() {
        let entities = vec![
            Entity::new("b", "Person"),
            Entity::new("a", "Person"),
            Entity::new("B", "Person"),
        ];
        let (merged, _, _) = merge_entities(entities);
        let ids: Vec<&str> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_dedup_relations() {
        let rel = |subject: &str, object: &str| Relation {
            subject: subject.to_string(),
            property: "discovered".to_string(),
            object: RelationObject::EntityRef {
                id: object.to_string(),
            },
            source_chunk: None,
        };
        let relations = vec![rel("curie", "polonium"), rel("Curie", "Polonium"), rel("curie", "radium")];

        let (unique, removed) = dedup_relations(relations);
        assert_eq!(unique.len(), 2);
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_dedup_relations_literal_vs_ref_distinct() {
        let relations = vec![
            Relation {
                subject: "curie".to_string(),
                property: "note".to_string(),
                object: RelationObject::Literal(json!("polonium")),
                source_chunk: None,
            },
            Relation {
                subject: "curie".to_string(),
                property: "note".to_string(),
                object: RelationObject::EntityRef {
                    id: "polonium".to_string(),
                },
                source_chunk: None,
            },
        ];
        let (unique, removed) = dedup_relations(relations);
        assert_eq!(unique.len(), 2);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_normalize_items_counts_graph_duplicates() {
        let items = ExtractedItems::Graph {
            entities: vec![
                Entity::new("curie", "Scientist"),
                Entity::new("CURIE", "Scientist"),
            ],
            relations: Vec::new(),
        };
        let report = normalize_items(items);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.items.len(), 1);
    }
}
