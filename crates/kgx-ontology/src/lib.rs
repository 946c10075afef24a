//! KGX Ontology - OWL/RDF-XML loading and shallow structural validation
//!
//! Loads an ontology once per pipeline run into a read-only class/property
//! table and answers two questions for the JSON-LD extractor:
//! - is this entity type a declared class?
//! - is this property declared, with a domain/range compatible with the
//!   linked entity types?
//!
//! Subclass relationships are respected via a parent-chain walk. This is
//! structural validation only; there is no OWL inference.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{NamedOrBlankNode, Term};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
const RDFS_RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while loading an ontology. All of these are fatal for a
/// JSON-LD run: extraction cannot proceed without a usable ontology.
#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("Ontology file not found: {0}")]
    NotFound(String),

    #[error("IO error reading ontology {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ontology parse error: {0}")]
    Parse(String),

    #[error("Ontology declares no classes or properties")]
    Empty,
}

pub type Result<T> = std::result::Result<T, OntologyError>;

// ============================================================================
// Ontology Model
// ============================================================================

/// A declared ontology class
#[derive(Debug, Clone, Serialize)]
pub struct ClassDef {
    pub name: String,
    pub label: Option<String>,
    /// Parent class local name, if declared via rdfs:subClassOf
    pub parent: Option<String>,
}

/// Property kind, from the OWL declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Object,
    Datatype,
}

/// Declared range of a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyRange {
    /// Range is an ontology class (object property)
    Class(String),
    /// Range is an XSD datatype (datatype property)
    Datatype(String),
}

/// A declared ontology property
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
    pub domain: Option<String>,
    pub range: Option<PropertyRange>,
}

/// The object position being validated against a property's range
#[derive(Debug, Clone, Copy)]
pub enum PropertyObject<'a> {
    /// Object is an entity of the given type
    Entity(&'a str),
    /// Object is a literal value
    Literal,
}

/// Read-only class/property table loaded from an OWL/RDF-XML source.
/// Safe to share across concurrent chunk validations.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    classes: BTreeMap<String, ClassDef>,
    properties: BTreeMap<String, PropertyDef>,
}

impl Ontology {
    /// Load an ontology from an OWL/RDF-XML file. Fails fast on a missing
    /// or unparseable source; unsupported constructs are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OntologyError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| OntologyError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_rdf_xml(&content)
    }

    /// Parse an ontology from RDF/XML text
    pub fn from_rdf_xml(data: &str) -> Result<Self> {
        let parser = RdfParser::from_format(RdfFormat::RdfXml);

        // (subject IRI, predicate IRI, object term) for named-node subjects;
        // blank-node constructs (restrictions, axioms) are skipped.
        let mut statements: Vec<(String, String, Term)> = Vec::new();

        for quad in parser.for_reader(data.as_bytes()) {
            let quad = quad.map_err(|e| OntologyError::Parse(e.to_string()))?;
            if let NamedOrBlankNode::NamedNode(subject) = &quad.subject {
                statements.push((
                    subject.as_str().to_string(),
                    quad.predicate.as_str().to_string(),
                    quad.object.clone(),
                ));
            }
        }

        let mut ontology = Self::default();

        // First pass: declarations
        for (subject, predicate, object) in &statements {
            if predicate != RDF_TYPE {
                continue;
            }
            let Term::NamedNode(type_iri) = object else {
                continue;
            };
            let name = local_name(subject);
            if name.is_empty() {
                continue;
            }
            match type_iri.as_str() {
                OWL_CLASS | RDFS_CLASS => {
                    ontology.classes.entry(name.clone()).or_insert(ClassDef {
                        name,
                        label: None,
                        parent: None,
                    });
                }
                OWL_OBJECT_PROPERTY => {
                    ontology
                        .properties
                        .entry(name.clone())
                        .or_insert(PropertyDef {
                            name,
                            kind: PropertyKind::Object,
                            domain: None,
                            range: None,
                        });
                }
                OWL_DATATYPE_PROPERTY => {
                    ontology
                        .properties
                        .entry(name.clone())
                        .or_insert(PropertyDef {
                            name,
                            kind: PropertyKind::Datatype,
                            domain: None,
                            range: None,
                        });
                }
                _ => {}
            }
        }

        // Second pass: hierarchy, labels, domain/range
        for (subject, predicate, object) in &statements {
            let name = local_name(subject);
            match predicate.as_str() {
                RDFS_SUBCLASS_OF => {
                    if let (Some(class), Term::NamedNode(parent)) =
                        (ontology.classes.get_mut(&name), object)
                    {
                        class.parent = Some(local_name(parent.as_str()));
                    }
                }
                RDFS_LABEL => {
                    if let (Some(class), Term::Literal(label)) =
                        (ontology.classes.get_mut(&name), object)
                    {
                        class.label = Some(label.value().to_string());
                    }
                }
                RDFS_DOMAIN => {
                    if let (Some(prop), Term::NamedNode(domain)) =
                        (ontology.properties.get_mut(&name), object)
                    {
                        prop.domain = Some(local_name(domain.as_str()));
                    }
                }
                RDFS_RANGE => {
                    if let (Some(prop), Term::NamedNode(range)) =
                        (ontology.properties.get_mut(&name), object)
                    {
                        let iri = range.as_str();
                        prop.range = Some(if iri.starts_with(XSD_NS) {
                            PropertyRange::Datatype(local_name(iri))
                        } else {
                            PropertyRange::Class(local_name(iri))
                        });
                    }
                }
                _ => {}
            }
        }

        if ontology.classes.is_empty() && ontology.properties.is_empty() {
            return Err(OntologyError::Empty);
        }

        debug!(
            classes = ontology.classes.len(),
            properties = ontology.properties.len(),
            "ontology loaded"
        );

        Ok(ontology)
    }

    /// Check whether a type name is a declared class
    pub fn is_valid_type(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Check whether `class` equals `ancestor` or has it anywhere in its
    /// parent chain. A visited set guards against subclass cycles.
    pub fn is_subclass_or_self(&self, class: &str, ancestor: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(class);

        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            if !visited.insert(name) {
                break;
            }
            current = self
                .classes
                .get(name)
                .and_then(|c| c.parent.as_deref());
        }
        false
    }

    /// Check whether a property is declared and compatible with the given
    /// subject type and object. Undeclared domain/range is permissive; a
    /// declared one must match directly or through the subclass chain.
    pub fn is_valid_property(
        &self,
        name: &str,
        subject_type: &str,
        object: PropertyObject<'_>,
    ) -> bool {
        let Some(prop) = self.properties.get(name) else {
            return false;
        };

        if let Some(domain) = &prop.domain {
            if !self.is_subclass_or_self(subject_type, domain) {
                return false;
            }
        }

        match (&prop.range, object) {
            (Some(PropertyRange::Class(range)), PropertyObject::Entity(object_type)) => {
                self.is_subclass_or_self(object_type, range)
            }
            (Some(PropertyRange::Class(_)), PropertyObject::Literal) => false,
            (Some(PropertyRange::Datatype(_)), PropertyObject::Literal) => true,
            (Some(PropertyRange::Datatype(_)), PropertyObject::Entity(_)) => false,
            // No declared range: accept either shape, but object properties
            // still expect an entity on the object side.
            (None, PropertyObject::Entity(_)) => true,
            (None, PropertyObject::Literal) => prop.kind == PropertyKind::Datatype,
        }
    }

    /// Look up a declared property
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Summary of the class/property catalogue, for prompt embedding and
    /// CLI inspection
    pub fn summary(&self) -> OntologySummary {
        let mut object_properties = Vec::new();
        let mut data_properties = Vec::new();
        for prop in self.properties.values() {
            match prop.kind {
                PropertyKind::Object => object_properties.push(prop.clone()),
                PropertyKind::Datatype => data_properties.push(prop.clone()),
            }
        }

        OntologySummary {
            classes: self.classes.values().cloned().collect(),
            object_properties,
            data_properties,
        }
    }
}

// ============================================================================
// Summary for prompts
// ============================================================================

/// A rendering-friendly view of the loaded ontology
#[derive(Debug, Clone, Serialize)]
pub struct OntologySummary {
    pub classes: Vec<ClassDef>,
    pub object_properties: Vec<PropertyDef>,
    pub data_properties: Vec<PropertyDef>,
}

impl OntologySummary {
    /// Render the catalogue as prompt text: one line per class and
    /// property, with domain/range annotations where declared.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("Classes:\n");
        for class in &self.classes {
            match &class.parent {
                Some(parent) => {
                    out.push_str(&format!("- {} (subclass of {})\n", class.name, parent))
                }
                None => out.push_str(&format!("- {}\n", class.name)),
            }
        }

        out.push_str("Object properties:\n");
        for prop in &self.object_properties {
            out.push_str(&format!("- {}{}\n", prop.name, render_signature(prop)));
        }

        out.push_str("Data properties:\n");
        for prop in &self.data_properties {
            out.push_str(&format!("- {}{}\n", prop.name, render_signature(prop)));
        }

        out
    }
}

fn render_signature(prop: &PropertyDef) -> String {
    let domain = prop.domain.as_deref().unwrap_or("Any");
    let range = match &prop.range {
        Some(PropertyRange::Class(c)) => c.as_str(),
        Some(PropertyRange::Datatype(d)) => d.as_str(),
        None => "Any",
    };
    format!(" ({} -> {})", domain, range)
}

/// Local name of an IRI: fragment if present, else the last path segment
fn local_name(iri: &str) -> String {
    let name = match iri.rsplit_once('#') {
        Some((_, frag)) if !frag.is_empty() => frag,
        _ => iri.rsplit('/').next().unwrap_or(iri),
    };
    name.to_string()
}

// ============================================================================
// Tests
// ============================================================================
