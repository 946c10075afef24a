//! Prompt assembly for the extraction variants
//!
//! Templates live as text files next to this module and are compiled in
//! with `include_str!`. The user templates carry a `{text_chunk}`
//! placeholder; the JSON-LD templates additionally carry `{ontology}`,
//! filled once at construction from the ontology summary.

use kgx_ontology::OntologySummary;

const TRIPLES_SYSTEM: &str = include_str!("prompts/triples_system.txt");
const TRIPLES_USER: &str = include_str!("prompts/triples_user.txt");
const JSONLD_SYSTEM: &str = include_str!("prompts/jsonld_system.txt");
const JSONLD_USER: &str = include_str!("prompts/jsonld_user.txt");

const TEXT_PLACEHOLDER: &str = "{text_chunk}";
const ONTOLOGY_PLACEHOLDER: &str = "{ontology}";

/// A prepared system prompt plus user-prompt template
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    user_template: String,
}

impl PromptBuilder {
    /// Prompts for plain S-P-O triple extraction
    pub fn triples() -> Self {
        Self {
            system: TRIPLES_SYSTEM.trim_end().to_string(),
            user_template: TRIPLES_USER.to_string(),
        }
    }

    /// Prompts for ontology-guided JSON-LD extraction
    pub fn jsonld(summary: &OntologySummary) -> Self {
        let rendered = summary.render();
        Self {
            system: JSONLD_SYSTEM.trim_end().to_string(),
            user_template: JSONLD_USER.replace(ONTOLOGY_PLACEHOLDER, &rendered),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    /// Fill the chunk text into the user template
    pub fn user_prompt(&self, chunk_text: &str) -> String {
        self.user_template.replace(TEXT_PLACEHOLDER, chunk_text)
    }
}
