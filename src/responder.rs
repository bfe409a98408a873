use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    document::{self, Document},
    embedding::Embedder,
    error::Result,
    generation::Generator,
    index::{InMemoryIndex, ScoredDocument, VectorIndex},
    prompt,
    records::ProjectRecord,
};

/// Characters of each retrieved document returned as provenance.
pub const SOURCE_SNIPPET_CHARS: usize = 200;

pub const DEFAULT_TOP_K: usize = 5;

/// Which text drives retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SearchKey {
    /// The whole instruction prompt, question included. Retrieval is then
    /// partly steered by the fixed instruction text.
    #[default]
    Prompt,
    /// Only the caller's question.
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderConfig {
    pub top_k: usize,
    pub search_key: SearchKey,
    /// Append a code-computed risk summary of the retrieved records to the
    /// model context.
    pub annotate_risk: bool,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            search_key: SearchKey::default(),
            annotate_risk: false,
        }
    }
}

/// The answer to one question plus the snippets it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Retrieval-augmented question answering over the record set.
///
/// Built once at startup; every operation takes `&self`, so a single
/// instance can be shared behind an `Arc` for the life of the process.
pub struct Responder {
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    generator: Box<dyn Generator>,
    records: HashMap<String, ProjectRecord>,
    config: ResponderConfig,
}

impl Responder {
    /// Project the records, embed them into an in-memory index and wire the
    /// result to `generator`.
    pub fn build(
        records: Vec<ProjectRecord>,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
        config: ResponderConfig,
    ) -> Result<Self> {
        let documents = document::project_all(&records);
        let index = InMemoryIndex::build(documents, embedder.as_ref())?;
        Ok(Self::new(records, embedder, Box::new(index), generator, config))
    }

    /// Assemble from an already-built index.
    pub fn new(
        records: Vec<ProjectRecord>,
        embedder: Box<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        generator: Box<dyn Generator>,
        config: ResponderConfig,
    ) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.project_name.clone(), r))
            .collect();
        Self {
            embedder,
            index,
            generator,
            records,
            config,
        }
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    pub fn document_count(&self) -> usize {
        self.index.len()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn generation_model(&self) -> &str {
        self.generator.model_id()
    }

    /// The documents `question` would be answered from, best first.
    pub fn retrieve(&self, question: &str) -> Result<Vec<ScoredDocument<'_>>> {
        let instruction = prompt::instruction(question);
        self.retrieve_for(question, &instruction)
    }

    fn retrieve_for(
        &self,
        question: &str,
        instruction: &str,
    ) -> Result<Vec<ScoredDocument<'_>>> {
        let key = match self.config.search_key {
            SearchKey::Prompt => instruction,
            SearchKey::Question => question,
        };
        let query = self.embedder.embed(key)?;
        self.index.search(&query, self.config.top_k)
    }

    /// Answer `question` from the top-k retrieved documents.
    ///
    /// Failures in embedding, search or generation are returned as-is; no
    /// partial answer is produced.
    pub fn respond(&self, question: &str) -> Result<Answer> {
        let instruction = prompt::instruction(question);
        let retrieved = self.retrieve_for(question, &instruction)?;
        let documents: Vec<&Document> =
            retrieved.iter().map(|s| s.document).collect();

        tracing::debug!(
            retrieved = ?documents
                .iter()
                .map(|d| d.project_name.as_str())
                .collect::<Vec<_>>(),
            "retrieved documents"
        );

        let notes = self.config.annotate_risk.then(|| {
            let records: Vec<&ProjectRecord> = documents
                .iter()
                .filter_map(|d| self.records.get(&d.project_name))
                .collect();
            prompt::risk_summary(&records)
        });
        let model_input =
            prompt::stuff(&documents, &instruction, notes.as_deref());

        let answer = self.generator.generate(&model_input)?;
        let sources = documents
            .iter()
            .map(|d| d.snippet(SOURCE_SNIPPET_CHARS).to_string())
            .collect();

        tracing::info!(
            question_chars = question.chars().count(),
            sources = documents.len(),
            "answered question"
        );

        Ok(Answer { answer, sources })
    }
}
