use std::collections::HashSet;

use rayon::prelude::*;

use crate::{
    document::Document,
    embedding::Embedder,
    error::{Error, Result},
};

/// A retrieved document with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredDocument<'a> {
    pub document: &'a Document,
    pub score: f32,
}

/// Nearest-neighbor lookup over a fixed set of documents.
pub trait VectorIndex: Send + Sync {
    /// Up to `k` documents most similar to `query`, best first.
    fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument<'_>>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact cosine-similarity index held in memory. Built once; there is no
/// way to add or remove entries afterwards.
pub struct InMemoryIndex {
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl std::fmt::Debug for InMemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIndex")
            .field("documents", &self.documents.len())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl InMemoryIndex {
    /// Embed every document body (one embedder call for the whole set) and
    /// index the resulting vectors.
    ///
    /// Rejects an empty document set and duplicate project names, so each
    /// indexed document traces back to exactly one record.
    pub fn build(
        documents: Vec<Document>,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::Config("no documents to index".to_string()));
        }

        let mut seen = HashSet::new();
        for doc in &documents {
            if !seen.insert(doc.project_name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate project name: {}",
                    doc.project_name
                )));
            }
        }

        let bodies: Vec<&str> =
            documents.iter().map(|d| d.body.as_str()).collect();
        let vectors = embedder.embed_batch(&bodies)?;
        if vectors.len() != documents.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                documents.len(),
                vectors.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
            return Err(Error::Embedding(
                "document vectors have inconsistent dimensions".to_string(),
            ));
        }

        tracing::info!(
            documents = documents.len(),
            dimension,
            model = embedder.model_id(),
            "vector index built"
        );

        Ok(Self {
            documents,
            vectors,
            dimension,
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl VectorIndex for InMemoryIndex {
    fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument<'_>>> {
        if query.len() != self.dimension {
            return Err(Error::Retrieval(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .par_iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v)))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredDocument {
                document: &self.documents[i],
                score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}
