//! projectqa - answer free-text questions about a fixed set of project
//! records with local retrieval-augmented generation.
//!
//! At startup every [`ProjectRecord`] is flattened into a text
//! [`Document`], embedded with a sentence-transformers BERT model and put in
//! an immutable in-memory vector index. Each question is answered by
//! retrieving the closest documents, stuffing them into a prompt and running
//! a local T5 model with deterministic decoding.
//!
//! # Quick start
//!
//! ```no_run
//! use projectqa::{
//!     BertEmbedder,
//!     Responder,
//!     T5Generator,
//!     generation::DecodingParams,
//!     records,
//!     responder::ResponderConfig,
//! };
//!
//! let embedder =
//!     BertEmbedder::load("sentence-transformers/all-MiniLM-L6-v2")?;
//! let generator =
//!     T5Generator::load("google/flan-t5-large", DecodingParams::default())?;
//! let responder = Responder::build(
//!     records::builtin(),
//!     Box::new(embedder),
//!     Box::new(generator),
//!     ResponderConfig::default(),
//! )?;
//!
//! let answer = responder.respond("Which projects are at risk?")?;
//! println!("{}", answer.answer);
//! for source in &answer.sources {
//!     println!("--- {source}");
//! }
//! # Ok::<(), projectqa::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod doc_id;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod model_files;
pub mod prompt;
pub mod records;
pub mod responder;
pub mod server;

pub use config::{CorsPolicy, Settings};
pub use doc_id::DocumentId;
pub use document::Document;
pub use embedding::{BertEmbedder, Embedder};
pub use error::{Error, Result};
pub use generation::{Generator, T5Generator};
pub use index::{InMemoryIndex, VectorIndex};
pub use records::ProjectRecord;
pub use responder::{Answer, Responder};
