use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::{
    config::{CorsPolicy, ServerSettings, Settings},
    embedding::DEFAULT_EMBEDDING_MODEL,
    error::Result,
    generation::{DEFAULT_GENERATION_MODEL, DecodingParams},
    responder::{DEFAULT_TOP_K, ResponderConfig, SearchKey},
};

#[derive(Debug, Parser)]
#[command(
    name = "projectqa",
    about = "Ask questions about project records with local \
             retrieval-augmented generation"
)]
pub struct Cli {
    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP question-answering service
    Serve(ServeArgs),
    /// Answer a single question and exit
    Ask(AskArgs),
    /// Print the projected documents and their risk status
    Documents(DocumentsArgs),
}

// -- Model and retrieval options shared by `serve` and `ask` --

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// Embedding model: HuggingFace repository or local directory
    #[arg(
        long,
        env = "PROJECTQA_EMBEDDING_MODEL",
        default_value = DEFAULT_EMBEDDING_MODEL
    )]
    pub embedding_model: String,

    /// Sequence-to-sequence model: HuggingFace repository or local directory
    #[arg(
        long,
        env = "PROJECTQA_GENERATION_MODEL",
        default_value = DEFAULT_GENERATION_MODEL
    )]
    pub generation_model: String,

    /// JSON file with project records (defaults to the built-in dataset)
    #[arg(long, env = "PROJECTQA_RECORDS")]
    pub records: Option<PathBuf>,

    /// Number of documents retrieved per question
    #[arg(long, env = "PROJECTQA_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Text used as the retrieval query
    #[arg(
        long,
        env = "PROJECTQA_SEARCH_KEY",
        value_enum,
        default_value_t = SearchKey::Prompt
    )]
    pub search_key: SearchKey,

    /// Add a computed risk summary of the retrieved records to the context
    #[arg(long, env = "PROJECTQA_ANNOTATE_RISK")]
    pub annotate_risk: bool,

    /// Maximum number of generated tokens
    #[arg(long, env = "PROJECTQA_MAX_OUTPUT_LENGTH", default_value = "1024")]
    pub max_output_length: usize,

    /// Sample instead of greedy decoding (answers stop being reproducible)
    #[arg(long, env = "PROJECTQA_SAMPLE")]
    pub sample: bool,

    /// Sampling temperature (only with --sample)
    #[arg(long, env = "PROJECTQA_TEMPERATURE", default_value = "0.3")]
    pub temperature: f64,

    /// Nucleus sampling threshold (only with --sample)
    #[arg(long, env = "PROJECTQA_TOP_P", default_value = "0.85")]
    pub top_p: f64,

    /// Penalty applied to already generated tokens
    #[arg(long, env = "PROJECTQA_REPETITION_PENALTY", default_value = "1.2")]
    pub repetition_penalty: f32,

    /// Seed for sampling
    #[arg(long, env = "PROJECTQA_SEED", default_value = "299792458")]
    pub seed: u64,
}

impl ModelArgs {
    pub fn settings(&self) -> Result<Settings> {
        let settings = Settings {
            embedding_model: self.embedding_model.clone(),
            generation_model: self.generation_model.clone(),
            records: self.records.clone(),
            responder: ResponderConfig {
                top_k: self.top_k,
                search_key: self.search_key,
                annotate_risk: self.annotate_risk,
            },
            decoding: DecodingParams {
                max_output_length: self.max_output_length,
                sample: self.sample,
                temperature: self.temperature,
                top_p: self.top_p,
                repetition_penalty: self.repetition_penalty,
                seed: self.seed,
            },
        };
        settings.validate()?;
        Ok(settings)
    }
}

// -- Serve --

#[derive(Debug, Parser)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Address to listen on
    #[arg(long, env = "PROJECTQA_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Allowed browser origin; repeatable, `*` allows any origin
    #[arg(
        long = "cors-origin",
        env = "PROJECTQA_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// Allow credentialed cross-origin requests
    #[arg(long, env = "PROJECTQA_CORS_ALLOW_CREDENTIALS")]
    pub cors_allow_credentials: bool,

    /// Send no CORS headers at all
    #[arg(
        long,
        conflicts_with_all = ["cors_origins", "cors_allow_credentials"]
    )]
    pub no_cors: bool,
}

impl ServeArgs {
    pub fn server_settings(&self) -> ServerSettings {
        let cors = if self.no_cors {
            CorsPolicy::Disabled
        } else {
            CorsPolicy::from_origins(
                &self.cors_origins,
                self.cors_allow_credentials,
            )
        };
        ServerSettings {
            bind: self.bind,
            cors,
        }
    }
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Print the answer as JSON (same shape as the HTTP response)
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

// -- Documents --

#[derive(Debug, Parser)]
pub struct DocumentsArgs {
    /// JSON file with project records (defaults to the built-in dataset)
    #[arg(long, env = "PROJECTQA_RECORDS")]
    pub records: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
