pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("question must not be empty")]
    EmptyQuestion,
}

impl Error {
    pub(crate) fn model_load(
        model: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::ModelLoad {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyQuestion)
    }
}
