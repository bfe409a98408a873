use std::{net::SocketAddr, path::PathBuf};

use crate::{
    error::{Error, Result},
    generation::DecodingParams,
    responder::ResponderConfig,
};

/// Which origins may call the HTTP service from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// No CORS headers; browsers enforce same-origin.
    Disabled,
    /// Any origin. With credentials the request origin is echoed back,
    /// since a literal `*` cannot be combined with credentials.
    AnyOrigin { allow_credentials: bool },
    /// Only the listed origins.
    Origins {
        origins: Vec<String>,
        allow_credentials: bool,
    },
}

impl CorsPolicy {
    /// Interpret `--cors-origin` values: empty disables CORS, `*` allows
    /// any origin, anything else is an exact origin.
    pub fn from_origins(origins: &[String], allow_credentials: bool) -> Self {
        if origins.is_empty() {
            Self::Disabled
        } else if origins.iter().any(|o| o == "*") {
            Self::AnyOrigin { allow_credentials }
        } else {
            Self::Origins {
                origins: origins.to_vec(),
                allow_credentials,
            }
        }
    }
}

/// Everything needed to build a [`crate::Responder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub embedding_model: String,
    pub generation_model: String,
    /// JSON records file; the built-in dataset when `None`.
    pub records: Option<PathBuf>,
    pub responder: ResponderConfig,
    pub decoding: DecodingParams,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let d = &self.decoding;
        if self.responder.top_k == 0 {
            return Err(Error::Config("top-k must be at least 1".into()));
        }
        if d.max_output_length == 0 {
            return Err(Error::Config(
                "max-output-length must be at least 1".into(),
            ));
        }
        if !(d.repetition_penalty > 0.0) {
            return Err(Error::Config(
                "repetition-penalty must be positive".into(),
            ));
        }
        if !(d.top_p > 0.0 && d.top_p <= 1.0) {
            return Err(Error::Config("top-p must be in (0, 1]".into()));
        }
        if !(d.temperature > 0.0) {
            return Err(Error::Config("temperature must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub cors: CorsPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        embedding::DEFAULT_EMBEDDING_MODEL,
        generation::DEFAULT_GENERATION_MODEL,
    };

    fn settings() -> Settings {
        Settings {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            records: None,
            responder: ResponderConfig::default(),
            decoding: DecodingParams::default(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        settings().validate().unwrap();
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut s = settings();
        s.responder.top_k = 0;
        assert!(matches!(s.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn top_p_out_of_range_rejected() {
        let mut s = settings();
        s.decoding.top_p = 1.5;
        assert!(s.validate().is_err());
        s.decoding.top_p = 0.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn nan_penalty_rejected() {
        let mut s = settings();
        s.decoding.repetition_penalty = f32::NAN;
        assert!(s.validate().is_err());
    }

    #[test]
    fn cors_from_origins() {
        assert_eq!(CorsPolicy::from_origins(&[], true), CorsPolicy::Disabled);
        assert_eq!(
            CorsPolicy::from_origins(&["*".to_string()], false),
            CorsPolicy::AnyOrigin {
                allow_credentials: false
            }
        );
        assert_eq!(
            CorsPolicy::from_origins(
                &["http://localhost:3000".to_string()],
                true
            ),
            CorsPolicy::Origins {
                origins: vec!["http://localhost:3000".to_string()],
                allow_credentials: true,
            }
        );
    }
}
