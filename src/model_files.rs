use std::path::{Path, PathBuf};

use candle_core::Device;

use crate::error::{Error, Result};

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
pub fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// Files making up a model checkout, resolved to local paths.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub model_id: String,
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

impl ModelFiles {
    /// Resolve `model_id` either as a local directory or as a HuggingFace
    /// Hub repository, downloading into the hub cache on first use.
    pub fn resolve(model_id: &str) -> Result<Self> {
        let local = Path::new(model_id);
        if local.is_dir() {
            return Self::from_dir(model_id, local);
        }

        tracing::info!(model = model_id, "fetching model from HuggingFace Hub");
        let api = hf_hub::api::sync::Api::new()
            .map_err(|e| Error::model_load(model_id, e))?;
        let repo = api.model(model_id.to_string());
        let get = |file: &str| {
            repo.get(file).map_err(|e| {
                Error::model_load(model_id, format!("{file}: {e}"))
            })
        };

        Ok(Self {
            model_id: model_id.to_string(),
            config: get(CONFIG_FILE)?,
            tokenizer: get(TOKENIZER_FILE)?,
            weights: get(WEIGHTS_FILE)?,
        })
    }

    fn from_dir(model_id: &str, dir: &Path) -> Result<Self> {
        let file = |name: &str| {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(Error::model_load(
                    model_id,
                    format!("missing {}", path.display()),
                ))
            }
        };

        Ok(Self {
            model_id: model_id.to_string(),
            config: file(CONFIG_FILE)?,
            tokenizer: file(TOKENIZER_FILE)?,
            weights: file(WEIGHTS_FILE)?,
        })
    }

    /// Parse `config.json` into a model-specific config type.
    pub fn load_config<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let content = std::fs::read_to_string(&self.config)
            .map_err(|e| Error::model_load(&self.model_id, e))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::model_load(&self.model_id, e))
    }

    pub fn load_tokenizer(&self) -> Result<tokenizers::Tokenizer> {
        tokenizers::Tokenizer::from_file(&self.tokenizer)
            .map_err(|e| Error::model_load(&self.model_id, e))
    }
}
