use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use crate::{
    error::{Error, Result},
    model_files::{ModelFiles, default_device},
};

pub const DEFAULT_EMBEDDING_MODEL: &str =
    "sentence-transformers/all-MiniLM-L6-v2";

/// Longest input sentence-transformers feeds MiniLM; longer text is cut.
const MAX_SEQ_LEN: usize = 256;

/// Maps text to fixed-length vectors.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?.pop().ok_or_else(|| {
            Error::Embedding("embedder returned no vector".to_string())
        })
    }

    fn model_id(&self) -> &str;
}

/// Sentence embeddings from a BERT checkpoint: mean pooling over the
/// attention mask followed by L2 normalization.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
}

impl BertEmbedder {
    /// Load weights and tokenizer for `model_id` (hub repository or local
    /// directory). Any failure here is a startup failure.
    pub fn load(model_id: &str) -> Result<Self> {
        let files = ModelFiles::resolve(model_id)?;
        let config: Config = files.load_config()?;
        let device = default_device();

        let mut tokenizer = files.load_tokenizer()?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| Error::model_load(model_id, e))?;

        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                &[&files.weights],
                DType::F32,
                &device,
            )
        }
        .map_err(|e| Error::model_load(model_id, e))?;
        let model = BertModel::load(vb, &config)
            .map_err(|e| Error::model_load(model_id, e))?;

        tracing::info!(
            model = model_id,
            hidden_size = config.hidden_size,
            ?device,
            "embedding model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
        })
    }

    fn forward(&self, texts: &[&str]) -> candle_core::Result<Tensor> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            ids.push(Tensor::new(encoding.get_ids(), &self.device)?);
            masks.push(Tensor::new(
                encoding.get_attention_mask(),
                &self.device,
            )?);
        }
        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(
            &input_ids,
            &token_type_ids,
            Some(&attention_mask),
        )?;
        let pooled =
            mean_pool(&hidden, &attention_mask.to_dtype(DType::F32)?)?;
        normalize_l2(&pooled)
    }
}

impl Embedder for BertEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.forward(texts)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(map_candle_err)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Average token vectors `[B, T, H]` over the real (mask = 1) tokens.
fn mean_pool(hidden: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let summed = (hidden * &mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9, f32::MAX)?;
    summed / counts
}

/// Scale each row of `[B, H]` to unit length.
fn normalize_l2(x: &Tensor) -> candle_core::Result<Tensor> {
    let norms = x.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f32::MAX)?;
    x.broadcast_div(&norms)
}

fn map_candle_err(e: candle_core::Error) -> Error {
    Error::Embedding(format!("tensor computation error: {e}"))
}
