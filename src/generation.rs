use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::{
    generation::{LogitsProcessor, Sampling},
    models::t5::{self, T5ForConditionalGeneration},
    utils::apply_repeat_penalty,
};
use tokenizers::{Tokenizer, TruncationParams};

use crate::{
    error::{Error, Result},
    model_files::{ModelFiles, default_device},
};

pub const DEFAULT_GENERATION_MODEL: &str = "google/flan-t5-large";

/// T5 encoders were trained on inputs up to this many tokens; longer prompts
/// are truncated from the right.
const MAX_INPUT_TOKENS: usize = 512;

/// Turns a prompt into text.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;

    fn model_id(&self) -> &str;
}

/// Decoding behavior for generation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingParams {
    /// Upper bound on generated tokens.
    pub max_output_length: usize,
    /// Sample from the distribution instead of taking the arg-max. Off by
    /// default, which makes output reproducible for a fixed prompt.
    pub sample: bool,
    /// Only used when sampling.
    pub temperature: f64,
    /// Only used when sampling.
    pub top_p: f64,
    /// Values above 1.0 discourage tokens that were already generated.
    pub repetition_penalty: f32,
    pub seed: u64,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            max_output_length: 1024,
            sample: false,
            temperature: 0.3,
            top_p: 0.85,
            repetition_penalty: 1.2,
            seed: 299_792_458,
        }
    }
}

impl DecodingParams {
    pub fn sampling(&self) -> Sampling {
        if self.sample {
            Sampling::TopP {
                p: self.top_p,
                temperature: self.temperature,
            }
        } else {
            Sampling::ArgMax
        }
    }

    fn logits_processor(&self) -> LogitsProcessor {
        LogitsProcessor::from_sampling(self.seed, self.sampling())
    }
}

/// Pick the next token from one step of decoder logits.
fn next_token(
    processor: &mut LogitsProcessor,
    logits: &Tensor,
    generated: &[u32],
    repetition_penalty: f32,
) -> candle_core::Result<u32> {
    if repetition_penalty == 1.0 || generated.is_empty() {
        return processor.sample(logits);
    }
    let penalized =
        apply_repeat_penalty(logits, repetition_penalty, generated)?;
    processor.sample(&penalized)
}

/// Sequence-to-sequence generation with a T5 checkpoint (flan-t5 by
/// default).
///
/// The decoder keeps a KV cache between steps, so the model sits behind a
/// mutex and one generation runs at a time.
pub struct T5Generator {
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    config: t5::Config,
    device: Device,
    params: DecodingParams,
    model_id: String,
}

impl T5Generator {
    pub fn load(model_id: &str, params: DecodingParams) -> Result<Self> {
        let files = ModelFiles::resolve(model_id)?;
        let mut config: t5::Config = files.load_config()?;
        config.use_cache = true;
        let device = default_device();

        let mut tokenizer = files.load_tokenizer()?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_INPUT_TOKENS,
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
        let model = T5ForConditionalGeneration::load(vb, &config)
            .map_err(|e| Error::model_load(model_id, e))?;

        tracing::info!(
            model = model_id,
            ?device,
            sample = params.sample,
            max_output_length = params.max_output_length,
            "generation model loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            config,
            device,
            params,
            model_id: model_id.to_string(),
        })
    }

    pub fn params(&self) -> &DecodingParams {
        &self.params
    }

    fn run(
        &self,
        model: &mut T5ForConditionalGeneration,
        input_ids: &[u32],
    ) -> candle_core::Result<Vec<u32>> {
        let start = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        let mut processor = self.params.logits_processor();
        let mut output = vec![start];

        model.clear_kv_cache();
        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoder_output = model.encode(&input)?;

        while output.len() <= self.params.max_output_length {
            // With the KV cache only the newest token is fed back.
            let step: &[u32] = if output.len() == 1 {
                &output
            } else {
                &output[output.len() - 1..]
            };
            let decoder_input = Tensor::new(step, &self.device)?.unsqueeze(0)?;
            let logits = model
                .decode(&decoder_input, &encoder_output)?
                .squeeze(0)?
                .to_dtype(DType::F32)?;

            let token = next_token(
                &mut processor,
                &logits,
                &output[1..],
                self.params.repetition_penalty,
            )?;
            if token as usize == self.config.eos_token_id {
                break;
            }
            output.push(token);
        }

        output.remove(0);
        Ok(output)
    }
}

impl Generator for T5Generator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| {
                Error::Generation(format!("tokenization failed: {e}"))
            })?;

        let mut model = self.model.lock().map_err(|_| {
            Error::Generation("model lock poisoned".to_string())
        })?;
        let tokens = self
            .run(&mut model, encoding.get_ids())
            .map_err(|e| Error::Generation(format!("decoding failed: {e}")))?;
        drop(model);

        tracing::debug!(
            input_tokens = encoding.get_ids().len(),
            output_tokens = tokens.len(),
            "generation finished"
        );

        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| {
                Error::Generation(format!("detokenization failed: {e}"))
            })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
