use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use tokenizers::{
    PaddingParams,
    PaddingStrategy,
    Tokenizer,
    TruncationParams,
};

use crate::{
    embedding::{Embedder, normalize_l2},
    error::{Error, Result},
    matrix::EmbeddingMatrix,
    progress::{ProgressEvent, ProgressObserver},
};

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const MODEL_ENV_VAR: &str = "LOSTFILES_MODEL";

/// Longer inputs are truncated to this many tokens.
pub const MAX_SEQ_LENGTH: usize = 256;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
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

/// Locations of the three files a sentence encoder is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// The files inside a local model directory, if all of them exist.
    pub fn in_dir(dir: &Path) -> Option<Self> {
        let files = Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        };
        (files.config.is_file()
            && files.tokenizer.is_file()
            && files.weights.is_file())
        .then_some(files)
    }
}

/// Resolves, retrieves and caches the pretrained embedding model.
///
/// The model is either a local directory or a HuggingFace Hub model ID.
/// Hub models are downloaded into `cache_dir` the first time and loaded
/// from there afterwards.
pub struct ModelManager {
    model_id: String,
    cache_dir: PathBuf,
}

impl ModelManager {
    /// Creates a `ModelManager` caching under `cache_dir`. The model ID is
    /// resolved from:
    /// 1. The `LOSTFILES_MODEL` environment variable, if set
    /// 2. Otherwise, the default model (`sentence-transformers/all-MiniLM-L6-v2`)
    pub fn new(cache_dir: PathBuf) -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());

        Self {
            model_id,
            cache_dir,
        }
    }

    /// Creates a `ModelManager` with an explicit model ID, bypassing
    /// environment variable resolution.
    pub fn with_model_id(model_id: String, cache_dir: PathBuf) -> Self {
        Self {
            model_id,
            cache_dir,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Files already on disk for this model, without touching the network.
    pub fn cached_files(&self) -> Option<ModelFiles> {
        let local = Path::new(&self.model_id);
        if local.is_dir() {
            return ModelFiles::in_dir(local);
        }

        let repo = hf_hub::Cache::new(self.cache_dir.clone())
            .model(self.model_id.clone());
        Some(ModelFiles {
            config: repo.get(CONFIG_FILE)?,
            tokenizer: repo.get(TOKENIZER_FILE)?,
            weights: repo.get(WEIGHTS_FILE)?,
        })
    }

    pub fn is_cached(&self) -> bool {
        self.cached_files().is_some()
    }

    /// Load the sentence encoder, retrieving the model first if it is not
    /// cached yet.
    ///
    /// Calling this again loads the same artifact from the cache. Any
    /// failure is reported as [`Error::ModelUnavailable`].
    pub fn load(
        &self,
        progress: &dyn ProgressObserver,
    ) -> Result<SentenceEncoder> {
        let cached = self.cached_files();
        progress.report(ProgressEvent::ModelLoading {
            model: self.model_id.clone(),
            cached: cached.is_some(),
        });

        let files = match cached {
            Some(files) => files,
            None => self.retrieve()?,
        };

        let encoder =
            SentenceEncoder::from_files(&self.model_id, &files, default_device())?;
        progress.report(ProgressEvent::ModelLoaded {
            model: self.model_id.clone(),
            dimension: encoder.dimension(),
        });
        Ok(encoder)
    }

    fn retrieve(&self) -> Result<ModelFiles> {
        if Path::new(&self.model_id).is_dir() {
            return Err(self.unavailable(format!(
                "local model directory must contain {CONFIG_FILE}, \
                 {TOKENIZER_FILE} and {WEIGHTS_FILE}"
            )));
        }

        std::fs::create_dir_all(&self.cache_dir)
            .map_err(|_| Error::DataDir(self.cache_dir.clone()))?;

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .with_progress(false)
            .build()
            .map_err(|e| self.unavailable(e))?;
        let repo = api.model(self.model_id.clone());

        let fetch = |file: &str| {
            tracing::debug!(model = %self.model_id, file, "downloading");
            repo.get(file).map_err(|e| self.unavailable(e))
        };

        Ok(ModelFiles {
            config: fetch(CONFIG_FILE)?,
            tokenizer: fetch(TOKENIZER_FILE)?,
            weights: fetch(WEIGHTS_FILE)?,
        })
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> Error {
        Error::ModelUnavailable {
            model: self.model_id.clone(),
            reason: reason.to_string(),
        }
    }
}

/// A BERT sentence encoder: transformer forward pass, masked mean pooling
/// over the token states, then L2 normalization.
pub struct SentenceEncoder {
    model_id: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl SentenceEncoder {
    /// Build an encoder from model files already on disk.
    pub fn from_files(
        model_id: &str,
        files: &ModelFiles,
        device: Device,
    ) -> Result<Self> {
        let unavailable = |reason: String| Error::ModelUnavailable {
            model: model_id.to_string(),
            reason,
        };

        let config_str = std::fs::read_to_string(&files.config).map_err(|e| {
            unavailable(format!(
                "failed to read {}: {e}",
                files.config.display()
            ))
        })?;
        let config: Config = serde_json::from_str(&config_str).map_err(|e| {
            unavailable(format!(
                "failed to parse {}: {e}",
                files.config.display()
            ))
        })?;

        let mut tokenizer =
            Tokenizer::from_file(&files.tokenizer).map_err(|e| {
                unavailable(format!(
                    "failed to load tokenizer {}: {e}",
                    files.tokenizer.display()
                ))
            })?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| unavailable(format!("invalid truncation: {e}")))?;

        // SAFETY: the weights file is not modified while it is mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                &[&files.weights],
                DTYPE,
                &device,
            )
        }
        .map_err(|e| {
            unavailable(format!(
                "failed to load weights {}: {e}",
                files.weights.display()
            ))
        })?;
        let model = BertModel::load(vb, &config)
            .map_err(|e| unavailable(format!("failed to build model: {e}")))?;

        tracing::debug!(
            model = model_id,
            ?device,
            dimension = config.hidden_size,
            "sentence encoder loaded"
        );

        Ok(Self {
            model_id: model_id.to_string(),
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
        })
    }

    fn forward(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;

        let ids = encodings
            .iter()
            .map(|enc| Tensor::new(enc.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|enc| Tensor::new(enc.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        // [batch, tokens, hidden]
        let hidden = self.model.forward(
            &input_ids,
            &token_type_ids,
            Some(&attention_mask),
        )?;

        // Mean over real tokens only; padding positions have mask 0.
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;

        let rows = pooled
            .to_dtype(DType::F32)?
            .to_device(&Device::Cpu)?
            .to_vec2::<f32>()?;
        Ok(rows)
    }
}

impl Embedder for SentenceEncoder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix> {
        if texts.is_empty() {
            return Ok(EmbeddingMatrix::empty(self.dimension));
        }

        let mut rows = self.forward(texts)?;
        for row in &mut rows {
            normalize_l2(row);
        }
        EmbeddingMatrix::from_rows(self.dimension, rows)
    }
}
