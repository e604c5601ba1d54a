//! In-process BERT-style embedding model on ONNX Runtime.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{Embedder, query_text};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

fn model_err(e: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::ModelError(e.to_string())
}

/// Tokenizer and session loaded from a model directory.
pub struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    token_type_ids: bool,
}

impl OnnxModel {
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EmbeddingError::ModelError(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(model_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_err)?
            .with_intra_threads(num_cpus())
            .map_err(model_err)?
            .commit_from_file(&model_path)
            .map_err(model_err)?;

        let token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(model_err)?;

        // Long chunks are cut at the model's context window
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_tokens as usize,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(model_err)?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension: config.dimension as usize,
            token_type_ids,
        })
    }

    /// Embed texts with CLS pooling and L2 normalization.
    pub fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self.tokenizer.encode_batch(texts, true).map_err(model_err)?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len() {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let shape = [batch_size, max_len];
        let input_ids = Tensor::from_array((shape, input_ids)).map_err(model_err)?;
        let attention_mask = Tensor::from_array((shape, attention_mask)).map_err(model_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::ModelError("session lock poisoned".to_string()))?;

        let outputs = (if self.token_type_ids {
            let type_ids = Tensor::from_array((shape, type_ids)).map_err(model_err)?;
            session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => type_ids
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])
        })
        .map_err(model_err)?;

        let output = outputs[0].try_extract_array::<f32>().map_err(model_err)?;
        let out_shape = output.shape().to_vec();
        check_output_shape(&out_shape, self.dimension)?;

        let embeddings = match out_shape.len() {
            // last_hidden_state: take the CLS token
            3 => (0..batch_size)
                .map(|i| normalize((0..self.dimension).map(|d| output[[i, 0, d]]).collect()))
                .collect(),
            // pooled sentence embedding
            2 => (0..batch_size)
                .map(|i| normalize((0..self.dimension).map(|d| output[[i, d]]).collect()))
                .collect(),
            _ => {
                return Err(EmbeddingError::ModelError(format!(
                    "unexpected output shape: {:?}",
                    out_shape
                )));
            }
        };

        Ok(embeddings)
    }
}

pub struct OnnxEmbedder {
    model: Arc<OnnxModel>,
    model_id: String,
}

impl OnnxEmbedder {
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model = OnnxModel::load(config, model_dir)?;
        tracing::info!(model = %config.model_id, dir = %model_dir.display(), "loaded ONNX embedding model");
        Ok(Self {
            model: Arc::new(model),
            model_id: config.model_id.clone(),
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.embed(texts))
            .await
            .map_err(|e| EmbeddingError::ModelError(format!("embedding task failed: {}", e)))?
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.run(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.run(vec![query_text(&self.model_id, text)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding output".to_string()))
    }

    async fn health_check(&self) -> Result<bool, EmbeddingError> {
        Ok(true)
    }

    fn dimension(&self) -> usize {
        self.model.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// The model must emit `[batch, hidden]` or `[batch, seq, hidden]` with a
/// hidden size equal to the configured dimension.
fn check_output_shape(shape: &[usize], dimension: usize) -> Result<(), EmbeddingError> {
    if !matches!(shape.len(), 2 | 3) {
        return Err(EmbeddingError::ModelError(format!(
            "unexpected output shape: {:?}",
            shape
        )));
    }
    if shape.last() != Some(&dimension) {
        return Err(EmbeddingError::ModelError(format!(
            "model produces {}-dimensional embeddings, but embedding.dimension is {}",
            shape.last().copied().unwrap_or(0),
            dimension
        )));
    }
    Ok(())
}

fn normalize(v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.into_iter().map(|x| x / norm).collect()
    } else {
        v
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
