//! In-process fakes for the embedding backend and the answer oracle.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{EmbeddingError, OracleError};
use crate::services::embedding::Embedder;
use crate::services::oracle::AnswerOracle;

/// Hashed bag-of-words embedder: identical texts get identical vectors and
/// texts sharing words score higher than unrelated ones.
pub struct HashEmbedder {
    dimension: usize,
    model_id: String,
    fail_after: Option<usize>,
    batches: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: "hash-bow".to_string(),
            fail_after: None,
            batches: AtomicUsize::new(0),
        }
    }

    /// Embed the first `batches` document batches, then fail every later one.
    pub fn failing_after(mut self, batches: usize) -> Self {
        self.fail_after = Some(batches);
        self
    }

    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let seen = self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| seen >= limit) {
            return Err(EmbeddingError::ModelError("backend died".to_string()));
        }
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed(text))
    }

    async fn health_check(&self) -> Result<bool, EmbeddingError> {
        Ok(true)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Oracle that replays canned replies and records every prompt it sees.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Always answer with `reply` once the script runs out.
    pub fn always(reply: &str) -> Self {
        Self {
            fallback: Some(reply.to_string()),
            ..Default::default()
        }
    }

    pub fn then_reply(self, reply: &str) -> Self {
        self.push(Ok(reply.to_string()))
    }

    pub fn then_fail(self, error: OracleError) -> Self {
        self.push(Err(error))
    }

    fn push(self, reply: Result<String, OracleError>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnswerOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(OracleError::ServerError("script exhausted".to_string())),
        }
    }

    async fn health_check(&self) -> Result<bool, OracleError> {
        Ok(true)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
