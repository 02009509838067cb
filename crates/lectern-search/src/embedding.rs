//! Text embedders.
//!
//! The built-in [`HashingEmbedder`] maps text onto a fixed-size vector by
//! feature hashing of word unigrams and bigrams. It needs no model files,
//! and the same text always yields the same vector, so stored embeddings
//! stay valid across runs and machines.

use std::fmt;

use crate::error::{SearchError, SearchResult};

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "hash-384";

const MODEL_PREFIX: &str = "hash-";

/// Weight of a word bigram relative to a single word.
const BIGRAM_WEIGHT: f32 = 0.5;

/// Something that turns text into a dense vector.
pub trait Embedder: fmt::Debug + Send + Sync {
    /// Name recorded next to every stored embedding.
    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Feature-hashing embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_name: String,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_name: format!("{MODEL_PREFIX}{dimensions}"),
        }
    }

    /// Parse a model name of the form `hash-<dimensions>`.
    pub fn from_model_name(name: &str) -> SearchResult<Self> {
        name.strip_prefix(MODEL_PREFIX)
            .and_then(|dims| dims.parse::<usize>().ok())
            .filter(|dims| *dims > 0)
            .map(Self::new)
            .ok_or_else(|| SearchError::UnknownModel(name.to_string()))
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        let words = tokenize(text);

        for word in &words {
            self.add_feature(&mut vector, word, 1.0);
        }
        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut vector, &bigram, BIGRAM_WEIGHT);
        }

        normalize(&mut vector);
        vector
    }
}

/// Resolve a configured model name to an embedder.
pub fn embedder_for(model_name: &str) -> SearchResult<Box<dyn Embedder>> {
    let embedder = HashingEmbedder::from_model_name(model_name)?;
    log::debug!("Using embedding model {}", embedder.model_name());
    Ok(Box::new(embedder))
}

/// Cosine similarity of two vectors; 0.0 when lengths differ or either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// 64-bit FNV-1a. Stable across platforms and releases, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
