//! Pre-trained GloVe embedding lookup
//!
//! Parses the space-separated embedding text file (word followed by a fixed
//! number of floats per line) into an in-memory index keyed by lowercase word.

use crate::error::{CinematchError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// In-memory word embedding index with case-insensitive lookup
#[derive(Debug, Clone)]
pub struct GloveIndex {
    vectors: HashMap<String, Vec<f64>>,
    dimension: usize,
}

impl GloveIndex {
    /// Build an index from word -> vector pairs. All vectors must share one
    /// dimension; words are lowercased.
    pub fn new(entries: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let mut vectors = HashMap::with_capacity(entries.len());
        let mut dimension = 0usize;
        for (word, vector) in entries {
            if dimension == 0 {
                dimension = vector.len();
            } else if vector.len() != dimension {
                return Err(CinematchError::ShapeError {
                    expected: format!("embedding dimension = {dimension}"),
                    actual: format!("embedding dimension = {} for '{word}'", vector.len()),
                });
            }
            vectors.insert(word.to_lowercase(), vector);
        }
        if vectors.is_empty() {
            return Err(CinematchError::EmptyResult(
                "no embeddings provided".to_string(),
            ));
        }
        Ok(Self { vectors, dimension })
    }

    /// Load a GloVe text file (one `word v1 v2 ... vd` entry per line)
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            CinematchError::DataError(format!("cannot open embeddings file {}: {e}", path.display()))
        })?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let word = parts
                .next()
                .ok_or_else(|| {
                    CinematchError::DataError(format!("malformed embedding line {}", line_no + 1))
                })?
                .to_string();
            let vector: Vec<f64> = parts
                .map(|v| {
                    v.parse::<f64>().map_err(|e| {
                        CinematchError::DataError(format!(
                            "bad embedding value on line {}: {e}",
                            line_no + 1
                        ))
                    })
                })
                .collect::<Result<_>>()?;
            entries.push((word, vector));
        }

        let index = Self::new(entries)?;
        info!(
            words = index.len(),
            dimension = index.dimension(),
            "loaded embeddings"
        );
        Ok(index)
    }

    /// Case-insensitive vector lookup
    pub fn get(&self, word: &str) -> Option<&[f64]> {
        self.vectors.get(&word.to_lowercase()).map(|v| v.as_slice())
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed words
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
