//! Content-based feature construction
//!
//! Turns one (user, movie) pair into an ordered word list (title, genres, then
//! the user's tags), aggregates the words' GloVe vectors into a single feature
//! vector, and discretizes the rating into the configured class scheme.

use crate::config::{Aggregation, Classification, PipelineConfig};
use crate::data::GloveIndex;
use crate::error::{CinematchError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Feature matrix and labels assembled from the raw dataset
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub input_data: Array2<f64>,
    pub labels: Array1<f64>,
}

/// Persisted form of the filtered rating classes, keyed by dataset and mode
#[derive(Debug, Serialize, Deserialize)]
pub struct RatingsArtifact {
    pub dataset: String,
    pub classification: String,
    pub ratings: Vec<i64>,
}

/// Strip punctuation and digits from a raw token; empty results (such as a
/// year in parentheses) are dropped by the caller.
fn clean_token(token: &str) -> String {
    token.chars().filter(|c| c.is_alphabetic()).collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(clean_token)
        .filter(|t| !t.is_empty())
        .collect()
}

fn int_column(df: &DataFrame, name: &str) -> Result<Int64Chunked> {
    let series = df
        .column(name)
        .map_err(|_| CinematchError::DataError(format!("column '{name}' not found")))?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    Ok(series.i64()?.clone())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df
        .column(name)
        .map_err(|_| CinematchError::DataError(format!("column '{name}' not found")))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

fn str_column(df: &DataFrame, name: &str) -> Result<StringChunked> {
    let series = df
        .column(name)
        .map_err(|_| CinematchError::DataError(format!("column '{name}' not found")))?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series.str()?.clone())
}

/// Collect the ordered word list for one (user, movie) pair: title words,
/// pipe-separated genre tokens, then the words of every tag the user gave
/// that movie. Original casing is preserved; punctuation, digits and the
/// year in parentheses are stripped.
pub fn preprocess_text(
    movies_df: &DataFrame,
    tags_df: &DataFrame,
    movie_id: i64,
    user_id: i64,
) -> Result<Vec<String>> {
    let movie_ids = int_column(movies_df, "movieId")?;
    let titles = str_column(movies_df, "title")?;
    let genres = str_column(movies_df, "genres")?;

    let row = movie_ids
        .into_iter()
        .position(|id| id == Some(movie_id))
        .ok_or_else(|| CinematchError::DataError(format!("movie {movie_id} not found")))?;

    let mut words = Vec::new();
    if let Some(title) = titles.get(row) {
        words.extend(tokenize(title));
    }
    if let Some(genre_list) = genres.get(row) {
        for genre in genre_list.split('|') {
            let cleaned = clean_token(genre);
            if !cleaned.is_empty() {
                words.push(cleaned);
            }
        }
    }

    let tag_users = int_column(tags_df, "userId")?;
    let tag_movies = int_column(tags_df, "movieId")?;
    let tags = str_column(tags_df, "tag")?;
    for i in 0..tags_df.height() {
        if tag_users.get(i) == Some(user_id) && tag_movies.get(i) == Some(movie_id) {
            if let Some(tag) = tags.get(i) {
                words.extend(tokenize(tag));
            }
        }
    }

    Ok(words)
}

/// Map each word to its embedding (case-insensitive, missing words skipped)
/// and collapse the collected vectors with the configured aggregation.
pub fn text_to_glove(
    aggregation: Aggregation,
    glove: &GloveIndex,
    word_list: &[String],
) -> Result<Array1<f64>> {
    let dim = glove.dimension();
    let vectors: Vec<&[f64]> = word_list.iter().filter_map(|w| glove.get(w)).collect();

    if vectors.is_empty() {
        return Err(CinematchError::EmptyResult(format!(
            "no embeddings found for word list {word_list:?}"
        )));
    }

    let mut result = match aggregation {
        Aggregation::Avg => {
            let mut sums = vec![0.0; dim];
            for v in &vectors {
                for (s, x) in sums.iter_mut().zip(v.iter()) {
                    *s += x;
                }
            }
            let n = vectors.len() as f64;
            sums.iter_mut().for_each(|s| *s /= n);
            sums
        }
        Aggregation::Max => {
            let mut maxes = vec![f64::NEG_INFINITY; dim];
            for v in &vectors {
                for (m, x) in maxes.iter_mut().zip(v.iter()) {
                    *m = m.max(*x);
                }
            }
            maxes
        }
    };
    result.shrink_to_fit();
    Ok(Array1::from_vec(result))
}

/// Discretize a raw rating into the configured class scheme.
///
/// Binary: class 1 ("dislike") when the rating falls below the 3.0 midpoint,
/// class 0 ("like") otherwise. Multi: nearest integer in [1, 5], halves
/// rounding up.
pub fn preprocess_rating(classification: Classification, rating: f64) -> i64 {
    match classification {
        Classification::Binary => {
            if rating < 3.0 {
                1
            } else {
                0
            }
        }
        Classification::Multi => {
            let rounded = (rating + 0.5).floor() as i64;
            rounded.clamp(1, 5)
        }
    }
}

/// Assemble the full feature matrix and label vector from the loaded
/// DataFrames. Rating rows whose word list has no embedding coverage are
/// skipped. The filtered rating classes are persisted as a JSON artifact
/// under the output folder.
pub fn assemble_dataset(
    config: &PipelineConfig,
    movies_df: &DataFrame,
    tags_df: &DataFrame,
    ratings_df: &DataFrame,
    glove: &GloveIndex,
) -> Result<PreparedDataset> {
    let user_ids = int_column(ratings_df, "userId")?;
    let movie_ids = int_column(ratings_df, "movieId")?;
    let ratings = float_column(ratings_df, "rating")?;

    let dim = glove.dimension();
    let mut rows: Vec<f64> = Vec::new();
    let mut labels: Vec<f64> = Vec::new();
    let mut skipped = 0usize;

    for i in 0..ratings_df.height() {
        let (Some(user_id), Some(movie_id), Some(rating)) =
            (user_ids.get(i), movie_ids.get(i), ratings.get(i))
        else {
            skipped += 1;
            continue;
        };

        let words = preprocess_text(movies_df, tags_df, movie_id, user_id)?;
        match text_to_glove(config.aggregation, glove, &words) {
            Ok(vector) => {
                rows.extend(vector.iter());
                labels.push(preprocess_rating(config.classification, rating) as f64);
            }
            Err(CinematchError::EmptyResult(_)) => {
                debug!(movie_id, user_id, "no embedding coverage, skipping rating row");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if labels.is_empty() {
        return Err(CinematchError::EmptyResult(
            "no rating row had embedding coverage".to_string(),
        ));
    }

    let n = labels.len();
    info!(instances = n, skipped, "assembled content-based dataset");

    let input_data = Array2::from_shape_vec((n, dim), rows)
        .map_err(|e| CinematchError::DataError(e.to_string()))?;
    let label_array = Array1::from_vec(labels);

    write_ratings_artifact(config, &label_array)?;

    Ok(PreparedDataset {
        input_data,
        labels: label_array,
    })
}

/// Persist the filtered rating classes keyed by dataset and classification mode
fn write_ratings_artifact(config: &PipelineConfig, labels: &Array1<f64>) -> Result<()> {
    let artifact = RatingsArtifact {
        dataset: config.dataset.clone(),
        classification: config.classification.as_str().to_string(),
        ratings: labels.iter().map(|&v| v as i64).collect(),
    };
    let dir = config.output_dir();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!(
        "ratings_{}_{}.json",
        artifact.dataset, artifact.classification
    ));
    let json = serde_json::to_string_pretty(&artifact)?;
    std::fs::write(&path, json)?;
    debug!(file = %path.display(), "wrote filtered ratings artifact");
    Ok(())
}

/// Reload a persisted ratings artifact
pub fn load_ratings_artifact(
    output_dir: &Path,
    dataset: &str,
    classification: Classification,
) -> Result<RatingsArtifact> {
    let path = output_dir.join(format!(
        "ratings_{}_{}.json",
        dataset,
        classification.as_str()
    ));
    let json = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&json)?)
}
