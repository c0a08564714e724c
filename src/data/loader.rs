//! Dataset CSV loading

use crate::config::PipelineConfig;
use crate::error::{CinematchError, Result};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Loads the configured dataset CSV files into DataFrames
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load a single CSV file
    pub fn load_csv(path: &Path) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| {
            CinematchError::DataError(format!("cannot open {}: {e}", path.display()))
        })?;

        let reader = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file);

        reader
            .finish()
            .map_err(|e| CinematchError::DataError(e.to_string()))
    }

    /// Load every configured dataset file, keyed by its base name
    /// (links, movies, ratings, tags)
    pub fn load_datasets(config: &PipelineConfig) -> Result<HashMap<String, DataFrame>> {
        let mut datasets = HashMap::with_capacity(config.filenames.len());
        for name in &config.filenames {
            let path = config.dataset_file(name);
            let df = Self::load_csv(&path)?;
            if df.height() == 0 {
                return Err(CinematchError::DataError(format!(
                    "dataset file {} is empty",
                    path.display()
                )));
            }
            info!(file = %path.display(), rows = df.height(), "loaded dataset file");
            datasets.insert(name.clone(), df);
        }
        Ok(datasets)
    }
}
