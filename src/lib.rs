//! Cinematch - Content-based movie rating classification
//!
//! Builds GloVe-based content features for (user, movie) rating instances and
//! cross-validates several classifier families over them:
//! - [`data`] - Dataset CSV loading and the GloVe embedding index
//! - [`preprocessing`] - Feature construction, rating discretization, splitting
//! - [`training`] - KNN, random forest and neural network classifiers with a
//!   shared cross-validation lifecycle and metric reporting
//! - [`pipeline`] - End-to-end experiment orchestration
//! - [`config`] - Typed YAML properties file

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod preprocessing;
pub mod training;

pub use config::PipelineConfig;
pub use error::{CinematchError, Result};
pub use pipeline::{run_experiment, ExperimentReport};
