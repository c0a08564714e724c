//! Data loading: dataset CSV files and pre-trained word embeddings

pub mod glove;
pub mod loader;

pub use glove::GloveIndex;
pub use loader::DatasetLoader;
