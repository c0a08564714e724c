//! Preprocessing: content-based feature construction and data splitting

pub mod content_based;
pub mod split;

pub use content_based::{
    assemble_dataset, load_ratings_artifact, preprocess_rating, preprocess_text, text_to_glove,
    PreparedDataset, RatingsArtifact,
};
pub use split::{
    create_cross_validation_data, create_train_test_data, select_labels, select_rows, Fold,
    TrainTestSplit,
};
