//! Tea-leaf disease classification on top of a TensorFlow SavedModel.
//!
//! [`ImageClassifier`] chains the stages: [`Preprocessor`] turns encoded image
//! bytes into a `(1, 224, 224, 3)` tensor, a [`Model`] scores it, and
//! [`Classification`] ranks the scores against the [`LabelSet`].

mod classifier;
mod error;
mod labels;
mod model;
mod prediction;
mod preprocess;
mod timer;

pub use classifier::ImageClassifier;
pub use error::{ClassifyError, LoadError};
pub use labels::{identifier, LabelSet, DEFAULT_LABELS};
pub use model::{Model, SavedModel, SavedModelSpec};
pub use prediction::{Classification, RankedPrediction, TopPrediction, MIN_CONFIDENCE};
pub use preprocess::{InputTensor, Preprocessor, DEFAULT_IMAGE_SIZE};
pub use timer::Timer;
