use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::error::{ClassifyError, LoadError};
use crate::labels::LabelSet;
use crate::model::{Model, SavedModel, SavedModelSpec};
use crate::prediction::Classification;
use crate::preprocess::{InputTensor, Preprocessor};

/// Decode, resize, infer and rank, in one call.
///
/// Cheap to share: wrap it in an `Arc` and hand it to every request handler.
pub struct ImageClassifier {
    model: Arc<dyn Model>,
    labels: LabelSet,
    preprocessor: Preprocessor,
}

impl ImageClassifier {
    pub fn new(model: Arc<dyn Model>, labels: LabelSet, preprocessor: Preprocessor) -> Self {
        ImageClassifier {
            model,
            labels,
            preprocessor,
        }
    }

    /// Load the SavedModel and, if given, a labels file replacing the
    /// built-in tea-leaf categories.
    pub fn load(
        spec: &SavedModelSpec,
        labels: Option<&Path>,
        preprocessor: Preprocessor,
    ) -> Result<Self, LoadError> {
        let labels = match labels {
            Some(path) => LabelSet::from_file(path)?,
            None => LabelSet::default(),
        };

        let model = SavedModel::load(spec)?;

        Ok(ImageClassifier::new(Arc::new(model), labels, preprocessor))
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn run(&self, input: &InputTensor) -> Result<Classification, ClassifyError> {
        let scores = self.model.predict(input)?;

        if scores.len() != self.labels.len() {
            return Err(ClassifyError::OutputMismatch {
                expected: self.labels.len(),
                got: scores.len(),
            });
        }

        if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
            return Err(ClassifyError::NonFinite(i));
        }

        let classification = Classification::from_scores(&self.labels, &scores);

        info!(
            "Classified as '{}' ({:.2}%)",
            classification.prediction.class,
            classification.prediction.confidence * 100.0
        );

        Ok(classification)
    }

    pub fn classify_from_raw(&self, data: &[u8]) -> Result<Classification, ClassifyError> {
        let input = self.preprocessor.prepare(data)?;
        self.run(&input)
    }
}
