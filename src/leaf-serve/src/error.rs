use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures while bringing the classifier up. All of these are fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read labels file {path:?}: {source}")]
    Labels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("labels file {0:?} contains no labels")]
    EmptyLabels(PathBuf),

    #[error("model export directory {0:?} does not exist")]
    MissingModel(PathBuf),

    #[error("could not load model: {0}")]
    Model(#[from] tensorflow::Status),

    #[error("model graph has no operation named '{0}'")]
    MissingOperation(String),
}

/// Failures while classifying a single image.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("image too large: {0}")]
    ImageTooLarge(String),

    #[error("{0}")]
    Preprocess(String),

    #[error("inference failed: {0}")]
    Inference(#[from] tensorflow::Status),

    #[error("model returned {got} scores but {expected} labels are configured")]
    OutputMismatch { expected: usize, got: usize },

    #[error("model returned a non-finite score at index {0}")]
    NonFinite(usize),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ClassifyError {
    /// Whether the failure was caused by the uploaded bytes rather than the
    /// pipeline itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClassifyError::InvalidImage(_) | ClassifyError::ImageTooLarge(_)
        )
    }
}

impl From<image::ImageError> for ClassifyError {
    fn from(err: image::ImageError) -> Self {
        use image::ImageError;

        match err {
            ImageError::Decoding(_) | ImageError::Unsupported(_) => {
                ClassifyError::InvalidImage(err.to_string())
            }
            ImageError::Limits(_) => ClassifyError::ImageTooLarge(err.to_string()),
            other => ClassifyError::Preprocess(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ClassifyError;
    use std::time::Duration;

    #[test]
    fn only_image_errors_are_client_errors() {
        assert!(ClassifyError::InvalidImage("x".into()).is_client_error());
        assert!(ClassifyError::ImageTooLarge("x".into()).is_client_error());
        assert!(!ClassifyError::Preprocess("x".into()).is_client_error());
        assert!(!ClassifyError::NonFinite(3).is_client_error());
        assert!(!ClassifyError::Timeout(Duration::from_secs(30)).is_client_error());
        assert!(!ClassifyError::OutputMismatch {
            expected: 8,
            got: 1000
        }
        .is_client_error());
    }

    #[test]
    fn undecodable_bytes_map_to_invalid_image() {
        let err = image::load_from_memory(b"definitely not an image").unwrap_err();
        let err = ClassifyError::from(err);
        assert!(matches!(err, ClassifyError::InvalidImage(_)));
    }
}
