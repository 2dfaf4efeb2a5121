use std::path::{Path, PathBuf};

use log::info;
use tensorflow::{Graph, SavedModelBundle, Session, SessionOptions, SessionRunArgs, Tensor};

use crate::error::{ClassifyError, LoadError};
use crate::preprocess::InputTensor;
use crate::timer::Timer;

/// Something that maps an input tensor to one score per label.
///
/// Implementations are shared between request handlers and must be safe to
/// call concurrently through `&self`.
pub trait Model: Send + Sync {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifyError>;
}

/// Where to find a SavedModel export and which graph operations to drive.
#[derive(Debug, Clone)]
pub struct SavedModelSpec {
    pub export_dir: PathBuf,
    pub tag: String,
    pub input_op: String,
    pub output_op: String,
}

impl SavedModelSpec {
    /// Operation names used by a Keras `model.save()` export.
    pub fn keras(export_dir: &Path) -> Self {
        SavedModelSpec {
            export_dir: export_dir.to_path_buf(),
            tag: "serve".to_owned(),
            input_op: "serving_default_input_1".to_owned(),
            output_op: "StatefulPartitionedCall".to_owned(),
        }
    }
}

/// A TensorFlow SavedModel loaded into memory.
///
/// `Session::run` is thread-safe in TensorFlow, so a single session serves
/// every request.
pub struct SavedModel {
    graph: Graph,
    session: Session,
    input_op: String,
    output_op: String,
}

impl SavedModel {
    pub fn load(spec: &SavedModelSpec) -> Result<Self, LoadError> {
        if !spec.export_dir.is_dir() {
            return Err(LoadError::MissingModel(spec.export_dir.clone()));
        }

        let mut t = Timer::started("Loading session");

        let mut graph = Graph::new();
        let session = SavedModelBundle::load(
            &SessionOptions::new(),
            &[spec.tag.as_str()],
            &mut graph,
            &spec.export_dir,
        )?
        .session;

        t.stop();

        for name in &[&spec.input_op, &spec.output_op] {
            if graph
                .operation_by_name(name)
                .map_err(tensorflow::Status::from)?
                .is_none()
            {
                return Err(LoadError::MissingOperation(name.to_string()));
            }
        }

        info!(
            "Loaded model from {} ({} -> {})",
            spec.export_dir.display(),
            spec.input_op,
            spec.output_op
        );

        Ok(SavedModel {
            graph,
            session,
            input_op: spec.input_op.clone(),
            output_op: spec.output_op.clone(),
        })
    }
}

impl Model for SavedModel {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifyError> {
        let mut t = Timer::started("Running session");

        let tensor = Tensor::new(&input.shape()).with_values(input.data())?;

        let mut args = SessionRunArgs::new();
        args.add_feed(
            &self.graph.operation_by_name_required(&self.input_op)?,
            0,
            &tensor,
        );
        let token = args.request_fetch(
            &self.graph.operation_by_name_required(&self.output_op)?,
            0,
        );

        self.session.run(&mut args)?;
        let output: Tensor<f32> = args.fetch(token)?;

        t.stop();

        Ok(output.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keras_spec_uses_serving_signature() {
        let spec = SavedModelSpec::keras(Path::new("/opt/tealeaf"));
        assert_eq!(spec.tag, "serve");
        assert_eq!(spec.input_op, "serving_default_input_1");
        assert_eq!(spec.output_op, "StatefulPartitionedCall");
    }

    #[test]
    fn missing_export_dir_fails_before_touching_tensorflow() {
        let spec = SavedModelSpec::keras(Path::new("/nonexistent/best_tealeaf"));
        match SavedModel::load(&spec) {
            Err(LoadError::MissingModel(dir)) => assert_eq!(dir, spec.export_dir),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("loaded a model from nowhere"),
        }
    }
}
