use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use leaf_serve::{ImageClassifier, LoadError, Preprocessor, SavedModelSpec};
use structopt::StructOpt;

pub const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(StructOpt, Debug)]
#[structopt(
    name = "leaf-server",
    about = "HTTP service classifying tea-leaf diseases with TensorFlow"
)]
pub struct Config {
    #[structopt(
        long,
        env = "LEAF_MODEL_DIR",
        default_value = "best_tealeaf",
        parse(from_os_str),
        help = "Export directory of the TensorFlow SavedModel"
    )]
    pub model_dir: PathBuf,

    #[structopt(
        long,
        env = "LEAF_LABELS",
        parse(from_os_str),
        help = "File with one label per line, in model output order"
    )]
    pub labels: Option<PathBuf>,

    #[structopt(long, env = "LEAF_MODEL_TAG", default_value = "serve")]
    pub tag: String,

    #[structopt(long, env = "LEAF_INPUT_OP", default_value = "serving_default_input_1")]
    pub input_op: String,

    #[structopt(long, env = "LEAF_OUTPUT_OP", default_value = "StatefulPartitionedCall")]
    pub output_op: String,

    #[structopt(long, env = "LEAF_IMAGE_SIZE", default_value = "224")]
    pub image_size: u32,

    #[structopt(long, help = "Scale pixels to [0, 1] before inference")]
    pub rescale: bool,

    #[structopt(long, env = "LEAF_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    #[structopt(long, env = "LEAF_MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: u64,

    #[structopt(long, env = "LEAF_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    #[structopt(
        long = "allowed-origin",
        env = "LEAF_ALLOWED_ORIGINS",
        use_delimiter = true,
        help = "Origin allowed to call /predict cross-origin (repeatable)"
    )]
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.image_size == 0 {
            return Err("--image-size must be positive".to_owned());
        }
        if self.max_upload_bytes == 0 {
            return Err("--max-upload-bytes must be positive".to_owned());
        }
        if self.request_timeout_secs == 0 {
            return Err("--request-timeout-secs must be positive".to_owned());
        }
        Ok(())
    }

    pub fn model_spec(&self) -> SavedModelSpec {
        SavedModelSpec {
            export_dir: self.model_dir.clone(),
            tag: self.tag.clone(),
            input_op: self.input_op.clone(),
            output_op: self.output_op.clone(),
        }
    }

    pub fn load_classifier(&self) -> Result<ImageClassifier, LoadError> {
        ImageClassifier::load(
            &self.model_spec(),
            self.labels.as_deref(),
            Preprocessor::new(self.image_size, self.rescale),
        )
    }

    pub fn origins(&self) -> Vec<String> {
        if self.allowed_origins.is_empty() {
            DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect()
        } else {
            self.allowed_origins.clone()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
