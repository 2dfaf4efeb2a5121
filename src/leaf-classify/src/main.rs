use std::error::Error;
use std::fs;
use std::path::PathBuf;

use leaf_serve::{ImageClassifier, Preprocessor, SavedModelSpec};
use log::{error, info};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "leaf-classify",
    about = "Classify a tea-leaf image with the TensorFlow disease model"
)]
struct CmdArgs {
    #[structopt(
        long,
        default_value = "best_tealeaf",
        parse(from_os_str),
        help = "Export directory of the TensorFlow SavedModel"
    )]
    model_dir: PathBuf,

    #[structopt(long, parse(from_os_str), help = "Labels file, one per line")]
    labels: Option<PathBuf>,

    #[structopt(long, default_value = "serving_default_input_1")]
    input_op: String,

    #[structopt(long, default_value = "StatefulPartitionedCall")]
    output_op: String,

    #[structopt(long, default_value = "224")]
    image_size: u32,

    #[structopt(long, help = "Scale pixels to [0, 1] before inference")]
    rescale: bool,

    #[structopt(parse(from_os_str), help = "Image file to classify")]
    image: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let mut spec = SavedModelSpec::keras(&args.model_dir);
    spec.input_op = args.input_op;
    spec.output_op = args.output_op;

    if args.image_size == 0 {
        return Err("--image-size must be positive".into());
    }

    let classifier = ImageClassifier::load(
        &spec,
        args.labels.as_deref(),
        Preprocessor::new(args.image_size, args.rescale),
    )
    .map_err(|e| {
        error!("Error loading model: {}", e);
        e
    })?;

    let data = fs::read(&args.image)?;
    info!("Read {} bytes from {}", data.len(), args.image.display());

    let classification = classifier.classify_from_raw(&data)?;

    println!("{}", serde_json::to_string_pretty(&classification)?);

    Ok(())
}
