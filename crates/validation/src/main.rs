use clap::Parser;
use common::{Environment, setup_logging};
use inference::Detector;
use inference::backend::ort::OrtBackend;
use std::path::PathBuf;
use validation::{DatasetDescriptor, Evaluator, ValidationParams};

/// Score a detection model against a labelled validation set.
#[derive(Debug, Parser)]
#[command(name = "validate", version)]
struct Args {
    /// ONNX model to evaluate.
    #[arg(long, default_value = "weights/best.onnx")]
    model: PathBuf,

    /// Dataset root holding `images/` and `labels/`.
    #[arg(long, default_value = "../validation-dataset")]
    dataset_root: PathBuf,

    /// Where the dataset descriptor is written.
    #[arg(long, default_value = "validate_config.yaml")]
    config: PathBuf,

    #[arg(long, default_value_t = 640)]
    imgsz: u32,

    #[arg(long, default_value_t = 16)]
    batch: usize,

    #[arg(long, default_value_t = 0.4)]
    conf: f32,

    #[arg(long, default_value_t = 0.5)]
    iou: f32,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(Environment::from_env());

    DatasetDescriptor::single_class(&args.dataset_root)?.write(&args.config)?;
    let dataset = DatasetDescriptor::read(&args.config)?;

    let params = ValidationParams {
        imgsz: args.imgsz,
        batch: args.batch,
        conf: args.conf,
        iou: args.iou,
    };

    let detector = Detector::<OrtBackend>::load(params.detector_config(&args.model))?;
    let metrics = Evaluator::new(&detector, params).evaluate(&dataset)?;

    for line in metrics.report_lines() {
        println!("{line}");
    }

    Ok(())
}
