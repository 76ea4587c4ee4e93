use super::{InferenceBackend, InferenceOutput};
use crate::config::{DetectorConfig, ExecutionProvider};
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

const INPUT_NAME: &str = "images";
const OUTPUT_NAME: &str = "output0";

pub struct OrtBackend {
    session: Session,
}

impl OrtBackend {
    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        path: &str,
        provider: ExecutionProvider,
        intra_threads: usize,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        #[allow(unused_mut)]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?;

        match provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            #[cfg(not(feature = "cuda"))]
            ExecutionProvider::Cuda => {
                anyhow::bail!("CUDA execution provider requested but the `cuda` feature is disabled");
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;

        tracing::info!("Model loaded from {}", path);
        Ok(Self { session })
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(config: &DetectorConfig) -> anyhow::Result<Self> {
        Self::load_model_with_provider(
            &config.model_path,
            config.execution_provider,
            config.intra_threads,
        )
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => TensorRef::from_array_view(images.view())?])?;

        let predictions = outputs[OUTPUT_NAME].try_extract_array::<f32>()?;

        Ok(InferenceOutput {
            predictions: predictions.into_owned(),
        })
    }
}
