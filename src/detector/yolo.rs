use crate::config::{DetectConfig, Device};
use crate::detector::postprocess::{self, DecodeParams, Letterbox};
use crate::detector::{ClassLabels, Detection, DetectionBackend};
use crate::error::{Error, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;

/// YOLOv8 / YOLO11 detector exported to ONNX, executed by ONNX Runtime.
pub struct OnnxYoloBackend {
    session: Session,
    labels: ClassLabels,
    input_size: u32,
    params: DecodeParams,
}

impl OnnxYoloBackend {
    pub fn load(model_path: &Path, config: &DetectConfig) -> Result<Self> {
        let extension = model_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if matches!(extension.as_deref(), Some("pt" | "pth")) {
            return Err(Error::ModelLoad(format!(
                "{:?} is a PyTorch checkpoint; export it to ONNX first (e.g. `yolo export model=<file> format=onnx`)",
                model_path
            )));
        }

        let cuda_device = match config.device {
            Device::Cuda(ordinal) => Some(i32::try_from(ordinal).map_err(|_| {
                Error::InvalidInput(format!("CUDA device ordinal {} is out of range", ordinal))
            })?),
            Device::Cpu => None,
        };

        let model_bytes = std::fs::read(model_path)
            .map_err(|e| Error::ModelLoad(format!("Failed to read {:?}: {}", model_path, e)))?;

        let mut builder = Session::builder()
            .map_err(load_failed)?
            .with_intra_threads(config.threads)
            .map_err(load_failed)?;

        if let Some(device_id) = cuda_device {
            tracing::info!("Registering CUDA execution provider on device {}", device_id);
            let cuda = CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build();
            builder = builder.with_execution_providers([cuda]).map_err(load_failed)?;
        }

        let session = builder.commit_from_memory(&model_bytes).map_err(load_failed)?;

        let labels = match &config.labels {
            Some(path) => ClassLabels::from_file(path)?,
            None => Self::embedded_labels(&session)?,
        };

        tracing::info!("Model loaded successfully");
        tracing::info!("  Input size: {}", config.input_size);
        if !labels.is_empty() {
            tracing::info!("  Named classes: {}", labels.len());
        }
        tracing::info!("  Device: {}", config.device);

        Ok(Self {
            session,
            labels,
            input_size: config.input_size,
            params: DecodeParams {
                confidence: config.confidence,
                iou: config.iou,
                max_detections: config.max_detections,
            },
        })
    }

    fn embedded_labels(session: &Session) -> Result<ClassLabels> {
        let names = session
            .metadata()
            .ok()
            .and_then(|metadata| metadata.custom("names").ok().flatten());

        match names {
            Some(names) => ClassLabels::from_metadata(&names),
            None => {
                tracing::warn!("Model carries no class names; labels will be class indices");
                Ok(ClassLabels::default())
            }
        }
    }
}

impl DetectionBackend for OnnxYoloBackend {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let letterbox = Letterbox::fit(image.width(), image.height(), self.input_size);
        let input = letterbox.tensor(image);

        let size = self.input_size as i64;
        let input_shape = vec![1, 3, size, size];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))
            .map_err(inference_failed)?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(inference_failed)?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_failed)?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        tracing::debug!("Model output shape: {:?}", dims);

        let output = ArrayViewD::from_shape(IxDyn(&dims), data)
            .map_err(|e| Error::Inference(format!("Unexpected output layout: {}", e)))?;
        if output.ndim() != 3 || output.shape()[0] != 1 {
            return Err(Error::Inference(format!(
                "Expected output of shape [1, 4 + classes, candidates], got {:?}",
                output.shape()
            )));
        }

        let predictions = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::Inference(e.to_string()))?;

        let predictions = postprocess::candidates_by_column(predictions, self.labels.len());

        postprocess::decode(
            predictions,
            &letterbox,
            (image.width(), image.height()),
            &self.labels,
            &self.params,
        )
    }
}

fn load_failed<E: std::fmt::Display>(err: E) -> Error {
    Error::ModelLoad(err.to_string())
}

fn inference_failed<E: std::fmt::Display>(err: E) -> Error {
    Error::Inference(err.to_string())
}
