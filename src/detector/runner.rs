use crate::config::DetectConfig;
use crate::detector::{DetectionBackend, DetectionResult, OnnxYoloBackend};
use crate::error::{Error, Result};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;

pub struct InferenceRunner<B = OnnxYoloBackend> {
    backend: B,
    model: String,
}

impl InferenceRunner<OnnxYoloBackend> {
    pub fn load(model_path: &Path, model: &str, config: &DetectConfig) -> Result<Self> {
        if !model_path.is_file() {
            return Err(Error::ModelLoad(format!(
                "Checkpoint {:?} does not exist",
                model_path
            )));
        }

        tracing::info!("Loading model from: {:?}", model_path);
        let backend = OnnxYoloBackend::load(model_path, config)?;
        Ok(Self::with_backend(backend, model))
    }
}

impl<B: DetectionBackend> InferenceRunner<B> {
    pub fn with_backend(backend: B, model: &str) -> Self {
        Self {
            backend,
            model: model.to_string(),
        }
    }

    pub fn run(&mut self, image_path: &Path) -> Result<DetectionResult> {
        let image = decode_image(image_path)?;

        tracing::info!(
            "Running detection on {:?} ({}x{})",
            image_path,
            image.width(),
            image.height()
        );

        let started = Instant::now();
        let raw = self.backend.detect(&image)?;
        let inference_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut detections: Vec<_> = raw
            .into_iter()
            .filter(|d| d.confidence.is_finite() && d.bbox.is_finite())
            .map(|mut d| {
                d.confidence = d.confidence.clamp(0.0, 1.0);
                d.bbox = d.bbox.clamp_to(image.width(), image.height());
                d
            })
            .collect();
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        tracing::info!("Detected {} objects in {:.1} ms", detections.len(), inference_ms);

        Ok(DetectionResult {
            image: image_path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            model: self.model.clone(),
            inference_ms,
            detections,
        })
    }
}

pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(Error::ImageDecode(format!("{:?} does not exist", path)));
    }
    image::open(path).map_err(|e| Error::ImageDecode(format!("{:?}: {}", path, e)))
}
