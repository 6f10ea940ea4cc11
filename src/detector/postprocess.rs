use crate::detector::{BoundingBox, ClassLabels, Detection};
use crate::error::{Error, Result};
use image::{imageops::FilterType, DynamicImage, Rgb, RgbImage};
use ndarray::{Array4, ArrayView2};

const PAD_VALUE: u8 = 114;

/// Aspect-preserving resize onto a square canvas, and its inverse mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub size: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((size as f32 - new_w) / 2.0).floor(),
            pad_y: ((size as f32 - new_h) / 2.0).floor(),
            size,
        }
    }

    pub fn to_source(&self, bbox: BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: (bbox.x1 - self.pad_x) / self.scale,
            y1: (bbox.y1 - self.pad_y) / self.scale,
            x2: (bbox.x2 - self.pad_x) / self.scale,
            y2: (bbox.y2 - self.pad_y) / self.scale,
        }
    }

    /// NCHW float tensor in `[0, 1]`, RGB channel order.
    pub fn tensor(&self, image: &DynamicImage) -> Array4<f32> {
        let rgb = image.to_rgb8();
        let new_w = ((rgb.width() as f32 * self.scale).round() as u32).clamp(1, self.size);
        let new_h = ((rgb.height() as f32 * self.scale).round() as u32).clamp(1, self.size);
        let resized = image::imageops::resize(&rgb, new_w, new_h, FilterType::Triangle);

        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([PAD_VALUE; 3]));
        image::imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);

        let size = self.size as usize;
        let mut input = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in canvas.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
        input
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub confidence: f32,
    pub iou: f32,
    pub max_detections: usize,
}

/// Orients a raw output as `[4 + classes, candidates]`, the layout Ultralytics
/// exports. The candidates-first form is only recognized when the class count is
/// known and the column count alone matches it.
pub fn candidates_by_column(predictions: ArrayView2<f32>, num_classes: usize) -> ArrayView2<f32> {
    let attributes = 4 + num_classes;
    if num_classes > 0 && predictions.ncols() == attributes && predictions.nrows() != attributes {
        predictions.reversed_axes()
    } else {
        predictions
    }
}

/// Decodes a YOLOv8/YOLO11 prediction matrix laid out as `[4 + classes, candidates]`
/// with rows `cx, cy, w, h` followed by per-class scores.
pub fn decode(
    predictions: ArrayView2<f32>,
    letterbox: &Letterbox,
    source: (u32, u32),
    labels: &ClassLabels,
    params: &DecodeParams,
) -> Result<Vec<Detection>> {
    let rows = predictions.nrows();
    if rows < 5 {
        return Err(Error::Inference(format!(
            "Expected at least 5 prediction rows (box + one class), got {}",
            rows
        )));
    }

    let mut candidates = Vec::new();
    for column in predictions.columns() {
        let Some((class_id, score)) = column
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .filter(|(_, s)| s.is_finite())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if score < params.confidence {
            continue;
        }

        let bbox = BoundingBox::from_center(column[0], column[1], column[2], column[3]);
        if !bbox.is_finite() {
            continue;
        }
        let bbox = letterbox.to_source(bbox).clamp_to(source.0, source.1);
        if bbox.area() <= 0.0 {
            continue;
        }

        candidates.push(Detection {
            bbox,
            class_id,
            label: labels.label(class_id),
            confidence: score.clamp(0.0, 1.0),
        });
    }

    let mut kept = non_max_suppression(candidates, params.iou);
    kept.truncate(params.max_detections);
    Ok(kept)
}

/// Greedy class-aware NMS. Output is sorted by descending confidence.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        let suppressed = kept.iter().any(|k| {
            k.class_id == detection.class_id && k.bbox.iou(&detection.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(detection);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn params() -> DecodeParams {
        DecodeParams {
            confidence: 0.25,
            iou: 0.45,
            max_detections: 300,
        }
    }

    fn detection(class_id: usize, confidence: f32, x1: f32) -> Detection {
        Detection {
            bbox: BoundingBox { x1, y1: 0.0, x2: x1 + 10.0, y2: 10.0 },
            class_id,
            label: format!("class_{}", class_id),
            confidence,
        }
    }

    #[test]
    fn letterbox_maps_back_to_source() {
        let letterbox = Letterbox::fit(1280, 640, 640);
        assert_eq!(letterbox.scale, 0.5);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 160.0);

        let source = letterbox.to_source(BoundingBox { x1: 10.0, y1: 170.0, x2: 20.0, y2: 180.0 });
        assert_eq!(source, BoundingBox { x1: 20.0, y1: 20.0, x2: 40.0, y2: 40.0 });
    }

    #[test]
    fn letterbox_tensor_is_padded_and_normalized() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([255, 0, 0])));
        let letterbox = Letterbox::fit(64, 32, 32);
        let tensor = letterbox.tensor(&image);

        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        // Top rows are padding, the middle holds the red image.
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 1e-6);
        assert!((tensor[[0, 0, 16, 16]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 16, 16]].abs() < 1e-6);
    }

    #[test]
    fn nms_suppresses_same_class_overlaps_only() {
        let kept = non_max_suppression(
            vec![
                detection(0, 0.6, 1.0),
                detection(0, 0.9, 0.0),
                detection(1, 0.8, 0.0),
                detection(0, 0.7, 50.0),
            ],
            0.45,
        );

        let summary: Vec<(usize, f32)> = kept.iter().map(|d| (d.class_id, d.confidence)).collect();
        assert_eq!(summary, vec![(0, 0.9), (1, 0.8), (0, 0.7)]);
    }

    #[test]
    fn decodes_predictions_above_threshold() {
        // Two classes, three candidates: one strong, one duplicate, one weak.
        let predictions = Array2::from_shape_vec(
            (6, 3),
            vec![
                100.0, 101.0, 300.0, // cx
                100.0, 100.0, 300.0, // cy
                40.0, 40.0, 20.0, // w
                20.0, 20.0, 20.0, // h
                0.1, 0.05, 0.1, // class 0
                0.9, 0.8, 0.2, // class 1
            ],
        )
        .unwrap();
        let letterbox = Letterbox::fit(640, 640, 640);
        let labels = ClassLabels::from_lines("button\nicon\n");

        let detections =
            decode(predictions.view(), &letterbox, (640, 640), &labels, &params()).unwrap();

        assert_eq!(detections.len(), 1);
        let best = &detections[0];
        assert_eq!(best.class_id, 1);
        assert_eq!(best.label, "icon");
        assert_eq!(best.confidence, 0.9);
        assert_eq!(best.bbox, BoundingBox { x1: 80.0, y1: 90.0, x2: 120.0, y2: 110.0 });
    }

    fn coco_sized_labels() -> ClassLabels {
        let names: Vec<String> = (0..80).map(|i| format!("c{}", i)).collect();
        ClassLabels::from_lines(&names.join("\n"))
    }

    /// 80 classes at a 32px input: fewer candidates than attribute rows.
    fn small_input_predictions() -> Array2<f32> {
        let mut predictions = Array2::<f32>::zeros((84, 21));
        predictions[[0, 3]] = 16.0;
        predictions[[1, 3]] = 16.0;
        predictions[[2, 3]] = 8.0;
        predictions[[3, 3]] = 4.0;
        predictions[[4 + 5, 3]] = 0.9;
        predictions
    }

    #[test]
    fn keeps_attribute_rows_when_candidates_are_few() {
        let predictions = small_input_predictions();
        let labels = coco_sized_labels();
        let oriented = candidates_by_column(predictions.view(), labels.len());
        assert_eq!(oriented.shape(), &[84, 21]);

        let letterbox = Letterbox::fit(32, 32, 32);
        let detections = decode(oriented, &letterbox, (32, 32), &labels, &params()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 5);
        assert_eq!(detections[0].label, "c5");
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[0].bbox, BoundingBox { x1: 12.0, y1: 14.0, x2: 20.0, y2: 18.0 });
    }

    #[test]
    fn transposes_candidates_first_outputs_with_known_classes() {
        let predictions = small_input_predictions().reversed_axes();
        let labels = coco_sized_labels();

        let oriented = candidates_by_column(predictions.view(), labels.len());
        assert_eq!(oriented.shape(), &[84, 21]);

        let letterbox = Letterbox::fit(32, 32, 32);
        let detections = decode(oriented, &letterbox, (32, 32), &labels, &params()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 5);

        // Without class names the exported layout is taken as is.
        let unchanged = candidates_by_column(predictions.view(), 0);
        assert_eq!(unchanged.shape(), &[21, 84]);
    }

    #[test]
    fn caps_detection_count() {
        let predictions = Array2::from_shape_vec(
            (5, 3),
            vec![
                10.0, 100.0, 200.0, //
                10.0, 100.0, 200.0, //
                10.0, 10.0, 10.0, //
                10.0, 10.0, 10.0, //
                0.5, 0.7, 0.6,
            ],
        )
        .unwrap();
        let letterbox = Letterbox::fit(640, 640, 640);
        let params = DecodeParams { max_detections: 2, ..params() };

        let detections = decode(
            predictions.view(),
            &letterbox,
            (640, 640),
            &ClassLabels::default(),
            &params,
        )
        .unwrap();

        let scores: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, vec![0.7, 0.6]);
        assert_eq!(detections[0].label, "class_0");
    }

    #[test]
    fn rejects_outputs_without_class_rows() {
        let predictions = Array2::<f32>::zeros((4, 10));
        let letterbox = Letterbox::fit(640, 640, 640);
        assert!(decode(
            predictions.view(),
            &letterbox,
            (640, 640),
            &ClassLabels::default(),
            &params()
        )
        .is_err());
    }
}
