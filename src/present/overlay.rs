use crate::detector::runner::decode_image;
use crate::detector::{BoundingBox, DetectionResult};
use crate::error::{Error, Result};
use crate::present::Presenter;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [52, 69, 147],
    [255, 55, 199],
];

pub fn class_color(class_id: usize) -> Rgba<u8> {
    let [r, g, b] = PALETTE[class_id % PALETTE.len()];
    Rgba([r, g, b, 255])
}

/// Pixel box clamped to the image, or `None` when nothing of it is visible.
fn to_pixels(bbox: &BoundingBox, dims: (u32, u32)) -> Option<[u32; 4]> {
    let (w, h) = dims;
    if w == 0 || h == 0 {
        return None;
    }
    let clamp = |v: f32, max: u32| -> u32 { v.max(0.0).min((max - 1) as f32) as u32 };
    let x0 = clamp(bbox.x1, w);
    let y0 = clamp(bbox.y1, h);
    let x1 = clamp(bbox.x2, w);
    let y1 = clamp(bbox.y2, h);
    if x0 > x1 || y0 > y1 {
        return None;
    }
    Some([x0, y0, x1, y1])
}

pub fn draw_rect(img: &mut RgbaImage, bbox_px: [u32; 4], color: Rgba<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx1 >= w || yy1 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

/// Re-reads the source image and draws every detection onto it.
pub fn annotate(result: &DetectionResult) -> Result<RgbaImage> {
    let mut img = decode_image(&result.image)?.into_rgba8();
    let thickness = (img.width().max(img.height()) / 320).max(2);

    for detection in &result.detections {
        if let Some(px) = to_pixels(&detection.bbox, img.dimensions()) {
            draw_rect(&mut img, px, class_color(detection.class_id), thickness);
        }
    }
    Ok(img)
}

pub fn save_annotated(result: &DetectionResult, output: &Path) -> Result<()> {
    let img = annotate(result)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    img.save(output)
        .map_err(|e| Error::Io(std::io::Error::other(format!("{:?}: {}", output, e))))?;
    tracing::debug!("Wrote annotated image to {:?}", output);
    Ok(())
}

/// `<dir>/<stem>.detections.png` next to the input image.
pub fn default_output_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    image.with_file_name(format!("{}.detections.png", stem))
}

pub struct AnnotatePresenter {
    output: Option<PathBuf>,
}

impl AnnotatePresenter {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }
}

impl Presenter for AnnotatePresenter {
    fn present(&self, result: &DetectionResult) -> Result<()> {
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&result.image));
        save_annotated(result, &output)?;

        println!(
            "✓ Annotated {} detections: {}",
            result.detections.len(),
            output.display()
        );
        Ok(())
    }
}
