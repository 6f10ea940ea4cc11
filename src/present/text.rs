use crate::detector::DetectionResult;
use crate::error::Result;
use crate::present::Presenter;
use std::fmt::Write;

pub struct TablePresenter;

impl Presenter for TablePresenter {
    fn present(&self, result: &DetectionResult) -> Result<()> {
        print!("{}", render_table(result));
        Ok(())
    }
}

pub struct JsonPresenter;

impl Presenter for JsonPresenter {
    fn present(&self, result: &DetectionResult) -> Result<()> {
        println!("{}", render_json(result)?);
        Ok(())
    }
}

pub fn render_json(result: &DetectionResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn render_table(result: &DetectionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Image: {} ({}x{})",
        result.image.display(),
        result.width,
        result.height
    );
    let _ = writeln!(out, "Model: {}", result.model);

    if result.detections.is_empty() {
        let _ = writeln!(out, "No objects detected ({:.1} ms).", result.inference_ms);
        return out;
    }

    let _ = writeln!(
        out,
        "{} objects detected ({:.1} ms):\n",
        result.detections.len(),
        result.inference_ms
    );

    let label_width = result
        .detections
        .iter()
        .map(|d| d.label.chars().count())
        .max()
        .unwrap_or(0)
        .max("label".len());

    let _ = writeln!(
        out,
        "  {:>3}  {:<label_width$}  {:>6}  {:>8}  {:>8}  {:>8}  {:>8}",
        "#", "label", "conf", "x1", "y1", "x2", "y2"
    );
    for (i, d) in result.detections.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>3}  {:<label_width$}  {:>6.3}  {:>8.1}  {:>8.1}  {:>8.1}  {:>8.1}",
            i + 1,
            d.label,
            d.confidence,
            d.bbox.x1,
            d.bbox.y1,
            d.bbox.x2,
            d.bbox.y2
        );
    }
    out
}
