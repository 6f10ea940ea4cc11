pub mod overlay;
pub mod text;
pub mod viewer;

use crate::detector::DetectionResult;
use crate::error::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use overlay::AnnotatePresenter;
pub use text::{JsonPresenter, TablePresenter};
pub use viewer::ViewerPresenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table on stdout
    #[default]
    Table,
    /// Pretty-printed JSON on stdout
    Json,
    /// Draw boxes onto a copy of the image and save it
    Annotate,
    /// Draw boxes and open the result in the system image viewer
    Show,
}

pub trait Presenter {
    fn present(&self, result: &DetectionResult) -> Result<()>;
}

pub fn presenter_for(
    format: OutputFormat,
    save: Option<PathBuf>,
    scratch_dir: &Path,
) -> Box<dyn Presenter> {
    match format {
        OutputFormat::Table => Box::new(TablePresenter),
        OutputFormat::Json => Box::new(JsonPresenter),
        OutputFormat::Annotate => Box::new(AnnotatePresenter::new(save)),
        OutputFormat::Show => Box::new(ViewerPresenter::new(scratch_dir.to_path_buf(), save)),
    }
}
