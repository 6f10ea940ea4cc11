use crate::present::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hubdetect")]
#[command(version, about = "Fetch a detection checkpoint from the model hub and run it on an image", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Download a checkpoint from HuggingFace into the local cache
	Pull {
		/// HuggingFace repository ID (e.g., "MacPaw/yolov11l-ui-elements-detection")
		repo: String,

		/// File inside the repository (e.g., "model.onnx")
		#[arg(long)]
		file: String,

		/// Branch, tag or commit to fetch
		#[arg(long)]
		revision: Option<String>,

		/// Optional alias for the model
		#[arg(long)]
		alias: Option<String>,

		/// Never touch the network; only succeed if the file is already cached
		#[arg(long)]
		offline: bool,
	},

	/// Detect objects in an image
	Detect(DetectArgs),

	/// List models resolved so far
	List,
}

#[derive(Args)]
pub struct DetectArgs {
	/// Image to run detection on
	pub image: PathBuf,

	/// HuggingFace repository ID
	#[arg(long, requires = "file", conflicts_with = "model")]
	pub repo: Option<String>,

	/// File inside the repository
	#[arg(long, requires = "repo")]
	pub file: Option<String>,

	/// Branch, tag or commit to fetch
	#[arg(long, requires = "repo")]
	pub revision: Option<String>,

	/// Alias of a pulled model, or "namespace/name:filename[@revision]"
	#[arg(long)]
	pub model: Option<String>,

	/// How to present the detections
	#[arg(long, value_enum, default_value_t = OutputFormat::Table)]
	pub format: OutputFormat,

	/// Where to write the annotated image (annotate/show formats)
	#[arg(long)]
	pub save: Option<PathBuf>,

	/// Minimum confidence for a detection to be reported
	#[arg(long)]
	pub conf: Option<f32>,

	/// IoU threshold for non-maximum suppression
	#[arg(long)]
	pub iou: Option<f32>,

	/// Maximum number of detections to report
	#[arg(long)]
	pub max_det: Option<usize>,

	/// Square input size the model expects
	#[arg(long)]
	pub imgsz: Option<u32>,

	/// Class names file, one name per line
	#[arg(long)]
	pub labels: Option<PathBuf>,

	/// Device to run on (e.g., "cpu" or "cuda:0")
	#[arg(long)]
	pub device: Option<String>,

	/// Never touch the network; only use cached checkpoints
	#[arg(long)]
	pub offline: bool,
}
