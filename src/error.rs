use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Failed to load model: {0}")]
	ModelLoad(String),
	#[error("Failed to decode image: {0}")]
	ImageDecode(String),
	#[error("Display error: {0}")]
	Display(String),
	#[error("Inference error: {0}")]
	Inference(String),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<toml::ser::Error> for Error {
	fn from(err: toml::ser::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
