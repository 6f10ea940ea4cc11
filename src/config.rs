use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
	Cpu,
	Cuda(usize),
}

impl FromStr for Device {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"cpu" => Ok(Device::Cpu),
			s if s.starts_with("cuda") => {
				let parts: Vec<&str> = s.split(':').collect();
				if parts[0] != "cuda" || parts.len() > 2 {
					return Err(Error::InvalidInput(format!("Unknown device: {}", s)));
				}
				let ordinal = if parts.len() > 1 {
					parts[1]
						.parse::<usize>()
						.map_err(|_| Error::InvalidInput(format!("Invalid CUDA device: {}", s)))?
				} else {
					0
				};
				Ok(Device::Cuda(ordinal))
			}
			_ => Err(Error::InvalidInput(format!("Unknown device: {}", s))),
		}
	}
}

impl TryFrom<String> for Device {
	type Error = Error;

	fn try_from(value: String) -> Result<Self> {
		value.parse()
	}
}

impl From<Device> for String {
	fn from(device: Device) -> Self {
		device.to_string()
	}
}

impl fmt::Display for Device {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Device::Cpu => write!(f, "cpu"),
			Device::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
		}
	}
}

/// Settings handed to the model hub client instead of relying on its
/// process-wide defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
	pub endpoint: Option<String>,
	#[serde(skip_serializing)]
	pub token: Option<String>,
	pub cache_dir: Option<PathBuf>,
	pub offline: bool,
	pub progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
	pub confidence: f32,
	pub iou: f32,
	pub max_detections: usize,
	pub input_size: u32,
	pub device: Device,
	pub threads: usize,
	pub labels: Option<PathBuf>,
}

impl Default for DetectConfig {
	fn default() -> Self {
		Self {
			confidence: 0.25,
			iou: 0.45,
			max_detections: 300,
			input_size: 640,
			device: Device::Cpu,
			threads: 4,
			labels: None,
		}
	}
}

impl DetectConfig {
	pub fn validate(&self) -> Result<()> {
		if !(0.0..=1.0).contains(&self.confidence) {
			return Err(Error::InvalidInput(format!(
				"Confidence threshold must be within [0, 1], got {}",
				self.confidence
			)));
		}
		if !(0.0..=1.0).contains(&self.iou) {
			return Err(Error::InvalidInput(format!(
				"IoU threshold must be within [0, 1], got {}",
				self.iou
			)));
		}
		if self.max_detections == 0 {
			return Err(Error::InvalidInput("max_detections must be at least 1".to_string()));
		}
		if self.input_size == 0 || self.input_size % 32 != 0 {
			return Err(Error::InvalidInput(format!(
				"Input size must be a positive multiple of 32, got {}",
				self.input_size
			)));
		}
		if self.threads == 0 {
			return Err(Error::InvalidInput("threads must be at least 1".to_string()));
		}
		Ok(())
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
	hub: HubConfig,
	detect: DetectConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
	pub data_dir: PathBuf,
	pub registry_path: PathBuf,
	pub config_path: PathBuf,
	pub hub: HubConfig,
	pub detect: DetectConfig,
}

impl Config {
	pub fn new() -> Result<Self> {
		let project_dirs = ProjectDirs::from("", "", "hubdetect")
			.ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

		Self::at(project_dirs.data_dir())
	}

	pub fn from_env() -> Result<Self> {
		let mut config = if let Ok(data_dir) = std::env::var("HUBDETECT_DATA_DIR") {
			Self::at(Path::new(&data_dir))?
		} else {
			Self::new()?
		};
		config.apply_env(|key| std::env::var(key).ok());
		Ok(config)
	}

	/// Builds a config rooted at `data_dir`, reading `config.toml` from it when present.
	pub fn at(data_dir: &Path) -> Result<Self> {
		let data_dir = data_dir.to_path_buf();
		let registry_path = data_dir.join("models.toml");
		let config_path = data_dir.join("config.toml");

		std::fs::create_dir_all(&data_dir)?;

		let settings = if config_path.exists() {
			let content = std::fs::read_to_string(&config_path)?;
			toml::from_str::<Settings>(&content)
				.map_err(|e| Error::Config(format!("{}: {}", config_path.display(), e)))?
		} else {
			Settings::default()
		};
		settings.detect.validate()?;
		tracing::debug!("Data directory: {:?}", data_dir);

		Ok(Self {
			data_dir,
			registry_path,
			config_path,
			hub: settings.hub,
			detect: settings.detect,
		})
	}

	pub fn apply_env<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(token) = lookup("HF_TOKEN").filter(|t| !t.is_empty()) {
			self.hub.token = Some(token);
		}
		if let Some(endpoint) = lookup("HF_ENDPOINT").filter(|e| !e.is_empty()) {
			self.hub.endpoint = Some(endpoint);
		}
		if let Some(offline) = lookup("HF_HUB_OFFLINE") {
			self.hub.offline = matches!(offline.trim(), "1" | "true" | "TRUE" | "yes");
		}
		// An explicit cache_dir in config.toml wins over HF_HOME.
		if self.hub.cache_dir.is_none() {
			if let Some(home) = lookup("HF_HOME").filter(|h| !h.is_empty()) {
				self.hub.cache_dir = Some(PathBuf::from(home).join("hub"));
			}
		}
	}

	/// Scratch location for files produced by presenters, e.g. the image handed to a viewer.
	pub fn scratch_dir(&self) -> PathBuf {
		self.data_dir.join("scratch")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	#[test]
	fn parses_devices() {
		assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
		assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
		assert_eq!("cuda:2".parse::<Device>().unwrap(), Device::Cuda(2));
		assert!("cuda:x".parse::<Device>().is_err());
		assert!("cudax".parse::<Device>().is_err());
		assert!("metal".parse::<Device>().is_err());
		assert_eq!(Device::Cuda(1).to_string(), "cuda:1");
	}

	#[test]
	fn defaults_without_config_file() {
		let tmp = tempfile::tempdir().unwrap();
		let config = Config::at(tmp.path()).unwrap();

		assert_eq!(config.registry_path, tmp.path().join("models.toml"));
		assert_eq!(config.config_path, tmp.path().join("config.toml"));
		assert!(!config.config_path.exists());
		assert_eq!(config.detect.confidence, 0.25);
		assert_eq!(config.detect.input_size, 640);
		assert_eq!(config.detect.device, Device::Cpu);
		assert!(!config.hub.offline);
	}

	#[test]
	fn config_file_overrides_defaults() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(
			tmp.path().join("config.toml"),
			r#"
[hub]
endpoint = "https://hub.example.com"
offline = true

[detect]
confidence = 0.5
device = "cuda:1"
"#,
		)
		.unwrap();

		let config = Config::at(tmp.path()).unwrap();
		assert_eq!(config.hub.endpoint.as_deref(), Some("https://hub.example.com"));
		assert!(config.hub.offline);
		assert_eq!(config.detect.confidence, 0.5);
		assert_eq!(config.detect.iou, 0.45);
		assert_eq!(config.detect.device, Device::Cuda(1));
	}

	#[test]
	fn rejects_invalid_config_file() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(tmp.path().join("config.toml"), "[detect]\nconfidence = 3.0\n").unwrap();
		assert!(matches!(Config::at(tmp.path()), Err(Error::InvalidInput(_))));

		std::fs::write(tmp.path().join("config.toml"), "[detect]\ndevice = \"tpu\"\n").unwrap();
		assert!(matches!(Config::at(tmp.path()), Err(Error::Config(_))));
	}

	#[test]
	fn environment_overrides_hub_settings() {
		let tmp = tempfile::tempdir().unwrap();
		let mut config = Config::at(tmp.path()).unwrap();
		let env: HashMap<&str, &str> = [
			("HF_TOKEN", "hf_secret"),
			("HF_ENDPOINT", "https://mirror.example.com"),
			("HF_HUB_OFFLINE", "1"),
		]
		.into_iter()
		.collect();

		config.apply_env(|key| env.get(key).map(|v| v.to_string()));

		assert_eq!(config.hub.token.as_deref(), Some("hf_secret"));
		assert_eq!(config.hub.endpoint.as_deref(), Some("https://mirror.example.com"));
		assert!(config.hub.offline);
		assert!(config.hub.cache_dir.is_none());
	}

	#[test]
	fn hf_home_selects_the_hub_cache() {
		let tmp = tempfile::tempdir().unwrap();
		let hf_home = tmp.path().join("hf-home");
		let mut config = Config::at(tmp.path()).unwrap();

		config.apply_env(|key| (key == "HF_HOME").then(|| hf_home.display().to_string()));
		assert_eq!(config.hub.cache_dir, Some(hf_home.join("hub")));

		std::fs::write(
			tmp.path().join("config.toml"),
			"[hub]\ncache_dir = \"/srv/models\"\n",
		)
		.unwrap();
		let mut config = Config::at(tmp.path()).unwrap();
		config.apply_env(|key| (key == "HF_HOME").then(|| hf_home.display().to_string()));
		assert_eq!(config.hub.cache_dir, Some(PathBuf::from("/srv/models")));
	}

	#[test]
	fn validates_detect_settings() {
		let mut detect = DetectConfig::default();
		assert!(detect.validate().is_ok());

		detect.input_size = 100;
		assert!(detect.validate().is_err());

		detect = DetectConfig { iou: -0.1, ..DetectConfig::default() };
		assert!(detect.validate().is_err());

		detect = DetectConfig { max_detections: 0, ..DetectConfig::default() };
		assert!(detect.validate().is_err());
	}
}
