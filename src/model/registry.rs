use crate::error::{Error, Result};
use crate::model::ModelReference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedModel {
    pub alias: Option<String>,
    pub model_path: PathBuf,
    pub resolved_at: String,
    pub reference: ModelReference,
}

impl CachedModel {
    pub fn key(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.reference.to_string())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: HashMap<String, CachedModel>,
}

impl ModelRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let registry: ModelRegistry = toml::from_str(&content)?;
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Inserts or replaces the entry; a previous entry for the same reference
    /// under a different key is kept so older aliases stay usable.
    pub fn add_model(&mut self, model: CachedModel) {
        self.models.insert(model.key(), model);
    }

    pub fn get_model(&self, name: &str) -> Result<&CachedModel> {
        self.models
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("No pulled model named '{}'", name)))
    }

    pub fn find_reference(&self, reference: &ModelReference) -> Option<&CachedModel> {
        self.models.values().find(|m| &m.reference == reference)
    }

    pub fn list_models(&self) -> Vec<&CachedModel> {
        let mut models: Vec<&CachedModel> = self.models.values().collect();
        models.sort_by_key(|m| m.key());
        models
    }
}
