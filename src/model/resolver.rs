use crate::error::{Error, Result};
use crate::model::{CachedModel, ModelHub, ModelReference, ModelRegistry};
use std::path::PathBuf;

pub struct AssetResolver<H> {
    hub: H,
    registry: ModelRegistry,
    registry_path: PathBuf,
    offline: bool,
}

impl<H: ModelHub> AssetResolver<H> {
    pub fn new(hub: H, registry_path: PathBuf, offline: bool) -> Result<Self> {
        let registry = ModelRegistry::load(&registry_path)?;
        Ok(Self {
            hub,
            registry,
            registry_path,
            offline,
        })
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn hub(&self) -> &H {
        &self.hub
    }

    /// Returns the local path of the referenced file, downloading it on a cache miss.
    pub fn resolve(
        &mut self,
        reference: &ModelReference,
        alias: Option<String>,
    ) -> Result<CachedModel> {
        let model_path = match self.hub.cached(reference) {
            Some(path) => {
                tracing::info!("Using cached {}", reference);
                path
            }
            None if self.offline => {
                return Err(Error::NotFound(format!(
                    "{} is not cached and offline mode is enabled",
                    reference
                )));
            }
            None => {
                tracing::info!("Fetching {} from the model hub", reference);
                self.hub.fetch(reference)?
            }
        };

        if !model_path.exists() {
            return Err(Error::NotFound(format!(
                "Hub reported {:?} for {} but the file does not exist",
                model_path, reference
            )));
        }

        let alias = alias.or_else(|| {
            self.registry
                .find_reference(reference)
                .and_then(|m| m.alias.clone())
        });

        let model = CachedModel {
            alias,
            model_path,
            resolved_at: chrono::Utc::now().to_rfc3339(),
            reference: reference.clone(),
        };

        self.registry.add_model(model.clone());
        self.registry.save(&self.registry_path)?;

        tracing::debug!("Registered {} as '{}'", reference, model.key());

        Ok(model)
    }

    /// Resolves a registry alias or a compact `namespace/name:filename` reference.
    pub fn resolve_name(&mut self, name: &str) -> Result<CachedModel> {
        let reference = match self.registry.get_model(name) {
            Ok(model) => model.reference.clone(),
            Err(_) => name.parse::<ModelReference>().map_err(|_| {
                Error::NotFound(format!(
                    "'{}' is neither a pulled model alias nor a 'namespace/name:filename' reference",
                    name
                ))
            })?,
        };
        self.resolve(&reference, None)
    }
}
