use crate::config::HubConfig;
use crate::error::{Error, Result};
use crate::model::ModelReference;
use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Cache, Repo, RepoType};
use std::path::PathBuf;

/// Remote registry the resolver fetches checkpoints from.
pub trait ModelHub {
    /// Local copy of the file if it is already cached. Never touches the network.
    fn cached(&self, reference: &ModelReference) -> Option<PathBuf>;

    /// Downloads the file into the cache and returns its local path.
    fn fetch(&self, reference: &ModelReference) -> Result<PathBuf>;
}

pub struct HfHub {
    api: Api,
    cache: Cache,
}

impl HfHub {
    pub fn new(config: &HubConfig) -> Result<Self> {
        let cache = match &config.cache_dir {
            Some(dir) => Cache::new(dir.clone()),
            None => Cache::from_env(),
        };

        let mut builder = ApiBuilder::new()
            .with_cache_dir(cache.path().clone())
            .with_progress(config.progress);
        if let Some(token) = &config.token {
            builder = builder.with_token(Some(token.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }

        let api = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to initialize hub client: {}", e)))?;

        tracing::debug!("Hub cache directory: {:?}", cache.path());

        Ok(Self { api, cache })
    }

    fn repo(reference: &ModelReference) -> Repo {
        Repo::with_revision(
            reference.repo_id().to_string(),
            RepoType::Model,
            reference.revision().to_string(),
        )
    }
}

impl ModelHub for HfHub {
    fn cached(&self, reference: &ModelReference) -> Option<PathBuf> {
        self.cache
            .repo(Self::repo(reference))
            .get(reference.filename())
            .filter(|path| path.exists())
    }

    fn fetch(&self, reference: &ModelReference) -> Result<PathBuf> {
        let repo = self.api.repo(Self::repo(reference));

        tracing::debug!("Listing files of {}@{}", reference.repo_id(), reference.revision());
        let info = repo
            .info()
            .map_err(|e| classify_failure(reference.repo_id(), &e.to_string()))?;

        if !info
            .siblings
            .iter()
            .any(|sibling| sibling.rfilename == reference.filename())
        {
            return Err(Error::NotFound(format!(
                "File '{}' does not exist in repository '{}' at revision '{}'",
                reference.filename(),
                reference.repo_id(),
                reference.revision()
            )));
        }

        tracing::info!("Downloading {} from {}", reference.filename(), reference.repo_id());
        repo.get(reference.filename())
            .map_err(|e| classify_failure(&reference.to_string(), &e.to_string()))
    }
}

/// Maps a hub client failure onto the error taxonomy. The hub answers 401 for
/// repositories that do not exist when the request is anonymous, so those count
/// as missing rather than as connectivity problems.
pub fn classify_failure(what: &str, message: &str) -> Error {
    const MISSING: [&str; 4] = [
        "status code 404",
        "status code 401",
        "status code 403",
        "Repository Not Found",
    ];

    if MISSING.iter().any(|marker| message.contains(marker)) {
        Error::NotFound(format!("{} ({})", what, message))
    } else {
        Error::Network(format!("{}: {}", what, message))
    }
}
