use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_REVISION: &str = "main";

/// Identifies one checkpoint file inside a hub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelReference {
    repo_id: String,
    filename: String,
    revision: String,
}

impl ModelReference {
    pub fn new(repo_id: &str, filename: &str, revision: Option<&str>) -> Result<Self> {
        let repo_id = repo_id.trim();
        let filename = filename.trim();
        let revision = revision.map(str::trim).unwrap_or(DEFAULT_REVISION);

        if repo_id.is_empty() {
            return Err(Error::InvalidInput("Repository id cannot be empty".to_string()));
        }
        let mut parts = repo_id.split('/');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(ns), Some(name), None) if !ns.is_empty() && !name.is_empty()
        );
        if !well_formed {
            return Err(Error::InvalidInput(format!(
                "Repository id must look like 'namespace/name', got '{}'",
                repo_id
            )));
        }
        if filename.is_empty() {
            return Err(Error::InvalidInput("Filename cannot be empty".to_string()));
        }
        if revision.is_empty() {
            return Err(Error::InvalidInput("Revision cannot be empty".to_string()));
        }

        Ok(Self {
            repo_id: repo_id.to_string(),
            filename: filename.to_string(),
            revision: revision.to_string(),
        })
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }
}

/// Parses `namespace/name:filename`, optionally suffixed with `@revision`.
impl FromStr for ModelReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (repo_id, rest) = s.split_once(':').ok_or_else(|| {
            Error::InvalidInput(format!(
                "Model reference must look like 'namespace/name:filename[@revision]', got '{}'",
                s
            ))
        })?;
        match rest.rsplit_once('@') {
            Some((filename, revision)) => Self::new(repo_id, filename, Some(revision)),
            None => Self::new(repo_id, rest, None),
        }
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo_id, self.filename)?;
        if self.revision != DEFAULT_REVISION {
            write!(f, "@{}", self.revision)?;
        }
        Ok(())
    }
}
