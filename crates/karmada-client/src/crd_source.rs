//! CheckpointBackup CRD definition sources
//!
//! Member clusters need the CheckpointBackup CRD before propagated backups
//! can land there. The definition is taken from the first readable file in
//! the search list, falling back to the definition generated from the
//! `CheckpointBackup` type.

use crate::error::KarmadaError;
use crds::{CHECKPOINT_BACKUP_CRD_NAME, checkpoint_backup_crd_yaml};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default CRD file locations, searched in order
pub const DEFAULT_CRD_SEARCH_PATHS: &[&str] = &[
    "/etc/crds/migration.dcnlab.com_checkpointbackups.yaml",
    "/app/crds/migration.dcnlab.com_checkpointbackups.yaml",
    "config/crd/bases/migration.dcnlab.com_checkpointbackups.yaml",
];

/// Where a loaded CRD definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrdOrigin {
    File(PathBuf),
    BuiltIn,
}

impl fmt::Display for CrdOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrdOrigin::File(path) => write!(f, "file {}", path.display()),
            CrdOrigin::BuiltIn => write!(f, "built-in definition"),
        }
    }
}

/// Ordered list of CRD files with a built-in fallback
#[derive(Debug, Clone)]
pub struct CrdSource {
    search_paths: Vec<PathBuf>,
}

impl Default for CrdSource {
    fn default() -> Self {
        Self::new(DEFAULT_CRD_SEARCH_PATHS.iter().map(PathBuf::from).collect())
    }
}

impl CrdSource {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load the CRD definition
    ///
    /// Unreadable or unparsable files are skipped with a warning. A file that
    /// parses but defines a different CRD is skipped too.
    pub async fn load(&self) -> Result<(CustomResourceDefinition, CrdOrigin), KarmadaError> {
        for path in &self.search_paths {
            match read_crd_file(path).await {
                Ok(Some(crd)) => return Ok((crd, CrdOrigin::File(path.clone()))),
                Ok(None) => {}
                Err(e) => warn!("Skipping CRD file {}: {}", path.display(), e),
            }
        }

        debug!("No CRD file found in {} locations, using built-in definition", self.search_paths.len());
        let yaml = checkpoint_backup_crd_yaml()?;
        let crd = parse_crd(&yaml)?;
        Ok((crd, CrdOrigin::BuiltIn))
    }
}

async fn read_crd_file(path: &Path) -> Result<Option<CustomResourceDefinition>, KarmadaError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(KarmadaError::CrdDefinition(e.to_string())),
    };
    parse_crd(&contents).map(Some)
}

/// Parse a CRD manifest, requiring it to be the CheckpointBackup CRD
pub fn parse_crd(yaml: &str) -> Result<CustomResourceDefinition, KarmadaError> {
    let mut crd: CustomResourceDefinition = serde_yaml::from_str(yaml)?;
    match crd.metadata.name.as_deref() {
        Some(CHECKPOINT_BACKUP_CRD_NAME) => {}
        other => {
            return Err(KarmadaError::CrdDefinition(format!(
                "expected {}, found {}",
                CHECKPOINT_BACKUP_CRD_NAME,
                other.unwrap_or("<unnamed>")
            )));
        }
    }
    // Server-populated fields from an exported manifest would be rejected on create
    crd.metadata.resource_version = None;
    crd.metadata.uid = None;
    crd.metadata.creation_timestamp = None;
    crd.metadata.managed_fields = None;
    crd.status = None;
    Ok(crd)
}
