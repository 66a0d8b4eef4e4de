use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The parsed Carta.toml manifest.
#[derive(Debug, Clone)]
pub struct CartaManifest {
    pub project: ProjectSection,
    /// Document paths, resolved relative to `root_dir`.
    pub documents: Vec<PathBuf>,
    /// The directory containing the Carta.toml file.
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    /// The API version stamped onto the resolved schema.
    pub version: String,
}

/// Raw TOML structure for deserialization.
#[derive(Deserialize)]
struct RawManifest {
    project: ProjectSection,
    #[serde(default)]
    documents: Vec<String>,
}

/// Errors that can occur when loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("no Carta.toml found (searched from {0})")]
    NotFound(String),
    #[error("failed to read Carta.toml: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid Carta.toml: {0}")]
    ParseError(String),
    #[error("invalid Carta.toml: 'documents' must list at least one document")]
    NoDocuments,
}

/// Walk up from `start_dir` looking for `Carta.toml`.
/// Returns the path to the manifest file if found.
pub fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join("Carta.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load and validate a Carta.toml manifest from a file path.
pub fn load_manifest(path: &Path) -> Result<CartaManifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    let root_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    parse_manifest(&content, root_dir)
}

/// Parse and validate a Carta.toml manifest from a string.
pub fn parse_manifest(content: &str, root_dir: PathBuf) -> Result<CartaManifest, ManifestError> {
    let raw: RawManifest =
        toml::from_str(content).map_err(|e| ManifestError::ParseError(e.to_string()))?;

    if raw.documents.is_empty() {
        return Err(ManifestError::NoDocuments);
    }

    let documents = raw.documents.iter().map(|d| root_dir.join(d)).collect();

    Ok(CartaManifest {
        project: raw.project,
        documents,
        root_dir,
    })
}

/// Find and load the manifest starting from a directory.
pub fn find_and_load_manifest(start_dir: &Path) -> Result<CartaManifest, ManifestError> {
    let manifest_path = find_manifest(start_dir)
        .ok_or_else(|| ManifestError::NotFound(start_dir.display().to_string()))?;
    load_manifest(&manifest_path)
}
