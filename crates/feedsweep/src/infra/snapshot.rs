//! Page snapshot and mutation script persistence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::dom::Dom;
use crate::domain::selector::Selector;
use crate::infra::document::{Document, NodeSpec};

/// On-disk encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot extension for {0} (expected .json, .yaml or .yml)")]
    UnknownFormat(PathBuf),
    #[error("batch {batch}: no element matches insertion parent '{parent}'")]
    MissingParent { batch: usize, parent: String },
}

impl SnapshotFormat {
    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(SnapshotFormat::Json),
            Some("yaml" | "yml") => Ok(SnapshotFormat::Yaml),
            _ => Err(SnapshotError::UnknownFormat(path.to_path_buf())),
        }
    }
}

pub fn load_page(path: &Path) -> Result<Document> {
    let format = SnapshotFormat::from_path(path)?;
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read page snapshot {}", path.display()))?;
    let doc = match format {
        SnapshotFormat::Json => Document::from_json(&data),
        SnapshotFormat::Yaml => Document::from_yaml(&data),
    };
    doc.with_context(|| format!("invalid page snapshot {}", path.display()))
}

pub fn render_page(doc: &Document, format: SnapshotFormat) -> Result<String> {
    let snapshot = doc.to_snapshot();
    match format {
        SnapshotFormat::Json => {
            serde_json::to_string_pretty(&snapshot).context("failed to serialize page as JSON")
        }
        SnapshotFormat::Yaml => {
            serde_yaml::to_string(&snapshot).context("failed to serialize page as YAML")
        }
    }
}

/// Write `doc` to `path`, creating parent directories as needed.
pub fn save_page(path: &Path, doc: &Document) -> Result<()> {
    let format = SnapshotFormat::from_path(path)?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }
    let data = render_page(doc, format)?;
    fs::write(path, data)
        .with_context(|| format!("failed to write page snapshot to {}", path.display()))?;
    Ok(())
}

/// Insertion batches replayed against a loaded page, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationScript {
    #[serde(default)]
    pub batches: Vec<ScriptBatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBatch {
    #[serde(default)]
    pub insertions: Vec<Insertion>,
}

/// Append `nodes` under the first element matching `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insertion {
    pub parent: String,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl MutationScript {
    pub fn load(path: &Path) -> Result<Self> {
        let format = SnapshotFormat::from_path(path)?;
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read mutation script {}", path.display()))?;
        let script: Result<Self> = match format {
            SnapshotFormat::Json => serde_json::from_str(&data).map_err(anyhow::Error::from),
            SnapshotFormat::Yaml => serde_yaml::from_str(&data).map_err(anyhow::Error::from),
        };
        script.with_context(|| format!("invalid mutation script {}", path.display()))
    }
}

impl ScriptBatch {
    /// Apply every insertion to `doc`. Insertions are recorded as mutations.
    pub fn apply(&self, index: usize, doc: &mut Document) -> Result<()> {
        for insertion in &self.insertions {
            let selector = Selector::parse(&insertion.parent)
                .with_context(|| format!("batch {index}: invalid parent selector"))?;
            let parent = selector
                .select_inclusive(&*doc, doc.body())
                .first()
                .copied()
                .ok_or_else(|| SnapshotError::MissingParent {
                    batch: index,
                    parent: insertion.parent.clone(),
                })?;
            for node in &insertion.nodes {
                doc.insert(parent, node);
            }
        }
        Ok(())
    }
}
