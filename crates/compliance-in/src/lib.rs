//! Compliance-IN: checklist loading
//!
//! Reads YAML checklists into [`Control`] lists, rejecting malformed entries
//! before any validation starts.
//!
//! # Example
//!
//! ```ignore
//! use compliance_in::{list_checklists, load_checklist, summarize};
//!
//! for listing in list_checklists("checklists")? {
//!     println!("{} ({:?} controls)", listing.file_name, listing.control_count);
//! }
//!
//! let checklist = load_checklist("checklists/fsi-baseline.yaml")?;
//! for (regulation, count) in summarize(&checklist).regulations {
//!     println!("{}: {}", regulation, count);
//! }
//! ```

pub mod checklist;

pub use checklist::ChecklistError;

use compliance_core::{ChecklistMeta, Control};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A loaded checklist
#[derive(Debug, Clone, PartialEq)]
pub struct Checklist {
    pub name: String,
    /// blake3 digest of the source bytes
    pub digest: String,
    pub controls: Vec<Control>,
}

impl Checklist {
    pub fn meta(&self) -> ChecklistMeta {
        ChecklistMeta {
            name: self.name.clone(),
            digest: self.digest.clone(),
            control_count: self.controls.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// Load and validate a checklist file
pub fn load_checklist(path: impl AsRef<Path>) -> Result<Checklist, ChecklistError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ChecklistError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "checklist".to_string());

    let checklist = parse_checklist(&stem, &content)?;
    tracing::info!(
        path = %path.display(),
        controls = checklist.len(),
        digest = %checklist.digest,
        "checklist loaded"
    );
    Ok(checklist)
}

/// Parse checklist YAML. A `name:` key in the document wins over `default_name`.
pub fn parse_checklist(default_name: &str, yaml: &str) -> Result<Checklist, ChecklistError> {
    let file: checklist::ChecklistFile =
        serde_yaml::from_str(yaml).map_err(|e| ChecklistError::Parse(e.to_string()))?;

    let controls = file
        .checklist
        .into_iter()
        .enumerate()
        .map(|(index, entry)| checklist::parse_entry(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Checklist {
        name: file.name.unwrap_or_else(|| default_name.to_string()),
        digest: digest(yaml.as_bytes()),
        controls,
    })
}

/// Parse a single control definition, as supplied for ad-hoc validation
pub fn parse_control(yaml: &str) -> Result<Control, ChecklistError> {
    let entry: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| ChecklistError::Parse(e.to_string()))?;
    checklist::parse_entry(0, entry)
}

fn digest(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes).to_hex())
}

/// One checklist file found in a directory
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistListing {
    pub file_name: String,
    pub path: PathBuf,
    /// Present when the file loaded cleanly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// List `*.yaml` / `*.yml` checklists in `dir`, sorted by file name.
///
/// A file that fails to load is still listed, with its error.
pub fn list_checklists(dir: impl AsRef<Path>) -> Result<Vec<ChecklistListing>, ChecklistError> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| ChecklistError::Io {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
        })
        .collect();
    paths.sort();

    let listings = paths
        .into_iter()
        .map(|path| {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match load_checklist(&path) {
                Ok(checklist) => ChecklistListing {
                    file_name,
                    path,
                    control_count: Some(checklist.len()),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "checklist failed to load");
                    ChecklistListing {
                        file_name,
                        path,
                        control_count: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();
    Ok(listings)
}

/// Control counts of a checklist
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistSummary {
    pub name: String,
    pub total: usize,
    pub manual: usize,
    /// (regulation, control count), in order of first appearance
    pub regulations: Vec<(String, usize)>,
}

pub fn summarize(checklist: &Checklist) -> ChecklistSummary {
    let mut regulations: Vec<(String, usize)> = Vec::new();
    for control in &checklist.controls {
        match regulations.iter_mut().find(|(r, _)| *r == control.regulation) {
            Some((_, count)) => *count += 1,
            None => regulations.push((control.regulation.clone(), 1)),
        }
    }

    ChecklistSummary {
        name: checklist.name.clone(),
        total: checklist.len(),
        manual: checklist
            .controls
            .iter()
            .filter(|c| c.manual_verification)
            .count(),
        regulations,
    }
}
