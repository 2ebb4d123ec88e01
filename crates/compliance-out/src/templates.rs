//! Template loading for compliance-out.
//!
//! Templates live in a YAML file of named Handlebars templates. The
//! repository's `templates/report-templates.yaml` is compiled in as the
//! default set; a different file can be loaded at runtime.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::RenderError;

/// Built-in templates, shipped with the workspace
const BUILTIN_TEMPLATES: &str = include_str!("../../../templates/report-templates.yaml");

/// Names every templates file must define
pub const REQUIRED_TEMPLATES: [&str; 4] = ["report", "control", "summary", "remediation"];

/// Top-level templates file structure
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesFile {
    pub version: String,
    pub templates: BTreeMap<String, Template>,
}

/// A single template definition
#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub description: String,
    pub template: String,
}

impl TemplatesFile {
    /// The compiled-in default set
    pub fn builtin() -> Result<Self, RenderError> {
        Self::from_yaml(BUILTIN_TEMPLATES)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Templates(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and check that every required template is present
    pub fn from_yaml(yaml: &str) -> Result<Self, RenderError> {
        let file: TemplatesFile =
            serde_yaml::from_str(yaml).map_err(|e| RenderError::Templates(e.to_string()))?;

        if let Some(missing) = REQUIRED_TEMPLATES
            .iter()
            .find(|name| !file.templates.contains_key(**name))
        {
            return Err(RenderError::Templates(format!(
                "missing template '{}'",
                missing
            )));
        }
        Ok(file)
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }
}
