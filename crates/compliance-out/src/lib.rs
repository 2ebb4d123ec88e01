//! Compliance-OUT: report rendering
//!
//! Turns a [`ComplianceReport`] and its remediation plan into Markdown,
//! plain text or JSON. Nothing here changes a result; rendering is
//! format-only.
//!
//! # Example
//!
//! ```ignore
//! use compliance_out::{export, ReportRenderer};
//!
//! let markdown = export(&report, "markdown")?;
//! let json = export(&report, "json")?;
//! assert!(export(&report, "pdf").is_err());
//!
//! let text = ReportRenderer::builtin()?.remediation_text(&plan)?;
//! ```

pub mod renderer;
pub mod templates;

pub use renderer::TemplateRenderer;
pub use templates::TemplatesFile;

use chrono::{DateTime, Utc};
use compliance_core::{ComplianceError, ComplianceReport, ControlResult, RemediationItem};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported format '{0}', use 'markdown' or 'json'")]
    UnsupportedFormat(String),

    #[error("invalid templates: {0}")]
    Templates(String),

    #[error("render error: {0}")]
    Template(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<RenderError> for ComplianceError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Serialize(e) => ComplianceError::from(e),
            other => ComplianceError::RenderError(other.to_string()),
        }
    }
}

/// Static follow-up advice appended to every non-empty remediation plan
pub const RECOMMENDED_ACTIONS: [&str; 5] = [
    "Review each failed control's requirements",
    "Deploy missing Azure resources",
    "Configure Azure Policy assignments",
    "Enable security features (Defender, Sentinel, etc.)",
    "Re-run validation after remediation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            _ => Err(RenderError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportFormat::Markdown => write!(f, "markdown"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Renders reports through a set of named templates
pub struct ReportRenderer<'a> {
    templates: TemplateRenderer<'a>,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(templates: TemplatesFile) -> Result<Self, RenderError> {
        Ok(Self {
            templates: TemplateRenderer::new(templates)?,
        })
    }

    pub fn builtin() -> Result<Self, RenderError> {
        Ok(Self {
            templates: TemplateRenderer::builtin()?,
        })
    }

    pub fn markdown(&self, report: &ComplianceReport) -> Result<String, RenderError> {
        self.templates.render("report", &report_view(report))
    }

    pub fn control(&self, result: &ControlResult) -> Result<String, RenderError> {
        self.templates.render("control", &control_view(result))
    }

    pub fn summary(&self, report: &ComplianceReport) -> Result<String, RenderError> {
        let data = json!({
            "checklistName": report.checklist.as_ref().map(|c| c.name.as_str()),
            "regulations": serde_json::to_value(&report.by_regulation)?,
            "totals": totals_view(report),
            "overallRate": report.overall_rate,
        });
        self.templates.render("summary", &data)
    }

    pub fn remediation_text(&self, items: &[RemediationItem]) -> Result<String, RenderError> {
        let rows: Vec<Value> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                json!({
                    "number": i + 1,
                    "priority": item.priority.to_string(),
                    "regulation": item.regulation,
                    "requirement": item.requirement,
                    "action": item.action,
                })
            })
            .collect();
        let recommended: Vec<String> = RECOMMENDED_ACTIONS
            .iter()
            .enumerate()
            .map(|(i, action)| format!("{}. {}", i + 1, action))
            .collect();

        let data = json!({
            "count": rows.len(),
            "items": rows,
            "recommended": recommended,
        });
        self.templates.render("remediation", &data)
    }

    pub fn export(
        &self,
        report: &ComplianceReport,
        format: ReportFormat,
    ) -> Result<String, RenderError> {
        match format {
            ReportFormat::Markdown => self.markdown(report),
            ReportFormat::Json => render_json(report),
        }
    }
}

/// Full structural JSON of a report, camelCase field names
pub fn render_json(report: &ComplianceReport) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_remediation_json(items: &[RemediationItem]) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(items)?)
}

/// Markdown with the built-in templates
pub fn render_markdown(report: &ComplianceReport) -> Result<String, RenderError> {
    ReportRenderer::builtin()?.markdown(report)
}

/// Render a report in a format named by the caller; anything but
/// markdown or json is rejected
pub fn export(report: &ComplianceReport, format: &str) -> Result<String, RenderError> {
    let format: ReportFormat = format.parse()?;
    tracing::debug!(%format, results = report.results.len(), "exporting report");
    ReportRenderer::builtin()?.export(report, format)
}

/// `compliance_report_20260115_093000.md`
pub fn report_file_name(format: ReportFormat, generated_at: DateTime<Utc>) -> String {
    format!(
        "compliance_report_{}.{}",
        generated_at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

fn totals_view(report: &ComplianceReport) -> Value {
    json!({
        "passed": report.totals.passed,
        "failed": report.totals.failed,
        "manual": report.totals.manual,
        "error": report.totals.error,
        "total": report.totals.total(),
    })
}

fn report_view(report: &ComplianceReport) -> Value {
    let sections: Vec<Value> = report
        .by_regulation
        .iter()
        .map(|summary| {
            let controls: Vec<Value> = report
                .results
                .iter()
                .filter(|r| r.control.regulation == summary.regulation)
                .map(control_view)
                .collect();
            json!({
                "regulation": summary.regulation,
                "passed": summary.totals.passed,
                "failed": summary.totals.failed,
                "manual": summary.totals.manual,
                "error": summary.totals.error,
                "total": summary.total,
                "rate": summary.rate,
                "controls": controls,
            })
        })
        .collect();

    json!({
        "generatedAt": report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        "checklist": report.checklist,
        "matchPolicy": report.match_policy,
        "totals": totals_view(report),
        "overallRate": report.overall_rate,
        "overallAssessedRate": report.overall_assessed_rate,
        "sections": sections,
    })
}

fn control_view(result: &ControlResult) -> Value {
    let failed_rules: Vec<String> = result
        .failed_rules()
        .map(|rule| match &rule.resource {
            Some(resource) => format!("{}: {}", resource, rule.explanation),
            None => rule.explanation.clone(),
        })
        .collect();

    let mut failed_properties: Vec<&str> = Vec::new();
    for rule in result.failed_rules() {
        if !failed_properties.contains(&rule.property_path.as_str()) {
            failed_properties.push(&rule.property_path);
        }
    }

    json!({
        "number": result.control_index + 1,
        "regulation": result.control.regulation,
        "requirement": result.control.requirement,
        "evidence": result.control.evidence,
        "controlStatement": result.control.control_statement,
        "status": result.status,
        "statusLabel": result.status.to_string(),
        "evidenceNotes": result.evidence_notes,
        "failedRules": failed_rules,
        "failedProperties": failed_properties,
    })
}
