//! Subcommand handlers

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use compliance_azure::AzCliInventory;
use compliance_core::{
    check_resource, CheckerConfig, ControlResult, ControlStatus, MatchPolicy, ResourceInventory,
    StaticInventory, ValidationContext,
};
use compliance_in::{
    list_checklists, load_checklist, parse_control, summarize, Checklist, ChecklistError,
};
use compliance_metrics::{aggregate, RemediationPlanner};
use compliance_out::{
    render_json, render_remediation_json, report_file_name, RenderError, ReportFormat,
    ReportRenderer, TemplatesFile,
};
use compliance_rules::{validate_control, ControlValidator};

/// Parse one inline control and validate it as control index 0
pub async fn validate_custom_control(
    ctx: &ValidationContext,
    yaml: &str,
) -> Result<ControlResult, ChecklistError> {
    let control = parse_control(yaml)?;
    let validator = ControlValidator::new(ctx.inventory.as_ref(), &ctx.config);
    Ok(validator.validate(0, &control).await)
}

/// Configuration plus the inventory every command runs against
pub struct App {
    pub config: CheckerConfig,
    inventory: Arc<dyn ResourceInventory>,
    /// `None` renders with the built-in templates
    templates: Option<TemplatesFile>,
}

impl App {
    pub fn new(config: CheckerConfig, inventory: Arc<dyn ResourceInventory>) -> Self {
        Self {
            config,
            inventory,
            templates: None,
        }
    }

    pub fn with_templates(mut self, templates: TemplatesFile) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn from_cli(cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config = CheckerConfig::load(cli.config.as_deref())?;
        if let Some(concurrency) = cli.concurrency {
            config.engine.concurrency = concurrency.max(1);
        }
        if cli.strict {
            config.engine.match_policy = MatchPolicy::All;
        }

        let inventory: Arc<dyn ResourceInventory> = match &cli.snapshot {
            Some(path) => {
                tracing::info!(snapshot = %path.display(), "using snapshot inventory");
                Arc::new(StaticInventory::from_snapshot_file(path)?)
            }
            None => {
                let mut az = AzCliInventory::new();
                if let Some(subscription) = &cli.subscription {
                    az = az.with_subscription(subscription.clone());
                }
                Arc::new(az)
            }
        };

        let app = Self::new(config, inventory);
        match &cli.templates {
            Some(path) => {
                tracing::info!(templates = %path.display(), "using custom report templates");
                Ok(app.with_templates(TemplatesFile::load(path)?))
            }
            None => Ok(app),
        }
    }

    fn renderer(&self) -> Result<ReportRenderer<'static>, RenderError> {
        match &self.templates {
            Some(templates) => ReportRenderer::new(templates.clone()),
            None => ReportRenderer::builtin(),
        }
    }

    /// A path as given, else a file of that name in the checklists directory
    pub fn resolve_checklist(&self, name: &str) -> PathBuf {
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return direct;
        }
        let dir = &self.config.checklists_dir;
        ["", ".yaml", ".yml"]
            .iter()
            .map(|ext| dir.join(format!("{}{}", name, ext)))
            .find(|p| p.is_file())
            .unwrap_or(direct)
    }

    fn checklist(&self, name: &str) -> anyhow::Result<Checklist> {
        let path = self.resolve_checklist(name);
        load_checklist(&path).with_context(|| format!("loading checklist {}", path.display()))
    }

    fn context(&self, checklist: &Checklist) -> ValidationContext {
        ValidationContext::new(checklist.controls.clone(), self.inventory.clone())
            .with_config(self.config.engine.clone())
            .with_checklist(checklist.meta())
    }

    pub fn list(&self, dir: Option<PathBuf>) -> anyhow::Result<String> {
        let dir = dir.unwrap_or_else(|| self.config.checklists_dir.clone());
        let listings = list_checklists(&dir)?;
        if listings.is_empty() {
            return Ok(format!("No checklists found in {}", dir.display()));
        }

        let mut out = format!("Available checklists ({}):\n", listings.len());
        for listing in listings {
            match (listing.control_count, listing.error) {
                (Some(count), _) => {
                    out.push_str(&format!("  {} ({} controls)\n", listing.file_name, count))
                }
                (None, Some(error)) => {
                    out.push_str(&format!("  {} (error: {})\n", listing.file_name, error))
                }
                (None, None) => out.push_str(&format!("  {}\n", listing.file_name)),
            }
        }
        Ok(out)
    }

    pub fn load(&self, name: &str) -> anyhow::Result<String> {
        let checklist = self.checklist(name)?;
        let summary = summarize(&checklist);

        let mut out = format!(
            "Checklist {}: {} controls ({} manual)\n{}\n",
            summary.name, summary.total, summary.manual, checklist.digest
        );
        for (regulation, count) in &summary.regulations {
            out.push_str(&format!("  {}: {} controls\n", regulation, count));
        }
        Ok(out)
    }

    pub async fn validate_one(
        &self,
        name: &str,
        index: usize,
        json: bool,
    ) -> anyhow::Result<String> {
        let checklist = self.checklist(name)?;
        let result = validate_control(&self.context(&checklist), index).await?;
        if json {
            Ok(serde_json::to_string_pretty(&result)?)
        } else {
            Ok(self.renderer()?.control(&result)?)
        }
    }

    pub async fn validate_all(&self, name: &str, json: bool) -> anyhow::Result<String> {
        let checklist = self.checklist(name)?;
        let report = aggregate(&self.context(&checklist)).await;
        if json {
            return Ok(render_json(&report)?);
        }

        let mut out = String::new();
        for result in &report.results {
            out.push_str(&format!(
                "#{} [{}] {}: {}\n",
                result.control_index + 1,
                result.status,
                result.control.regulation,
                result.control.requirement
            ));
        }
        out.push_str(&format!(
            "\n{} controls: {} passed, {} failed, {} manual, {} error. \
             Compliance rate {:.1}% (assessed {:.1}%)\n",
            report.totals.total(),
            report.totals.passed,
            report.totals.failed,
            report.totals.manual,
            report.totals.error,
            report.overall_rate,
            report.overall_assessed_rate
        ));
        Ok(out)
    }

    pub async fn validate_custom(&self, file: &Path) -> anyhow::Result<String> {
        let yaml = std::fs::read_to_string(file)
            .with_context(|| format!("reading control {}", file.display()))?;
        let ctx = ValidationContext::new(Vec::new(), self.inventory.clone())
            .with_config(self.config.engine.clone());
        let result = validate_custom_control(&ctx, &yaml).await?;
        Ok(self.renderer()?.control(&result)?)
    }

    pub async fn check_resource(&self, resource_type: &str, json: bool) -> anyhow::Result<String> {
        let listing = check_resource(self.inventory.as_ref(), resource_type).await?;
        if json {
            return Ok(serde_json::to_string_pretty(&listing)?);
        }

        let mut out = format!(
            "Found {} resource(s) of type {}\n",
            listing.count, listing.resource_type
        );
        for resource in &listing.resources {
            out.push_str(&format!(
                "  {} ({}, {})\n",
                resource.name.as_deref().unwrap_or("<unnamed>"),
                resource.location.as_deref().unwrap_or("-"),
                resource.resource_group.as_deref().unwrap_or("-")
            ));
        }
        if listing.count > listing.resources.len() {
            out.push_str(&format!("  ... and {} more\n", listing.count - listing.resources.len()));
        }
        Ok(out)
    }

    pub async fn report(
        &self,
        name: &str,
        format: &str,
        output: Option<PathBuf>,
    ) -> anyhow::Result<String> {
        let format: ReportFormat = format.parse()?;
        let checklist = self.checklist(name)?;
        let report = aggregate(&self.context(&checklist)).await;
        let rendered = self.renderer()?.export(&report, format)?;

        match output {
            Some(path) => {
                std::fs::write(&path, rendered)
                    .with_context(|| format!("writing {}", path.display()))?;
                Ok(format!("Report written to {}", path.display()))
            }
            None => Ok(rendered),
        }
    }

    pub async fn summary(&self, name: &str) -> anyhow::Result<String> {
        let checklist = self.checklist(name)?;
        let report = aggregate(&self.context(&checklist)).await;
        Ok(self.renderer()?.summary(&report)?)
    }

    pub async fn remediation(&self, name: &str, json: bool) -> anyhow::Result<String> {
        let checklist = self.checklist(name)?;
        let report = aggregate(&self.context(&checklist)).await;
        let items = RemediationPlanner::new(self.config.remediation.clone()).plan(&report);
        if json {
            Ok(render_remediation_json(&items)?)
        } else {
            Ok(self.renderer()?.remediation_text(&items)?)
        }
    }

    pub async fn export(&self, name: &str, format: &str) -> anyhow::Result<String> {
        let format: ReportFormat = format.parse()?;
        let checklist = self.checklist(name)?;
        let report = aggregate(&self.context(&checklist)).await;
        let rendered = self.renderer()?.export(&report, format)?;

        let dir = &self.config.reports_dir;
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(report_file_name(format, report.generated_at));
        std::fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;

        let not_assessed = report.results_with_status(ControlStatus::Error).count();
        tracing::info!(path = %path.display(), %format, not_assessed, "audit report exported");
        Ok(format!(
            "Audit report exported: {}\nFormat: {}\nControls: {}",
            path.display(),
            format.to_string().to_uppercase(),
            report.results.len()
        ))
    }
}
