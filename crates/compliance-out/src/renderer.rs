//! Template rendering for compliance-out.
//!
//! Uses Handlebars with HTML escaping turned off (the output is Markdown or
//! plain text) and these custom helpers:
//! - percent: format a percentage value with one decimal
//! - status_icon: icon for a lowercase control status
//! - eq: equality block helper for conditionals
//! - join: join an array with a separator
//! - default: fallback for null values

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, Renderable,
};
use serde_json::Value;

use crate::templates::TemplatesFile;
use crate::RenderError;

/// Compiled renderer with registered helpers
pub struct TemplateRenderer<'a> {
    handlebars: Handlebars<'a>,
    templates: TemplatesFile,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(templates: TemplatesFile) -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars.register_helper("percent", Box::new(PercentHelper));
        handlebars.register_helper("status_icon", Box::new(StatusIconHelper));
        handlebars.register_helper("eq", Box::new(EqHelper));
        handlebars.register_helper("join", Box::new(JoinHelper));
        handlebars.register_helper("default", Box::new(DefaultHelper));

        for (name, template) in &templates.templates {
            handlebars
                .register_template_string(name, &template.template)
                .map_err(|e| RenderError::Templates(format!("template '{}': {}", name, e)))?;
        }

        Ok(TemplateRenderer {
            handlebars,
            templates,
        })
    }

    /// Renderer over the compiled-in templates
    pub fn builtin() -> Result<Self, RenderError> {
        Self::new(TemplatesFile::builtin()?)
    }

    pub fn render(&self, template_name: &str, data: &Value) -> Result<String, RenderError> {
        self.handlebars
            .render(template_name, data)
            .map_err(|e| RenderError::Template(e.to_string()))
    }

    /// Render an ad-hoc template string with the same helpers
    pub fn render_string(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        self.handlebars
            .render_template(template, data)
            .map_err(|e| RenderError::Template(e.to_string()))
    }

    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.list_templates()
    }
}

// ============================================================================
// Custom Helpers
// ============================================================================

/// 33.333 -> "33.3%"
struct PercentHelper;

impl HelperDef for PercentHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h.param(0).and_then(|v| v.value().as_f64()).unwrap_or(0.0);
        out.write(&format!("{:.1}%", value))?;
        Ok(())
    }
}

struct StatusIconHelper;

impl HelperDef for StatusIconHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let status = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
        out.write(status_icon(status))?;
        Ok(())
    }
}

pub(crate) fn status_icon(status: &str) -> &'static str {
    match status {
        "passed" => "✅",
        "failed" => "❌",
        "manual" => "⚠️",
        "error" => "⛔",
        _ => "•",
    }
}

/// Equality comparison helper for conditionals
struct EqHelper;

impl HelperDef for EqHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let left = h.param(0).map(|v| v.value());
        let right = h.param(1).map(|v| v.value());

        let equal = match (left, right) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        };

        if equal {
            if let Some(template) = h.template() {
                template.render(r, ctx, rc, out)?;
            }
        } else if let Some(template) = h.inverse() {
            template.render(r, ctx, rc, out)?;
        }

        Ok(())
    }
}

struct JoinHelper;

impl HelperDef for JoinHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let separator = h.param(1).and_then(|v| v.value().as_str()).unwrap_or(", ");

        if let Some(arr) = h.param(0).and_then(|v| v.value().as_array()) {
            let strings: Vec<String> = arr
                .iter()
                .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                .collect();
            out.write(&strings.join(separator))?;
        }

        Ok(())
    }
}

struct DefaultHelper;

impl HelperDef for DefaultHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let default = h.param(1).and_then(|v| v.value().as_str()).unwrap_or("");

        match h.param(0).map(|v| v.value()) {
            Some(v) if !v.is_null() => match v.as_str() {
                Some(s) => out.write(s)?,
                None => out.write(&v.to_string())?,
            },
            _ => out.write(default)?,
        }

        Ok(())
    }
}
