//! compliance-checker command line
//!
//! Every engine operation is a subcommand. Handlers live in [`handlers`] and
//! return the text to print, so they can be driven from tests.

pub mod handlers;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use handlers::App;

/// Validate Azure resources against regulatory compliance checklists
#[derive(Debug, Parser)]
#[command(name = "compliance-checker", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, env = "COMPLIANCE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read resources from a JSON snapshot instead of the Azure CLI
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Report templates file (YAML) replacing the built-in set
    #[arg(long, env = "COMPLIANCE_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// Azure subscription passed to `az`
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription: Option<String>,

    /// Number of controls validated concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Every matching resource must satisfy every rule
    #[arg(long)]
    pub strict: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List checklists in the checklists directory
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Load a checklist and show its control counts
    Load { checklist: String },
    /// Validate every control, or a single one with --index
    Validate {
        checklist: String,
        /// 0-based control index
        #[arg(long)]
        index: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Validate a single control defined in a YAML file
    ValidateCustom { file: PathBuf },
    /// List resources of one type (first five shown)
    CheckResource {
        resource_type: String,
        #[arg(long)]
        json: bool,
    },
    /// Render the full report to stdout or a file
    Report {
        checklist: String,
        #[arg(long, default_value = "markdown")]
        format: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Per-regulation compliance summary
    Summary { checklist: String },
    /// Remediation plan for failed controls
    Remediation {
        checklist: String,
        #[arg(long)]
        json: bool,
    },
    /// Write a timestamped report into the reports directory
    Export {
        checklist: String,
        #[arg(long, default_value = "markdown")]
        format: String,
    },
}

/// Log filter: `LOG_LEVEL`, then `RUST_LOG`, then info (debug with --verbose)
pub fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level.to_lowercase()).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Logs go to stderr so that JSON on stdout stays parseable
pub fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let app = App::from_cli(&cli)?;
    match cli.command {
        Command::List { dir } => app.list(dir),
        Command::Load { checklist } => app.load(&checklist),
        Command::Validate {
            checklist,
            index: Some(index),
            json,
        } => app.validate_one(&checklist, index, json).await,
        Command::Validate {
            checklist,
            index: None,
            json,
        } => app.validate_all(&checklist, json).await,
        Command::ValidateCustom { file } => app.validate_custom(&file).await,
        Command::CheckResource {
            resource_type,
            json,
        } => app.check_resource(&resource_type, json).await,
        Command::Report {
            checklist,
            format,
            output,
        } => app.report(&checklist, &format, output).await,
        Command::Summary { checklist } => app.summary(&checklist).await,
        Command::Remediation { checklist, json } => app.remediation(&checklist, json).await,
        Command::Export { checklist, format } => app.export(&checklist, &format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_validate_index() {
        let cli = Cli::try_parse_from([
            "compliance-checker",
            "--snapshot",
            "inventory.json",
            "--strict",
            "--templates",
            "custom.yaml",
            "validate",
            "fsi-baseline",
            "--index",
            "2",
        ])
        .unwrap();
        assert!(cli.strict);
        assert_eq!(cli.templates, Some(PathBuf::from("custom.yaml")));
        assert!(matches!(
            cli.command,
            Command::Validate { index: Some(2), json: false, .. }
        ));
    }

    #[test]
    fn test_parse_report_defaults_to_markdown() {
        let cli = Cli::try_parse_from(["compliance-checker", "report", "fsi-baseline"]).unwrap();
        match cli.command {
            Command::Report { format, output, .. } => {
                assert_eq!(format, "markdown");
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
