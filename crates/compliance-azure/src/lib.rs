//! Compliance-Azure: resource inventory backed by the Azure CLI
//!
//! Each query runs `az resource list --resource-type <type> --output json`
//! and parses the JSON array it prints. Timeouts are applied by the caller.

use async_trait::async_trait;
use compliance_core::{AdapterError, ResourceDescription, ResourceInventory};
use serde_json::Value;
use tokio::process::Command;

/// stderr fragments that mean the CLI has no usable credentials
const AUTH_MARKERS: [&str; 3] = ["az login", "AADSTS", "No subscription found"];

/// Inventory that shells out to `az`
#[derive(Debug, Clone)]
pub struct AzCliInventory {
    program: String,
    /// Arguments placed before `resource list`
    base_args: Vec<String>,
    subscription: Option<String>,
}

impl Default for AzCliInventory {
    fn default() -> Self {
        Self {
            program: "az".to_string(),
            base_args: Vec::new(),
            subscription: None,
        }
    }
}

impl AzCliInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a different executable, e.g. a wrapper script
    pub fn with_program(mut self, program: impl Into<String>, base_args: Vec<String>) -> Self {
        self.program = program.into();
        self.base_args = base_args;
        self
    }

    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    /// Full argument list for one query
    pub fn query_args(&self, resource_type: &str) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(
            ["resource", "list", "--resource-type", resource_type, "--output", "json"]
                .iter()
                .map(|s| s.to_string()),
        );
        if let Some(subscription) = &self.subscription {
            args.push("--subscription".to_string());
            args.push(subscription.clone());
        }
        args
    }
}

#[async_trait]
impl ResourceInventory for AzCliInventory {
    async fn query(&self, resource_type: &str) -> Result<Vec<ResourceDescription>, AdapterError> {
        let args = self.query_args(resource_type);
        tracing::debug!(program = %self.program, ?args, "running az query");

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AdapterError::Unavailable(format!("failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(resource_type, stderr));
        }

        parse_resource_list(resource_type, &String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &str {
        "az-cli"
    }
}

fn classify_failure(resource_type: &str, stderr: String) -> AdapterError {
    if AUTH_MARKERS.iter().any(|m| stderr.contains(m)) {
        AdapterError::Auth(stderr)
    } else {
        AdapterError::QueryFailed {
            resource_type: resource_type.to_string(),
            message: stderr,
        }
    }
}

/// Parse `az resource list` output. Empty output means no resources.
pub fn parse_resource_list(
    resource_type: &str,
    stdout: &str,
) -> Result<Vec<ResourceDescription>, AdapterError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let invalid = |message: String| AdapterError::InvalidResponse {
        resource_type: resource_type.to_string(),
        message,
    };

    match serde_json::from_str::<Value>(stdout) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(invalid(format!("expected a JSON array, got {}", kind_of(&other)))),
        Err(e) => Err(invalid(e.to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
