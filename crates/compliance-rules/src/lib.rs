//! Compliance Rules: rule evaluation and control validation
//!
//! ```text
//! Control ─► query inventory per resource type ─► resolve property path
//!                                                        │
//!                      ControlResult ◄─ combine ◄─ evaluate CheckKind
//! ```
//!
//! # Example
//!
//! ```
//! use compliance_core::{CheckKind, Control, EngineConfig, ResourceRequirement,
//!     StaticInventory, ValidationRule, ControlStatus};
//! use compliance_rules::ControlValidator;
//! use serde_json::json;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let control = Control::new("RGPD / CNIL", "Protection des clés").with_requirement(
//!     ResourceRequirement::new("Microsoft.KeyVault/vaults")
//!         .required()
//!         .with_rule(ValidationRule::new(
//!             "properties.enableSoftDelete",
//!             CheckKind::Equals,
//!             json!(true),
//!         )),
//! );
//! let inventory = StaticInventory::new().with_resources(
//!     "Microsoft.KeyVault/vaults",
//!     vec![json!({ "name": "kv1", "properties": { "enableSoftDelete": true } })],
//! );
//! let config = EngineConfig::default();
//!
//! let result = ControlValidator::new(&inventory, &config).validate(0, &control).await;
//! assert_eq!(result.status, ControlStatus::Passed);
//! # });
//! ```

pub mod rule;
pub mod validator;

pub use rule::{evaluate, RuleEvaluation};
pub use validator::{validate_control, ControlValidator};

use compliance_core::{resolve, ResourceDescription, ValidationRule};

/// Evaluate a rule directly against a resource description
pub fn evaluate_resource(rule: &ValidationRule, resource: &ResourceDescription) -> RuleEvaluation {
    evaluate(rule, resolve(resource, &rule.property_path))
}
