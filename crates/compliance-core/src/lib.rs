//! Compliance Core: data model, property paths, configuration and the
//! resource inventory seam shared by every other crate.

pub mod adapter;
pub mod config;
pub mod context;
pub mod data_model;
pub mod error;
pub mod value;

pub use adapter::{
    check_resource, AdapterError, ResourceInventory, ResourceListing, ResourceSummary,
    StaticInventory,
};
pub use config::{CheckerConfig, EngineConfig, MatchPolicy, RemediationPolicy};
pub use context::ValidationContext;
pub use data_model::{
    CheckKind, ChecklistMeta, ComplianceReport, Control, ControlResult, ControlStatus, Priority,
    RegulationSummary, RemediationItem, RequirementOutcome, RequirementStatus, ResourceRequirement,
    RuleOutcome, Totals, ValidationRule,
};
pub use error::ComplianceError;
pub use value::{resolve, ResourceDescription, Resolved};

/// Engine version recorded in logs
pub const ENGINE_VERSION: &str = "1.0.0";
