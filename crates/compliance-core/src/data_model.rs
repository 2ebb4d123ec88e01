//! Data Model: Control, ControlResult, ComplianceReport, RemediationItem
//!
//! JSON field names are camelCase and statuses are lowercase strings. These
//! names are consumed by external tooling and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::config::MatchPolicy;

/// A regulatory requirement expressed as resource types plus property assertions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    /// Regulation label (e.g. "RGPD / CNIL")
    pub regulation: String,
    pub requirement: String,
    /// Description of the audit evidence
    pub evidence: String,
    pub control_statement: String,
    #[serde(default)]
    pub resource_requirements: Vec<ResourceRequirement>,
    /// Manual controls are never evaluated against the inventory
    #[serde(default)]
    pub manual_verification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Control {
    pub fn new(regulation: impl Into<String>, requirement: impl Into<String>) -> Self {
        Self {
            regulation: regulation.into(),
            requirement: requirement.into(),
            evidence: String::new(),
            control_statement: String::new(),
            resource_requirements: Vec::new(),
            manual_verification: false,
            notes: None,
        }
    }

    pub fn with_requirement(mut self, requirement: ResourceRequirement) -> Self {
        self.resource_requirements.push(requirement);
        self
    }

    pub fn manual(mut self) -> Self {
        self.manual_verification = true;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A resource type the control depends on, with its validation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirement {
    /// Cloud provider type identifier (e.g. "Microsoft.KeyVault/vaults")
    pub resource_type: String,
    /// Absence of any matching resource is a failure when set
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
}

impl ResourceRequirement {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            required: false,
            validation_rules: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }
}

/// One typed property assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub property_path: String,
    pub check_kind: CheckKind,
    #[serde(default)]
    pub expected_value: Value,
}

impl ValidationRule {
    pub fn new(
        property_path: impl Into<String>,
        check_kind: CheckKind,
        expected_value: Value,
    ) -> Self {
        Self {
            property_path: property_path.into(),
            check_kind,
            expected_value,
        }
    }

    pub fn exists(property_path: impl Into<String>) -> Self {
        Self::new(property_path, CheckKind::Exists, Value::Null)
    }
}

/// Comparison applied between a resolved property and the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckKind {
    Exists,
    Equals,
    Contains,
    ContainsAny,
    GreaterThan,
    GreaterThanOrEqual,
    In,
}

impl CheckKind {
    pub const ALL: [CheckKind; 7] = [
        CheckKind::Exists,
        CheckKind::Equals,
        CheckKind::Contains,
        CheckKind::ContainsAny,
        CheckKind::GreaterThan,
        CheckKind::GreaterThanOrEqual,
        CheckKind::In,
    ];

    /// Checklist spelling of the check
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Exists => "exists",
            CheckKind::Equals => "equals",
            CheckKind::Contains => "contains",
            CheckKind::ContainsAny => "containsAny",
            CheckKind::GreaterThan => "greaterThan",
            CheckKind::GreaterThanOrEqual => "greaterThanOrEqual",
            CheckKind::In => "in",
        }
    }

    /// Whether the check needs an expected value at all
    pub fn needs_expected(&self) -> bool {
        !matches!(self, CheckKind::Exists)
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = String;

    /// Case-insensitive; `contains_any` and `containsAny` are the same check
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().replace('_', "");
        CheckKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&folded))
            .ok_or_else(|| format!("unknown check '{}'", s))
    }
}

/// Verdict for one control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    Passed,
    Failed,
    Manual,
    /// The inventory could not be queried; the control was not assessed
    Error,
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlStatus::Passed => write!(f, "PASSED"),
            ControlStatus::Failed => write!(f, "FAILED"),
            ControlStatus::Manual => write!(f, "MANUAL"),
            ControlStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of one rule against one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub property_path: String,
    pub check: CheckKind,
    pub passed: bool,
    pub explanation: String,
}

/// How a single resource requirement fared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequirementStatus {
    Satisfied,
    /// Required type with zero matching resources
    MissingResources,
    /// Resources exist but none (or not all, in strict mode) satisfy the rules
    NonCompliant,
    /// Optional type with zero matching resources
    Skipped,
    QueryFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementOutcome {
    pub resource_type: String,
    pub required: bool,
    pub matched_resources: usize,
    pub compliant_resources: usize,
    pub status: RequirementStatus,
}

impl RequirementOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            RequirementStatus::MissingResources | RequirementStatus::NonCompliant
        )
    }
}

/// Result of validating one control; never mutated once returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResult {
    /// Position within the checklist for this run
    pub control_index: usize,
    pub control: Control,
    pub status: ControlStatus,
    pub matched_resource_count: usize,
    pub rule_outcomes: Vec<RuleOutcome>,
    pub requirement_outcomes: Vec<RequirementOutcome>,
    pub evidence_notes: Vec<String>,
}

impl ControlResult {
    pub fn new(control_index: usize, control: Control, status: ControlStatus) -> Self {
        Self {
            control_index,
            control,
            status,
            matched_resource_count: 0,
            rule_outcomes: Vec::new(),
            requirement_outcomes: Vec::new(),
            evidence_notes: Vec::new(),
        }
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.rule_outcomes.iter().filter(|o| !o.passed)
    }
}

/// Per-status counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub passed: usize,
    pub failed: usize,
    pub manual: usize,
    pub error: usize,
}

impl Totals {
    pub fn record(&mut self, status: ControlStatus) {
        match status {
            ControlStatus::Passed => self.passed += 1,
            ControlStatus::Failed => self.failed += 1,
            ControlStatus::Manual => self.manual += 1,
            ControlStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.manual + self.error
    }

    /// passed / total, as a percentage rounded to one decimal
    pub fn rate(&self) -> f64 {
        percentage(self.passed, self.total())
    }

    /// passed / (passed + failed): rate among controls actually assessed
    pub fn assessed_rate(&self) -> f64 {
        percentage(self.passed, self.passed + self.failed)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// Counters and rates for one regulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationSummary {
    pub regulation: String,
    #[serde(flatten)]
    pub totals: Totals,
    pub total: usize,
    pub rate: f64,
    pub assessed_rate: f64,
}

impl RegulationSummary {
    pub fn from_totals(regulation: impl Into<String>, totals: Totals) -> Self {
        Self {
            regulation: regulation.into(),
            totals,
            total: totals.total(),
            rate: totals.rate(),
            assessed_rate: totals.assessed_rate(),
        }
    }
}

/// Where the controls of a run came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistMeta {
    pub name: String,
    /// blake3 digest of the checklist source
    pub digest: String,
    pub control_count: usize,
}

/// Output of one validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<ChecklistMeta>,
    pub match_policy: MatchPolicy,
    /// Same order as the input checklist
    pub results: Vec<ControlResult>,
    pub totals: Totals,
    pub overall_rate: f64,
    pub overall_assessed_rate: f64,
    /// Insertion order of first appearance in the checklist
    pub by_regulation: Vec<RegulationSummary>,
}

impl ComplianceReport {
    /// Look up the summary of one regulation
    pub fn regulation(&self, name: &str) -> Option<&RegulationSummary> {
        self.by_regulation.iter().find(|r| r.regulation == name)
    }

    pub fn results_with_status(
        &self,
        status: ControlStatus,
    ) -> impl Iterator<Item = &ControlResult> {
        self.results.iter().filter(move |r| r.status == status)
    }
}

/// Remediation urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High = 0,
    Medium = 1,
    Low = 2,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

/// One entry of a remediation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationItem {
    pub control_index: usize,
    pub regulation: String,
    pub requirement: String,
    pub priority: Priority,
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_kind_parse() {
        assert_eq!("containsAny".parse::<CheckKind>().unwrap(), CheckKind::ContainsAny);
        assert_eq!("GREATERTHAN".parse::<CheckKind>().unwrap(), CheckKind::GreaterThan);
        assert_eq!("in".parse::<CheckKind>().unwrap(), CheckKind::In);
        assert_eq!(
            "greater_than_or_equal".parse::<CheckKind>().unwrap(),
            CheckKind::GreaterThanOrEqual
        );
        assert!("matches".parse::<CheckKind>().is_err());
    }

    #[test]
    fn test_check_kind_serde_names() {
        let json = serde_json::to_string(&CheckKind::GreaterThanOrEqual).unwrap();
        assert_eq!(json, "\"greaterThanOrEqual\"");
        for kind in CheckKind::ALL {
            let s = serde_json::to_value(kind).unwrap();
            assert_eq!(s, json!(kind.as_str()));
        }
    }

    #[test]
    fn test_totals_rates() {
        let mut totals = Totals::default();
        totals.record(ControlStatus::Passed);
        totals.record(ControlStatus::Failed);
        assert_eq!(totals.rate(), 50.0);

        totals.record(ControlStatus::Manual);
        totals.record(ControlStatus::Error);
        assert_eq!(totals.total(), 4);
        assert_eq!(totals.rate(), 25.0);
        assert_eq!(totals.assessed_rate(), 50.0);
    }

    #[test]
    fn test_rate_rounding() {
        let totals = Totals { passed: 1, failed: 2, manual: 0, error: 0 };
        assert_eq!(totals.rate(), 33.3);
        let totals = Totals { passed: 2, failed: 1, manual: 0, error: 0 };
        assert_eq!(totals.rate(), 66.7);
        assert_eq!(Totals::default().rate(), 0.0);
    }

    #[test]
    fn test_regulation_summary_json_fields() {
        let summary = RegulationSummary::from_totals(
            "DORA",
            Totals { passed: 1, failed: 1, manual: 0, error: 0 },
        );
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["regulation"], "DORA");
        assert_eq!(value["passed"], 1);
        assert_eq!(value["total"], 2);
        assert_eq!(value["rate"], 50.0);
        assert_eq!(value["assessedRate"], 50.0);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(ControlStatus::Manual).unwrap(), json!("manual"));
        assert_eq!(ControlStatus::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_priority_ordering() {
        let mut p = vec![Priority::Low, Priority::High, Priority::Medium];
        p.sort();
        assert_eq!(p, vec![Priority::High, Priority::Medium, Priority::Low]);
    }
}
