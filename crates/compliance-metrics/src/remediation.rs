//! Remediation planning
//!
//! Only failed controls produce actions. Manual and error results need human
//! judgement and are left out of the plan.

use compliance_core::{
    ComplianceReport, ControlResult, ControlStatus, Priority, RemediationItem, RemediationPolicy,
    RequirementStatus,
};

/// Fallback when a failed result carries no requirement detail
const GENERIC_ACTION: &str = "Review control details and implement required Azure resources";

/// Derives an ordered remediation plan from a report
#[derive(Debug, Clone, Default)]
pub struct RemediationPlanner {
    policy: RemediationPolicy,
}

impl RemediationPlanner {
    pub fn new(policy: RemediationPolicy) -> Self {
        Self { policy }
    }

    /// Priority of a failed control's regulation
    pub fn priority_for(&self, regulation: &str) -> Priority {
        if self.policy.is_low_priority(regulation) {
            Priority::Low
        } else if self.policy.is_critical(regulation) {
            Priority::High
        } else {
            Priority::Medium
        }
    }

    /// Remediation items ordered High → Medium → Low, checklist order within a priority
    pub fn plan(&self, report: &ComplianceReport) -> Vec<RemediationItem> {
        let mut items: Vec<RemediationItem> = report
            .results_with_status(ControlStatus::Failed)
            .map(|result| RemediationItem {
                control_index: result.control_index,
                regulation: result.control.regulation.clone(),
                requirement: result.control.requirement.clone(),
                priority: self.priority_for(&result.control.regulation),
                action: describe_action(result),
            })
            .collect();

        // stable: keeps checklist order inside each priority
        items.sort_by_key(|item| item.priority);
        tracing::debug!(items = items.len(), "remediation plan built");
        items
    }
}

/// Plan with the default policy (every failure is high priority)
pub fn plan(report: &ComplianceReport) -> Vec<RemediationItem> {
    RemediationPlanner::default().plan(report)
}

fn describe_action(result: &ControlResult) -> String {
    let mut actions = Vec::new();

    for outcome in &result.requirement_outcomes {
        match outcome.status {
            RequirementStatus::MissingResources => {
                actions.push(format!(
                    "Deploy {} (no matching resources found)",
                    outcome.resource_type
                ));
            }
            RequirementStatus::NonCompliant => {
                let mut paths: Vec<&str> = Vec::new();
                for rule in result
                    .failed_rules()
                    .filter(|r| r.resource_type == outcome.resource_type)
                {
                    if !paths.contains(&rule.property_path.as_str()) {
                        paths.push(&rule.property_path);
                    }
                }
                actions.push(format!(
                    "Configure {}: {} ({} of {} resource(s) compliant)",
                    outcome.resource_type,
                    paths.join(", "),
                    outcome.compliant_resources,
                    outcome.matched_resources
                ));
            }
            _ => {}
        }
    }

    if actions.is_empty() {
        GENERIC_ACTION.to_string()
    } else {
        actions.join("; ")
    }
}
