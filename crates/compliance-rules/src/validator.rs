//! Control validation
//!
//! A requirement with rules is satisfied when at least one matching resource
//! satisfies all of its rules ([`MatchPolicy::Any`]), or when every matching
//! resource does ([`MatchPolicy::All`]).

use compliance_core::value::resource_label;
use compliance_core::{
    AdapterError, ComplianceError, Control, ControlResult, ControlStatus, EngineConfig,
    MatchPolicy, RequirementOutcome, RequirementStatus, ResourceDescription, ResourceInventory,
    ResourceRequirement, RuleOutcome, ValidationContext,
};

use crate::rule::evaluate;

/// Validates single controls against an inventory
pub struct ControlValidator<'a> {
    inventory: &'a dyn ResourceInventory,
    config: &'a EngineConfig,
}

impl<'a> ControlValidator<'a> {
    pub fn new(inventory: &'a dyn ResourceInventory, config: &'a EngineConfig) -> Self {
        Self { inventory, config }
    }

    /// Validate one control. Inventory failures become [`ControlStatus::Error`]
    /// unless a required resource type is already confirmed missing.
    pub async fn validate(&self, index: usize, control: &Control) -> ControlResult {
        if control.manual_verification {
            let mut result = ControlResult::new(index, control.clone(), ControlStatus::Manual);
            result.evidence_notes.push("Manual verification required".to_string());
            if let Some(notes) = &control.notes {
                result.evidence_notes.push(format!("Note: {}", notes));
            }
            tracing::debug!(
                index,
                regulation = %control.regulation,
                "manual control, not evaluated"
            );
            return result;
        }

        let mut result = ControlResult::new(index, control.clone(), ControlStatus::Passed);
        if control.resource_requirements.is_empty() {
            result
                .evidence_notes
                .push("No resource validations defined".to_string());
        }

        for requirement in &control.resource_requirements {
            let outcome = match self.query(&requirement.resource_type).await {
                Ok(resources) => self.check_requirement(requirement, &resources, &mut result),
                Err(err) => {
                    tracing::warn!(
                        index,
                        resource_type = %requirement.resource_type,
                        inventory = self.inventory.name(),
                        error = %err,
                        "inventory query failed"
                    );
                    result
                        .evidence_notes
                        .push(format!("{}: query failed: {}", requirement.resource_type, err));
                    RequirementOutcome {
                        resource_type: requirement.resource_type.clone(),
                        required: requirement.required,
                        matched_resources: 0,
                        compliant_resources: 0,
                        status: RequirementStatus::QueryFailed,
                    }
                }
            };
            result.requirement_outcomes.push(outcome);
        }

        result.status = derive_status(&result.requirement_outcomes);
        tracing::info!(
            index,
            regulation = %control.regulation,
            status = %result.status,
            matched = result.matched_resource_count,
            "control validated"
        );
        result
    }

    async fn query(&self, resource_type: &str) -> Result<Vec<ResourceDescription>, AdapterError> {
        let timeout = self.config.query_timeout();
        match tokio::time::timeout(timeout, self.inventory.query(resource_type)).await {
            Ok(res) => res,
            Err(_) => Err(AdapterError::Timeout {
                resource_type: resource_type.to_string(),
                secs: self.config.query_timeout_secs,
            }),
        }
    }

    fn check_requirement(
        &self,
        requirement: &ResourceRequirement,
        resources: &[ResourceDescription],
        result: &mut ControlResult,
    ) -> RequirementOutcome {
        let resource_type = &requirement.resource_type;
        let mut outcome = RequirementOutcome {
            resource_type: resource_type.clone(),
            required: requirement.required,
            matched_resources: resources.len(),
            compliant_resources: 0,
            status: RequirementStatus::Satisfied,
        };

        if resources.is_empty() {
            if requirement.required {
                outcome.status = RequirementStatus::MissingResources;
                result
                    .evidence_notes
                    .push(format!("{}: no matching resources found (required)", resource_type));
            } else {
                outcome.status = RequirementStatus::Skipped;
                result.evidence_notes.push(format!(
                    "{}: no matching resources found (optional, skipped)",
                    resource_type
                ));
            }
            return outcome;
        }

        result.matched_resource_count += resources.len();
        result
            .evidence_notes
            .push(format!("{}: found {} resource(s)", resource_type, resources.len()));

        if requirement.validation_rules.is_empty() {
            outcome.compliant_resources = resources.len();
            return outcome;
        }

        for resource in resources {
            let label = resource_label(resource);
            let mut compliant = true;
            for rule in &requirement.validation_rules {
                let eval = evaluate(rule, compliance_core::resolve(resource, &rule.property_path));
                compliant &= eval.passed;
                result.rule_outcomes.push(RuleOutcome {
                    resource_type: resource_type.clone(),
                    resource: label.clone(),
                    property_path: rule.property_path.clone(),
                    check: rule.check_kind,
                    passed: eval.passed,
                    explanation: eval.explanation,
                });
            }
            if compliant {
                outcome.compliant_resources += 1;
            }
        }

        let satisfied = match self.config.match_policy {
            MatchPolicy::Any => outcome.compliant_resources > 0,
            MatchPolicy::All => outcome.compliant_resources == resources.len(),
        };
        if !satisfied {
            outcome.status = RequirementStatus::NonCompliant;
        }

        result.evidence_notes.push(format!(
            "{}: {} of {} resource(s) satisfy all {} rule(s)",
            resource_type,
            outcome.compliant_resources,
            resources.len(),
            requirement.validation_rules.len()
        ));
        outcome
    }
}

/// A missing required type fails the control outright; otherwise an
/// unanswered query makes it Error, then any non-compliant requirement fails it
fn derive_status(outcomes: &[RequirementOutcome]) -> ControlStatus {
    let any = |status: RequirementStatus| outcomes.iter().any(|o| o.status == status);

    if any(RequirementStatus::MissingResources) {
        ControlStatus::Failed
    } else if any(RequirementStatus::QueryFailed) {
        ControlStatus::Error
    } else if any(RequirementStatus::NonCompliant) {
        ControlStatus::Failed
    } else {
        ControlStatus::Passed
    }
}

/// Validate the control at `index` of the context's checklist
pub async fn validate_control(
    ctx: &ValidationContext,
    index: usize,
) -> Result<ControlResult, ComplianceError> {
    let control = ctx.control(index)?;
    let validator = ControlValidator::new(ctx.inventory.as_ref(), &ctx.config);
    Ok(validator.validate(index, control).await)
}
