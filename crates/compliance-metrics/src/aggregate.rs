//! Aggregation of control results into a compliance report
//!
//! Controls may be evaluated concurrently (bounded by
//! `EngineConfig::concurrency`), but results are always reassembled in
//! checklist order.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use compliance_core::{
    ComplianceReport, Control, ControlResult, ControlStatus, RegulationSummary, ResourceInventory,
    Totals, ValidationContext,
};
use compliance_rules::ControlValidator;

/// Validate every control of the context and build the report
pub async fn aggregate(ctx: &ValidationContext) -> ComplianceReport {
    let started = Instant::now();
    tracing::info!(
        run_id = %ctx.run_id,
        engine = compliance_core::ENGINE_VERSION,
        controls = ctx.len(),
        concurrency = ctx.config.concurrency,
        "validation run started"
    );

    let results = if ctx.config.concurrency <= 1 {
        run_sequential(ctx).await
    } else {
        run_parallel(ctx).await
    };

    let report = build_report(ctx, results);
    tracing::info!(
        run_id = %ctx.run_id,
        passed = report.totals.passed,
        failed = report.totals.failed,
        manual = report.totals.manual,
        error = report.totals.error,
        rate = report.overall_rate,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "validation run finished"
    );
    report
}

/// Convenience entry point for a plain list of controls
pub async fn aggregate_controls(
    controls: Vec<Control>,
    inventory: Arc<dyn ResourceInventory>,
) -> ComplianceReport {
    aggregate(&ValidationContext::new(controls, inventory)).await
}

async fn run_sequential(ctx: &ValidationContext) -> Vec<ControlResult> {
    let validator = ControlValidator::new(ctx.inventory.as_ref(), &ctx.config);
    let mut results = Vec::with_capacity(ctx.len());
    for (index, control) in ctx.controls.iter().enumerate() {
        results.push(validator.validate(index, control).await);
    }
    results
}

async fn run_parallel(ctx: &ValidationContext) -> Vec<ControlResult> {
    let sem = Arc::new(Semaphore::new(ctx.config.concurrency));
    let mut join_set = JoinSet::new();

    for index in 0..ctx.len() {
        let permit = match sem.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let ctx = ctx.clone();
        join_set.spawn(async move {
            let _permit = permit;
            let validator = ControlValidator::new(ctx.inventory.as_ref(), &ctx.config);
            validator.validate(index, &ctx.controls[index]).await
        });
    }

    let mut slots: Vec<Option<ControlResult>> = vec![None; ctx.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => {
                let index = result.control_index;
                slots[index] = Some(result);
            }
            Err(e) => tracing::error!(run_id = %ctx.run_id, error = %e, "control task aborted"),
        }
    }

    // A control whose task died still gets a result
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                let mut result =
                    ControlResult::new(index, ctx.controls[index].clone(), ControlStatus::Error);
                result
                    .evidence_notes
                    .push("Evaluation aborted before completion".to_string());
                result
            })
        })
        .collect()
}

/// Assemble totals and per-regulation summaries; results keep their order
pub fn build_report(ctx: &ValidationContext, results: Vec<ControlResult>) -> ComplianceReport {
    let (totals, by_regulation) = summarize(&results);
    ComplianceReport {
        generated_at: ctx.timestamp(),
        checklist: ctx.checklist.clone(),
        match_policy: ctx.config.match_policy,
        overall_rate: totals.rate(),
        overall_assessed_rate: totals.assessed_rate(),
        results,
        totals,
        by_regulation,
    }
}

/// Overall totals plus per-regulation summaries in order of first appearance
pub fn summarize(results: &[ControlResult]) -> (Totals, Vec<RegulationSummary>) {
    let mut totals = Totals::default();
    let mut regulations: Vec<(String, Totals)> = Vec::new();

    for result in results {
        totals.record(result.status);
        let regulation = &result.control.regulation;
        match regulations.iter_mut().find(|(name, _)| name == regulation) {
            Some((_, t)) => t.record(result.status),
            None => {
                let mut t = Totals::default();
                t.record(result.status);
                regulations.push((regulation.clone(), t));
            }
        }
    }

    let by_regulation = regulations
        .into_iter()
        .map(|(name, t)| RegulationSummary::from_totals(name, t))
        .collect();
    (totals, by_regulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::{
        AdapterError, CheckKind, EngineConfig, ResourceRequirement, StaticInventory, ValidationRule,
    };
    use serde_json::json;

    const VAULTS: &str = "Microsoft.KeyVault/vaults";
    const SQL: &str = "Microsoft.Sql/servers";

    fn required(regulation: &str, resource_type: &str) -> Control {
        Control::new(regulation, format!("{} present", resource_type))
            .with_requirement(ResourceRequirement::new(resource_type).required())
    }

    fn inventory() -> Arc<StaticInventory> {
        Arc::new(
            StaticInventory::new()
                .with_resources(VAULTS, vec![json!({ "name": "kv1" })])
                .with_failure(SQL, AdapterError::Auth("expired".to_string())),
        )
    }

    fn checklist() -> Vec<Control> {
        vec![
            required("RGPD / CNIL", VAULTS),
            required("DORA", "Microsoft.RecoveryServices/vaults"),
            required("RGPD / CNIL", "Microsoft.Network/azureFirewalls"),
            Control::new("ACPR", "Gouvernance SI").manual(),
            required("DORA", SQL),
        ]
    }

    #[tokio::test]
    async fn test_order_and_totals() {
        let ctx = ValidationContext::new(checklist(), inventory());
        let report = aggregate(&ctx).await;

        assert_eq!(report.results.len(), 5);
        for (i, r) in report.results.iter().enumerate() {
            assert_eq!(r.control_index, i);
        }
        let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                ControlStatus::Passed,
                ControlStatus::Failed,
                ControlStatus::Failed,
                ControlStatus::Manual,
                ControlStatus::Error,
            ]
        );
        assert_eq!(report.totals.total(), report.results.len());
        assert_eq!(report.overall_rate, 20.0);
        assert_eq!(report.overall_assessed_rate, 33.3);
    }

    #[tokio::test]
    async fn test_regulation_insertion_order() {
        let ctx = ValidationContext::new(checklist(), inventory());
        let report = aggregate(&ctx).await;
        let names: Vec<_> = report.by_regulation.iter().map(|r| r.regulation.as_str()).collect();
        assert_eq!(names, vec!["RGPD / CNIL", "DORA", "ACPR"]);

        let rgpd = report.regulation("RGPD / CNIL").unwrap();
        assert_eq!(rgpd.rate, 50.0);
        let dora = report.regulation("DORA").unwrap();
        assert_eq!(dora.totals.error, 1);
        assert_eq!(dora.total, 2);
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let ts = chrono::Utc::now();
        let sequential = ValidationContext::new(checklist(), inventory()).at(ts);
        let parallel = sequential
            .clone()
            .with_config(EngineConfig::default().with_concurrency(4));

        let a = aggregate(&sequential).await;
        let b = aggregate(&parallel).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_idempotent_over_static_snapshot() {
        let ctx = ValidationContext::new(checklist(), inventory()).at(chrono::Utc::now());
        assert_eq!(aggregate(&ctx).await, aggregate(&ctx).await);
    }

    #[tokio::test]
    async fn test_empty_checklist() {
        let report = aggregate_controls(vec![], inventory()).await;
        assert!(report.results.is_empty());
        assert_eq!(report.overall_rate, 0.0);
        assert!(report.by_regulation.is_empty());
    }

    #[tokio::test]
    async fn test_half_compliant_regulation() {
        let rule =
            ValidationRule::new("properties.enableSoftDelete", CheckKind::Equals, json!(true));
        let controls = vec![
            Control::new("RGPD / CNIL", "Soft delete").with_requirement(
                ResourceRequirement::new(VAULTS)
                    .required()
                    .with_rule(rule.clone()),
            ),
            Control::new("RGPD / CNIL", "Purge protection").with_requirement(
                ResourceRequirement::new(VAULTS).required().with_rule(ValidationRule::new(
                    "properties.enablePurgeProtection",
                    CheckKind::Equals,
                    json!(true),
                )),
            ),
        ];
        let inventory = Arc::new(StaticInventory::new().with_resources(
            VAULTS,
            vec![json!({ "name": "kv1", "properties": { "enableSoftDelete": true } })],
        ));
        let report = aggregate_controls(controls, inventory).await;
        assert_eq!(report.regulation("RGPD / CNIL").unwrap().rate, 50.0);
    }
}
