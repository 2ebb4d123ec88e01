//! Compliance Metrics: aggregation and remediation planning
//!
//! # Example
//!
//! ```ignore
//! use compliance_metrics::{aggregate, RemediationPlanner};
//!
//! let report = aggregate(&ctx).await;
//! println!("Compliance: {:.1}%", report.overall_rate);
//!
//! for item in RemediationPlanner::new(policy).plan(&report) {
//!     println!("[{}] {}: {}", item.priority, item.regulation, item.action);
//! }
//! ```

pub mod aggregate;
pub mod remediation;

pub use aggregate::{aggregate, aggregate_controls, build_report, summarize};
pub use remediation::{plan, RemediationPlanner};

use compliance_core::{ComplianceReport, ControlStatus};

/// Whether a report has no failed and no errored control
pub fn is_compliant(report: &ComplianceReport) -> bool {
    report.totals.failed == 0 && report.totals.error == 0
}

/// Number of controls that still need a human decision
pub fn pending_review(report: &ComplianceReport) -> usize {
    report.results_with_status(ControlStatus::Manual).count()
}
