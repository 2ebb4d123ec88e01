//! Validation Context: explicit state for one validation run
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::adapter::ResourceInventory;
use crate::config::EngineConfig;
use crate::data_model::{ChecklistMeta, Control};
use crate::error::ComplianceError;

/// Loaded controls, the inventory handle and engine settings.
///
/// Cheap to clone; controls and inventory are shared behind `Arc`.
#[derive(Clone)]
pub struct ValidationContext {
    pub run_id: String,
    pub controls: Arc<Vec<Control>>,
    pub checklist: Option<ChecklistMeta>,
    pub inventory: Arc<dyn ResourceInventory>,
    pub config: EngineConfig,
    /// Fixed report timestamp; `None` stamps reports with the current time
    pub generated_at: Option<DateTime<Utc>>,
}

impl ValidationContext {
    pub fn new(controls: Vec<Control>, inventory: Arc<dyn ResourceInventory>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            controls: Arc::new(controls),
            checklist: None,
            inventory,
            config: EngineConfig::default(),
            generated_at: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_checklist(mut self, meta: ChecklistMeta) -> Self {
        self.checklist = Some(meta);
        self
    }

    /// Pin the report timestamp
    pub fn at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.generated_at.unwrap_or_else(Utc::now)
    }

    pub fn control(&self, index: usize) -> Result<&Control, ComplianceError> {
        self.controls
            .get(index)
            .ok_or_else(|| ComplianceError::invalid_index(index, self.controls.len()))
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl std::fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationContext")
            .field("run_id", &self.run_id)
            .field("controls", &self.controls.len())
            .field("inventory", &self.inventory.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StaticInventory;

    #[test]
    fn test_control_lookup() {
        let ctx = ValidationContext::new(
            vec![Control::new("DORA", "Backups")],
            Arc::new(StaticInventory::new()),
        );
        assert_eq!(ctx.control(0).unwrap().regulation, "DORA");
        assert!(matches!(
            ctx.control(1),
            Err(ComplianceError::InvalidControlIndex { index: 1, .. })
        ));
    }

    #[test]
    fn test_pinned_timestamp() {
        let ts = Utc::now();
        let ctx = ValidationContext::new(vec![], Arc::new(StaticInventory::new())).at(ts);
        assert_eq!(ctx.timestamp(), ts);
        assert!(ctx.is_empty());
    }
}
