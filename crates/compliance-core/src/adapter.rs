//! Resource inventory seam
//!
//! The engine only ever sees [`ResourceInventory`]. Whether resources come
//! from the Azure CLI, an SDK client or a JSON snapshot is invisible to it.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

use crate::value::{resource_label, ResourceDescription};

/// Failure to query the inventory. An empty result is not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("query for {resource_type} failed: {message}")]
    QueryFailed { resource_type: String, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("query for {resource_type} timed out after {secs}s")]
    Timeout { resource_type: String, secs: u64 },

    #[error("invalid response for {resource_type}: {message}")]
    InvalidResponse { resource_type: String, message: String },

    #[error("inventory unavailable: {0}")]
    Unavailable(String),
}

/// Query interface over a cloud resource inventory
#[async_trait]
pub trait ResourceInventory: Send + Sync {
    /// All resources of the given type; empty when none exist
    async fn query(&self, resource_type: &str) -> Result<Vec<ResourceDescription>, AdapterError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "inventory"
    }
}

/// In-memory inventory: fixtures in tests, JSON snapshots for offline runs
#[derive(Debug, Default)]
pub struct StaticInventory {
    resources: HashMap<String, Vec<ResourceDescription>>,
    failures: HashMap<String, AdapterError>,
    queries: AtomicUsize,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register resources for a type
    pub fn with_resources(
        mut self,
        resource_type: impl Into<String>,
        resources: Vec<ResourceDescription>,
    ) -> Self {
        self.resources
            .entry(resource_type.into())
            .or_default()
            .extend(resources);
        self
    }

    /// Make every query for a type fail
    pub fn with_failure(mut self, resource_type: impl Into<String>, error: AdapterError) -> Self {
        self.failures.insert(resource_type.into(), error);
        self
    }

    /// Build from a snapshot object mapping resource type to a list of resources
    pub fn from_snapshot(snapshot: Value) -> Result<Self, AdapterError> {
        let map = match snapshot {
            Value::Object(map) => map,
            _ => {
                return Err(AdapterError::Unavailable(
                    "snapshot must be an object keyed by resource type".to_string(),
                ))
            }
        };

        let mut inventory = Self::new();
        for (resource_type, resources) in map {
            match resources {
                Value::Array(items) => {
                    inventory = inventory.with_resources(resource_type, items);
                }
                _ => {
                    return Err(AdapterError::InvalidResponse {
                        resource_type,
                        message: "snapshot entry must be a list".to_string(),
                    })
                }
            }
        }
        Ok(inventory)
    }

    /// Load a JSON snapshot file
    pub fn from_snapshot_file(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::Unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let snapshot: Value = serde_json::from_str(&content).map_err(|e| {
            AdapterError::Unavailable(format!("invalid snapshot {}: {}", path.display(), e))
        })?;
        Self::from_snapshot(snapshot)
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ResourceInventory for StaticInventory {
    async fn query(&self, resource_type: &str) -> Result<Vec<ResourceDescription>, AdapterError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.failures.get(resource_type) {
            return Err(err.clone());
        }
        Ok(self.resources.get(resource_type).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Number of resources shown in a listing
pub const LISTING_PREVIEW: usize = 5;

/// Quick look at what the inventory holds for one resource type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListing {
    pub resource_type: String,
    pub count: usize,
    /// First [`LISTING_PREVIEW`] resources
    pub resources: Vec<ResourceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub name: Option<String>,
    pub location: Option<String>,
    pub resource_group: Option<String>,
    pub id: Option<String>,
}

impl ResourceSummary {
    fn from_description(resource: &ResourceDescription) -> Self {
        let field = |key: &str| resource.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: resource_label(resource),
            location: field("location"),
            resource_group: field("resourceGroup"),
            id: field("id"),
        }
    }
}

/// List resources of one type without evaluating any rule
pub async fn check_resource(
    inventory: &dyn ResourceInventory,
    resource_type: &str,
) -> Result<ResourceListing, AdapterError> {
    let resources = inventory.query(resource_type).await?;
    tracing::debug!(
        inventory = inventory.name(),
        resource_type,
        count = resources.len(),
        "resource listing"
    );
    Ok(ResourceListing {
        resource_type: resource_type.to_string(),
        count: resources.len(),
        resources: resources
            .iter()
            .take(LISTING_PREVIEW)
            .map(ResourceSummary::from_description)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_inventory_query() {
        let inventory = StaticInventory::new()
            .with_resources("Microsoft.KeyVault/vaults", vec![json!({ "name": "kv1" })]);

        let vaults = inventory.query("Microsoft.KeyVault/vaults").await.unwrap();
        assert_eq!(vaults.len(), 1);

        let none = inventory.query("Microsoft.Sql/servers").await.unwrap();
        assert!(none.is_empty());
        assert_eq!(inventory.query_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_distinct_from_empty() {
        let inventory = StaticInventory::new().with_failure(
            "Microsoft.Sql/servers",
            AdapterError::Auth("token expired".to_string()),
        );
        let err = inventory.query("Microsoft.Sql/servers").await.unwrap_err();
        assert_eq!(err, AdapterError::Auth("token expired".to_string()));
    }

    #[tokio::test]
    async fn test_snapshot() {
        let inventory = StaticInventory::from_snapshot(json!({
            "Microsoft.Storage/storageAccounts": [{ "name": "st1" }, { "name": "st2" }]
        }))
        .unwrap();
        let accounts = inventory.query("Microsoft.Storage/storageAccounts").await.unwrap();
        assert_eq!(accounts.len(), 2);

        assert!(StaticInventory::from_snapshot(json!([1, 2])).is_err());
        assert!(StaticInventory::from_snapshot(json!({ "x": 1 })).is_err());
    }

    #[tokio::test]
    async fn test_check_resource_preview() {
        let vaults: Vec<_> = (0..7)
            .map(|i| {
                json!({
                    "name": format!("kv{}", i),
                    "location": "francecentral",
                    "resourceGroup": "rg-prod",
                })
            })
            .collect();
        let inventory = StaticInventory::new().with_resources("Microsoft.KeyVault/vaults", vaults);

        let listing = check_resource(&inventory, "Microsoft.KeyVault/vaults").await.unwrap();
        assert_eq!(listing.count, 7);
        assert_eq!(listing.resources.len(), LISTING_PREVIEW);
        assert_eq!(listing.resources[0].name.as_deref(), Some("kv0"));
        assert_eq!(listing.resources[0].resource_group.as_deref(), Some("rg-prod"));
        assert!(listing.resources[0].id.is_none());
    }
}
