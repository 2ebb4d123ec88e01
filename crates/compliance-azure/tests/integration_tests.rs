//! Integration tests for the Azure CLI inventory, run against a stand-in
//! shell script instead of the real `az`.

#![cfg(unix)]

use compliance_azure::AzCliInventory;
use compliance_core::{AdapterError, ResourceInventory};
use std::path::Path;

fn fake_az(dir: &Path, body: &str) -> AzCliInventory {
    let script = dir.join("az.sh");
    std::fs::write(&script, body).unwrap();
    AzCliInventory::new().with_program("sh", vec![script.to_string_lossy().to_string()])
}

#[tokio::test]
async fn test_lists_resources() {
    let dir = tempfile::tempdir().unwrap();
    // $4 is the resource type: resource list --resource-type <type>
    let inventory = fake_az(
        dir.path(),
        r#"echo "[{\"name\": \"kv1\", \"type\": \"$4\"}]""#,
    );

    let resources = inventory.query("Microsoft.KeyVault/vaults").await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["type"], "Microsoft.KeyVault/vaults");
}

#[tokio::test]
async fn test_empty_stdout_is_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = fake_az(dir.path(), "exit 0\n");
    assert!(inventory.query("Microsoft.Sql/servers").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nonzero_exit_is_query_failure() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = fake_az(dir.path(), "echo 'ERROR: quota exceeded' >&2\nexit 3\n");

    let err = inventory.query("Microsoft.Sql/servers").await.unwrap_err();
    assert_eq!(
        err,
        AdapterError::QueryFailed {
            resource_type: "Microsoft.Sql/servers".to_string(),
            message: "ERROR: quota exceeded".to_string(),
        }
    );
}

#[tokio::test]
async fn test_login_required_is_auth_failure() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = fake_az(
        dir.path(),
        "echo \"ERROR: Please run 'az login' to setup account.\" >&2\nexit 1\n",
    );
    let err = inventory.query("Microsoft.Sql/servers").await.unwrap_err();
    assert!(matches!(err, AdapterError::Auth(_)));
}

#[tokio::test]
async fn test_missing_binary_is_unavailable() {
    let inventory = AzCliInventory::new().with_program("/nonexistent/az", vec![]);
    let err = inventory.query("Microsoft.Sql/servers").await.unwrap_err();
    assert!(matches!(err, AdapterError::Unavailable(_)));
}
