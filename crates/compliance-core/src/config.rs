//! Checker configuration
//!
//! Loaded from YAML, then overridden by environment variables (a `.env`
//! file in the working directory is honoured).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ComplianceError;

pub const ENV_CONCURRENCY: &str = "COMPLIANCE_CONCURRENCY";
pub const ENV_QUERY_TIMEOUT_SECS: &str = "COMPLIANCE_QUERY_TIMEOUT_SECS";
pub const ENV_MATCH_POLICY: &str = "COMPLIANCE_MATCH_POLICY";
pub const ENV_CHECKLISTS_DIR: &str = "COMPLIANCE_CHECKLISTS_DIR";
pub const ENV_REPORTS_DIR: &str = "COMPLIANCE_REPORTS_DIR";

/// How rule outcomes across a fleet of matching resources combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// One resource satisfying every rule is enough
    #[default]
    Any,
    /// Every matching resource must satisfy every rule
    All,
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(MatchPolicy::Any),
            "all" | "strict" => Ok(MatchPolicy::All),
            other => Err(format!("unknown match policy '{}'", other)),
        }
    }
}

/// Engine behaviour for a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum controls evaluated at once (1 = sequential)
    pub concurrency: usize,

    /// Timeout for each inventory query, in seconds
    pub query_timeout_secs: u64,

    pub match_policy: MatchPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            query_timeout_secs: 30,
            match_policy: MatchPolicy::Any,
        }
    }
}

impl EngineConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn strict(mut self) -> Self {
        self.match_policy = MatchPolicy::All;
        self
    }

    /// A zero timeout would turn every live query into an error
    pub fn validate(&self) -> Result<(), ComplianceError> {
        if self.query_timeout_secs == 0 {
            return Err(ComplianceError::ConfigError(
                "queryTimeoutSecs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Priority overrides for the remediation planner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemediationPolicy {
    /// Regulations whose failures are high priority; `None` means all of them
    pub critical_regulations: Option<Vec<String>>,

    /// Regulations whose failures are low priority
    pub low_priority_regulations: Vec<String>,
}

impl RemediationPolicy {
    pub fn is_critical(&self, regulation: &str) -> bool {
        match &self.critical_regulations {
            None => true,
            Some(list) => list.iter().any(|r| r == regulation),
        }
    }

    pub fn is_low_priority(&self, regulation: &str) -> bool {
        self.low_priority_regulations.iter().any(|r| r == regulation)
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckerConfig {
    pub engine: EngineConfig,
    pub remediation: RemediationPolicy,
    pub checklists_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            remediation: RemediationPolicy::default(),
            checklists_dir: PathBuf::from("checklists"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl CheckerConfig {
    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ComplianceError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ComplianceError::ConfigError(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ComplianceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComplianceError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Load an optional file, then apply `.env` and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ComplianceError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(path = %env_file.display(), "loaded .env");
        }
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let config = config.with_overrides(|key| std::env::var(key).ok())?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in practice)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ComplianceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            let value: usize = raw.trim().parse().map_err(|_| {
                ComplianceError::ConfigError(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_CONCURRENCY, raw
                ))
            })?;
            self.engine.concurrency = value.max(1);
        }
        if let Some(raw) = lookup(ENV_QUERY_TIMEOUT_SECS) {
            self.engine.query_timeout_secs = raw.trim().parse().map_err(|_| {
                ComplianceError::ConfigError(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_QUERY_TIMEOUT_SECS, raw
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_MATCH_POLICY) {
            self.engine.match_policy = raw.parse().map_err(ComplianceError::ConfigError)?;
        }
        if let Some(raw) = lookup(ENV_CHECKLISTS_DIR) {
            self.checklists_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(ENV_REPORTS_DIR) {
            self.reports_dir = PathBuf::from(raw);
        }
        self.engine.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.engine.concurrency, 1);
        assert_eq!(config.engine.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.engine.match_policy, MatchPolicy::Any);
        assert!(config.remediation.is_critical("anything"));
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
engine:
  concurrency: 8
  matchPolicy: all
remediation:
  lowPriorityRegulations: ["ISO 27001"]
"#;
        let config = CheckerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.engine.concurrency, 8);
        assert_eq!(config.engine.query_timeout_secs, 30);
        assert_eq!(config.engine.match_policy, MatchPolicy::All);
        assert!(config.remediation.is_low_priority("ISO 27001"));
        assert_eq!(config.checklists_dir, PathBuf::from("checklists"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_CONCURRENCY, "4"),
            (ENV_QUERY_TIMEOUT_SECS, "5"),
            (ENV_MATCH_POLICY, "strict"),
            (ENV_REPORTS_DIR, "/tmp/out"),
        ]
        .into_iter()
        .collect();

        let config = CheckerConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.engine.concurrency, 4);
        assert_eq!(config.engine.query_timeout_secs, 5);
        assert_eq!(config.engine.match_policy, MatchPolicy::All);
        assert_eq!(config.reports_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let err = CheckerConfig::default()
            .with_overrides(|k| (k == ENV_CONCURRENCY).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().starts_with("CONFIG/"));
    }

    #[test]
    fn test_zero_query_timeout_rejected() {
        let err = CheckerConfig::default()
            .with_overrides(|k| (k == ENV_QUERY_TIMEOUT_SECS).then(|| "0".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("queryTimeoutSecs"), "{}", err);

        let err = CheckerConfig::from_yaml("engine:\n  queryTimeoutSecs: 0\n").unwrap_err();
        assert!(err.to_string().starts_with("CONFIG/"));
    }

    #[test]
    fn test_critical_list() {
        let policy = RemediationPolicy {
            critical_regulations: Some(vec!["DORA".to_string()]),
            low_priority_regulations: vec![],
        };
        assert!(policy.is_critical("DORA"));
        assert!(!policy.is_critical("NIS2"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.yaml");
        std::fs::write(&path, "engine:\n  queryTimeoutSecs: 12\n").unwrap();
        let config = CheckerConfig::from_file(&path).unwrap();
        assert_eq!(config.engine.query_timeout_secs, 12);

        assert!(CheckerConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
