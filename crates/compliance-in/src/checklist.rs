//! Checklist file format
//!
//! ```yaml
//! checklist:
//!   - reglementation: "RGPD / CNIL"
//!     exigence: "Chiffrement des données au repos"
//!     preuve: "Configuration Key Vault"
//!     controle: "Vérifier la suppression réversible"
//!     azure_resources:
//!       - type: Microsoft.KeyVault/vaults
//!         required: true
//!         validation:
//!           - property: properties.enableSoftDelete
//!             check: equals
//!             value: true
//! ```
//!
//! Every entry is checked before any validation run starts. The first
//! malformed entry aborts the load with an error naming its index.

use compliance_core::{CheckKind, ComplianceError, Control, ResourceRequirement, ValidationRule};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid checklist: {0}")]
    Parse(String),

    #[error("control index {index}: {reason}")]
    MalformedControl { index: usize, reason: String },

    #[error("control index {index}: unknown check '{check}'")]
    UnknownCheck { index: usize, check: String },

    #[error("control index {index}: invalid value for '{property}' ({check}): {reason}")]
    InvalidExpectedValue {
        index: usize,
        property: String,
        check: CheckKind,
        reason: String,
    },
}

impl ChecklistError {
    /// Index of the offending control, when the error is about one
    pub fn control_index(&self) -> Option<usize> {
        match self {
            ChecklistError::MalformedControl { index, .. }
            | ChecklistError::UnknownCheck { index, .. }
            | ChecklistError::InvalidExpectedValue { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<ChecklistError> for ComplianceError {
    fn from(err: ChecklistError) -> Self {
        ComplianceError::ChecklistError(err.to_string())
    }
}

/// Top-level document
#[derive(Debug, Deserialize)]
pub(crate) struct ChecklistFile {
    #[serde(default)]
    pub name: Option<String>,
    pub checklist: Vec<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawControl {
    reglementation: String,
    exigence: String,
    preuve: String,
    controle: String,
    #[serde(default)]
    manual_verification: bool,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    azure_resources: Vec<RawResource>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResource {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    validation: Vec<RawValidation>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawValidation {
    property: String,
    check: String,
    #[serde(default)]
    value: Value,
}

/// Convert one raw YAML entry into a [`Control`]
pub(crate) fn parse_entry(
    index: usize,
    entry: serde_yaml::Value,
) -> Result<Control, ChecklistError> {
    let raw: RawControl =
        serde_yaml::from_value(entry).map_err(|e| ChecklistError::MalformedControl {
            index,
            reason: e.to_string(),
        })?;

    if raw.reglementation.trim().is_empty() {
        return Err(ChecklistError::MalformedControl {
            index,
            reason: "empty 'reglementation'".to_string(),
        });
    }

    let mut requirements = Vec::with_capacity(raw.azure_resources.len());
    for resource in raw.azure_resources {
        if resource.resource_type.trim().is_empty() {
            return Err(ChecklistError::MalformedControl {
                index,
                reason: "empty resource 'type'".to_string(),
            });
        }

        let mut requirement = ResourceRequirement::new(resource.resource_type);
        requirement.required = resource.required;
        for validation in resource.validation {
            requirement
                .validation_rules
                .push(parse_rule(index, validation)?);
        }
        requirements.push(requirement);
    }

    Ok(Control {
        regulation: raw.reglementation,
        requirement: raw.exigence,
        evidence: raw.preuve,
        control_statement: raw.controle,
        resource_requirements: requirements,
        manual_verification: raw.manual_verification,
        notes: raw.notes,
    })
}

fn parse_rule(index: usize, raw: RawValidation) -> Result<ValidationRule, ChecklistError> {
    if raw.property.trim().is_empty() {
        return Err(ChecklistError::MalformedControl {
            index,
            reason: "empty validation 'property'".to_string(),
        });
    }

    let check: CheckKind = raw.check.parse().map_err(|_| ChecklistError::UnknownCheck {
        index,
        check: raw.check.clone(),
    })?;

    if let Err(reason) = check_expected(check, &raw.value) {
        return Err(ChecklistError::InvalidExpectedValue {
            index,
            property: raw.property,
            check,
            reason,
        });
    }

    Ok(ValidationRule::new(raw.property, check, raw.value))
}

/// Shape the expected value must have for a check
fn check_expected(check: CheckKind, value: &Value) -> Result<(), String> {
    match check {
        CheckKind::Exists => Ok(()),
        _ if value.is_null() => Err("missing 'value'".to_string()),
        CheckKind::ContainsAny | CheckKind::In => match value {
            Value::Array(items) if !items.is_empty() => Ok(()),
            Value::Array(_) => Err("expected a non-empty list".to_string()),
            _ => Err("expected a list".to_string()),
        },
        CheckKind::GreaterThan | CheckKind::GreaterThanOrEqual => match value {
            Value::Number(_) => Ok(()),
            Value::String(s) if s.trim().parse::<f64>().is_ok() => Ok(()),
            _ => Err("expected a number".to_string()),
        },
        CheckKind::Equals | CheckKind::Contains => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> serde_yaml::Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_full_entry() {
        let control = parse_entry(
            0,
            entry(
                r#"
reglementation: "DORA"
exigence: "Sauvegardes géo-redondantes"
preuve: "Configuration des coffres"
controle: "Vérifier la redondance"
azure_resources:
  - type: Microsoft.RecoveryServices/vaults
    required: true
    validation:
      - property: properties.redundancySettings.standardTierStorageRedundancy
        check: in
        value: [GeoRedundant, ZoneRedundant]
"#,
            ),
        )
        .unwrap();

        assert_eq!(control.regulation, "DORA");
        assert_eq!(control.evidence, "Configuration des coffres");
        let req = &control.resource_requirements[0];
        assert!(req.required);
        assert_eq!(req.validation_rules[0].check_kind, CheckKind::In);
        assert_eq!(
            req.validation_rules[0].expected_value,
            serde_json::json!(["GeoRedundant", "ZoneRedundant"])
        );
    }

    #[test]
    fn test_defaults() {
        let control = parse_entry(
            3,
            entry(
                "reglementation: ACPR\nexigence: Gouvernance\npreuve: PSSI\ncontrole: Revue\n\
                 manual_verification: true\n",
            ),
        )
        .unwrap();
        assert!(control.manual_verification);
        assert!(control.resource_requirements.is_empty());
        assert!(control.notes.is_none());
    }

    #[test]
    fn test_missing_field_names_index() {
        let err = parse_entry(4, entry("exigence: x\n")).unwrap_err();
        assert_eq!(err.control_index(), Some(4));
        assert!(err.to_string().contains("reglementation"));
    }

    #[test]
    fn test_unknown_check() {
        let err = parse_entry(
            2,
            entry(
                "reglementation: NIS2\nexigence: x\npreuve: p\ncontrole: c\n\
                 azure_resources:\n  - type: T\n    validation:\n      \
                 - property: a\n        check: matches\n        value: b\n",
            ),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ChecklistError::UnknownCheck { index: 2, ref check } if check == "matches"
        ));
    }

    #[test]
    fn test_expected_value_shapes() {
        assert!(check_expected(CheckKind::Exists, &Value::Null).is_ok());
        assert!(check_expected(CheckKind::Equals, &Value::Null).is_err());
        assert!(check_expected(CheckKind::In, &serde_json::json!("a")).is_err());
        assert!(check_expected(CheckKind::In, &serde_json::json!([])).is_err());
        assert!(check_expected(CheckKind::ContainsAny, &serde_json::json!(["a"])).is_ok());
        assert!(check_expected(CheckKind::GreaterThan, &serde_json::json!("30")).is_ok());
        assert!(check_expected(CheckKind::GreaterThanOrEqual, &serde_json::json!("many")).is_err());
    }

    #[test]
    fn test_into_compliance_error() {
        let err: ComplianceError = parse_entry(7, entry("exigence: x\n")).unwrap_err().into();
        assert!(err.to_string().starts_with("CHECKLIST/control index 7"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse_entry(
            1,
            entry("reglementation: a\nexigence: b\npreuve: p\ncontrole: c\nazure_resource: []\n"),
        )
        .unwrap_err();
        assert_eq!(err.control_index(), Some(1));
    }

    #[test]
    fn test_missing_evidence_or_statement_rejected() {
        let err =
            parse_entry(2, entry("reglementation: RGPD\nexigence: x\ncontrole: c\n")).unwrap_err();
        assert_eq!(err.control_index(), Some(2));
        assert!(err.to_string().contains("preuve"), "{}", err);

        let err =
            parse_entry(3, entry("reglementation: RGPD\nexigence: x\npreuve: p\n")).unwrap_err();
        assert_eq!(err.control_index(), Some(3));
        assert!(err.to_string().contains("controle"), "{}", err);
    }

    #[test]
    fn test_misspelled_resource_keys_rejected() {
        let err = parse_entry(
            5,
            entry(
                r#"
reglementation: "RGPD / CNIL"
exigence: "Chiffrement"
preuve: "Key Vault"
controle: "Soft delete"
azure_resources:
  - type: Microsoft.KeyVault/vaults
    requried: true
"#,
            ),
        )
        .unwrap_err();
        assert_eq!(err.control_index(), Some(5));
        assert!(err.to_string().contains("requried"), "{}", err);

        let err = parse_entry(
            6,
            entry(
                r#"
reglementation: "RGPD / CNIL"
exigence: "Chiffrement"
preuve: "Key Vault"
controle: "Soft delete"
azure_resources:
  - type: Microsoft.KeyVault/vaults
    required: true
    validations:
      - property: properties.enableSoftDelete
        check: equals
        value: true
"#,
            ),
        )
        .unwrap_err();
        assert_eq!(err.control_index(), Some(6));
        assert!(err.to_string().contains("validations"), "{}", err);
    }

    #[test]
    fn test_misspelled_rule_key_rejected() {
        let err = parse_entry(
            0,
            entry(
                "reglementation: DORA\nexigence: x\npreuve: p\ncontrole: c\n\
                 azure_resources:\n  - type: T\n    validation:\n      \
                 - property: a\n        check: equals\n        expected: b\n",
            ),
        )
        .unwrap_err();
        assert_eq!(err.control_index(), Some(0));
        assert!(err.to_string().contains("expected"), "{}", err);
    }
}
