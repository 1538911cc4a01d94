//! Field selector support for filtering stored objects
//!
//! Only the fields every resource supports without an index are recognised:
//! `metadata.name` and `metadata.namespace`. Any other field is rejected the way
//! the API server rejects an unknown field label.

use crate::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOperator {
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    pub field: String,
    pub operator: FieldOperator,
    pub value: String,
}

/// Parsed field selector; the empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    requirements: Vec<FieldRequirement>,
}

/// Extract the value of a field that is selectable on every resource
pub fn extract_preregistered_field_value(obj: &Value, field: &str) -> Option<String> {
    let metadata = obj.get("metadata")?;
    let value = match field {
        "metadata.name" => metadata.get("name"),
        "metadata.namespace" => metadata.get("namespace"),
        _ => return None,
    };
    Some(value.and_then(Value::as_str).unwrap_or_default().to_string())
}

fn is_supported(field: &str) -> bool {
    matches!(field, "metadata.name" | "metadata.namespace")
}

impl FieldSelector {
    /// Parse `field=value`, `field==value` and `field!=value` requirements joined by commas
    pub fn parse(selector: &str) -> Result<Self> {
        let mut requirements = Vec::new();

        for requirement in selector.split(',') {
            let requirement = requirement.trim();
            if requirement.is_empty() {
                continue;
            }

            let (field, operator, value) = if let Some((f, v)) = requirement.split_once("!=") {
                (f, FieldOperator::NotEquals, v)
            } else if let Some((f, v)) = requirement.split_once("==") {
                (f, FieldOperator::Equals, v)
            } else if let Some((f, v)) = requirement.split_once('=') {
                (f, FieldOperator::Equals, v)
            } else {
                return Err(Error::InvalidSelector {
                    selector: selector.to_string(),
                    reason: format!("invalid field requirement {:?}", requirement),
                });
            };

            let field = field.trim();
            if field.is_empty() {
                return Err(Error::InvalidSelector {
                    selector: selector.to_string(),
                    reason: "empty field name".to_string(),
                });
            }

            requirements.push(FieldRequirement {
                field: field.to_string(),
                operator,
                value: value.trim().to_string(),
            });
        }

        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[FieldRequirement] {
        &self.requirements
    }

    /// Fails with `BadRequest` when a requirement names a field that is not selectable
    pub fn validate(&self) -> Result<()> {
        match self.requirements.iter().find(|r| !is_supported(&r.field)) {
            Some(req) => Err(Error::InvalidRequest(format!(
                "field label not supported: {}",
                req.field
            ))),
            None => Ok(()),
        }
    }

    /// Evaluate the selector against a stored object
    pub fn matches(&self, obj: &Value) -> Result<bool> {
        self.validate()?;
        for req in &self.requirements {
            let actual = extract_preregistered_field_value(obj, &req.field).unwrap_or_default();
            let matched = match req.operator {
                FieldOperator::Equals => actual == req.value,
                FieldOperator::NotEquals => actual != req.value,
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
