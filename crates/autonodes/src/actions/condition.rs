use super::{require, ActionError, ActionRequest};
use crate::services::ActionServices;
use serde::Deserialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::str::FromStr;

/// Comparison operators accepted by conditional evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    IsNull,
    IsNotNull,
}

impl FromStr for Operator {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "=" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            "is null" => Ok(Operator::IsNull),
            "is not null" => Ok(Operator::IsNotNull),
            _ => Err(ActionError::UnsupportedOperator(s.to_string())),
        }
    }
}

impl Operator {
    pub fn needs_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Apply the operator. Ordering compares numerically when both sides
    /// read as numbers, lexically when both are strings, and is false
    /// otherwise.
    pub fn evaluate(&self, actual: &Value, expected: Option<&Value>) -> bool {
        let expected = expected.unwrap_or(&Value::Null);
        match self {
            Operator::IsNull => actual.is_null(),
            Operator::IsNotNull => !actual.is_null(),
            Operator::Eq => loose_eq(actual, expected),
            Operator::Ne => !loose_eq(actual, expected),
            Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
            Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
            Operator::Ge => matches!(
                compare(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Le => matches!(
                compare(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    match (a, b) {
        (Value::Bool(flag), Value::String(s)) | (Value::String(s), Value::Bool(flag)) => {
            s.eq_ignore_ascii_case(if *flag { "true" } else { "false" })
        }
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConditionRequest {
    data_source: Option<String>,
    field: Option<String>,
    operator: Option<String>,
    /// `None` when absent; an explicit `null` is kept as the literal.
    #[serde(default, deserialize_with = "present")]
    value: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ActionRequest for ConditionRequest {
    fn validate(&self) -> Result<(), ActionError> {
        require(&self.data_source, "dataSource")?;
        require(&self.field, "field")?;
        let operator: Operator = require(&self.operator, "operator")?.parse()?;
        if operator.needs_value() && self.value.is_none() {
            return Err(ActionError::Validation(format!(
                "Operator '{}' needs a value",
                self.operator.as_deref().unwrap_or_default()
            )));
        }
        Ok(())
    }
}

/// Fetch one field of the first record and compare it. An empty collection
/// evaluates to `false`.
pub(crate) async fn handle(
    services: &ActionServices,
    request: ConditionRequest,
) -> Result<serde_json::Value, ActionError> {
    let collection = require(&request.data_source, "dataSource")?;
    let field = require(&request.field, "field")?;
    let operator: Operator = require(&request.operator, "operator")?.parse()?;

    let actual = services.records.first_field(collection, field).await?;
    let result = match &actual {
        Some(actual) => operator.evaluate(actual, request.value.as_ref()),
        None => {
            tracing::debug!("No record in {}, condition is false", collection);
            false
        }
    };

    Ok(json!({
        "result": result,
        "recordFound": actual.is_some(),
    }))
}
