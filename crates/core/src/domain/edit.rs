//! Field edits. Each returns a replacement [`Scenario`].
//!
//! The two manual-credit fields behave differently on edit: typing a monthly
//! credit switches it on immediately, while an annual credit only takes
//! effect after [`Scenario::apply_annual_manual_credit`].

use serde_json::Value;

use crate::domain::scenario::Scenario;
use crate::errors::DomainError;
use crate::pricing::input::{parse_amount, RawAmount};

pub const MONTHLY_CREDIT_FIELD: &str = "monthly_credit.value";
pub const ANNUAL_CREDIT_FIELD: &str = "annual_credit.value";

impl Scenario {
    pub fn with_monthly_manual_credit(&self, text: &str) -> Scenario {
        let mut next = self.clone();
        next.monthly_credit.value = text.to_string();
        next.monthly_credit.active = parse_amount(text).is_some();
        next
    }

    /// Stores the typed value without activating it. Clearing the field also
    /// withdraws any previously applied value.
    pub fn with_annual_manual_credit(&self, text: &str) -> Scenario {
        let mut next = self.clone();
        next.annual_credit.value = text.to_string();
        if parse_amount(text).is_none() {
            next.annual_credit.applied.clear();
            next.annual_credit.active = false;
        }
        next
    }

    pub fn apply_annual_manual_credit(&self) -> Result<Scenario, DomainError> {
        let typed = parse_amount(&self.annual_credit.value)
            .ok_or_else(|| DomainError::InvalidManualCredit(self.annual_credit.value.clone()))?;

        let mut next = self.clone();
        next.annual_credit.applied = RawAmount::from(typed).to_string();
        next.annual_credit.active = true;
        Ok(next)
    }

    pub fn remove_annual_manual_credit(&self) -> Scenario {
        let mut next = self.clone();
        next.annual_credit.applied.clear();
        next.annual_credit.active = false;
        next
    }

    /// Sets a dotted field path (`modules.virtual_clock.quantity`,
    /// `retention_offers.0.discount_percent`) from operator text.
    pub fn set_field(&self, path: &str, value: &str) -> Result<Scenario, DomainError> {
        match path {
            MONTHLY_CREDIT_FIELD => return Ok(self.with_monthly_manual_credit(value)),
            ANNUAL_CREDIT_FIELD => return Ok(self.with_annual_manual_credit(value)),
            _ => {}
        }

        let mut document = serde_json::to_value(self).map_err(|error| {
            DomainError::InvariantViolation(format!("scenario is not serializable: {error}"))
        })?;

        let slot = path
            .split('.')
            .try_fold(&mut document, |node, segment| match node {
                Value::Object(fields) => fields.get_mut(segment),
                Value::Array(items) => {
                    segment.parse::<usize>().ok().and_then(move |index| items.get_mut(index))
                }
                _ => None,
            })
            .ok_or_else(|| DomainError::UnknownField(path.to_string()))?;

        *slot = coerce(slot, path, value)?;

        serde_json::from_value(document).map_err(|error| DomainError::InvalidEdit {
            field: path.to_string(),
            reason: error.to_string(),
        })
    }
}

/// Interprets operator text using the shape of the value it replaces.
fn coerce(current: &Value, path: &str, raw: &str) -> Result<Value, DomainError> {
    let invalid = |reason: String| DomainError::InvalidEdit { field: path.to_string(), reason };

    match current {
        Value::Bool(_) => raw
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid(format!("expected true or false, got `{raw}`"))),
        Value::Number(_) => Ok(raw
            .trim()
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string()))),
        Value::Null | Value::String(_) => Ok(Value::String(raw.to_string())),
        Value::Array(_) | Value::Object(_) => {
            serde_json::from_str(raw).map_err(|error| invalid(format!("expected JSON: {error}")))
        }
    }
}
