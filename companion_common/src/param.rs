//! Parameter registry schema types.
//!
//! A `ParamSpec` table declares every tunable in the system: key, type,
//! default, optional bounds, hot-reload eligibility, and an optional wire
//! binding (a Reflex `SET_CONFIG` param id to forward on change). Batch
//! updates are validated against the full table atomically — either every
//! key in the batch is accepted, or none are applied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Declared type of a parameter's value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    I32,
    F32,
    /// Enum-typed parameter; `variants` lists the allowed string values.
    Enum { variants: Vec<&'static str> },
}

/// A parameter's current or proposed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    I32(i32),
    F32(f32),
    Enum(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I32(_) => "i32",
            Self::F32(_) => "f32",
            Self::Enum(_) => "enum",
        }
    }
}

/// Optional binding of a parameter to a Reflex-side `SET_CONFIG` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflexBinding {
    pub param_id: u8,
}

/// Declaration of a single tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub key: &'static str,
    pub param_type: ParamType,
    pub default: ParamValue,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    pub hot_reload: bool,
    pub reflex_binding: Option<ReflexBinding>,
}

/// Per-key validation failure within a rejected batch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter key")]
    UnknownKey,
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("value {value} below minimum {min}")]
    BelowMin { value: String, min: String },
    #[error("value {value} above maximum {max}")]
    AboveMax { value: String, max: String },
    #[error("{value:?} is not one of the allowed enum variants")]
    InvalidEnumVariant { value: String },
    #[error("parameter is not hot-reloadable")]
    NotHotReloadable,
}

/// Errors accumulated for a rejected batch, keyed by parameter key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchError {
    pub errors: BTreeMap<String, ParamError>,
}

impl BatchError {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a single proposed value against its spec.
///
/// Does not check `hot_reload` — callers validating a live (already
/// running) batch should check that separately, since a full
/// config-file-driven initial load is legal regardless.
pub fn validate_value(spec: &ParamSpec, value: &ParamValue) -> Result<(), ParamError> {
    match (&spec.param_type, value) {
        (ParamType::Bool, ParamValue::Bool(_)) => {}
        (ParamType::I32, ParamValue::I32(v)) => {
            check_bounds_i32(*v, spec)?;
        }
        (ParamType::F32, ParamValue::F32(v)) => {
            check_bounds_f32(*v, spec)?;
        }
        (ParamType::Enum { variants }, ParamValue::Enum(s)) => {
            if !variants.contains(&s.as_str()) {
                return Err(ParamError::InvalidEnumVariant { value: s.clone() });
            }
        }
        (expected, actual) => {
            return Err(ParamError::TypeMismatch {
                expected: expected_type_name(expected),
                actual: actual.type_name(),
            });
        }
    }
    Ok(())
}

fn expected_type_name(t: &ParamType) -> &'static str {
    match t {
        ParamType::Bool => "bool",
        ParamType::I32 => "i32",
        ParamType::F32 => "f32",
        ParamType::Enum { .. } => "enum",
    }
}

fn check_bounds_i32(v: i32, spec: &ParamSpec) -> Result<(), ParamError> {
    if let Some(ParamValue::I32(min)) = spec.min {
        if v < min {
            return Err(ParamError::BelowMin {
                value: v.to_string(),
                min: min.to_string(),
            });
        }
    }
    if let Some(ParamValue::I32(max)) = spec.max {
        if v > max {
            return Err(ParamError::AboveMax {
                value: v.to_string(),
                max: max.to_string(),
            });
        }
    }
    Ok(())
}

fn check_bounds_f32(v: f32, spec: &ParamSpec) -> Result<(), ParamError> {
    if let Some(ParamValue::F32(min)) = spec.min {
        if v < min {
            return Err(ParamError::BelowMin {
                value: v.to_string(),
                min: min.to_string(),
            });
        }
    }
    if let Some(ParamValue::F32(max)) = spec.max {
        if v > max {
            return Err(ParamError::AboveMax {
                value: v.to_string(),
                max: max.to_string(),
            });
        }
    }
    Ok(())
}

/// Validate a whole batch against a spec table. Every key must exist and
/// pass validation for the batch to be accepted as a unit.
pub fn validate_batch(
    specs: &[ParamSpec],
    batch: &BTreeMap<String, ParamValue>,
) -> Result<(), BatchError> {
    let mut errors = BTreeMap::new();
    for (key, value) in batch {
        match specs.iter().find(|s| s.key == key) {
            None => {
                errors.insert(key.clone(), ParamError::UnknownKey);
            }
            Some(spec) => {
                if let Err(e) = validate_value(spec, value) {
                    errors.insert(key.clone(), e);
                }
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BatchError { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_v_spec() -> ParamSpec {
        ParamSpec {
            key: "reflex.max_v_mm_s",
            param_type: ParamType::I32,
            default: ParamValue::I32(300),
            min: Some(ParamValue::I32(0)),
            max: Some(ParamValue::I32(600)),
            hot_reload: true,
            reflex_binding: Some(ReflexBinding { param_id: 1 }),
        }
    }

    fn stop_mm_spec() -> ParamSpec {
        ParamSpec {
            key: "safety.stop_mm",
            param_type: ParamType::I32,
            default: ParamValue::I32(250),
            min: Some(ParamValue::I32(0)),
            max: None,
            hot_reload: true,
            reflex_binding: None,
        }
    }

    #[test]
    fn batch_with_both_keys_out_of_bounds_is_fully_rejected() {
        let specs = vec![max_v_spec(), stop_mm_spec()];
        let mut batch = BTreeMap::new();
        batch.insert("reflex.max_v_mm_s".to_string(), ParamValue::I32(9999));
        batch.insert("safety.stop_mm".to_string(), ParamValue::I32(-5));

        let result = validate_batch(&specs, &batch);
        let err = result.unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(matches!(
            err.errors["reflex.max_v_mm_s"],
            ParamError::AboveMax { .. }
        ));
        assert!(matches!(
            err.errors["safety.stop_mm"],
            ParamError::BelowMin { .. }
        ));
    }

    #[test]
    fn batch_with_valid_values_is_accepted() {
        let specs = vec![max_v_spec()];
        let mut batch = BTreeMap::new();
        batch.insert("reflex.max_v_mm_s".to_string(), ParamValue::I32(400));
        assert!(validate_batch(&specs, &batch).is_ok());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let specs = vec![max_v_spec()];
        let mut batch = BTreeMap::new();
        batch.insert("reflex.nonexistent".to_string(), ParamValue::I32(1));
        let err = validate_batch(&specs, &batch).unwrap_err();
        assert_eq!(err.errors["reflex.nonexistent"], ParamError::UnknownKey);
    }
}
