//! Parameter validation and schema consistency checks.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::types::{CommandSpec, json_type_name};
use crate::errors::{SchemaError, ValidationError};

/// Checks that a command's declarations are internally consistent.
pub(super) fn check_spec(spec: &CommandSpec) -> Result<(), SchemaError> {
    let mut seen = HashSet::with_capacity(spec.required_params.len());
    for required in &spec.required_params {
        if !seen.insert(required.as_str()) {
            return Err(SchemaError::DuplicateRequired {
                command: spec.name.clone(),
                param: required.clone(),
            });
        }
        let Some(param) = spec.params.get(required) else {
            return Err(SchemaError::UndeclaredRequired {
                command: spec.name.clone(),
                param: required.clone(),
            });
        };
        if param.default.is_some() {
            return Err(SchemaError::RequiredWithDefault {
                command: spec.name.clone(),
                param: required.clone(),
            });
        }
    }

    for (name, param) in &spec.params {
        if param.kind.members().is_empty() {
            return Err(SchemaError::EmptyUnion {
                command: spec.name.clone(),
                param: name.clone(),
            });
        }
        if let Some(default) = &param.default
            && !param.kind.accepts(default)
        {
            return Err(SchemaError::DefaultTypeMismatch {
                command: spec.name.clone(),
                param: name.clone(),
                expected: param.kind.to_string(),
                actual: json_type_name(default),
            });
        }
    }
    Ok(())
}

/// Validates supplied parameters and returns them with defaults applied.
///
/// `null` counts as absent: it fails a required parameter and is dropped for
/// an optional one. The result lists parameters in declaration order.
pub(super) fn normalise(
    spec: &CommandSpec,
    params: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    for required in &spec.required_params {
        if matches!(params.get(required), None | Some(Value::Null)) {
            return Err(ValidationError::missing_param(required.as_str()));
        }
    }

    for (name, value) in params {
        let Some(param) = spec.params.get(name) else {
            return Err(ValidationError::unknown_param(name.as_str()));
        };
        if !value.is_null() && !param.kind.accepts(value) {
            return Err(ValidationError::TypeMismatch {
                name: name.clone(),
                expected: param.kind.to_string(),
                actual: json_type_name(value),
            });
        }
    }

    let mut normalised = Map::with_capacity(spec.params.len());
    for (name, param) in &spec.params {
        match params.get(name) {
            Some(value) if !value.is_null() => {
                normalised.insert(name.clone(), value.clone());
            }
            _ => {
                if let Some(default) = &param.default {
                    normalised.insert(name.clone(), default.clone());
                }
            }
        }
    }
    Ok(normalised)
}
