//! Declarative parameter and command descriptions.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumString};

/// JSON value kinds a parameter may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParamType {
    /// A JSON string.
    String,
    /// Any JSON number, integer or floating point.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
}

impl ParamType {
    /// Returns `true` when `value` is of this kind.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Bool(_))
                | (Self::Array, Value::Array(_))
                | (Self::Object, Value::Object(_))
        )
    }
}

/// Names the JSON kind of a value the way error messages report it.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declared type of a parameter: one kind or a union of kinds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TypeSpec {
    /// Exactly one accepted kind.
    Single(ParamType),
    /// Any of several kinds.
    Union(Vec<ParamType>),
}

impl TypeSpec {
    /// Returns the accepted kinds.
    #[must_use]
    pub fn members(&self) -> &[ParamType] {
        match self {
            Self::Single(kind) => std::slice::from_ref(kind),
            Self::Union(kinds) => kinds,
        }
    }

    /// Returns `true` when `value` matches any accepted kind.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        self.members().iter().any(|kind| kind.accepts(value))
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for kind in self.members() {
            if !first {
                formatter.write_str("|")?;
            }
            write!(formatter, "{kind}")?;
            first = false;
        }
        Ok(())
    }
}

/// Description of a single command parameter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParamSpec {
    /// Accepted value kinds.
    #[serde(rename = "type")]
    pub kind: TypeSpec,
    /// Human-readable explanation.
    #[serde(default)]
    pub description: String,
    /// Value applied when the parameter is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Description of one command: its parameters, requiredness and an example.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommandSpec {
    /// Command name; filled from the registry key.
    #[serde(skip)]
    pub name: String,
    /// Human-readable summary.
    #[serde(default)]
    pub description: String,
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: IndexMap<String, ParamSpec>,
    /// Names that must be supplied, in declaration order.
    #[serde(default)]
    pub required_params: Vec<String>,
    /// Example request and response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl CommandSpec {
    /// Renders the parameters as a JSON Schema object.
    ///
    /// Unions become a list of type names. Undeclared properties are
    /// rejected, matching [`CommandSpec::validate`].
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|(name, param)| (name.clone(), param.property_schema()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params,
            "additionalProperties": false,
        })
    }
}

impl ParamSpec {
    fn property_schema(&self) -> Value {
        let kind = match &self.kind {
            TypeSpec::Single(kind) => json!(kind.to_string()),
            TypeSpec::Union(kinds) => kinds.iter().map(ToString::to_string).collect(),
        };
        let mut property = Map::new();
        property.insert("type".to_owned(), kind);
        if !self.description.is_empty() {
            property.insert("description".to_owned(), json!(self.description));
        }
        if let Some(default) = &self.default {
            property.insert("default".to_owned(), default.clone());
        }
        Value::Object(property)
    }
}

/// Top-level layout of the schema document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(crate) struct SchemaDocument {
    pub(crate) schema_version: String,
    pub(crate) commands: IndexMap<String, CommandSpec>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(ParamType::String, json!("x"), true)]
    #[case(ParamType::String, json!(1), false)]
    #[case(ParamType::Number, json!(1), true)]
    #[case(ParamType::Number, json!(0.25), true)]
    #[case(ParamType::Number, json!("1"), false)]
    #[case(ParamType::Boolean, json!(false), true)]
    #[case(ParamType::Boolean, json!(0), false)]
    #[case(ParamType::Array, json!([1]), true)]
    #[case(ParamType::Object, json!({}), true)]
    #[case(ParamType::Object, Value::Null, false)]
    fn param_type_accepts_matching_kind(
        #[case] kind: ParamType,
        #[case] value: Value,
        #[case] expected: bool,
    ) {
        assert_eq!(kind.accepts(&value), expected);
    }

    #[test]
    fn type_spec_parses_single_and_union() {
        let single: TypeSpec = serde_json::from_value(json!("string")).expect("single");
        let union: TypeSpec =
            serde_json::from_value(json!(["array", "number"])).expect("union");
        assert_eq!(single, TypeSpec::Single(ParamType::String));
        assert_eq!(union.to_string(), "array|number");
        assert!(union.accepts(&json!(1.5)));
        assert!(union.accepts(&json!([1, 2, 3])));
        assert!(!union.accepts(&json!("big")));
    }

    #[test]
    fn input_schema_lists_properties_and_required_names() {
        let spec: CommandSpec = serde_json::from_value(json!({
            "description": "Sets a parameter",
            "params": {
                "node_path": {"type": "string", "description": "Target node"},
                "param_value": {"type": ["number", "string"]},
                "frame": {"type": "number", "default": 1}
            },
            "required_params": ["node_path", "param_value"]
        }))
        .expect("spec");
        assert_eq!(
            spec.input_schema(),
            json!({
                "type": "object",
                "properties": {
                    "node_path": {"type": "string", "description": "Target node"},
                    "param_value": {"type": ["number", "string"]},
                    "frame": {"type": "number", "default": 1}
                },
                "required": ["node_path", "param_value"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        let result = serde_json::from_value::<TypeSpec>(json!("vector"));
        assert!(result.is_err());
    }
}
