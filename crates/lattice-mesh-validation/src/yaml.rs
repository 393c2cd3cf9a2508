//! YAML parsing utilities using yaml-rust2
//!
//! Manifests are parsed with yaml-rust2 and converted to `serde_json::Value`,
//! which is what [`IstioObject::from_value`](crate::IstioObject::from_value)
//! decodes from.

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::{Error, Result};

/// Parse a YAML string into a serde_json::Value.
///
/// For multi-document YAML, returns only the first document.
/// Returns `Value::Null` for empty input.
pub fn parse_yaml(input: &str) -> Result<Value> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| Error::yaml(e.to_string()))?;
    match docs.into_iter().next() {
        Some(doc) => yaml_to_json(doc),
        None => Ok(Value::Null),
    }
}

/// Parse a multi-document YAML string into a Vec of serde_json::Values.
///
/// Each YAML document separated by `---` becomes a separate Value. Empty
/// documents are dropped, and `kind: List` documents are flattened into their
/// `items` so that `kubectl get -o yaml` output can be checked directly.
pub fn parse_yaml_multi(input: &str) -> Result<Vec<Value>> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| Error::yaml(e.to_string()))?;

    let mut values = Vec::with_capacity(docs.len());
    for doc in docs {
        match yaml_to_json(doc)? {
            Value::Null => {}
            value if is_list(&value) => {
                if let Some(Value::Array(items)) = value.get("items") {
                    values.extend(items.iter().cloned());
                }
            }
            value => values.push(value),
        }
    }
    Ok(values)
}

fn is_list(value: &Value) -> bool {
    value.get("kind").and_then(Value::as_str) == Some("List")
}

/// Convert a yaml_rust2::Yaml value to serde_json::Value
fn yaml_to_json(yaml: Yaml) -> Result<Value> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(b)),
        Yaml::Integer(i) => Ok(Value::Number(i.into())),
        Yaml::Real(s) => {
            let f: f64 = s
                .parse()
                .map_err(|e: std::num::ParseFloatError| Error::yaml(e.to_string()))?;
            Ok(Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Array(arr) => arr
            .into_iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Yaml::Hash(map) => map
            .into_iter()
            .map(|(k, v)| {
                let key = match k {
                    Yaml::String(s) => s,
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Real(r) => r,
                    Yaml::Boolean(b) => b.to_string(),
                    Yaml::Null => "null".to_string(),
                    _ => return Err(Error::yaml("unsupported YAML key type")),
                };
                yaml_to_json(v).map(|v| (key, v))
            })
            .collect::<Result<Map<String, Value>>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err(Error::yaml("YAML aliases not supported")),
        Yaml::BadValue => Err(Error::yaml("bad YAML value")),
    }
}
