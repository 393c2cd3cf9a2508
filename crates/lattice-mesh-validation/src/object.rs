//! Istio object types
//!
//! [`IstioObject`] is the unit under validation: identity metadata plus an
//! untyped `spec`. Checkers never read the spec directly; they decode it once
//! into a typed view such as [`DestinationRuleSpec`], where every field is an
//! explicit present/absent value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// API group for Istio networking resources
pub const NETWORKING_API_GROUP: &str = "networking.istio.io";

/// Kind of the resources checked by the multi-match checker
pub const DESTINATION_RULE_KIND: &str = "DestinationRule";

/// Default API version used when constructing DestinationRules in code
pub const DESTINATION_RULE_API_VERSION: &str = "networking.istio.io/v1beta1";

/// Identity metadata for an Istio object
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace
    #[serde(default)]
    pub namespace: String,
    /// Owning cluster (empty when unknown)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
}

impl ObjectMeta {
    /// Create metadata for a namespaced object
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            cluster_name: String::new(),
        }
    }

    /// Set the owning cluster
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster_name = cluster.into();
        self
    }
}

/// An Istio configuration object with an untyped spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IstioObject {
    /// API version
    #[serde(default)]
    pub api_version: String,
    /// Kind
    #[serde(default)]
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec, as decoded from the manifest
    #[serde(default)]
    pub spec: Value,
}

impl IstioObject {
    /// Create a DestinationRule object
    pub fn destination_rule(metadata: ObjectMeta, spec: Value) -> Self {
        Self {
            api_version: DESTINATION_RULE_API_VERSION.to_string(),
            kind: DESTINATION_RULE_KIND.to_string(),
            metadata,
            spec,
        }
    }

    /// Decode an object from a parsed manifest document.
    ///
    /// `metadata.name` is required. A missing `metadata.namespace` or
    /// `metadata.clusterName` falls back to the given defaults, and a missing
    /// `spec` decodes as `null`.
    pub fn from_value(
        value: &Value,
        default_namespace: &str,
        default_cluster: &str,
    ) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::serialization("document is not a mapping"));
        }

        let str_field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
        let kind = str_field(value, "kind").unwrap_or_default();
        let api_version = str_field(value, "apiVersion").unwrap_or_default();

        let metadata = value.get("metadata").unwrap_or(&Value::Null);
        let name = str_field(metadata, "name")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::serialization_for_kind(&kind, "missing metadata.name"))?;
        let namespace = str_field(metadata, "namespace")
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_namespace.to_string());
        let cluster_name = str_field(metadata, "clusterName")
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_cluster.to_string());

        Ok(Self {
            api_version,
            kind,
            metadata: ObjectMeta {
                name,
                namespace,
                cluster_name,
            },
            spec: value.get("spec").cloned().unwrap_or(Value::Null),
        })
    }

    /// Whether this object is an Istio networking DestinationRule
    pub fn is_destination_rule(&self) -> bool {
        let group = self.api_version.split('/').next().unwrap_or_default();
        self.kind == DESTINATION_RULE_KIND && group == NETWORKING_API_GROUP
    }
}

/// Typed view of the DestinationRule spec fields the checkers use.
///
/// Decoding never fails: a field that is absent or has an unexpected shape at
/// any level decodes as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DestinationRuleSpec {
    /// `spec.host`
    pub host: Option<String>,
    /// `spec.trafficPolicy.tls.mode`
    pub tls_mode: Option<String>,
    /// `spec.subsets[*].name`, entries without a string name dropped
    pub subsets: Vec<String>,
}

impl DestinationRuleSpec {
    /// Decode the typed view from an untyped spec
    pub fn from_spec(spec: &Value) -> Self {
        let host = spec.get("host").and_then(Value::as_str).map(str::to_string);

        let tls_mode = spec
            .get("trafficPolicy")
            .and_then(|policy| policy.get("tls"))
            .and_then(|tls| tls.get("mode"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let subsets = spec
            .get("subsets")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            tls_mode,
            subsets,
        }
    }
}

impl From<&IstioObject> for DestinationRuleSpec {
    fn from(object: &IstioObject) -> Self {
        Self::from_spec(&object.spec)
    }
}
