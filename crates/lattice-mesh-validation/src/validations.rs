//! Validation results
//!
//! Findings are keyed by object identity ([`ValidationKey`]). Each object gets
//! at most one [`ObjectValidation`], holding the checks that fired for it.
//! [`Validations`] can be merged with results from unrelated checkers.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::{DESTINATION_RULE_OBJECT_TYPE, MULTI_MATCH_CHECK, MULTI_MATCH_PATH};

/// Known checks: code, message, severity
const CHECK_CATALOG: &[(&str, &str, Severity)] = &[(
    MULTI_MATCH_CHECK,
    "More than one DestinationRules for the same host subset combination",
    Severity::Warning,
)];

/// Severity of a validation check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The object is invalid
    Error,
    /// The object is valid but likely misconfigured
    Warning,
    /// Informational only
    Info,
}

impl Severity {
    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a validated object
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationKey {
    /// Object name
    pub name: String,
    /// Object type (e.g., "destinationrule")
    pub object_type: String,
}

impl ValidationKey {
    /// Create a key
    pub fn new(name: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_type: object_type.into(),
        }
    }

    /// Key for a DestinationRule
    pub fn destination_rule(name: impl Into<String>) -> Self {
        Self::new(name, DESTINATION_RULE_OBJECT_TYPE)
    }
}

/// A single check that fired for an object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    /// Check code (e.g., "destinationrules.multimatch")
    pub code: String,
    /// Human readable description
    pub message: String,
    /// Severity
    pub severity: Severity,
    /// Attribute path the check refers to (e.g., "spec/host")
    pub path: String,
}

impl ValidationCheck {
    /// Build a check from the catalog.
    ///
    /// Unknown codes produce an error-severity check whose message is the code.
    pub fn build(code: &str, path: &str) -> Self {
        let (message, severity) = CHECK_CATALOG
            .iter()
            .find(|(known, _, _)| *known == code)
            .map(|(_, message, severity)| (message.to_string(), *severity))
            .unwrap_or_else(|| (code.to_string(), Severity::Error));

        Self {
            code: code.to_string(),
            message,
            severity,
            path: path.to_string(),
        }
    }
}

/// All checks recorded for one object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectValidation {
    /// Object name
    pub name: String,
    /// Object type
    pub object_type: String,
    /// False when any error-severity check applies
    pub valid: bool,
    /// Checks that fired
    pub checks: Vec<ValidationCheck>,
}

impl ObjectValidation {
    /// Validation for a DestinationRule that shares a host+subset with another.
    ///
    /// The conflict is reported as a warning, so the object stays valid.
    pub fn multi_match(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_type: DESTINATION_RULE_OBJECT_TYPE.to_string(),
            valid: true,
            checks: vec![ValidationCheck::build(MULTI_MATCH_CHECK, MULTI_MATCH_PATH)],
        }
    }

    /// Key for this validation
    pub fn key(&self) -> ValidationKey {
        ValidationKey::new(&self.name, &self.object_type)
    }

    fn absorb(&mut self, other: ObjectValidation) {
        self.valid = self.valid && other.valid;
        for check in other.checks {
            if !self.checks.contains(&check) {
                self.checks.push(check);
            }
        }
    }
}

/// Validation results keyed by object identity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validations(BTreeMap<ValidationKey, ObjectValidation>);

impl Validations {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validation unless one already exists for its key.
    ///
    /// Returns true if the validation was inserted.
    pub fn record_once(&mut self, validation: ObjectValidation) -> bool {
        match self.0.entry(validation.key()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(validation);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Merge results from another checker.
    ///
    /// New keys are inserted. For existing keys, checks not already present
    /// are appended and `valid` becomes the conjunction of both.
    pub fn merge(&mut self, other: Validations) {
        for (key, validation) in other.0 {
            match self.0.entry(key) {
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(validation);
                }
                btree_map::Entry::Occupied(mut entry) => entry.get_mut().absorb(validation),
            }
        }
    }

    /// Whether a validation exists for the key
    pub fn contains(&self, key: &ValidationKey) -> bool {
        self.0.contains_key(key)
    }

    /// Get the validation for a key
    pub fn get(&self, key: &ValidationKey) -> Option<&ObjectValidation> {
        self.0.get(key)
    }

    /// Number of objects with findings
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no object has findings
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over validations in key order
    pub fn iter(&self) -> impl Iterator<Item = &ObjectValidation> {
        self.0.values()
    }

    /// Names of all objects with findings, in key order
    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(|key| key.name.as_str()).collect()
    }
}

impl IntoIterator for Validations {
    type Item = ObjectValidation;
    type IntoIter = btree_map::IntoValues<ValidationKey, ObjectValidation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}

impl FromIterator<ObjectValidation> for Validations {
    fn from_iter<I: IntoIterator<Item = ObjectValidation>>(iter: I) -> Self {
        let mut validations = Self::new();
        for validation in iter {
            validations.merge(Self(BTreeMap::from([(validation.key(), validation)])));
        }
        validations
    }
}

// Struct keys cannot be JSON object keys, so results serialize as a list.
impl Serialize for Validations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.values())
    }
}
