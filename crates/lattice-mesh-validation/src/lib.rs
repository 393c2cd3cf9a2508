//! Lattice mesh validation - conflict detection for Istio traffic policy
//!
//! Checks a set of DestinationRules visible in one scope (a namespace or the
//! whole mesh) for definitions that bind incompatible traffic policy to the
//! same host and subset combination.
//!
//! # Modules
//!
//! - [`host`] - Host normalization (`service.namespace.cluster`)
//! - [`object`] - Istio object metadata and the typed DestinationRule view
//! - [`checker`] - Object checkers, including the multi-match collision check
//! - [`validations`] - Validation results keyed by object identity
//! - [`yaml`] - YAML manifest loading
//! - [`error`] - Error types for manifest decoding
//!
//! The checkers themselves never fail: malformed fields degrade to
//! "contributes nothing" so that partial schemas never block validation of
//! the rest of the scope. Errors only exist at the decoding boundary.

#![deny(missing_docs)]

pub mod checker;
pub mod error;
pub mod host;
pub mod object;
pub mod validations;
pub mod yaml;

pub use checker::{MultiMatchChecker, ObjectChecker};
pub use error::Error;
pub use host::Host;
pub use object::{DestinationRuleSpec, IstioObject, ObjectMeta};
pub use validations::{ObjectValidation, Severity, ValidationCheck, ValidationKey, Validations};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Check Constants
// =============================================================================

/// Object type recorded on every DestinationRule validation
pub const DESTINATION_RULE_OBJECT_TYPE: &str = "destinationrule";

/// Check code for two DestinationRules claiming the same host+subset
pub const MULTI_MATCH_CHECK: &str = "destinationrules.multimatch";

/// Attribute path reported by the multi-match check
pub const MULTI_MATCH_PATH: &str = "spec/host";

/// Service name that matches every host in the mesh
pub const WILDCARD_HOST: &str = "*";

/// Display form of the "no subsets declared" subset
pub const MATCH_ALL_SUBSET: &str = "~";

/// TLS mode that marks a wildcard DestinationRule as a mesh-wide mTLS declaration
pub const ISTIO_MUTUAL_TLS_MODE: &str = "ISTIO_MUTUAL";
