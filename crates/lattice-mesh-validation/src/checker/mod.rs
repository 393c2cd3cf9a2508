//! Object checkers
//!
//! A checker runs over every object of one kind visible in a scope and
//! produces [`Validations`] for the objects that fail it. Results from
//! several checkers are combined with [`Validations::merge`].

mod multi_match;

pub use multi_match::MultiMatchChecker;

use crate::Validations;

/// A validation rule over a set of objects
pub trait ObjectChecker: Send + Sync {
    /// Run the check. Never fails; malformed objects contribute nothing.
    fn check(&self) -> Validations;
}

/// Run several checkers and merge their results
pub fn run_all(checkers: &[&dyn ObjectChecker]) -> Validations {
    let mut validations = Validations::new();
    for checker in checkers {
        validations.merge(checker.check());
    }
    validations
}
