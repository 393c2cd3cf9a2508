//! DestinationRule multi-match check
//!
//! Flags DestinationRules that claim the same host+subset combination as an
//! earlier rule in the same scope. Rules are processed once, in input order,
//! against an index of every host+subset claimed so far.
//!
//! ## Matching rules
//!
//! - Hosts are compared on their short service name only. `reviews.bookinfo`
//!   and `reviews.other` collide.
//! - A rule without subsets claims every subset of its host.
//! - A wildcard host (`*`) collides with every host, in either input order.
//! - A wildcard rule with `trafficPolicy.tls.mode: ISTIO_MUTUAL` declares
//!   mesh-wide mTLS and is left out of the check entirely.
//! - Each rule is reported at most once, however many partners it has.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, instrument};

use crate::checker::ObjectChecker;
use crate::host::Host;
use crate::object::{DestinationRuleSpec, IstioObject};
use crate::validations::{ObjectValidation, Validations};
use crate::{ISTIO_MUTUAL_TLS_MODE, MATCH_ALL_SUBSET, WILDCARD_HOST};

/// Subset name claimed by a DestinationRule.
///
/// `All` is a distinct variant rather than a reserved string, so no declared
/// subset name can ever collide with it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum SubsetName {
    /// No subsets declared: the rule claims every subset of its host
    All,
    Named(String),
}

impl fmt::Display for SubsetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(MATCH_ALL_SUBSET),
            Self::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Subset<'a> {
    name: SubsetName,
    owner: &'a str,
}

/// Subsets declared by a rule, or the single match-all subset if it declares none
fn extract_subsets<'a>(spec: &DestinationRuleSpec, owner: &'a str) -> Vec<Subset<'a>> {
    if spec.subsets.is_empty() {
        return vec![Subset {
            name: SubsetName::All,
            owner,
        }];
    }

    spec.subsets
        .iter()
        .map(|name| Subset {
            name: SubsetName::Named(name.clone()),
            owner,
        })
        .collect()
}

fn claims_all(subsets: &[Subset<'_>]) -> bool {
    matches!(subsets, [only] if only.name == SubsetName::All)
}

/// Whether the rule declares mTLS for the whole mesh rather than traffic
/// policy for a host.
fn enables_non_local_mtls(spec: &DestinationRuleSpec, host: &Host) -> bool {
    host.is_wildcard() && spec.tls_mode.as_deref() == Some(ISTIO_MUTUAL_TLS_MODE)
}

/// Subsets claimed so far: service -> subset -> owning rule.
///
/// Lives for a single check. Entries are only ever added or overwritten.
#[derive(Debug, Default)]
struct CollisionIndex<'a> {
    seen: BTreeMap<String, BTreeMap<SubsetName, &'a str>>,
}

impl<'a> CollisionIndex<'a> {
    /// Owners of earlier claims overlapping `subsets` on `service`.
    ///
    /// May contain duplicates.
    fn collisions(&self, service: &str, subsets: &[Subset<'a>]) -> Vec<&'a str> {
        let mut partners = Vec::new();

        // A wildcard host overlaps every host seen before it
        if service == WILDCARD_HOST {
            for claims in self.seen.values() {
                collide(subsets, claims, &mut partners);
            }
        }

        if let Some(claims) = self.seen.get(WILDCARD_HOST) {
            collide(subsets, claims, &mut partners);
        }

        if let Some(claims) = self.seen.get(service) {
            collide(subsets, claims, &mut partners);
        }

        partners
    }

    /// Record `subsets` as claimed on `service`, replacing earlier owners of
    /// the same subset names.
    fn register(&mut self, service: String, subsets: Vec<Subset<'a>>) {
        let claims = self.seen.entry(service).or_default();
        for subset in subsets {
            claims.insert(subset.name, subset.owner);
        }
    }
}

fn collide<'a>(
    current: &[Subset<'a>],
    existing: &BTreeMap<SubsetName, &'a str>,
    partners: &mut Vec<&'a str>,
) {
    if claims_all(current) {
        partners.extend(existing.values().copied());
    } else if let Some(owner) = existing.get(&SubsetName::All) {
        partners.push(*owner);
    } else {
        partners.extend(
            current
                .iter()
                .filter_map(|subset| existing.get(&subset.name).copied()),
        );
    }
}

/// Checks that no two DestinationRules target the same host+subset combination
#[derive(Clone, Copy, Debug)]
pub struct MultiMatchChecker<'a> {
    destination_rules: &'a [IstioObject],
}

impl<'a> MultiMatchChecker<'a> {
    /// Create a checker over the DestinationRules of one scope, in the order
    /// they should be processed
    pub fn new(destination_rules: &'a [IstioObject]) -> Self {
        Self { destination_rules }
    }
}

impl ObjectChecker for MultiMatchChecker<'_> {
    #[instrument(skip(self), fields(rules = self.destination_rules.len()))]
    fn check(&self) -> Validations {
        let mut validations = Validations::new();
        let mut index = CollisionIndex::default();

        for rule in self.destination_rules {
            let name = rule.metadata.name.as_str();
            let spec = DestinationRuleSpec::from(rule);

            let Some(raw_host) = spec.host.as_deref() else {
                debug!(rule = name, "skipping DestinationRule without a host");
                continue;
            };
            let host = Host::parse(
                raw_host,
                &rule.metadata.namespace,
                &rule.metadata.cluster_name,
            );

            if enables_non_local_mtls(&spec, &host) {
                debug!(rule = name, host = %host, "skipping mesh-wide mTLS DestinationRule");
                continue;
            }

            let subsets = extract_subsets(&spec, name);
            for partner in index.collisions(&host.service, &subsets) {
                debug!(rule = name, partner, service = %host.service, "host+subset collision");
                validations.record_once(ObjectValidation::multi_match(name));
                validations.record_once(ObjectValidation::multi_match(partner));
            }

            index.register(host.service, subsets);
        }

        info!(
            rules = self.destination_rules.len(),
            findings = validations.len(),
            "multi-match check complete"
        );
        validations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectMeta;
    use serde_json::{json, Value};

    fn rule(name: &str, spec: Value) -> IstioObject {
        IstioObject::destination_rule(ObjectMeta::new(name, "bookinfo"), spec)
    }

    fn with_subsets(name: &str, host: &str, subsets: &[&str]) -> IstioObject {
        let subsets: Vec<Value> = subsets.iter().map(|s| json!({ "name": s })).collect();
        rule(name, json!({ "host": host, "subsets": subsets }))
    }

    fn without_subsets(name: &str, host: &str) -> IstioObject {
        rule(name, json!({ "host": host }))
    }

    fn flagged(rules: &[IstioObject]) -> Vec<String> {
        MultiMatchChecker::new(rules)
            .check()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // =========================================================================
    // Subset extraction
    // =========================================================================

    #[test]
    fn declared_subsets_are_owned_by_the_rule() {
        let spec = DestinationRuleSpec::from_spec(&json!({
            "subsets": [ { "name": "v1" }, { "labels": {} }, { "name": "v2" } ]
        }));
        let subsets = extract_subsets(&spec, "reviews");

        assert_eq!(
            subsets,
            vec![
                Subset {
                    name: SubsetName::Named("v1".to_string()),
                    owner: "reviews"
                },
                Subset {
                    name: SubsetName::Named("v2".to_string()),
                    owner: "reviews"
                },
            ]
        );
        assert!(!claims_all(&subsets));
    }

    #[test]
    fn missing_empty_or_malformed_subsets_claim_everything() {
        for spec in [
            json!({}),
            json!({ "subsets": [] }),
            json!({ "subsets": [ { "name": 1 }, "v1" ] }),
            json!({ "subsets": "v1" }),
        ] {
            let subsets = extract_subsets(&DestinationRuleSpec::from_spec(&spec), "reviews");
            assert!(claims_all(&subsets), "spec {spec} should claim all subsets");
        }
    }

    #[test]
    fn declared_tilde_subset_is_not_the_match_all_subset() {
        let spec = DestinationRuleSpec::from_spec(&json!({ "subsets": [ { "name": "~" } ] }));
        let subsets = extract_subsets(&spec, "reviews");
        assert!(!claims_all(&subsets));
        assert_eq!(subsets[0].name.to_string(), "~");
        assert_eq!(SubsetName::All.to_string(), MATCH_ALL_SUBSET);
    }

    // =========================================================================
    // Exemption
    // =========================================================================

    #[test]
    fn only_wildcard_istio_mutual_rules_are_exempt() {
        let exempt = |host: &str, spec: Value| {
            enables_non_local_mtls(
                &DestinationRuleSpec::from_spec(&spec),
                &Host::parse(host, "bookinfo", ""),
            )
        };
        let mutual = json!({ "trafficPolicy": { "tls": { "mode": "ISTIO_MUTUAL" } } });

        assert!(exempt("*", mutual.clone()));
        assert!(exempt("*.bookinfo", mutual.clone()));
        assert!(!exempt("reviews.bookinfo", mutual));
        assert!(!exempt(
            "*",
            json!({ "trafficPolicy": { "tls": { "mode": "SIMPLE" } } })
        ));
        assert!(!exempt("*", json!({ "trafficPolicy": { "tls": {} } })));
        assert!(!exempt("*", json!({ "trafficPolicy": "ISTIO_MUTUAL" })));
        assert!(!exempt("*", json!({})));
    }

    // =========================================================================
    // Collision index
    // =========================================================================

    #[test]
    fn index_overwrites_owner_of_the_same_subset() {
        let mut index = CollisionIndex::default();
        let v1 = |owner| {
            vec![Subset {
                name: SubsetName::Named("v1".to_string()),
                owner,
            }]
        };

        index.register("reviews".to_string(), v1("first"));
        index.register("reviews".to_string(), v1("second"));

        assert_eq!(index.collisions("reviews", &v1("third")), vec!["second"]);
        assert!(index.collisions("ratings", &v1("third")).is_empty());
    }

    #[test]
    fn match_all_claim_reaches_every_owner() {
        let mut index = CollisionIndex::default();
        let named = |name: &str, owner| Subset {
            name: SubsetName::Named(name.to_string()),
            owner,
        };
        index.register("reviews".to_string(), vec![named("v1", "a"), named("v2", "b")]);

        let all = vec![Subset {
            name: SubsetName::All,
            owner: "c",
        }];
        let mut partners = index.collisions("reviews", &all);
        partners.sort_unstable();
        assert_eq!(partners, vec!["a", "b"]);
    }

    // =========================================================================
    // Full check
    // =========================================================================

    #[test]
    fn rules_without_subsets_on_the_same_host_collide() {
        let rules = vec![
            without_subsets("reviews-a", "reviews"),
            without_subsets("reviews-b", "reviews.bookinfo.svc.cluster.local"),
        ];
        assert_eq!(flagged(&rules), vec!["reviews-a", "reviews-b"]);
    }

    #[test]
    fn shared_subset_collides_and_disjoint_subsets_do_not() {
        let rules = vec![
            with_subsets("reviews-a", "reviews", &["a", "b"]),
            with_subsets("reviews-b", "reviews", &["b", "c"]),
        ];
        assert_eq!(flagged(&rules), vec!["reviews-a", "reviews-b"]);

        let rules = vec![
            with_subsets("reviews-a", "reviews", &["a", "b"]),
            with_subsets("reviews-b", "reviews", &["c", "d"]),
        ];
        assert!(flagged(&rules).is_empty());
    }

    #[test]
    fn named_subset_collides_with_earlier_match_all_rule() {
        let rules = vec![
            without_subsets("reviews-all", "reviews"),
            with_subsets("reviews-v1", "reviews", &["v1"]),
        ];
        assert_eq!(flagged(&rules), vec!["reviews-all", "reviews-v1"]);
    }

    #[test]
    fn different_services_do_not_collide() {
        let rules = vec![
            without_subsets("reviews", "reviews"),
            without_subsets("ratings", "ratings"),
        ];
        assert!(flagged(&rules).is_empty());
    }

    #[test]
    fn same_service_in_different_namespaces_collides() {
        let rules = vec![
            without_subsets("reviews-bookinfo", "reviews.bookinfo"),
            without_subsets("reviews-staging", "reviews.staging"),
        ];
        assert_eq!(flagged(&rules), vec!["reviews-bookinfo", "reviews-staging"]);
    }

    #[test]
    fn wildcard_host_collides_in_either_order() {
        let wildcard = with_subsets("all-hosts", "*", &["x"]);
        let concrete = with_subsets("reviews", "reviews", &["x"]);

        let rules = vec![wildcard.clone(), concrete.clone()];
        assert_eq!(flagged(&rules), vec!["all-hosts", "reviews"]);

        let rules = vec![concrete, wildcard];
        assert_eq!(flagged(&rules), vec!["all-hosts", "reviews"]);
    }

    #[test]
    fn wildcard_host_with_other_subsets_does_not_collide() {
        let rules = vec![
            with_subsets("reviews", "reviews", &["v1"]),
            with_subsets("all-hosts", "*", &["v2"]),
        ];
        assert!(flagged(&rules).is_empty());
    }

    #[test]
    fn mesh_wide_mtls_rule_is_ignored() {
        let mesh_mtls = rule(
            "mesh-mtls",
            json!({
                "host": "*",
                "trafficPolicy": { "tls": { "mode": "ISTIO_MUTUAL" } }
            }),
        );
        let rules = vec![
            without_subsets("reviews-a", "reviews"),
            mesh_mtls.clone(),
            with_subsets("ratings", "ratings", &["v1"]),
            without_subsets("reviews-b", "reviews"),
            mesh_mtls,
        ];
        assert_eq!(flagged(&rules), vec!["reviews-a", "reviews-b"]);
    }

    #[test]
    fn wildcard_rule_without_istio_mutual_is_checked() {
        let rules = vec![
            with_subsets("ratings", "ratings", &["v1"]),
            rule(
                "mesh-simple-tls",
                json!({ "host": "*", "trafficPolicy": { "tls": { "mode": "SIMPLE" } } }),
            ),
        ];
        assert_eq!(flagged(&rules), vec!["mesh-simple-tls", "ratings"]);
    }

    #[test]
    fn rules_without_a_usable_host_are_skipped() {
        let rules = vec![
            without_subsets("reviews", "reviews"),
            rule("no-host", json!({})),
            rule("numeric-host", json!({ "host": 7 })),
            rule("null-spec", Value::Null),
        ];
        assert!(flagged(&rules).is_empty());
    }

    #[test]
    fn each_rule_is_reported_once() {
        let rules = vec![
            without_subsets("a", "reviews"),
            without_subsets("b", "reviews"),
            without_subsets("c", "reviews"),
        ];
        let validations = MultiMatchChecker::new(&rules).check();

        assert_eq!(validations.names(), vec!["a", "b", "c"]);
        for validation in validations.iter() {
            assert_eq!(validation.checks.len(), 1);
            assert_eq!(validation.checks[0].code, crate::MULTI_MATCH_CHECK);
            assert_eq!(validation.checks[0].path, crate::MULTI_MATCH_PATH);
            assert!(validation.valid);
        }
    }

    #[test]
    fn empty_input_has_no_findings() {
        assert!(MultiMatchChecker::new(&[]).check().is_empty());
    }

    #[test]
    fn check_is_repeatable() {
        let rules = vec![
            with_subsets("a", "reviews", &["v1"]),
            with_subsets("b", "*", &["v1"]),
        ];
        let checker = MultiMatchChecker::new(&rules);
        assert_eq!(checker.check(), checker.check());
    }
}
