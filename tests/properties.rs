//! Property-based tests for selection and evaluation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

use sqlassess::engine::{EngineOptions, EvaluationEngine, Probe, ProbeRegistry};
use sqlassess::rules::{
    selector, Applicability, AssessmentResult, Check, Condition, EvalFault, Evidence, Level,
    RuleCatalog, Status,
};
use sqlassess::target::{EngineEdition, Target, TargetHandle, TargetKind, TargetMetadata, Version};

const TAGS: &[&str] = &["Security", "Performance", "Storage", "Memory"];
const PLATFORMS: &[&str] = &["Windows", "Linux"];
const KINDS: &[TargetKind] = &[TargetKind::Server, TargetKind::Database, TargetKind::Instance];

struct Explodes;

impl Probe for Explodes {
    fn evaluate(&self, _: &TargetMetadata, _: &mut Evidence) -> Result<bool, EvalFault> {
        panic!("probe failure")
    }
}

fn version_strategy() -> impl Strategy<Value = Version> {
    (10u32..17, 0u32..3, 0u32..5000, 0u32..10).prop_map(|(a, b, c, d)| Version::new(a, b, c, d))
}

fn tags_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::sample::subsequence(TAGS, 1..=TAGS.len())
        .prop_map(|tags| tags.into_iter().map(String::from).collect())
}

fn applicability_strategy() -> impl Strategy<Value = Applicability> {
    (
        prop::sample::subsequence(KINDS, 0..=KINDS.len()),
        prop::option::of(version_strategy()),
        prop::sample::subsequence(PLATFORMS, 0..=PLATFORMS.len()),
    )
        .prop_map(|(kinds, min_version, platforms)| Applicability {
            kinds: kinds.into_iter().collect(),
            min_version,
            max_version: None,
            platforms: platforms.into_iter().map(String::from).collect(),
            editions: BTreeSet::new(),
        })
}

/// Conditions mixing healthy, unhealthy, faulting and panicking outcomes.
fn condition_strategy() -> impl Strategy<Value = Condition> {
    prop_oneof![
        Just(Condition::FactPresent { fact: "max_dop".into() }),
        (0.0f64..16.0).prop_map(|value| Condition::FactAtLeast {
            fact: "max_dop".into(),
            value,
        }),
        Just(Condition::FactAtLeast {
            fact: "missing".into(),
            value: 1.0,
        }),
        Just(Condition::Probe {
            name: "explodes".into(),
        }),
        version_strategy().prop_map(|version| Condition::VersionAtLeast { version }),
    ]
}

fn check_strategy() -> impl Strategy<Value = Check> {
    (
        "[a-z]{1,6}",
        tags_strategy(),
        applicability_strategy(),
        condition_strategy(),
    )
        .prop_map(|(id, tags, applies, condition)| Check {
            display_name: id.clone(),
            id,
            message: "{name} max_dop={max_dop}".into(),
            help_link: None,
            tags,
            level: Level::Warning,
            applies,
            condition,
        })
}

fn catalog_strategy() -> impl Strategy<Value = RuleCatalog> {
    prop::collection::vec(check_strategy(), 0..12).prop_map(RuleCatalog::from_checks)
}

fn target_strategy() -> impl Strategy<Value = Target> {
    (
        prop::sample::select(KINDS),
        version_strategy(),
        prop::sample::select(PLATFORMS),
    )
        .prop_map(|(kind, version, platform)| Target {
            kind,
            name: "SQL01".into(),
            version,
            platform: platform.into(),
            edition: EngineEdition::Standard,
            handle: TargetHandle::new("SQL01"),
        })
}

fn filter_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(TAGS, 0..=2).prop_map(|t| t.into_iter().map(String::from).collect())
}

fn metadata(target: Target) -> TargetMetadata {
    TargetMetadata::new(target, BTreeMap::from([("max_dop".to_string(), json!(4))]))
}

fn engine() -> EvaluationEngine {
    let mut probes = ProbeRegistry::new();
    probes.register("explodes", Explodes);
    EvaluationEngine::with_probes(EngineOptions { concurrency: 4 }, probes).unwrap()
}

fn ids(checks: &[Arc<Check>]) -> Vec<String> {
    checks.iter().map(|c| c.id.clone()).collect()
}

proptest! {
    #[test]
    fn select_never_returns_inapplicable_checks(
        catalog in catalog_strategy(),
        target in target_strategy(),
        filter in filter_strategy(),
    ) {
        for check in selector::select(&catalog, &target, Some(filter.as_slice())) {
            prop_assert!(check.applies_to(&target));
        }
    }

    #[test]
    fn filtered_checks_intersect_the_filter(
        catalog in catalog_strategy(),
        target in target_strategy(),
        filter in filter_strategy(),
    ) {
        let selected = selector::select(&catalog, &target, Some(filter.as_slice()));
        if filter.is_empty() {
            let applicable: Vec<String> = catalog
                .checks()
                .filter(|c| c.applies_to(&target))
                .map(|c| c.id.clone())
                .collect();
            prop_assert_eq!(ids(&selected), applicable);
        } else {
            for check in &selected {
                prop_assert!(check.has_any_tag(&filter));
            }
        }
    }

    #[test]
    fn selection_is_sorted_by_id(
        catalog in catalog_strategy(),
        target in target_strategy(),
    ) {
        let selected = ids(&selector::select(&catalog, &target, None));
        let mut sorted = selected.clone();
        sorted.sort();
        prop_assert_eq!(selected, sorted);
    }

    #[test]
    fn one_result_per_check_in_input_order(
        catalog in catalog_strategy(),
        target in target_strategy(),
    ) {
        let checks: Vec<Arc<Check>> = catalog.checks().cloned().collect();
        let results = engine().evaluate(&checks, &metadata(target));

        prop_assert_eq!(results.len(), checks.len());
        let result_ids: Vec<String> = results.iter().map(|r| r.check_id.clone()).collect();
        prop_assert_eq!(result_ids, ids(&checks));

        for (check, result) in checks.iter().zip(&results) {
            let faulting = match &check.condition {
                Condition::Probe { .. } => true,
                Condition::FactAtLeast { fact, .. } => fact == "missing",
                _ => false,
            };
            prop_assert_eq!(faulting, result.status == Status::Skipped);
        }
    }

    #[test]
    fn repeated_runs_are_byte_identical(
        catalog in catalog_strategy(),
        target in target_strategy(),
        filter in filter_strategy(),
    ) {
        let engine = engine();
        let meta = metadata(target.clone());
        let run = || -> Vec<AssessmentResult> {
            let checks = selector::select(&catalog, &target, Some(filter.as_slice()));
            engine.evaluate(&checks, &meta)
        };
        let first = serde_json::to_vec(&run()).unwrap();
        let second = serde_json::to_vec(&run()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn version_order_is_numeric(a in version_strategy(), b in version_strategy()) {
        let tuple = |v: Version| (v.major, v.minor, v.build, v.revision);
        prop_assert_eq!(a.cmp(&b), tuple(a).cmp(&tuple(b)));

        let reparsed: Version = a.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, a);
    }
}

#[test]
fn version_15_is_newer_than_14() {
    let newer: Version = "15.0.2000.5".parse().unwrap();
    let older: Version = "14.0.3000.1".parse().unwrap();
    assert!(newer > older);
}

#[test]
fn empty_filter_runs_all_five_applicable_checks() {
    let checks = (1..=5).map(|i| Check {
        id: format!("check-{i}"),
        display_name: format!("Check {i}"),
        message: "m".into(),
        help_link: None,
        tags: BTreeSet::from([TAGS[i % TAGS.len()].to_string()]),
        level: Level::Information,
        applies: Applicability::default(),
        condition: Condition::FactPresent {
            fact: "max_dop".into(),
        },
    });
    let catalog = RuleCatalog::from_checks(checks);
    let target = Target {
        kind: TargetKind::Server,
        name: "SQL01".into(),
        version: "16.0".parse().unwrap(),
        platform: "Linux".into(),
        edition: EngineEdition::Enterprise,
        handle: TargetHandle::new("SQL01"),
    };

    let selected = selector::select(&catalog, &target, Some(&[][..]));
    let results = engine().evaluate(&selected, &metadata(target));
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.status == Status::Pass));
}

#[test]
fn faulting_check_does_not_stop_the_batch() {
    let make = |id: &str, condition: Condition| Check {
        id: id.into(),
        display_name: id.into(),
        message: "m".into(),
        help_link: None,
        tags: BTreeSet::from(["Security".to_string()]),
        level: Level::Error,
        applies: Applicability::default(),
        condition,
    };
    let catalog = RuleCatalog::from_checks([
        make("a", Condition::FactPresent { fact: "max_dop".into() }),
        make("b", Condition::Probe { name: "explodes".into() }),
        make("c", Condition::FactPresent { fact: "absent".into() }),
    ]);
    let target = Target {
        kind: TargetKind::Server,
        name: "SQL01".into(),
        version: "15.0".parse().unwrap(),
        platform: "Windows".into(),
        edition: EngineEdition::Standard,
        handle: TargetHandle::new("SQL01"),
    };

    let checks = selector::select(&catalog, &target, None);
    let statuses: Vec<Status> = engine()
        .evaluate(&checks, &metadata(target))
        .into_iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(statuses, vec![Status::Pass, Status::Skipped, Status::Error]);
}
