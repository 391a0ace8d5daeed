//! Reports
//!
//! Per-path outcomes, per-scenario aggregates with one witness trail per fired
//! property, and the verdict that compares them with the scenario's
//! expectation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use envmodel_core::Signal;
use envmodel_error::{PropertyId, ViolationKind};
use serde::Serialize;

use crate::config::Strategy;
use crate::scenario::Expectation;

//-----------------------------------------------------------------------------
// Path Reports
//-----------------------------------------------------------------------------

/// How one path ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome", content = "property")]
pub enum PathOutcome {
    /// Ran to the end and was finalized
    Completed,
    /// Stopped by a memory fault; not finalized
    Faulted(PropertyId),
    /// An assumption failed; not a real execution
    Pruned,
}

/// One explored path
#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub index: usize,
    /// Choices taken, replayable with `envmodel-sim replay`
    pub choices: Vec<usize>,
    #[serde(flatten)]
    pub outcome: PathOutcome,
    /// The depth bound cut the path's choices short
    pub truncated: bool,
    pub signals: Vec<Signal>,
}

impl PathReport {
    pub fn is_clean(&self) -> bool {
        self.signals.is_empty()
    }
}

/// First path on which a property fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyWitness {
    pub id: PropertyId,
    pub kind: ViolationKind,
    /// Paths on which it fired at least once
    pub paths: usize,
    pub witness: Vec<usize>,
}

//-----------------------------------------------------------------------------
// Verdict
//-----------------------------------------------------------------------------

/// Scenario result measured against its expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "verdict")]
pub enum Verdict {
    Pass,
    Fail {
        missing: Vec<PropertyId>,
        unexpected: Vec<PropertyId>,
    },
    /// The search was cut short before every expected property was seen
    Inconclusive { missing: Vec<PropertyId> },
}

impl Verdict {
    /// Judge the fired properties of a search. `complete` is true when the
    /// search covered every path without truncation.
    pub fn judge(expectation: &Expectation, fired: &BTreeSet<PropertyId>, complete: bool) -> Self {
        let expected = expectation.expected();
        let unexpected: Vec<PropertyId> = fired.difference(&expected).cloned().collect();
        let missing: Vec<PropertyId> = expected.difference(fired).cloned().collect();

        if !unexpected.is_empty() || (complete && !missing.is_empty()) {
            Verdict::Fail { missing, unexpected }
        } else if !missing.is_empty() {
            Verdict::Inconclusive { missing }
        } else {
            Verdict::Pass
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail { .. } => write!(f, "FAIL"),
            Verdict::Inconclusive { .. } => write!(f, "INCONCLUSIVE"),
        }
    }
}

//-----------------------------------------------------------------------------
// Scenario Reports
//-----------------------------------------------------------------------------

/// Aggregate over every path explored for one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub description: String,
    pub expectation: Expectation,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub paths: usize,
    pub completed: usize,
    pub pruned: usize,
    pub faulted: usize,
    /// Some paths or choices were left unexplored
    pub truncated: bool,
    pub fired: Vec<PropertyWitness>,
    pub verdict: Verdict,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path_reports: Vec<PathReport>,
}

/// Folds path reports into a [`ScenarioReport`].
#[derive(Debug, Clone)]
pub struct ScenarioReportBuilder {
    scenario: String,
    description: String,
    expectation: Expectation,
    strategy: Strategy,
    seed: Option<u64>,
    paths: usize,
    completed: usize,
    pruned: usize,
    faulted: usize,
    truncated: bool,
    fired: BTreeMap<PropertyId, PropertyWitness>,
    keep_paths: bool,
    path_reports: Vec<PathReport>,
}

impl ScenarioReportBuilder {
    pub fn new(scenario: &str, description: &str, expectation: Expectation, strategy: Strategy) -> Self {
        Self {
            scenario: scenario.to_string(),
            description: description.to_string(),
            expectation,
            strategy,
            seed: None,
            paths: 0,
            completed: 0,
            pruned: 0,
            faulted: 0,
            truncated: false,
            fired: BTreeMap::new(),
            keep_paths: false,
            path_reports: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Keep every path report, not just the aggregate.
    pub fn keep_paths(mut self, keep: bool) -> Self {
        self.keep_paths = keep;
        self
    }

    pub fn paths(&self) -> usize {
        self.paths
    }

    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    pub fn record(&mut self, path: PathReport) {
        self.paths += 1;
        self.truncated |= path.truncated;
        match path.outcome {
            PathOutcome::Completed => self.completed += 1,
            PathOutcome::Faulted(_) => self.faulted += 1,
            PathOutcome::Pruned => self.pruned += 1,
        }

        let mut seen = BTreeSet::new();
        for signal in &path.signals {
            if !seen.insert(signal.id().clone()) {
                continue;
            }
            self.fired
                .entry(signal.id().clone())
                .and_modify(|witness| witness.paths += 1)
                .or_insert_with(|| PropertyWitness {
                    id: signal.id().clone(),
                    kind: signal.kind(),
                    paths: 1,
                    witness: path.choices.clone(),
                });
        }

        if self.keep_paths {
            self.path_reports.push(path);
        }
    }

    /// Close the report. `exhausted` is true when the search visited every
    /// path it could reach.
    pub fn finish(self, exhausted: bool, elapsed_ms: u64) -> ScenarioReport {
        let complete = exhausted && !self.truncated;
        let fired_ids: BTreeSet<PropertyId> = self.fired.keys().cloned().collect();
        let verdict = Verdict::judge(&self.expectation, &fired_ids, complete);

        ScenarioReport {
            scenario: self.scenario,
            description: self.description,
            expectation: self.expectation,
            strategy: self.strategy,
            seed: self.seed,
            paths: self.paths,
            completed: self.completed,
            pruned: self.pruned,
            faulted: self.faulted,
            truncated: !complete,
            fired: self.fired.into_values().collect(),
            verdict,
            elapsed_ms,
            path_reports: self.path_reports,
        }
    }
}

impl ScenarioReport {
    pub fn witness(&self, id: &PropertyId) -> Option<&PropertyWitness> {
        self.fired.iter().find(|witness| &witness.id == id)
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{:<32} {:<12} paths={} completed={} pruned={} faulted={} fired={}{}",
            self.scenario,
            self.verdict.to_string(),
            self.paths,
            self.completed,
            self.pruned,
            self.faulted,
            self.fired.len(),
            if self.truncated { " (truncated)" } else { "" }
        )
    }
}

//-----------------------------------------------------------------------------
// Suite Reports
//-----------------------------------------------------------------------------

/// Results of running several scenarios
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passed: usize,
    pub failed: usize,
    pub inconclusive: usize,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn new(started_at: DateTime<Utc>, mut scenarios: Vec<ScenarioReport>) -> Self {
        scenarios.sort_by(|a, b| a.scenario.cmp(&b.scenario));
        let (mut passed, mut failed, mut inconclusive) = (0, 0, 0);
        for report in &scenarios {
            match report.verdict {
                Verdict::Pass => passed += 1,
                Verdict::Fail { .. } => failed += 1,
                Verdict::Inconclusive { .. } => inconclusive += 1,
            }
        }

        Self {
            started_at,
            finished_at: Utc::now(),
            passed,
            failed,
            inconclusive,
            scenarios,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.inconclusive == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> BTreeSet<PropertyId> {
        values.iter().map(|v| PropertyId::from(*v)).collect()
    }

    #[test]
    fn safe_scenarios_pass_only_when_nothing_fires() {
        assert_eq!(Verdict::judge(&Expectation::Safe, &ids(&[]), true), Verdict::Pass);
        assert!(matches!(
            Verdict::judge(&Expectation::Safe, &ids(&["resource:a:leak"]), false),
            Verdict::Fail { .. }
        ));
    }

    #[test]
    fn unsafe_scenarios_need_every_expected_property() {
        let expectation = Expectation::unsafe_with(["resource:a:leak", "resource:a:double-acquire"]);

        let verdict = Verdict::judge(&expectation, &ids(&["resource:a:leak"]), true);
        assert_eq!(
            verdict,
            Verdict::Fail {
                missing: vec!["resource:a:double-acquire".into()],
                unexpected: vec![],
            }
        );

        let verdict = Verdict::judge(&expectation, &ids(&["resource:a:leak"]), false);
        assert!(matches!(verdict, Verdict::Inconclusive { .. }));

        let verdict = Verdict::judge(
            &expectation,
            &ids(&["resource:a:leak", "resource:a:double-acquire"]),
            true,
        );
        assert!(verdict.is_pass());
    }

    #[test]
    fn builder_keeps_first_witness_per_property() {
        use envmodel_core::AssertionChannel;

        let mut channel = AssertionChannel::new();
        channel.raise(ViolationKind::ContractViolation, "resource:a:leak".into(), "leak");
        channel.raise(ViolationKind::ContractViolation, "resource:a:leak".into(), "leak");
        let signals = channel.into_signals();

        let mut builder = ScenarioReportBuilder::new("a", "", Expectation::Safe, Strategy::Exhaustive);
        for (index, choices) in [vec![0, 1], vec![1]].into_iter().enumerate() {
            builder.record(PathReport {
                index,
                choices,
                outcome: PathOutcome::Completed,
                truncated: false,
                signals: signals.clone(),
            });
        }
        let report = builder.finish(true, 0);

        let witness = report.witness(&"resource:a:leak".into()).unwrap();
        assert_eq!(witness.paths, 2);
        assert_eq!(witness.witness, vec![0, 1]);
        assert!(!report.truncated);
        assert!(report.path_reports.is_empty());
    }
}
