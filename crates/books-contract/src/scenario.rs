// crates/books-contract/src/scenario.rs
// ============================================================================
// Module: Scenario Pipeline
// Description: Ordered scenarios with explicit dependency edges.
// Purpose: Run calls in sequence and aggregate per-scenario outcomes.
// Dependencies: serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! A [`ScenarioPipeline`] is an ordered list of [`Scenario`] values. Each
//! scenario may depend on earlier scenarios; dependencies are validated when
//! the pipeline is built. During a run a scenario whose dependency did not
//! pass is reported as skipped and never sent. Scenarios are atomic: one call,
//! one expectation bundle, one outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::client::ApiCall;
use crate::error::ConfigError;
use crate::error::TransportError;
use crate::lifecycle::SuiteContext;
use crate::oracle::ContractViolation;
use crate::oracle::ExpectationBundle;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Stable scenario identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    /// Creates an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ScenarioId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scenario grouping used for selection and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioGroup {
    /// Minimal reachability checks.
    Smoke,
    /// Happy-path CRUD lifecycle.
    Positive,
    /// Error handling and validation.
    Negative,
}

impl ScenarioGroup {
    /// Returns the group label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for ScenarioGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// One exercised HTTP call plus its expectation bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Unique identifier.
    pub id: ScenarioId,
    /// Human-readable name.
    pub description: String,
    /// Selection group.
    pub group: ScenarioGroup,
    /// Earlier scenarios that must pass first.
    pub depends_on: Vec<ScenarioId>,
    /// Call to send.
    pub call: ApiCall,
    /// Expected outcome.
    pub expectation: ExpectationBundle,
}

impl Scenario {
    /// Creates a scenario without dependencies.
    #[must_use]
    pub fn new(
        id: impl Into<ScenarioId>,
        group: ScenarioGroup,
        call: ApiCall,
        expectation: ExpectationBundle,
    ) -> Self {
        let description = expectation.name().to_string();
        Self {
            id: id.into(),
            description,
            group,
            depends_on: Vec::new(),
            call,
            expectation,
        }
    }

    /// Overrides the human-readable name.
    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a dependency on an earlier scenario.
    #[must_use]
    pub fn after(mut self, dependency: impl Into<ScenarioId>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invalid scenario graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Two scenarios share an identifier.
    #[error("duplicate scenario id `{0}`")]
    DuplicateId(ScenarioId),
    /// A dependency names no scenario.
    #[error("scenario `{scenario}` depends on unknown scenario `{dependency}`")]
    UnknownDependency {
        /// Dependent scenario.
        scenario: ScenarioId,
        /// Missing dependency.
        dependency: ScenarioId,
    },
    /// A dependency names a scenario that runs later (or itself).
    #[error("scenario `{scenario}` depends on later scenario `{dependency}`")]
    ForwardDependency {
        /// Dependent scenario.
        scenario: ScenarioId,
        /// Dependency ordered at or after the dependent.
        dependency: ScenarioId,
    },
    /// The id allocator has no unused id left.
    #[error("no book ids left after {last}")]
    IdsExhausted {
        /// Last id the allocator can still reach.
        last: i64,
    },
}

/// Why a scenario failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioFailure {
    /// The case could not be prepared.
    #[error("case setup failed: {0}")]
    Setup(#[from] ConfigError),
    /// The call did not complete.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The response broke the contract.
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Accumulates scenarios before validation.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    /// Scenarios in insertion order.
    scenarios: Vec<Scenario>,
}

impl PipelineBuilder {
    /// Appends a scenario.
    #[must_use]
    pub fn add(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Validates ids and dependency edges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for duplicate ids, unknown dependencies, or
    /// dependencies that do not point at an earlier scenario.
    pub fn build(self) -> Result<ScenarioPipeline, PipelineError> {
        let mut positions = BTreeMap::new();
        for (index, scenario) in self.scenarios.iter().enumerate() {
            if positions.insert(scenario.id.clone(), index).is_some() {
                return Err(PipelineError::DuplicateId(scenario.id.clone()));
            }
        }
        for (index, scenario) in self.scenarios.iter().enumerate() {
            for dependency in &scenario.depends_on {
                match positions.get(dependency) {
                    None => {
                        return Err(PipelineError::UnknownDependency {
                            scenario: scenario.id.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                    Some(position) if *position >= index => {
                        return Err(PipelineError::ForwardDependency {
                            scenario: scenario.id.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(ScenarioPipeline {
            scenarios: self.scenarios,
        })
    }
}

/// Validated ordered scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioPipeline {
    /// Scenarios in execution order.
    scenarios: Vec<Scenario>,
}

impl ScenarioPipeline {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Returns the scenarios in execution order.
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Returns the number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Returns true when the pipeline is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Returns the scenario with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.id.as_str() == id)
    }

    /// Keeps scenarios in `groups` plus everything they transitively depend on.
    #[must_use]
    pub fn select(&self, groups: &[ScenarioGroup]) -> Self {
        let mut needed: BTreeSet<&ScenarioId> = self
            .scenarios
            .iter()
            .filter(|scenario| groups.contains(&scenario.group))
            .map(|scenario| &scenario.id)
            .collect();
        for scenario in self.scenarios.iter().rev() {
            if needed.contains(&scenario.id) {
                needed.extend(scenario.depends_on.iter());
            }
        }
        Self {
            scenarios: self
                .scenarios
                .iter()
                .filter(|scenario| needed.contains(&scenario.id))
                .cloned()
                .collect(),
        }
    }

    /// Runs every scenario in order against `suite`.
    pub async fn run(&self, suite: &SuiteContext) -> SuiteReport {
        let mut results: Vec<ScenarioResult> = Vec::with_capacity(self.scenarios.len());
        for scenario in &self.scenarios {
            let blocked_by = scenario.depends_on.iter().find(|dependency| {
                !results
                    .iter()
                    .any(|result| &result.id == *dependency && result.outcome.is_passed())
            });
            let outcome = match blocked_by {
                Some(dependency) => {
                    tracing::warn!(scenario = %scenario.id, blocked_by = %dependency, "scenario skipped");
                    ScenarioOutcome::Skipped {
                        blocked_by: dependency.clone(),
                    }
                }
                None => run_one(suite, scenario).await,
            };
            results.push(ScenarioResult {
                id: scenario.id.clone(),
                description: scenario.description.clone(),
                group: scenario.group,
                outcome,
            });
        }
        SuiteReport {
            results,
        }
    }
}

/// Sends one scenario and classifies the result.
async fn run_one(suite: &SuiteContext, scenario: &Scenario) -> ScenarioOutcome {
    let case = match suite.begin_case(scenario.id.as_str()) {
        Ok(case) => case,
        Err(failure) => return ScenarioOutcome::Failed(failure),
    };
    match case.check(&scenario.call, &scenario.expectation).await {
        Ok(response) => {
            tracing::info!(scenario = %scenario.id, status = response.status, "scenario passed");
            ScenarioOutcome::Passed {
                status: response.status,
                elapsed: response.elapsed,
            }
        }
        Err(failure) => {
            tracing::warn!(scenario = %scenario.id, error = %failure, "scenario failed");
            ScenarioOutcome::Failed(failure)
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// Every assertion held.
    Passed {
        /// Response status.
        status: u16,
        /// Call duration.
        elapsed: Duration,
    },
    /// The call or an assertion failed.
    Failed(ScenarioFailure),
    /// Not sent because a dependency did not pass.
    Skipped {
        /// First dependency that did not pass.
        blocked_by: ScenarioId,
    },
}

impl ScenarioOutcome {
    /// Returns true for [`ScenarioOutcome::Passed`].
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    /// Returns the outcome label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed { .. } => "passed",
            Self::Failed(_) => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Result row for one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    /// Scenario identifier.
    pub id: ScenarioId,
    /// Scenario name.
    pub description: String,
    /// Scenario group.
    pub group: ScenarioGroup,
    /// Outcome.
    pub outcome: ScenarioOutcome,
}

/// Aggregated outcomes for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    /// Results in execution order.
    results: Vec<ScenarioResult>,
}

impl SuiteReport {
    /// Returns every result in execution order.
    #[must_use]
    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    /// Returns the outcome of scenario `id`.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&ScenarioOutcome> {
        self.results.iter().find(|result| result.id.as_str() == id).map(|result| &result.outcome)
    }

    /// Returns results belonging to `group`.
    pub fn by_group(&self, group: ScenarioGroup) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(move |result| result.group == group)
    }

    /// Returns failed scenarios with their failure.
    pub fn failures(&self) -> impl Iterator<Item = (&ScenarioId, &ScenarioFailure)> {
        self.results.iter().filter_map(|result| match &result.outcome {
            ScenarioOutcome::Failed(failure) => Some((&result.id, failure)),
            _ => None,
        })
    }

    /// Number of passed scenarios.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ScenarioOutcome::Passed { .. }))
    }

    /// Number of failed scenarios.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ScenarioOutcome::Failed(_)))
    }

    /// Number of skipped scenarios.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ScenarioOutcome::Skipped { .. }))
    }

    /// Returns true when every scenario passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|result| result.outcome.is_passed())
    }

    /// Builds a serializable summary.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total: self.results.len(),
            passed: self.passed(),
            failed: self.failed(),
            skipped: self.skipped(),
            scenarios: self
                .results
                .iter()
                .map(|result| {
                    let (status, detail) = match &result.outcome {
                        ScenarioOutcome::Passed {
                            status, ..
                        } => (Some(*status), None),
                        ScenarioOutcome::Failed(failure) => (
                            match failure {
                                ScenarioFailure::Contract(violation) => Some(violation.status),
                                _ => None,
                            },
                            Some(failure.to_string()),
                        ),
                        ScenarioOutcome::Skipped {
                            blocked_by,
                        } => (None, Some(format!("blocked by {blocked_by}"))),
                    };
                    ScenarioSummary {
                        id: result.id.clone(),
                        group: result.group,
                        outcome: result.outcome.label(),
                        status,
                        detail,
                    }
                })
                .collect(),
        }
    }

    /// Counts outcomes matching `predicate`.
    fn count(&self, predicate: impl Fn(&ScenarioOutcome) -> bool) -> usize {
        self.results.iter().filter(|result| predicate(&result.outcome)).count()
    }
}

/// Serializable run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Scenario count.
    pub total: usize,
    /// Passed count.
    pub passed: usize,
    /// Failed count.
    pub failed: usize,
    /// Skipped count.
    pub skipped: usize,
    /// Per-scenario rows.
    pub scenarios: Vec<ScenarioSummary>,
}

/// Serializable row for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSummary {
    /// Scenario identifier.
    pub id: ScenarioId,
    /// Scenario group.
    pub group: ScenarioGroup,
    /// `passed`, `failed`, or `skipped`.
    pub outcome: &'static str,
    /// Observed status, when known.
    pub status: Option<u16>,
    /// Failure or skip detail.
    pub detail: Option<String>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
