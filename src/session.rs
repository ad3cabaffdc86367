//! Operator session: mode, compound list, the run confirmation protocol and the
//! in-memory experiment log.
//!
//! A run goes through three stages. [`Session::request_run`] validates the
//! operator fields and returns either a [`PendingRun`] carrying the first
//! advisory that needs a yes/no answer, or an [`ApprovedRun`] when nothing
//! needs confirming. Accepting every advisory turns a pending run into an
//! approved one; declining drops it. Starting consumes the approval and yields
//! an [`ExperimentRun`]. [`Session::record`] only accepts that run once it has
//! produced every reading, then reconciles the snapshot and appends the record.
//!
//! Requesting and confirming only borrow the session, so a declined run cannot
//! have touched the compound list, the mapping or the log.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::additives::{parse_concentration, total_percentage, Canonical, CompoundSelection};
use crate::config::{ControllerConfig, UnrecognizedPolicy};
use crate::error::{MixerError, Result};
use crate::reconcile::{reconcile, AdditiveMap, UnrecognizedCompound};
use crate::run::{CancelToken, Reading, SimulatedRun};

/// Compounds summing above the declared total by more than this raise an advisory.
pub const EXCEED_TOLERANCE: f64 = 1e-9;
/// Allowed drift of the declared total from the recommended value.
pub const TOTAL_TOLERANCE: f64 = 0.001;
/// Allowed drift of the compound sum from the recommended value.
pub const COMPOUND_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    Manual,
    #[default]
    Automatic,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Manual => write!(f, "Manual"),
            Mode::Automatic => write!(f, "Automatic"),
        }
    }
}

/// A non-blocking inconsistency the operator has to acknowledge before a
/// manual run goes ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Advisory {
    CompoundsExceedTotal { compound_sum: f64, declared_total: f64 },
    TotalOffTarget { declared_total: f64, recommended: f64 },
    CompoundSumOffTarget { compound_sum: f64, recommended: f64 },
}

impl Advisory {
    pub fn title(&self) -> &'static str {
        match self {
            Advisory::CompoundsExceedTotal { .. } => "Compounds Exceed Entered Total",
            Advisory::TotalOffTarget { .. } => "Confirm Total Concentration",
            Advisory::CompoundSumOffTarget { .. } => "Confirm Compound Percentages",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Advisory::CompoundsExceedTotal { compound_sum, declared_total } => format!(
                "The sum of your selected compounds is {:.2}%, which exceeds the total additive \
                 concentration you entered ({:.2}%). Clearing or correcting the compound list is \
                 recommended. Continue anyway?",
                compound_sum, declared_total
            ),
            Advisory::TotalOffTarget { declared_total, recommended } => format!(
                "You entered {:.2}% as the total additive concentration. The recommended value is \
                 {:.0}%. Proceed?",
                declared_total, recommended
            ),
            Advisory::CompoundSumOffTarget { compound_sum, recommended } => format!(
                "The sum of individual compound percentages is {:.2}%. A total of {:.0}% is \
                 suggested. Proceed?",
                compound_sum, recommended
            ),
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title(), self.message())
    }
}

/// Advisories for a manual run, in the order they are asked.
pub fn advisories(compound_sum: f64, declared_total: f64, recommended: f64) -> Vec<Advisory> {
    let mut out = Vec::new();
    if compound_sum > declared_total + EXCEED_TOLERANCE {
        out.push(Advisory::CompoundsExceedTotal { compound_sum, declared_total });
    }
    if (declared_total - recommended).abs() > TOTAL_TOLERANCE {
        out.push(Advisory::TotalOffTarget { declared_total, recommended });
    }
    if (compound_sum - recommended).abs() > COMPOUND_SUM_TOLERANCE {
        out.push(Advisory::CompoundSumOffTarget { compound_sum, recommended });
    }
    out
}

pub fn parse_iterations(input: &str) -> Result<u32> {
    match input.trim().parse::<u32>() {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(MixerError::InvalidIterations(input.to_string())),
    }
}

/// Blank means 0 in automatic mode; manual mode needs an explicit number.
pub fn parse_declared_total(mode: Mode, input: &str) -> Result<f64> {
    let t = input.trim().trim_end_matches('%').trim();
    if t.is_empty() && mode == Mode::Automatic {
        return Ok(0.0);
    }
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(MixerError::InvalidTotal(input.to_string())),
    }
}

/// Everything a run needs, frozen at request time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    pub mode: Mode,
    pub iterations: u32,
    pub declared_total: f64,
    pub selections: Vec<CompoundSelection>,
    pub total_volume_ml: f64,
}

pub enum RunStep {
    Confirm(PendingRun),
    Ready(ApprovedRun),
}

/// A run waiting on the operator's answer to [`PendingRun::advisory`].
#[derive(Debug)]
pub struct PendingRun {
    plan: RunPlan,
    advisories: Vec<Advisory>,
    next: usize,
}

impl PendingRun {
    pub fn advisory(&self) -> &Advisory {
        &self.advisories[self.next]
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Advisories still to be answered, the current one included.
    pub fn remaining(&self) -> usize {
        self.advisories.len() - self.next
    }

    pub fn accept(mut self) -> RunStep {
        debug!(advisory = self.advisory().title(), "advisory accepted");
        self.next += 1;
        if self.next < self.advisories.len() {
            RunStep::Confirm(self)
        } else {
            RunStep::Ready(ApprovedRun {
                plan: self.plan,
                acknowledged: self.advisories,
            })
        }
    }

    pub fn decline(self) {
        info!(advisory = self.advisory().title(), "run aborted by operator");
    }
}

#[derive(Debug)]
pub struct ApprovedRun {
    plan: RunPlan,
    acknowledged: Vec<Advisory>,
}

impl ApprovedRun {
    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn acknowledged(&self) -> &[Advisory] {
        &self.acknowledged
    }

    pub fn start<R: Rng>(self, rng: R, cancel: CancelToken) -> ExperimentRun<R> {
        let run = SimulatedRun::new(rng, self.plan.iterations, cancel);
        ExperimentRun {
            readings: Vec::with_capacity(self.plan.iterations as usize),
            approved: self,
            run,
        }
    }
}

/// An approved run in progress. Keeps every reading it hands out.
pub struct ExperimentRun<R> {
    approved: ApprovedRun,
    run: SimulatedRun<R>,
    readings: Vec<Reading>,
}

impl<R: Rng> ExperimentRun<R> {
    pub fn plan(&self) -> &RunPlan {
        self.approved.plan()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn completed(&self) -> u32 {
        self.run.completed()
    }

    pub fn progress(&self) -> f32 {
        self.run.progress()
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.run.is_finished()
    }
}

impl<R: Rng> Iterator for ExperimentRun<R> {
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        let reading = self.run.next()?;
        self.readings.push(reading.clone());
        Some(reading)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub sequence: u32,
    pub mode: Mode,
    pub iterations: u32,
    pub declared_total: f64,
    pub selections: Vec<CompoundSelection>,
    pub additives: AdditiveMap,
    pub unrecognized: Vec<UnrecognizedCompound>,
    /// Advisories the operator overrode to get this run going.
    pub advisories: Vec<Advisory>,
    pub readings: Vec<Reading>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExperimentRecord {
    pub fn compound_total(&self) -> f64 {
        total_percentage(&self.selections)
    }

    pub fn mean_conductivity(&self) -> Option<f64> {
        if self.readings.is_empty() {
            return None;
        }
        Some(self.readings.iter().map(|r| r.conductivity).sum::<f64>() / self.readings.len() as f64)
    }
}

pub struct Session {
    config: ControllerConfig,
    mode: Mode,
    selections: Vec<CompoundSelection>,
    additives: AdditiveMap,
    experiment_count: u32,
    log: Vec<ExperimentRecord>,
}

impl Session {
    pub fn new(config: ControllerConfig) -> Self {
        let additives = AdditiveMap::idle(config.total_volume_ml);
        Session {
            config,
            mode: Mode::default(),
            selections: Vec::new(),
            additives,
            experiment_count: 0,
            log: Vec::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        info!(%mode, "mode set");
        self.mode = mode;
    }

    pub fn selections(&self) -> &[CompoundSelection] {
        &self.selections
    }

    /// Mapping produced by the latest run.
    pub fn additives(&self) -> &AdditiveMap {
        &self.additives
    }

    pub fn log(&self) -> &[ExperimentRecord] {
        &self.log
    }

    pub fn experiment_count(&self) -> u32 {
        self.experiment_count
    }

    pub fn compound_total(&self) -> f64 {
        total_percentage(&self.selections)
    }

    pub fn add_compound(&mut self, name: &str, percentage: f64) -> Result<&CompoundSelection> {
        let selection = CompoundSelection::new(name, percentage)?;
        if let Canonical::Unrecognized(key) = selection.canonical() {
            match self.config.unrecognized {
                UnrecognizedPolicy::Reject => {
                    return Err(MixerError::UnrecognizedCompound {
                        name: selection.name().to_string(),
                        key,
                    });
                }
                UnrecognizedPolicy::Warn => {
                    warn!(name = selection.name(), %key, "compound has no additive slot and will not be dispensed");
                }
                UnrecognizedPolicy::Ignore => {}
            }
        }
        info!(compound = selection.name(), percentage = selection.percentage(), "compound added");
        self.selections.push(selection);
        Ok(&self.selections[self.selections.len() - 1])
    }

    /// Adds a compound from the raw concentration field.
    pub fn add_compound_text(&mut self, name: &str, concentration: &str) -> Result<&CompoundSelection> {
        let percentage = parse_concentration(concentration)?;
        self.add_compound(name, percentage)
    }

    /// Automatic mode lists compounds without a concentration.
    pub fn add_automatic(&mut self, name: &str) -> Result<&CompoundSelection> {
        self.add_compound(name, 0.0)
    }

    pub fn clear_compounds(&mut self) {
        info!(cleared = self.selections.len(), "compound list cleared");
        self.selections.clear();
    }

    /// Multiplies every listed concentration by `factor`.
    pub fn scale_concentrations(&mut self, factor: f64) -> Result<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(MixerError::InvalidScale(factor));
        }
        self.selections = self.selections.iter().map(|s| s.scaled(factor)).collect();
        Ok(())
    }

    pub fn request_run(&self, iterations: &str, declared_total: &str) -> Result<RunStep> {
        let iterations = parse_iterations(iterations)?;
        let declared_total = parse_declared_total(self.mode, declared_total)?;

        let plan = RunPlan {
            mode: self.mode,
            iterations,
            declared_total,
            selections: self.selections.clone(),
            total_volume_ml: self.config.total_volume_ml,
        };

        let pending = match self.mode {
            Mode::Manual => advisories(self.compound_total(), declared_total, self.config.recommended_total),
            Mode::Automatic => Vec::new(),
        };

        info!(iterations, declared_total, mode = %self.mode, advisories = pending.len(), "run requested");
        if pending.is_empty() {
            Ok(RunStep::Ready(ApprovedRun {
                plan,
                acknowledged: Vec::new(),
            }))
        } else {
            Ok(RunStep::Confirm(PendingRun {
                plan,
                advisories: pending,
                next: 0,
            }))
        }
    }

    /// Reconciles a finished run and appends it to the log.
    ///
    /// The session's mapping is replaced wholesale by the new one. A run that
    /// was cancelled or has readings left is refused and changes nothing.
    pub fn record<R: Rng>(&mut self, run: ExperimentRun<R>) -> Result<&ExperimentRecord> {
        if !run.is_finished() {
            return Err(MixerError::RunIncomplete {
                completed: run.completed(),
                iterations: run.plan().iterations,
            });
        }
        let ExperimentRun { approved, readings, .. } = run;
        let ApprovedRun { plan, acknowledged } = approved;
        let finished_at = Utc::now();
        let started_at = readings.first().map(|r| r.taken_at).unwrap_or(finished_at);

        let result = reconcile(&plan.selections, plan.declared_total, plan.total_volume_ml);
        let unrecognized = match self.config.unrecognized {
            UnrecognizedPolicy::Ignore => Vec::new(),
            _ => result.unrecognized,
        };
        for u in &unrecognized {
            warn!(key = %u.key, percentage = u.percentage, "dropped from additive mapping");
        }
        debug!(used = result.additives.used().count(), "additives reconciled");

        self.experiment_count += 1;
        self.additives = result.additives.clone();
        self.log.push(ExperimentRecord {
            sequence: self.experiment_count,
            mode: plan.mode,
            iterations: plan.iterations,
            declared_total: plan.declared_total,
            selections: plan.selections,
            additives: result.additives,
            unrecognized,
            advisories: acknowledged,
            readings,
            started_at,
            finished_at,
        });
        info!(experiment = self.experiment_count, "experiment recorded");
        Ok(&self.log[self.log.len() - 1])
    }
}
