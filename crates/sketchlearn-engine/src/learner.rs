//! The counterexample-guided learning loop.
//!
//! Outer iterations rebuild the feature pool and the class space whenever
//! the training set changes. Inner iterations encode, solve, decode and
//! verify on the training set, strengthening the refinement constraints
//! after every rejected candidate. An accepted candidate is then checked
//! on every instance; the first failing one grows the training set.

use std::path::PathBuf;

use sketchlearn_ir::collaborators::{FeatureEvaluator, FeatureGenerator};
use sketchlearn_ir::feature::FeaturePool;
use sketchlearn_ir::instance::{InstanceData, InstanceId};
use sketchlearn_ir::refinement::{ModelExclusion, RefinementConstraintSet};
use sketchlearn_ir::sketch::Sketch;
use sketchlearn_smt::encoder::{ConstraintEncoder, EncodedInstance, EncodingInput};
use sketchlearn_smt::facts::{EncodingMode, FactSet};
use sketchlearn_smt::solver::{ConstraintSolver, SolveStatus, SolverModel};
use tracing::{debug, info};

use crate::decode::{decode, DecodedModel};
use crate::equivalence::{build_equivalences, EquivalenceData};
use crate::error::{LearnError, VerificationFailure};
use crate::features::{build_feature_pool, evaluate_features, FeatureData};
use crate::minimize::minimize_sketch;
use crate::options::LearnerOptions;
use crate::refinement::{initial_separations, unsatisfied_separations};
use crate::statistics::LearningStatistics;
use crate::timeout::Deadline;
use crate::verifier::SketchVerifier;

/// An accepted sketch and how it was found.
#[derive(Debug, Clone)]
pub struct LearningOutcome {
    pub sketch: Sketch,
    /// Equal to `sketch` when minimization is off or did not verify.
    pub minimized: Sketch,
    pub statistics: LearningStatistics,
    /// Pool of the final outer iteration; sketch feature ids index into it.
    pub pool: FeaturePool,
}

/// Data of one outer iteration.
struct Iteration<'i> {
    training: Vec<&'i InstanceData>,
    features: FeatureData,
    equivalences: EquivalenceData,
}

impl<'i> Iteration<'i> {
    fn encoded_instances(&self) -> Vec<EncodedInstance<'_>> {
        self.training
            .iter()
            .zip(&self.features.valuations)
            .zip(self.equivalences.state_pairs.iter().zip(&self.equivalences.tuple_graphs))
            .map(|((instance, valuations), (state_pairs, tuple_graphs))| EncodedInstance {
                instance: *instance,
                valuations,
                state_pairs,
                tuple_graphs,
            })
            .collect()
    }

    fn encode(&self, encoder: &ConstraintEncoder, refinement: &RefinementConstraintSet) -> FactSet {
        let instances = self.encoded_instances();
        encoder.encode(&EncodingInput {
            pool: &self.features.pool,
            classes: &self.equivalences.classes,
            instances: &instances,
            refinement,
        })
    }
}

pub struct RefinementLoop<'a, G: ?Sized, E: ?Sized, S> {
    generator: &'a G,
    evaluator: &'a E,
    solver: S,
    options: LearnerOptions,
    fact_dump_dir: Option<PathBuf>,
}

impl<'a, G, E, S> RefinementLoop<'a, G, E, S>
where
    G: FeatureGenerator + ?Sized,
    E: FeatureEvaluator + ?Sized,
    S: ConstraintSolver,
{
    pub fn new(generator: &'a G, evaluator: &'a E, solver: S, options: LearnerOptions) -> Self {
        Self {
            generator,
            evaluator,
            solver,
            options,
            fact_dump_dir: None,
        }
    }

    /// Write every fact set as `facts_<outer>_<inner>.lp` into `dir`.
    pub fn with_fact_dump(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fact_dump_dir = Some(dir.into());
        self
    }

    pub fn options(&self) -> &LearnerOptions {
        &self.options
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    fn verifier(&self) -> SketchVerifier {
        SketchVerifier::from_options(&self.options)
    }

    fn prepare_iteration<'i>(
        &self,
        instances: &'i [InstanceData],
        training: &[InstanceId],
    ) -> Result<Iteration<'i>, LearnError> {
        let training: Vec<&InstanceData> = training
            .iter()
            .filter_map(|id| instances.get(*id))
            .collect();
        let features = build_feature_pool(self.generator, self.evaluator, &training, &self.options)?;
        let equivalences = build_equivalences(&training, &features.valuations)?;
        Ok(Iteration {
            training,
            features,
            equivalences,
        })
    }

    fn seed_refinement(&self, equivalences: &EquivalenceData) -> RefinementConstraintSet {
        let mut refinement = RefinementConstraintSet::new();
        if self.options.encoding == EncodingMode::D2 {
            refinement.extend_separations(initial_separations(equivalences));
        }
        refinement
    }

    /// Fact set of the first inner iteration on the smallest instance.
    pub fn first_iteration_facts(&self, instances: &[InstanceData]) -> Result<FactSet, LearnError> {
        if instances.is_empty() {
            return Err(LearnError::NoInstances);
        }
        let iteration = self.prepare_iteration(instances, &[0])?;
        let refinement = self.seed_refinement(&iteration.equivalences);
        let encoder = ConstraintEncoder::new(self.options.encoding_options());
        Ok(iteration.encode(&encoder, &refinement))
    }

    /// Learn a sketch that solves every instance in `instances`, which must
    /// be ordered by size with `instances[i].id == i`.
    pub fn run(&mut self, instances: &[InstanceData]) -> Result<LearningOutcome, LearnError> {
        if instances.is_empty() {
            return Err(LearnError::NoInstances);
        }
        let deadline = Deadline::from_timeout_secs(self.options.timeout_secs);
        let encoder = ConstraintEncoder::new(self.options.encoding_options());
        let verifier = self.verifier();
        let mut statistics = LearningStatistics {
            num_training_instances: instances.len(),
            ..LearningStatistics::default()
        };
        let mut best: Option<Sketch> = None;
        let mut training: Vec<InstanceId> = vec![0];

        for outer in 0usize.. {
            if deadline.is_expired() {
                return Err(timeout(best));
            }
            let iteration = self.prepare_iteration(instances, &training)?;
            statistics.num_outer_iterations += 1;
            statistics.record_training(&iteration.training);
            statistics.num_features_in_pool = iteration.features.pool.len();
            statistics.num_equivalence_classes = iteration.equivalences.classes.len();
            info!(
                outer,
                training = ?training,
                features = iteration.features.pool.len(),
                classes = iteration.equivalences.classes.len(),
                "Starting outer iteration"
            );

            let mut refinement = self.seed_refinement(&iteration.equivalences);
            let mut inner = 0usize;
            let sketch = loop {
                if deadline.is_expired() {
                    return Err(timeout(best));
                }
                let facts = iteration.encode(&encoder, &refinement);
                self.dump_facts(&facts, outer, inner)?;
                let model = self.solve(&facts, &deadline, &best, &mut statistics)?;
                let decoded = decode(
                    &model,
                    &iteration.features.pool,
                    &iteration.equivalences.classes,
                    self.options.encoding,
                )?;
                let checks = iteration
                    .training
                    .iter()
                    .copied()
                    .zip(&iteration.features.valuations);
                let Some((instance, failure)) = verifier.first_failure(&decoded.sketch, checks)
                else {
                    break decoded.sketch;
                };
                debug!(
                    outer,
                    inner,
                    instance,
                    %failure,
                    rules = decoded.sketch.num_rules(),
                    "Candidate rejected on a training instance"
                );
                self.refine(&mut refinement, &iteration.equivalences, &decoded)?;
                inner += 1;
            };
            best = Some(sketch.clone());

            match self.first_failure_on(&sketch, instances, &iteration)? {
                None => {
                    let minimized = self.minimized(&sketch, instances, &iteration)?;
                    info!(
                        rules = sketch.num_rules(),
                        minimized_rules = minimized.num_rules(),
                        complexity = sketch.complexity(),
                        elapsed_ms = deadline.elapsed().as_millis() as u64,
                        "Sketch accepted"
                    );
                    info!("{statistics}");
                    return Ok(LearningOutcome {
                        sketch,
                        minimized,
                        statistics,
                        pool: iteration.features.pool,
                    });
                }
                Some((failed, failure)) => {
                    info!(
                        instance = %instances[failed].name,
                        %failure,
                        "Sketch fails on a held-out instance"
                    );
                    if training.iter().all(|t| failed > *t) {
                        training = vec![failed];
                    } else {
                        training.push(failed);
                        training.sort_unstable();
                        training.dedup();
                    }
                }
            }
        }
        // The outer loop only ends by returning.
        Err(timeout(best))
    }

    fn solve(
        &mut self,
        facts: &FactSet,
        deadline: &Deadline,
        best: &Option<Sketch>,
        statistics: &mut LearningStatistics,
    ) -> Result<SolverModel, LearnError> {
        self.solver
            .set_time_budget(deadline.clamp_call_budget(self.options.solver_timeout_secs));
        let outcome = self
            .solver
            .solve(facts)
            .map_err(|e| LearnError::Solver(e.to_string()))?;
        statistics.num_solver_calls += 1;
        info!(
            solver = self.solver.name(),
            status = %outcome.status,
            cost = ?outcome.model.as_ref().and_then(|m| m.cost),
            "Solver returned"
        );
        match outcome.status {
            SolveStatus::OptimalSat => outcome
                .model
                .ok_or_else(|| LearnError::Solver("optimal status without a model".into())),
            SolveStatus::Unsat | SolveStatus::Exhausted => Err(LearnError::NoSketchAtWidth {
                width: self.options.width,
            }),
            SolveStatus::Unknown(reason) => Err(LearnError::SolverInconclusive {
                status: SolveStatus::Unknown(reason.clone()),
                reason,
            }),
            SolveStatus::Interrupted if deadline.is_expired() => Err(timeout(best.clone())),
            SolveStatus::Interrupted => Err(LearnError::SolverInconclusive {
                status: SolveStatus::Interrupted,
                reason: "solver was interrupted".into(),
            }),
        }
    }

    /// Grow `refinement` so that the decoded assignment is ruled out.
    fn refine(
        &self,
        refinement: &mut RefinementConstraintSet,
        equivalences: &EquivalenceData,
        decoded: &DecodedModel,
    ) -> Result<(), LearnError> {
        let added = if self.options.encoding == EncodingMode::D2 {
            refinement.extend_separations(unsatisfied_separations(&equivalences.classes, decoded))
        } else {
            0
        };
        if added > 0 {
            debug!(added, total = refinement.separations().len(), "Added D2 separations");
            return Ok(());
        }
        let exclusion = ModelExclusion {
            selected: decoded.selected.clone(),
            good: decoded.good.clone(),
        };
        if !refinement.exclude(exclusion) {
            return Err(LearnError::Solver("solver repeated an excluded model".into()));
        }
        debug!(exclusions = refinement.exclusions().len(), "Excluded the decoded model");
        Ok(())
    }

    /// First instance, in size order, that `sketch` does not solve. Training
    /// instances reuse the valuations of the current iteration.
    fn first_failure_on(
        &self,
        sketch: &Sketch,
        instances: &[InstanceData],
        iteration: &Iteration<'_>,
    ) -> Result<Option<(InstanceId, VerificationFailure)>, LearnError> {
        let verifier = self.verifier();
        for (index, instance) in instances.iter().enumerate() {
            let trained = iteration
                .training
                .iter()
                .position(|t| std::ptr::eq(*t, instance))
                .and_then(|position| iteration.features.valuations.get(position));
            let result = match trained {
                Some(table) => verifier.solves(sketch, instance, table),
                None => {
                    let table = evaluate_features(
                        self.evaluator,
                        sketch.features().iter().map(|(id, feature)| (*id, feature)),
                        instance,
                    )?;
                    verifier.solves(sketch, instance, &table)
                }
            };
            if let Err(failure) = result {
                return Ok(Some((index, failure)));
            }
        }
        Ok(None)
    }

    fn minimized(
        &self,
        sketch: &Sketch,
        instances: &[InstanceData],
        iteration: &Iteration<'_>,
    ) -> Result<Sketch, LearnError> {
        if !self.options.minimize_sketch {
            return Ok(sketch.clone());
        }
        let candidate = minimize_sketch(sketch);
        if candidate == *sketch {
            return Ok(candidate);
        }
        match self.first_failure_on(&candidate, instances, iteration)? {
            None => Ok(candidate),
            Some((instance, failure)) => {
                debug!(instance, %failure, "Minimized sketch rejected; keeping the original");
                Ok(sketch.clone())
            }
        }
    }

    fn dump_facts(&self, facts: &FactSet, outer: usize, inner: usize) -> Result<(), LearnError> {
        let Some(dir) = &self.fact_dump_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("facts_{outer}_{inner}.lp"));
        std::fs::write(&path, facts.to_string())?;
        debug!(path = %path.display(), "Fact set written");
        Ok(())
    }
}

fn timeout(best: Option<Sketch>) -> LearnError {
    LearnError::Timeout {
        best: best.map(Box::new),
    }
}
