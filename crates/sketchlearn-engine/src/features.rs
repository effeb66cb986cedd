//! Feature-pool construction and valuation tables.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use sketchlearn_ir::collaborators::{FeatureEvaluator, FeatureGenerator};
use sketchlearn_ir::feature::{Feature, FeatureId, FeatureKind, FeaturePool, FeatureValue, INFINITE_VALUE};
use sketchlearn_ir::instance::InstanceData;
use sketchlearn_ir::valuation::ValuationTable;
use sketchlearn_ir::IrError;
use tracing::debug;

use crate::options::LearnerOptions;

/// Pool of one outer iteration plus the valuations of every training instance.
#[derive(Debug, Clone, Default)]
pub struct FeatureData {
    pub pool: FeaturePool,
    /// Parallel to the training instances the pool was built on.
    pub valuations: Vec<ValuationTable>,
}

/// Generator complexity plus the cost of using a feature in a rule.
fn biased(mut feature: Feature) -> Feature {
    feature.complexity += match feature.kind {
        FeatureKind::Numerical => 1,
        FeatureKind::Boolean => 2,
    };
    feature
}

pub fn build_feature_pool<G, E>(
    generator: &G,
    evaluator: &E,
    training: &[&InstanceData],
    options: &LearnerOptions,
) -> Result<FeatureData, IrError>
where
    G: FeatureGenerator + ?Sized,
    E: FeatureEvaluator + ?Sized,
{
    let candidates: Vec<Feature> = generator
        .generate(training, &options.feature_limits)?
        .into_iter()
        .map(biased)
        .collect();
    // columns[c][i]: values of candidate c on training instance i.
    let columns = candidates
        .iter()
        .map(|feature| {
            training
                .iter()
                .map(|instance| {
                    let values = evaluator.evaluate(feature, instance)?;
                    if values.len() != instance.num_states() {
                        return Err(IrError::ValuationLength {
                            repr: feature.repr.clone(),
                            instance: instance.name.clone(),
                            found: values.len(),
                            expected: instance.num_states(),
                        });
                    }
                    Ok(values)
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let kept: Vec<usize> = if options.prune_features {
        prune(&candidates, &columns, training)
    } else {
        (0..candidates.len()).collect()
    };

    let mut data = FeatureData {
        pool: FeaturePool::new(),
        valuations: training
            .iter()
            .map(|instance| ValuationTable::new(instance.num_states()))
            .collect(),
    };
    for index in kept {
        let id = data.pool.insert(candidates[index].clone());
        if data.valuations.first().is_some_and(|table| table.contains(id)) {
            continue;
        }
        for (table, column) in data.valuations.iter_mut().zip(&columns[index]) {
            table.insert_column(id, column.clone())?;
        }
    }
    debug!(
        generated = candidates.len(),
        kept = data.pool.len(),
        "Built feature pool"
    );
    Ok(data)
}

/// Valuations of `features` on one instance, keyed by their pool ids.
pub fn evaluate_features<'a, E>(
    evaluator: &E,
    features: impl IntoIterator<Item = (FeatureId, &'a Feature)>,
    instance: &InstanceData,
) -> Result<ValuationTable, IrError>
where
    E: FeatureEvaluator + ?Sized,
{
    let mut table = ValuationTable::new(instance.num_states());
    for (id, feature) in features {
        table.insert_column(id, evaluator.evaluate(feature, instance)?)?;
    }
    Ok(table)
}

/// Indices of the candidates that survive, in generation order.
fn prune(
    candidates: &[Feature],
    columns: &[Vec<Vec<FeatureValue>>],
    training: &[&InstanceData],
) -> Vec<usize> {
    let reaches_zero = |c: usize| {
        columns[c]
            .iter()
            .any(|values| values.iter().any(|v| v.is_zero()))
    };
    let changes_softly = |c: usize| {
        candidates[c].kind == FeatureKind::Boolean
            || training.iter().zip(&columns[c]).all(|(instance, values)| {
                let space = &instance.state_space;
                space.states().all(|s| {
                    space.successors(s).iter().all(|t| {
                        let (source, target) = (values[s].as_i64(), values[*t].as_i64());
                        is_border(source) || is_border(target) || source.abs_diff(target) <= 1
                    })
                })
            })
    };
    let survivors: Vec<usize> = (0..candidates.len())
        .filter(|c| reaches_zero(*c))
        .filter(|c| changes_softly(*c))
        .collect();

    // Change vector -> cheapest candidate showing it.
    let mut by_changes: BTreeMap<Vec<Ordering>, usize> = BTreeMap::new();
    for c in survivors {
        let changes = change_vector(&columns[c], training);
        match by_changes.get_mut(&changes) {
            Some(best) if candidates[*best].complexity <= candidates[c].complexity => {}
            Some(best) => *best = c,
            None => {
                by_changes.insert(changes, c);
            }
        }
    }
    let mut kept: Vec<usize> = by_changes.into_values().collect();
    kept.sort_unstable();
    kept
}

fn is_border(value: i64) -> bool {
    value == 0 || value == INFINITE_VALUE
}

/// Direction of change from every non-dead-end root to every state of its
/// tuple graph, over all training instances.
fn change_vector(columns: &[Vec<FeatureValue>], training: &[&InstanceData]) -> Vec<Ordering> {
    let mut changes = Vec::new();
    for (instance, values) in training.iter().zip(columns) {
        for (root, graph) in &instance.tuple_graphs {
            if instance.state_space.is_deadend(*root) {
                continue;
            }
            let Some(source) = values.get(*root) else {
                continue;
            };
            for distance in 0..graph.num_layers() {
                changes.extend(
                    graph
                        .states_at(distance)
                        .into_iter()
                        .filter_map(|target| values.get(target))
                        .map(|target| source.as_i64().cmp(&target.as_i64())),
                );
            }
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use sketchlearn_ir::collaborators::FixedFeatures;
    use sketchlearn_ir::instance::{StateSpace, TupleGraph};

    use super::*;

    /// Values looked up by repr.
    struct Table(BTreeMap<&'static str, Vec<FeatureValue>>);

    impl FeatureEvaluator for Table {
        fn evaluate(
            &self,
            feature: &Feature,
            instance: &InstanceData,
        ) -> Result<Vec<FeatureValue>, IrError> {
            self.0
                .get(feature.repr.as_str())
                .cloned()
                .ok_or_else(|| IrError::UnknownFeature {
                    repr: feature.repr.clone(),
                    instance: instance.name.clone(),
                })
        }
    }

    fn num(values: &[i64]) -> Vec<FeatureValue> {
        values.iter().map(|v| FeatureValue::Numerical(*v)).collect()
    }

    fn boolean(values: &[bool]) -> Vec<FeatureValue> {
        values.iter().map(|v| FeatureValue::Boolean(*v)).collect()
    }

    /// Chain 0 -> 1 -> 2 -> 3 with goal 3.
    fn chain() -> InstanceData {
        let space =
            StateSpace::new(4, vec![0], [3], &[(0, 1), (1, 2), (2, 3)]).expect("valid space");
        let tuple_graphs = (0..3)
            .map(|s| (s, TupleGraph::new(s, vec![vec![vec![s]], vec![vec![s + 1]]])))
            .collect();
        InstanceData {
            id: 0,
            name: "chain".into(),
            state_space: space,
            tuple_graphs,
            roots: vec![0, 1, 2],
        }
    }

    fn generator() -> FixedFeatures {
        FixedFeatures(vec![
            Feature::numerical("dist", 3),
            Feature::numerical("dist-copy", 1),
            Feature::boolean("never-false", 1),
            Feature::numerical("jumpy", 1),
            Feature::boolean("at-end", 2),
        ])
    }

    fn evaluator() -> Table {
        Table(BTreeMap::from([
            ("dist", num(&[3, 2, 1, 0])),
            ("dist-copy", num(&[3, 2, 1, 0])),
            ("never-false", boolean(&[true, true, true, true])),
            ("jumpy", num(&[6, 3, 1, 0])),
            ("at-end", boolean(&[false, false, false, true])),
        ]))
    }

    #[test]
    fn pruning_drops_constant_jumpy_and_duplicate_features() {
        let instance = chain();
        let data = build_feature_pool(
            &generator(),
            &evaluator(),
            &[&instance],
            &LearnerOptions::default(),
        )
        .expect("pool");
        let reprs: Vec<(&str, u32)> = data
            .pool
            .iter()
            .map(|(_, f)| (f.repr.as_str(), f.complexity))
            .collect();
        // `dist-copy` wins over `dist` by complexity and keeps its position.
        assert_eq!(reprs, [("dist-copy", 2), ("at-end", 4)]);
        assert_eq!(data.valuations.len(), 1);
        assert_eq!(
            data.valuations[0].value(0, 1),
            Some(FeatureValue::Numerical(2))
        );
    }

    #[test]
    fn disabling_pruning_keeps_every_candidate() {
        let instance = chain();
        let options = LearnerOptions {
            prune_features: false,
            ..LearnerOptions::default()
        };
        let data =
            build_feature_pool(&generator(), &evaluator(), &[&instance], &options).expect("pool");
        assert_eq!(data.pool.len(), 5);
        assert_eq!(data.pool.get(0).map(|f| f.complexity), Some(4));
    }

    #[test]
    fn border_values_may_jump() {
        assert!(is_border(0));
        assert!(is_border(INFINITE_VALUE));
        assert!(!is_border(1));
    }

    #[test]
    fn evaluation_errors_propagate() {
        let instance = chain();
        let generator = FixedFeatures(vec![Feature::boolean("unknown", 1)]);
        let result = build_feature_pool(
            &generator,
            &evaluator(),
            &[&instance],
            &LearnerOptions::default(),
        );
        assert!(matches!(result, Err(IrError::UnknownFeature { .. })));
    }
}
