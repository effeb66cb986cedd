//! Instance preparation: state spaces, rejection, ordering, tuple graphs.
//!
//! Every alive state of a kept instance has a tuple graph.

use std::collections::BTreeMap;

use sketchlearn_ir::collaborators::{InstanceRejection, StateSpaceProvider, TupleGraphProvider};
use sketchlearn_ir::instance::{InstanceData, StateId, StateSpace};
use tracing::{info, warn};

use crate::options::LearnerOptions;

/// An instance dropped during preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedInstance {
    pub name: String,
    pub reason: InstanceRejection,
}

#[derive(Debug, Clone, Default)]
pub struct PreparedInstances {
    /// Ascending by state count; `instances[i].id == i`.
    pub instances: Vec<InstanceData>,
    pub rejected: Vec<RejectedInstance>,
}

/// Build every instance through the collaborators and drop the ones that
/// cannot take part in learning.
pub fn prepare_instances<P>(
    provider: &P,
    descriptions: &[P::Description],
    options: &LearnerOptions,
) -> PreparedInstances
where
    P: StateSpaceProvider + TupleGraphProvider<P::Description>,
{
    let mut prepared = PreparedInstances::default();
    for description in descriptions {
        let name = provider.instance_name(description);
        let checked = provider
            .state_space(description)
            .and_then(|space| screen(space, options));
        let space = match checked {
            Ok(space) => space,
            Err(reason) => {
                warn!(instance = %name, %reason, "Dropping instance");
                prepared.rejected.push(RejectedInstance { name, reason });
                continue;
            }
        };

        let tuple_graphs: Result<BTreeMap<StateId, _>, _> = space
            .alive_states()
            .map(|state| {
                provider
                    .tuple_graph(description, &space, state, options.width)
                    .map(|graph| (state, graph))
                    .ok_or(InstanceRejection::MissingTupleGraph { state })
            })
            .collect();
        let tuple_graphs = match tuple_graphs {
            Ok(graphs) => graphs,
            Err(reason) => {
                warn!(instance = %name, %reason, "Dropping instance");
                prepared.rejected.push(RejectedInstance { name, reason });
                continue;
            }
        };
        let roots = verification_roots(&space, options.closed_q);
        prepared.instances.push(InstanceData {
            id: 0,
            name,
            state_space: space,
            tuple_graphs,
            roots,
        });
    }

    prepared.instances.sort_by_key(InstanceData::num_states);
    for (id, instance) in prepared.instances.iter_mut().enumerate() {
        instance.id = id;
    }
    info!(
        kept = prepared.instances.len(),
        rejected = prepared.rejected.len(),
        "Prepared instances"
    );
    prepared
}

fn screen(space: StateSpace, options: &LearnerOptions) -> Result<StateSpace, InstanceRejection> {
    if space.num_states() > options.max_num_states_per_instance {
        return Err(InstanceRejection::ExceededStateLimit {
            num_states: space.num_states(),
            limit: options.max_num_states_per_instance,
        });
    }
    let initial_dead = if space.initial_states().is_empty() {
        space.goal_states().is_empty()
    } else {
        space.initial_states().iter().all(|s| space.is_deadend(*s))
    };
    if initial_dead {
        return Err(InstanceRejection::Unsolvable);
    }
    if verification_roots(&space, options.closed_q)
        .iter()
        .all(|s| !space.is_alive(*s))
    {
        return Err(InstanceRejection::TriviallySolvable);
    }
    Ok(space)
}

/// All alive states, or the initial states when `closed_q` is off and the
/// instance names any.
fn verification_roots(space: &StateSpace, closed_q: bool) -> Vec<StateId> {
    if closed_q || space.initial_states().is_empty() {
        space.alive_states().collect()
    } else {
        space.initial_states().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use sketchlearn_ir::instance::TupleGraph;
    use sketchlearn_ir::problem::ProblemClass;

    use super::*;

    /// `(num_states, initial, goals, transitions)` per instance.
    struct Spaces(Vec<(&'static str, usize, Vec<StateId>, Vec<StateId>, Vec<(StateId, StateId)>)>);

    impl StateSpaceProvider for Spaces {
        type Description = usize;

        fn instance_name(&self, description: &usize) -> String {
            self.0[*description].0.to_string()
        }

        fn state_space(&self, description: &usize) -> Result<StateSpace, InstanceRejection> {
            let (_, n, initial, goals, transitions) = &self.0[*description];
            StateSpace::new(*n, initial.clone(), goals.iter().copied(), transitions)
                .map_err(|_| InstanceRejection::Unsolvable)
        }
    }

    impl TupleGraphProvider<usize> for Spaces {
        fn tuple_graph(
            &self,
            _description: &usize,
            space: &StateSpace,
            root: StateId,
            _width: usize,
        ) -> Option<TupleGraph> {
            let successors = space.successors(root).iter().map(|s| vec![*s]).collect();
            Some(TupleGraph::new(root, vec![vec![vec![root]], successors]))
        }
    }

    fn spaces() -> Spaces {
        Spaces(vec![
            ("long", 4, vec![0], vec![3], vec![(0, 1), (1, 2), (2, 3)]),
            ("dead", 2, vec![0], vec![], vec![(0, 1)]),
            ("short", 2, vec![0], vec![1], vec![(0, 1)]),
            ("done", 1, vec![0], vec![0], vec![]),
            ("large", 20, vec![0], vec![19], vec![(0, 19)]),
        ])
    }

    #[test]
    fn instances_are_screened_sorted_and_renumbered() {
        let options = LearnerOptions {
            max_num_states_per_instance: 10,
            ..LearnerOptions::default()
        };
        let prepared = prepare_instances(&spaces(), &[0, 1, 2, 3, 4], &options);
        let names: Vec<&str> = prepared.instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["short", "long"]);
        assert_eq!(prepared.instances[1].id, 1);
        let reasons: Vec<&InstanceRejection> =
            prepared.rejected.iter().map(|r| &r.reason).collect();
        assert_eq!(
            reasons,
            [
                &InstanceRejection::Unsolvable,
                &InstanceRejection::TriviallySolvable,
                &InstanceRejection::ExceededStateLimit {
                    num_states: 20,
                    limit: 10
                },
            ]
        );
    }

    #[test]
    fn tuple_graphs_cover_alive_states_only() {
        let prepared = prepare_instances(&spaces(), &[0], &LearnerOptions::default());
        let long = &prepared.instances[0];
        assert_eq!(long.tuple_graphs.keys().copied().collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(long.roots, [0, 1, 2]);
    }

    #[test]
    fn alive_state_without_tuple_graph_rejects_the_instance() {
        let problem = ProblemClass::from_json(
            r#"{
                "schema_version": 1,
                "features": [{"repr": "n", "kind": "numerical", "complexity": 1}],
                "instances": [{
                    "name": "gap",
                    "num_states": 3,
                    "initial": [0],
                    "goals": [2],
                    "transitions": [[0, 1], [1, 2]],
                    "tuple_graphs": [{"root": 0, "layers": [[[0]], [[1]]]}],
                    "valuations": {"n": [2, 1, 0]}
                }]
            }"#,
        )
        .expect("valid problem");
        let prepared = prepare_instances(&problem, &problem.instances, &LearnerOptions::default());
        assert!(prepared.instances.is_empty());
        assert_eq!(
            prepared.rejected,
            [RejectedInstance {
                name: "gap".into(),
                reason: InstanceRejection::MissingTupleGraph { state: 1 },
            }]
        );
        assert_eq!(
            prepared.rejected[0].reason.to_string(),
            "alive state 1 has no tuple graph"
        );
    }

    #[test]
    fn open_q_verifies_from_initial_states() {
        let options = LearnerOptions {
            closed_q: false,
            ..LearnerOptions::default()
        };
        let prepared = prepare_instances(&spaces(), &[0], &options);
        assert_eq!(prepared.instances[0].roots, [0]);
    }
}
