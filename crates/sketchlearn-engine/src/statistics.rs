use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use sketchlearn_ir::instance::InstanceData;

/// Counters of one learning run, reported on acceptance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearningStatistics {
    pub num_training_instances: usize,
    pub num_selected_training_instances: usize,
    pub num_states_in_selected_training_instances: usize,
    pub max_num_states_in_selected_training_instances: usize,
    pub num_features_in_pool: usize,
    pub num_equivalence_classes: usize,
    pub num_outer_iterations: usize,
    pub num_solver_calls: usize,
}

impl LearningStatistics {
    /// Record the training set of the latest outer iteration.
    pub fn record_training(&mut self, training: &[&InstanceData]) {
        self.num_selected_training_instances = training.len();
        self.num_states_in_selected_training_instances =
            training.iter().map(|instance| instance.num_states()).sum();
        self.max_num_states_in_selected_training_instances = training
            .iter()
            .map(|instance| instance.num_states())
            .max()
            .unwrap_or(0);
    }

    /// Human-readable rows, in reporting order.
    pub fn rows(&self) -> IndexMap<&'static str, usize> {
        IndexMap::from([
            ("Training instances", self.num_training_instances),
            ("Selected training instances", self.num_selected_training_instances),
            (
                "States in selected training instances",
                self.num_states_in_selected_training_instances,
            ),
            (
                "Max states in a selected training instance",
                self.max_num_states_in_selected_training_instances,
            ),
            ("Features in pool", self.num_features_in_pool),
            ("Equivalence classes", self.num_equivalence_classes),
            ("Outer iterations", self.num_outer_iterations),
            ("Solver calls", self.num_solver_calls),
        ])
    }
}

impl fmt::Display for LearningStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in self.rows() {
            writeln!(f, "{label}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_counter_in_order() {
        let stats = LearningStatistics {
            num_training_instances: 3,
            num_solver_calls: 7,
            ..LearningStatistics::default()
        };
        let text = stats.to_string();
        assert_eq!(text.lines().count(), 8);
        assert!(text.starts_with("Training instances: 3\n"));
        assert!(text.ends_with("Solver calls: 7\n"));
        let json = serde_json::to_value(&stats).expect("serializable");
        assert_eq!(json["num_solver_calls"], 7);
    }
}
