//! Solver-agnostic fact base produced by the constraint encoder.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use sketchlearn_ir::class_table::ClassId;
use sketchlearn_ir::feature::{FeatureId, FeatureKind};
use sketchlearn_ir::instance::{InstanceId, StateId, TupleId};
use sketchlearn_ir::valuation::{Condition, Effect};

/// How rules are represented in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingMode {
    /// Rules are the good classes; D2 pairs keep good and bad classes apart.
    #[default]
    D2,
    /// A bounded number of rule slots chosen directly by the solver.
    Explicit,
}

impl std::str::FromStr for EncodingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "d2" | "implicit" => Ok(EncodingMode::D2),
            "explicit" => Ok(EncodingMode::Explicit),
            other => Err(format!("unknown encoding `{other}` (expected d2 or explicit)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingOptions {
    pub mode: EncodingMode,
    /// Number of rule slots in explicit mode.
    pub max_num_rules: usize,
    pub goal_separation: bool,
    pub optimal_width: bool,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            mode: EncodingMode::D2,
            max_num_rules: 4,
            goal_separation: false,
            optimal_width: false,
        }
    }
}

/// A state of a training instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateRef {
    pub instance: InstanceId,
    pub state: StateId,
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.instance, self.state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    Feature {
        feature: FeatureId,
        complexity: u32,
        kind: FeatureKind,
    },
    State {
        state: StateRef,
        initial: bool,
        goal: bool,
        solvable: bool,
        alive: bool,
    },
    /// Boolean abstraction of a feature in a state: the value itself for
    /// Booleans, `> 0` for numericals.
    BooleanValue {
        state: StateRef,
        feature: FeatureId,
        value: bool,
    },
    Class {
        class: ClassId,
        conditions: Vec<(FeatureId, Condition)>,
        effects: Vec<(FeatureId, Effect)>,
    },
    Tuple {
        root: StateRef,
        tuple: TupleId,
        distance: usize,
        classes: Vec<ClassId>,
    },
    /// Smallest distance at which `class` is witnessed from `root`.
    ClassDistance {
        root: StateRef,
        class: ClassId,
        distance: usize,
    },
    /// `(root, target)` is a subgoal pair of class `class`.
    Subgoal {
        root: StateRef,
        target: StateRef,
        class: ClassId,
    },
    /// Smallest distance at which `class` reaches a dead end from `root`.
    DeadendDistance {
        root: StateRef,
        class: ClassId,
        distance: usize,
    },
    Separate {
        first: ClassId,
        second: ClassId,
    },
    Exclude {
        selected: Vec<FeatureId>,
        good: Vec<ClassId>,
    },
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::Feature {
                feature,
                complexity,
                kind,
            } => write!(f, "feature({feature}). complexity({feature},{complexity}). {kind}({feature})."),
            Fact::State {
                state,
                initial,
                goal,
                solvable,
                alive,
            } => {
                write!(f, "state({state}).")?;
                if *initial {
                    write!(f, " initial({state}).")?;
                }
                let solvable_tag = if *solvable { "solvable" } else { "unsolvable" };
                let goal_tag = if *goal { "goal" } else { "nongoal" };
                write!(f, " {solvable_tag}({state}). {goal_tag}({state}).")?;
                if *alive {
                    write!(f, " alive({state}).")?;
                }
                Ok(())
            }
            Fact::BooleanValue {
                state,
                feature,
                value,
            } => write!(f, "b_value({state},{feature},{}).", u8::from(*value)),
            Fact::Class {
                class,
                conditions,
                effects,
            } => {
                write!(f, "class({class}).")?;
                for (feature, condition) in conditions {
                    write!(f, " feature_condition({class},{feature},\"{}\").", condition.tag())?;
                }
                for (feature, effect) in effects {
                    write!(f, " feature_effect({class},{feature},\"{}\").", effect.tag())?;
                }
                Ok(())
            }
            Fact::Tuple {
                root,
                tuple,
                distance,
                classes,
            } => {
                write!(f, "tuple({root},{tuple}). t_distance({root},{tuple},{distance}).")?;
                for class in classes {
                    write!(f, " contain({root},{tuple},{class}).")?;
                }
                Ok(())
            }
            Fact::ClassDistance {
                root,
                class,
                distance,
            } => write!(f, "r_distance({root},{class},{distance})."),
            Fact::Subgoal {
                root,
                target,
                class,
            } => write!(f, "subgoal({root},{},{class}).", target.state),
            Fact::DeadendDistance {
                root,
                class,
                distance,
            } => write!(f, "d_distance({root},{class},{distance})."),
            Fact::Separate { first, second } => write!(f, "d2_separate({first},{second})."),
            Fact::Exclude { selected, good } => {
                let join = |ids: &[usize]| {
                    ids.iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(";")
                };
                write!(f, "exclude(({}),({})).", join(selected), join(good))
            }
        }
    }
}

/// Flat fact base plus the encoding options it was built for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    options: EncodingOptions,
    facts: Vec<Fact>,
}

impl FactSet {
    pub fn new(options: EncodingOptions) -> Self {
        Self {
            options,
            facts: Vec::new(),
        }
    }

    pub fn push(&mut self, fact: Fact) {
        self.facts.push(fact);
    }

    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// `(feature, complexity, kind)` of every feature fact, ascending by id.
    pub fn features(&self) -> BTreeMap<FeatureId, (u32, FeatureKind)> {
        self.facts
            .iter()
            .filter_map(|fact| match fact {
                Fact::Feature {
                    feature,
                    complexity,
                    kind,
                } => Some((*feature, (*complexity, *kind))),
                _ => None,
            })
            .collect()
    }

    pub fn class_ids(&self) -> BTreeSet<ClassId> {
        self.facts
            .iter()
            .filter_map(|fact| match fact {
                Fact::Class { class, .. } => Some(*class),
                _ => None,
            })
            .collect()
    }

    /// Total complexity of `selected`, counting only features present here.
    pub fn cost_of(&self, selected: &BTreeSet<FeatureId>) -> i64 {
        self.features()
            .iter()
            .filter(|(id, _)| selected.contains(id))
            .map(|(_, (complexity, _))| i64::from(*complexity))
            .sum()
    }

    pub fn count_matching(&self, predicate: impl Fn(&Fact) -> bool) -> usize {
        self.facts.iter().filter(|fact| predicate(fact)).count()
    }
}

impl fmt::Display for FactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "% mode: {:?}", self.options.mode)?;
        for fact in &self.facts {
            writeln!(f, "{fact}")?;
        }
        Ok(())
    }
}
