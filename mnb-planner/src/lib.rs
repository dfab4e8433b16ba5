//! Orders the actions of a [`mnb_spec::Spec`] so that every consumer of a value follows the
//! action that produces it.
//!
//! The planner makes two passes over the action list (collect producers, then build
//! dependency edges) and finishes with a topological sort (Kahn's algorithm). Cross-action
//! invariants that only the planner can see -- duplicate image producers, a missing image
//! producer, duplicate value producers -- are enforced here; see [`mnb_spec::codec`] for
//! shape validation scoped to a single action, and `mnb-executor` for validation scoped to a
//! single [`mnb_spec::Exec`]'s own inputs/outputs.

pub mod error;

use mnb_spec::{Action, Spec, Value, ValueKind};
use std::collections::{HashMap, VecDeque};

pub use error::{Error, Result};

/// A value's identity for the purposes of producer/consumer bookkeeping.
///
/// `Image` values are keyed directly by their `image_name` string; `File`/`Dir` values are
/// keyed by kind and path, since a `File` and a `Dir` at the same path are distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    File(String),
    Dir(String),
}

impl ValueKey {
    fn of(value: &Value) -> Self {
        match value.kind() {
            ValueKind::File => ValueKey::File(value.path().to_string()),
            ValueKind::Dir => ValueKey::Dir(value.path().to_string()),
        }
    }
}

/// The result of planning: a permutation of `0..spec.actions.len()` such that for every
/// `Exec` action, every action producing one of its inputs appears earlier in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    order: Vec<usize>,
}

impl Plan {
    /// Action indices in execution order, indexing into the original `Spec::actions`.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// The actions themselves, in execution order.
    pub fn actions<'a>(&self, spec: &'a Spec) -> Vec<&'a Action> {
        self.order.iter().map(|&i| &spec.actions[i]).collect()
    }
}

/// Plan a specification's actions into a valid execution order.
pub fn plan(spec: &Spec) -> Result<Plan> {
    let images = collect_image_producers(spec)?;
    let (deps, successors) = build_dependency_graph(spec, &images)?;
    let order = topological_sort(deps, successors)?;
    Ok(Plan { order })
}

fn collect_image_producers(spec: &Spec) -> Result<HashMap<String, usize>> {
    let mut images = HashMap::new();
    for (index, action) in spec.actions.iter().enumerate() {
        if let Some(image_name) = action.produced_image() {
            if images.insert(image_name.to_string(), index).is_some() {
                return error::ImageSpecConflictSnafu {
                    image_name: image_name.to_string(),
                }
                .fail();
            }
        }
    }
    Ok(images)
}

/// Returns, per action index, the set of action indices it depends on, plus the reverse
/// (successor) adjacency used to drive the topological sort.
fn build_dependency_graph(
    spec: &Spec,
    images: &HashMap<String, usize>,
) -> Result<(Vec<Vec<usize>>, Vec<Vec<usize>>)> {
    let n = spec.actions.len();
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut producers: HashMap<ValueKey, usize> = HashMap::new();

    for (index, action) in spec.actions.iter().enumerate() {
        let Action::Exec(exec) = action else {
            continue;
        };

        let image_producer = match images.get(exec.image_name.as_str()) {
            Some(&producer) => producer,
            None => {
                return error::MissingImageSpecSnafu {
                    image_name: exec.image_name.clone(),
                }
                .fail()
            }
        };
        deps[index].push(image_producer);

        for input in &exec.inputs {
            if let Some(&producer) = producers.get(&ValueKey::of(&input.value)) {
                deps[index].push(producer);
            }
        }

        for output in &exec.outputs {
            let key = ValueKey::of(&output.value);
            if producers.insert(key, index).is_some() {
                return error::ProducerConflictSnafu {
                    path: output.value.path().to_string(),
                }
                .fail();
            }
        }
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (index, predecessors) in deps.iter().enumerate() {
        for &predecessor in predecessors {
            successors[predecessor].push(index);
        }
    }

    Ok((deps, successors))
}

fn topological_sort(deps: Vec<Vec<usize>>, successors: Vec<Vec<usize>>) -> Result<Vec<usize>> {
    let n = deps.len();
    let mut in_degree: Vec<usize> = deps.iter().map(|d| d.len()).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(index) = queue.pop_front() {
        order.push(index);
        for &successor in &successors[index] {
            in_degree[successor] -= 1;
            if in_degree[successor] == 0 {
                queue.push_back(successor);
            }
        }
    }

    if order.len() != n {
        return error::CycleDetectedSnafu {
            remaining: n - order.len(),
            total: n,
        }
        .fail();
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnb_spec::{
        BuildImage, Exec, Input, Output, PullImage, SpecVersion, StreamName, Through,
    };

    fn spec_with(actions: Vec<Action>) -> Spec {
        let mut spec = Spec::new(SpecVersion::new(1, 0));
        spec.actions = actions;
        spec
    }

    fn stdout_to(path: &str) -> Output {
        Output::new(
            Value::File { path: path.into() },
            Through::Stream {
                name: StreamName::Stdout,
            },
        )
    }

    fn stdin_from(path: &str) -> Input {
        Input::new(
            Value::File { path: path.into() },
            Through::Stream {
                name: StreamName::Stdin,
            },
        )
    }

    #[test]
    fn empty_spec_plans_to_empty_order() {
        let spec = spec_with(vec![]);
        assert_eq!(plan(&spec).unwrap().order(), &[] as &[usize]);
    }

    #[test]
    fn pull_then_exec_orders_pull_first() {
        let mut exec = Exec::new("bash:5.2");
        exec.outputs.push(stdout_to("out.txt"));
        let spec = spec_with(vec![
            Action::PullImage(PullImage::new("bash:5.2")),
            Action::Exec(exec),
        ]);

        let order = plan(&spec).unwrap().order().to_vec();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn chained_file_dependency_is_ordered() {
        let mut exec1 = Exec::new("bash");
        exec1.outputs.push(stdout_to("a.txt"));

        let mut exec2 = Exec::new("bash");
        exec2.inputs.push(stdin_from("a.txt"));
        exec2.outputs.push(stdout_to("b.txt"));

        let spec = spec_with(vec![
            Action::PullImage(PullImage::new("bash")),
            Action::Exec(exec1),
            Action::Exec(exec2),
        ]);

        let order = plan(&spec).unwrap().order().to_vec();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn external_producer_less_value_is_a_leaf() {
        let mut exec = Exec::new("bash");
        exec.inputs.push(stdin_from("pre-existing.txt"));
        let spec = spec_with(vec![
            Action::PullImage(PullImage::new("bash")),
            Action::Exec(exec),
        ]);

        let order = plan(&spec).unwrap().order().to_vec();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn duplicate_image_producer_is_a_conflict() {
        let spec = spec_with(vec![
            Action::PullImage(PullImage::new("foo")),
            Action::BuildImage(BuildImage::new("foo", "./ctx")),
        ]);

        assert!(matches!(
            plan(&spec),
            Err(Error::ImageSpecConflict { image_name }) if image_name == "foo"
        ));
    }

    #[test]
    fn missing_image_producer_is_reported() {
        let spec = spec_with(vec![Action::Exec(Exec::new("ghost"))]);
        assert!(matches!(
            plan(&spec),
            Err(Error::MissingImageSpec { image_name }) if image_name == "ghost"
        ));
    }

    #[test]
    fn duplicate_output_producer_is_a_conflict() {
        let mut exec1 = Exec::new("bash");
        exec1.outputs.push(stdout_to("dup.txt"));
        let mut exec2 = Exec::new("bash");
        exec2.outputs.push(stdout_to("dup.txt"));

        let spec = spec_with(vec![
            Action::PullImage(PullImage::new("bash")),
            Action::Exec(exec1),
            Action::Exec(exec2),
        ]);

        assert!(matches!(
            plan(&spec),
            Err(Error::ProducerConflict { path }) if path == "dup.txt"
        ));
    }
}
