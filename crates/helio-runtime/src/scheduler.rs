//! Level-wise DAG scheduling of expression graphs.
//!
//! The external expression parser hands over one [`DependencyInfo`] per
//! assignment; the scheduler peels the dependency graph into execution
//! levels, Kahn-style. At each pass, every ready node (in-degree zero)
//! whose assignment calls a function and is neither stateful nor
//! non-concurrent joins one parallelizable level; every other ready node
//! becomes its own singleton sequential level, preserving declaration
//! order. The parallel level is emitted first.
//!
//! A pass that finds no ready node while work remains means the graph is
//! broken: the error enumerates the offenders and distinguishes cycles
//! from duplicate definitions.

use thiserror::Error;

/// Dependency description of one assignment, as produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyInfo {
    /// Variable the assignment defines.
    pub variable_name: String,
    /// Script section the assignment belongs to.
    pub section_name: Option<String>,
    /// Source text of the assignment (for error reporting and evaluation).
    pub assignment: String,
    /// Variables the assignment reads.
    pub dependencies: Vec<String>,
    /// Whether the assignment calls any function.
    pub has_function_call: bool,
    /// Whether any called function is stateful.
    pub has_stateful_function: bool,
    /// Whether any called function must not run concurrently.
    pub has_non_concurrent_function: bool,
    /// Whether function arguments themselves fan out in parallel.
    pub has_parallel_function_arguments: bool,
}

impl DependencyInfo {
    /// Whether this assignment may share a parallelizable level.
    fn parallelizable(&self) -> bool {
        self.has_function_call && !self.has_stateful_function && !self.has_non_concurrent_function
    }
}

/// One execution level: expressions plus the parallelism verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLevel {
    /// Expressions of the level, in declaration order.
    pub expressions: Vec<DependencyInfo>,
    /// Whether the evaluator may run them concurrently.
    pub parallel: bool,
}

/// Graph errors, fatal to the scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The remaining nodes form at least one cycle.
    #[error("circular dependency detected among: {}", variables.join(", "))]
    CircularDependency {
        /// Variables that could not be scheduled.
        variables: Vec<String>,
    },

    /// A stalled graph where some unscheduled variable was defined twice.
    #[error("duplicate variable definitions: {}", variables.join(", "))]
    DuplicateVariable {
        /// Variables with more than one definition.
        variables: Vec<String>,
    },
}

/// Computes the execution levels of a dependency graph.
///
/// Duplicate definitions keep the first occurrence as the node and record
/// the name; the record only matters if the graph stalls.
pub fn compute_levels(infos: &[DependencyInfo]) -> Result<Vec<ExecutionLevel>, SchedulerError> {
    // Nodes keyed by variable name, first definition wins.
    let mut index_of = std::collections::HashMap::new();
    let mut nodes: Vec<&DependencyInfo> = Vec::new();
    let mut duplicates: Vec<String> = Vec::new();
    for info in infos {
        if index_of.contains_key(info.variable_name.as_str()) {
            if !duplicates.contains(&info.variable_name) {
                duplicates.push(info.variable_name.clone());
            }
            continue;
        }
        index_of.insert(info.variable_name.as_str(), nodes.len());
        nodes.push(info);
    }

    let n = nodes.len();
    let mut in_degree = vec![0usize; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, node) in nodes.iter().enumerate() {
        for dep in &node.dependencies {
            // Unknown names are externally-bound inputs, not edges.
            if let Some(&from) = index_of.get(dep.as_str()) {
                if from != i {
                    successors[from].push(i);
                    in_degree[i] += 1;
                }
            }
        }
    }

    let mut processed = vec![false; n];
    let mut remaining = n;
    let mut levels = Vec::new();

    while remaining > 0 {
        let ready: Vec<usize> = (0..n)
            .filter(|&i| !processed[i] && in_degree[i] == 0)
            .collect();
        if ready.is_empty() {
            let stuck: Vec<String> = (0..n)
                .filter(|&i| !processed[i])
                .map(|i| nodes[i].variable_name.clone())
                .collect();
            let stuck_duplicates: Vec<String> = duplicates
                .iter()
                .filter(|d| stuck.contains(d))
                .cloned()
                .collect();
            return Err(if stuck_duplicates.is_empty() {
                SchedulerError::CircularDependency { variables: stuck }
            } else {
                SchedulerError::DuplicateVariable {
                    variables: stuck_duplicates,
                }
            });
        }

        let (parallel, sequential): (Vec<usize>, Vec<usize>) =
            ready.iter().partition(|&&i| nodes[i].parallelizable());

        if !parallel.is_empty() {
            levels.push(ExecutionLevel {
                expressions: parallel.iter().map(|&i| nodes[i].clone()).collect(),
                parallel: true,
            });
        }
        for &i in &sequential {
            levels.push(ExecutionLevel {
                expressions: vec![nodes[i].clone()],
                parallel: false,
            });
        }

        for &i in &ready {
            processed[i] = true;
            remaining -= 1;
            for &succ in &successors[i] {
                in_degree[succ] -= 1;
            }
        }
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, deps: &[&str], function_call: bool) -> DependencyInfo {
        DependencyInfo {
            variable_name: name.to_string(),
            assignment: format!("{name} = ..."),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            has_function_call: function_call,
            ..DependencyInfo::default()
        }
    }

    fn level_names(level: &ExecutionLevel) -> Vec<&str> {
        level
            .expressions
            .iter()
            .map(|e| e.variable_name.as_str())
            .collect()
    }

    #[test]
    fn test_chain_is_sequential_singletons() {
        // a = 1; b = a + 1; c = b + a: no function calls anywhere.
        let levels = compute_levels(&[
            var("a", &[], false),
            var("b", &["a"], false),
            var("c", &["b", "a"], false),
        ])
        .unwrap();
        assert_eq!(levels.len(), 3);
        for (level, name) in levels.iter().zip(["a", "b", "c"]) {
            assert!(!level.parallel);
            assert_eq!(level_names(level), vec![name]);
        }
    }

    #[test]
    fn test_independent_calls_share_parallel_level() {
        // a = f(); b = f(); c = a + b.
        let levels = compute_levels(&[
            var("a", &[], true),
            var("b", &[], true),
            var("c", &["a", "b"], false),
        ])
        .unwrap();
        assert_eq!(levels.len(), 2);
        assert!(levels[0].parallel);
        assert_eq!(level_names(&levels[0]), vec!["a", "b"]);
        assert!(!levels[1].parallel);
        assert_eq!(level_names(&levels[1]), vec!["c"]);
    }

    #[test]
    fn test_stateful_calls_stay_sequential() {
        let mut a = var("a", &[], true);
        a.has_stateful_function = true;
        let mut b = var("b", &[], true);
        b.has_non_concurrent_function = true;
        let c = var("c", &[], true);

        let levels = compute_levels(&[a, b, c]).unwrap();
        // The parallelizable level comes first, then the singletons in
        // declaration order.
        assert_eq!(levels.len(), 3);
        assert!(levels[0].parallel);
        assert_eq!(level_names(&levels[0]), vec!["c"]);
        assert_eq!(level_names(&levels[1]), vec!["a"]);
        assert_eq!(level_names(&levels[2]), vec!["b"]);
    }

    #[test]
    fn test_topological_consistency() {
        let infos = [
            var("d", &["b", "c"], true),
            var("b", &["a"], true),
            var("c", &["a"], true),
            var("a", &[], true),
        ];
        let levels = compute_levels(&infos).unwrap();

        let position = |name: &str| {
            levels
                .iter()
                .position(|l| l.expressions.iter().any(|e| e.variable_name == name))
                .unwrap()
        };
        for (from, to) in [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")] {
            assert!(position(from) < position(to), "{from} must precede {to}");
        }
    }

    #[test]
    fn test_unknown_dependencies_are_inputs() {
        // img is produced upstream, not defined in the script.
        let levels = compute_levels(&[var("a", &["img"], true)]).unwrap();
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_cycle_detected() {
        let err = compute_levels(&[
            var("a", &["b"], false),
            var("b", &["a"], false),
            var("ok", &[], false),
        ])
        .unwrap_err();
        match err {
            SchedulerError::CircularDependency { variables } => {
                assert_eq!(variables, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_reported_on_stall() {
        // The duplicate definition of `a` is dropped, and the surviving
        // graph has a cycle through `a`, so the duplicate is the diagnosis.
        let err = compute_levels(&[
            var("a", &["b"], false),
            var("a", &[], false),
            var("b", &["a"], false),
        ])
        .unwrap_err();
        match err {
            SchedulerError::DuplicateVariable { variables } => {
                assert_eq!(variables, vec!["a".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_without_stall_is_fine() {
        let levels = compute_levels(&[
            var("a", &[], false),
            var("a", &[], false),
            var("b", &["a"], false),
        ])
        .unwrap();
        assert_eq!(levels.len(), 2);
    }
}
