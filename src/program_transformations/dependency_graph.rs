use ahash::{HashMap, HashMapExt};
use datalog_syntax::{Program, Rule};
use petgraph::graphmap::{DiGraphMap, GraphMap};
use petgraph::{algo, Directed};

type RuleGraph = GraphMap<usize, (), Directed>;

pub fn generate_rule_dependency_graph(program: &[Rule]) -> RuleGraph {
    let mut output = DiGraphMap::new();
    let mut idb_relations: HashMap<&str, Vec<usize>> = HashMap::new();
    for rule in program {
        output.add_node(rule.id);
        idb_relations
            .entry(rule.head.symbol.as_str())
            .or_default()
            .push(rule.id);
    }
    for rule in program {
        for body_atom in &rule.body {
            if let Some(dependencies) = idb_relations.get(body_atom.symbol.as_str()) {
                for dependency in dependencies {
                    // The dependency has to be saturated before `rule` is
                    // reconsidered.
                    output.add_edge(*dependency, rule.id, ());
                }
            }
        }
    }

    output
}

/// Strongly connected components, each sorted ascending by rule id.
/// `kosaraju_scc` yields the components in reverse topological order.
pub fn stratify(rule_graph: &RuleGraph) -> Vec<Vec<usize>> {
    algo::kosaraju_scc(rule_graph)
        .into_iter()
        .map(|mut component| {
            component.sort_unstable();
            component
        })
        .collect()
}

pub fn sort_program(program: &Program) -> Program {
    let rule_graph = generate_rule_dependency_graph(&program.inner);
    let stratification = stratify(&rule_graph);

    // The reversal puts the least-dependent rules first; the driver's single
    // nonrecursive pass relies on that order.
    let sorted = stratification
        .into_iter()
        .rev()
        .flatten()
        .map(|id| program.inner[id].clone())
        .collect();

    Program { inner: sorted }
}
