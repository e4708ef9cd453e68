use crate::helpers::helpers::{add_prefix, OVERDELETION_PREFIX, REDERIVATION_PREFIX};
use datalog_syntax::{Atom, Program, Rule};
use std::collections::HashSet;

// Delete-and-rederive rewrites. The semi-naive driver never runs these; a
// maintenance mode handling deletions would, analogously to the delta flow.

fn marked_atom(atom: &Atom, prefix: &str) -> Atom {
    let mut marked = atom.clone();
    add_prefix(&mut marked.symbol, prefix);

    marked
}

/// One rule per body position: a fact deleted there may invalidate the head,
/// so the head is overapproximated as deleted too.
pub fn make_overdeletion_program(program: &Program) -> Program {
    let mut overdeletion_rules: HashSet<Rule> = HashSet::new();

    for rule in &program.inner {
        for deleted_position in 0..rule.body.len() {
            let body = rule
                .body
                .iter()
                .enumerate()
                .map(|(position, atom)| {
                    if position == deleted_position {
                        marked_atom(atom, OVERDELETION_PREFIX)
                    } else {
                        atom.clone()
                    }
                })
                .collect();

            overdeletion_rules.insert(Rule {
                head: marked_atom(&rule.head, OVERDELETION_PREFIX),
                body,
                id: 0,
            });
        }
    }

    Program::from(overdeletion_rules.into_iter().collect::<Vec<_>>())
}

/// The overdeleted head fact guards the original body, so the rule refires
/// only for facts that still have an alternative derivation.
pub fn make_rederivation_program(program: &Program) -> Program {
    let mut rederivation_rules: HashSet<Rule> = HashSet::new();

    for rule in &program.inner {
        let mut body = Vec::with_capacity(rule.body.len() + 1);
        body.push(marked_atom(&rule.head, OVERDELETION_PREFIX));
        body.extend(rule.body.iter().cloned());

        rederivation_rules.insert(Rule {
            head: marked_atom(&rule.head, REDERIVATION_PREFIX),
            body,
            id: 0,
        });
    }

    Program::from(rederivation_rules.into_iter().collect::<Vec<_>>())
}
