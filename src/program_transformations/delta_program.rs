use crate::helpers::helpers::{add_prefix, DELTA_PREFIX};
use ahash::HashSet;
use datalog_syntax::{Program, Rule};

/// Rewrites a program into its incremental form. Every head gets the delta
/// marker, and each eligible body position yields one variant in which that
/// single atom is marked as well; a variant stands for the derivations one
/// new fact arriving at that position can trigger.
///
/// During the initial pass (`update = false`) only derived relations are
/// eligible, and a rule whose body touches none of them collapses to a
/// single head-marked rule firing once off the unchanged base relations.
/// During updates every position is eligible.
pub fn make_delta_program(program: &Program, update: bool) -> Program {
    let derived_relations: HashSet<&str> = program
        .inner
        .iter()
        .map(|rule| rule.head.symbol.as_str())
        .collect();

    let mut delta_rules: HashSet<Rule> = HashSet::default();

    for rule in &program.inner {
        let eligible_positions: Vec<usize> = rule
            .body
            .iter()
            .enumerate()
            .filter(|(_, atom)| update || derived_relations.contains(atom.symbol.as_str()))
            .map(|(position, _)| position)
            .collect();

        if !update && eligible_positions.is_empty() {
            delta_rules.insert(mark_rule(rule, None));
        } else {
            delta_rules.extend(
                eligible_positions
                    .into_iter()
                    .map(|position| mark_rule(rule, Some(position))),
            );
        }
    }

    Program::from(delta_rules.into_iter().collect::<Vec<_>>())
}

/// A copy of `rule` with the head marked, and at most one body atom marked.
/// The id is zeroed so the set above deduplicates on content alone.
fn mark_rule(rule: &Rule, body_position: Option<usize>) -> Rule {
    let mut marked = rule.clone();
    marked.id = 0;

    add_prefix(&mut marked.head.symbol, DELTA_PREFIX);
    if let Some(position) = body_position {
        add_prefix(&mut marked.body[position].symbol, DELTA_PREFIX);
    }

    marked
}
