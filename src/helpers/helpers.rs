use datalog_syntax::Program;

/// Reserved delta marker. User-supplied relation symbols must not begin with
/// it; `SqlRuntime::new` rejects programs that do.
pub const DELTA_PREFIX: &str = "Δ";
pub const OVERDELETION_PREFIX: &str = "delete_";
pub const REDERIVATION_PREFIX: &str = "rederive_";

pub fn add_prefix(symbol: &mut String, prefix: &str) {
    symbol.insert_str(0, prefix);
}

/// Strips every leading delta marker, so both `ΔR` and `ΔΔR` map to the base
/// relation `R`. Proper prefix removal only, never char-set stripping.
pub fn strip_delta_prefixes(symbol: &str) -> &str {
    let mut base = symbol;
    while let Some(stripped) = base.strip_prefix(DELTA_PREFIX) {
        base = stripped;
    }
    base
}

/// Partitions a program into its nonrecursive and recursive halves. A rule is
/// recursive when its own head relation (modulo delta markers) occurs in its
/// body. Both halves are re-canonicalized.
pub fn split_program(program: &Program) -> (Program, Program) {
    let mut nonrecursive = vec![];
    let mut recursive = vec![];

    program.inner.iter().for_each(|rule| {
        let head_relation = strip_delta_prefixes(&rule.head.symbol);

        if rule
            .body
            .iter()
            .any(|body_atom| strip_delta_prefixes(&body_atom.symbol) == head_relation)
        {
            recursive.push(rule.clone());
        } else {
            nonrecursive.push(rule.clone());
        }
    });

    (Program::from(nonrecursive), Program::from(recursive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalog_rule_macro::program;
    use datalog_syntax::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_delta_prefixes() {
        assert_eq!(strip_delta_prefixes("T"), "T");
        assert_eq!(strip_delta_prefixes("ΔT"), "T");
        assert_eq!(strip_delta_prefixes("ΔΔT"), "T");
    }

    #[test]
    fn test_split_program() {
        let program = program! {
            tc(?x, ?y) <- [e(?x, ?y)],
            tc(?x, ?z) <- [e(?x, ?y), tc(?y, ?z)]
        };

        let expected_nonrecursive_program = program! { tc(?x, ?y) <- [e(?x, ?y)] };
        let expected_recursive_program = program! { tc(?x, ?z) <- [e(?x, ?y), tc(?y, ?z)] };

        let (actual_nonrecursive_program, actual_recursive_program) = split_program(&program);

        assert_eq!(expected_nonrecursive_program, actual_nonrecursive_program);
        assert_eq!(expected_recursive_program, actual_recursive_program);
    }

    #[test]
    fn test_split_program_sees_through_delta_markers() {
        let base = Rule::create(
            "Δtc",
            vec!["?x".into(), "?y".into()],
            vec![("Δe", vec!["?x".into(), "?y".into()])],
        );
        let linear = Rule::create(
            "Δtc",
            vec!["?x".into(), "?z".into()],
            vec![
                ("tc", vec!["?x".into(), "?y".into()]),
                ("Δe", vec!["?y".into(), "?z".into()]),
            ],
        );
        let program = Program::from(vec![base.clone(), linear.clone()]);

        let (nonrecursive, recursive) = split_program(&program);

        assert_eq!(Program::from(vec![base]), nonrecursive);
        assert_eq!(Program::from(vec![linear]), recursive);
    }
}
