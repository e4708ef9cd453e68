#[cfg(test)]
mod tests {
    use datalog_rule_macro::program;
    use datalog_syntax::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_program_assigns_canonical_ids() {
        let program_output = program! {
            tc(?x, ?y) <- [e(?x, ?y)],
            tc(?x, ?z) <- [e(?x, ?y), tc(?y, ?z)]
        };

        let expected_output = Program::from(vec![
            Rule::create(
                "tc",
                vec!["?x".into(), "?y".into()],
                vec![("e", vec!["?x".into(), "?y".into()])],
            ),
            Rule::create(
                "tc",
                vec!["?x".into(), "?z".into()],
                vec![
                    ("e", vec!["?x".into(), "?y".into()]),
                    ("tc", vec!["?y".into(), "?z".into()]),
                ],
            ),
        ]);

        assert_eq!(program_output, expected_output);
        assert!(program_output
            .inner
            .iter()
            .enumerate()
            .all(|(index, rule)| rule.id == index));
    }
}
