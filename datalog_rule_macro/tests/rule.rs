#[cfg(test)]
mod tests {
    use datalog_rule_macro::rule;
    use datalog_syntax::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_rule() {
        let rule_output = rule! { tc(?x, ?z) <- [e(?x, ?y), tc(?y, ?z)] };

        let expected_output = Rule {
            head: Atom {
                terms: vec![
                    Term::Variable("x".to_string()),
                    Term::Variable("z".to_string()),
                ],
                symbol: "tc".to_string(),
            },
            body: vec![
                Atom {
                    terms: vec![
                        Term::Variable("x".to_string()),
                        Term::Variable("y".to_string()),
                    ],
                    symbol: "e".to_string(),
                },
                Atom {
                    terms: vec![
                        Term::Variable("y".to_string()),
                        Term::Variable("z".to_string()),
                    ],
                    symbol: "tc".to_string(),
                },
            ],
            id: 0,
        };

        assert_eq!(rule_output, expected_output);
    }

    #[test]
    fn test_rule_with_constants() {
        let rule_output = rule! { T(?y, 0, ?x) <- [T(?x, 2, ?y), T(?y, 2, ?z)] };

        let expected_output = Rule::create(
            "T",
            vec!["?y".into(), 0.into(), "?x".into()],
            vec![
                ("T", vec!["?x".into(), 2.into(), "?y".into()]),
                ("T", vec!["?y".into(), 2.into(), "?z".into()]),
            ],
        );

        assert_eq!(rule_output, expected_output);
    }
}
