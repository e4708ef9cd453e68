#[cfg(test)]
mod tests {
    use datalog_syntax::*;
    use pretty_assertions::assert_eq;
    use sql_datalog::engine::datalog::SqlRuntime;
    use sql_datalog::engine::loader::{create_relation, rdfs_program, Interner};
    use sql_datalog::engine::sql_channel::{SqlChannel, SqliteChannel};
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn setup_db(path: &Path, queries: &[&str]) {
        let mut channel = SqliteChannel::open(path).unwrap();
        for query in queries {
            channel.execute(query).unwrap();
        }
        channel.commit().unwrap();
    }

    fn query_rows(path: &Path, sql: &str) -> HashSet<Vec<i64>> {
        let mut channel = SqliteChannel::open(path).unwrap();
        channel.execute(sql).unwrap().into_iter().collect()
    }

    /// Fresh database holding a small RDF graph: a subclass chain, a typed
    /// individual, a subproperty with domain and range, and one triple using
    /// that property. Vocabulary ids follow `Interner::rdfs`.
    fn setup_rdf_db(dir: &TempDir, name: &str) -> PathBuf {
        let db = dir.path().join(name);
        let mut channel = SqliteChannel::open(&db).unwrap();
        create_relation(&mut channel, "RDF", 3).unwrap();
        create_relation(&mut channel, "T", 3).unwrap();

        let interner = Interner::rdfs();
        assert_eq!(interner.len(), 6);

        for (s, p, o) in [
            (10, 1, 11), // c1 subClassOf c2
            (11, 1, 12), // c2 subClassOf c3
            (20, 0, 10), // i type c1
            (30, 2, 31), // p subPropertyOf q
            (21, 30, 22), // a p b
            (30, 3, 13), // p domain d
            (30, 4, 14), // p range r
        ] {
            channel
                .execute(&format!("INSERT INTO RDF VALUES ({}, {}, {})", s, p, o))
                .unwrap();
        }
        channel.commit().unwrap();

        db
    }

    #[test]
    fn test_rdfs_fixed_point() {
        let tmp = TempDir::new().unwrap();
        let db = setup_rdf_db(&tmp, "rdfs.db");

        let program = rdfs_program();
        let channel = SqliteChannel::open(&db).unwrap();
        let mut runtime = SqlRuntime::new(channel, &program, 1).unwrap();
        runtime.poll().unwrap();

        let mut expected: HashSet<Vec<i64>> = [
            // The copied graph.
            vec![10, 1, 11],
            vec![11, 1, 12],
            vec![20, 0, 10],
            vec![30, 2, 31],
            vec![21, 30, 22],
            vec![30, 3, 13],
            vec![30, 4, 14],
        ]
        .into_iter()
        .collect();
        // Inferences: domain and range typing, subclass transitivity, type
        // inheritance, subproperty propagation.
        expected.insert(vec![21, 0, 13]);
        expected.insert(vec![22, 0, 14]);
        expected.insert(vec![10, 1, 12]);
        expected.insert(vec![20, 0, 11]);
        expected.insert(vec![20, 0, 12]);
        expected.insert(vec![21, 31, 22]);

        assert_eq!(expected, query_rows(&db, "SELECT * FROM T"));
    }

    #[test]
    fn test_polling_twice_on_fresh_databases_is_deterministic() {
        let tmp = TempDir::new().unwrap();

        let mut results = vec![];
        for name in ["first.db", "second.db"] {
            let db = setup_rdf_db(&tmp, name);
            let program = rdfs_program();
            let channel = SqliteChannel::open(&db).unwrap();
            let mut runtime = SqlRuntime::new(channel, &program, 1).unwrap();
            runtime.poll().unwrap();
            results.push(query_rows(&db, "SELECT * FROM T"));
        }

        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_rule_input_order_does_not_matter() {
        let base = Rule::create(
            "T",
            vec!["?x".into(), "?y".into()],
            vec![("E", vec!["?x".into(), "?y".into()])],
        );
        let step = Rule::create(
            "T",
            vec!["?x".into(), "?y".into()],
            vec![
                ("T", vec!["?x".into(), "?z".into()]),
                ("E", vec!["?z".into(), "?y".into()]),
            ],
        );

        let forward = Program::from(vec![base.clone(), step.clone()]);
        let backward = Program::from(vec![step, base]);

        let tmp = TempDir::new().unwrap();
        let mut traces = vec![];
        let mut results = vec![];
        for (name, program) in [("forward.db", &forward), ("backward.db", &backward)] {
            let db = tmp.path().join(name);
            setup_db(
                &db,
                &[
                    "CREATE TABLE E (E_0 INTEGER, E_1 INTEGER)",
                    "CREATE TABLE T (T_0 INTEGER, T_1 INTEGER)",
                    "INSERT INTO E VALUES (1, 2)",
                    "INSERT INTO E VALUES (2, 3)",
                    "INSERT INTO E VALUES (3, 4)",
                ],
            );

            let channel = SqliteChannel::open(&db).unwrap();
            let mut runtime = SqlRuntime::new(channel, program, 1).unwrap();
            runtime.poll().unwrap();

            results.push(query_rows(&db, "SELECT * FROM T"));
            traces.push(
                runtime
                    .dump_benchmark()
                    .iter()
                    .map(|record| (record.iter, record.tag, record.rule.clone()))
                    .collect::<Vec<_>>(),
            );
        }

        // Identical derived relations and identical evaluation order, up to
        // wall-clock noise.
        assert_eq!(results[0], results[1]);
        assert_eq!(traces[0], traces[1]);
    }

    #[test]
    fn test_trace_is_tagged_per_phase() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("trace.db");
        setup_db(
            &db,
            &[
                "CREATE TABLE T (T_0 INTEGER, T_1 INTEGER)",
                "INSERT INTO T VALUES (1, 2)",
                "INSERT INTO T VALUES (2, 3)",
            ],
        );

        let program = Program::from(vec![Rule::create(
            "T",
            vec!["?x".into(), "?z".into()],
            vec![
                ("T", vec!["?x".into(), "?y".into()]),
                ("T", vec!["?y".into(), "?z".into()]),
            ],
        )]);

        let channel = SqliteChannel::open(&db).unwrap();
        let mut runtime = SqlRuntime::new(channel, &program, 3).unwrap();
        runtime.poll().unwrap();

        let trace = runtime.dump_benchmark();
        assert!(trace.iter().all(|record| record.test_run == 3));

        let tags: HashSet<&str> = trace.iter().map(|record| record.tag).collect();
        for tag in ["COMPILER_INIT", "FACT_COUNT", "MAT_REC", "DRAIN", "SPJ_JOIN", "SPJ_PROJECT", "SPJ_CLEAR"] {
            assert!(tags.contains(tag), "missing tag {}", tag);
        }

        // SPJ statements carry the serialized rule they implement.
        assert!(trace
            .iter()
            .filter(|record| record.tag.starts_with("SPJ_"))
            .all(|record| !record.rule.is_empty()));
    }
}
