use crate::engine::error::EvalError;
use crate::engine::sql_channel::SqlChannel;
use datalog_syntax::{Program, Rule};
use indexmap::IndexSet;
use regex::Regex;
use std::collections::HashSet;

// EDB bootstrap: schema creation plus bulk loaders for the two benchmark
// input shapes, whitespace edge lists and N-triples. Loading happens before
// a runtime is constructed and is deliberately unprofiled.

const INSERT_BATCH_SIZE: usize = 512;

pub const RDF_TYPE: &str = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>";
pub const RDFS_SUB_CLASS_OF: &str = "<http://www.w3.org/2000/01/rdf-schema#subClassOf>";
pub const RDFS_SUB_PROPERTY_OF: &str = "<http://www.w3.org/2000/01/rdf-schema#subPropertyOf>";
pub const RDFS_DOMAIN: &str = "<http://www.w3.org/2000/01/rdf-schema#domain>";
pub const RDFS_RANGE: &str = "<http://www.w3.org/2000/01/rdf-schema#range>";
pub const RDF_PROPERTY: &str = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#Property>";

/// Maps strings to dense integer ids, in first-seen order.
#[derive(Default)]
pub struct Interner {
    inner: IndexSet<String>,
}

impl Interner {
    /// An interner with the RDFS vocabulary pre-interned, so that type,
    /// subClassOf, subPropertyOf, domain, range and Property take ids 0..=5,
    /// matching the constants in [`rdfs_program`].
    pub fn rdfs() -> Self {
        let mut interner = Self::default();
        for term in [
            RDF_TYPE,
            RDFS_SUB_CLASS_OF,
            RDFS_SUB_PROPERTY_OF,
            RDFS_DOMAIN,
            RDFS_RANGE,
            RDF_PROPERTY,
        ] {
            interner.get_or_intern(term);
        }

        interner
    }

    pub fn get_or_intern(&mut self, value: &str) -> i64 {
        match self.inner.get_index_of(value) {
            Some(id) => id as i64,
            None => self.inner.insert_full(value.to_string()).0 as i64,
        }
    }

    pub fn resolve(&self, id: i64) -> Option<&str> {
        self.inner.get_index(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// `CREATE TABLE IF NOT EXISTS symbol (symbol_0 INTEGER, ...)`.
pub fn create_relation<C: SqlChannel>(
    channel: &mut C,
    symbol: &str,
    arity: usize,
) -> Result<(), EvalError> {
    let columns = (0..arity)
        .map(|i| format!("{}_{} INTEGER", symbol, i))
        .collect::<Vec<_>>()
        .join(", ");
    channel.execute(&format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        symbol, columns
    ))?;
    channel.commit()
}

fn insert_rows<C: SqlChannel>(
    channel: &mut C,
    relation: &str,
    rows: &[Vec<i64>],
) -> Result<(), EvalError> {
    for batch in rows.chunks(INSERT_BATCH_SIZE) {
        let values = batch
            .iter()
            .map(|row| {
                let tuple = row
                    .iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", tuple)
            })
            .collect::<Vec<_>>()
            .join(", ");
        channel.execute(&format!("INSERT INTO {} VALUES {}", relation, values))?;
    }
    channel.commit()
}

/// Loads a whitespace-separated integer edge list into a binary relation.
/// Duplicate lines are skipped. Returns the number of rows inserted.
pub fn load_edge_list<C: SqlChannel>(
    channel: &mut C,
    relation: &str,
    contents: &str,
) -> Result<usize, EvalError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows: Vec<Vec<i64>> = vec![];

    for line in contents.lines() {
        if line.trim().is_empty() || !seen.insert(line) {
            continue;
        }

        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(from), Some(to)) => {
                let from = from
                    .parse()
                    .map_err(|_| EvalError::MalformedLine(line.to_string()))?;
                let to = to
                    .parse()
                    .map_err(|_| EvalError::MalformedLine(line.to_string()))?;
                rows.push(vec![from, to]);
            }
            _ => return Err(EvalError::MalformedLine(line.to_string())),
        }
    }

    insert_rows(channel, relation, &rows)?;

    Ok(rows.len())
}

/// Loads an N-triples file into a ternary relation, interning each term.
/// Blank-node (`genid`) lines and duplicate lines are skipped. Returns the
/// number of rows inserted.
pub fn load_ntriples<C: SqlChannel>(
    channel: &mut C,
    relation: &str,
    contents: &str,
    interner: &mut Interner,
) -> Result<usize, EvalError> {
    let triple_pattern =
        Regex::new(r"^\s*(\S+)\s+(\S+)\s+(\S+)").expect("the triple pattern is well-formed");

    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows: Vec<Vec<i64>> = vec![];

    for line in contents.lines() {
        if line.contains("genid") || line.trim().is_empty() || !seen.insert(line) {
            continue;
        }

        let captures = triple_pattern
            .captures(line)
            .ok_or_else(|| EvalError::MalformedLine(line.to_string()))?;
        rows.push(vec![
            interner.get_or_intern(&captures[1]),
            interner.get_or_intern(&captures[2]),
            interner.get_or_intern(&captures[3]),
        ]);
    }

    insert_rows(channel, relation, &rows)?;

    Ok(rows.len())
}

/// The RDFS-style inference program used by the benchmarks: copies `RDF`
/// into `T`, then closes it under domain, range, subClassOf, subPropertyOf
/// and type propagation. The integer constants are the vocabulary ids of
/// [`Interner::rdfs`].
pub fn rdfs_program() -> Program {
    Program::from(vec![
        Rule::create(
            "T",
            vec!["?s".into(), "?p".into(), "?o".into()],
            vec![("RDF", vec!["?s".into(), "?p".into(), "?o".into()])],
        ),
        Rule::create(
            "T",
            vec!["?y".into(), 0.into(), "?x".into()],
            vec![
                ("T", vec!["?a".into(), 3.into(), "?x".into()]),
                ("T", vec!["?y".into(), "?a".into(), "?z".into()]),
            ],
        ),
        Rule::create(
            "T",
            vec!["?z".into(), 0.into(), "?x".into()],
            vec![
                ("T", vec!["?a".into(), 4.into(), "?x".into()]),
                ("T", vec!["?y".into(), "?a".into(), "?z".into()]),
            ],
        ),
        Rule::create(
            "T",
            vec!["?x".into(), 2.into(), "?z".into()],
            vec![
                ("T", vec!["?x".into(), 2.into(), "?y".into()]),
                ("T", vec!["?y".into(), 2.into(), "?z".into()]),
            ],
        ),
        Rule::create(
            "T",
            vec!["?x".into(), 1.into(), "?z".into()],
            vec![
                ("T", vec!["?x".into(), 1.into(), "?y".into()]),
                ("T", vec!["?y".into(), 1.into(), "?z".into()]),
            ],
        ),
        Rule::create(
            "T",
            vec!["?z".into(), 0.into(), "?y".into()],
            vec![
                ("T", vec!["?x".into(), 1.into(), "?y".into()]),
                ("T", vec!["?z".into(), 0.into(), "?x".into()]),
            ],
        ),
        Rule::create(
            "T",
            vec!["?x".into(), "?b".into(), "?y".into()],
            vec![
                ("T", vec!["?a".into(), 2.into(), "?b".into()]),
                ("T", vec!["?x".into(), "?a".into(), "?y".into()]),
            ],
        ),
    ])
}
