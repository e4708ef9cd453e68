use crate::engine::error::EvalError;
use crate::engine::profiler::{ConnectionProfiler, StatementRecord, Tag};
use crate::engine::sql_channel::SqlChannel;
use crate::evaluation::semi_naive::semi_naive_evaluation;
use crate::evaluation::spj_processor::RuleEvaluator;
use crate::helpers::helpers::{split_program, strip_delta_prefixes, DELTA_PREFIX};
use crate::program_transformations::delta_program::make_delta_program;
use crate::program_transformations::dependency_graph::sort_program;
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use datalog_syntax::{Program, Term};
use indexmap::IndexSet;
use tracing::debug;

/// Shape checks issued before any SQL: reserved delta marker, fixed arity
/// per relation, range restriction.
fn validate_program(program: &Program) -> Result<(), EvalError> {
    let mut arities: HashMap<&str, usize> = HashMap::new();

    for rule in &program.inner {
        for atom in std::iter::once(&rule.head).chain(rule.body.iter()) {
            if atom.symbol.starts_with(DELTA_PREFIX) {
                return Err(EvalError::ReservedSymbol(atom.symbol.clone()));
            }

            match arities.get(atom.symbol.as_str()) {
                Some(expected) if *expected != atom.terms.len() => {
                    return Err(EvalError::ArityMismatch {
                        relation: atom.symbol.clone(),
                        expected: *expected,
                        found: atom.terms.len(),
                    });
                }
                Some(_) => {}
                None => {
                    arities.insert(atom.symbol.as_str(), atom.terms.len());
                }
            }
        }

        let body_variables: HashSet<&str> = rule
            .body
            .iter()
            .flat_map(|atom| atom.terms.iter())
            .filter_map(|term| match term {
                Term::Variable(name) => Some(name.as_str()),
                Term::Constant(_) => None,
            })
            .collect();

        for term in &rule.head.terms {
            if let Term::Variable(name) = term {
                if !body_variables.contains(name.as_str()) {
                    return Err(EvalError::RangeRestriction {
                        rule: rule.to_string(),
                        variable: name.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Compiles a Datalog program to relational operations against one database
/// session and materializes its fixed point semi-naively.
///
/// The caller creates and loads the EDB tables before `poll`; the runtime
/// guarantees the rest of the schema (IDB tables, `Δ` and `ΔΔ` like-tables).
pub struct SqlRuntime<C: SqlChannel> {
    pub(crate) conn: ConnectionProfiler<C>,

    // Relation name (delta markers stripped) -> ordered column names.
    base_relations: HashMap<String, Vec<String>>,

    // Disjoint name registries, in first-seen program order so every pass
    // iterates reproducibly.
    relations: IndexSet<String>,
    delta_relations: IndexSet<String>,
    current_delta_relations: IndexSet<String>,

    nonrecursive_delta_program: Program,
    recursive_delta_program: Program,
}

impl<C: SqlChannel> SqlRuntime<C> {
    pub fn new(channel: C, program: &Program, test_run: u32) -> Result<Self, EvalError> {
        validate_program(program)?;

        let mut runtime = Self {
            conn: ConnectionProfiler::new(channel, test_run),
            base_relations: HashMap::new(),
            relations: IndexSet::new(),
            delta_relations: IndexSet::new(),
            current_delta_relations: IndexSet::new(),
            nonrecursive_delta_program: Program::default(),
            recursive_delta_program: Program::default(),
        };

        runtime.gen_base_idx_list(program);

        for rule in &program.inner {
            let relation = rule.head.symbol.clone();
            let delta_relation = format!("{}{}", DELTA_PREFIX, relation);
            let current_delta_relation = format!("{}{}{}", DELTA_PREFIX, DELTA_PREFIX, relation);

            if runtime.relations.insert(relation.clone()) {
                runtime.create_table(&relation)?;
            }
            if runtime.delta_relations.insert(delta_relation.clone()) {
                runtime.create_table(&delta_relation)?;
            }
            if runtime
                .current_delta_relations
                .insert(current_delta_relation.clone())
            {
                runtime.create_table(&current_delta_relation)?;
            }

            for body_atom in &rule.body {
                let body_relation = body_atom.symbol.clone();
                let body_delta_relation = format!("{}{}", DELTA_PREFIX, body_relation);

                if runtime.relations.insert(body_relation.clone()) {
                    runtime.create_table(&body_relation)?;
                }
                if runtime.delta_relations.insert(body_delta_relation.clone()) {
                    runtime.create_table(&body_delta_relation)?;
                }
            }
        }

        runtime.init_programs(program);

        debug!(
            relations = runtime.relations.len(),
            delta_relations = runtime.delta_relations.len(),
            evaluation_buffers = runtime.current_delta_relations.len(),
            "schema ready"
        );

        Ok(runtime)
    }

    fn gen_base_idx_list(&mut self, program: &Program) {
        for rule in &program.inner {
            for atom in std::iter::once(&rule.head).chain(rule.body.iter()) {
                if self.base_relations.contains_key(&atom.symbol) {
                    continue;
                }
                let columns = (0..atom.terms.len())
                    .map(|i| format!("{}_{}", atom.symbol, i))
                    .collect();
                self.base_relations.insert(atom.symbol.clone(), columns);
            }
        }
    }

    fn init_programs(&mut self, program: &Program) {
        let delta_program = make_delta_program(program, true);
        let (nonrecursive, recursive) = split_program(&delta_program);
        self.nonrecursive_delta_program = sort_program(&nonrecursive);
        self.recursive_delta_program = recursive;
    }

    /// `col_0 INTEGER, col_1 INTEGER, ...` for the given relation, with delta
    /// markers stripped so `ΔR` and `ΔΔR` mirror `R`'s schema.
    fn column_defs(&self, relation: &str) -> Result<String, EvalError> {
        let base = strip_delta_prefixes(relation);
        let columns = self
            .base_relations
            .get(base)
            .ok_or_else(|| EvalError::UnknownRelation(relation.to_string()))?;

        Ok(columns
            .iter()
            .map(|column| format!("{} INTEGER", column))
            .collect::<Vec<_>>()
            .join(", "))
    }

    fn create_table(&mut self, relation: &str) -> Result<(), EvalError> {
        let defs = self.column_defs(relation)?;
        self.conn.execute(
            Tag::CompilerInit,
            &format!("CREATE TABLE IF NOT EXISTS {} ({})", relation, defs),
        )?;
        self.conn.commit()
    }

    fn get_table_row_count(&mut self, table_name: &str) -> Result<i64, EvalError> {
        let rows = self.conn.execute(
            Tag::FactCount,
            &format!("SELECT COUNT(*) FROM {}", table_name),
        )?;

        Ok(rows
            .first()
            .and_then(|row| row.first())
            .copied()
            .unwrap_or(0))
    }

    pub(crate) fn total_fact_count(&mut self) -> Result<i64, EvalError> {
        let tables: Vec<String> = self.relations.iter().cloned().collect();
        let mut fact_count = 0;
        for table in &tables {
            fact_count += self.get_table_row_count(table)?;
        }

        Ok(fact_count)
    }

    pub(crate) fn increment_iter(&mut self) {
        self.conn.increment_iter();
    }

    pub(crate) fn materialize_nonrecursive_delta_program(
        &mut self,
        nonrecursive_program: &Program,
    ) -> Result<(), EvalError> {
        let mut rotated_heads: HashSet<String> = HashSet::new();

        for rule in &nonrecursive_program.inner {
            RuleEvaluator::new(&mut self.conn, rule).step()?;

            let delta_relation_symbol = rule.head.symbol.clone();
            let eval_table = format!("{}{}", DELTA_PREFIX, delta_relation_symbol);
            let relation_symbol = strip_delta_prefixes(&delta_relation_symbol).to_string();

            self.conn.execute(
                Tag::MatNonrec,
                &format!(
                    "INSERT INTO {} SELECT * FROM {} EXCEPT SELECT * FROM {}",
                    relation_symbol, eval_table, delta_relation_symbol
                ),
            )?;
            self.conn.commit()?;

            if rotated_heads.insert(delta_relation_symbol.clone()) {
                // First rule writing this head in the pass: replace the delta
                // with the newly derived facts only.
                self.conn.execute(
                    Tag::MatNonrec,
                    &format!(
                        "ALTER TABLE {} RENAME TO TEMP_{}",
                        delta_relation_symbol, delta_relation_symbol
                    ),
                )?;
                let defs = self.column_defs(&delta_relation_symbol)?;
                self.conn.execute(
                    Tag::MatNonrec,
                    &format!("CREATE TABLE {} ({})", delta_relation_symbol, defs),
                )?;
                self.conn.execute(
                    Tag::MatNonrec,
                    &format!(
                        "INSERT INTO {} SELECT * FROM {} EXCEPT SELECT * FROM TEMP_{}",
                        delta_relation_symbol, eval_table, delta_relation_symbol
                    ),
                )?;
                self.conn.execute(
                    Tag::MatNonrec,
                    &format!("DROP TABLE TEMP_{}", delta_relation_symbol),
                )?;
                self.conn.commit()?;
            } else {
                self.conn.execute(
                    Tag::MatNonrec,
                    &format!(
                        "INSERT INTO {} SELECT * FROM {} EXCEPT SELECT * FROM {}",
                        delta_relation_symbol, eval_table, delta_relation_symbol
                    ),
                )?;
                self.conn.commit()?;
            }

            self.conn
                .execute(Tag::MatNonrec, &format!("DELETE FROM {}", eval_table))?;
            self.conn.commit()?;
        }

        Ok(())
    }

    pub(crate) fn materialize_recursive_delta_program(
        &mut self,
        recursive_program: &Program,
    ) -> Result<(), EvalError> {
        let mut eval_relations: IndexSet<String> = IndexSet::new();

        for rule in &recursive_program.inner {
            RuleEvaluator::new(&mut self.conn, rule).step()?;
            eval_relations.insert(rule.head.symbol.clone());
        }

        for (idx, delta_relation_symbol) in eval_relations.iter().enumerate() {
            let relation_symbol = strip_delta_prefixes(delta_relation_symbol).to_string();
            let eval_table = format!("{}{}", DELTA_PREFIX, delta_relation_symbol);
            let diff_table = format!("DIFF_{}", eval_table);
            let defs = self.column_defs(&relation_symbol)?;

            self.conn.execute(
                Tag::MatRec,
                &format!("CREATE TABLE {} ({})", diff_table, defs),
            )?;
            self.conn.commit()?;

            // Truly new facts: derived this round, not in the last delta,
            // not already known.
            self.conn.execute(
                Tag::MatRec,
                &format!(
                    "INSERT INTO {} SELECT * FROM (SELECT * FROM {} EXCEPT SELECT * FROM {}) EXCEPT SELECT * FROM {}",
                    diff_table, eval_table, delta_relation_symbol, relation_symbol
                ),
            )?;
            self.conn.execute(
                Tag::MatRec,
                &format!(
                    "INSERT INTO {} SELECT * FROM {}",
                    relation_symbol, diff_table
                ),
            )?;

            if idx == 0 {
                self.conn.execute(
                    Tag::MatRec,
                    &format!("DROP TABLE {}", delta_relation_symbol),
                )?;
                self.conn.commit()?;
                self.conn.execute(
                    Tag::MatRec,
                    &format!("CREATE TABLE {} ({})", delta_relation_symbol, defs),
                )?;
                self.conn.commit()?;
            }
            self.conn.execute(
                Tag::MatRec,
                &format!(
                    "INSERT INTO {} SELECT * FROM {}",
                    delta_relation_symbol, diff_table
                ),
            )?;

            self.conn
                .execute(Tag::MatRec, &format!("DELETE FROM {}", eval_table))?;
            self.conn
                .execute(Tag::MatRec, &format!("DROP TABLE {}", diff_table))?;
            self.conn.commit()?;
        }

        Ok(())
    }

    fn drain_deltas(&mut self) -> Result<(), EvalError> {
        let delta_relations: Vec<String> = self.delta_relations.iter().cloned().collect();

        for delta_relation in &delta_relations {
            let relation = strip_delta_prefixes(delta_relation);
            self.conn.execute(
                Tag::Drain,
                &format!(
                    "INSERT INTO {} SELECT * FROM {} EXCEPT SELECT * FROM {}",
                    relation, delta_relation, relation
                ),
            )?;
            self.conn
                .execute(Tag::Drain, &format!("DELETE FROM {}", delta_relation))?;
            self.conn.commit()?;
        }

        Ok(())
    }

    /// Materializes the fixed point of the program over whatever facts the
    /// database currently holds, then closes the session. Afterwards every
    /// ordinary relation contains its saturated extension and every delta
    /// relation is empty.
    pub fn poll(&mut self) -> Result<(), EvalError> {
        let initial_fact_count = self.total_fact_count()?;
        debug!(initial_fact_count, "poll started");

        if initial_fact_count > 0 {
            // Seed the deltas from the pre-existing facts.
            let relations: Vec<String> = self.relations.iter().cloned().collect();
            for relation in &relations {
                self.conn.execute(
                    Tag::CompilerInit,
                    &format!(
                        "INSERT INTO {}{} SELECT * FROM {}",
                        DELTA_PREFIX, relation, relation
                    ),
                )?;
            }
            self.conn.commit()?;

            let nonrecursive = self.nonrecursive_delta_program.clone();
            let recursive = self.recursive_delta_program.clone();
            semi_naive_evaluation(self, &nonrecursive, &recursive)?;

            self.drain_deltas()?;
        }

        let final_fact_count = self.total_fact_count()?;
        debug!(final_fact_count, "poll finished");

        self.conn.close()
    }

    /// The per-statement trace gathered during `poll`.
    pub fn dump_benchmark(&self) -> &[StatementRecord] {
        self.conn.statements()
    }
}
