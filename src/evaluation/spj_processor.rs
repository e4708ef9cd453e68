use crate::engine::error::EvalError;
use crate::engine::profiler::{ConnectionProfiler, Tag};
use crate::engine::sql_channel::SqlChannel;
use crate::helpers::helpers::{strip_delta_prefixes, DELTA_PREFIX};
use datalog_syntax::{Rule, Term, TypedValue, Variable};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

// Lowers one rule into a linear SPJ (Select, Project, Join) plan and executes
// it against the SQL channel through temporary tables.

pub type Column = usize;
pub type Value = TypedValue;
pub type Symbol = String;

#[derive(PartialEq, Debug, Clone)]
pub enum ProjectionInput {
    Column(Column),
    Value(Value),
}

#[derive(PartialEq, Debug, Clone)]
pub enum Instruction {
    Move(Symbol),
    Select(Symbol, Column, Value),
    Project(Symbol, Vec<ProjectionInput>),
    Join(Symbol, Symbol, Vec<(usize, usize)>),
}

#[derive(PartialEq, Debug, Clone)]
pub struct Stack {
    pub inner: Vec<Instruction>,
}

fn stringify_selection(selection: &Instruction) -> String {
    match selection {
        Instruction::Select(symbol, column, value) => {
            format!("{}_{}eq{}", symbol, column, value)
        }
        _ => unreachable!(),
    }
}

fn stringify_join(join: &Instruction) -> String {
    match join {
        Instruction::Join(left_symbol, right_symbol, join_keys) => {
            let join_keys_format = join_keys
                .iter()
                .map(|(left_column, right_column)| format!("{}eq{}", left_column, right_column))
                .collect::<Vec<_>>()
                .join("_");

            format!("{}_{}_{}", left_symbol, right_symbol, join_keys_format)
        }
        _ => unreachable!(),
    }
}

// Only the first constant of an atom is lifted into a selection; any further
// constant positions are left to the join and projection logic.
fn get_selection(symbol: &str, terms: &[Term]) -> Option<Instruction> {
    terms
        .iter()
        .enumerate()
        .find_map(|(idx, term)| match term {
            Term::Constant(value) => Some(Instruction::Select(
                symbol.to_string(),
                idx,
                value.clone(),
            )),
            Term::Variable(_) => None,
        })
}

fn get_variables(terms: &[Term]) -> IndexMap<Variable, usize> {
    terms
        .iter()
        .enumerate()
        .filter_map(|(idx, term)| match term {
            Term::Variable(name) => Some((name.clone(), idx)),
            Term::Constant(_) => None,
        })
        .collect()
}

fn get_join(
    left_terms: &[Term],
    right_terms: &[Term],
    left_symbol: &str,
    right_symbol: &str,
) -> Option<Instruction> {
    let left_variable_map = get_variables(left_terms);
    let right_variable_map = get_variables(right_terms);

    let mut join_keys = vec![];

    for (variable_name, left_position) in left_variable_map {
        if let Some(right_position) = right_variable_map.get(&variable_name) {
            join_keys.push((left_position, *right_position));
        }
    }

    if !join_keys.is_empty() {
        return Some(Instruction::Join(
            left_symbol.to_string(),
            right_symbol.to_string(),
            join_keys,
        ));
    }

    None
}

fn get_projection(rule: &Rule) -> Instruction {
    let projection_variable_targets: IndexSet<String> = rule
        .head
        .terms
        .iter()
        .filter_map(|term| match term {
            Term::Variable(name) => Some(name.clone()),
            Term::Constant(_) => None,
        })
        .collect();

    let mut seen: IndexSet<String> = Default::default();
    let mut variable_location_assuming_joins_are_natural: IndexMap<Variable, usize> =
        Default::default();

    let mut position_assuming_joins_are_natural = 0;

    rule.body.iter().for_each(|body_atom| {
        body_atom.terms.iter().for_each(|term| {
            if let Term::Variable(name) = term {
                if !seen.contains(name) {
                    seen.insert(name.clone());

                    if projection_variable_targets.contains(name) {
                        variable_location_assuming_joins_are_natural
                            .insert(name.clone(), position_assuming_joins_are_natural);
                    }
                }
            }

            position_assuming_joins_are_natural += 1;
        });
    });

    let projection = rule
        .head
        .terms
        .iter()
        .map(|term| match term {
            Term::Variable(name) => ProjectionInput::Column(
                *variable_location_assuming_joins_are_natural
                    .get(name)
                    .unwrap(),
            ),
            Term::Constant(value) => ProjectionInput::Value(value.clone()),
        })
        .collect();

    Instruction::Project(rule.head.symbol.clone(), projection)
}

impl From<Rule> for Stack {
    fn from(rule: Rule) -> Self {
        let mut operations = vec![];

        let mut body_iter = rule.body.iter().peekable();
        let mut last_join_result_name: Option<String> = None;
        let mut last_join_terms: Vec<Term> = vec![];
        while let Some(current_atom) = body_iter.next() {
            if let Some(next_atom) = body_iter.peek() {
                let mut left_symbol = current_atom.symbol.clone();
                let mut left_terms = current_atom.terms.clone();
                let mut right_symbol = next_atom.symbol.clone();
                let right_terms = &next_atom.terms;

                if last_join_result_name.is_none() {
                    if let Some(selection) = get_selection(&left_symbol, &current_atom.terms) {
                        left_symbol = stringify_selection(&selection);
                        operations.push(selection);
                    } else {
                        operations.push(Instruction::Move(left_symbol.clone()));
                    }
                } else if let Some(previous_join_result) = &last_join_result_name {
                    left_symbol = previous_join_result.clone();
                    left_terms = last_join_terms.clone();
                }

                if let Some(selection) = get_selection(&right_symbol, right_terms) {
                    right_symbol = stringify_selection(&selection);
                    operations.push(selection);
                } else {
                    operations.push(Instruction::Move(right_symbol.clone()));
                }

                if let Some(binary_join) =
                    get_join(&left_terms, right_terms, &left_symbol, &right_symbol)
                {
                    last_join_result_name = Some(stringify_join(&binary_join));
                    last_join_terms = left_terms.clone();
                    last_join_terms.extend(right_terms.clone());

                    operations.push(binary_join);
                }
            } else {
                if operations.is_empty() {
                    operations.push(Instruction::Move(current_atom.symbol.clone()));
                }

                operations.push(get_projection(&rule));
            }
        }

        Stack { inner: operations }
    }
}

fn sql_literal(value: &TypedValue) -> String {
    match value {
        TypedValue::Str(inner) => format!("'{}'", inner.replace('\'', "''")),
        other => other.to_string(),
    }
}

/// Executes a single rule's plan over the SQL channel. Every intermediate is
/// materialized as an integer-typed temp table which is dropped before the
/// evaluator returns.
pub struct RuleEvaluator<'a, C: SqlChannel> {
    conn: &'a mut ConnectionProfiler<C>,
    rule: &'a Rule,
    rule_label: String,
    temp_tables: Vec<String>,
    // Relation name -> ordered column names, for the rule's base relations
    // and for the intermediates this evaluation creates.
    base_relations: HashMap<String, Vec<String>>,
    tmp_relations: HashMap<String, Vec<String>>,
}

impl<'a, C: SqlChannel> RuleEvaluator<'a, C> {
    pub fn new(conn: &'a mut ConnectionProfiler<C>, rule: &'a Rule) -> Self {
        let mut evaluator = Self {
            conn,
            rule,
            rule_label: rule.to_string(),
            temp_tables: vec![],
            base_relations: HashMap::new(),
            tmp_relations: HashMap::new(),
        };
        evaluator.gen_base_idx_list();

        evaluator
    }

    fn gen_base_idx_list(&mut self) {
        let head = &self.rule.head;
        self.base_relations.insert(
            head.symbol.to_string(),
            column_names(&head.symbol, head.terms.len()),
        );
        for body_atom in &self.rule.body {
            if self.base_relations.contains_key(&body_atom.symbol) {
                continue;
            }
            self.base_relations.insert(
                body_atom.symbol.clone(),
                column_names(&body_atom.symbol, body_atom.terms.len()),
            );
        }
    }

    fn get_idx_list(&self, relation: &str) -> Result<&Vec<String>, EvalError> {
        self.tmp_relations
            .get(relation)
            .or_else(|| self.base_relations.get(relation))
            .ok_or_else(|| EvalError::UnknownRelation(relation.to_string()))
    }

    fn create_alias_cols(&self, relation: &str, cols: usize) -> Vec<String> {
        (0..cols)
            .map(|i| format!("{}_{}_alias", relation, i))
            .collect()
    }

    fn execute(&mut self, tag: Tag, sql: &str) -> Result<(), EvalError> {
        self.conn.execute_labelled(tag, sql, &self.rule_label)?;
        Ok(())
    }

    fn create_temp_table(
        &mut self,
        tag: Tag,
        name: &str,
        columns: &[String],
    ) -> Result<(), EvalError> {
        let column_defs = columns
            .iter()
            .map(|column| format!("{} INTEGER", column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TABLE IF NOT EXISTS {} ({})", name, column_defs);
        self.execute(tag, &sql)?;
        self.conn.commit()?;

        self.temp_tables.push(name.to_string());

        Ok(())
    }

    pub fn step(mut self) -> Result<(), EvalError> {
        let stack = Stack::from(self.rule.clone());

        // A nonempty body yields at least two instructions: a Move or Select,
        // then the Projection. The penultimate one names the projection's
        // source. An empty body yields no instructions at all.
        let penultimate_operation = stack.inner.len().saturating_sub(2);
        let mut relation_symbol_to_be_projected = self.rule.head.symbol.clone();

        for (idx, operation) in stack.inner.iter().enumerate() {
            match operation {
                Instruction::Move(symbol) => {
                    if idx == penultimate_operation {
                        relation_symbol_to_be_projected = symbol.clone();
                    }
                }
                Instruction::Select(symbol, column, value) => {
                    let select_result_name = stringify_selection(operation);
                    if idx == penultimate_operation {
                        relation_symbol_to_be_projected = select_result_name.clone();
                    }

                    let select_cols = self.get_idx_list(symbol)?.clone();
                    self.create_temp_table(Tag::SpjSelect, &select_result_name, &select_cols)?;

                    let sql = format!(
                        "INSERT INTO {} SELECT * FROM {} WHERE {} = {}",
                        select_result_name,
                        symbol,
                        select_cols[*column],
                        sql_literal(value),
                    );
                    self.execute(Tag::SpjSelect, &sql)?;
                    self.conn.commit()?;

                    self.tmp_relations.insert(select_result_name, select_cols);
                }
                Instruction::Join(left_symbol, right_symbol, keys) => {
                    let join_result_name = stringify_join(operation);
                    if idx == penultimate_operation {
                        relation_symbol_to_be_projected = join_result_name.clone();
                    }

                    let left_cols = self.get_idx_list(left_symbol)?.clone();
                    let right_cols = self.get_idx_list(right_symbol)?.clone();
                    let alias_cols = self.create_alias_cols(right_symbol, right_cols.len());

                    let mut select_list = left_cols
                        .iter()
                        .map(|col| format!("X.{}", col))
                        .collect::<Vec<_>>();
                    select_list.extend(
                        right_cols
                            .iter()
                            .zip(alias_cols.iter())
                            .map(|(col, alias)| format!("Y.{} AS {}", col, alias)),
                    );

                    let condition_list = keys
                        .iter()
                        .map(|(left_key, right_key)| {
                            format!("X.{} = Y.{}", left_cols[*left_key], right_cols[*right_key])
                        })
                        .collect::<Vec<_>>()
                        .join(" AND ");

                    let mut join_cols = left_cols;
                    join_cols.extend(alias_cols);
                    self.create_temp_table(Tag::SpjJoin, &join_result_name, &join_cols)?;

                    let sql = format!(
                        "INSERT INTO {} SELECT {} FROM {} AS X JOIN {} AS Y ON {}",
                        join_result_name,
                        select_list.join(", "),
                        left_symbol,
                        right_symbol,
                        condition_list,
                    );
                    self.execute(Tag::SpjJoin, &sql)?;
                    self.conn.commit()?;

                    self.tmp_relations.insert(join_result_name, join_cols);
                }
                Instruction::Project(symbol, projection_inputs) => {
                    let projected_cols = self.get_idx_list(&relation_symbol_to_be_projected)?;

                    let column_list = projection_inputs
                        .iter()
                        .map(|projection_input| match projection_input {
                            ProjectionInput::Column(column) => projected_cols[*column].clone(),
                            ProjectionInput::Value(value) => sql_literal(value),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");

                    let sql = format!(
                        "INSERT INTO {}{} SELECT DISTINCT {} FROM {}",
                        DELTA_PREFIX, symbol, column_list, relation_symbol_to_be_projected,
                    );
                    self.execute(Tag::SpjProject, &sql)?;
                    self.conn.commit()?;
                }
            }
        }

        // Identical selections register the same temp table twice; dropping
        // goes through a set.
        let drops: IndexSet<String> = self
            .temp_tables
            .drain(..)
            .map(|table_name| format!("DROP TABLE {}", table_name))
            .collect();
        for drop in drops {
            self.execute(Tag::SpjClear, &drop)?;
        }
        self.conn.commit()?;

        Ok(())
    }
}

fn column_names(symbol: &str, arity: usize) -> Vec<String> {
    let base = strip_delta_prefixes(symbol);
    (0..arity).map(|i| format!("{}_{}", base, i)).collect()
}
