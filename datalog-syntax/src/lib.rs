use ordered_float::OrderedFloat;
use std::fmt::{Debug, Display, Formatter};

#[derive(Eq, Ord, PartialEq, PartialOrd, Clone, Hash)]
pub enum TypedValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Float(OrderedFloat<f64>),
}

impl Debug for TypedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Str(x) => Debug::fmt(x, f),
            TypedValue::Int(x) => Debug::fmt(x, f),
            TypedValue::Bool(x) => Debug::fmt(x, f),
            TypedValue::Float(x) => Debug::fmt(x, f),
        }
    }
}

impl Display for TypedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Str(x) => write!(f, "{}", x),
            TypedValue::Int(x) => write!(f, "{}", x),
            TypedValue::Bool(x) => write!(f, "{}", x),
            TypedValue::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::Str(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::Str(value.to_string())
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Int(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Bool(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Float(OrderedFloat(value))
    }
}

pub type Variable = String;

#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash)]
pub enum Term {
    Variable(String),
    Constant(TypedValue),
}

impl Debug for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Variable(x) => Debug::fmt(x, f),
            Term::Constant(x) => Debug::fmt(x, f),
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "?{}", name),
            Term::Constant(value) => write!(f, "{}", value),
        }
    }
}

/// Turns a loosely typed value into a term: a string beginning with `?` is a
/// variable, everything else a constant.
pub fn create_term(value: impl Into<TypedValue>) -> Term {
    match value.into() {
        TypedValue::Str(inner) => match inner.strip_prefix('?') {
            Some(name) => Term::Variable(name.to_string()),
            None => Term::Constant(TypedValue::Str(inner)),
        },
        constant => Term::Constant(constant),
    }
}

#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash)]
pub struct Atom {
    pub terms: Vec<Term>,
    pub symbol: String,
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", &self.symbol)?;

        for (index, term) in self.terms.iter().enumerate() {
            write!(f, "{}", term)?;
            if index < self.terms.len() - 1 {
                write!(f, ", ")?;
            }
        }

        write!(f, ")")
    }
}

impl Debug for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

pub fn create_atom(symbol: &str, values: Vec<TypedValue>) -> Atom {
    Atom {
        symbol: symbol.to_string(),
        terms: values.into_iter().map(create_term).collect(),
    }
}

#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<Atom>,
    pub id: usize,
}

impl Rule {
    /// Factory mirroring textual rule notation, e.g.
    /// `Rule::create("T", vec!["?x".into(), "?z".into()], vec![("E", ...), ("T", ...)])`.
    pub fn create(
        head_symbol: &str,
        head: Vec<TypedValue>,
        body: Vec<(&str, Vec<TypedValue>)>,
    ) -> Self {
        Rule {
            head: create_atom(head_symbol, head),
            body: body
                .into_iter()
                .map(|(symbol, values)| create_atom(symbol, values))
                .collect(),
            id: 0,
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.head)?;
        write!(f, " <- [")?;
        for (index, atom) in self.body.iter().enumerate() {
            write!(f, "{}", atom)?;
            if index < self.body.len() - 1 {
                write!(f, ", ")?;
            }
        }

        write!(f, "]")
    }
}

impl Debug for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone, Hash, Default)]
pub struct Program {
    pub inner: Vec<Rule>,
}

impl From<Vec<Rule>> for Program {
    fn from(value: Vec<Rule>) -> Self {
        let mut val = value;
        // The serialization is the canonical sort key; the index it induces
        // is the tie-breaker for every downstream algorithm.
        val.sort_by_cached_key(|rule| rule.to_string());
        for (id, rule) in val.iter_mut().enumerate() {
            rule.id = id;
        }

        Self { inner: val }
    }
}
