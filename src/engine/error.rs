use thiserror::Error;

/// Everything that can go wrong while compiling or evaluating a program.
/// Shape errors surface before any SQL is issued; SQL errors abort the poll
/// with whatever partial state the database holds.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("sql execution failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("head variable ?{variable} of rule `{rule}` is not bound in its body")]
    RangeRestriction { rule: String, variable: String },
    #[error("relation {relation} used with arity {found}, previously seen with arity {expected}")]
    ArityMismatch {
        relation: String,
        expected: usize,
        found: usize,
    },
    #[error("unknown relation {0}")]
    UnknownRelation(String),
    #[error("malformed input line: {0}")]
    MalformedLine(String),
    #[error("symbol {0} begins with the reserved delta marker")]
    ReservedSymbol(String),
}
