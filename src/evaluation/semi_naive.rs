use crate::engine::datalog::SqlRuntime;
use crate::engine::error::EvalError;
use crate::engine::sql_channel::SqlChannel;
use datalog_syntax::Program;
use tracing::debug;

/// One nonrecursive pass, then recursive passes until the total row count
/// across the ordinary relations stops growing. The count is a safe
/// termination key only because rows are added monotonically and
/// deduplicated.
pub fn semi_naive_evaluation<C: SqlChannel>(
    runtime: &mut SqlRuntime<C>,
    nonrecursive_program: &Program,
    recursive_program: &Program,
) -> Result<(), EvalError> {
    runtime.increment_iter();
    runtime.materialize_nonrecursive_delta_program(nonrecursive_program)?;

    loop {
        runtime.increment_iter();
        let previous_facts_count = runtime.total_fact_count()?;
        runtime.materialize_recursive_delta_program(recursive_program)?;
        let current_facts_count = runtime.total_fact_count()?;

        let new_fact_count = current_facts_count - previous_facts_count;
        debug!(new_fact_count, "recursive pass complete");

        if new_fact_count == 0 {
            return Ok(());
        }
    }
}
