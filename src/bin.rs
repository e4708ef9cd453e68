use datalog_rule_macro::program;
use datalog_syntax::*;
use sql_datalog::engine::datalog::SqlRuntime;
use sql_datalog::engine::error::EvalError;
use sql_datalog::engine::loader::{create_relation, load_edge_list};
use sql_datalog::engine::sql_channel::{SqlChannel, SqliteChannel};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// TC benchmark: load an edge list, saturate the transitive closure through
// the SQL back-end, report timings.
//
//   benches <edge-file> [db-path] [trace-json-path]

fn main() -> Result<(), EvalError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let input_path = args.next().unwrap_or_else(|| "data/graph_dense.txt".to_string());
    let db_path = args.next().unwrap_or_else(|| "tc_bench.db".to_string());
    let trace_path = args.next();

    let _ = std::fs::remove_file(&db_path);

    let program = program! {
        T(?x, ?y) <- [E(?x, ?y)],
        T(?x, ?z) <- [T(?x, ?y), E(?y, ?z)]
    };

    let contents = std::fs::read_to_string(&input_path)?;
    let mut setup = SqliteChannel::open(&db_path)?;
    create_relation(&mut setup, "E", 2)?;
    create_relation(&mut setup, "T", 2)?;
    let loaded = load_edge_list(&mut setup, "E", &contents)?;
    setup.close()?;
    drop(setup);
    println!("loaded edges: {}", loaded);

    let channel = SqliteChannel::open(&db_path)?;
    let mut runtime = SqlRuntime::new(channel, &program, 1)?;

    let now = Instant::now();
    runtime.poll()?;
    println!("poll: {} ms", now.elapsed().as_millis());

    let mut check = SqliteChannel::open(&db_path)?;
    let rows = check.execute("SELECT COUNT(*) FROM T")?;
    let inferred = rows.first().and_then(|row| row.first()).copied().unwrap_or(0);
    println!("inferred tuples: {}", inferred);

    if let Some(trace_path) = trace_path {
        let trace = serde_json::to_string_pretty(runtime.dump_benchmark()).unwrap();
        std::fs::write(&trace_path, trace)?;
        println!("trace written to {}", trace_path);
    }

    Ok(())
}
