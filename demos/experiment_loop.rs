//! Experiment Loop Example
//!
//! Simulates a human-in-the-loop optimization run on a two-objective toy
//! problem: an optimizer thread proposes batches while evaluation worker
//! threads measure them and record the results as they finish. The table is
//! saved to Parquet and reopened at the end.
//!
//! Run with: RUST_LOG=info cargo run --example experiment_loop

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use mobo_db::agent::{Agent, TABLE};
use mobo_db::store::MemoryStore;
use mobo_db::{Field, ProblemDescriptor};
use rand::Rng;
use tracing_subscriber::EnvFilter;

const N_INIT: usize = 8;
const N_BATCHES: usize = 4;
const BATCH_SIZE: usize = 3;
const N_WORKERS: usize = 3;

/// Two conflicting objectives over x in [0, 1]^2
fn evaluate(x: &[f64]) -> Vec<f64> {
    let f1 = x[0];
    let g = 1.0 + 9.0 * x[1];
    let f2 = g * (1.0 - (f1 / g).sqrt());
    vec![f1, f2]
}

fn random_design(rng: &mut impl Rng) -> Vec<f64> {
    vec![rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== mobo-db Experiment Loop ===\n");

    let problem: ProblemDescriptor =
        serde_json::from_str(r#"{"n_var": 2, "n_obj": 2, "ref_point": [1.1, 10.0]}"#)?;
    let agent = Arc::new(Agent::initialize(Arc::new(MemoryStore::new()), problem.clone())?);

    // -------------------------------------------------------------------------
    // 1. Initial design
    // -------------------------------------------------------------------------
    let mut rng = rand::thread_rng();
    let x_init: Vec<Vec<f64>> = (0..N_INIT).map(|_| random_design(&mut rng)).collect();
    let y_init: Vec<Vec<f64>> = x_init.iter().map(|x| evaluate(x)).collect();
    agent.seed(&x_init, &y_init)?;
    println!("1. Seeded {N_INIT} initial samples");

    // -------------------------------------------------------------------------
    // 2. Evaluation workers
    // -------------------------------------------------------------------------
    let (tx, rx) = mpsc::channel::<(u64, Vec<f64>)>();
    let rx = Arc::new(parking_lot::Mutex::new(rx));

    let workers: Vec<_> = (0..N_WORKERS)
        .map(|worker| {
            let agent = Arc::clone(&agent);
            let rx = Arc::clone(&rx);
            thread::spawn(move || -> mobo_db::Result<usize> {
                let mut done = 0;
                loop {
                    let job = rx.lock().recv();
                    let Ok((row_id, x)) = job else { break };

                    // Simulated measurement time
                    thread::sleep(Duration::from_millis(5 * (row_id % 4)));
                    let summary = agent.record(&[evaluate(&x)], &[row_id])?;
                    println!(
                        "   worker {worker}: row {row_id} recorded, hv = {:.4}, pareto = {:?}",
                        summary.hv, summary.pareto_rows
                    );
                    done += 1;
                }
                Ok(done)
            })
        })
        .collect();

    // -------------------------------------------------------------------------
    // 3. Optimizer proposes batches
    // -------------------------------------------------------------------------
    println!("\n2. Proposing {N_BATCHES} batches of {BATCH_SIZE}...");
    for config_id in 0..N_BATCHES {
        let x: Vec<Vec<f64>> = (0..BATCH_SIZE).map(|_| random_design(&mut rng)).collect();
        // A deliberately noisy surrogate
        let expected: Vec<Vec<f64>> = x
            .iter()
            .map(|x| evaluate(x).into_iter().map(|v| v + rng.gen_range(-0.1..0.1)).collect())
            .collect();
        let uncertainty = vec![vec![0.1, 0.1]; BATCH_SIZE];

        let config_id = i64::try_from(config_id)?;
        let rowids = agent.propose(&x, &expected, &uncertainty, config_id)?;
        println!("   batch {}: rows {rowids:?}", agent.next_batch_id() - 1);

        for (row_id, x) in rowids.into_iter().zip(x) {
            tx.send((row_id, x)).context("evaluation workers stopped")?;
        }
    }
    drop(tx);

    let mut recorded = 0;
    for worker in workers {
        recorded += worker
            .join()
            .map_err(|_| anyhow::anyhow!("worker panicked"))??;
    }
    println!("\n3. Workers recorded {recorded} evaluations");

    // -------------------------------------------------------------------------
    // 4. Inspect the front
    // -------------------------------------------------------------------------
    let sel = agent.query(&[Field::Y, Field::IsPareto, Field::PredError], true)?;
    println!("\n4. Pareto front:");
    for ((row_id, y), pareto) in sel
        .row_ids()
        .iter()
        .zip(sel.matrix(Field::Y)?)
        .zip(sel.bools(Field::IsPareto)?)
    {
        if pareto {
            println!("   row {row_id:>2}: f1 = {:.3}, f2 = {:.3}", y[0], y[1]);
        }
    }

    // -------------------------------------------------------------------------
    // 5. Save, reopen, continue
    // -------------------------------------------------------------------------
    let path = std::env::temp_dir().join("mobo_db_experiment_loop.parquet");
    agent.store().save_parquet(TABLE, &path)?;

    let reopened = Agent::initialize(Arc::new(MemoryStore::load_parquet(TABLE, &path)?), problem)?;
    println!(
        "\n5. Reopened from {}: {} rows, {:?} initial, next batch {}",
        path.display(),
        reopened.n_rows()?,
        reopened.n_init_sample(),
        reopened.next_batch_id()
    );

    std::fs::remove_file(&path).ok();
    println!("\n=== Done ===");
    Ok(())
}
