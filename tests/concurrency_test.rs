//! Concurrent access tests
//!
//! Evaluation workers record on blocking tasks while the optimizer proposes
//! and readers query. Every committed state must look like some serial order
//! of the calls.

use std::sync::Arc;

use mobo_db::agent::Agent;
use mobo_db::metrics::{pareto_mask, Hypervolume};
use mobo_db::store::MemoryStore;
use mobo_db::{Field, ProblemDescriptor};
use tokio::task;

const REF: [f64; 2] = [20.0, 20.0];

fn seeded_agent() -> Arc<Agent<MemoryStore>> {
    let problem = ProblemDescriptor::new(1, 2).with_ref_point(REF.to_vec());
    let agent = Agent::initialize(Arc::new(MemoryStore::new()), problem).unwrap();
    agent
        .seed(&[vec![0.0], vec![1.0]], &[vec![2.0, 15.0], vec![15.0, 2.0]])
        .unwrap();
    Arc::new(agent)
}

#[allow(clippy::cast_precision_loss)]
fn measurement(row_id: u64) -> Vec<f64> {
    let t = (row_id % 13) as f64;
    vec![3.0 + t, 16.0 - t]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_on_disjoint_rows() {
    let agent = seeded_agent();
    let n = 32;
    let x = vec![vec![0.5]; n];
    let e = vec![vec![5.0, 5.0]; n];
    let rowids = agent.propose(&x, &e, &e, 1).unwrap();

    let handles: Vec<_> = rowids
        .iter()
        .map(|&row_id| {
            let agent = Arc::clone(&agent);
            task::spawn_blocking(move || agent.record(&[measurement(row_id)], &[row_id]))
        })
        .collect();

    let mut summaries = Vec::new();
    for handle in handles {
        summaries.push(handle.await.unwrap().unwrap());
    }

    // Every recorded row is visible
    let sel = agent.query(&[Field::Y, Field::IsPareto, Field::Hv], true).unwrap();
    assert_eq!(sel.num_rows(), n + 2);

    // The last committed record saw every measurement
    let y = sel.matrix(Field::Y).unwrap();
    let final_hv = Hypervolume::new(REF.to_vec()).compute(&y);
    let max_stamped = summaries.iter().map(|s| s.hv).fold(f64::MIN, f64::max);
    assert!((max_stamped - final_hv).abs() < 1e-9);
    assert!(summaries.iter().any(|s| s.n_valid == n + 2));

    // Pareto flags describe the final front
    assert_eq!(sel.bools(Field::IsPareto).unwrap(), pareto_mask(&y));

    // Each record saw a distinct number of valid rows: the calls serialized
    let mut n_valid: Vec<usize> = summaries.iter().map(|s| s.n_valid).collect();
    n_valid.sort_unstable();
    assert_eq!(n_valid, (3..=n + 2).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_proposals_get_disjoint_ids() {
    let agent = seeded_agent();

    let handles: Vec<_> = (0..16)
        .map(|config_id| {
            let agent = Arc::clone(&agent);
            task::spawn_blocking(move || {
                let x = vec![vec![0.5]; 3];
                let e = vec![vec![5.0, 5.0]; 3];
                agent.propose(&x, &e, &e, config_id).unwrap()
            })
        })
        .collect();

    let mut all_ids = Vec::new();
    for handle in handles {
        let ids = handle.await.unwrap();
        // Ids of one call are contiguous
        assert_eq!(ids[2] - ids[0], 2);
        all_ids.extend(ids);
    }

    all_ids.sort_unstable();
    assert_eq!(all_ids, (3..=50).collect::<Vec<u64>>());
    assert_eq!(agent.next_batch_id(), 17);

    // Batch ids were handed out once each
    let batches = agent.query(&[Field::BatchId], false).unwrap();
    let mut batch_ids: Vec<i64> = batches
        .integers(Field::BatchId)
        .unwrap()
        .into_iter()
        .flatten()
        .filter(|&b| b > 0)
        .collect();
    batch_ids.dedup();
    assert_eq!(batch_ids.len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_partial_records() {
    let agent = seeded_agent();
    let x = vec![vec![0.5]; 20];
    let e = vec![vec![5.0, 5.0]; 20];
    let rowids = agent.propose(&x, &e, &e, 1).unwrap();

    let writer = {
        let agent = Arc::clone(&agent);
        task::spawn_blocking(move || {
            for &row_id in &rowids {
                agent.record(&[measurement(row_id)], &[row_id]).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let agent = Arc::clone(&agent);
            task::spawn_blocking(move || {
                for _ in 0..50 {
                    let sel = agent.query(&[Field::Y, Field::IsPareto], true).unwrap();
                    let y = sel.matrix(Field::Y).unwrap();
                    // Flags always match the front of what the reader sees
                    assert_eq!(sel.bools(Field::IsPareto).unwrap(), pareto_mask(&y));
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
