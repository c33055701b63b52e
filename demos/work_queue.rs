use std::sync::Arc;
use std::thread;
use std::time::Duration;
use ticket_mpmc::{Queue, QueueConfig, SpinPriority};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Work Queue Example\n");

    const NUM_WORKERS: usize = 4;
    const NUM_JOBS: usize = 20;

    let config: QueueConfig = serde_json::from_str(r#"{"capacity": 8, "priority": "low"}"#)
        .expect("valid queue config");
    let jobs: Arc<Queue<String>> = Arc::new(Queue::from_config(&config).expect("valid queue config"));
    let results = Arc::new(Queue::with_priority(NUM_JOBS, SpinPriority::Low));

    let jobs_tx = jobs.clone();
    let producer = thread::spawn(move || {
        for i in 0..NUM_JOBS {
            let job = format!("Job-{:02}", i);
            jobs_tx.push(job.clone()).unwrap();
            info!(%job, "enqueued");
        }
        jobs_tx.close();
    });

    let mut workers = vec![];
    for worker_id in 0..NUM_WORKERS {
        let jobs_rx = jobs.clone();
        let results_tx = results.clone();

        workers.push(thread::spawn(move || {
            let mut processed = 0;
            for job in jobs_rx.incoming() {
                info!(worker_id, %job, "processing");
                thread::sleep(Duration::from_millis(20));
                results_tx
                    .push(format!("{} -> completed by worker {}", job, worker_id))
                    .unwrap();
                processed += 1;
            }
            info!(worker_id, processed, "worker finished");
        }));
    }

    producer.join().unwrap();
    for worker in workers {
        worker.join().unwrap();
    }
    results.close();

    let collected: Vec<String> = results.incoming().collect();
    for result in &collected {
        println!("Result: {}", result);
    }
    assert_eq!(collected.len(), NUM_JOBS);
    println!("\nAll {} results collected", collected.len());
}
