use std::sync::Arc;
use std::thread;
use std::time::Instant;
use ticket_mpmc::{Queue, SpinPriority};

const MESSAGES: usize = 1_000_000;
const BUFFER_SIZE: usize = 1024;

fn main() {
    println!("Ticket MPMC Performance Test");
    println!("============================\n");

    for priority in [SpinPriority::Low, SpinPriority::Medium, SpinPriority::High] {
        println!("Priority {:?}", priority);
        for (producers, consumers) in [(1, 1), (4, 1), (1, 4), (4, 4)] {
            let start = Instant::now();
            run(producers, consumers, priority);
            let elapsed = start.elapsed();
            let throughput = MESSAGES as f64 / elapsed.as_secs_f64();
            println!(
                "  {}p/{}c: {:?}, {:.2} msgs/sec, {:.0} ns/op",
                producers,
                consumers,
                elapsed,
                throughput,
                elapsed.as_nanos() as f64 / MESSAGES as f64
            );
        }
        println!();
    }
}

fn run(producers: usize, consumers: usize, priority: SpinPriority) {
    let queue = Arc::new(Queue::with_priority(BUFFER_SIZE, priority));
    let per_producer = MESSAGES / producers;

    let readers: Vec<_> = (0..consumers)
        .map(|_| {
            let q = queue.clone();
            thread::spawn(move || q.incoming().count())
        })
        .collect();

    let writers: Vec<_> = (0..producers)
        .map(|_| {
            let q = queue.clone();
            thread::spawn(move || {
                for i in 0..per_producer {
                    q.push(i).unwrap();
                }
            })
        })
        .collect();

    for w in writers {
        w.join().unwrap();
    }
    queue.close();

    let received: usize = readers.into_iter().map(|r| r.join().unwrap()).sum();
    assert_eq!(received, per_producer * producers);
}
