use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use ticket_mpmc::{ClosedError, Queue, SpinPriority};

#[test]
fn test_basic_push_pop() {
    let queue = Queue::new(8);

    queue.push(42).unwrap();
    assert_eq!(queue.pop(), Some(42));
}

#[test]
fn test_fifo_order() {
    let queue = Queue::new(16);

    for i in 0..10 {
        queue.push(i).unwrap();
    }

    for i in 0..10 {
        assert_eq!(queue.pop(), Some(i));
    }
}

#[test]
fn test_non_power_of_two_capacity() {
    let queue = Queue::new(3);

    for round in 0..5 {
        for i in 0..3 {
            queue.push(round * 10 + i).unwrap();
        }
        for i in 0..3 {
            assert_eq!(queue.pop(), Some(round * 10 + i));
        }
    }
}

#[test]
fn test_close_drain_sequence() {
    let queue = Queue::new(1);

    queue.push(1).unwrap();
    assert!(!queue.is_empty());
    assert_eq!(queue.pop(), Some(1));
    assert!(queue.is_empty());
    assert!(!queue.is_drained());

    queue.push(2).unwrap();
    queue.close();

    assert_eq!(queue.pop(), Some(2));
    assert!(queue.is_empty());
    assert!(queue.is_drained());
    assert_eq!(queue.push(3), Err(ClosedError(3)));
}

#[test]
fn test_empty_after_drain_is_stable() {
    let queue: Queue<u32> = Queue::new(4);
    queue.close();

    let start = Instant::now();
    for _ in 0..10_000 {
        assert_eq!(queue.pop(), None);
    }
    assert!(queue.is_drained());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_backpressure_capacity_one() {
    let queue = Arc::new(Queue::with_priority(1, SpinPriority::High));
    queue.push(1).unwrap();

    let pushed = Arc::new(AtomicBool::new(false));
    let q = queue.clone();
    let flag = pushed.clone();
    let blocked = thread::spawn(move || {
        q.push(2).unwrap();
        flag.store(true, Ordering::SeqCst);
    });

    thread::sleep(Duration::from_millis(50));
    assert!(!pushed.load(Ordering::SeqCst), "push into a full queue returned");

    assert_eq!(queue.pop(), Some(1));
    blocked.join().unwrap();
    assert!(pushed.load(Ordering::SeqCst));
    assert_eq!(queue.pop(), Some(2));
}

#[test]
fn test_close_releases_blocked_pop() {
    let queue: Arc<Queue<u32>> = Arc::new(Queue::new(4));
    let q = queue.clone();
    let reader = thread::spawn(move || q.pop());

    thread::sleep(Duration::from_millis(20));
    queue.close();
    assert_eq!(reader.join().unwrap(), None);
}

#[test]
fn test_spsc_threaded() {
    let queue = Arc::new(Queue::new(128));
    let q_send = queue.clone();
    let q_recv = queue.clone();

    let producer = thread::spawn(move || {
        for i in 0..1000 {
            q_send.push(i).unwrap();
        }
        q_send.close();
    });

    let consumer = thread::spawn(move || {
        for i in 0..1000 {
            assert_eq!(q_recv.pop(), Some(i));
        }
        assert_eq!(q_recv.pop(), None);
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}

#[test]
fn test_mpsc_preserves_producer_order() {
    const PRODUCERS: usize = 4;
    const MESSAGES_PER_PRODUCER: usize = 500;

    let queue = Arc::new(Queue::new(16));
    let mut handles = vec![];

    for p in 0..PRODUCERS {
        let q = queue.clone();
        handles.push(thread::spawn(move || {
            for i in 0..MESSAGES_PER_PRODUCER {
                q.push((p, i)).unwrap();
            }
        }));
    }

    let q = queue.clone();
    let consumer = thread::spawn(move || {
        let mut last = [None::<usize>; PRODUCERS];
        let mut received = 0;
        for (p, i) in q.incoming() {
            assert!(last[p].map_or(true, |prev| prev < i), "producer {p} out of order");
            last[p] = Some(i);
            received += 1;
        }
        received
    });

    for h in handles {
        h.join().unwrap();
    }
    queue.close();

    assert_eq!(consumer.join().unwrap(), PRODUCERS * MESSAGES_PER_PRODUCER);
}

#[test]
fn test_global_fifo_across_producers() {
    const PRODUCERS: usize = 4;
    const TOTAL_MESSAGES: usize = 2000;

    let queue = Arc::new(Queue::with_priority(4, SpinPriority::High));
    // Item `i` may only be pushed once the push of `i - 1` has returned, so
    // write tickets are issued in item order even though producers rotate.
    let turn = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let q = queue.clone();
            let turn = turn.clone();
            thread::spawn(move || {
                for i in (p..TOTAL_MESSAGES).step_by(PRODUCERS) {
                    while turn.load(Ordering::Acquire) != i {
                        thread::yield_now();
                    }
                    q.push(i).unwrap();
                    turn.store(i + 1, Ordering::Release);
                }
            })
        })
        .collect();

    let q = queue.clone();
    let consumer = thread::spawn(move || q.incoming().collect::<Vec<_>>());

    for p in producers {
        p.join().unwrap();
    }
    queue.close();

    assert_eq!(consumer.join().unwrap(), (0..TOTAL_MESSAGES).collect::<Vec<_>>());
}

#[test]
fn test_spmc_each_consumer_sees_increasing_values() {
    const CONSUMERS: usize = 4;
    const TOTAL_MESSAGES: usize = 4000;

    let queue = Arc::new(Queue::new(32));
    let q = queue.clone();
    let producer = thread::spawn(move || {
        for i in 0..TOTAL_MESSAGES {
            q.push(i).unwrap();
        }
        q.close();
    });

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = queue.clone();
            thread::spawn(move || {
                let seen: Vec<usize> = q.incoming().collect();
                assert!(seen.windows(2).all(|w| w[0] < w[1]));
                seen
            })
        })
        .collect();

    producer.join().unwrap();
    let mut all: Vec<usize> = consumers
        .into_iter()
        .flat_map(|c| c.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..TOTAL_MESSAGES).collect::<Vec<_>>());
}

#[test]
fn test_no_loss_no_duplication() {
    const PRODUCERS: usize = 8;
    const CONSUMERS: usize = 4;
    const MESSAGES_PER_PRODUCER: usize = 500;

    let queue = Arc::new(Queue::with_priority(8, SpinPriority::Low));
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let q = queue.clone();
            thread::spawn(move || {
                for i in 0..MESSAGES_PER_PRODUCER {
                    q.push(p * MESSAGES_PER_PRODUCER + i).unwrap();
                }
            })
        })
        .collect();

    let received = Arc::new(Mutex::new(Vec::new()));
    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = queue.clone();
            let received = received.clone();
            thread::spawn(move || {
                let mut local = vec![];
                while !q.is_drained() {
                    if let Some(v) = q.pop() {
                        local.push(v);
                    }
                }
                received.lock().unwrap().extend(local);
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    queue.close();
    for c in consumers {
        c.join().unwrap();
    }

    let mut received = Arc::try_unwrap(received).unwrap().into_inner().unwrap();
    received.sort_unstable();
    assert_eq!(received, (0..PRODUCERS * MESSAGES_PER_PRODUCER).collect::<Vec<_>>());
}

#[test]
fn test_high_concurrency_accounting() {
    const PRODUCERS: usize = 20;
    const CONSUMERS: usize = 10;
    const SAMPLES: usize = 1000;

    let queue = Arc::new(Queue::new(100));
    let counts: Arc<Vec<AtomicUsize>> =
        Arc::new((0..PRODUCERS).map(|_| AtomicUsize::new(0)).collect());
    let pops = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|tag| {
            let q = queue.clone();
            thread::spawn(move || {
                for _ in 0..SAMPLES {
                    q.push(tag).unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = queue.clone();
            let counts = counts.clone();
            let pops = pops.clone();
            thread::spawn(move || {
                while !q.is_drained() {
                    if let Some(tag) = q.pop() {
                        counts[tag].fetch_add(1, Ordering::Relaxed);
                        pops.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    queue.close();
    for c in consumers {
        c.join().unwrap();
    }

    assert_eq!(pops.load(Ordering::Relaxed), PRODUCERS * SAMPLES);
    for count in counts.iter() {
        assert_eq!(count.load(Ordering::Relaxed), SAMPLES);
    }
}

#[test]
fn test_mixed_blocking_and_try_operations() {
    const PER_SIDE: usize = 2000;

    let queue = Arc::new(Queue::with_priority(4, SpinPriority::High));
    let q1 = queue.clone();
    let q2 = queue.clone();

    let blocking = thread::spawn(move || {
        for i in 0..PER_SIDE {
            q1.push(i).unwrap();
        }
    });
    let non_blocking = thread::spawn(move || {
        for i in PER_SIDE..2 * PER_SIDE {
            let mut item = i;
            while let Err(e) = q2.try_push(item) {
                item = e.into_inner();
                thread::yield_now();
            }
        }
    });

    let mut seen = HashMap::new();
    while seen.len() < 2 * PER_SIDE {
        let item = if seen.len() % 2 == 0 {
            queue.pop()
        } else {
            queue.try_pop()
        };
        if let Some(v) = item {
            assert!(seen.insert(v, ()).is_none(), "duplicate {v}");
        }
    }

    blocking.join().unwrap();
    non_blocking.join().unwrap();
    assert!(queue.is_empty());
}

#[test]
fn test_reopen_after_drain() {
    let queue = Arc::new(Queue::new(2));
    queue.close();
    assert_eq!(queue.pop(), None::<u32>);

    queue.reopen();
    let q = queue.clone();
    let reader = thread::spawn(move || q.pop());
    thread::sleep(Duration::from_millis(10));
    queue.push(9).unwrap();
    assert_eq!(reader.join().unwrap(), Some(9));
}

#[test]
fn test_drop_elements() {
    static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug)]
    struct DropCounter;

    impl Drop for DropCounter {
        fn drop(&mut self) {
            DROP_COUNT.fetch_add(1, Ordering::Relaxed);
        }
    }

    {
        let queue = Queue::new(8);
        for _ in 0..5 {
            queue.push(DropCounter).unwrap();
        }
        drop(queue.pop());
        assert_eq!(DROP_COUNT.load(Ordering::Relaxed), 1);
    }

    assert_eq!(DROP_COUNT.load(Ordering::Relaxed), 5);
}

#[test]
fn test_wrap_around() {
    let queue = Queue::new(8);

    for round in 0..10 {
        for i in 0..8 {
            queue.push(round * 100 + i).unwrap();
        }
        for i in 0..8 {
            assert_eq!(queue.pop(), Some(round * 100 + i));
        }
    }
}

#[test]
fn test_closed_error_returns_value() {
    let queue = Queue::new(2);
    queue.close();

    match queue.push("late".to_string()) {
        Err(ClosedError(value)) => assert_eq!(value, "late"),
        _ => panic!("Expected ClosedError"),
    }
}

#[test]
#[should_panic(expected = "capacity must be greater than 0")]
fn test_zero_capacity_panics() {
    let _queue = Queue::<i32>::new(0);
}
