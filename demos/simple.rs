//! Simple usage example

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use ticket_mpmc::Queue;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Ticket MPMC - Simple Example\n");

    // Create a queue with 4 slots
    let queue = Arc::new(Queue::new(4));

    let producer_queue = queue.clone();
    let consumer_queue = queue.clone();

    // Producer thread: blocks whenever all 4 slots are taken
    let producer = thread::spawn(move || {
        for i in 0..10 {
            let message = format!("Message {}", i);
            println!("Sending: {}", message);
            producer_queue.push(message).unwrap();
        }
        producer_queue.close();
        println!("Producer finished!");
    });

    // Consumer thread: stops once the queue is closed and empty
    let consumer = thread::spawn(move || {
        for message in consumer_queue.incoming() {
            println!("Received: {}", message);
            thread::sleep(Duration::from_millis(50));
        }
        println!("Consumer finished!");
    });

    producer.join().unwrap();
    consumer.join().unwrap();

    if let Err(err) = queue.push("too late".to_string()) {
        println!("\nPush after close rejected: {}", err);
        println!("Returned item: {:?}", err.into_inner());
    }
}
