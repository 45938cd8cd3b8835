//! Benchmark utilities for resync.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use resync_engine::{Operation, Payload, SyncTaskQueue, TaskOptions};

/// Generate random payload bytes of the specified size.
pub fn random_payload(size: usize) -> Payload {
    let mut rng = rand::thread_rng();
    Payload::new((0..size).map(|_| rng.gen::<u8>()).collect::<Vec<u8>>())
}

/// Entity names used to spread tasks over groups.
pub const ENTITIES: [&str; 4] = ["members", "events", "notes", "tags"];

/// Fill `queue` with `count` tasks spread over [`ENTITIES`].
pub fn fill(queue: &SyncTaskQueue, count: usize, payload_size: usize) {
    for i in 0..count {
        queue
            .enqueue(
                ENTITIES[i % ENTITIES.len()],
                Operation::Update,
                random_payload(payload_size),
                TaskOptions::default(),
            )
            .expect("enqueue");
    }
}
