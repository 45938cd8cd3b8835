//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random queue workloads and remote
//! failures.

use proptest::prelude::*;
use resync_engine::{Operation, Payload};
use resync_net::Failure;

/// Strategy for generating valid entity names.
pub fn entity_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for one of a small set of entity names, so groups collide.
pub fn small_entity_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["members", "events", "notes", "tags"]).prop_map(String::from)
}

/// Strategy for operations.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Create),
        Just(Operation::Update),
        Just(Operation::Delete),
    ]
}

/// Strategy for payloads (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Payload> {
    prop::collection::vec(any::<u8>(), 0..256).prop_map(Payload::new)
}

/// Strategy for transport failures of every shape.
pub fn failure_strategy() -> impl Strategy<Value = Failure> {
    prop_oneof![
        (100u16..600).prop_map(|code| Failure::status(code, "")),
        "[a-z ]{0,24}".prop_map(Failure::connect),
        Just(Failure::Timeout),
        "[a-z ]{0,24}".prop_map(Failure::other),
    ]
}

/// Strategy for a batch of mutations to enqueue.
pub fn workload_strategy(
    max_len: usize,
) -> impl Strategy<Value = Vec<(String, Operation, Payload)>> {
    prop::collection::vec(
        (small_entity_strategy(), operation_strategy(), payload_strategy()),
        0..max_len,
    )
}
