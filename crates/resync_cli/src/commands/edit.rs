//! Commands that modify a queue.
//!
//! These run against a queue that no application currently holds open;
//! the directory lock rejects them otherwise. A change that could not be
//! saved is reported as an error, since it is lost when the process exits.

use resync_engine::{Operation, Payload, SyncTaskQueue, TaskOptions};
use std::path::Path;

/// Adds a task with a JSON payload.
pub fn enqueue(
    path: &Path,
    entity: &str,
    operation: Operation,
    payload: &str,
    max_attempts: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| format!("Invalid JSON payload: {e}"))?;
    let queue = super::open_or_create(path)?;
    let id = queue.enqueue(
        entity,
        operation,
        Payload::from_json(&value)?,
        TaskOptions::default().with_max_attempts(max_attempts),
    )?;
    ensure_durable(&queue)?;
    println!("{id}");
    Ok(())
}

/// Removes one task.
pub fn remove(path: &Path, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let queue = super::open_existing(path)?;
    if !queue.remove(id) {
        return Err(format!("No task with id {id}").into());
    }
    ensure_durable(&queue)?;
    println!("Removed {id}");
    Ok(())
}

/// Resets failed tasks to pending.
pub fn retry_failed(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let queue = super::open_existing(path)?;
    let reset = queue.reset_failed_to_pending();
    ensure_durable(&queue)?;
    println!("Reset {reset} failed task(s) to pending");
    Ok(())
}

/// Clears completed tasks, or every task.
pub fn clear(path: &Path, completed_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let queue = super::open_existing(path)?;
    let cleared = if completed_only {
        queue.clear_completed()
    } else {
        queue.clear_all()
    };
    ensure_durable(&queue)?;
    println!("Cleared {cleared} task(s)");
    Ok(())
}

/// Fails if the queue's last save did not reach storage.
pub fn ensure_durable(queue: &SyncTaskQueue) -> Result<(), Box<dyn std::error::Error>> {
    if queue.is_durable() {
        return Ok(());
    }
    tracing::error!("queue snapshot was not saved");
    Err("The change could not be saved to disk".into())
}
