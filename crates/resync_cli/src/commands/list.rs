//! List command implementation.

use resync_engine::{SyncTask, SyncTaskQueue};
use std::path::Path;

/// Selects tasks by state name (`pending`, `failed`, `all`).
pub fn select(queue: &SyncTaskQueue, state: &str) -> Result<Vec<SyncTask>, String> {
    match state {
        "pending" => Ok(queue.pending()),
        "failed" => Ok(queue.failed()),
        "all" => {
            let mut tasks = queue.all();
            tasks.sort_by_key(SyncTask::order_key);
            Ok(tasks)
        }
        other => Err(format!("unknown state filter: {other}")),
    }
}

/// Runs the list command.
pub fn run(path: &Path, state: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let queue = super::open_existing(path)?;
    let tasks = select(&queue, state)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&tasks)?),
        _ => print_text_output(&tasks),
    }
    Ok(())
}

fn print_text_output(tasks: &[SyncTask]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }

    println!(
        "{:<48} {:<16} {:<7} {:<9} {:>7}  LAST ERROR",
        "ID", "ENTITY", "OP", "STATE", "TRIES"
    );
    for task in tasks {
        let error = task
            .last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        println!(
            "{:<48} {:<16} {:<7} {:<9} {:>3}/{:<3}  {}",
            task.id.as_str(),
            task.entity,
            task.operation.as_str(),
            task.state.as_str(),
            task.attempt,
            task.max_attempts,
            error
        );
    }
    println!();
    println!("{} task(s)", tasks.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_engine::{Operation, Payload, TaskOptions};

    #[test]
    fn filters_by_state() {
        let queue = SyncTaskQueue::in_memory();
        queue
            .enqueue("a", Operation::Create, Payload::default(), TaskOptions::default())
            .unwrap();

        assert_eq!(select(&queue, "all").unwrap().len(), 1);
        assert_eq!(select(&queue, "pending").unwrap().len(), 1);
        assert!(select(&queue, "failed").unwrap().is_empty());
        assert!(select(&queue, "done").is_err());
    }
}
