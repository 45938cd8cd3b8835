//! Stats command implementation.

use resync_engine::{QueueStats, SyncTaskQueue};
use serde::Serialize;
use std::path::Path;

/// Queue statistics report.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    /// Queue directory.
    pub path: String,
    /// Queue counters.
    #[serde(flatten)]
    pub stats: QueueStats,
    /// Entities with resident tasks, and how many each has.
    pub entities: Vec<(String, usize)>,
    /// Creation time of the oldest pending task, in Unix millis.
    pub oldest_pending_ms: Option<u64>,
}

/// Builds the report for an open queue.
pub fn collect(path: &Path, queue: &SyncTaskQueue) -> StatsReport {
    let mut entities: Vec<(String, usize)> = Vec::new();
    for task in queue.all() {
        match entities.iter_mut().find(|(e, _)| *e == task.entity) {
            Some((_, count)) => *count += 1,
            None => entities.push((task.entity, 1)),
        }
    }
    entities.sort();

    StatsReport {
        path: path.display().to_string(),
        stats: queue.stats(),
        entities,
        oldest_pending_ms: queue.pending().first().map(|t| t.created_at),
    }
}

/// Runs the stats command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let queue = super::open_existing(path)?;
    let report = collect(path, &queue);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &StatsReport) {
    println!("Queue: {}", report.path);
    println!();
    println!("Tasks:");
    println!("  Resident:  {}", report.stats.total);
    println!("  Pending:   {}", report.stats.pending);
    println!("  In flight: {}", report.stats.in_flight);
    println!("  Failed:    {}", report.stats.failed);
    println!("  Completed: {} (since open)", report.stats.completed);

    if let Some(oldest) = report.oldest_pending_ms {
        println!("  Oldest pending created at: {oldest}");
    }

    if !report.entities.is_empty() {
        println!();
        println!("Entities:");
        for (entity, count) in &report.entities {
            println!("  {entity}: {count}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_engine::{Operation, Payload, TaskOptions};

    #[test]
    fn counts_per_entity() {
        let queue = SyncTaskQueue::in_memory();
        for entity in ["notes", "members", "notes"] {
            queue
                .enqueue(entity, Operation::Create, Payload::default(), TaskOptions::default())
                .unwrap();
        }

        let report = collect(Path::new("/tmp/q"), &queue);
        assert_eq!(report.stats.pending, 3);
        assert_eq!(
            report.entities,
            vec![("members".to_string(), 1), ("notes".to_string(), 2)]
        );
        assert!(report.oldest_pending_ms.is_some());
    }
}
