//! Platform background-sync registration.

use parking_lot::Mutex;

/// Tag registered for deferred background sync.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Asks the platform to wake the application later for a background sync.
///
/// When the platform fires, the glue code calls
/// [`SyncCoordinator::on_background_sync`](crate::SyncCoordinator::on_background_sync).
pub trait BackgroundTrigger: Send + Sync {
    /// Registers a one-shot background sync under `tag`.
    ///
    /// # Errors
    ///
    /// Returns a description of why the platform refused.
    fn register(&self, tag: &str) -> Result<(), String>;
}

/// A background trigger that records registrations, for testing.
#[derive(Debug, Default)]
pub struct MockBackgroundTrigger {
    registrations: Mutex<Vec<String>>,
    refuse: Mutex<Option<String>>,
}

impl MockBackgroundTrigger {
    /// Creates a trigger that accepts every registration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every registration fail with `reason`.
    pub fn refuse_with(&self, reason: impl Into<String>) {
        *self.refuse.lock() = Some(reason.into());
    }

    /// Returns the tags registered so far.
    #[must_use]
    pub fn registrations(&self) -> Vec<String> {
        self.registrations.lock().clone()
    }
}

impl BackgroundTrigger for MockBackgroundTrigger {
    fn register(&self, tag: &str) -> Result<(), String> {
        if let Some(reason) = self.refuse.lock().clone() {
            return Err(reason);
        }
        self.registrations.lock().push(tag.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_refuses() {
        let trigger = MockBackgroundTrigger::new();
        trigger.register(BACKGROUND_SYNC_TAG).unwrap();
        assert_eq!(trigger.registrations(), vec![BACKGROUND_SYNC_TAG]);

        trigger.refuse_with("not supported");
        assert_eq!(
            trigger.register(BACKGROUND_SYNC_TAG),
            Err("not supported".to_string())
        );
        assert_eq!(trigger.registrations().len(), 1);
    }
}
