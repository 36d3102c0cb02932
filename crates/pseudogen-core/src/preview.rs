//! # Preview Scheduling
//!
//! Edits can trigger previews faster than the service answers them. Every
//! trigger takes a ticket from a monotonically increasing counter, waits out
//! the debounce delay, and is abandoned if a newer ticket was issued in the
//! meantime. A response is only applied if its ticket is still the newest
//! when it arrives, so a slow early request can never overwrite a later one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::client::{GeneratorClient, DEFAULT_PREVIEW_ROWS};
use crate::model::RuleFile;
use crate::wire::PreviewResult;

/// Delay between the last edit and the preview request.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A preview request ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct PreviewScheduler {
    latest: AtomicU64,
    debounce: Duration,
}

impl Default for PreviewScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl PreviewScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            latest: AtomicU64::new(0),
            debounce,
        }
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debounce
    }

    /// Take a new ticket, superseding every earlier one.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Wait out the debounce delay. Returns `false` if `token` was superseded
    /// while waiting and the request should not be sent.
    pub async fn debounce(&self, token: RequestToken) -> bool {
        tokio::time::sleep(self.debounce).await;
        self.is_current(token)
    }

    /// Keep `result` only if `token` is still the newest ticket.
    pub fn accept<T>(&self, token: RequestToken, result: T) -> Option<T> {
        if self.is_current(token) {
            Some(result)
        } else {
            tracing::debug!("Discarding stale preview response #{}", token.0);
            None
        }
    }
}

/// A generator client paired with a scheduler and a row cap.
#[derive(Debug)]
pub struct PreviewSession {
    client: GeneratorClient,
    scheduler: PreviewScheduler,
    row_cap: u64,
}

impl PreviewSession {
    pub fn new(client: GeneratorClient, debounce: Duration) -> Self {
        Self {
            client,
            scheduler: PreviewScheduler::new(debounce),
            row_cap: DEFAULT_PREVIEW_ROWS,
        }
    }

    pub fn with_row_cap(mut self, row_cap: u64) -> Self {
        self.row_cap = row_cap;
        self
    }

    pub fn scheduler(&self) -> &PreviewScheduler {
        &self.scheduler
    }

    /// Debounced preview of a snapshot of the rule file.
    ///
    /// Returns `None` when a later call superseded this one, either before
    /// the request was sent or before its response arrived.
    pub async fn request(&self, rule_file: &RuleFile) -> Option<PreviewResult> {
        let token = self.scheduler.issue();
        if !self.scheduler.debounce(token).await {
            tracing::debug!("Preview #{} superseded before sending", token.value());
            return None;
        }
        let result = self.client.preview(rule_file, self.row_cap).await;
        self.scheduler.accept(token, result)
    }

    /// Preview immediately, without debounce or ticketing.
    pub async fn request_now(&self, rule_file: &RuleFile) -> PreviewResult {
        self.client.preview(rule_file, self.row_cap).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_tokens_increase_and_supersede() {
        let scheduler = PreviewScheduler::default();
        let first = scheduler.issue();
        let second = scheduler.issue();
        assert!(second > first);
        assert!(!scheduler.is_current(first));
        assert!(scheduler.is_current(second));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let scheduler = PreviewScheduler::default();
        let slow = scheduler.issue();
        let fast = scheduler.issue();
        assert_eq!(scheduler.accept(fast, "second"), Some("second"));
        assert_eq!(scheduler.accept(slow, "first"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_drops_superseded_request() {
        let scheduler = Arc::new(PreviewScheduler::new(Duration::from_millis(300)));

        let first = scheduler.issue();
        let waiting = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.debounce(first).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = scheduler.issue();

        assert!(!waiting.await.unwrap());
        assert!(scheduler.debounce(second).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_waits_full_delay() {
        let scheduler = PreviewScheduler::new(Duration::from_millis(300));
        let start = tokio::time::Instant::now();
        let token = scheduler.issue();
        assert!(scheduler.debounce(token).await);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_returns_none_when_superseded() {
        let client = GeneratorClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let session = Arc::new(PreviewSession::new(client, Duration::from_millis(300)));
        let empty = RuleFile::new();

        let earlier = {
            let session = Arc::clone(&session);
            let rf = empty.clone();
            tokio::spawn(async move { session.request(&rf).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let later = session.request(&empty).await;

        assert!(earlier.await.unwrap().is_none());
        // No columns: answered locally, so no network is needed here.
        let later = later.unwrap();
        assert_eq!(later.message, "Add columns to see preview");
    }
}
