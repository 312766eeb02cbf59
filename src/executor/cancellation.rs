//! Call cancellation tracking and management.
//!
//! Every call dispatched through
//! [`RequestExecutor::execute_with_handle`](super::RequestExecutor::execute_with_handle)
//! races its network wait against a [`CallHandle`]. Cancelling the handle
//! drops the in-flight dispatch, so the call fails with
//! [`CallError::Cancelled`](super::CallError::Cancelled) and its post-call
//! hook never runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Notify;
use uuid::Uuid;

/// A handle to a running call that can be cancelled.
///
/// Clones share the cancellation state.
#[derive(Debug, Clone)]
pub struct CallHandle {
    /// Identifier of the call this handle controls.
    pub call_id: String,

    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CallHandle {
    /// Creates a new handle with a generated UUID.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Creates a new handle for a specific call ID.
    pub fn with_id(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Checks if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Requests cancellation and wakes every task waiting on
    /// [`cancelled`](Self::cancelled).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Completes once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed.
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CallHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types for cancellation operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CancelError {
    /// No active call with the given ID.
    #[error("call not found: {0}")]
    NotFound(String),

    /// Failed to acquire lock on tracker.
    #[error("lock error: {0}")]
    LockError(String),
}

/// Tracks in-flight calls and manages cancellation.
#[derive(Debug, Default)]
pub struct CallTracker {
    active_calls: HashMap<String, CallHandle>,

    /// Call IDs by registration time (oldest first).
    call_order: Vec<String>,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call for tracking and returns its ID.
    pub fn register(&mut self, handle: CallHandle) -> String {
        let call_id = handle.call_id.clone();
        self.call_order.retain(|id| id != &call_id);
        self.call_order.push(call_id.clone());
        self.active_calls.insert(call_id.clone(), handle);
        call_id
    }

    /// Removes a call from tracking (called when the call completes).
    ///
    /// Returns `true` if the call was being tracked.
    pub fn unregister(&mut self, call_id: &str) -> bool {
        if let Some(pos) = self.call_order.iter().position(|id| id == call_id) {
            self.call_order.remove(pos);
        }

        self.active_calls.remove(call_id).is_some()
    }

    /// Cancels a specific call by ID and stops tracking it.
    pub fn cancel(&mut self, call_id: &str) -> Result<(), CancelError> {
        let handle = self
            .active_calls
            .get(call_id)
            .ok_or_else(|| CancelError::NotFound(call_id.to_string()))?;

        handle.cancel();
        self.unregister(call_id);

        Ok(())
    }

    /// Cancels the most recently registered call and returns its ID.
    pub fn cancel_most_recent(&mut self) -> Result<String, CancelError> {
        let call_id = self
            .call_order
            .last()
            .ok_or_else(|| CancelError::NotFound("no active calls".to_string()))?
            .clone();

        self.cancel(&call_id)?;
        Ok(call_id)
    }

    pub fn active_count(&self) -> usize {
        self.active_calls.len()
    }

    /// IDs of all active calls, oldest first.
    pub fn active_call_ids(&self) -> Vec<String> {
        self.call_order.clone()
    }

    pub fn is_active(&self, call_id: &str) -> bool {
        self.active_calls.contains_key(call_id)
    }
}

/// Thread-safe wrapper around CallTracker.
#[derive(Debug, Clone, Default)]
pub struct SharedCallTracker {
    inner: Arc<Mutex<CallTracker>>,
}

impl SharedCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tracker<T>(&self, f: impl FnOnce(&mut CallTracker) -> T) -> Result<T, CancelError> {
        let mut tracker = self
            .inner
            .lock()
            .map_err(|e| CancelError::LockError(e.to_string()))?;
        Ok(f(&mut tracker))
    }

    pub fn register(&self, handle: CallHandle) -> Result<String, CancelError> {
        self.with_tracker(|t| t.register(handle))
    }

    pub fn unregister(&self, call_id: &str) -> Result<bool, CancelError> {
        self.with_tracker(|t| t.unregister(call_id))
    }

    pub fn cancel(&self, call_id: &str) -> Result<(), CancelError> {
        self.with_tracker(|t| t.cancel(call_id))?
    }

    pub fn cancel_most_recent(&self) -> Result<String, CancelError> {
        self.with_tracker(|t| t.cancel_most_recent())?
    }

    pub fn active_count(&self) -> Result<usize, CancelError> {
        self.with_tracker(|t| t.active_count())
    }

    pub fn active_call_ids(&self) -> Result<Vec<String>, CancelError> {
        self.with_tracker(|t| t.active_call_ids())
    }

    pub fn is_active(&self, call_id: &str) -> Result<bool, CancelError> {
        self.with_tracker(|t| t.is_active(call_id))
    }

    /// Poisons the inner lock so every later operation fails.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let inner = Arc::clone(&self.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock();
            panic!("poisoning call tracker");
        })
        .join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_call_handle_creation() {
        let handle = CallHandle::new();
        assert!(Uuid::parse_str(&handle.call_id).is_ok());
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_call_handle_clones_share_state() {
        let handle = CallHandle::with_id("call-1");
        let clone = handle.clone();

        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let handle = CallHandle::with_id("call-1");
        let waiter = handle.clone();

        let task = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("cancellation was not observed")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let handle = CallHandle::with_id("call-1");
        handle.cancel();

        tokio::time::timeout(Duration::from_millis(100), handle.cancelled())
            .await
            .unwrap();
    }

    #[test]
    fn test_tracker_register_and_unregister() {
        let mut tracker = CallTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let id = tracker.register(CallHandle::with_id("call-1"));

        assert_eq!(id, "call-1");
        assert!(tracker.is_active("call-1"));

        assert!(tracker.unregister("call-1"));
        assert!(!tracker.unregister("call-1"));
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_tracker_cancel_marks_handle() {
        let mut tracker = CallTracker::new();
        let handle = CallHandle::with_id("call-1");
        tracker.register(handle.clone());

        tracker.cancel("call-1").unwrap();
        assert!(handle.is_cancelled());
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_tracker_cancel_nonexistent() {
        let mut tracker = CallTracker::new();
        assert!(matches!(
            tracker.cancel("nonexistent"),
            Err(CancelError::NotFound(_))
        ));
    }

    #[test]
    fn test_tracker_cancel_most_recent() {
        let mut tracker = CallTracker::new();
        tracker.register(CallHandle::with_id("call-1"));
        tracker.register(CallHandle::with_id("call-2"));
        tracker.register(CallHandle::with_id("call-3"));

        assert_eq!(tracker.cancel_most_recent().unwrap(), "call-3");
        assert_eq!(tracker.cancel_most_recent().unwrap(), "call-2");
        assert_eq!(tracker.active_call_ids(), vec!["call-1"]);
    }

    #[test]
    fn test_tracker_cancel_most_recent_empty() {
        let mut tracker = CallTracker::new();
        assert!(matches!(
            tracker.cancel_most_recent(),
            Err(CancelError::NotFound(_))
        ));
    }

    #[test]
    fn test_shared_tracker() {
        let tracker = SharedCallTracker::new();

        tracker.register(CallHandle::with_id("call-1")).unwrap();
        tracker.register(CallHandle::with_id("call-2")).unwrap();
        assert_eq!(tracker.active_count().unwrap(), 2);

        tracker.cancel("call-1").unwrap();
        assert!(!tracker.is_active("call-1").unwrap());
        assert!(tracker.is_active("call-2").unwrap());

        assert_eq!(tracker.cancel_most_recent().unwrap(), "call-2");
        assert_eq!(tracker.active_count().unwrap(), 0);
    }
}
