//! Trait abstractions for runtime I/O
//!
//! The backend and speech seams live with their adapters; this module adds
//! the local call history so the executor can be tested without a database.

pub use crate::backend::ConversationService;
pub use crate::speech::{SpeechCapture, SpeechOutput};

use crate::session::{CallRecord, HistoryEntry};
use crate::store::{LocalStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// Local record of finished calls
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Store `record` as the last call result and add one history entry
    async fn record_call(&self, record: &CallRecord) -> Result<HistoryEntry, StoreError>;
}

#[async_trait]
impl HistoryStore for LocalStore {
    async fn record_call(&self, record: &CallRecord) -> Result<HistoryEntry, StoreError> {
        LocalStore::record_call(self, record)
    }
}

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn record_call(&self, record: &CallRecord) -> Result<HistoryEntry, StoreError> {
        (**self).record_call(record).await
    }
}
