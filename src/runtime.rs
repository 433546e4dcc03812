//! Runtime for executing calls
//!
//! One task per call owns the state and runs the transition loop. Backend
//! requests, speech, timers and capture run in spawned tasks and report back
//! as events; presentation subscribes to a broadcast of [`CallUpdate`]s.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use crate::state_machine::CallUpdate;
pub use executor::CallRuntime;
pub use traits::*;

use crate::backend::HttpBackend;
use crate::session::{CallRecord, HistoryEntry};
use crate::speech::{FallbackSpeechOutput, LineCapture};
use crate::state_machine::Event;
use crate::store::LocalStore;
use tokio::sync::{broadcast, mpsc};
use tokio_util::task::TaskTracker;

/// Type alias for the terminal runtime with concrete implementations
pub type ProductionRuntime =
    CallRuntime<HttpBackend, LineCapture, FallbackSpeechOutput<HttpBackend>, LocalStore>;

/// Handle to interact with a running call
#[derive(Clone)]
pub struct CallHandle {
    pub(crate) event_tx: mpsc::Sender<Event>,
    pub(crate) updates: broadcast::Sender<CallUpdate>,
}

impl CallHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<CallUpdate> {
        self.updates.subscribe()
    }

    /// Returns `false` once the call is gone
    pub async fn send(&self, event: Event) -> bool {
        self.event_tx.send(event).await.is_ok()
    }

    pub async fn end_call(&self) -> bool {
        self.send(Event::EndCall).await
    }

    pub async fn toggle_mute(&self) -> bool {
        self.send(Event::ToggleMute).await
    }

    pub async fn resume_listening(&self) -> bool {
        self.send(Event::ResumeListening).await
    }

    /// Push the target duration out by one extension
    pub async fn extend(&self) -> bool {
        self.send(Event::ExtendDuration).await
    }
}

/// Outcome of a finished call
pub struct CallReport {
    pub record: Option<CallRecord>,
    /// `None` when the local write failed
    pub entry: Option<HistoryEntry>,
    /// Detached persistence still in flight; closed, ready to `wait()` on
    pub pending: TaskTracker,
}
