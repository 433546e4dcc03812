//! Call session state machine
//!
//! Elm-architecture core: a pure transition function over an explicit call
//! phase, with all I/O described as effects for the runtime to execute.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{CallUpdate, Effect};
pub use event::Event;
pub use state::{CallContext, CallPhase, CallState, Subtitle};
pub use transition::{relisten_delay, transition, TransitionError, TransitionResult};
