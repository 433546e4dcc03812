//! Tutor Call - voice conversation practice with an AI language tutor
//!
//! A call is a pure state machine over [`state_machine::CallState`], driven
//! by [`runtime::CallRuntime`] which executes its effects against the remote
//! tutor service, speech adapters and the local store.

pub mod backend;
pub mod config;
pub mod console;
pub mod persona;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod speech;
pub mod state_machine;
pub mod store;
