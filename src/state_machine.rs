//! Session view state machine
//!
//! Elm-style pure transitions: the runtime feeds events in and executes the
//! returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ErrorBanner, FailureKind, SessionContext, ViewState};
pub use transition::transition;
