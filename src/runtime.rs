//! Runtime for driving a session
//!
//! One task owns the view state and transcript, applies transitions and runs
//! their effects. Clients talk to it through a [`SessionHandle`].

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::state_machine::{Event, SessionContext, ViewState};
use crate::transcript::Message;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

const EVENT_BUFFER: usize = 32;
const UPDATE_BUFFER: usize = 128;

/// Update published to session subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// The state after a successful transition
    State { state: ViewState },
    /// A message was appended to the transcript
    Message { message: Message },
    /// Transcript and analysis were discarded
    Cleared,
    /// An event was rejected; the state is unchanged
    Error { message: String },
}

/// Event tagged with the session generation of the task that produced it.
/// Client events carry no generation and are never stale.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub generation: Option<u64>,
    pub event: Event,
}

#[derive(Debug, Error)]
#[error("Session runtime has stopped")]
pub struct SessionClosed;

/// Client side of a running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Envelope>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    pub async fn send(&self, event: Event) -> Result<(), SessionClosed> {
        self.event_tx
            .send(Envelope {
                generation: None,
                event,
            })
            .await
            .map_err(|_| SessionClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.broadcast_tx.subscribe()
    }
}

/// Start a session runtime on the current tokio runtime
pub fn spawn_session<G>(context: SessionContext, gateway: Arc<G>) -> SessionHandle
where
    G: ConversationGateway + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let (broadcast_tx, _) = broadcast::channel(UPDATE_BUFFER);

    let runtime = SessionRuntime::new(
        context,
        gateway,
        event_rx,
        event_tx.clone(),
        broadcast_tx.clone(),
    );
    tokio::spawn(runtime.run());

    SessionHandle {
        event_tx,
        broadcast_tx,
    }
}
