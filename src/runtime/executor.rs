//! Session runtime executor

use super::traits::ConversationGateway;
use super::{Envelope, SessionUpdate};

use crate::booking::Booking;
use crate::state_machine::{transition, Effect, Event, SessionContext, ViewState};
use crate::transcript::{Message, Transcript};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Owns one session: its view state, transcript and in-flight work
pub struct SessionRuntime<G>
where
    G: ConversationGateway + 'static,
{
    context: SessionContext,
    state: ViewState,
    transcript: Transcript,
    gateway: Arc<G>,
    /// Bumped on every reset; results tagged with an older value are dropped
    generation: u64,
    event_rx: mpsc::Receiver<Envelope>,
    event_tx: mpsc::Sender<Envelope>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
}

impl<G> SessionRuntime<G>
where
    G: ConversationGateway + 'static,
{
    pub(crate) fn new(
        context: SessionContext,
        gateway: Arc<G>,
        event_rx: mpsc::Receiver<Envelope>,
        event_tx: mpsc::Sender<Envelope>,
        broadcast_tx: broadcast::Sender<SessionUpdate>,
    ) -> Self {
        Self {
            context,
            state: ViewState::default(),
            transcript: Transcript::new(),
            gateway,
            generation: 0,
            event_rx,
            event_tx,
            broadcast_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        while let Some(Envelope { generation, event }) = self.event_rx.recv().await {
            if generation.is_some_and(|g| g != self.generation) {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    event = event.name(),
                    "Dropping result from before reset"
                );
                continue;
            }
            self.process_event(event);
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let event_name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Transition errors are user-facing (e.g. "still waiting for a reply")
                tracing::warn!(
                    session_id = %self.context.session_id,
                    state = self.state.name(),
                    event = event_name,
                    error = %e,
                    "Event rejected"
                );
                self.publish(SessionUpdate::Error {
                    message: e.to_string(),
                });
                return;
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state.name() != self.state.name() {
            tracing::info!(
                session_id = %self.context.session_id,
                from = old_state.name(),
                to = self.state.name(),
                "State changed"
            );
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.publish(SessionUpdate::State {
            state: self.state.clone(),
        });
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { role, content } => {
                let message = Message::new(role, content);
                self.transcript.push(message.clone());
                self.publish(SessionUpdate::Message { message });
            }

            Effect::RequestReply => {
                let gateway = self.gateway.clone();
                let history = self.transcript.to_history();
                self.spawn_task(async move {
                    match gateway.reply(&history).await {
                        Ok(text) => Event::ReplyReceived { text },
                        Err(e) => {
                            tracing::error!(error = %e, "Reply request failed");
                            Event::ReplyFailed {
                                message: e.to_string(),
                                kind: e.failure_kind(),
                            }
                        }
                    }
                });
            }

            Effect::RequestAnalysis => {
                let gateway = self.gateway.clone();
                let transcript = self.transcript.flatten();
                tracing::info!(
                    session_id = %self.context.session_id,
                    messages = self.transcript.len(),
                    "Requesting analysis"
                );
                self.spawn_task(async move {
                    match gateway.analyze(&transcript).await {
                        Ok(analysis) => Event::AnalysisComplete { analysis },
                        Err(e) => {
                            tracing::error!(error = %e, "Analysis request failed");
                            Event::AnalysisFailed {
                                message: e.to_string(),
                                kind: e.failure_kind(),
                            }
                        }
                    }
                });
            }

            Effect::ClearSession => {
                self.transcript.clear();
                self.generation += 1;
                self.publish(SessionUpdate::Cleared);
            }

            Effect::ScheduleMatch { delay } => {
                self.spawn_task(async move {
                    tokio::time::sleep(delay).await;
                    Event::MatchFound {
                        booking: Booking::placeholder(),
                    }
                });
            }

            Effect::SchedulePaymentSettlement { delay } => {
                self.spawn_task(async move {
                    tokio::time::sleep(delay).await;
                    Event::PaymentSettled
                });
            }
        }
    }

    /// Run `work` in the background and feed its event back, tagged with the
    /// current generation
    fn spawn_task<F>(&self, work: F)
    where
        F: std::future::Future<Output = Event> + Send + 'static,
    {
        let event_tx = self.event_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let event = work.await;
            let _ = event_tx
                .send(Envelope {
                    generation: Some(generation),
                    event,
                })
                .await;
        });
    }

    fn publish(&self, update: SessionUpdate) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(update);
    }
}
