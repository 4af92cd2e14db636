//! Serialized access to one conversation.
//!
//! The orchestrator lives on a single worker task; callers submit texts
//! through an mpsc channel and await their reply on a oneshot. Turns are
//! processed strictly in submission order, one at a time.

use chord_core::{ChordError, DebugInfo, InferenceBackend, Orchestrator, TurnOutcome};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Command {
    Turn {
        text: String,
        reply: oneshot::Sender<Result<TurnOutcome, ChordError>>,
    },
    Debug {
        reply: oneshot::Sender<Result<DebugInfo, ChordError>>,
    },
    Reset {
        reply: oneshot::Sender<Result<(), ChordError>>,
    },
}

#[derive(Debug)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("conversation worker has stopped")
    }
}

impl std::error::Error for QueueClosed {}

#[derive(Clone)]
pub struct ConversationQueue {
    tx: mpsc::Sender<Command>,
}

impl ConversationQueue {
    /// Move an initialized orchestrator onto its own worker task.
    pub fn spawn<B, R>(mut orchestrator: Orchestrator<B, R>, capacity: usize) -> (Self, JoinHandle<()>)
    where
        B: InferenceBackend + 'static,
        R: Rng + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Turn { text, reply } => {
                        let _ = reply.send(orchestrator.process_turn(&text).await);
                    }
                    Command::Debug { reply } => {
                        let _ = reply.send(orchestrator.debug_info());
                    }
                    Command::Reset { reply } => {
                        let _ = reply.send(orchestrator.reset());
                    }
                }
            }
            tracing::debug!("conversation queue drained");
        });
        (Self { tx }, handle)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, QueueClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| QueueClosed)?;
        rx.await.map_err(|_| QueueClosed)
    }

    pub async fn submit(&self, text: &str) -> Result<Result<TurnOutcome, ChordError>, QueueClosed> {
        let text = text.to_string();
        self.request(|reply| Command::Turn { text, reply }).await
    }

    pub async fn debug_info(&self) -> Result<Result<DebugInfo, ChordError>, QueueClosed> {
        self.request(|reply| Command::Debug { reply }).await
    }

    pub async fn reset(&self) -> Result<Result<(), ChordError>, QueueClosed> {
        self.request(|reply| Command::Reset { reply }).await
    }
}
