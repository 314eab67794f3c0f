//! Fire-and-forget mail dispatch
//!
//! Flows hand messages to a bounded queue and return immediately. A single
//! background worker drains the queue into the configured [`Mailer`].
//! Nothing here ever fails a request: a full or closed queue and delivery
//! errors are logged and dropped.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::mailer::{MailMessage, Mailer};

/// Default queue capacity
pub const DEFAULT_MAIL_QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct MailDispatcher {
    tx: mpsc::Sender<MailMessage>,
}

impl MailDispatcher {
    /// Start the worker. It runs until every dispatcher clone is dropped.
    pub fn spawn<M>(mailer: M, capacity: usize) -> (Self, JoinHandle<()>)
    where
        M: Mailer + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<MailMessage>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let kind = message.kind();
                let to = message.recipient().to_string();
                match mailer.send(message).await {
                    Ok(()) => tracing::debug!(kind, to = %to, "Mail delivered"),
                    Err(e) => tracing::warn!(kind, to = %to, error = %e, "Mail delivery failed"),
                }
            }
            tracing::debug!("Mail worker stopped");
        });

        (Self { tx }, worker)
    }

    /// Queue a message without waiting
    pub fn dispatch(&self, message: MailMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::warn!(
                    kind = message.kind(),
                    to = %message.recipient(),
                    "Mail queue full, message dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                tracing::warn!(
                    kind = message.kind(),
                    to = %message.recipient(),
                    "Mail worker gone, message dropped"
                );
            }
        }
    }
}
