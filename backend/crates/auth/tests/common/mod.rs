//! Test doubles shared by the integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use auth::domain::mailer::{MailError, MailMessage, Mailer};

/// Mailer that keeps every message it was asked to send
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[allow(dead_code)]
impl RecordingMailer {
    /// Wait until at least `count` messages were delivered
    pub async fn wait_for(&self, count: usize) -> Vec<MailMessage> {
        for _ in 0..400 {
            {
                let sent = self.sent.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} mails, got {}", self.sent.lock().unwrap().len());
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}
