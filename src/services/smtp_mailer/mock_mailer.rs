use std::sync::Mutex;

use async_trait::async_trait;

use crate::services::smtp_mailer::{MailError, Mailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentInvite {
    pub to: String,
    pub workspace_name: String,
    pub role: String,
    pub invite_url: String,
}

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent_invites: Mutex<Vec<SentInvite>>,
    pub fail_send: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentInvite> {
        self.sent_invites
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_invite_email(
        &self,
        to: &str,
        workspace_name: &str,
        role: &str,
        invite_url: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::SendError("mock relay refused".into()));
        }
        self.sent_invites
            .lock()
            .map_err(|_| MailError::Other("mock mailer poisoned".into()))?
            .push(SentInvite {
                to: to.to_string(),
                workspace_name: workspace_name.to_string(),
                role: role.to_string(),
                invite_url: invite_url.to_string(),
            });
        Ok(())
    }
}
