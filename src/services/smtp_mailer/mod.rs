use std::fmt;

use async_trait::async_trait;
use lettre::address::AddressError;
use thiserror::Error;

mod mock_mailer;
mod smtp_impl;

#[allow(unused_imports)]
pub use mock_mailer::{MockMailer, SentInvite};
pub use smtp_impl::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid Address: {0}")]
    InvalidEmailAddress(String),
    #[error("Send error: {0}")]
    SendError(String),
    #[error("Error: {0}")]
    Other(String),
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invite_email(
        &self,
        to: &str,
        workspace_name: &str,
        role: &str,
        invite_url: &str,
    ) -> Result<(), MailError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    StartTls,
    Implicit,
    None,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::StartTls => "starttls",
            TlsMode::Implicit => "implicit_tls",
            TlsMode::None => "none",
        }
    }

    /// Unknown values fall back to STARTTLS.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "implicit" | "implicit_tls" | "tls" | "ssl" => TlsMode::Implicit,
            "none" | "disabled" | "plain" => TlsMode::None,
            _ => TlsMode::StartTls,
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub tls_mode: TlsMode,
}

pub fn invite_email_subject(workspace_name: &str) -> String {
    format!("You've been invited to join {workspace_name}")
}

pub fn invite_email_body(workspace_name: &str, role: &str, invite_url: &str) -> String {
    format!(
        "You've been invited to join {workspace_name} as {role}.\n\n\
         Accept your invitation here:\n{invite_url}\n\n\
         This link expires in 7 days."
    )
}
