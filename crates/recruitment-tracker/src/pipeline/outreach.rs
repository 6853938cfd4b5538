use serde::{Deserialize, Serialize};

use super::domain::Candidate;
use super::stage::Stage;

/// Text substituted for `{{feedback}}` when a candidate has no evaluation notes.
pub const DEFAULT_FEEDBACK: &str = "No specific feedback provided at this stage.";

/// Stored subject/body pair keyed by stage label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    #[serde(alias = "stage")]
    pub name: String,
    pub subject: String,
    #[serde(alias = "body_html")]
    pub body: String,
}

impl EmailTemplate {
    pub fn for_stage(stage: Stage, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: stage.label().to_string(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Renders subject and body for one recipient.
    pub fn render(&self, candidate: &Candidate) -> OutboundEmail {
        let feedback = candidate
            .evaluation_notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .unwrap_or(DEFAULT_FEEDBACK);
        let substitute = |text: &str| {
            text.replace("{{full_name}}", &candidate.full_name)
                .replace("{{feedback}}", feedback)
                .replace("{{stage}}", candidate.current_stage.label())
        };

        OutboundEmail {
            recipient: candidate.email.clone(),
            subject: substitute(&self.subject),
            body: substitute(&self.body),
        }
    }
}

/// Caller-provided text used when no template is stored for the stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkEmailRequest {
    pub stage: Stage,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, alias = "body")]
    pub message: Option<String>,
}

impl BulkEmailRequest {
    pub(crate) fn fallback_template(&self) -> Option<EmailTemplate> {
        let subject = self.subject.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let message = self.message.as_deref().filter(|m| !m.trim().is_empty())?;
        Some(EmailTemplate::for_stage(self.stage, subject, message))
    }
}

/// Fully rendered message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl OutboundEmail {
    /// Cheap syntactic check run before the transport is involved.
    pub fn has_plausible_recipient(&self) -> bool {
        let address = self.recipient.trim();
        let Some((local, domain)) = address.split_once('@') else {
            return false;
        };
        !local.is_empty()
            && !domain.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !address.chars().any(char::is_whitespace)
    }
}

/// Outbound email transport.
pub trait EmailDispatcher: Send + Sync {
    fn dispatch(&self, email: &OutboundEmail) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("recipient rejected: {0}")]
    Rejected(String),
    #[error("email transport unavailable: {0}")]
    Transport(String),
}

/// Aggregated per-recipient results of a bulk send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSendSummary {
    pub sent: usize,
    pub failed: usize,
}

impl BulkSendSummary {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}
