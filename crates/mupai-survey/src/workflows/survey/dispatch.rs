use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use super::report::format_summary;
use super::session::SurveyState;
use crate::config::MailConfig;

/// Outbound message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailEnvelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport seam for summary e-mails (SMTP relay, outbox, test doubles).
pub trait NotificationDispatcher: Send + Sync {
    fn send(&self, envelope: &EmailEnvelope) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("mail relay rejected the credentials: {0}")]
    Authentication(String),
    #[error("mail relay rejected the message: {0}")]
    Rejected(String),
    #[error("mail relay unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("No se puede enviar el resumen. Faltan: {}", .missing.join(", "))]
    NotReady { missing: Vec<String> },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("mail relay did not answer within {} s", .limit.as_secs())]
    TimedOut { limit: Duration },
    #[error("a summary e-mail for this session is already being sent")]
    InFlight,
}

/// Send latch for one session. Only a successful delivery sets `sent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailDispatchRecord {
    pub sent: bool,
    pub last_error: Option<String>,
    #[serde(skip)]
    pending: Option<PendingDispatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingDispatch {
    ticket: DispatchTicket,
    claimed_at: Instant,
}

impl EmailDispatchRecord {
    /// Whether a send claimed less than `stale_after` ago is still unsettled.
    pub fn in_flight(&self, stale_after: Duration) -> bool {
        self.pending
            .is_some_and(|pending| pending.claimed_at.elapsed() < stale_after)
    }

    pub(crate) fn claim(&mut self, ticket: DispatchTicket) {
        self.pending = Some(PendingDispatch {
            ticket,
            claimed_at: Instant::now(),
        });
    }

    /// Record the outcome if `ticket` still holds the claim; otherwise drop it.
    pub(crate) fn settle(
        &mut self,
        ticket: DispatchTicket,
        outcome: &Result<(), DispatchError>,
    ) -> bool {
        if self.pending.map(|pending| pending.ticket) != Some(ticket) {
            return false;
        }

        self.pending = None;
        match outcome {
            Ok(()) => {
                self.sent = true;
                self.last_error = None;
            }
            Err(err) => self.last_error = Some(err.to_string()),
        }
        true
    }
}

/// Identifies one claimed send so a late result cannot land on a reset session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTicket(Uuid);

impl DispatchTicket {
    fn issue() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Result of claiming the send latch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchClaim {
    AlreadySent,
    Ready {
        ticket: DispatchTicket,
        envelope: EmailEnvelope,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Skipped when the summary already went out for this session.
    FirstSend,
    /// Always sends; unlimited manual retries.
    Resend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered,
    AlreadySent,
}

/// Sender/recipient identity plus subject prefix used for every summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailIdentity {
    pub sender: String,
    pub recipient: String,
    pub subject_prefix: String,
}

impl From<&MailConfig> for MailIdentity {
    fn from(config: &MailConfig) -> Self {
        Self {
            sender: config.admin_mailbox.clone(),
            recipient: config.admin_mailbox.clone(),
            subject_prefix: config.subject_prefix.clone(),
        }
    }
}

/// Builds summary envelopes and owns the send latch around a dispatcher.
///
/// A send is split in two: `claim` runs under the session lock and hands out the
/// envelope, the transport runs unlocked, and `settle` records the outcome on
/// whatever the session looks like by then.
pub struct SummaryMailer<D> {
    dispatcher: Arc<D>,
    identity: MailIdentity,
    send_timeout: Duration,
}

impl<D> SummaryMailer<D>
where
    D: NotificationDispatcher + 'static,
{
    pub fn new(dispatcher: Arc<D>, identity: MailIdentity, send_timeout: Duration) -> Self {
        Self {
            dispatcher,
            identity,
            send_timeout,
        }
    }

    pub fn dispatcher(&self) -> Arc<D> {
        Arc::clone(&self.dispatcher)
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Render the envelope, refusing while personal data or required steps are missing.
    pub fn envelope_for(&self, state: &SurveyState) -> Result<EmailEnvelope, DispatchError> {
        let missing = state.missing_for_dispatch();
        let personal = match state.personal() {
            Some(personal) if missing.is_empty() => personal,
            _ => return Err(DispatchError::NotReady { missing }),
        };

        Ok(EmailEnvelope {
            from: self.identity.sender.clone(),
            to: self.identity.recipient.clone(),
            subject: format!(
                "{} - {} ({})",
                self.identity.subject_prefix,
                personal.full_name,
                personal.fill_date.format("%Y-%m-%d")
            ),
            body: format_summary(state),
        })
    }

    /// Take the send latch for one attempt.
    ///
    /// A claim older than the send timeout is treated as abandoned and can be retaken.
    pub fn claim(
        &self,
        state: &mut SurveyState,
        mode: DispatchMode,
    ) -> Result<DispatchClaim, DispatchError> {
        if mode == DispatchMode::FirstSend && state.dispatch().sent {
            return Ok(DispatchClaim::AlreadySent);
        }
        if state.dispatch().in_flight(self.send_timeout) {
            return Err(DispatchError::InFlight);
        }

        let envelope = self.envelope_for(state)?;
        let ticket = DispatchTicket::issue();
        state.claim_dispatch(ticket);
        Ok(DispatchClaim::Ready { ticket, envelope })
    }

    /// Record a finished attempt. Returns `false` when the claim was lost to a reset
    /// or a newer attempt, in which case the state is left as is.
    pub fn settle(
        &self,
        state: &mut SurveyState,
        ticket: DispatchTicket,
        outcome: &Result<(), DispatchError>,
    ) -> bool {
        state.settle_dispatch(ticket, outcome)
    }
}
