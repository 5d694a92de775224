use std::sync::Arc;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::blueprint::SurveyBlueprint;
use super::dispatch::{
    DispatchClaim, DispatchError, DispatchMode, DispatchOutcome, EmailEnvelope, MailIdentity,
    NotificationDispatcher, SummaryMailer, TransportError,
};
use super::domain::{PersonalInfoForm, SessionId, StepTransition, SurveyError};
use super::report::format_summary;
use super::report::views::{BlueprintView, DispatchReceipt, SessionView, TransitionView};
use super::repository::{RepositoryError, SessionRepository};
use super::session::SurveyState;
use crate::config::MailConfig;

/// Service owning the blueprint, session storage, and the summary mailer.
pub struct SurveyService<R, D> {
    blueprint: Arc<SurveyBlueprint>,
    repository: Arc<R>,
    mailer: SummaryMailer<D>,
}

impl<R, D> SurveyService<R, D>
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    pub fn new(repository: Arc<R>, dispatcher: Arc<D>, mail: &MailConfig) -> Self {
        Self::with_blueprint(SurveyBlueprint::standard(), repository, dispatcher, mail)
    }

    pub fn with_blueprint(
        blueprint: SurveyBlueprint,
        repository: Arc<R>,
        dispatcher: Arc<D>,
        mail: &MailConfig,
    ) -> Self {
        Self {
            blueprint: Arc::new(blueprint),
            repository,
            mailer: SummaryMailer::new(dispatcher, MailIdentity::from(mail), mail.send_timeout),
        }
    }

    pub fn blueprint(&self) -> BlueprintView {
        BlueprintView::from(self.blueprint.as_ref())
    }

    /// Open a fresh session at step 1 with registration pending.
    pub fn start(&self) -> Result<SessionView, SurveyServiceError> {
        let id = SessionId::generate();
        let state = SurveyState::new(Arc::clone(&self.blueprint));
        let view = SessionView::render(&id, &state);
        self.repository.insert(id.clone(), state)?;
        info!(session = %id, "survey session started");
        Ok(view)
    }

    pub fn snapshot(&self, id: &SessionId) -> Result<SessionView, SurveyServiceError> {
        let state = self.load(id)?;
        Ok(SessionView::render(id, &state))
    }

    /// Raw session state, for callers that render their own output.
    pub fn state(&self, id: &SessionId) -> Result<SurveyState, SurveyServiceError> {
        self.load(id)
    }

    pub fn register(
        &self,
        id: &SessionId,
        form: PersonalInfoForm,
        today: NaiveDate,
    ) -> Result<SessionView, SurveyServiceError> {
        let ((), state) = self.apply(id, |state| state.register(form, today).map(|_| ()))?;
        info!(session = %id, "personal information registered");
        Ok(SessionView::render(id, &state))
    }

    pub fn select(
        &self,
        id: &SessionId,
        category: &str,
        options: Vec<String>,
    ) -> Result<SessionView, SurveyServiceError> {
        let ((), state) = self.apply(id, |state| state.select(category, options))?;
        Ok(SessionView::render(id, &state))
    }

    pub fn write_note(
        &self,
        id: &SessionId,
        field: &str,
        text: &str,
    ) -> Result<SessionView, SurveyServiceError> {
        let ((), state) = self.apply(id, |state| state.write_note(field, text))?;
        Ok(SessionView::render(id, &state))
    }

    pub fn advance(&self, id: &SessionId) -> Result<TransitionView, SurveyServiceError> {
        let (transition, state) = self.apply(id, SurveyState::advance).map_err(|error| {
            if let SurveyServiceError::Survey(SurveyError::Step(rejection)) = &error {
                debug!(session = %id, step = rejection.step, "step rejected");
            }
            error
        })?;

        match transition {
            StepTransition::Advanced { from, to } => {
                info!(session = %id, from, to, "survey step advanced")
            }
            StepTransition::Finished { step } => info!(session = %id, step, "survey finished"),
            _ => {}
        }

        Ok(TransitionView {
            transition,
            session: SessionView::render(id, &state),
        })
    }

    pub fn retreat(&self, id: &SessionId) -> Result<TransitionView, SurveyServiceError> {
        let (transition, state) = self.apply(id, |state| Ok(state.retreat()))?;
        Ok(TransitionView {
            transition,
            session: SessionView::render(id, &state),
        })
    }

    pub fn reset(&self, id: &SessionId) -> Result<SessionView, SurveyServiceError> {
        let ((), state) = self.apply(id, |state| {
            state.reset();
            Ok(())
        })?;
        info!(session = %id, "survey session reset");
        Ok(SessionView::render(id, &state))
    }

    pub fn summary(&self, id: &SessionId) -> Result<String, SurveyServiceError> {
        let state = self.load(id)?;
        Ok(format_summary(&state))
    }

    /// Drop a session and everything entered in it.
    pub fn discard(&self, id: &SessionId) -> Result<(), SurveyServiceError> {
        self.repository.remove(id)?.ok_or(RepositoryError::NotFound)?;
        info!(session = %id, "survey session discarded");
        Ok(())
    }

    /// Send the summary e-mail on the blocking pool, bounded by the configured timeout.
    ///
    /// The latch is claimed before the transport runs, so a concurrent first send
    /// is refused instead of duplicated. Failures leave `sent` unset and are recorded
    /// on the session so the user can retry. A result that arrives after the session
    /// was reset is discarded.
    pub async fn send_summary(
        &self,
        id: &SessionId,
        mode: DispatchMode,
    ) -> Result<DispatchReceipt, SurveyServiceError> {
        let (claim, session) = self
            .repository
            .modify(id, |state| -> Result<_, SurveyServiceError> {
                let claim = self.mailer.claim(state, mode)?;
                Ok((claim, SessionView::render(id, state)))
            })?;

        let (ticket, envelope) = match claim {
            DispatchClaim::AlreadySent => {
                return Ok(DispatchReceipt {
                    outcome: DispatchOutcome::AlreadySent,
                    session,
                })
            }
            DispatchClaim::Ready { ticket, envelope } => (ticket, envelope),
        };

        let outcome = self.transmit(envelope).await;

        let (settled, session) = self
            .repository
            .modify(id, |state| -> Result<_, SurveyServiceError> {
                let settled = self.mailer.settle(state, ticket, &outcome);
                Ok((settled, SessionView::render(id, state)))
            })?;
        if !settled {
            debug!(session = %id, "send result discarded; session changed while sending");
        }

        match outcome {
            Ok(()) => {
                info!(session = %id, "summary e-mail delivered");
                Ok(DispatchReceipt {
                    outcome: DispatchOutcome::Delivered,
                    session,
                })
            }
            Err(error) => {
                warn!(session = %id, %error, "summary e-mail failed");
                Err(error.into())
            }
        }
    }

    async fn transmit(&self, envelope: EmailEnvelope) -> Result<(), DispatchError> {
        let dispatcher = self.mailer.dispatcher();
        let limit = self.mailer.send_timeout();
        let task = tokio::task::spawn_blocking(move || dispatcher.send(&envelope));

        match tokio::time::timeout(limit, task).await {
            Ok(Ok(sent)) => sent.map_err(DispatchError::from),
            Ok(Err(join)) => Err(DispatchError::Transport(TransportError::Unavailable(
                join.to_string(),
            ))),
            Err(_) => Err(DispatchError::TimedOut { limit }),
        }
    }

    fn load(&self, id: &SessionId) -> Result<SurveyState, SurveyServiceError> {
        let state = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(state)
    }

    /// Run a transition under the session lock; it is persisted only when it succeeds.
    fn apply<T, F>(
        &self,
        id: &SessionId,
        transition: F,
    ) -> Result<(T, SurveyState), SurveyServiceError>
    where
        F: FnOnce(&mut SurveyState) -> Result<T, SurveyError>,
    {
        self.repository
            .modify(id, |state| -> Result<_, SurveyServiceError> {
                let value = transition(state)?;
                Ok((value, state.clone()))
            })
    }
}

/// Error raised by the survey service.
#[derive(Debug, thiserror::Error)]
pub enum SurveyServiceError {
    #[error(transparent)]
    Survey(#[from] SurveyError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
