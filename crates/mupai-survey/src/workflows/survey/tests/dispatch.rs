use std::sync::Arc;
use std::time::Duration;

use super::common::*;

use crate::config::{MailConfig, DEFAULT_ADMIN_MAILBOX};
use crate::workflows::survey::dispatch::{
    DispatchClaim, DispatchError, DispatchMode, DispatchTicket, EmailEnvelope, MailIdentity,
    NotificationDispatcher, SummaryMailer, TransportError,
};
use crate::workflows::survey::{format_summary, SurveyState};

fn mailer<D>(dispatcher: Arc<D>) -> SummaryMailer<D>
where
    D: NotificationDispatcher + 'static,
{
    let config = MailConfig::default();
    SummaryMailer::new(dispatcher, MailIdentity::from(&config), config.send_timeout)
}

#[test]
fn envelope_uses_admin_mailbox_and_subject_format() {
    let mailer = mailer(Arc::new(RecordingDispatcher::default()));
    let state = ready_state();

    let envelope = mailer.envelope_for(&state).expect("ready to send");
    assert_eq!(envelope.from, DEFAULT_ADMIN_MAILBOX);
    assert_eq!(envelope.to, DEFAULT_ADMIN_MAILBOX);
    assert_eq!(
        envelope.subject,
        "Evaluación patrones alimentarios MUPAI - Juan Perez (2025-03-14)"
    );
    assert_eq!(envelope.body, format_summary(&state));
}

#[test]
fn envelope_lists_missing_parts() {
    let mailer = mailer(Arc::new(RecordingDispatcher::default()));

    let err = mailer.envelope_for(&fresh_state()).expect_err("nothing answered");
    let DispatchError::NotReady { missing } = &err else {
        panic!("expected NotReady, got {err:?}");
    };
    assert_eq!(missing.len(), 7);
    assert_eq!(missing[0], "Datos personales");
    assert_eq!(missing[1], "Paso 1: Proteína animal con más grasa");
    assert!(err.to_string().starts_with("No se puede enviar el resumen. Faltan:"));
}

fn claim_envelope<D>(
    mailer: &SummaryMailer<D>,
    state: &mut SurveyState,
    mode: DispatchMode,
) -> (DispatchTicket, EmailEnvelope)
where
    D: NotificationDispatcher + 'static,
{
    match mailer.claim(state, mode).expect("claim granted") {
        DispatchClaim::Ready { ticket, envelope } => (ticket, envelope),
        DispatchClaim::AlreadySent => panic!("expected a fresh claim"),
    }
}

#[test]
fn settled_success_latches_first_send() {
    let mailer = mailer(Arc::new(RecordingDispatcher::default()));
    let mut state = ready_state();

    let (ticket, envelope) = claim_envelope(&mailer, &mut state, DispatchMode::FirstSend);
    assert_eq!(envelope.body, format_summary(&state));
    assert!(mailer.settle(&mut state, ticket, &Ok(())));
    assert!(state.dispatch().sent);

    assert_eq!(
        mailer.claim(&mut state, DispatchMode::FirstSend),
        Ok(DispatchClaim::AlreadySent)
    );
    let (resend, _) = claim_envelope(&mailer, &mut state, DispatchMode::Resend);
    assert_ne!(resend, ticket);
}

#[test]
fn open_claim_blocks_a_second_attempt() {
    let mailer = mailer(Arc::new(RecordingDispatcher::default()));
    let mut state = ready_state();

    let (ticket, _) = claim_envelope(&mailer, &mut state, DispatchMode::FirstSend);
    assert!(state.dispatch().in_flight(Duration::from_secs(20)));
    assert_eq!(
        mailer.claim(&mut state, DispatchMode::FirstSend),
        Err(DispatchError::InFlight)
    );
    assert_eq!(
        mailer.claim(&mut state, DispatchMode::Resend),
        Err(DispatchError::InFlight)
    );

    let failure = Err(DispatchError::Transport(TransportError::Authentication(
        "535 bad credentials".to_string(),
    )));
    assert!(mailer.settle(&mut state, ticket, &failure));
    assert!(!state.dispatch().sent);
    assert!(state.dispatch().last_error.is_some());

    claim_envelope(&mailer, &mut state, DispatchMode::FirstSend);
}

#[test]
fn abandoned_claim_can_be_retaken_after_timeout() {
    let mailer = SummaryMailer::new(
        Arc::new(RecordingDispatcher::default()),
        MailIdentity::from(&MailConfig::default()),
        Duration::ZERO,
    );
    let mut state = ready_state();

    let (first, _) = claim_envelope(&mailer, &mut state, DispatchMode::FirstSend);
    let (second, _) = claim_envelope(&mailer, &mut state, DispatchMode::FirstSend);
    assert_ne!(first, second);
    assert!(!mailer.settle(&mut state, first, &Ok(())));
    assert!(!state.dispatch().sent);
    assert!(mailer.settle(&mut state, second, &Ok(())));
}

#[test]
fn result_is_dropped_after_reset() {
    let mailer = mailer(Arc::new(RecordingDispatcher::default()));
    let mut state = ready_state();

    let (ticket, _) = claim_envelope(&mailer, &mut state, DispatchMode::FirstSend);
    state.reset();

    assert!(!mailer.settle(&mut state, ticket, &Ok(())));
    assert!(!state.dispatch().sent);
    assert!(state.personal().is_none());
    assert_eq!(state.progress().current_step(), 1);
}

#[test]
fn unready_session_is_not_claimed() {
    let mailer = mailer(Arc::new(RecordingDispatcher::default()));
    let mut state = registered_state();

    assert!(matches!(
        mailer.claim(&mut state, DispatchMode::Resend),
        Err(DispatchError::NotReady { .. })
    ));
    assert!(!state.dispatch().in_flight(Duration::from_secs(20)));
}
