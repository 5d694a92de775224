use std::sync::Arc;
use std::time::Duration;

use super::common::*;

use crate::workflows::survey::dispatch::{DispatchError, DispatchMode, DispatchOutcome};
use crate::workflows::survey::domain::{SessionId, StepTransition, SurveyError};
use crate::workflows::survey::repository::RepositoryError;
use crate::workflows::survey::{SurveyService, SurveyServiceError};

#[test]
fn start_opens_session_at_step_one() {
    let (service, _) = build_service();
    let view = service.start().expect("session created");

    assert_eq!(view.progress.current_step, 1);
    assert_eq!(view.progress.total_steps, 12);
    assert_eq!(view.progress.percent, 8);
    assert!(view.personal.is_none());
    assert!(!view.ready_to_send);
    assert_eq!(view.missing.len(), 7);

    let snapshot = service.snapshot(&view.session_id).expect("snapshot");
    assert_eq!(snapshot.session_id, view.session_id);
}

#[test]
fn failed_transition_is_not_persisted() {
    let (service, _) = build_service();
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");

    let err = service
        .select(&id, "huevos_embutidos", vec!["Huevo entero".into(), "Caviar".into()])
        .expect_err("unknown option");
    assert!(matches!(
        err,
        SurveyServiceError::Survey(SurveyError::UnknownOption { .. })
    ));

    let state = service.state(&id).expect("state");
    assert!(state.answers().selection("huevos_embutidos").is_none());
}

#[test]
fn advance_reports_transition_and_current_step() {
    let (service, _) = build_service();
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");

    assert!(matches!(
        service.advance(&id),
        Err(SurveyServiceError::Survey(SurveyError::Step(_)))
    ));

    service
        .select(&id, "carnes_grasas", vec!["Arrachera".to_string()])
        .expect("select");
    let view = service.advance(&id).expect("advance");
    assert_eq!(view.transition, StepTransition::Advanced { from: 1, to: 2 });
    let step = view.session.current_step.expect("current step");
    assert_eq!(step.key, "proteina_magra");
    assert!(!step.satisfied);
    assert_eq!(view.session.progress.completed_steps, vec![1]);
}

#[test]
fn unknown_session_is_not_found() {
    let (service, _) = build_service();
    let missing = SessionId("nope".to_string());
    assert!(matches!(
        service.snapshot(&missing),
        Err(SurveyServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn repository_outage_surfaces_as_unavailable() {
    let service = SurveyService::new(
        Arc::new(UnavailableRepository),
        Arc::new(RecordingDispatcher::default()),
        &mail_config(Duration::from_secs(1)),
    );
    assert!(matches!(
        service.start(),
        Err(SurveyServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn reset_returns_to_registration() {
    let (service, _) = build_service();
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");
    walk_required(&service, &id);

    let view = service.reset(&id).expect("reset");
    assert_eq!(view.progress.current_step, 1);
    assert!(view.personal.is_none());
    assert!(matches!(
        service.advance(&id),
        Err(SurveyServiceError::Survey(SurveyError::NotRegistered))
    ));
}

#[tokio::test]
async fn send_summary_delivers_once() {
    let (service, dispatcher) = build_service();
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");
    walk_required(&service, &id);

    let receipt = service
        .send_summary(&id, DispatchMode::FirstSend)
        .await
        .expect("delivered");
    assert_eq!(receipt.outcome, DispatchOutcome::Delivered);
    assert!(receipt.session.dispatch.sent);

    let again = service
        .send_summary(&id, DispatchMode::FirstSend)
        .await
        .expect("latched");
    assert_eq!(again.outcome, DispatchOutcome::AlreadySent);
    assert_eq!(dispatcher.envelopes().len(), 1);

    service
        .send_summary(&id, DispatchMode::Resend)
        .await
        .expect("resend");
    assert_eq!(dispatcher.envelopes().len(), 2);
}

#[tokio::test]
async fn send_summary_refuses_incomplete_sessions() {
    let (service, dispatcher) = build_service();
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");

    let err = service
        .send_summary(&id, DispatchMode::FirstSend)
        .await
        .expect_err("required steps missing");
    assert!(matches!(
        err,
        SurveyServiceError::Dispatch(DispatchError::NotReady { .. })
    ));
    assert!(dispatcher.envelopes().is_empty());
}

#[tokio::test]
async fn failed_send_is_recorded_and_retryable() {
    let dispatcher = Arc::new(FlakyDispatcher::new(1));
    let service = SurveyService::new(
        Arc::new(MemoryRepository::default()),
        Arc::clone(&dispatcher),
        &mail_config(Duration::from_secs(5)),
    );
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");
    walk_required(&service, &id);

    let err = service
        .send_summary(&id, DispatchMode::FirstSend)
        .await
        .expect_err("transport fails");
    assert!(matches!(
        err,
        SurveyServiceError::Dispatch(DispatchError::Transport(_))
    ));

    let state = service.state(&id).expect("state");
    assert!(!state.dispatch().sent);
    assert!(state.dispatch().last_error.is_some());

    let receipt = service
        .send_summary(&id, DispatchMode::FirstSend)
        .await
        .expect("retry succeeds");
    assert_eq!(receipt.outcome, DispatchOutcome::Delivered);
    assert_eq!(dispatcher.attempts(), 2);
}

#[tokio::test]
async fn slow_transport_times_out() {
    let service = SurveyService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(SlowDispatcher::new(Duration::from_millis(400))),
        &mail_config(Duration::from_millis(50)),
    );
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");
    walk_required(&service, &id);

    let err = service
        .send_summary(&id, DispatchMode::FirstSend)
        .await
        .expect_err("bounded wait");
    assert!(matches!(
        err,
        SurveyServiceError::Dispatch(DispatchError::TimedOut { .. })
    ));
    assert!(!service.state(&id).expect("state").dispatch().sent);
}

fn slow_ready_session(
    delay: Duration,
) -> (
    SurveyService<MemoryRepository, SlowDispatcher>,
    Arc<SlowDispatcher>,
    SessionId,
) {
    let dispatcher = Arc::new(SlowDispatcher::new(delay));
    let service = SurveyService::new(
        Arc::new(MemoryRepository::default()),
        Arc::clone(&dispatcher),
        &mail_config(Duration::from_secs(5)),
    );
    let id = service.start().expect("session").session_id;
    service.register(&id, form(), fill_date()).expect("register");
    walk_required(&service, &id);
    (service, dispatcher, id)
}

#[tokio::test]
async fn concurrent_first_sends_reach_transport_once() {
    let (service, dispatcher, id) = slow_ready_session(Duration::from_millis(200));

    let (first, second) = tokio::join!(
        service.send_summary(&id, DispatchMode::FirstSend),
        service.send_summary(&id, DispatchMode::FirstSend),
    );

    let delivered = [&first, &second]
        .iter()
        .filter(|result| {
            matches!(result, Ok(receipt) if receipt.outcome == DispatchOutcome::Delivered)
        })
        .count();
    let refused = [&first, &second]
        .iter()
        .filter(|result| {
            matches!(
                result,
                Err(SurveyServiceError::Dispatch(DispatchError::InFlight))
            )
        })
        .count();
    assert_eq!((delivered, refused), (1, 1));
    assert_eq!(dispatcher.sends(), 1);

    let again = service
        .send_summary(&id, DispatchMode::FirstSend)
        .await
        .expect("latched");
    assert_eq!(again.outcome, DispatchOutcome::AlreadySent);
    assert_eq!(dispatcher.sends(), 1);
}

#[tokio::test]
async fn reset_during_send_is_not_undone() {
    let (service, dispatcher, id) = slow_ready_session(Duration::from_millis(200));

    let (sent, reset) = tokio::join!(
        service.send_summary(&id, DispatchMode::FirstSend),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            service.reset(&id)
        }
    );
    assert_eq!(
        sent.expect("transport delivered").outcome,
        DispatchOutcome::Delivered
    );
    reset.expect("reset applied");
    assert_eq!(dispatcher.sends(), 1);

    let state = service.state(&id).expect("state");
    assert!(state.personal().is_none());
    assert_eq!(state.progress().current_step(), 1);
    assert!(!state.dispatch().sent);
    assert!(!state.dispatch().in_flight(Duration::from_secs(5)));
}

#[tokio::test]
async fn edits_during_send_are_kept() {
    let (service, _, id) = slow_ready_session(Duration::from_millis(200));

    let (sent, edited) = tokio::join!(
        service.send_summary(&id, DispatchMode::FirstSend),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            service.select(&id, "aceites_coccion", vec!["Aceite de aguacate".to_string()])
        }
    );
    sent.expect("delivered");
    edited.expect("selection accepted");

    let state = service.state(&id).expect("state");
    assert!(state.dispatch().sent);
    assert!(state
        .answers()
        .selection("aceites_coccion")
        .is_some_and(|chosen| chosen.contains("Aceite de aguacate")));
}

#[test]
fn discard_removes_the_session() {
    let (service, _) = build_service();
    let id = service.start().expect("session").session_id;

    service.discard(&id).expect("discarded");
    assert!(matches!(
        service.snapshot(&id),
        Err(SurveyServiceError::Repository(RepositoryError::NotFound))
    ));
    assert!(matches!(
        service.discard(&id),
        Err(SurveyServiceError::Repository(RepositoryError::NotFound))
    ));
}
