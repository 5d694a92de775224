use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::MailConfig;
use crate::workflows::survey::dispatch::{EmailEnvelope, NotificationDispatcher, TransportError};
use crate::workflows::survey::domain::{PersonalInfoForm, SessionId, Sex};
use crate::workflows::survey::repository::{RepositoryError, SessionRepository};
use crate::workflows::survey::{SurveyBlueprint, SurveyService, SurveyState};

pub(super) fn fill_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
}

pub(super) fn form() -> PersonalInfoForm {
    PersonalInfoForm {
        full_name: "Juan Perez".to_string(),
        phone: "8661234567".to_string(),
        email: "juan@example.com".to_string(),
        age: 25,
        sex: Sex::Male,
        accepted_terms: true,
    }
}

pub(super) fn fresh_state() -> SurveyState {
    SurveyState::new(Arc::new(SurveyBlueprint::standard()))
}

pub(super) fn registered_state() -> SurveyState {
    let mut state = fresh_state();
    state
        .register(form(), fill_date())
        .expect("registration accepted");
    state
}

/// First category of each required step after step 1 gets the "Ninguno" sentinel.
pub(super) const NONE_CATEGORIES: [&str; 5] = [
    "carnes_magras",
    "grasas_naturales",
    "cereales_integrales",
    "vegetales_hoja",
    "frutas",
];

/// Answer steps 1-6 and advance through each, leaving the user on step 7.
pub(super) fn complete_required(state: &mut SurveyState) {
    state
        .select("huevos_embutidos", ["Huevo entero"])
        .expect("step 1 selection");
    state.advance().expect("advance past step 1");
    for category in NONE_CATEGORIES {
        state.select(category, ["Ninguno"]).expect("sentinel accepted");
        state.advance().expect("advance past required step");
    }
}

/// Same walk as `complete_required`, driven through the service.
pub(super) fn walk_required<R, D>(service: &SurveyService<R, D>, id: &SessionId)
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    service
        .select(id, "huevos_embutidos", vec!["Huevo entero".to_string()])
        .expect("step 1");
    service.advance(id).expect("advance step 1");
    for category in NONE_CATEGORIES {
        service
            .select(id, category, vec!["Ninguno".to_string()])
            .expect("sentinel");
        service.advance(id).expect("advance required step");
    }
}

pub(super) fn ready_state() -> SurveyState {
    let mut state = registered_state();
    complete_required(&mut state);
    state
}

pub(super) fn mail_config(timeout: Duration) -> MailConfig {
    MailConfig {
        send_timeout: timeout,
        ..MailConfig::default()
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) sessions: Arc<Mutex<HashMap<SessionId, SurveyState>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, id: SessionId, state: SurveyState) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(id, state);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SurveyState>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn modify<T, E, F>(&self, id: &SessionId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut SurveyState) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        let slot = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let mut draft = slot.clone();
        let value = change(&mut draft)?;
        *slot = draft;
        Ok(value)
    }

    fn remove(&self, id: &SessionId) -> Result<Option<SurveyState>, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _id: SessionId, _state: SurveyState) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SurveyState>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify<T, E, F>(&self, _id: &SessionId, _change: F) -> Result<T, E>
    where
        F: FnOnce(&mut SurveyState) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn remove(&self, _id: &SessionId) -> Result<Option<SurveyState>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    envelopes: Mutex<Vec<EmailEnvelope>>,
}

impl RecordingDispatcher {
    pub(super) fn envelopes(&self) -> Vec<EmailEnvelope> {
        self.envelopes.lock().expect("outbox mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn send(&self, envelope: &EmailEnvelope) -> Result<(), TransportError> {
        self.envelopes
            .lock()
            .expect("outbox mutex poisoned")
            .push(envelope.clone());
        Ok(())
    }
}

/// Fails the first `failures` sends, then delivers.
pub(super) struct FlakyDispatcher {
    failures: usize,
    attempts: AtomicUsize,
}

impl FlakyDispatcher {
    pub(super) fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl NotificationDispatcher for FlakyDispatcher {
    fn send(&self, _envelope: &EmailEnvelope) -> Result<(), TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            Err(TransportError::Authentication("535 bad credentials".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Delivers after holding the transport for `delay`, counting every send.
pub(super) struct SlowDispatcher {
    delay: Duration,
    sends: AtomicUsize,
}

impl SlowDispatcher {
    pub(super) fn new(delay: Duration) -> Self {
        Self {
            delay,
            sends: AtomicUsize::new(0),
        }
    }

    pub(super) fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

impl NotificationDispatcher for SlowDispatcher {
    fn send(&self, _envelope: &EmailEnvelope) -> Result<(), TransportError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(())
    }
}

pub(super) fn build_service() -> (
    SurveyService<MemoryRepository, RecordingDispatcher>,
    Arc<RecordingDispatcher>,
) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = SurveyService::new(
        Arc::new(MemoryRepository::default()),
        Arc::clone(&dispatcher),
        &MailConfig::default(),
    );
    (service, dispatcher)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
