use metrics_exporter_prometheus::PrometheusHandle;
use mupai_survey::config::SessionConfig;
use mupai_survey::workflows::survey::{
    EmailEnvelope, NotificationDispatcher, RepositoryError, SessionId, SessionRepository,
    SurveyState, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Messages retained by the outbox; older ones are dropped first.
pub(crate) const OUTBOX_CAPACITY: usize = 256;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

struct StoredSession {
    state: SurveyState,
    touched: Instant,
}

/// Session store with idle expiry and a hard cap on the number of sessions.
#[derive(Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, StoredSession>>>,
    limits: SessionConfig,
}

impl InMemorySessionRepository {
    pub(crate) fn new(limits: SessionConfig) -> Self {
        Self {
            sessions: Arc::default(),
            limits,
        }
    }

    fn expired(&self, stored: &StoredSession) -> bool {
        stored.touched.elapsed() >= self.limits.idle_ttl
    }

    /// Drop idle sessions, then the least recently touched ones until a slot is free.
    fn make_room(&self, sessions: &mut HashMap<SessionId, StoredSession>) {
        let before = sessions.len();
        sessions.retain(|_, stored| !self.expired(stored));

        while sessions.len() >= self.limits.capacity {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, stored)| stored.touched)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
        }

        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!(dropped, remaining = sessions.len(), "evicted survey sessions");
        }
    }
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, id: SessionId, state: SurveyState) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        self.make_room(&mut guard);
        guard.insert(
            id,
            StoredSession {
                state,
                touched: Instant::now(),
            },
        );
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SurveyState>, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.get(id).is_some_and(|stored| self.expired(stored)) {
            guard.remove(id);
            return Ok(None);
        }

        Ok(guard.get_mut(id).map(|stored| {
            stored.touched = Instant::now();
            stored.state.clone()
        }))
    }

    fn modify<T, E, F>(&self, id: &SessionId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut SurveyState) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.get(id).is_some_and(|stored| self.expired(stored)) {
            guard.remove(id);
        }

        let stored = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let mut draft = stored.state.clone();
        let value = change(&mut draft)?;
        stored.state = draft;
        stored.touched = Instant::now();
        Ok(value)
    }

    fn remove(&self, id: &SessionId) -> Result<Option<SurveyState>, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id).map(|stored| stored.state))
    }
}

/// Dispatcher that keeps the most recent summaries in memory instead of talking SMTP.
pub(crate) struct OutboxDispatcher {
    messages: Mutex<VecDeque<EmailEnvelope>>,
    capacity: usize,
    offline: AtomicBool,
}

impl OutboxDispatcher {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity.min(OUTBOX_CAPACITY))),
            capacity: capacity.max(1),
            offline: AtomicBool::new(false),
        }
    }

    pub(crate) fn offline() -> Self {
        let outbox = Self::default();
        outbox.set_offline(true);
        outbox
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn messages(&self) -> Vec<EmailEnvelope> {
        let guard = self.messages.lock().expect("outbox mutex poisoned");
        guard.iter().cloned().collect()
    }
}

impl Default for OutboxDispatcher {
    fn default() -> Self {
        Self::with_capacity(OUTBOX_CAPACITY)
    }
}

impl NotificationDispatcher for OutboxDispatcher {
    fn send(&self, envelope: &EmailEnvelope) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable(
                "outbox relay is offline".to_string(),
            ));
        }

        let mut guard = self.messages.lock().expect("outbox mutex poisoned");
        while guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(envelope.clone());
        info!(
            to = %envelope.to,
            bytes = envelope.body.len(),
            queued = guard.len(),
            "summary e-mail stored in outbox"
        );
        Ok(())
    }
}
