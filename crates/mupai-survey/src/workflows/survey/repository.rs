use super::domain::SessionId;
use super::session::SurveyState;

/// Storage abstraction so the service module can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, id: SessionId, state: SurveyState) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SurveyState>, RepositoryError>;

    /// Apply `change` to the stored session while holding its lock.
    ///
    /// The edit is kept only when `change` returns `Ok`; an `Err` leaves the stored
    /// session untouched.
    fn modify<T, E, F>(&self, id: &SessionId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut SurveyState) -> Result<T, E>,
        E: From<RepositoryError>;

    fn remove(&self, id: &SessionId) -> Result<Option<SurveyState>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
