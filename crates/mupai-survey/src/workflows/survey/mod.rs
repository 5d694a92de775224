//! Multi-step dietary pattern questionnaire.
//!
//! A session registers validated personal information, walks a linear sequence of
//! food-group steps gated by completion rules, renders a plain-text report, and
//! hands that report to a notification dispatcher exactly once unless resent.

pub mod answers;
pub mod blueprint;
pub mod dispatch;
pub mod domain;
pub mod progress;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub mod validation;

#[cfg(test)]
mod tests;

pub use answers::SurveyAnswers;
pub use blueprint::{
    BlueprintError, CategoryTemplate, StepTemplate, SurveyBlueprint, TextFieldTemplate,
};
pub use dispatch::{
    DispatchClaim, DispatchError, DispatchMode, DispatchOutcome, DispatchTicket,
    EmailDispatchRecord, EmailEnvelope, MailIdentity, NotificationDispatcher, SummaryMailer,
    TransportError,
};
pub use domain::{
    CompletionRule, FieldError, IntakeRejection, PersonalField, PersonalInfo, PersonalInfoForm,
    SelectionMode, SessionId, Sex, StepRejection, StepTransition, SurveyError, NONE_OPTION,
    NOT_SPECIFIED,
};
pub use progress::ProgressState;
pub use report::views::{
    BlueprintView, DispatchReceipt, ProgressView, SessionView, StepView, TransitionView,
};
pub use report::{format_summary, SurveySummary};
pub use repository::{RepositoryError, SessionRepository};
pub use router::survey_router;
pub use service::{SurveyService, SurveyServiceError};
pub use session::SurveyState;
pub use validation::FieldViolation;
