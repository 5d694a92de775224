use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use super::answers::SurveyAnswers;
use super::blueprint::SurveyBlueprint;
use super::dispatch::{DispatchError, DispatchTicket, EmailDispatchRecord};
use super::domain::{
    PersonalInfo, PersonalInfoForm, SelectionMode, StepTransition, SurveyError, NONE_OPTION,
};
use super::progress::ProgressState;

/// Everything one user has entered during a questionnaire session.
///
/// Each session owns its own state; transitions mutate it in place and the caller
/// re-renders afterwards.
#[derive(Debug, Clone)]
pub struct SurveyState {
    blueprint: Arc<SurveyBlueprint>,
    personal: Option<PersonalInfo>,
    answers: SurveyAnswers,
    progress: ProgressState,
    dispatch: EmailDispatchRecord,
}

impl SurveyState {
    pub fn new(blueprint: Arc<SurveyBlueprint>) -> Self {
        let progress = ProgressState::new(blueprint.total_steps());
        Self {
            blueprint,
            personal: None,
            answers: SurveyAnswers::default(),
            progress,
            dispatch: EmailDispatchRecord::default(),
        }
    }

    pub fn blueprint(&self) -> &SurveyBlueprint {
        &self.blueprint
    }

    pub fn personal(&self) -> Option<&PersonalInfo> {
        self.personal.as_ref()
    }

    pub fn answers(&self) -> &SurveyAnswers {
        &self.answers
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn dispatch(&self) -> &EmailDispatchRecord {
        &self.dispatch
    }

    /// Validate and lock in personal information; this gates the rest of the survey.
    pub fn register(
        &mut self,
        form: PersonalInfoForm,
        fill_date: NaiveDate,
    ) -> Result<&PersonalInfo, SurveyError> {
        if self.personal.is_some() {
            return Err(SurveyError::AlreadyRegistered);
        }

        let info = PersonalInfo::from_form(form, fill_date)?;
        Ok(self.personal.insert(info))
    }

    /// Replace the chosen options of one checklist field.
    pub fn select<I, S>(&mut self, category: &str, options: I) -> Result<(), SurveyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_registered()?;

        let (step, template) = self
            .blueprint
            .category(category)
            .ok_or_else(|| SurveyError::UnknownCategory(category.to_string()))?;
        self.ensure_unlocked(step)?;

        let mut chosen = BTreeSet::new();
        for option in options {
            let option = option.into();
            if !template.offers(&option) {
                return Err(SurveyError::UnknownOption {
                    category: category.to_string(),
                    option,
                });
            }
            chosen.insert(option);
        }
        if template.mode == SelectionMode::Single && chosen.len() > 1 {
            return Err(SurveyError::SingleSelection(category.to_string()));
        }
        if chosen.len() > 1 && chosen.contains(NONE_OPTION) {
            return Err(SurveyError::NoneWithOthers(category.to_string()));
        }

        self.answers.replace_selection(category, chosen);
        self.refresh_completion(step);
        Ok(())
    }

    pub fn clear(&mut self, category: &str) -> Result<(), SurveyError> {
        self.select(category, std::iter::empty::<String>())
    }

    /// Set the text of a free-form field; blank text clears it.
    pub fn write_note(&mut self, field: &str, text: &str) -> Result<(), SurveyError> {
        self.ensure_registered()?;

        let (step, _) = self
            .blueprint
            .text_field(field)
            .ok_or_else(|| SurveyError::UnknownField(field.to_string()))?;
        self.ensure_unlocked(step)?;

        self.answers.replace_note(field, text);
        Ok(())
    }

    pub fn advance(&mut self) -> Result<StepTransition, SurveyError> {
        self.ensure_registered()?;
        let transition = self.progress.advance(&self.blueprint, &self.answers)?;
        Ok(transition)
    }

    pub fn retreat(&mut self) -> StepTransition {
        self.progress.retreat()
    }

    /// Discard everything and return to the personal information step.
    pub fn reset(&mut self) {
        *self = Self::new(Arc::clone(&self.blueprint));
    }

    /// Whether a step's completion rule holds for the current answers.
    pub fn step_satisfied(&self, index: usize) -> bool {
        self.blueprint
            .step(index)
            .is_some_and(|step| self.answers.satisfies(step))
    }

    /// Labels of everything still blocking the summary e-mail.
    pub fn missing_for_dispatch(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.personal.is_none() {
            missing.push("Datos personales".to_string());
        }

        missing.extend(
            self.blueprint
                .required_steps()
                .filter(|step| !self.answers.satisfies(step))
                .map(|step| format!("Paso {}: {}", step.index, step.title)),
        );
        missing
    }

    pub fn ready_to_send(&self) -> bool {
        self.missing_for_dispatch().is_empty()
    }

    pub(crate) fn claim_dispatch(&mut self, ticket: DispatchTicket) {
        self.dispatch.claim(ticket);
    }

    pub(crate) fn settle_dispatch(
        &mut self,
        ticket: DispatchTicket,
        outcome: &Result<(), DispatchError>,
    ) -> bool {
        self.dispatch.settle(ticket, outcome)
    }

    fn ensure_registered(&self) -> Result<(), SurveyError> {
        if self.personal.is_none() {
            return Err(SurveyError::NotRegistered);
        }
        Ok(())
    }

    fn ensure_unlocked(&self, step: usize) -> Result<(), SurveyError> {
        if self.progress.is_unlocked(step) {
            Ok(())
        } else {
            Err(SurveyError::StepLocked {
                step,
                unlocked: self.progress.max_unlocked_step(),
            })
        }
    }

    fn refresh_completion(&mut self, step: usize) {
        if !self.step_satisfied(step) {
            self.progress.invalidate(step);
        }
    }
}
