use serde::Serialize;

use super::super::blueprint::{CategoryTemplate, StepTemplate, SurveyBlueprint};
use super::super::dispatch::{DispatchOutcome, EmailDispatchRecord};
use super::super::domain::{
    CompletionRule, PersonalInfo, SelectionMode, SessionId, StepTransition,
};
use super::super::session::SurveyState;

#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub current_step: usize,
    pub max_unlocked_step: usize,
    pub total_steps: usize,
    pub percent: u8,
    pub completed_steps: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub key: &'static str,
    pub label: &'static str,
    pub mode: SelectionMode,
    pub options: Vec<&'static str>,
    pub selected: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteView {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub index: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub rule: CompletionRule,
    pub satisfied: bool,
    pub categories: Vec<CategoryView>,
    pub notes: Vec<NoteView>,
}

/// Session snapshot rendered after every transition.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub progress: ProgressView,
    pub current_step: Option<StepView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalInfo>,
    pub dispatch: EmailDispatchRecord,
    pub ready_to_send: bool,
    pub missing: Vec<String>,
}

impl SessionView {
    pub fn render(id: &SessionId, state: &SurveyState) -> Self {
        let progress = state.progress();
        let current_step = state
            .blueprint()
            .step(progress.current_step())
            .map(|step| step_view(step, state));
        let missing = state.missing_for_dispatch();

        Self {
            session_id: id.clone(),
            progress: ProgressView {
                current_step: progress.current_step(),
                max_unlocked_step: progress.max_unlocked_step(),
                total_steps: progress.total_steps(),
                percent: progress.percent(),
                completed_steps: progress.completed_steps(),
            },
            current_step,
            personal: state.personal().cloned(),
            dispatch: state.dispatch().clone(),
            ready_to_send: missing.is_empty(),
            missing,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionView {
    pub transition: StepTransition,
    pub session: SessionView,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub outcome: DispatchOutcome,
    pub session: SessionView,
}

fn step_view(step: &StepTemplate, state: &SurveyState) -> StepView {
    let answers = state.answers();
    StepView {
        index: step.index,
        key: step.key,
        title: step.title,
        rule: step.rule,
        satisfied: answers.satisfies(step),
        categories: step
            .categories
            .iter()
            .map(|category| CategoryView {
                key: category.key,
                label: category.label,
                mode: category.mode,
                options: category.options.clone(),
                selected: answers.ordered_selection(category),
            })
            .collect(),
        notes: step
            .text_fields
            .iter()
            .map(|field| NoteView {
                key: field.key,
                label: field.label,
                text: answers.note(field.key).map(str::to_string),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlueprintCategoryView {
    pub key: &'static str,
    pub label: &'static str,
    pub mode: SelectionMode,
    pub options: Vec<&'static str>,
}

impl From<&CategoryTemplate> for BlueprintCategoryView {
    fn from(category: &CategoryTemplate) -> Self {
        Self {
            key: category.key,
            label: category.label,
            mode: category.mode,
            options: category.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlueprintStepView {
    pub index: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub optional: bool,
    pub categories: Vec<BlueprintCategoryView>,
    pub text_fields: Vec<&'static str>,
}

/// Static step table exposed to clients so they can render every screen.
#[derive(Debug, Clone, Serialize)]
pub struct BlueprintView {
    pub total_steps: usize,
    pub steps: Vec<BlueprintStepView>,
}

impl From<&SurveyBlueprint> for BlueprintView {
    fn from(blueprint: &SurveyBlueprint) -> Self {
        Self {
            total_steps: blueprint.total_steps(),
            steps: blueprint
                .steps()
                .iter()
                .map(|step| BlueprintStepView {
                    index: step.index,
                    key: step.key,
                    title: step.title,
                    optional: step.is_optional(),
                    categories: step.categories.iter().map(Into::into).collect(),
                    text_fields: step.text_fields.iter().map(|field| field.key).collect(),
                })
                .collect(),
        }
    }
}
