use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::{
    validate_age, validate_email, validate_name, validate_phone, FieldViolation,
};

/// Literal rendered for any answer the user left empty.
pub const NOT_SPECIFIED: &str = "No especificado";

/// Option offered by every required category so the step can be passed without choosing food.
pub const NONE_OPTION: &str = "Ninguno";

/// Opaque identifier for one questionnaire session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Hombre",
            Self::Female => "Mujer",
        }
    }
}

/// Raw personal information as typed into the intake form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfoForm {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub age: i32,
    pub sex: Sex,
    #[serde(default)]
    pub accepted_terms: bool,
}

/// Validated personal information; fixed for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalInfo {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub age: u8,
    pub sex: Sex,
    pub fill_date: NaiveDate,
    pub accepted_terms: bool,
}

impl PersonalInfo {
    /// Validate every field of the form, collecting all violations before giving up.
    pub fn from_form(
        form: PersonalInfoForm,
        fill_date: NaiveDate,
    ) -> Result<Self, IntakeRejection> {
        let mut errors = Vec::new();
        let mut check = |field: PersonalField, outcome: Result<(), FieldViolation>| {
            if let Err(violation) = outcome {
                errors.push(FieldError { field, violation });
            }
        };

        check(PersonalField::FullName, validate_name(&form.full_name));
        check(PersonalField::Phone, validate_phone(&form.phone));
        check(PersonalField::Email, validate_email(&form.email));
        check(PersonalField::Age, validate_age(form.age));
        if !form.accepted_terms {
            check(PersonalField::Terms, Err(FieldViolation::TermsNotAccepted));
        }

        let age = match u8::try_from(form.age) {
            Ok(age) if errors.is_empty() => age,
            _ => return Err(IntakeRejection { errors }),
        };

        Ok(Self {
            full_name: form.full_name.split_whitespace().collect::<Vec<_>>().join(" "),
            phone: form.phone.trim().to_string(),
            email: form.email.trim().to_string(),
            age,
            sex: form.sex,
            fill_date,
            accepted_terms: form.accepted_terms,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalField {
    FullName,
    Phone,
    Email,
    Age,
    Terms,
}

impl PersonalField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullName => "Nombre",
            Self::Phone => "Teléfono",
            Self::Email => "Email",
            Self::Age => "Edad",
            Self::Terms => "Términos",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: PersonalField,
    pub violation: FieldViolation,
}

/// Every field that failed validation during registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Por favor corrige los siguientes errores: {}", summarize(.errors))]
pub struct IntakeRejection {
    pub errors: Vec<FieldError>,
}

impl IntakeRejection {
    pub fn violation_for(&self, field: PersonalField) -> Option<&FieldViolation> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| &error.violation)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.field.label(), error.violation))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Predicate a step must satisfy before the user may move past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionRule {
    /// At least one option chosen across the step's categories (the "Ninguno" sentinel counts).
    AnySelection,
    Always,
}

impl CompletionRule {
    pub const fn holds(self, selected: usize) -> bool {
        match self {
            Self::AnySelection => selected > 0,
            Self::Always => true,
        }
    }

    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Always)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Multiple,
    Single,
}

/// Result of a successful `advance` or `retreat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepTransition {
    Advanced { from: usize, to: usize },
    Finished { step: usize },
    Retreated { from: usize, to: usize },
    AtFirstStep,
}

/// The current step's completion rule did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Paso {step} ({title}): selecciona al menos una opción o marca \"Ninguno\"")]
pub struct StepRejection {
    pub step: usize,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
    #[error("personal information must be registered before answering the survey")]
    NotRegistered,
    #[error("personal information is already registered; start a new evaluation to change it")]
    AlreadyRegistered,
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    #[error("`{option}` is not an option for `{category}`")]
    UnknownOption { category: String, option: String },
    #[error("`{0}` accepts a single option")]
    SingleSelection(String),
    #[error("`{0}` cannot combine \"Ninguno\" with other options")]
    NoneWithOthers(String),
    #[error("unknown free-text field `{0}`")]
    UnknownField(String),
    #[error("step {step} is locked; the furthest unlocked step is {unlocked}")]
    StepLocked { step: usize, unlocked: usize },
    #[error(transparent)]
    Intake(#[from] IntakeRejection),
    #[error(transparent)]
    Step(#[from] StepRejection),
}
