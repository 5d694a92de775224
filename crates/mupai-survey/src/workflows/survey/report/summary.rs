use std::fmt;

use super::super::domain::NOT_SPECIFIED;
use super::super::session::SurveyState;

const RULE: &str = "=====================================";

/// Plain-text report of a session, in blueprint step order.
///
/// Every answer key appears exactly once; anything left blank renders as
/// "No especificado".
pub fn format_summary(state: &SurveyState) -> String {
    SurveySummary::new(state).to_string()
}

pub struct SurveySummary<'a> {
    state: &'a SurveyState,
}

impl<'a> SurveySummary<'a> {
    pub fn new(state: &'a SurveyState) -> Self {
        Self { state }
    }

    fn client_block(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "DATOS DEL CLIENTE")?;
        match self.state.personal() {
            Some(info) => {
                line(f, "Nombre completo", &info.full_name)?;
                line(f, "Edad", &format!("{} años", info.age))?;
                line(f, "Sexo", info.sex.label())?;
                line(f, "Teléfono", &info.phone)?;
                line(f, "Email", &info.email)?;
                line(f, "Fecha evaluación", &info.fill_date.format("%Y-%m-%d").to_string())?;
                line(
                    f,
                    "Términos aceptados",
                    if info.accepted_terms { "Sí" } else { "No" },
                )
            }
            None => {
                for label in [
                    "Nombre completo",
                    "Edad",
                    "Sexo",
                    "Teléfono",
                    "Email",
                    "Fecha evaluación",
                    "Términos aceptados",
                ] {
                    line(f, label, NOT_SPECIFIED)?;
                }
                Ok(())
            }
        }
    }

    fn step_blocks(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let answers = self.state.answers();
        for step in self.state.blueprint().steps() {
            section(
                f,
                &format!("PASO {} - {}", step.index, step.title.to_uppercase()),
            )?;

            for category in &step.categories {
                let chosen = answers.ordered_selection(category);
                if chosen.is_empty() {
                    line(f, category.label, NOT_SPECIFIED)?;
                } else {
                    line(f, category.label, &chosen.join(", "))?;
                }
            }

            for field in &step.text_fields {
                line(f, field.label, answers.note(field.key).unwrap_or(NOT_SPECIFIED))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for SurveySummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "EVALUACIÓN PATRONES ALIMENTARIOS MUPAI")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Sistema: MUPAI - Muscle Up Performance Assessment Intelligence")?;

        self.client_block(f)?;
        self.step_blocks(f)?;

        section(f, "RECOMENDACIONES")?;
        writeln!(
            f,
            "Este análisis proporciona una base sólida para el desarrollo de recomendaciones"
        )?;
        writeln!(
            f,
            "nutricionales personalizadas basadas en preferencias, restricciones y hábitos del cliente."
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "Recomendamos seguimiento personalizado con nutricionista especializado para"
        )?;
        writeln!(
            f,
            "desarrollar un plan nutricional específico basado en estos patrones identificados."
        )?;

        writeln!(f)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "© 2025 MUPAI - Muscle up GYM")?;
        writeln!(f, "Alimentary Pattern Assessment Intelligence")?;
        writeln!(f, "{RULE}")
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{RULE}")?;
    writeln!(f, "{title}:")?;
    writeln!(f, "{RULE}")
}

fn line(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    writeln!(f, "- {label}: {value}")
}
