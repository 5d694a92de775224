use crate::infra::{InMemorySessionRepository, OutboxDispatcher};
use chrono::Local;
use clap::Args;
use mupai_survey::config::AppConfig;
use mupai_survey::error::AppError;
use mupai_survey::workflows::survey::{
    DispatchMode, PersonalInfoForm, SessionId, SessionRepository, Sex, SurveyBlueprint,
    SurveyError, SurveyService, SurveyServiceError, NOT_SPECIFIED,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Client full name (first and last name)
    #[arg(long, default_value = "Juan Perez")]
    pub(crate) name: String,
    /// Ten-digit phone number; punctuation is ignored
    #[arg(long, default_value = "8661234567")]
    pub(crate) phone: String,
    #[arg(long, default_value = "juan@example.com")]
    pub(crate) email: String,
    #[arg(long, default_value_t = 25)]
    pub(crate) age: i32,
    /// `hombre`/`male` or `mujer`/`female`
    #[arg(long, default_value = "hombre", value_parser = parse_sex)]
    pub(crate) sex: Sex,
    /// Start with the outbox offline so the first send fails and is retried
    #[arg(long)]
    pub(crate) simulate_failure: bool,
}

fn parse_sex(raw: &str) -> Result<Sex, String> {
    match raw.trim().to_lowercase().as_str() {
        "hombre" | "male" | "m" => Ok(Sex::Male),
        "mujer" | "female" | "f" => Ok(Sex::Female),
        other => Err(format!("unknown sex '{other}', expected hombre or mujer")),
    }
}

enum ScriptedAnswer {
    Select(&'static str, &'static [&'static str]),
    Note(&'static str, &'static str),
}

use ScriptedAnswer::{Note, Select};

/// Answers entered on each step, indexed from step 1.
fn scripted_answers() -> Vec<Vec<ScriptedAnswer>> {
    vec![
        vec![
            Select("huevos_embutidos", &["Huevo entero"]),
            Select("carnes_grasas", &["Arrachera"]),
        ],
        vec![
            Select("carnes_magras", &["Pechuga de pollo"]),
            Select("pescados_magros", &["Tilapia"]),
        ],
        vec![
            Select("grasas_naturales", &["Aguacate"]),
            Select("frutos_secos_semillas", &["Almendras"]),
        ],
        vec![
            Select("cereales_integrales", &["Avena", "Arroz integral"]),
            Select("tuberculos", &["Camote"]),
        ],
        vec![
            Select("vegetales_hoja", &["Espinaca"]),
            Select("vegetales_variados", &["Brócoli", "Calabacita"]),
        ],
        vec![Select("frutas", &["Plátano", "Fresas"])],
        vec![Select("aceites_coccion", &["Aceite de oliva extra virgen"])],
        vec![Select("bebidas_sin_calorias", &["Agua natural", "Café negro"])],
        vec![Select("intolerancias", &["Lactosa"])],
        vec![
            Select("antojos_dulces", &["Chocolate"]),
            Note("antojos_notas", "Antojo de chocolate por la noche"),
        ],
        vec![Select("frecuencia_comidas", &["4 comidas al día"])],
        vec![Note("sugerencias_menus", "Bowls de pollo con arroz y verduras")],
    ]
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let outbox = Arc::new(if args.simulate_failure {
        OutboxDispatcher::offline()
    } else {
        OutboxDispatcher::default()
    });
    let service = SurveyService::new(
        Arc::new(InMemorySessionRepository::new(config.sessions.clone())),
        Arc::clone(&outbox),
        &config.mail,
    );

    println!("MUPAI dietary pattern questionnaire demo");
    let id = service.start()?.session_id;
    println!("Session: {id}");

    let form = PersonalInfoForm {
        full_name: args.name,
        phone: args.phone,
        email: args.email,
        age: args.age,
        sex: args.sex,
        accepted_terms: true,
    };
    match service.register(&id, form, Local::now().date_naive()) {
        Ok(_) => println!("Personal information accepted"),
        Err(SurveyServiceError::Survey(SurveyError::Intake(rejection))) => {
            println!("Personal information rejected:");
            for error in &rejection.errors {
                println!("  - {}: {}", error.field.label(), error.violation);
            }
            return Ok(());
        }
        Err(other) => return Err(other.into()),
    }

    walk_steps(&service, &id)?;

    println!("\n{}", service.summary(&id)?);

    match service.send_summary(&id, DispatchMode::FirstSend).await {
        Ok(receipt) => println!("Summary e-mail: {:?}", receipt.outcome),
        Err(err) => {
            println!("Summary e-mail failed: {err}");
            outbox.set_offline(false);
            let receipt = service.send_summary(&id, DispatchMode::FirstSend).await?;
            println!("Retry without re-entering answers: {:?}", receipt.outcome);
        }
    }

    for message in outbox.messages() {
        println!("Outbox: {} -> {} | {}", message.from, message.to, message.subject);
    }
    Ok(())
}

fn walk_steps<R>(
    service: &SurveyService<R, OutboxDispatcher>,
    id: &SessionId,
) -> Result<(), SurveyServiceError>
where
    R: SessionRepository + 'static,
{
    for answers in scripted_answers() {
        let view = service.snapshot(id)?;
        if let Some(step) = &view.current_step {
            println!(
                "Paso {}/{} ({}%): {}",
                step.index, view.progress.total_steps, view.progress.percent, step.title
            );
        }

        for answer in answers {
            match answer {
                Select(category, options) => {
                    let options = options.iter().map(|option| option.to_string()).collect();
                    service.select(id, category, options)?;
                }
                Note(field, text) => {
                    service.write_note(id, field, text)?;
                }
            }
        }

        service.advance(id)?;
    }
    Ok(())
}

pub(crate) fn print_blueprint() {
    let blueprint = SurveyBlueprint::standard();
    println!("MUPAI questionnaire: {} steps", blueprint.total_steps());
    for step in blueprint.steps() {
        let kind = if step.is_optional() {
            "opcional"
        } else {
            "obligatorio"
        };
        println!("\nPaso {} [{}] {} ({kind})", step.index, step.key, step.title);
        for category in &step.categories {
            println!(
                "  - {} [{}]: {} opciones",
                category.label,
                category.key,
                category.options.len()
            );
        }
        for field in &step.text_fields {
            println!("  - {} [{}]: texto libre, {} si vacío", field.label, field.key, NOT_SPECIFIED);
        }
    }
}
