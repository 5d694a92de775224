use std::collections::HashSet;

use super::domain::{CompletionRule, SelectionMode, NONE_OPTION};

/// One checklist field inside a step.
#[derive(Debug, Clone)]
pub struct CategoryTemplate {
    pub key: &'static str,
    pub label: &'static str,
    pub mode: SelectionMode,
    pub options: Vec<&'static str>,
}

impl CategoryTemplate {
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| *candidate == option)
    }
}

/// Free-text answer attached to a step.
#[derive(Debug, Clone)]
pub struct TextFieldTemplate {
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone)]
pub struct StepTemplate {
    pub index: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub rule: CompletionRule,
    pub categories: Vec<CategoryTemplate>,
    pub text_fields: Vec<TextFieldTemplate>,
}

impl StepTemplate {
    pub fn is_optional(&self) -> bool {
        self.rule.is_optional()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlueprintError {
    #[error("a survey needs at least one step")]
    Empty,
    #[error("step `{key}` has index {found}, expected {expected}")]
    StepOutOfOrder {
        key: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("answer key `{0}` is declared more than once")]
    DuplicateKey(&'static str),
    #[error("category `{0}` has no options")]
    NoOptions(&'static str),
}

/// Declarative step table driving progression, validation, and the summary layout.
#[derive(Debug)]
pub struct SurveyBlueprint {
    steps: Vec<StepTemplate>,
}

impl SurveyBlueprint {
    /// Twelve-step dietary pattern questionnaire; steps 1-6 are required food groups.
    pub fn standard() -> Self {
        Self {
            steps: standard_steps(),
        }
    }

    pub fn from_steps(steps: Vec<StepTemplate>) -> Result<Self, BlueprintError> {
        if steps.is_empty() {
            return Err(BlueprintError::Empty);
        }

        let mut keys = HashSet::new();
        for (position, step) in steps.iter().enumerate() {
            let expected = position + 1;
            if step.index != expected {
                return Err(BlueprintError::StepOutOfOrder {
                    key: step.key,
                    expected,
                    found: step.index,
                });
            }

            for category in &step.categories {
                if !keys.insert(category.key) {
                    return Err(BlueprintError::DuplicateKey(category.key));
                }
                if category.options.is_empty() {
                    return Err(BlueprintError::NoOptions(category.key));
                }
            }
            for field in &step.text_fields {
                if !keys.insert(field.key) {
                    return Err(BlueprintError::DuplicateKey(field.key));
                }
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[StepTemplate] {
        &self.steps
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Look up a step by its 1-based index.
    pub fn step(&self, index: usize) -> Option<&StepTemplate> {
        index.checked_sub(1).and_then(|position| self.steps.get(position))
    }

    /// Resolve a category key to its template and owning step index.
    pub fn category(&self, key: &str) -> Option<(usize, &CategoryTemplate)> {
        self.steps.iter().find_map(|step| {
            step.categories
                .iter()
                .find(|category| category.key == key)
                .map(|category| (step.index, category))
        })
    }

    pub fn text_field(&self, key: &str) -> Option<(usize, &TextFieldTemplate)> {
        self.steps.iter().find_map(|step| {
            step.text_fields
                .iter()
                .find(|field| field.key == key)
                .map(|field| (step.index, field))
        })
    }

    pub fn required_steps(&self) -> impl Iterator<Item = &StepTemplate> {
        self.steps.iter().filter(|step| !step.is_optional())
    }
}

/// Multi-select category with the "Ninguno" sentinel appended.
fn food_group(key: &'static str, label: &'static str, foods: &[&'static str]) -> CategoryTemplate {
    let mut options = foods.to_vec();
    options.push(NONE_OPTION);
    CategoryTemplate {
        key,
        label,
        mode: SelectionMode::Multiple,
        options,
    }
}

fn required(
    index: usize,
    key: &'static str,
    title: &'static str,
    categories: Vec<CategoryTemplate>,
) -> StepTemplate {
    StepTemplate {
        index,
        key,
        title,
        rule: CompletionRule::AnySelection,
        categories,
        text_fields: Vec::new(),
    }
}

fn optional(
    index: usize,
    key: &'static str,
    title: &'static str,
    categories: Vec<CategoryTemplate>,
    text_fields: Vec<TextFieldTemplate>,
) -> StepTemplate {
    StepTemplate {
        index,
        key,
        title,
        rule: CompletionRule::Always,
        categories,
        text_fields,
    }
}

fn standard_steps() -> Vec<StepTemplate> {
    vec![
        required(
            1,
            "proteina_grasa",
            "Proteína animal con más grasa",
            vec![
                food_group(
                    "huevos_embutidos",
                    "Huevos y embutidos",
                    &["Huevo entero", "Chorizo", "Salchicha", "Jamón de cerdo", "Tocino", "Longaniza"],
                ),
                food_group(
                    "carnes_grasas",
                    "Carnes y cortes grasos",
                    &["Costilla de res", "Arrachera", "Rib eye", "Chuleta de cerdo", "Carne molida 80/20", "Pollo con piel"],
                ),
                food_group(
                    "quesos_grasos",
                    "Quesos altos en grasa",
                    &["Queso manchego", "Queso chihuahua", "Queso cheddar", "Queso Oaxaca", "Queso crema"],
                ),
                food_group(
                    "lacteos_enteros",
                    "Lácteos enteros",
                    &["Leche entera", "Yogur natural entero", "Crema", "Mantequilla"],
                ),
                food_group(
                    "pescados_grasos",
                    "Pescados grasos",
                    &["Salmón", "Atún en aceite", "Sardinas", "Caballa", "Trucha"],
                ),
            ],
        ),
        required(
            2,
            "proteina_magra",
            "Proteína animal magra",
            vec![
                food_group(
                    "carnes_magras",
                    "Carnes magras",
                    &["Pechuga de pollo", "Pechuga de pavo", "Filete de res magro", "Lomo de cerdo", "Carne molida 90/10"],
                ),
                food_group(
                    "pescados_magros",
                    "Pescados magros",
                    &["Tilapia", "Huachinango", "Atún en agua", "Bacalao", "Robalo"],
                ),
                food_group(
                    "mariscos",
                    "Mariscos",
                    &["Camarón", "Pulpo", "Calamar", "Almejas"],
                ),
                food_group(
                    "quesos_magros",
                    "Quesos bajos en grasa",
                    &["Queso panela", "Queso cottage", "Requesón", "Queso fresco light"],
                ),
                food_group(
                    "lacteos_light",
                    "Lácteos light",
                    &["Leche descremada", "Yogur griego natural", "Leche deslactosada light"],
                ),
            ],
        ),
        required(
            3,
            "grasas_saludables",
            "Fuentes de grasa saludable",
            vec![
                food_group(
                    "grasas_naturales",
                    "Grasas naturales",
                    &["Aguacate", "Aceitunas", "Coco"],
                ),
                food_group(
                    "frutos_secos_semillas",
                    "Frutos secos y semillas",
                    &["Almendras", "Nueces", "Cacahuates", "Pistaches", "Semillas de chía", "Linaza", "Semillas de calabaza"],
                ),
                food_group(
                    "cremas_vegetales",
                    "Cremas de frutos secos",
                    &["Crema de cacahuate", "Crema de almendra"],
                ),
            ],
        ),
        required(
            4,
            "carbohidratos",
            "Carbohidratos",
            vec![
                food_group(
                    "cereales_integrales",
                    "Cereales",
                    &["Avena", "Arroz integral", "Arroz blanco", "Quinoa", "Pasta integral"],
                ),
                food_group(
                    "tuberculos",
                    "Tubérculos",
                    &["Papa", "Camote", "Yuca"],
                ),
                food_group(
                    "panes_tortillas",
                    "Panes y tortillas",
                    &["Tortilla de maíz", "Tortilla de harina", "Pan integral", "Pan blanco"],
                ),
                food_group(
                    "leguminosas",
                    "Leguminosas",
                    &["Frijoles", "Lentejas", "Garbanzos", "Habas"],
                ),
            ],
        ),
        required(
            5,
            "vegetales",
            "Vegetales",
            vec![
                food_group(
                    "vegetales_hoja",
                    "Vegetales de hoja",
                    &["Lechuga", "Espinaca", "Acelga", "Kale", "Arúgula"],
                ),
                food_group(
                    "vegetales_variados",
                    "Otros vegetales",
                    &["Brócoli", "Coliflor", "Calabacita", "Zanahoria", "Jitomate", "Pepino", "Chile poblano", "Nopal", "Ejotes", "Champiñones"],
                ),
            ],
        ),
        required(
            6,
            "frutas",
            "Frutas",
            vec![food_group(
                "frutas",
                "Frutas",
                &["Plátano", "Manzana", "Fresas", "Mango", "Papaya", "Piña", "Naranja", "Sandía", "Uvas", "Arándanos"],
            )],
        ),
        optional(
            7,
            "aceites_coccion",
            "Aceites de cocción",
            vec![food_group(
                "aceites_coccion",
                "Aceites y grasas para cocinar",
                &["Aceite de oliva extra virgen", "Aceite de aguacate", "Aceite de coco", "Manteca de cerdo", "Mantequilla", "Aceite vegetal", "Spray antiadherente"],
            )],
            Vec::new(),
        ),
        optional(
            8,
            "bebidas",
            "Bebidas sin calorías",
            vec![food_group(
                "bebidas_sin_calorias",
                "Bebidas sin calorías",
                &["Agua natural", "Agua mineral", "Café negro", "Té sin azúcar", "Refresco sin azúcar", "Agua saborizada sin azúcar"],
            )],
            Vec::new(),
        ),
        optional(
            9,
            "restricciones",
            "Alergias e intolerancias",
            vec![
                food_group(
                    "alergias",
                    "Alergias alimentarias",
                    &["Lácteos", "Huevo", "Frutos secos", "Mariscos", "Pescado", "Cacahuate", "Soya", "Trigo (gluten)"],
                ),
                food_group(
                    "intolerancias",
                    "Intolerancias",
                    &["Lactosa", "Gluten", "Leguminosas", "FODMAPs"],
                ),
            ],
            vec![TextFieldTemplate {
                key: "alergias_otras",
                label: "Otras alergias o intolerancias",
            }],
        ),
        optional(
            10,
            "antojos",
            "Antojos",
            vec![
                food_group(
                    "antojos_dulces",
                    "Antojos dulces",
                    &["Chocolate", "Pan dulce", "Galletas", "Helado", "Pasteles", "Dulces"],
                ),
                food_group(
                    "antojos_salados",
                    "Antojos salados",
                    &["Papas fritas", "Frituras", "Palomitas", "Cacahuates salados", "Nachos"],
                ),
                food_group(
                    "antojos_comida_rapida",
                    "Comida rápida",
                    &["Pizza", "Hamburguesa", "Tacos", "Hot dogs", "Sushi"],
                ),
            ],
            vec![TextFieldTemplate {
                key: "antojos_notas",
                label: "Notas sobre antojos",
            }],
        ),
        optional(
            11,
            "frecuencia_comidas",
            "Frecuencia de comidas",
            vec![CategoryTemplate {
                key: "frecuencia_comidas",
                label: "Comidas al día",
                mode: SelectionMode::Single,
                options: vec![
                    "2 comidas al día",
                    "3 comidas al día",
                    "4 comidas al día",
                    "5 o más comidas al día",
                    "Variable/Irregular",
                ],
            }],
            Vec::new(),
        ),
        optional(
            12,
            "sugerencias_menu",
            "Sugerencias de menú",
            Vec::new(),
            vec![TextFieldTemplate {
                key: "sugerencias_menus",
                label: "Platillos o menús que te gustaría incluir",
            }],
        ),
    ]
}
