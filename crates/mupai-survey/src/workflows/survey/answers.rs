use std::collections::{BTreeMap, BTreeSet};

use super::blueprint::{CategoryTemplate, StepTemplate};

/// Checklist selections and free-text notes keyed by blueprint answer keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyAnswers {
    selections: BTreeMap<String, BTreeSet<String>>,
    notes: BTreeMap<String, String>,
}

impl SurveyAnswers {
    pub fn selection(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.selections.get(category)
    }

    pub fn note(&self, field: &str) -> Option<&str> {
        self.notes.get(field).map(String::as_str)
    }

    /// Replace a category's selection; an empty set removes it.
    pub(crate) fn replace_selection(&mut self, category: &str, options: BTreeSet<String>) {
        if options.is_empty() {
            self.selections.remove(category);
        } else {
            self.selections.insert(category.to_string(), options);
        }
    }

    /// Store a trimmed note; blank text removes it.
    pub(crate) fn replace_note(&mut self, field: &str, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.notes.remove(field);
        } else {
            self.notes.insert(field.to_string(), trimmed.to_string());
        }
    }

    /// Size of the union of a step's category selections.
    pub fn selected_in(&self, step: &StepTemplate) -> usize {
        step.categories
            .iter()
            .filter_map(|category| self.selections.get(category.key))
            .map(BTreeSet::len)
            .sum()
    }

    pub fn satisfies(&self, step: &StepTemplate) -> bool {
        step.rule.holds(self.selected_in(step))
    }

    /// Chosen options for a category in the blueprint's declared order.
    pub fn ordered_selection(&self, category: &CategoryTemplate) -> Vec<&'static str> {
        match self.selections.get(category.key) {
            Some(chosen) => category
                .options
                .iter()
                .copied()
                .filter(|option| chosen.contains(*option))
                .collect(),
            None => Vec::new(),
        }
    }
}
