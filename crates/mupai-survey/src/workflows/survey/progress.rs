use std::collections::BTreeMap;

use super::answers::SurveyAnswers;
use super::blueprint::SurveyBlueprint;
use super::domain::{StepRejection, StepTransition};

/// Linear step gate: which step is active, how far the user has unlocked, and what is done.
///
/// Invariant: `1 <= current_step <= max_unlocked_step <= total_steps`, and
/// `max_unlocked_step` never decreases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    current_step: usize,
    max_unlocked_step: usize,
    total_steps: usize,
    completed: BTreeMap<usize, bool>,
}

impl ProgressState {
    pub fn new(total_steps: usize) -> Self {
        Self {
            current_step: 1,
            max_unlocked_step: 1,
            total_steps: total_steps.max(1),
            completed: BTreeMap::new(),
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn max_unlocked_step(&self) -> usize {
        self.max_unlocked_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_completed(&self, step: usize) -> bool {
        self.completed.get(&step).copied().unwrap_or(false)
    }

    pub fn completed_steps(&self) -> Vec<usize> {
        self.completed
            .iter()
            .filter_map(|(step, done)| done.then_some(*step))
            .collect()
    }

    pub fn is_unlocked(&self, step: usize) -> bool {
        (1..=self.max_unlocked_step).contains(&step)
    }

    /// `round(100 * current_step / total_steps)`, rounding halves up.
    pub fn percent(&self) -> u8 {
        let rounded = (100 * self.current_step + self.total_steps / 2) / self.total_steps;
        rounded.min(100) as u8
    }

    /// Move forward when the current step's completion rule holds.
    pub fn advance(
        &mut self,
        blueprint: &SurveyBlueprint,
        answers: &SurveyAnswers,
    ) -> Result<StepTransition, StepRejection> {
        let from = self.current_step;
        let Some(step) = blueprint.step(from) else {
            return Err(StepRejection {
                step: from,
                title: "paso desconocido",
            });
        };

        if !answers.satisfies(step) {
            return Err(StepRejection {
                step: from,
                title: step.title,
            });
        }

        self.completed.insert(from, true);
        if from >= self.total_steps {
            return Ok(StepTransition::Finished { step: from });
        }

        self.current_step = from + 1;
        self.max_unlocked_step = self.max_unlocked_step.max(self.current_step);
        Ok(StepTransition::Advanced {
            from,
            to: self.current_step,
        })
    }

    /// Move back one step. Completion flags and unlocks are left untouched.
    pub fn retreat(&mut self) -> StepTransition {
        if self.current_step <= 1 {
            return StepTransition::AtFirstStep;
        }

        let from = self.current_step;
        self.current_step -= 1;
        StepTransition::Retreated {
            from,
            to: self.current_step,
        }
    }

    /// Drop a completion flag whose rule no longer holds after an edit.
    pub(crate) fn invalidate(&mut self, step: usize) {
        if let Some(done) = self.completed.get_mut(&step) {
            *done = false;
        }
    }
}
