use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{CompiledQuestion, EligibilityCatalog};
use super::domain::{AnswerValue, ConditionalQuestion, Question, ScholarshipEntry, SubAnswers};
use super::reducer::{reduce, EligibilityEvent, EligibilityState};

/// Answered and visible counts for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub answered: usize,
    pub total: usize,
}

impl TierProgress {
    pub fn is_complete(&self) -> bool {
        self.answered == self.total
    }
}

/// Pair handed to the surrounding wizard once the questionnaire is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityHandoff {
    pub eligible_scholarship_ids: Vec<String>,
    pub answers: BTreeMap<String, AnswerValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("no questions have been answered")]
    NoAnswers,
    #[error("every scholarship has been eliminated")]
    NothingEligible,
}

/// Holds the current [`EligibilityState`] for one questionnaire run.
///
/// Each mutation dispatches an event through the reducer and swaps the state
/// for a fully recomputed one; readers never observe a half-applied change.
#[derive(Debug, Clone)]
pub struct EligibilityStore {
    catalog: Arc<EligibilityCatalog>,
    state: Arc<EligibilityState>,
}

impl EligibilityStore {
    pub fn new(catalog: Arc<EligibilityCatalog>) -> Self {
        let state = Arc::new(EligibilityState::initial(&catalog));
        Self { catalog, state }
    }

    pub fn catalog(&self) -> &EligibilityCatalog {
        &self.catalog
    }

    pub fn state(&self) -> Arc<EligibilityState> {
        Arc::clone(&self.state)
    }

    pub fn dispatch(&mut self, event: EligibilityEvent) {
        let next = reduce(&self.catalog, &self.state, event);
        debug!(
            answers = next.answers.len(),
            eligible = next.eligible_scholarships.len(),
            eliminated = next.eliminated_scholarships.len(),
            "eligibility recomputed"
        );
        self.state = Arc::new(next);
    }

    pub fn answer(
        &mut self,
        question_id: impl Into<String>,
        value: impl Into<AnswerValue>,
        sub_answers: Option<SubAnswers>,
    ) {
        self.dispatch(EligibilityEvent::Answered {
            question_id: question_id.into(),
            value: value.into(),
            sub_answers,
        });
    }

    pub fn clear(&mut self, question_id: impl Into<String>) {
        self.dispatch(EligibilityEvent::Cleared {
            question_id: question_id.into(),
        });
    }

    pub fn reset(&mut self) {
        self.dispatch(EligibilityEvent::Reset);
    }

    pub fn is_visible(&self, question: &CompiledQuestion) -> bool {
        question.visibility.is_visible(&self.state.answers)
    }

    /// Visible questions of a tier in declaration order; unknown tiers yield nothing.
    pub fn visible_questions(&self, tier_id: &str) -> Vec<&Question> {
        self.visible_compiled(tier_id)
            .into_iter()
            .map(|compiled| &compiled.question)
            .collect()
    }

    fn visible_compiled(&self, tier_id: &str) -> Vec<&CompiledQuestion> {
        match self.catalog.tier(tier_id) {
            Some(tier) => self
                .catalog
                .tier_questions(tier)
                .iter()
                .filter(|compiled| self.is_visible(compiled))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn tier_progress(&self, tier_id: &str) -> TierProgress {
        let visible = self.visible_compiled(tier_id);
        let answered = visible
            .iter()
            .filter(|compiled| self.state.answers.contains_key(compiled.question_id()))
            .count();
        TierProgress {
            answered,
            total: visible.len(),
        }
    }

    /// Percentage of currently visible questions that have an answer.
    pub fn progress(&self) -> f64 {
        let (answered, total) = self
            .catalog
            .questions()
            .iter()
            .filter(|compiled| self.is_visible(compiled))
            .fold((0usize, 0usize), |(answered, total), compiled| {
                let answered = if self.state.answers.contains_key(compiled.question_id()) {
                    answered + 1
                } else {
                    answered
                };
                (answered, total + 1)
            });

        if total == 0 {
            0.0
        } else {
            answered as f64 / total as f64 * 100.0
        }
    }

    /// Sub-questions revealed by the parent's current answer. The answer stores
    /// an option value, so the option is looked up by value and matched on id.
    pub fn triggered_sub_questions(&self, question_id: &str) -> Vec<&ConditionalQuestion> {
        let Some(compiled) = self.catalog.question(question_id) else {
            return Vec::new();
        };
        let Some(selected) = self
            .state
            .answers
            .get(question_id)
            .and_then(|answer| answer.value.as_single())
            .and_then(|value| compiled.question.option_by_value(value))
        else {
            return Vec::new();
        };

        compiled
            .question
            .conditional_questions
            .iter()
            .filter(|sub_question| sub_question.triggered_by == selected.option_id)
            .collect()
    }

    /// Registry records still eligible, in registry order.
    pub fn eligible_entries(&self) -> Vec<&ScholarshipEntry> {
        self.catalog
            .scholarships()
            .iter()
            .filter(|entry| self.state.is_eligible(&entry.scholarship_id))
            .collect()
    }

    pub fn can_complete(&self) -> bool {
        self.check_completion().is_ok()
    }

    fn check_completion(&self) -> Result<(), CompletionError> {
        if self.state.eligible_scholarships.is_empty() {
            return Err(CompletionError::NothingEligible);
        }
        if self.progress() <= 0.0 {
            return Err(CompletionError::NoAnswers);
        }
        Ok(())
    }

    /// Finish the run, releasing the eligible ids and raw answers to the caller.
    pub fn complete(self) -> Result<EligibilityHandoff, CompletionError> {
        self.check_completion()?;

        let state = Arc::unwrap_or_clone(self.state);
        let answers = state
            .answers
            .into_iter()
            .map(|(question_id, answer)| (question_id, answer.value))
            .collect();

        Ok(EligibilityHandoff {
            eligible_scholarship_ids: state.eligible_scholarships,
            answers,
        })
    }
}
