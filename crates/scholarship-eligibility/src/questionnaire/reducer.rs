use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::catalog::EligibilityCatalog;
use super::domain::{Answer, AnswerValue, SubAnswers};
use super::evaluation::{apply_rules, EligibilityTally, EliminatedScholarship};

/// Answers plus the eligibility derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityState {
    pub answers: BTreeMap<String, Answer>,
    pub eligible_scholarships: Vec<String>,
    pub eliminated_scholarships: Vec<EliminatedScholarship>,
    /// Populated by no rule action today; carried for downstream consumers.
    pub preferred_scholarships: BTreeSet<String>,
}

impl EligibilityState {
    /// No answers and the whole registry eligible.
    pub fn initial(catalog: &EligibilityCatalog) -> Self {
        Self::from_answers(catalog, BTreeMap::new())
    }

    pub fn from_answers(catalog: &EligibilityCatalog, answers: BTreeMap<String, Answer>) -> Self {
        let tally = recompute(catalog, &answers);
        Self {
            answers,
            eligible_scholarships: tally.eligible,
            eliminated_scholarships: tally.eliminated,
            preferred_scholarships: BTreeSet::new(),
        }
    }

    pub fn is_eligible(&self, scholarship_id: &str) -> bool {
        self.eligible_scholarships
            .iter()
            .any(|id| id == scholarship_id)
    }

    pub fn elimination_of(&self, scholarship_id: &str) -> Option<&EliminatedScholarship> {
        self.eliminated_scholarships
            .iter()
            .find(|entry| entry.scholarship_id == scholarship_id)
    }
}

/// Mutation applied to an [`EligibilityState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EligibilityEvent {
    #[serde(rename_all = "camelCase")]
    Answered {
        question_id: String,
        value: AnswerValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub_answers: Option<SubAnswers>,
    },
    #[serde(rename_all = "camelCase")]
    Cleared { question_id: String },
    Reset,
}

/// Rebuild eligibility from the full registry and an empty log, walking every
/// answered, rule-bearing question in catalog order.
pub fn recompute(
    catalog: &EligibilityCatalog,
    answers: &BTreeMap<String, Answer>,
) -> EligibilityTally {
    catalog
        .questions()
        .iter()
        .filter(|compiled| compiled.has_rules())
        .fold(
            EligibilityTally::all_eligible(catalog.scholarship_ids()),
            |tally, compiled| match answers.get(compiled.question_id()) {
                Some(answer) => {
                    apply_rules(&compiled.rules, compiled.question_id(), &answer.value, tally)
                }
                None => tally,
            },
        )
}

/// Pure transition: the next state depends only on the prior answers and the event.
pub fn reduce(
    catalog: &EligibilityCatalog,
    prior: &EligibilityState,
    event: EligibilityEvent,
) -> EligibilityState {
    let mut answers = prior.answers.clone();
    match event {
        EligibilityEvent::Answered {
            question_id,
            value,
            sub_answers,
        } => {
            answers.insert(
                question_id.clone(),
                Answer {
                    question_id,
                    value,
                    sub_answers,
                },
            );
        }
        EligibilityEvent::Cleared { question_id } => {
            answers.remove(&question_id);
        }
        EligibilityEvent::Reset => answers.clear(),
    }

    EligibilityState::from_answers(catalog, answers)
}
