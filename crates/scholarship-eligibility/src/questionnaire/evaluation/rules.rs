use serde::{Deserialize, Serialize};
use tracing::debug;

use super::super::domain::{AnswerValue, EliminationRule, RuleAction};
use super::condition::Condition;

/// Audit entry explaining why a scholarship left the eligible set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminatedScholarship {
    pub scholarship_id: String,
    pub reason: String,
    pub eliminated_by_question_id: String,
}

/// Eligible ids (registry order) and the ordered elimination log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityTally {
    pub eligible: Vec<String>,
    pub eliminated: Vec<EliminatedScholarship>,
}

impl EligibilityTally {
    pub fn all_eligible<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            eligible: ids.into_iter().map(Into::into).collect(),
            eliminated: Vec::new(),
        }
    }

    pub fn is_eligible(&self, scholarship_id: &str) -> bool {
        self.eligible.iter().any(|id| id == scholarship_id)
    }

    fn is_logged(&self, scholarship_id: &str) -> bool {
        self.eliminated
            .iter()
            .any(|entry| entry.scholarship_id == scholarship_id)
    }

    /// Remove `scholarship_id` from the eligible set and log it. The first
    /// elimination of an id wins; repeats are ignored.
    fn eliminate(&mut self, scholarship_id: &str, reason: &str, question_id: &str) {
        self.eligible.retain(|id| id != scholarship_id);
        if !self.is_logged(scholarship_id) {
            self.eliminated.push(EliminatedScholarship {
                scholarship_id: scholarship_id.to_string(),
                reason: reason.to_string(),
                eliminated_by_question_id: question_id.to_string(),
            });
        }
    }
}

/// Elimination rule paired with its parsed condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub rule: EliminationRule,
    pub condition: Condition,
}

impl CompiledRule {
    pub fn compile(rule: EliminationRule) -> Self {
        let condition = Condition::parse(&rule.condition);
        Self { rule, condition }
    }

    pub fn fires(&self, value: &AnswerValue) -> bool {
        self.condition.evaluate(value)
    }
}

/// Fold a question's rules, in declaration order, over the tally. Later rules
/// observe the eligible set as narrowed by earlier ones.
pub fn apply_rules(
    rules: &[CompiledRule],
    question_id: &str,
    value: &AnswerValue,
    mut tally: EligibilityTally,
) -> EligibilityTally {
    for compiled in rules {
        if !compiled.fires(value) {
            continue;
        }

        let rule = &compiled.rule;
        let before = tally.eligible.len();
        match rule.action {
            RuleAction::EliminateAll => {
                let eligible = std::mem::take(&mut tally.eligible);
                for id in &eligible {
                    tally.eliminate(id, &rule.elimination_message, question_id);
                }
            }
            RuleAction::Eliminate => {
                for id in rule.eliminated_scholarships.iter().flatten() {
                    if tally.is_eligible(id) {
                        tally.eliminate(id, &rule.elimination_message, question_id);
                    }
                }
            }
            RuleAction::KeepOnly => {
                if let Some(kept) = &rule.kept_scholarships {
                    let dropped: Vec<String> = tally
                        .eligible
                        .iter()
                        .filter(|id| !kept.contains(*id))
                        .cloned()
                        .collect();
                    for id in &dropped {
                        tally.eliminate(id, &rule.elimination_message, question_id);
                    }
                }
            }
            RuleAction::AddPreference => {
                debug!(
                    rule_id = %rule.rule_id,
                    question_id,
                    "preference rule fired; preferences do not affect eligibility"
                );
            }
            RuleAction::Unknown => {}
        }

        debug!(
            rule_id = %rule.rule_id,
            question_id,
            action = rule.action.label(),
            removed = before - tally.eligible.len(),
            "elimination rule fired"
        );
    }

    tally
}
