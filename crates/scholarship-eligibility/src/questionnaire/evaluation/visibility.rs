//! `showIf` expressions deciding whether a question is presented.
//!
//! Recognizers search anywhere in the text and are tried in a fixed order, so a
//! `Q.value == 'X'` fragment claims the whole expression even inside a compound
//! form. Expressions that match nothing stay visible.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::super::domain::Answer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    NotEquals,
}

/// `Q.value (==|!=) 'X'` against another question's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub question_id: String,
    pub comparison: Comparison,
    pub expected: String,
}

impl Clause {
    /// Clause semantics inside a conjunction: an unanswered question satisfies
    /// negative tests and fails positive ones.
    fn holds_in_conjunction(&self, answers: &BTreeMap<String, Answer>) -> bool {
        match answers.get(&self.question_id) {
            None => self.comparison == Comparison::NotEquals,
            Some(answer) => match self.comparison {
                Comparison::Equals => answer.value.is_exactly(&self.expected),
                Comparison::NotEquals => !answer.value.is_exactly(&self.expected),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// No `conditionalDisplay` on the question.
    Always,
    Equals {
        question_id: String,
        expected: String,
    },
    NotEquals {
        question_id: String,
        expected: String,
    },
    /// `A AND B ...`; a `None` entry is a clause that did not parse and holds.
    AllOf(Vec<Option<Clause>>),
    /// `A OR B ...` over equality clauses; a `None` entry never holds.
    AnyOf(Vec<Option<Clause>>),
    Includes {
        question_id: String,
        value: String,
    },
    NonEmpty {
        question_id: String,
    },
    Unrecognized,
}

fn equals_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9_]+)\.value\s*==\s*'([^']+)'").expect("valid equals pattern")
    })
}

fn not_equals_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9_]+)\.value\s*!=\s*'([^']+)'").expect("valid not-equals pattern")
    })
}

fn clause_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9_]+)\.value\s*(==|!=)\s*'([^']+)'").expect("valid clause pattern")
    })
}

fn includes_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9_]+)\.selectedValues\.includes\('([^']+)'\)")
            .expect("valid includes pattern")
    })
}

fn non_empty_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9_]+)\.selectedOptions\.length > 0").expect("valid length pattern")
    })
}

fn capture_pair(pattern: &Regex, raw: &str) -> Option<(String, String)> {
    let captures = pattern.captures(raw)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

fn parse_clause(part: &str) -> Option<Clause> {
    let captures = clause_pattern().captures(part)?;
    let comparison = if &captures[2] == "==" {
        Comparison::Equals
    } else {
        Comparison::NotEquals
    };
    Some(Clause {
        question_id: captures[1].to_string(),
        comparison,
        expected: captures[3].to_string(),
    })
}

fn parse_equality_clause(part: &str) -> Option<Clause> {
    capture_pair(equals_pattern(), part).map(|(question_id, expected)| Clause {
        question_id,
        comparison: Comparison::Equals,
        expected,
    })
}

impl Visibility {
    pub fn parse(show_if: Option<&str>) -> Self {
        let Some(raw) = show_if else {
            return Visibility::Always;
        };

        if let Some((question_id, expected)) = capture_pair(equals_pattern(), raw) {
            return Visibility::Equals {
                question_id,
                expected,
            };
        }

        if let Some((question_id, expected)) = capture_pair(not_equals_pattern(), raw) {
            return Visibility::NotEquals {
                question_id,
                expected,
            };
        }

        if raw.contains(" AND ") {
            return Visibility::AllOf(
                raw.split(" AND ")
                    .map(|part| parse_clause(part.trim()))
                    .collect(),
            );
        }

        if raw.contains(" OR ") {
            return Visibility::AnyOf(
                raw.split(" OR ")
                    .map(|part| parse_equality_clause(part.trim()))
                    .collect(),
            );
        }

        if raw.contains("selectedValues.includes") {
            if let Some((question_id, value)) = capture_pair(includes_pattern(), raw) {
                return Visibility::Includes { question_id, value };
            }
        }

        if raw.contains("selectedOptions.length > 0") {
            if let Some(captures) = non_empty_pattern().captures(raw) {
                return Visibility::NonEmpty {
                    question_id: captures[1].to_string(),
                };
            }
        }

        Visibility::Unrecognized
    }

    pub fn is_visible(&self, answers: &BTreeMap<String, Answer>) -> bool {
        match self {
            Visibility::Always | Visibility::Unrecognized => true,
            Visibility::Equals {
                question_id,
                expected,
            } => answers
                .get(question_id)
                .is_some_and(|answer| answer.value.is_exactly(expected)),
            Visibility::NotEquals {
                question_id,
                expected,
            } => answers
                .get(question_id)
                .is_some_and(|answer| !answer.value.is_exactly(expected)),
            Visibility::AllOf(clauses) => clauses.iter().all(|clause| match clause {
                Some(clause) => clause.holds_in_conjunction(answers),
                None => true,
            }),
            Visibility::AnyOf(clauses) => clauses.iter().flatten().any(|clause| {
                answers
                    .get(&clause.question_id)
                    .is_some_and(|answer| answer.value.is_exactly(&clause.expected))
            }),
            // Absent or scalar answers fall through to the fail-open default.
            Visibility::Includes { question_id, value } => answers
                .get(question_id)
                .and_then(|answer| answer.value.as_multiple())
                .map_or(true, |selected| selected.iter().any(|item| item == value)),
            Visibility::NonEmpty { question_id } => answers
                .get(question_id)
                .and_then(|answer| answer.value.as_multiple())
                .map_or(true, |selected| !selected.is_empty()),
        }
    }

    /// Question ids whose answers this expression reads.
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Visibility::Always | Visibility::Unrecognized => Vec::new(),
            Visibility::Equals { question_id, .. }
            | Visibility::NotEquals { question_id, .. }
            | Visibility::Includes { question_id, .. }
            | Visibility::NonEmpty { question_id } => vec![question_id.as_str()],
            Visibility::AllOf(clauses) | Visibility::AnyOf(clauses) => clauses
                .iter()
                .flatten()
                .map(|clause| clause.question_id.as_str())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::domain::AnswerValue;

    fn answers(entries: &[(&str, AnswerValue)]) -> BTreeMap<String, Answer> {
        entries
            .iter()
            .map(|(question_id, value)| {
                (
                    question_id.to_string(),
                    Answer {
                        question_id: question_id.to_string(),
                        value: value.clone(),
                        sub_answers: None,
                    },
                )
            })
            .collect()
    }

    fn visible(show_if: &str, entries: &[(&str, AnswerValue)]) -> bool {
        Visibility::parse(Some(show_if)).is_visible(&answers(entries))
    }

    #[test]
    fn questions_without_display_rules_are_always_visible() {
        assert_eq!(Visibility::parse(None), Visibility::Always);
        assert!(Visibility::Always.is_visible(&BTreeMap::new()));
    }

    #[test]
    fn equality_requires_matching_answer() {
        let show_if = "Q3.value == 'high_school_graduate'";
        assert!(visible(show_if, &[("Q3", "high_school_graduate".into())]));
        assert!(!visible(show_if, &[("Q3", "undergraduate".into())]));
        assert!(!visible(show_if, &[]));
    }

    #[test]
    fn inequality_hides_unanswered_questions() {
        let show_if = "Q3.value != 'not_enrolled'";
        assert!(visible(show_if, &[("Q3", "full_time".into())]));
        assert!(!visible(show_if, &[("Q3", "not_enrolled".into())]));
        assert!(!visible(show_if, &[]));
    }

    #[test]
    fn conjunction_with_absent_negative_clause_is_visible() {
        let show_if = "Q1.value != 'x' AND Q2.value == 'y'";
        assert!(visible(show_if, &[("Q2", "y".into())]));
        assert!(!visible(show_if, &[("Q2", "z".into())]));
    }

    #[test]
    fn equality_fragment_claims_compound_expressions() {
        let parsed = Visibility::parse(Some("Q1.value != 'x' AND Q2.value == 'y'"));
        assert_eq!(
            parsed,
            Visibility::Equals {
                question_id: "Q2".to_string(),
                expected: "y".to_string()
            }
        );

        let parsed = Visibility::parse(Some("Q1.value == 'a' OR Q2.value == 'b'"));
        assert!(matches!(parsed, Visibility::Equals { ref question_id, .. } if question_id == "Q1"));
        assert!(!parsed.is_visible(&answers(&[("Q2", "b".into())])));
    }

    #[test]
    fn conjunction_clause_semantics() {
        let all_of = Visibility::AllOf(vec![
            Some(Clause {
                question_id: "Q1".to_string(),
                comparison: Comparison::NotEquals,
                expected: "x".to_string(),
            }),
            Some(Clause {
                question_id: "Q2".to_string(),
                comparison: Comparison::Equals,
                expected: "y".to_string(),
            }),
            None,
        ]);

        assert!(all_of.is_visible(&answers(&[("Q2", "y".into())])));
        assert!(!all_of.is_visible(&answers(&[("Q1", "x".into()), ("Q2", "y".into())])));
        assert!(!all_of.is_visible(&answers(&[])));
    }

    #[test]
    fn disjunction_clause_semantics() {
        let any_of = Visibility::AnyOf(vec![
            None,
            Some(Clause {
                question_id: "Q2".to_string(),
                comparison: Comparison::Equals,
                expected: "y".to_string(),
            }),
        ]);

        assert!(any_of.is_visible(&answers(&[("Q2", "y".into())])));
        assert!(!any_of.is_visible(&answers(&[("Q2", "n".into())])));
        assert!(!Visibility::AnyOf(vec![None]).is_visible(&answers(&[])));
    }

    #[test]
    fn compound_forms_without_value_clauses() {
        assert!(matches!(
            Visibility::parse(Some("Q1.ready AND Q2.ready")),
            Visibility::AllOf(ref clauses) if clauses.iter().all(Option::is_none)
        ));
        assert!(visible("Q1.ready AND Q2.ready", &[]));
        assert!(!visible("Q1.ready OR Q2.ready", &[]));
    }

    #[test]
    fn includes_checks_list_answers() {
        let show_if = "Q7.selectedValues.includes('other')";
        assert!(visible(show_if, &[("Q7", vec!["other", "rural"].into())]));
        assert!(!visible(show_if, &[("Q7", vec!["rural"].into())]));
        assert!(visible(show_if, &[("Q7", "other".into())]));
        assert!(visible(show_if, &[]));
    }

    #[test]
    fn non_empty_selection() {
        let show_if = "Q8.selectedOptions.length > 0";
        assert!(visible(show_if, &[("Q8", vec!["a"].into())]));
        assert!(!visible(show_if, &[("Q8", AnswerValue::Multiple(Vec::new()))]));
        assert_eq!(
            Visibility::parse(Some(show_if)).dependencies(),
            vec!["Q8"]
        );
    }

    #[test]
    fn unrecognized_expressions_fail_open() {
        let parsed = Visibility::parse(Some("Q1.value > 3"));
        assert_eq!(parsed, Visibility::Unrecognized);
        assert!(parsed.is_visible(&BTreeMap::new()));
    }
}
