//! Rule conditions evaluated against the answered value of a single question.
//!
//! The grammar is a fixed list of recognizers tried in priority order; the first
//! structural match decides the node kind. Text matching none of them compiles to
//! [`Condition::Unrecognized`], which never holds.

use std::sync::OnceLock;

use regex::Regex;

use super::super::domain::AnswerValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `value == 'X'`
    Equals(String),
    /// `value != 'X'`
    NotEquals(String),
    /// `A OR B`, each side compiled with the same priority list.
    AnyOf(Vec<Condition>),
    /// `selectedValues.includes('X')`, or its `!`-prefixed negation.
    Includes { value: String, negated: bool },
    Unrecognized,
}

fn equals_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"value\s*==\s*'([^']+)'").expect("valid equals pattern"))
}

fn not_equals_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"value\s*!=\s*'([^']+)'").expect("valid not-equals pattern"))
}

fn includes_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"selectedValues\.includes\('([^']+)'\)").expect("valid includes pattern")
    })
}

fn first_capture(pattern: &Regex, raw: &str) -> Option<String> {
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_string())
}

impl Condition {
    pub fn parse(raw: &str) -> Self {
        if raw.contains("value ==") {
            if let Some(expected) = first_capture(equals_pattern(), raw) {
                return Condition::Equals(expected);
            }
        }

        if raw.contains("value !=") {
            if let Some(expected) = first_capture(not_equals_pattern(), raw) {
                return Condition::NotEquals(expected);
            }
        }

        if raw.contains(" OR ") {
            return Condition::AnyOf(
                raw.split(" OR ")
                    .map(|part| Condition::parse(part.trim()))
                    .collect(),
            );
        }

        if raw.contains("selectedValues.includes") {
            if let Some(value) = first_capture(includes_pattern(), raw) {
                return Condition::Includes {
                    value,
                    negated: raw.starts_with('!'),
                };
            }
        }

        Condition::Unrecognized
    }

    pub fn evaluate(&self, answer: &AnswerValue) -> bool {
        match self {
            Condition::Equals(expected) => answer.is_exactly(expected),
            Condition::NotEquals(expected) => !answer.is_exactly(expected),
            Condition::AnyOf(parts) => parts.iter().any(|part| part.evaluate(answer)),
            // Scalar answers never satisfy an includes test, negated or not.
            Condition::Includes { value, negated } => match answer.as_multiple() {
                Some(selected) => selected.iter().any(|item| item == value) != *negated,
                None => false,
            },
            Condition::Unrecognized => false,
        }
    }

    pub fn is_recognized(&self) -> bool {
        match self {
            Condition::Unrecognized => false,
            Condition::AnyOf(parts) => parts.iter().any(Condition::is_recognized),
            _ => true,
        }
    }
}

/// One-shot parse and evaluate.
pub fn evaluate(condition: &str, answer: &AnswerValue) -> bool {
    Condition::parse(condition).evaluate(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(value: &str) -> AnswerValue {
        AnswerValue::from(value)
    }

    fn multiple(values: &[&str]) -> AnswerValue {
        AnswerValue::from(values.to_vec())
    }

    #[test]
    fn equality_matches_scalar_answers_only() {
        assert!(evaluate("value == 'no'", &single("no")));
        assert!(!evaluate("value == 'no'", &single("yes")));
        assert!(!evaluate("value == 'no'", &multiple(&["no"])));
    }

    #[test]
    fn inequality_holds_for_list_answers() {
        assert!(evaluate("value != 'alberta'", &single("ontario")));
        assert!(!evaluate("value != 'alberta'", &single("alberta")));
        assert!(evaluate("value != 'alberta'", &multiple(&["alberta"])));
    }

    #[test]
    fn equality_tolerates_spacing_after_operator() {
        assert_eq!(
            Condition::parse("value ==   'full_time'"),
            Condition::Equals("full_time".to_string())
        );
    }

    #[test]
    fn first_equality_claims_disjunctions() {
        let condition = Condition::parse("value == 'a' OR value == 'b'");

        assert_eq!(condition, Condition::Equals("a".to_string()));
        assert!(condition.evaluate(&single("a")));
        assert!(!condition.evaluate(&single("b")));
    }

    #[test]
    fn disjunction_of_includes_checks_each_side() {
        let condition =
            Condition::parse("selectedValues.includes('x') OR selectedValues.includes('y')");

        assert!(matches!(condition, Condition::AnyOf(ref parts) if parts.len() == 2));
        assert!(condition.evaluate(&multiple(&["y"])));
        assert!(!condition.evaluate(&multiple(&["z"])));
    }

    #[test]
    fn includes_and_negation() {
        assert!(evaluate(
            "selectedValues.includes('indigenous')",
            &multiple(&["indigenous", "rural"])
        ));
        assert!(!evaluate(
            "selectedValues.includes('indigenous')",
            &multiple(&["rural"])
        ));
        assert!(evaluate(
            "!selectedValues.includes('none')",
            &multiple(&["rural"])
        ));
        assert!(!evaluate(
            "!selectedValues.includes('none')",
            &multiple(&["none"])
        ));
    }

    #[test]
    fn includes_against_scalar_is_false_even_when_negated() {
        assert!(!evaluate("selectedValues.includes('a')", &single("a")));
        assert!(!evaluate("!selectedValues.includes('a')", &single("b")));
    }

    #[test]
    fn unrecognized_conditions_fail_closed() {
        for raw in ["", "value > 3", "answer == 'no'", "value=='no'", "value == ''"] {
            let condition = Condition::parse(raw);
            assert!(!condition.is_recognized(), "{raw} should be unrecognized");
            assert!(!condition.evaluate(&single("no")));
            assert!(!condition.evaluate(&multiple(&["no"])));
        }
    }
}
