use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Registry record describing one scholarship under consideration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarshipEntry {
    pub scholarship_id: String,
    #[serde(alias = "name")]
    pub scholarship_name: String,
    #[serde(default, alias = "deadline")]
    pub application_deadline: String,
    #[serde(default)]
    pub application_period: String,
    #[serde(default)]
    pub payment_timing: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_awards: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_value: Option<AwardValue>,
}

/// Award amount, either flat or split by degree level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AwardValue {
    Amount(f64),
    ByDegree {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        masters: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        doctoral: Option<f64>,
    },
}

impl AwardValue {
    pub fn label(&self) -> String {
        match self {
            AwardValue::Amount(amount) => format_dollars(*amount),
            AwardValue::ByDegree {
                masters: Some(masters),
                doctoral: Some(doctoral),
            } => format!("{} - {}", format_dollars(*masters), format_dollars(*doctoral)),
            AwardValue::ByDegree { .. } => "Variable".to_string(),
        }
    }
}

/// Whole amounts print without cents; anything else is rounded to the cent.
fn format_dollars(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    match cents % 100 {
        0 => format!("{sign}${grouped}"),
        fraction => format!("{sign}${grouped}.{fraction:02}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    CourseMarksInput,
    TextArea,
}

impl QuestionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SingleChoice => "Single choice",
            Self::MultipleChoice => "Multiple choice",
            Self::CourseMarksInput => "Course marks",
            Self::TextArea => "Free text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub option_id: String,
    #[serde(default)]
    pub option_text: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub field_id: String,
    #[serde(default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Follow-up question revealed when the parent answer selects the triggering option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalQuestion {
    /// Option id (not value) of the parent question that reveals this sub-question.
    pub triggered_by: String,
    pub sub_question_id: String,
    #[serde(default)]
    pub sub_question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default)]
    pub input_fields: Vec<InputField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalDisplay {
    pub show_if: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: String,
    #[serde(default)]
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub elimination_rules: Vec<EliminationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_display: Option<ConditionalDisplay>,
    #[serde(default)]
    pub conditional_questions: Vec<ConditionalQuestion>,
    #[serde(default)]
    pub input_fields: Vec<InputField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_info: BTreeMap<String, String>,
}

impl Question {
    pub fn show_if(&self) -> Option<&str> {
        self.conditional_display
            .as_ref()
            .map(|display| display.show_if.as_str())
    }

    pub fn option_by_value(&self, value: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|option| option.value == value)
    }
}

/// Ordered group of questions. Tiers are walked in ascending `tier_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTier {
    pub tier_id: String,
    pub tier_order: u32,
    #[serde(default)]
    pub tier_name: String,
    #[serde(default)]
    pub tier_description: String,
    #[serde(default)]
    pub estimated_elimination_rate: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Eliminate,
    KeepOnly,
    EliminateAll,
    AddPreference,
    #[serde(other)]
    Unknown,
}

impl RuleAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eliminate => "eliminate",
            Self::KeepOnly => "keep_only",
            Self::EliminateAll => "eliminate_all",
            Self::AddPreference => "add_preference",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminationRule {
    pub rule_id: String,
    pub condition: String,
    pub action: RuleAction,
    #[serde(default)]
    pub elimination_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eliminated_scholarships: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kept_scholarships: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_scholarships: Option<Vec<String>>,
}

impl EliminationRule {
    /// Every scholarship id the rule names, regardless of action.
    pub fn referenced_scholarships(&self) -> impl Iterator<Item = &str> {
        self.eliminated_scholarships
            .iter()
            .chain(self.kept_scholarships.iter())
            .chain(self.preferred_scholarships.iter())
            .flatten()
            .map(String::as_str)
    }
}

/// Recorded answer value: a single selection/text, or a list of selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            AnswerValue::Single(value) => Some(value),
            AnswerValue::Multiple(_) => None,
        }
    }

    pub fn as_multiple(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Single(_) => None,
            AnswerValue::Multiple(values) => Some(values),
        }
    }

    /// Strict equality against a scalar; list values never match.
    pub fn is_exactly(&self, expected: &str) -> bool {
        self.as_single() == Some(expected)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Single(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Single(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(values: Vec<String>) -> Self {
        AnswerValue::Multiple(values)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        AnswerValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Single(value) => write!(f, "{value}"),
            AnswerValue::Multiple(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

pub type SubAnswers = BTreeMap<String, AnswerValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_answers: Option<SubAnswers>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub total_scholarships: usize,
}

/// Authoring notes shipped alongside the questionnaire. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingInstructions {
    #[serde(default)]
    pub question_flow_logic: String,
    #[serde(default)]
    pub elimination_strategy: String,
    #[serde(default)]
    pub preference_handling: String,
    #[serde(default)]
    pub tie_breaking: String,
    #[serde(default)]
    pub final_output: BTreeMap<String, String>,
}

/// Questionnaire document loaded once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityData {
    #[serde(default)]
    pub questionnaire_metadata: QuestionnaireMetadata,
    pub scholarship_registry: Vec<ScholarshipEntry>,
    #[serde(default)]
    pub question_tiers: Vec<QuestionTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_instructions: Option<ProcessingInstructions>,
}
