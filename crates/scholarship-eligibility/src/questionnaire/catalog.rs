use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::ops::Range;
use std::path::Path;

use tracing::{info, warn};

use super::domain::{
    EligibilityData, ProcessingInstructions, Question, QuestionnaireMetadata, ScholarshipEntry,
};
use super::evaluation::{CompiledRule, Visibility};

/// Errors raised while loading a questionnaire document.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read eligibility data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid eligibility data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scholarship {0} is declared more than once")]
    DuplicateScholarship(String),
    #[error("tier {0} is declared more than once")]
    DuplicateTier(String),
    #[error("question {0} is declared more than once")]
    DuplicateQuestion(String),
}

/// Question with its rules and display condition parsed once at load.
#[derive(Debug, Clone)]
pub struct CompiledQuestion {
    pub tier_id: String,
    pub question: Question,
    pub rules: Vec<CompiledRule>,
    pub visibility: Visibility,
}

impl CompiledQuestion {
    fn compile(tier_id: &str, question: Question) -> Self {
        let rules = question
            .elimination_rules
            .iter()
            .cloned()
            .map(CompiledRule::compile)
            .collect();
        let visibility = Visibility::parse(question.show_if());

        Self {
            tier_id: tier_id.to_string(),
            question,
            rules,
            visibility,
        }
    }

    pub fn question_id(&self) -> &str {
        &self.question.question_id
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }
}

/// Tier header; its questions occupy `questions` in the catalog's flat sequence.
#[derive(Debug, Clone)]
pub struct CatalogTier {
    pub tier_id: String,
    pub tier_order: u32,
    pub tier_name: String,
    pub tier_description: String,
    pub estimated_elimination_rate: String,
    questions: Range<usize>,
}

impl CatalogTier {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// Immutable, load-time view of the questionnaire.
///
/// Tiers are stably sorted by `tier_order` and every question is laid out in a
/// single sequence in evaluation order. That order is what attributes an
/// elimination to the first question that could claim it.
#[derive(Debug, Clone)]
pub struct EligibilityCatalog {
    metadata: QuestionnaireMetadata,
    processing_instructions: Option<ProcessingInstructions>,
    scholarships: Vec<ScholarshipEntry>,
    tiers: Vec<CatalogTier>,
    questions: Vec<CompiledQuestion>,
    question_index: HashMap<String, usize>,
}

impl EligibilityCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path.as_ref())?;
        let catalog = Self::from_reader(file)?;
        info!(
            path = %path.as_ref().display(),
            scholarships = catalog.scholarships.len(),
            questions = catalog.questions.len(),
            "eligibility catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let data: EligibilityData = serde_json::from_reader(reader)?;
        Self::from_data(data)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let data: EligibilityData = serde_json::from_str(raw)?;
        Self::from_data(data)
    }

    pub fn from_data(data: EligibilityData) -> Result<Self, CatalogError> {
        let EligibilityData {
            questionnaire_metadata,
            scholarship_registry,
            mut question_tiers,
            processing_instructions,
        } = data;

        let mut registry_ids = HashSet::new();
        for entry in &scholarship_registry {
            if !registry_ids.insert(entry.scholarship_id.clone()) {
                return Err(CatalogError::DuplicateScholarship(
                    entry.scholarship_id.clone(),
                ));
            }
        }

        question_tiers.sort_by_key(|tier| tier.tier_order);

        let mut tier_ids = HashSet::new();
        let mut tiers = Vec::with_capacity(question_tiers.len());
        let mut questions = Vec::new();
        let mut question_index = HashMap::new();

        for tier in question_tiers {
            if !tier_ids.insert(tier.tier_id.clone()) {
                return Err(CatalogError::DuplicateTier(tier.tier_id));
            }

            let start = questions.len();
            for question in tier.questions {
                let question_id = question.question_id.clone();
                if question_index
                    .insert(question_id.clone(), questions.len())
                    .is_some()
                {
                    return Err(CatalogError::DuplicateQuestion(question_id));
                }

                for rule in &question.elimination_rules {
                    for id in rule.referenced_scholarships() {
                        if !registry_ids.contains(id) {
                            warn!(
                                rule_id = %rule.rule_id,
                                question_id = %question_id,
                                scholarship_id = id,
                                "rule references a scholarship missing from the registry"
                            );
                        }
                    }
                }

                questions.push(CompiledQuestion::compile(&tier.tier_id, question));
            }

            tiers.push(CatalogTier {
                tier_id: tier.tier_id,
                tier_order: tier.tier_order,
                tier_name: tier.tier_name,
                tier_description: tier.tier_description,
                estimated_elimination_rate: tier.estimated_elimination_rate,
                questions: start..questions.len(),
            });
        }

        Ok(Self {
            metadata: questionnaire_metadata,
            processing_instructions,
            scholarships: scholarship_registry,
            tiers,
            questions,
            question_index,
        })
    }

    pub fn metadata(&self) -> &QuestionnaireMetadata {
        &self.metadata
    }

    pub fn processing_instructions(&self) -> Option<&ProcessingInstructions> {
        self.processing_instructions.as_ref()
    }

    pub fn scholarships(&self) -> &[ScholarshipEntry] {
        &self.scholarships
    }

    pub fn scholarship(&self, scholarship_id: &str) -> Option<&ScholarshipEntry> {
        self.scholarships
            .iter()
            .find(|entry| entry.scholarship_id == scholarship_id)
    }

    /// Registry ids in declaration order.
    pub fn scholarship_ids(&self) -> impl Iterator<Item = &str> {
        self.scholarships
            .iter()
            .map(|entry| entry.scholarship_id.as_str())
    }

    pub fn tiers(&self) -> &[CatalogTier] {
        &self.tiers
    }

    pub fn tier(&self, tier_id: &str) -> Option<&CatalogTier> {
        self.tiers.iter().find(|tier| tier.tier_id == tier_id)
    }

    pub fn tier_questions(&self, tier: &CatalogTier) -> &[CompiledQuestion] {
        &self.questions[tier.questions.clone()]
    }

    /// Every question, tiers in order and declaration order within a tier.
    pub fn questions(&self) -> &[CompiledQuestion] {
        &self.questions
    }

    pub fn question(&self, question_id: &str) -> Option<&CompiledQuestion> {
        self.question_index
            .get(question_id)
            .map(|&index| &self.questions[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DOCUMENT: &str = r#"{
        "questionnaireMetadata": {
            "description": "Sample",
            "version": "1.0",
            "lastUpdated": "2025-01-15",
            "totalScholarships": 2
        },
        "scholarshipRegistry": [
            { "scholarshipId": "S1", "scholarshipName": "First", "awardValue": 1000 },
            { "scholarshipId": "S2", "scholarshipName": "Second" }
        ],
        "questionTiers": [
            {
                "tierId": "late",
                "tierOrder": 2,
                "questions": [
                    { "questionId": "Q3", "questionType": "text_area" }
                ]
            },
            {
                "tierId": "early",
                "tierOrder": 1,
                "questions": [
                    {
                        "questionId": "Q1",
                        "questionType": "single_choice",
                        "eliminationRules": [
                            {
                                "ruleId": "R1",
                                "condition": "value == 'no'",
                                "action": "eliminate",
                                "eliminationMessage": "Residency required",
                                "eliminatedScholarships": ["S1", "S9"]
                            }
                        ]
                    },
                    {
                        "questionId": "Q2",
                        "questionType": "multiple_choice",
                        "conditionalDisplay": { "showIf": "Q1.value == 'yes'" }
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn loads_and_orders_tiers() {
        let catalog = EligibilityCatalog::from_reader(Cursor::new(DOCUMENT)).expect("loads");

        let tier_ids: Vec<&str> = catalog.tiers().iter().map(|t| t.tier_id.as_str()).collect();
        assert_eq!(tier_ids, vec!["early", "late"]);

        let order: Vec<&str> = catalog
            .questions()
            .iter()
            .map(CompiledQuestion::question_id)
            .collect();
        assert_eq!(order, vec!["Q1", "Q2", "Q3"]);

        let early = catalog.tier("early").expect("tier exists");
        assert_eq!(early.question_count(), 2);
        assert_eq!(catalog.tier_questions(early)[1].question_id(), "Q2");
        assert_eq!(catalog.metadata().total_scholarships, 2);
    }

    #[test]
    fn compiles_rules_and_visibility_once() {
        let catalog = EligibilityCatalog::from_json(DOCUMENT).expect("loads");

        let q1 = catalog.question("Q1").expect("Q1 exists");
        assert!(q1.has_rules());
        assert_eq!(q1.visibility, Visibility::Always);

        let q2 = catalog.question("Q2").expect("Q2 exists");
        assert!(!q2.has_rules());
        assert_eq!(q2.tier_id, "early");
        assert_eq!(q2.visibility.dependencies(), vec!["Q1"]);

        assert!(catalog.question("Q9").is_none());
        assert!(catalog.tier("missing").is_none());
    }

    #[test]
    fn registry_order_is_preserved() {
        let catalog = EligibilityCatalog::from_json(DOCUMENT).expect("loads");
        let ids: Vec<&str> = catalog.scholarship_ids().collect();
        assert_eq!(ids, vec!["S1", "S2"]);
        assert_eq!(
            catalog.scholarship("S1").and_then(|s| s.award_value),
            Some(crate::questionnaire::domain::AwardValue::Amount(1000.0))
        );
    }

    #[test]
    fn rejects_duplicate_identifiers() {
        let duplicate_scholarship = DOCUMENT.replace("\"S2\"", "\"S1\"");
        assert!(matches!(
            EligibilityCatalog::from_json(&duplicate_scholarship),
            Err(CatalogError::DuplicateScholarship(id)) if id == "S1"
        ));

        let duplicate_question = DOCUMENT.replace("\"Q3\"", "\"Q1\"");
        assert!(matches!(
            EligibilityCatalog::from_json(&duplicate_question),
            Err(CatalogError::DuplicateQuestion(id)) if id == "Q1"
        ));

        let duplicate_tier = DOCUMENT.replace("\"late\"", "\"early\"");
        assert!(matches!(
            EligibilityCatalog::from_json(&duplicate_tier),
            Err(CatalogError::DuplicateTier(id)) if id == "early"
        ));
    }

    #[test]
    fn reports_malformed_json() {
        let result = EligibilityCatalog::from_json("{ \"scholarshipRegistry\": 3 }");
        assert!(matches!(result, Err(CatalogError::Json(_))));
    }

    #[test]
    fn reports_missing_files() {
        let result = EligibilityCatalog::from_path("/nonexistent/eligibility.json");
        assert!(matches!(result, Err(CatalogError::Io(_))));
    }
}
