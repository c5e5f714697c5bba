use clap::Args;
use scholarship_eligibility::config::AppConfig;
use scholarship_eligibility::error::AppError;
use scholarship_eligibility::questionnaire::{
    AnswerSubmission, AnswerValue, EligibilityCatalog, EligibilityStore, SubAnswers,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file mapping question ids to answers
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Questionnaire document (defaults to ELIGIBILITY_DATA_PATH)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// List each visible question with its recorded answer
    #[arg(long)]
    pub(crate) show_questions: bool,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

/// One entry of an answers file: a bare value or a value with sub-answers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerEntry {
    Value(AnswerValue),
    Submission(AnswerSubmission),
}

impl AnswerEntry {
    fn into_parts(self) -> (AnswerValue, Option<SubAnswers>) {
        match self {
            AnswerEntry::Value(value) => (value, None),
            AnswerEntry::Submission(submission) => (submission.value, submission.sub_answers),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EligibilityReport {
    pub(crate) title: String,
    pub(crate) version: String,
    pub(crate) progress: f64,
    pub(crate) can_complete: bool,
    pub(crate) eligible: Vec<EligibleLine>,
    pub(crate) eliminated: Vec<EliminatedLine>,
    pub(crate) tiers: Vec<TierLine>,
    pub(crate) skipped_answers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) elimination_strategy: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EligibleLine {
    pub(crate) scholarship_id: String,
    pub(crate) scholarship_name: String,
    pub(crate) award_label: String,
    pub(crate) application_deadline: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EliminatedLine {
    pub(crate) scholarship_id: String,
    pub(crate) scholarship_name: String,
    pub(crate) reason: String,
    pub(crate) question_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TierLine {
    pub(crate) tier_id: String,
    pub(crate) tier_name: String,
    pub(crate) answered: usize,
    pub(crate) visible: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) questions: Vec<QuestionLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionLine {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: &'static str,
    pub(crate) answer: Option<String>,
    pub(crate) follow_ups: Vec<String>,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        answers,
        data,
        show_questions,
        json,
    } = args;

    let data_path = match data {
        Some(path) => path,
        None => AppConfig::load()?.catalog.data_path,
    };
    let catalog = Arc::new(EligibilityCatalog::from_path(&data_path)?);
    let entries = load_answers(std::fs::File::open(&answers)?)?;

    let (store, skipped) = replay_answers(catalog, entries);
    let report = build_report(&store, skipped, show_questions);

    if json {
        let rendered = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
        println!("{rendered}");
    } else {
        render_report(&report);
    }

    Ok(())
}

pub(crate) fn load_answers<R: Read>(reader: R) -> Result<BTreeMap<String, AnswerEntry>, AppError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Apply every answer whose question exists; returns the ids that were skipped.
pub(crate) fn replay_answers(
    catalog: Arc<EligibilityCatalog>,
    entries: BTreeMap<String, AnswerEntry>,
) -> (EligibilityStore, Vec<String>) {
    let mut store = EligibilityStore::new(catalog);
    let mut skipped = Vec::new();

    for (question_id, entry) in entries {
        if store.catalog().question(&question_id).is_none() {
            skipped.push(question_id);
            continue;
        }
        let (value, sub_answers) = entry.into_parts();
        store.answer(question_id, value, sub_answers);
    }

    (store, skipped)
}

pub(crate) fn build_report(
    store: &EligibilityStore,
    skipped_answers: Vec<String>,
    show_questions: bool,
) -> EligibilityReport {
    let catalog = store.catalog();
    let state = store.state();

    let eligible = store
        .eligible_entries()
        .into_iter()
        .map(|entry| EligibleLine {
            scholarship_id: entry.scholarship_id.clone(),
            scholarship_name: entry.scholarship_name.clone(),
            award_label: entry
                .award_value
                .map(|value| value.label())
                .unwrap_or_else(|| "Variable".to_string()),
            application_deadline: entry.application_deadline.clone(),
        })
        .collect();

    let eliminated = state
        .eliminated_scholarships
        .iter()
        .map(|entry| EliminatedLine {
            scholarship_id: entry.scholarship_id.clone(),
            scholarship_name: catalog
                .scholarship(&entry.scholarship_id)
                .map(|record| record.scholarship_name.clone())
                .unwrap_or_else(|| entry.scholarship_id.clone()),
            reason: entry.reason.clone(),
            question_id: entry.eliminated_by_question_id.clone(),
        })
        .collect();

    let tiers = catalog
        .tiers()
        .iter()
        .map(|tier| {
            let progress = store.tier_progress(&tier.tier_id);
            let questions = if show_questions {
                store
                    .visible_questions(&tier.tier_id)
                    .into_iter()
                    .map(|question| QuestionLine {
                        question_id: question.question_id.clone(),
                        question_text: question.question_text.clone(),
                        question_type: question.question_type.label(),
                        answer: state
                            .answers
                            .get(&question.question_id)
                            .map(|answer| answer.value.to_string()),
                        follow_ups: store
                            .triggered_sub_questions(&question.question_id)
                            .into_iter()
                            .map(|sub_question| sub_question.sub_question_text.clone())
                            .collect(),
                    })
                    .collect()
            } else {
                Vec::new()
            };

            TierLine {
                tier_id: tier.tier_id.clone(),
                tier_name: tier.tier_name.clone(),
                answered: progress.answered,
                visible: progress.total,
                questions,
            }
        })
        .collect();

    let metadata = catalog.metadata();
    EligibilityReport {
        title: metadata
            .title
            .clone()
            .unwrap_or_else(|| "Scholarship questionnaire".to_string()),
        version: metadata.version.clone(),
        progress: store.progress(),
        can_complete: store.can_complete(),
        eligible,
        eliminated,
        tiers,
        skipped_answers,
        elimination_strategy: catalog
            .processing_instructions()
            .map(|instructions| instructions.elimination_strategy.trim())
            .filter(|strategy| !strategy.is_empty())
            .map(str::to_string),
    }
}

pub(crate) fn render_report(report: &EligibilityReport) {
    println!("Scholarship eligibility report");
    println!("Questionnaire: {} (version {})", report.title, report.version);
    println!(
        "Progress: {:.0}% of visible questions answered | ready to submit: {}",
        report.progress,
        if report.can_complete { "yes" } else { "no" }
    );
    if let Some(strategy) = &report.elimination_strategy {
        println!("Elimination strategy: {strategy}");
    }

    if !report.skipped_answers.is_empty() {
        println!(
            "Skipped answers for unknown questions: {}",
            report.skipped_answers.join(", ")
        );
    }

    if report.eligible.is_empty() {
        println!("\nEligible scholarships: none");
    } else {
        println!("\nEligible scholarships ({})", report.eligible.len());
        for line in &report.eligible {
            println!(
                "- {} [{}]: {}, deadline {}",
                line.scholarship_name,
                line.scholarship_id,
                line.award_label,
                if line.application_deadline.is_empty() {
                    "not published"
                } else {
                    line.application_deadline.as_str()
                }
            );
        }
    }

    if report.eliminated.is_empty() {
        println!("\nEliminated scholarships: none");
    } else {
        println!("\nEliminated scholarships ({})", report.eliminated.len());
        for line in &report.eliminated {
            println!(
                "- {} [{}] by {}: {}",
                line.scholarship_name, line.scholarship_id, line.question_id, line.reason
            );
        }
    }

    println!("\nQuestion tiers");
    for tier in &report.tiers {
        println!(
            "- {} ({}): {}/{} visible questions answered",
            tier.tier_name, tier.tier_id, tier.answered, tier.visible
        );
        for question in &tier.questions {
            println!(
                "    {} {} ({}) -> {}",
                question.question_id,
                question.question_text,
                question.question_type,
                question.answer.as_deref().unwrap_or("(unanswered)")
            );
            for follow_up in &question.follow_ups {
                println!("      follow-up: {}", follow_up);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE_DOCUMENT: &str = include_str!("../../../data/eligibility.json");

    const ANSWERS: &str = r#"{
        "Q1": "yes",
        "Q3": "graduate",
        "Q5": { "value": "part_time", "subAnswers": { "Q5_1": "Evening courses" } },
        "Q99": "unused"
    }"#;

    fn catalog() -> Arc<EligibilityCatalog> {
        Arc::new(EligibilityCatalog::from_json(SAMPLE_DOCUMENT).expect("sample catalog loads"))
    }

    #[test]
    fn answers_accept_bare_values_and_submissions() {
        let entries = load_answers(Cursor::new(ANSWERS)).expect("answers parse");

        assert_eq!(entries["Q1"], AnswerEntry::Value(AnswerValue::from("yes")));
        match &entries["Q5"] {
            AnswerEntry::Submission(submission) => {
                assert_eq!(submission.value, AnswerValue::from("part_time"));
                assert!(submission.sub_answers.is_some());
            }
            other => panic!("expected submission, got {other:?}"),
        }
    }

    #[test]
    fn malformed_answers_are_reported() {
        let result = load_answers(Cursor::new("[1, 2, 3]"));
        assert!(matches!(result, Err(AppError::Answers(_))));
    }

    #[test]
    fn report_lists_eligible_and_eliminated_scholarships() {
        let entries = load_answers(Cursor::new(ANSWERS)).expect("answers parse");
        let (store, skipped) = replay_answers(catalog(), entries);
        let report = build_report(&store, skipped, true);

        assert_eq!(report.skipped_answers, vec!["Q99".to_string()]);
        let eligible: Vec<(&str, &str)> = report
            .eligible
            .iter()
            .map(|line| (line.scholarship_id.as_str(), line.award_label.as_str()))
            .collect();
        assert_eq!(
            eligible,
            vec![
                ("SCH_GRADUATE", "$10,800 - $15,000"),
                ("SCH_INDIGENOUS", "$1,500")
            ]
        );
        assert_eq!(report.eliminated.len(), 3);
        assert!(report
            .eliminated
            .iter()
            .all(|line| line.question_id == "Q3" && line.reason == "Not open to graduate students"));
        assert!((report.progress - 50.0).abs() < 1e-9);
        assert!(report.can_complete);

        let counts: Vec<(&str, usize, usize)> = report
            .tiers
            .iter()
            .map(|tier| (tier.tier_id.as_str(), tier.answered, tier.visible))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("tier_residency", 1, 2),
                ("tier_education", 2, 2),
                ("tier_background", 0, 2)
            ]
        );

        let q5 = &report.tiers[1].questions[1];
        assert_eq!(q5.answer.as_deref(), Some("part_time"));
        assert_eq!(q5.question_type, "Single choice");
        assert_eq!(
            q5.follow_ups,
            vec!["Briefly explain why you study part time".to_string()]
        );
    }

    #[test]
    fn question_listing_is_omitted_by_default() {
        let (store, skipped) = replay_answers(catalog(), BTreeMap::new());
        let report = build_report(&store, skipped, false);

        assert!(report.tiers.iter().all(|tier| tier.questions.is_empty()));
        assert_eq!(report.eligible.len(), 5);
        assert!(!report.can_complete);
        assert_eq!(report.title, "Heritage Scholarship Eligibility");
        assert_eq!(
            report.elimination_strategy.as_deref(),
            Some("Recompute from the full registry on every answer.")
        );
    }
}
