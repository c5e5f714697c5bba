use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::EligibilityCatalog;
use super::domain::{AnswerValue, ConditionalQuestion, Question, SubAnswers};
use super::reducer::EligibilityState;
use super::registry::{RegistryError, SessionId, SessionRegistry};
use super::store::{CompletionError, EligibilityHandoff, EligibilityStore, TierProgress};

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

/// Answer payload accepted from the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_answers: Option<SubAnswers>,
}

/// Remaining scholarship as shown beside the questionnaire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleScholarshipView {
    pub scholarship_id: String,
    pub scholarship_name: String,
    pub award_label: String,
    pub application_deadline: String,
}

/// Snapshot of a session returned by every mutating call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: SessionId,
    pub progress: f64,
    pub can_complete: bool,
    pub eligible: Vec<EligibleScholarshipView>,
    pub state: EligibilityState,
}

impl SessionView {
    fn from_store(session_id: SessionId, store: &EligibilityStore) -> Self {
        let eligible = store
            .eligible_entries()
            .into_iter()
            .map(|entry| EligibleScholarshipView {
                scholarship_id: entry.scholarship_id.clone(),
                scholarship_name: entry.scholarship_name.clone(),
                award_label: entry
                    .award_value
                    .map(|value| value.label())
                    .unwrap_or_else(|| "Variable".to_string()),
                application_deadline: entry.application_deadline.clone(),
            })
            .collect();

        Self {
            session_id,
            progress: store.progress(),
            can_complete: store.can_complete(),
            eligible,
            state: store.state().as_ref().clone(),
        }
    }
}

/// Visible question together with the sub-questions its answer reveals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleQuestionView {
    pub question: Question,
    pub answered: bool,
    pub triggered_sub_questions: Vec<ConditionalQuestion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierQuestionsView {
    pub tier_id: String,
    pub progress: TierProgress,
    pub questions: Vec<VisibleQuestionView>,
}

/// Hosts questionnaire sessions over one shared catalog.
pub struct EligibilitySessionService<R> {
    catalog: Arc<EligibilityCatalog>,
    sessions: Arc<R>,
}

impl<R> EligibilitySessionService<R>
where
    R: SessionRegistry + 'static,
{
    pub fn new(catalog: Arc<EligibilityCatalog>, sessions: Arc<R>) -> Self {
        Self { catalog, sessions }
    }

    pub fn catalog(&self) -> &EligibilityCatalog {
        &self.catalog
    }

    /// Open a session with every scholarship eligible and no answers.
    pub fn start(&self) -> Result<SessionView, SessionServiceError> {
        let session_id = next_session_id();
        let store = EligibilityStore::new(Arc::clone(&self.catalog));
        let view = SessionView::from_store(session_id.clone(), &store);
        self.sessions.insert(session_id.clone(), store)?;
        info!(%session_id, "eligibility session started");
        Ok(view)
    }

    pub fn snapshot(&self, session_id: &SessionId) -> Result<SessionView, SessionServiceError> {
        let store = self
            .sessions
            .fetch(session_id)?
            .ok_or(RegistryError::NotFound)?;
        Ok(SessionView::from_store(session_id.clone(), &store))
    }

    pub fn answer(
        &self,
        session_id: &SessionId,
        question_id: &str,
        submission: AnswerSubmission,
    ) -> Result<SessionView, SessionServiceError> {
        self.ensure_question(question_id)?;
        let store = self.sessions.update(session_id, &mut |store: &mut EligibilityStore| {
            store.answer(
                question_id,
                submission.value.clone(),
                submission.sub_answers.clone(),
            );
        })?;
        Ok(SessionView::from_store(session_id.clone(), &store))
    }

    pub fn clear(
        &self,
        session_id: &SessionId,
        question_id: &str,
    ) -> Result<SessionView, SessionServiceError> {
        self.ensure_question(question_id)?;
        let store = self
            .sessions
            .update(session_id, &mut |store: &mut EligibilityStore| {
                store.clear(question_id)
            })?;
        Ok(SessionView::from_store(session_id.clone(), &store))
    }

    pub fn reset(&self, session_id: &SessionId) -> Result<SessionView, SessionServiceError> {
        let store = self
            .sessions
            .update(session_id, &mut |store: &mut EligibilityStore| store.reset())?;
        Ok(SessionView::from_store(session_id.clone(), &store))
    }

    /// Unknown tiers produce an empty listing rather than an error.
    pub fn visible_questions(
        &self,
        session_id: &SessionId,
        tier_id: &str,
    ) -> Result<TierQuestionsView, SessionServiceError> {
        let store = self
            .sessions
            .fetch(session_id)?
            .ok_or(RegistryError::NotFound)?;

        let state = store.state();
        let questions = store
            .visible_questions(tier_id)
            .into_iter()
            .map(|question| VisibleQuestionView {
                answered: state.answers.contains_key(&question.question_id),
                triggered_sub_questions: store
                    .triggered_sub_questions(&question.question_id)
                    .into_iter()
                    .cloned()
                    .collect(),
                question: question.clone(),
            })
            .collect();

        Ok(TierQuestionsView {
            tier_id: tier_id.to_string(),
            progress: store.tier_progress(tier_id),
            questions,
        })
    }

    /// Hand off the eligible ids and answers, discarding the session.
    ///
    /// The session is checked and taken out of the registry in one step, so a
    /// session is handed off at most once and no answer lands after the handoff.
    pub fn complete(
        &self,
        session_id: &SessionId,
    ) -> Result<EligibilityHandoff, SessionServiceError> {
        let mut outcome = None;
        self.sessions
            .remove_if(session_id, &mut |store: &EligibilityStore| {
                let result = store.clone().complete();
                let claimed = result.is_ok();
                outcome = Some(result);
                claimed
            })?;
        let handoff = outcome.ok_or(RegistryError::NotFound)??;
        info!(
            %session_id,
            eligible = handoff.eligible_scholarship_ids.len(),
            "eligibility session completed"
        );
        Ok(handoff)
    }

    fn ensure_question(&self, question_id: &str) -> Result<(), SessionServiceError> {
        match self.catalog.question(question_id) {
            Some(_) => Ok(()),
            None => Err(SessionServiceError::UnknownQuestion(question_id.to_string())),
        }
    }
}

/// Error raised by the session service.
#[derive(Debug, thiserror::Error)]
pub enum SessionServiceError {
    #[error("question {0} is not part of this questionnaire")]
    UnknownQuestion(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
