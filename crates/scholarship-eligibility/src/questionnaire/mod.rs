//! Scholarship eligibility questionnaire: data model, condition language,
//! elimination rules, the from-scratch reducer, and the session surface that
//! hosts it for the application wizard.

pub mod catalog;
pub mod domain;
pub mod evaluation;
pub mod reducer;
pub mod registry;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, CatalogTier, CompiledQuestion, EligibilityCatalog};
pub use domain::{
    Answer, AnswerValue, AwardValue, ConditionalQuestion, EligibilityData, EliminationRule,
    Question, QuestionOption, QuestionTier, QuestionType, RuleAction, ScholarshipEntry,
    SubAnswers,
};
pub use evaluation::{EligibilityTally, EliminatedScholarship};
pub use reducer::{recompute, reduce, EligibilityEvent, EligibilityState};
pub use registry::{RegistryError, SessionId, SessionRegistry};
pub use router::session_router;
pub use service::{
    AnswerSubmission, EligibilitySessionService, SessionServiceError, SessionView,
    TierQuestionsView,
};
pub use store::{CompletionError, EligibilityHandoff, EligibilityStore, TierProgress};
