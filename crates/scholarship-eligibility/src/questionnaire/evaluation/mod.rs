pub mod condition;
mod rules;
pub mod visibility;

pub use condition::Condition;
pub use rules::{apply_rules, CompiledRule, EligibilityTally, EliminatedScholarship};
pub use visibility::{Clause, Comparison, Visibility};
