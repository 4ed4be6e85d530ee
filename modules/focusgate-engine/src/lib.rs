pub mod engine;
pub mod expander;
pub mod gate;
pub mod heuristic;
pub mod navigator;
pub mod store;
pub mod url_rules;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use engine::{DecisionEngine, EngineDeps, Stage};
pub use expander::KeywordExpander;
pub use gate::{GroqGate, ReasoningGate};
pub use heuristic::{HeuristicDecision, HeuristicOutcome, HeuristicScorer};
pub use navigator::{Navigator, NoopNavigator};
pub use store::{DecisionStore, FileStore, MemoryStore};
