//! Domain classification: prompt budgeting, model calls with a single retry,
//! reply parsing, the offline keyword heuristic and periodic context recycling.

mod classifier;
mod heuristic;
mod parse;
mod prompt;
mod recycle;

pub use classifier::{ClassificationOutcome, Classifier};
pub use heuristic::KeywordClassifier;
pub use parse::{parse_reply, ParseOutcome};
pub use prompt::{BuiltPrompt, PromptBuilder};
pub use recycle::{ContextRecycler, RecycleOutcome};
